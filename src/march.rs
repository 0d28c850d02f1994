use nalgebra::Point3;

use crate::{
    bounds::Bounds3,
    grid::{Grid, FAR_DISTANCE},
    ray::Ray,
    Error, Result,
};

/// A field that can be sphere traced.
pub trait DistanceField: Sync {
    /// The signed distance at `point`. Values at or above [`FAR_DISTANCE`] mean the point is
    /// outside the field altogether.
    fn distance(&self, point: &Point3<f32>) -> f32;

    /// The region where the field is defined. Rays are clipped to it before marching begins;
    /// `None` means the field is unbounded.
    fn bounds(&self) -> Option<Bounds3>;
}

impl DistanceField for Grid {
    #[inline]
    fn distance(&self, point: &Point3<f32>) -> f32 {
        self.sample(point)
    }

    fn bounds(&self) -> Option<Bounds3> {
        Some(Grid::bounds(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarchConfig {
    /// Upper bound on field samples taken per ray.
    pub max_steps: u32,

    /// A sample whose magnitude is at most this is treated as the surface.
    pub epsilon: f32,

    /// Rays that travel further than this are misses.
    pub max_distance: f32,
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            epsilon: 0.001,
            max_distance: 1000.,
        }
    }
}

impl MarchConfig {
    /// Check the bounds before any tracing starts.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(Error::MarchConfig("max_steps must be positive"));
        }

        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(Error::MarchConfig("epsilon must be positive and finite"));
        }

        if !(self.max_distance > 0.0) {
            return Err(Error::MarchConfig("max_distance must be positive"));
        }

        Ok(())
    }
}

/// Information about a ray reaching the zero level-set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// The distance traveled from the ray origin.
    pub distance: f32,

    /// The number of samples taken.
    pub steps: u32,
}

/// March `ray` through `grid` until it reaches the surface. Returns `None` when the ray leaves the
/// grid, travels beyond `max_distance`, or runs out of steps.
#[inline]
pub fn trace(grid: &Grid, ray: &Ray, config: &MarchConfig) -> Option<Hit> {
    march(grid, ray, config).hit
}

/// The outcome of marching a single ray, hit or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct March {
    pub hit: Option<Hit>,

    /// Samples taken before the march stopped, whatever the outcome.
    pub steps: u32,
}

/// Sphere trace `ray` against `field`.
///
/// The ray is first clipped to the field's bounds so that empty space in front of the volume is
/// skipped in one jump; a ray that never meets the bounds is a miss without sampling the field.
/// Inside, each step advances by the sampled distance, which cannot overshoot the surface for a
/// true distance field and a unit-length direction.
pub fn march<F: DistanceField + ?Sized>(field: &F, ray: &Ray, config: &MarchConfig) -> March {
    let mut t = match field.bounds() {
        Some(bounds) => match bounds.intersect(ray) {
            Some((enter, _)) => enter.max(0.0),
            None => return March { hit: None, steps: 0 },
        },
        None => 0.0,
    };

    for i in 0..config.max_steps {
        let d = field.distance(&ray.at(t));
        let steps = i + 1;

        if d.abs() <= config.epsilon {
            return March {
                hit: Some(Hit { distance: t, steps }),
                steps,
            };
        }

        // NaN samples stop here too.
        if !(d < FAR_DISTANCE) || t > config.max_distance {
            return March { hit: None, steps };
        }

        t += d;
    }

    March {
        hit: None,
        steps: config.max_steps,
    }
}
