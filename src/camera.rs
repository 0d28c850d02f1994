use nalgebra::{Point3, Unit, Vector3};

use crate::{math, ray::Ray, Error, Result};

pub trait Camera: Sync {
    /// The image size in pixels, as `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    /// Generate the ray for the pixel at `(row, col)`.
    fn generate_ray(&self, row: u32, col: u32) -> Ray;
}

/// A camera whose rays all share one direction and start on a regular lattice in the image plane.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    width: u32,
    height: u32,

    /// Where the ray for pixel `(0, 0)` starts.
    origin: Point3<f32>,

    /// World-space offset between horizontally adjacent pixels.
    x_axis: Vector3<f32>,

    /// World-space offset between vertically adjacent pixels.
    y_axis: Vector3<f32>,

    direction: Unit<Vector3<f32>>,
}

impl OrthographicCamera {
    /// Construct a new [`OrthographicCamera`]. The view direction is normalized here, so every ray
    /// the camera produces has a unit-length direction.
    pub fn new(
        width: u32,
        height: u32,
        origin: Point3<f32>,
        x_axis: Vector3<f32>,
        y_axis: Vector3<f32>,
        direction: Vector3<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Resolution(width, height));
        }

        if !math::is_finite(&direction) {
            return Err(Error::Direction);
        }
        let direction = Unit::try_new(direction, f32::EPSILON).ok_or(Error::Direction)?;

        Ok(Self {
            width,
            height,
            origin,
            x_axis,
            y_axis,
            direction,
        })
    }

    /// A camera with square pixels of `pixel_size` laid out along world x (columns) and y (rows).
    pub fn axis_aligned(
        width: u32,
        height: u32,
        origin: Point3<f32>,
        pixel_size: f32,
        direction: Vector3<f32>,
    ) -> Result<Self> {
        Self::new(
            width,
            height,
            origin,
            Vector3::x() * pixel_size,
            Vector3::y() * pixel_size,
            direction,
        )
    }
}

impl Camera for OrthographicCamera {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn generate_ray(&self, row: u32, col: u32) -> Ray {
        let position = self.origin + self.x_axis * col as f32 + self.y_axis * row as f32;
        Ray::from_unit(position, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthographic_camera() {
        let camera = OrthographicCamera::axis_aligned(
            10,
            5,
            Point3::new(0., 0., -50.),
            0.5,
            Vector3::new(0., 0., 2.),
        )
        .unwrap();

        assert_eq!((10, 5), camera.resolution());

        let ray = camera.generate_ray(0, 0);
        assert_eq!(Point3::new(0., 0., -50.), ray.position);

        let ray = camera.generate_ray(3, 7);
        assert_eq!(Point3::new(3.5, 1.5, -50.), ray.position);
        assert_eq!(Vector3::new(0., 0., 1.), ray.direction.into_inner());
    }

    #[test]
    fn test_all_rays_parallel() {
        let camera = OrthographicCamera::new(
            4,
            4,
            Point3::new(1., 2., 3.),
            Vector3::new(0.3, 0.1, 0.),
            Vector3::new(-0.1, 0.3, 0.),
            Vector3::new(1., 1., -1.),
        )
        .unwrap();

        let first = camera.generate_ray(0, 0);
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(first.direction, camera.generate_ray(row, col).direction);
            }
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let origin = Point3::origin();
        assert!(matches!(
            OrthographicCamera::axis_aligned(10, 10, origin, 1., Vector3::zeros()),
            Err(Error::Direction)
        ));
        assert!(matches!(
            OrthographicCamera::axis_aligned(0, 10, origin, 1., Vector3::z()),
            Err(Error::Resolution(0, 10))
        ));
    }
}
