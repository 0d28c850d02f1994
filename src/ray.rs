use nalgebra::{Point3, Unit, Vector3};

use crate::{math, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    pub position: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,

    /// Used when testing intersection with a bounding box.
    pub inv_direction: Vector3<f32>,
}

impl Ray {
    /// Construct a new ray, normalizing `direction`. Zero-length and non-finite directions are
    /// rejected, as marching along them would never make progress.
    pub fn new(position: Point3<f32>, direction: Vector3<f32>) -> Result<Ray> {
        if !math::is_finite(&direction) {
            return Err(Error::Direction);
        }

        let direction = Unit::try_new(direction, f32::EPSILON).ok_or(Error::Direction)?;
        Ok(Self::from_unit(position, direction))
    }

    /// Construct a new ray from a direction that is already known to be unit length.
    pub fn from_unit(position: Point3<f32>, direction: Unit<Vector3<f32>>) -> Ray {
        let inv = |c: f32| if c != 0.0 { 1.0 / c } else { f32::INFINITY };
        let inv_direction = Vector3::new(inv(direction.x), inv(direction.y), inv(direction.z));
        Ray {
            position,
            direction,
            inv_direction,
        }
    }

    /// The point `t` units along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.position + self.direction.scale(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_direction() {
        let ray = Ray::new(Point3::origin(), Vector3::new(0., 0., 4.)).unwrap();
        assert_eq!(Vector3::new(0., 0., 1.), ray.direction.into_inner());
        assert_eq!(Point3::new(0., 0., 2.5), ray.at(2.5));
    }

    #[test]
    fn test_rejects_degenerate_direction() {
        assert!(matches!(
            Ray::new(Point3::origin(), Vector3::zeros()),
            Err(Error::Direction)
        ));
        assert!(matches!(
            Ray::new(Point3::origin(), Vector3::new(f32::NAN, 0., 1.)),
            Err(Error::Direction)
        ));
        assert!(matches!(
            Ray::new(Point3::origin(), Vector3::new(f32::INFINITY, 0., 0.)),
            Err(Error::Direction)
        ));
    }

    #[test]
    fn test_inv_direction() {
        let ray = Ray::new(Point3::new(1., 1., 1.), Vector3::new(0., -2., 0.)).unwrap();
        assert_eq!(f32::INFINITY, ray.inv_direction.x);
        assert_eq!(-1., ray.inv_direction.y);
    }
}
