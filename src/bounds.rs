use nalgebra::Point3;

use crate::ray::Ray;

/// An axis-aligned box in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds3 {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds3 {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Bounds3 { min, max }
    }

    /// Intersect the ray with the box using the slab test, returning the parametric range
    /// `(enter, exit)` over which the ray is inside. The range is `None` when the ray misses the
    /// box, or when the box lies entirely behind the ray origin. Faces count as inside.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let t1 = (self.min - ray.position).component_mul(&ray.inv_direction);
        let t2 = (self.max - ray.position).component_mul(&ray.inv_direction);

        let mut enter = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        for axis in 0..3 {
            // A ray parallel to the slab stays on whichever side it starts. The slab distances
            // are 0 * inf on a face, so they cannot be used.
            if ray.direction[axis] == 0.0 {
                let p = ray.position[axis];
                if p < self.min[axis] || p > self.max[axis] {
                    return None;
                }
                continue;
            }

            enter = enter.max(t1[axis].min(t2[axis]));
            exit = exit.min(t1[axis].max(t2[axis]));
        }

        if exit >= enter && exit >= 0.0 {
            Some((enter, exit))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn unit_box() -> Bounds3 {
        Bounds3::new(Point3::origin(), Point3::new(1., 1., 1.))
    }

    #[test]
    fn test_intersect_through() {
        let ray = Ray::new(Point3::new(0.5, 0.5, -2.), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(Some((2., 3.)), unit_box().intersect(&ray));
    }

    #[test]
    fn test_intersect_from_inside() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.25), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(Some((-0.25, 0.75)), unit_box().intersect(&ray));
    }

    #[test]
    fn test_intersect_miss() {
        // Parallel to the box, but offset.
        let ray = Ray::new(Point3::new(2., 0.5, -2.), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(None, unit_box().intersect(&ray));

        // Pointing away from the box.
        let ray = Ray::new(Point3::new(0.5, 0.5, -2.), Vector3::new(0., 0., -1.)).unwrap();
        assert_eq!(None, unit_box().intersect(&ray));
    }

    #[test]
    fn test_intersect_along_faces() {
        // Lying in the min x face.
        let ray = Ray::new(Point3::new(0., 0.5, -2.), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(Some((2., 3.)), unit_box().intersect(&ray));

        // Along the edge shared by the max x and max y faces.
        let ray = Ray::new(Point3::new(1., 1., -2.), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(Some((2., 3.)), unit_box().intersect(&ray));

        // In the min z face, travelling along x.
        let ray = Ray::new(Point3::new(-1., 0.5, 0.), Vector3::new(1., 0., 0.)).unwrap();
        assert_eq!(Some((1., 2.)), unit_box().intersect(&ray));

        // Just outside the max x face.
        let ray = Ray::new(Point3::new(1.001, 0.5, -2.), Vector3::new(0., 0., 1.)).unwrap();
        assert_eq!(None, unit_box().intersect(&ray));
    }
}
