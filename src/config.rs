use std::path::PathBuf;

use log::info;
use nalgebra::{Point3, Vector3};

use crate::{
    camera::OrthographicCamera,
    encode::{EncodeOptions, Origin},
    grid::{Grid, FAR_DISTANCE},
    march::MarchConfig,
    render::Backend,
    vti, Result,
};

/// Where the distance field comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum GridSource {
    /// A synthetic cube of `dim` voxels per side holding the distance to a sphere.
    Sphere {
        dim: usize,
        voxel_width: f32,
        center: Point3<f32>,
        radius: f32,
    },

    /// A `.vti` file, padded into a cube with [`FAR_DISTANCE`].
    Vti { path: PathBuf },
}

impl GridSource {
    pub fn load(&self) -> Result<Grid> {
        match self {
            GridSource::Sphere {
                dim,
                voxel_width,
                center,
                radius,
            } => {
                info!("building {}^3 sphere field, radius {}", dim, radius);
                Grid::sphere(*dim, Point3::origin(), *voxel_width, *center, *radius)
            }

            GridSource::Vti { path } => Ok(vti::load(path)?.pad_to_cube(FAR_DISTANCE)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,

    /// Start of the ray for pixel `(0, 0)`.
    pub origin: Point3<f32>,

    /// Side of a square pixel in world units; columns follow world x and rows world y.
    pub pixel_size: f32,

    pub direction: Vector3<f32>,
}

impl CameraConfig {
    pub fn build(&self) -> Result<OrthographicCamera> {
        OrthographicCamera::axis_aligned(
            self.width,
            self.height,
            self.origin,
            self.pixel_size,
            self.direction,
        )
    }
}

/// Everything needed to produce a depth image.
#[derive(Debug, Clone)]
pub struct Config {
    pub grid: GridSource,
    pub camera: CameraConfig,
    pub march: MarchConfig,
    pub backend: Backend,
    pub encode: EncodeOptions,
}

impl Config {
    /// A sphere of radius 40 in a 100^3 volume, viewed along +z from in front of it.
    pub fn sphere() -> Self {
        Config {
            grid: GridSource::Sphere {
                dim: 100,
                voxel_width: 1.0,
                center: Point3::new(50., 50., 50.),
                radius: 40.,
            },
            camera: CameraConfig {
                width: 1000,
                height: 1000,
                origin: Point3::new(0., 0., -50.),
                pixel_size: 0.1,
                direction: Vector3::new(0., 0., 1.),
            },
            march: MarchConfig::default(),
            backend: Backend::default(),
            encode: EncodeOptions::default(),
        }
    }

    /// A field loaded from `path`, viewed along -z from far above, with row zero at the bottom of
    /// the output.
    pub fn vti<P: Into<PathBuf>>(path: P) -> Self {
        Config {
            grid: GridSource::Vti { path: path.into() },
            camera: CameraConfig {
                width: 1000,
                height: 1000,
                origin: Point3::new(-150., -150., 1000.),
                pixel_size: 0.3,
                direction: Vector3::new(0., 0., -1.),
            },
            march: MarchConfig {
                max_distance: 2000.,
                ..MarchConfig::default()
            },
            backend: Backend::default(),
            encode: EncodeOptions {
                origin: Origin::Lower,
                ..EncodeOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn test_sphere_source() {
        let grid = Config::sphere().grid.load().unwrap();
        assert_eq!([100, 100, 100], grid.dims());
        assert_eq!(-40.0, grid.value(50, 50, 50));
    }

    #[test]
    fn test_camera_config() {
        let camera = Config::sphere().camera.build().unwrap();
        assert_eq!((1000, 1000), camera.resolution());
        assert_eq!(
            Point3::new(50., 50., -50.),
            camera.generate_ray(500, 500).position
        );
    }

    #[test]
    fn test_missing_vti() {
        let config = Config::vti("/nonexistent/field.vti");
        assert!(matches!(config.grid.load(), Err(crate::Error::Io(_))));
    }
}
