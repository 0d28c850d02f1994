use log::debug;
use nalgebra::{Point3, Vector3};

use crate::{bounds::Bounds3, math::Mix, Error, Result};

/// The distance reported for anything outside the sampled volume. Padding cells are filled with
/// it as well, so that both read as "far outside" and never as a surface.
pub const FAR_DISTANCE: f32 = 10000.0;

/// How far outside `[0, dim - 1]` a voxel coordinate may stray and still be clamped onto the
/// face, in voxels. Absorbs rounding when a ray is clipped onto the grid boundary.
const EDGE_SLACK: f32 = 1e-4;

/// A dense signed distance field sampled on a regular lattice.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Voxel counts along x, y and z.
    dims: [usize; 3],

    /// World-space position of voxel `(0, 0, 0)`.
    origin: Point3<f32>,

    /// Spacing between neighbouring voxels, shared by all three axes.
    voxel_width: f32,

    /// Samples indexed by `(z, y, x)` with x varying fastest.
    values: Vec<f32>,
}

impl Grid {
    /// Construct a grid, checking that `values` covers exactly `dims` voxels and that the voxel
    /// width is usable.
    pub fn new(
        dims: [usize; 3],
        origin: Point3<f32>,
        voxel_width: f32,
        values: Vec<f32>,
    ) -> Result<Self> {
        let [nx, ny, nz] = dims;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::Dimensions(nx, ny, nz));
        }

        if !(voxel_width > 0.0 && voxel_width.is_finite()) {
            return Err(Error::VoxelWidth(voxel_width));
        }

        let expected = nx * ny * nz;
        if values.len() != expected {
            return Err(Error::GridSize {
                expected,
                actual: values.len(),
            });
        }

        Ok(Grid {
            dims,
            origin,
            voxel_width,
            values,
        })
    }

    /// Build a grid by evaluating `field` at the world-space position of every voxel.
    pub fn from_fn<F>(
        dims: [usize; 3],
        origin: Point3<f32>,
        voxel_width: f32,
        field: F,
    ) -> Result<Self>
    where
        F: Fn(&Point3<f32>) -> f32,
    {
        let [nx, ny, nz] = dims;
        let mut values = Vec::with_capacity(nx * ny * nz);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let p = origin + Vector3::new(x as f32, y as f32, z as f32) * voxel_width;
                    values.push(field(&p));
                }
            }
        }

        Self::new(dims, origin, voxel_width, values)
    }

    /// A cube of `dim` voxels per side holding the exact distance to a sphere.
    pub fn sphere(
        dim: usize,
        origin: Point3<f32>,
        voxel_width: f32,
        center: Point3<f32>,
        radius: f32,
    ) -> Result<Self> {
        Self::from_fn([dim; 3], origin, voxel_width, |p| (p - center).norm() - radius)
    }

    /// Embed the grid in a cube whose side is the largest of its dimensions, filling the new cells
    /// with `fill`. The origin and voxel width are unchanged.
    pub fn pad_to_cube(self, fill: f32) -> Self {
        let [nx, ny, nz] = self.dims;
        let side = nx.max(ny).max(nz);
        if nx == side && ny == side && nz == side {
            return self;
        }

        debug!("padding {}x{}x{} grid to {}^3", nx, ny, nz, side);

        let mut values = vec![fill; side * side * side];
        for z in 0..nz {
            for y in 0..ny {
                let src = self.index(0, y, z);
                let dst = (z * side + y) * side;
                values[dst..dst + nx].copy_from_slice(&self.values[src..src + nx]);
            }
        }

        Grid {
            dims: [side; 3],
            origin: self.origin,
            voxel_width: self.voxel_width,
            values,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn origin(&self) -> &Point3<f32> {
        &self.origin
    }

    pub fn voxel_width(&self) -> f32 {
        self.voxel_width
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// The world-space box spanned by the voxel centers.
    pub fn bounds(&self) -> Bounds3 {
        let extent = Vector3::new(
            (self.dims[0] - 1) as f32,
            (self.dims[1] - 1) as f32,
            (self.dims[2] - 1) as f32,
        ) * self.voxel_width;
        Bounds3::new(self.origin, self.origin + extent)
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    /// The stored sample at a lattice index.
    #[inline]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Trilinearly interpolate the field at a world-space point. Points outside the lattice
    /// report [`FAR_DISTANCE`].
    pub fn sample(&self, point: &Point3<f32>) -> f32 {
        let voxel = (point - self.origin) / self.voxel_width;

        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut frac = [0f32; 3];
        for axis in 0..3 {
            let last = self.dims[axis] - 1;
            let limit = last as f32;
            let c = voxel[axis];

            // Written so that NaN coordinates also land outside.
            if !(c >= -EDGE_SLACK && c <= limit + EDGE_SLACK) {
                return FAR_DISTANCE;
            }

            let c = c.max(0.0).min(limit);
            let i = (c.floor() as usize).min(last);
            lo[axis] = i;
            hi[axis] = (i + 1).min(last);
            frac[axis] = c - i as f32;
        }

        let [x0, y0, z0] = lo;
        let [x1, y1, z1] = hi;
        let [fx, fy, fz] = frac;

        let c00 = self.value(x0, y0, z0).mix(self.value(x1, y0, z0), fx);
        let c10 = self.value(x0, y1, z0).mix(self.value(x1, y1, z0), fx);
        let c01 = self.value(x0, y0, z1).mix(self.value(x1, y0, z1), fx);
        let c11 = self.value(x0, y1, z1).mix(self.value(x1, y1, z1), fx);

        let c0 = c00.mix(c10, fy);
        let c1 = c01.mix(c11, fy);

        c0.mix(c1, fz)
    }
}
