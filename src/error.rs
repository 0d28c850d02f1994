use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("grid has {actual} values, but its dimensions require {expected}")]
    GridSize { expected: usize, actual: usize },

    #[error("voxel width must be positive and finite, got {0}")]
    VoxelWidth(f32),

    #[error("grid dimensions must all be positive, got {0}x{1}x{2}")]
    Dimensions(usize, usize, usize),

    #[error("ray direction must be finite and non-zero")]
    Direction,

    #[error("invalid march configuration: {0}")]
    MarchConfig(&'static str),

    #[error("image resolution must be positive, got {0}x{1}")]
    Resolution(u32, u32),

    #[error("vti error: {0}")]
    Vti(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
