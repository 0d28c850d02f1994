pub mod bounds;
pub mod camera;
pub mod config;
pub mod depth;
pub mod encode;
pub mod error;
pub mod grid;
pub mod march;
pub mod math;
pub mod ray;
pub mod render;
pub mod vti;

pub use error::{Error, Result};
