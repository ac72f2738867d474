//! Texture-space primitives used to carry positions between levels of detail.

mod bounding_box;
mod triangle;

pub use bounding_box::*;
pub use triangle::*;
