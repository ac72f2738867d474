//! The edit commands.
//!
//! Every command keeps the model's cross-references consistent: commands that remove entities
//! build a [Remap](dna::Remap) and push every reference to the compacted table through it.

mod blend_shapes;
mod compact;
mod lods;
mod lower_lods;
mod neutral;
mod remove;
mod rename;
mod skin;
mod transform;
mod vertices;

pub use blend_shapes::*;
pub use lods::*;
pub use lower_lods::*;
pub use neutral::*;
pub use remove::*;
pub use rename::*;
pub use skin::*;
pub use transform::*;
pub use vertices::*;
