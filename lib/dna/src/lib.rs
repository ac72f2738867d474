//! Layered rig-description container.
//!
//! A container holds four cumulative layers of data describing one character rig:
//!
//! * [Descriptor]: a cheap summary (name, units, level-of-detail count, ...)
//! * [Definition]: entity tables (joints, meshes, blend-shape channels, animated maps), their
//!   per-level-of-detail membership, and the neutral joint pose
//! * [Behavior]: control wiring and sparse joint corrections
//! * [Geometry] (and its [BlendShapes]): neutral meshes, skinning, and blend-shape deltas
//!
//! Any subset of the layers may be loaded; see [DataLayer] and [Dna::read].
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod codec;
pub mod de;
pub mod error;
pub mod file;
pub mod ser;

mod data;
mod index;
mod layer;
mod lod;
mod model;
mod reference;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use data::*;
pub use error::{Error, Result};
pub use file::{load, DnaFile, Writer};
pub use index::*;
pub use layer::*;
pub use lod::*;
pub use model::*;
pub use reference::*;

pub use dnacalib_common::{IndexOutOfRange, Remap, TypedIndex};
