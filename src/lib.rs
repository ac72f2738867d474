//! Structural edit commands over layered rig descriptions.
//!
//! Commands ([Command]) edit a [Dna] in place while keeping its cross-references consistent;
//! a [CommandSequence] runs several of them, in order, on one working copy.
//!
//! ```ignore
//! let mut dna = dna::load("rig.dna", DataLayer::All)?;
//! let mut edits = CommandSequence::new();
//! edits
//!     .add(RenameCommand::joint(JointIndex(1), "NewNeck"))
//!     .add(ScaleCommand::new(2.0, Vector3::zeros()));
//! edits.run(&mut dna)?;
//! Writer::new().set_from(&dna).write("edited.dna")?;
//! ```
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod command;
pub mod commands;
pub mod error;
pub mod geom;

pub use command::*;
pub use commands::*;
pub use error::{Error, Result};

pub use dna::{self, Dna};
