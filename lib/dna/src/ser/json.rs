//! The JSON debug mirror: the same model as the binary container, in readable form.
//!
//! Layers outside the mask are written as `null`.

use std::io::Write;

use crate::{Dna, LayerBitmask, Result};

/// Pretty-print the layers of `dna` selected by `mask`.
pub fn to_string(dna: &Dna, mask: impl Into<LayerBitmask>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&dna.restrict(mask))?)
}

/// Pretty-print the layers of `dna` selected by `mask` into `writer`.
pub fn to_writer(writer: impl Write, dna: &Dna, mask: impl Into<LayerBitmask>) -> Result<()> {
    serde_json::to_writer_pretty(writer, &dna.restrict(mask))?;
    Ok(())
}
