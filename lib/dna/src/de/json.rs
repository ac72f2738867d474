//! Reading back the JSON debug mirror.

use std::io::Read;

use crate::{Dna, Result};

/// Parse a model from its JSON mirror, then check its cross-references.
///
/// # Errors
/// * [Error::Json](crate::Error::Json) if `s` isn't a well-formed mirror
/// * [Error::IndexOutOfRange](crate::Error::IndexOutOfRange) or
///   [Error::ReferentialViolation](crate::Error::ReferentialViolation) if the parsed model is
///   inconsistent
pub fn from_str(s: &str) -> Result<Dna> {
    let res: Dna = serde_json::from_str(s)?;
    res.validate()?;
    Ok(res)
}

pub fn from_reader(reader: impl Read) -> Result<Dna> {
    let res: Dna = serde_json::from_reader(reader)?;
    res.validate()?;
    Ok(res)
}
