//! Decoders for the container and its debug mirror.

pub mod binary;
#[cfg(feature = "json")]
pub mod json;
