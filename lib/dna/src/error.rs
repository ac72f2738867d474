use dnacalib_common::IndexOutOfRange;

use crate::LayerBitmask;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed header, length prefix, section order, or payload.
    #[error("corrupt format at byte {offset}: {reason}")]
    CorruptFormat { offset: usize, reason: String },
    #[error("unsupported version: generation {generation}, version {version}")]
    UnsupportedVersion { generation: u16, version: u16 },
    #[error(transparent)]
    IndexOutOfRange(#[from] IndexOutOfRange),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Cross-references are individually in range but inconsistent with each other.
    #[error("referential violation: {0}")]
    ReferentialViolation(String),
    #[error("layer not loaded: {0:?}")]
    LayerNotLoaded(LayerBitmask),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "json")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[inline]
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptFormat {
            offset,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange(IndexOutOfRange { kind, index, len })
    }

    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
