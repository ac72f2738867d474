use dnacalib_common::IndexOutOfRange;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dna(#[from] dna::Error),
    /// A command within a [CommandSequence](crate::CommandSequence) failed; the commands before
    /// it remain applied.
    #[error("command {index} ({command}) failed")]
    Sequence {
        index: usize,
        command: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl From<IndexOutOfRange> for Error {
    #[inline]
    fn from(e: IndexOutOfRange) -> Self {
        Self::Dna(e.into())
    }
}

impl Error {
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Dna(dna::Error::invalid(msg))
    }

    #[inline]
    pub fn out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        Self::Dna(dna::Error::out_of_range(kind, index, len))
    }

    /// The underlying container error, looking through [Error::Sequence].
    pub fn root(&self) -> &dna::Error {
        match self {
            Error::Dna(e) => e,
            Error::Sequence { source, .. } => source.root(),
        }
    }
}
