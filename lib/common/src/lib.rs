//! Index plumbing shared by the `dna` container crate and the `dnacalib` command engine.

use num_traits::{AsPrimitive, Bounded, FromPrimitive, PrimInt};

pub mod macros;
mod remap;

pub use remap::*;

// reexport so callers can build keep-masks without naming bitvec themselves
pub use bitvec;

/// Trait for primitive types which can act as indices within an array (or an array-like structure).
pub trait ArrayIndex:
    PrimInt + AsPrimitive<usize> + FromPrimitive + std::fmt::Debug + std::fmt::Display + 'static
{
}
impl<P> ArrayIndex for P where
    P: PrimInt
        + AsPrimitive<usize>
        + FromPrimitive
        + std::fmt::Debug
        + std::fmt::Display
        + 'static
{
}

/// Raised whenever an index is checked against a table it doesn't fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} index out of range: 0..{len} ∌ {index}")]
pub struct IndexOutOfRange {
    pub kind: &'static str,
    pub index: usize,
    pub len: usize,
}

/// An index into one specific kind of table.
///
/// Implementations are generated by [typed_index]; a `JointIndex` and a `MeshIndex` share a
/// representation but can't be mixed up.
pub trait TypedIndex:
    Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display + 'static
{
    type Repr: ArrayIndex;

    /// Human-readable name of the indexed table, used in error messages.
    const KIND: &'static str;

    fn from_raw(raw: Self::Repr) -> Self;

    fn raw(self) -> Self::Repr;

    #[inline]
    fn get(self) -> usize {
        self.raw().as_()
    }

    /// Construct from a `usize`, or [None] if it doesn't fit within [Self::Repr].
    #[inline]
    fn try_from_usize(index: usize) -> Option<Self> {
        Self::Repr::from_usize(index).map(Self::from_raw)
    }

    /// Construct from a `usize`.
    ///
    /// # Errors
    /// * `index` doesn't fit within [Self::Repr]
    #[inline]
    fn from_usize(index: usize) -> Result<Self, IndexOutOfRange> {
        Self::try_from_usize(index).ok_or(IndexOutOfRange {
            kind: Self::KIND,
            index,
            len: Self::Repr::max_value().as_() + 1,
        })
    }

    /// Ensure `self` refers to an element of a table of length `len`.
    #[inline]
    fn check(self, len: usize) -> Result<Self, IndexOutOfRange> {
        if self.get() < len {
            Ok(self)
        } else {
            Err(IndexOutOfRange {
                kind: Self::KIND,
                index: self.get(),
                len,
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    crate::typed_index! {
        /// Test index.
        pub struct ThingIndex(u16) => "thing";
    }

    #[test]
    fn check_bounds() {
        assert_eq!(ThingIndex(3).check(4), Ok(ThingIndex(3)));
        assert_eq!(
            ThingIndex(4).check(4),
            Err(IndexOutOfRange {
                kind: "thing",
                index: 4,
                len: 4
            })
        );
    }

    #[test]
    fn usize_conversion() {
        assert_eq!(ThingIndex::try_from_usize(12), Some(ThingIndex(12)));
        assert_eq!(ThingIndex::try_from_usize(u16::MAX as usize + 1), None);
        assert!(ThingIndex::from_usize(70_000).is_err());
        assert_eq!(ThingIndex(9).get(), 9);
        assert_eq!(ThingIndex(9).to_string(), "9");
    }
}
