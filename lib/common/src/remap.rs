use bitvec::prelude::*;

use crate::TypedIndex;

/// Old-index → new-index table for compacting a table after removing some of its elements.
///
/// Every compacting edit (removing a joint, dropping levels of detail, ...) builds one of these
/// from a keep-mask and pushes all cross-references through it, rather than shifting indices by
/// hand.
///
/// # Invariants
///
/// * `targets[i] == Some(j)` ⟺ element `i` survives and becomes element `j`
/// * surviving elements keep their relative order
/// * `kept` == number of `Some` entries in `targets`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    targets: Vec<Option<usize>>,
    kept: usize,
}

impl Remap {
    /// A remap which keeps every element of a table of length `len`.
    pub fn identity(len: usize) -> Self {
        Self {
            targets: (0..len).map(Some).collect(),
            kept: len,
        }
    }

    /// Construct from a keep-mask; `keep[i]` is true if element `i` survives.
    pub fn from_keep(keep: &BitSlice) -> Self {
        let mut kept = 0;
        let targets = keep
            .iter()
            .by_vals()
            .map(|k| {
                k.then(|| {
                    kept += 1;
                    kept - 1
                })
            })
            .collect();
        Self { targets, kept }
    }

    /// Keep the elements of `0..len` for which `pred` returns true.
    pub fn retaining(len: usize, mut pred: impl FnMut(usize) -> bool) -> Self {
        let keep: BitVec = (0..len).map(&mut pred).collect();
        Self::from_keep(&keep)
    }

    /// Remove exactly one element from a table of length `len`.
    ///
    /// If `index >= len`, nothing is removed.
    pub fn removing(len: usize, index: usize) -> Self {
        Self::retaining(len, |i| i != index)
    }

    /// Length of the table before compaction.
    #[inline]
    pub fn len_before(&self) -> usize {
        self.targets.len()
    }

    /// Length of the table after compaction.
    #[inline]
    pub fn len_after(&self) -> usize {
        self.kept
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.kept == self.targets.len()
    }

    #[inline]
    pub fn is_kept(&self, old: usize) -> bool {
        self.get(old).is_some()
    }

    /// The new position of element `old`, or [None] if it was removed (or was never in range).
    #[inline]
    pub fn get(&self, old: usize) -> Option<usize> {
        self.targets.get(old).copied().flatten()
    }

    /// Typed version of [Remap::get].
    #[inline]
    pub fn index<I: TypedIndex>(&self, old: I) -> Option<I> {
        self.get(old.get()).and_then(I::try_from_usize)
    }

    /// For each new position, the old position it came from.
    pub fn origins(&self) -> Vec<usize> {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(old, new)| new.map(|_| old))
            .collect()
    }

    /// Drop removed elements from a table, preserving the order of survivors.
    ///
    /// Elements beyond [Remap::len_before] are treated as removed.
    pub fn compact<T>(&self, items: &mut Vec<T>) {
        let mut i = 0;
        items.retain(|_| {
            i += 1;
            self.is_kept(i - 1)
        });
    }

    /// Rewrite a list of references into the compacted table: references to removed elements are
    /// dropped, and the rest are renumbered.
    pub fn remap_list<I: TypedIndex>(&self, list: &mut Vec<I>) {
        list.retain_mut(|idx| match self.index(*idx) {
            Some(new) => {
                *idx = new;
                true
            }
            None => false,
        });
    }
}
