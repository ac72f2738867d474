use dnacalib_common::{bitvec::vec::BitVec, Remap, TypedIndex};
use serde::{Deserialize, Serialize};

/// Per-level-of-detail membership lists for one kind of entity.
///
/// Levels may share a list, so the mapping stores each distinct list once and a per-level
/// position into them. Lists are **not** required to nest: a coarser level isn't necessarily a
/// subset of a finer one.
///
/// # Invariants
///
/// * `lods[l] < lists.len()` for every level `l` (checked by
///   [ReferenceIndex::validate](crate::ReferenceIndex::validate))
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "I: Serialize", deserialize = "I: Deserialize<'de>"))]
pub struct LodMapping<I> {
    lods: Vec<u16>,
    lists: Vec<Vec<I>>,
}

impl<I> Default for LodMapping<I> {
    fn default() -> Self {
        Self {
            lods: Vec::default(),
            lists: Vec::default(),
        }
    }
}

impl<I: TypedIndex> LodMapping<I> {
    /// Build a mapping from one membership list per level, sharing identical lists.
    pub fn from_levels(levels: impl IntoIterator<Item = Vec<I>>) -> Self {
        let mut res = Self::default();
        for level in levels {
            let pos = match res.lists.iter().position(|l| *l == level) {
                Some(pos) => pos,
                None => {
                    res.lists.push(level);
                    res.lists.len() - 1
                }
            };
            res.lods.push(pos as u16);
        }
        res
    }

    /// Construct without sharing or validating anything; used by decoders.
    #[inline]
    pub fn from_raw_parts(lods: Vec<u16>, lists: Vec<Vec<I>>) -> Self {
        Self { lods, lists }
    }

    /// For each level, the position of its membership list within [LodMapping::lists].
    #[inline]
    pub fn lods(&self) -> &[u16] {
        &self.lods
    }

    #[inline]
    pub fn lists(&self) -> &[Vec<I>] {
        &self.lists
    }

    #[inline]
    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    /// Iterate through each level's membership list, from level 0 (most detailed) up.
    pub fn levels(&self) -> impl Iterator<Item = &[I]> + '_ {
        self.lods.iter().map(|&pos| {
            self.lists
                .get(pos as usize)
                .map(Vec::as_slice)
                .unwrap_or_default()
        })
    }

    /// The entities belonging to `level`; empty if `level` doesn't exist.
    pub fn entities_for_level(&self, level: u16) -> &[I] {
        self.lods
            .get(level as usize)
            .and_then(|&pos| self.lists.get(pos as usize))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The most detailed level containing any of `entities`.
    pub fn lowest_level_containing(&self, entities: &[I]) -> Option<u16> {
        self.levels()
            .position(|level| level.iter().any(|e| entities.contains(e)))
            .map(|l| l as u16)
    }

    /// For each level, those of `entities` which belong to it, in the order given.
    pub fn partition_by_level(&self, entities: &[I]) -> Vec<Vec<I>> {
        self.levels()
            .map(|level| {
                entities
                    .iter()
                    .copied()
                    .filter(|e| level.contains(e))
                    .collect()
            })
            .collect()
    }

    /// Whether `entity` belongs to any level.
    pub fn is_member(&self, entity: I) -> bool {
        self.levels().any(|level| level.contains(&entity))
    }

    /// Bit `i` is set if entity `i` belongs to any of `levels`.
    ///
    /// Levels beyond [LodMapping::lod_count] are ignored.
    pub fn membership(&self, entity_count: usize, levels: &[u16]) -> BitVec {
        let mut res = BitVec::repeat(false, entity_count);
        for &level in levels {
            for e in self.entities_for_level(level) {
                if let Some(mut bit) = res.get_mut(e.get()) {
                    *bit = true;
                }
            }
        }
        res
    }

    /// Keep only `levels` (in the order given), renumbering them from 0, and drop lists no
    /// longer referenced by any level.
    pub fn retain_levels(&mut self, levels: &[u16]) {
        let kept: Vec<Vec<I>> = levels
            .iter()
            .map(|&l| self.entities_for_level(l).to_vec())
            .collect();
        *self = Self::from_levels(kept);
    }

    /// Push every membership list through `remap`, dropping removed entities.
    pub fn remap(&mut self, remap: &Remap) {
        for list in self.lists.iter_mut() {
            remap.remap_list(list);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::JointIndex;

    fn j(v: &[u16]) -> Vec<JointIndex> {
        v.iter().copied().map(JointIndex).collect()
    }

    fn sample() -> LodMapping<JointIndex> {
        // level 2 isn't a subset of level 1
        LodMapping::from_levels([j(&[0, 1, 2, 3]), j(&[0, 1]), j(&[0, 3]), j(&[0, 1])])
    }

    #[test]
    fn shares_identical_lists() {
        let m = sample();
        assert_eq!(m.lod_count(), 4);
        assert_eq!(m.lists().len(), 3);
        assert_eq!(m.lods(), &[0, 1, 2, 1]);
    }

    #[test]
    fn queries() {
        let m = sample();
        assert_eq!(m.entities_for_level(2), j(&[0, 3]).as_slice());
        assert!(m.entities_for_level(9).is_empty());
        assert_eq!(m.lowest_level_containing(&j(&[3])), Some(0));
        assert_eq!(m.lowest_level_containing(&j(&[7])), None);
        assert_eq!(
            m.partition_by_level(&j(&[3, 1])),
            vec![j(&[3, 1]), j(&[1]), j(&[3]), j(&[1])]
        );
        assert!(m.is_member(JointIndex(2)));
        assert!(!m.is_member(JointIndex(4)));
    }

    #[test]
    fn membership_of_levels() {
        let m = sample();
        let bits = m.membership(5, &[1, 2]);
        assert_eq!(
            bits.iter().by_vals().collect::<Vec<_>>(),
            vec![true, true, false, true, false]
        );
    }

    #[test]
    fn retain_and_remap() {
        let mut m = sample();
        m.retain_levels(&[1, 2]);
        assert_eq!(m.lod_count(), 2);
        assert_eq!(m.entities_for_level(0), j(&[0, 1]).as_slice());
        assert_eq!(m.entities_for_level(1), j(&[0, 3]).as_slice());

        m.remap(&Remap::removing(4, 1));
        assert_eq!(m.entities_for_level(0), j(&[0]).as_slice());
        assert_eq!(m.entities_for_level(1), j(&[0, 2]).as_slice());
    }
}
