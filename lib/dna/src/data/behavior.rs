use dnacalib_common::{bitvec::prelude::*, Remap};
use serde::{Deserialize, Serialize};

use crate::{BlendShapeChannelIndex, JointIndex, TypedIndex};

/// Number of rows each joint occupies in joint-group matrices: translation, rotation, and scale,
/// three components each.
pub const JOINT_ATTRIBUTE_COUNT: u16 = 9;

/// Control wiring and sparse joint corrections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Behavior {
    pub controls: Controls,
    pub joints: JointBehavior,
    pub blend_shape_channels: BlendShapeChannelBehavior,
    pub animated_maps: AnimatedMapBehavior,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Controls {
    pub psd_count: u16,
    /// Maps GUI controls onto raw controls.
    pub conditionals: ConditionalTable,
    pub psds: PsdMatrix,
}

/// One piecewise-linear segment: within `from..=to` of `input`, contribute `slope * x + cut` to
/// `output`.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conditional {
    pub input: u16,
    pub output: u16,
    pub from: f32,
    pub to: f32,
    pub slope: f32,
    pub cut: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalTable {
    pub rows: Vec<Conditional>,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PsdEntry {
    pub row: u16,
    pub col: u16,
    pub value: f32,
}

/// Sparse matrix combining raw controls into pose-space deformation inputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PsdMatrix {
    pub entries: Vec<PsdEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointBehavior {
    /// Size of the joint-attribute output space; `joint count * JOINT_ATTRIBUTE_COUNT`.
    pub row_count: u16,
    /// Size of the control input space.
    pub col_count: u16,
    pub groups: Vec<JointGroup>,
}

/// A dense block of the joint correction matrix.
///
/// Row `r` maps the inputs in `input_indices` onto joint attribute `output_indices[r]`; rows are
/// ordered so that each level of detail uses a prefix of them.
///
/// # Invariants
///
/// * `values.len() == output_indices.len() * input_indices.len()`
/// * `lods[l] <= output_indices.len()`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointGroup {
    /// Number of rows used by each level of detail.
    pub lods: Vec<u16>,
    pub input_indices: Vec<u16>,
    /// Joint attribute of each row: `joint * JOINT_ATTRIBUTE_COUNT + attribute`.
    pub output_indices: Vec<u16>,
    /// Row-major `output_indices.len() × input_indices.len()` values.
    pub values: Vec<f32>,
    /// Joints this group drives.
    pub joint_indices: Vec<JointIndex>,
}

impl JointGroup {
    #[inline]
    pub fn row_count(&self) -> usize {
        self.output_indices.len()
    }

    #[inline]
    pub fn col_count(&self) -> usize {
        self.input_indices.len()
    }

    /// The values of row `r`.
    pub fn row(&self, r: usize) -> &[f32] {
        let cols = self.col_count();
        self.values
            .get(r * cols..(r + 1) * cols)
            .unwrap_or_default()
    }

    /// Rewrite each row's output attribute with `f`, dropping rows for which it returns [None].
    ///
    /// Per-level row counts are recomputed so that each level keeps exactly its surviving rows.
    pub fn retain_rows(&mut self, mut f: impl FnMut(u16) -> Option<u16>) {
        let mut keep = BitVec::<usize, Lsb0>::with_capacity(self.row_count());
        let mut outputs = Vec::with_capacity(self.row_count());
        let mut values = Vec::with_capacity(self.values.len());
        for (r, &out) in self.output_indices.iter().enumerate() {
            match f(out) {
                Some(new) => {
                    keep.push(true);
                    outputs.push(new);
                    values.extend_from_slice(self.row(r));
                }
                None => keep.push(false),
            }
        }
        retain_prefixed(&mut self.lods, &keep);
        self.output_indices = outputs;
        self.values = values;
    }

    /// Keep only `levels` (in order), then drop rows no remaining level uses.
    pub fn retain_levels(&mut self, levels: &[u16]) {
        select_levels(&mut self.lods, levels);
        let rows = self.lods.iter().copied().max().unwrap_or(0) as usize;
        self.output_indices.truncate(rows);
        self.values.truncate(rows * self.col_count());
    }
}

impl JointBehavior {
    /// Compact the joint table: rows of removed joints are dropped, and the rest renumbered.
    pub fn remap_joints(&mut self, remap: &Remap) {
        let attrs = usize::from(JOINT_ATTRIBUTE_COUNT);
        for group in self.groups.iter_mut() {
            group.retain_rows(|out| {
                let out = usize::from(out);
                // joints only move down, so the new row never exceeds the old one
                remap
                    .get(out / attrs)
                    .and_then(|joint| u16::try_from(joint * attrs + out % attrs).ok())
            });
            remap.remap_list(&mut group.joint_indices);
        }
        let removed_rows = (remap.len_before() - remap.len_after()).saturating_mul(attrs);
        let rows = usize::from(self.row_count).saturating_sub(removed_rows);
        self.row_count = u16::try_from(rows).unwrap_or(self.row_count);
    }

    /// Drop every row driving `joint`, leaving the joint itself in place.
    pub fn remove_joint_rows(&mut self, joint: JointIndex) {
        let attrs = JOINT_ATTRIBUTE_COUNT;
        for group in self.groups.iter_mut() {
            group.retain_rows(|out| (out / attrs != joint.0).then_some(out));
            group.joint_indices.retain(|&j| j != joint);
        }
    }

    pub fn retain_levels(&mut self, levels: &[u16]) {
        for group in self.groups.iter_mut() {
            group.retain_levels(levels);
        }
    }
}

/// Drives blend-shape channels from controls; level `l` uses the first `lods[l]` entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendShapeChannelBehavior {
    pub lods: Vec<u16>,
    pub input_indices: Vec<u16>,
    pub output_indices: Vec<BlendShapeChannelIndex>,
}

impl BlendShapeChannelBehavior {
    /// Compact the channel table: entries for removed channels are dropped, and the rest renumbered.
    pub fn remap_channels(&mut self, remap: &Remap) {
        let mut keep = BitVec::<usize, Lsb0>::with_capacity(self.output_indices.len());
        let mut inputs = Vec::with_capacity(self.input_indices.len());
        let mut outputs = Vec::with_capacity(self.output_indices.len());
        for (&input, &output) in self.input_indices.iter().zip(&self.output_indices) {
            match remap.index(output) {
                Some(new) => {
                    keep.push(true);
                    inputs.push(input);
                    outputs.push(new);
                }
                None => keep.push(false),
            }
        }
        retain_prefixed(&mut self.lods, &keep);
        self.input_indices = inputs;
        self.output_indices = outputs;
    }

    pub fn retain_levels(&mut self, levels: &[u16]) {
        select_levels(&mut self.lods, levels);
        let used = self.lods.iter().copied().max().unwrap_or(0) as usize;
        self.input_indices.truncate(used);
        self.output_indices.truncate(used);
    }

    /// Remove every entry, keeping one (zero) row count per level.
    pub fn clear(&mut self) {
        self.lods.iter_mut().for_each(|l| *l = 0);
        self.input_indices.clear();
        self.output_indices.clear();
    }
}

/// Drives animated maps from controls; level `l` uses the first `lods[l]` conditional rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimatedMapBehavior {
    pub lods: Vec<u16>,
    /// Outputs are animated map indices.
    pub conditionals: ConditionalTable,
}

impl AnimatedMapBehavior {
    /// Compact the animated map table: rows for removed maps are dropped, and the rest renumbered.
    pub fn remap_animated_maps(&mut self, remap: &Remap) {
        let mut keep = BitVec::<usize, Lsb0>::with_capacity(self.conditionals.rows.len());
        self.conditionals.rows.retain_mut(|row| {
            let new = remap.get(row.output as usize);
            keep.push(new.is_some());
            match new {
                Some(new) => {
                    row.output = new as u16;
                    true
                }
                None => false,
            }
        });
        retain_prefixed(&mut self.lods, &keep);
    }

    pub fn retain_levels(&mut self, levels: &[u16]) {
        select_levels(&mut self.lods, levels);
        let used = self.lods.iter().copied().max().unwrap_or(0) as usize;
        self.conditionals.rows.truncate(used);
    }
}

impl Behavior {
    pub fn retain_levels(&mut self, levels: &[u16]) {
        self.joints.retain_levels(levels);
        self.blend_shape_channels.retain_levels(levels);
        self.animated_maps.retain_levels(levels);
    }
}

/// Recompute prefix counts after some entries were dropped: each level keeps the survivors of
/// its old prefix.
fn retain_prefixed(lods: &mut [u16], keep: &BitSlice) {
    for lod in lods.iter_mut() {
        let end = (*lod as usize).min(keep.len());
        *lod = keep[..end].count_ones() as u16;
    }
}

/// Keep only the per-level values at `levels`, in the order given.
fn select_levels(lods: &mut Vec<u16>, levels: &[u16]) {
    *lods = levels
        .iter()
        .filter_map(|&l| lods.get(l as usize).copied())
        .collect();
}

#[cfg(test)]
mod test {
    use super::*;

    fn group() -> JointGroup {
        // joints 1 and 2, two inputs; level 0 uses all rows, level 1 the first two
        JointGroup {
            lods: vec![4, 2],
            input_indices: vec![0, 1],
            output_indices: vec![9, 18, 10, 19],
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            joint_indices: vec![JointIndex(1), JointIndex(2)],
        }
    }

    #[test]
    fn remap_drops_rows_of_removed_joint() {
        let mut joints = JointBehavior {
            row_count: 27,
            col_count: 2,
            groups: vec![group()],
        };
        joints.remap_joints(&Remap::removing(3, 1));
        let g = &joints.groups[0];
        assert_eq!(joints.row_count, 18);
        assert_eq!(g.output_indices, vec![9, 10]);
        assert_eq!(g.values, vec![3.0, 4.0, 7.0, 8.0]);
        assert_eq!(g.lods, vec![2, 1]);
        assert_eq!(g.joint_indices, vec![JointIndex(1)]);
    }

    #[test]
    fn remap_many_joints() {
        let mut joints = JointBehavior {
            row_count: u16::MAX,
            col_count: 1,
            groups: vec![JointGroup {
                lods: vec![2],
                input_indices: vec![0],
                output_indices: vec![7000 * 9 + 2, 9],
                values: vec![1.0, 2.0],
                joint_indices: vec![JointIndex(7000), JointIndex(1)],
            }],
        };
        joints.remap_joints(&Remap::retaining(7300, |j| j == 0 || j == 7000));
        let g = &joints.groups[0];
        assert_eq!(joints.row_count, 0);
        assert_eq!(g.output_indices, vec![11]);
        assert_eq!(g.values, vec![1.0]);
        assert_eq!(g.lods, vec![1]);
        assert_eq!(g.joint_indices, vec![JointIndex(1)]);
    }

    #[test]
    fn remove_rows_keeps_joint() {
        let mut joints = JointBehavior {
            row_count: 27,
            col_count: 2,
            groups: vec![group()],
        };
        joints.remove_joint_rows(JointIndex(2));
        let g = &joints.groups[0];
        assert_eq!(joints.row_count, 27);
        assert_eq!(g.output_indices, vec![9, 10]);
        assert_eq!(g.row(1), &[5.0, 6.0]);
        assert_eq!(g.joint_indices, vec![JointIndex(1)]);
    }

    #[test]
    fn retain_levels_truncates() {
        let mut g = group();
        g.retain_levels(&[1]);
        assert_eq!(g.lods, vec![2]);
        assert_eq!(g.output_indices, vec![9, 18]);
        assert_eq!(g.values.len(), 4);
    }

    #[test]
    fn channel_and_map_compaction() {
        let mut channels = BlendShapeChannelBehavior {
            lods: vec![3, 1],
            input_indices: vec![5, 6, 7],
            output_indices: vec![
                BlendShapeChannelIndex(0),
                BlendShapeChannelIndex(1),
                BlendShapeChannelIndex(2),
            ],
        };
        channels.remap_channels(&Remap::removing(3, 0));
        assert_eq!(channels.lods, vec![2, 0]);
        assert_eq!(channels.input_indices, vec![6, 7]);
        assert_eq!(
            channels.output_indices,
            vec![BlendShapeChannelIndex(0), BlendShapeChannelIndex(1)]
        );

        let row = |output| Conditional {
            output,
            to: 1.0,
            slope: 1.0,
            ..Default::default()
        };
        let mut maps = AnimatedMapBehavior {
            lods: vec![3, 2],
            conditionals: ConditionalTable {
                rows: vec![row(0), row(1), row(2)],
            },
        };
        maps.remap_animated_maps(&Remap::removing(3, 1));
        assert_eq!(maps.lods, vec![2, 1]);
        assert_eq!(
            maps.conditionals.rows.iter().map(|r| r.output).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }
}
