use dna::{Dna, LayersMut, Remap};

use super::compact::{compact_animated_maps, compact_channels, compact_joints, compact_meshes};
use crate::{Command, Error, Result};

/// Keep only the given levels of detail, renumbered from 0 in their original order.
///
/// Entities that belong to none of the kept levels are removed, and every reference to them
/// compacted away. The root joint is always kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetLodsCommand {
    pub levels: Vec<u16>,
}

impl SetLodsCommand {
    pub fn new(levels: impl IntoIterator<Item = u16>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }
}

impl Command for SetLodsCommand {
    /// # Errors
    /// * [InvalidOperation](dna::Error::InvalidOperation) if no levels are given, or any given
    ///   level doesn't exist
    #[tracing::instrument(level = "debug", skip_all, fields(levels = ?self.levels))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let def = dna.try_definition()?;
        let lod_count = def.lod_count();
        let mut levels = self.levels.clone();
        levels.sort_unstable();
        levels.dedup();
        let Some(&lowest) = levels.first() else {
            return Err(Error::invalid("at least one level of detail must be kept"));
        };
        if let Some(&l) = levels.iter().find(|&&l| l as usize >= lod_count) {
            return Err(Error::invalid(format!(
                "level of detail {l} doesn't exist; the model has {lod_count}"
            )));
        }

        let mut joints = def.lod_joint_mapping.membership(def.joint_count(), &levels);
        if let Some(mut root) = joints.get_mut(0) {
            *root = true;
        }
        let joints = Remap::from_keep(&joints);
        let meshes = Remap::from_keep(&def.lod_mesh_mapping.membership(def.mesh_count(), &levels));
        let channels = Remap::from_keep(
            &def.lod_blend_shape_mapping
                .membership(def.blend_shape_channel_count(), &levels),
        );
        let animated_maps = Remap::from_keep(
            &def.lod_animated_map_mapping
                .membership(def.animated_map_count(), &levels),
        );

        let LayersMut {
            descriptor,
            definition,
            behavior,
            ..
        } = dna.layers_mut();
        if let Some(def) = definition {
            def.lod_joint_mapping.retain_levels(&levels);
            def.lod_mesh_mapping.retain_levels(&levels);
            def.lod_blend_shape_mapping.retain_levels(&levels);
            def.lod_animated_map_mapping.retain_levels(&levels);
        }
        if let Some(behavior) = behavior {
            behavior.retain_levels(&levels);
        }
        if let Some(descriptor) = descriptor {
            descriptor.lod_count = levels.len() as u16;
            descriptor.max_lod = descriptor.max_lod.saturating_add(lowest);
        }

        compact_joints(dna, &joints)?;
        compact_meshes(dna, &meshes)?;
        compact_channels(dna, &channels)?;
        compact_animated_maps(dna, &animated_maps)?;
        tracing::debug!(
            joints = joints.len_after(),
            meshes = meshes.len_after(),
            channels = channels.len_after(),
            animated_maps = animated_maps.len_after(),
            "kept"
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, JointIndex, MeshIndex};

    #[test]
    fn keep_lowest_detail() {
        let rig = SetLodsCommand::new([1]).apply(fixture::rig()).unwrap();
        let def = rig.definition().unwrap();
        assert_eq!(def.lod_count(), 1);
        assert_eq!(def.joint_names, ["spine", "neck", "head"]);
        assert_eq!(def.mesh_names, ["head_lod1_mesh"]);
        assert_eq!(def.blend_shape_channel_names, ["jaw_open"]);
        assert_eq!(def.animated_map_names, ["wrinkle_forehead"]);
        assert_eq!(def.lod_mesh_mapping.entities_for_level(0), &[MeshIndex(0)]);

        let desc = rig.descriptor().unwrap();
        assert_eq!((desc.lod_count, desc.max_lod), (1, 1));

        let behavior = rig.behavior().unwrap();
        assert_eq!(behavior.joints.groups[0].lods, vec![1]);
        assert_eq!(behavior.joints.groups[0].joint_indices, vec![JointIndex(2)]);
        assert_eq!(behavior.blend_shape_channels.lods, vec![1]);
        assert_eq!(behavior.animated_maps.lods, vec![1]);
        assert_eq!(rig.blend_shapes().unwrap().targets.len(), 1);
        rig.validate().unwrap();
    }

    #[test]
    fn keeping_everything_changes_nothing() {
        let rig = SetLodsCommand::new([1, 0, 1]).apply(fixture::rig()).unwrap();
        assert_eq!(rig, fixture::rig());
    }

    #[test]
    fn invalid_levels() {
        let mut rig = fixture::rig();
        for levels in [vec![], vec![0, 2]] {
            assert!(matches!(
                SetLodsCommand::new(levels).run(&mut rig),
                Err(Error::Dna(dna::Error::InvalidOperation(_)))
            ));
        }
        assert_eq!(rig, fixture::rig());
    }
}
