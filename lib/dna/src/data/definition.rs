use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    AnimatedMapIndex, BlendShapeChannelIndex, EntityKind, JointIndex, LodMapping, MeshIndex,
    TypedIndex,
};

/// Entity tables, their per-level-of-detail membership, and the neutral joint pose.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definition {
    pub gui_control_names: Vec<String>,
    pub raw_control_names: Vec<String>,
    pub joint_names: Vec<String>,
    pub blend_shape_channel_names: Vec<String>,
    pub animated_map_names: Vec<String>,
    pub mesh_names: Vec<String>,

    pub lod_joint_mapping: LodMapping<JointIndex>,
    pub lod_blend_shape_mapping: LodMapping<BlendShapeChannelIndex>,
    pub lod_animated_map_mapping: LodMapping<AnimatedMapIndex>,
    pub lod_mesh_mapping: LodMapping<MeshIndex>,

    /// Which blend-shape channels drive targets of which mesh.
    pub mesh_blend_shape_channel_mapping: Vec<(MeshIndex, BlendShapeChannelIndex)>,

    /// Parent of each joint; the root is its own parent.
    pub joint_hierarchy: Vec<JointIndex>,
    /// Parent-relative neutral translation of each joint.
    pub neutral_joint_translations: Vec<Vector3<f32>>,
    /// Parent-relative neutral rotation of each joint, as XYZ Euler angles.
    pub neutral_joint_rotations: Vec<Vector3<f32>>,
}

impl Definition {
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.mesh_names.len()
    }

    #[inline]
    pub fn blend_shape_channel_count(&self) -> usize {
        self.blend_shape_channel_names.len()
    }

    #[inline]
    pub fn animated_map_count(&self) -> usize {
        self.animated_map_names.len()
    }

    /// The names table of one kind of entity.
    pub fn names(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Joint => &self.joint_names,
            EntityKind::Mesh => &self.mesh_names,
            EntityKind::BlendShapeChannel => &self.blend_shape_channel_names,
            EntityKind::AnimatedMap => &self.animated_map_names,
        }
    }

    pub fn names_mut(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Joint => &mut self.joint_names,
            EntityKind::Mesh => &mut self.mesh_names,
            EntityKind::BlendShapeChannel => &mut self.blend_shape_channel_names,
            EntityKind::AnimatedMap => &mut self.animated_map_names,
        }
    }

    /// The number of levels of detail described by the membership mappings.
    pub fn lod_count(&self) -> usize {
        self.lod_joint_mapping
            .lod_count()
            .max(self.lod_blend_shape_mapping.lod_count())
            .max(self.lod_animated_map_mapping.lod_count())
            .max(self.lod_mesh_mapping.lod_count())
    }

    /// Position of the first entity of `kind` called `name`.
    pub fn find(&self, kind: EntityKind, name: &str) -> Option<usize> {
        self.names(kind).iter().position(|n| n == name)
    }

    #[inline]
    pub fn find_joint(&self, name: &str) -> Option<JointIndex> {
        self.find(EntityKind::Joint, name)
            .and_then(JointIndex::try_from_usize)
    }

    #[inline]
    pub fn find_mesh(&self, name: &str) -> Option<MeshIndex> {
        self.find(EntityKind::Mesh, name)
            .and_then(MeshIndex::try_from_usize)
    }

    #[inline]
    pub fn joint_parent(&self, joint: JointIndex) -> Option<JointIndex> {
        self.joint_hierarchy.get(joint.get()).copied()
    }

    /// Whether `joint` is its own parent.
    #[inline]
    pub fn is_root_joint(&self, joint: JointIndex) -> bool {
        self.joint_parent(joint) == Some(joint)
    }

    /// Blend-shape channels with targets on `mesh`, in mapping order.
    pub fn mesh_blend_shape_channels(
        &self,
        mesh: MeshIndex,
    ) -> impl Iterator<Item = BlendShapeChannelIndex> + '_ {
        self.mesh_blend_shape_channel_mapping
            .iter()
            .filter_map(move |&(m, c)| (m == mesh).then_some(c))
    }
}
