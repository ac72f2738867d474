use dna::{AnimatedMapIndex, BlendShapeChannelIndex, Dna, JointIndex, MeshIndex, Remap, TypedIndex};

use super::compact::{compact_animated_maps, compact_channels, compact_joints, compact_meshes};
use crate::{Command, Error, Result};

/// Remove one joint, reparenting its children to its parent.
///
/// Skin influences of the removed joint are dropped without renormalizing the rest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RemoveJointCommand {
    pub joint: JointIndex,
}

impl RemoveJointCommand {
    pub fn new(joint: JointIndex) -> Self {
        Self { joint }
    }
}

impl Command for RemoveJointCommand {
    /// # Errors
    /// * [InvalidOperation](dna::Error::InvalidOperation) if the joint is the root
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) if there's no such joint
    #[tracing::instrument(level = "debug", skip_all, fields(joint = %self.joint))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let count = dna.joint_count()?;
        let joint = self.joint.check(count)?;
        if joint.is_root() {
            return Err(Error::invalid("the root joint can't be removed"));
        }
        compact_joints(dna, &Remap::removing(count, joint.get()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RemoveMeshCommand {
    pub mesh: MeshIndex,
}

impl RemoveMeshCommand {
    pub fn new(mesh: MeshIndex) -> Self {
        Self { mesh }
    }
}

impl Command for RemoveMeshCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(mesh = %self.mesh))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let count = dna.mesh_count()?;
        let mesh = self.mesh.check(count)?;
        compact_meshes(dna, &Remap::removing(count, mesh.get()))
    }
}

/// Remove one blend-shape channel, and every target it drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RemoveBlendShapeCommand {
    pub channel: BlendShapeChannelIndex,
}

impl RemoveBlendShapeCommand {
    pub fn new(channel: BlendShapeChannelIndex) -> Self {
        Self { channel }
    }
}

impl Command for RemoveBlendShapeCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(channel = %self.channel))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let count = dna.try_definition()?.blend_shape_channel_count();
        let channel = self.channel.check(count)?;
        compact_channels(dna, &Remap::removing(count, channel.get()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RemoveAnimatedMapCommand {
    pub animated_map: AnimatedMapIndex,
}

impl RemoveAnimatedMapCommand {
    pub fn new(animated_map: AnimatedMapIndex) -> Self {
        Self { animated_map }
    }
}

impl Command for RemoveAnimatedMapCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(animated_map = %self.animated_map))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let count = dna.try_definition()?.animated_map_count();
        let map = self.animated_map.check(count)?;
        compact_animated_maps(dna, &Remap::removing(count, map.get()))
    }
}

/// Drop the joint-group rows driving one joint; the joint itself stays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RemoveJointAnimationCommand {
    pub joint: JointIndex,
}

impl RemoveJointAnimationCommand {
    pub fn new(joint: JointIndex) -> Self {
        Self { joint }
    }
}

impl Command for RemoveJointAnimationCommand {
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let joint = self.joint.check(dna.joint_count()?)?;
        dna.try_behavior_mut()?.joints.remove_joint_rows(joint);
        Ok(())
    }
}
