use dna::{AnimatedMapIndex, BlendShapeChannelIndex, Dna, EntityKind, JointIndex, MeshIndex, TypedIndex};

use crate::{Command, Error, Result};

/// Which entity a [RenameCommand] applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenameTarget {
    Index(usize),
    /// The first entity with this name.
    Name(String),
}

impl From<usize> for RenameTarget {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for RenameTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for RenameTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Overwrite the name of a joint, mesh, blend-shape channel, or animated map.
///
/// Names aren't required to be unique, so no collision checks are made.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenameCommand {
    pub kind: EntityKind,
    pub target: RenameTarget,
    pub name: String,
}

impl RenameCommand {
    pub fn new(kind: EntityKind, target: impl Into<RenameTarget>, name: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            name: name.into(),
        }
    }

    pub fn joint(joint: JointIndex, name: impl Into<String>) -> Self {
        Self::new(EntityKind::Joint, joint.get(), name)
    }

    pub fn mesh(mesh: MeshIndex, name: impl Into<String>) -> Self {
        Self::new(EntityKind::Mesh, mesh.get(), name)
    }

    pub fn blend_shape(channel: BlendShapeChannelIndex, name: impl Into<String>) -> Self {
        Self::new(EntityKind::BlendShapeChannel, channel.get(), name)
    }

    pub fn animated_map(map: AnimatedMapIndex, name: impl Into<String>) -> Self {
        Self::new(EntityKind::AnimatedMap, map.get(), name)
    }
}

impl Command for RenameCommand {
    /// # Errors
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) for an index past the end of the table
    /// * [InvalidOperation](dna::Error::InvalidOperation) if no entity has the old name
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let names = dna.try_definition_mut()?.names_mut(self.kind);
        let index = match &self.target {
            &RenameTarget::Index(i) if i < names.len() => i,
            &RenameTarget::Index(i) => {
                return Err(Error::out_of_range(self.kind.name(), i, names.len()))
            }
            RenameTarget::Name(old) => names.iter().position(|n| n == old).ok_or_else(|| {
                Error::invalid(format!("no {} named {old:?}", self.kind))
            })?,
        };
        tracing::debug!(kind = %self.kind, index, old = %names[index], new = %self.name, "renaming");
        names[index].clone_from(&self.name);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::fixture;

    #[test]
    fn by_index() {
        let rig = RenameCommand::joint(JointIndex(1), "NewNeck")
            .apply(fixture::rig())
            .unwrap();
        assert_eq!(
            rig.definition().unwrap().joint_names[..2],
            ["spine", "NewNeck"]
        );
        assert_eq!(rig.joint_name(JointIndex(2)).ok(), Some("head"));
    }

    #[test]
    fn by_name() {
        let rig = RenameCommand::new(EntityKind::Mesh, "teeth_lod0_mesh", "mouth_lod0_mesh")
            .apply(fixture::rig())
            .unwrap();
        assert_eq!(rig.mesh_name(MeshIndex(2)).ok(), Some("mouth_lod0_mesh"));

        // duplicate names are fine
        let rig = RenameCommand::blend_shape(BlendShapeChannelIndex(1), "jaw_open")
            .apply(rig)
            .unwrap();
        let rig = RenameCommand::new(EntityKind::BlendShapeChannel, "jaw_open", "a")
            .apply(rig)
            .unwrap();
        assert_eq!(
            rig.definition().unwrap().blend_shape_channel_names,
            ["a", "jaw_open", "teeth_open"]
        );
    }

    #[test]
    fn missing() {
        let mut rig = fixture::rig();
        assert!(matches!(
            RenameCommand::animated_map(AnimatedMapIndex(2), "x").run(&mut rig),
            Err(Error::Dna(dna::Error::IndexOutOfRange(e))) if e.kind == "animated map"
        ));
        assert!(matches!(
            RenameCommand::new(EntityKind::Joint, "tail", "x").run(&mut rig),
            Err(Error::Dna(dna::Error::InvalidOperation(_)))
        ));
        assert_eq!(rig, fixture::rig());
    }
}
