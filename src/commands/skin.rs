use dna::{Dna, Influence, MeshIndex, SkinWeights, TypedIndex, VertexIndex};

use crate::{Command, Result};

/// Replace the joint influences on one vertex.
///
/// Weights are taken as given; nothing is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct SetSkinWeightsCommand {
    pub mesh: MeshIndex,
    pub vertex: VertexIndex,
    pub influences: Vec<Influence>,
}

impl SetSkinWeightsCommand {
    pub fn new(mesh: MeshIndex, vertex: VertexIndex, influences: Vec<Influence>) -> Self {
        Self {
            mesh,
            vertex,
            influences,
        }
    }
}

impl Command for SetSkinWeightsCommand {
    /// # Errors
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) for a missing mesh, vertex, or (when the
    ///   definition is loaded) joint
    fn run(&self, dna: &mut Dna) -> Result<()> {
        if let Some(def) = dna.definition() {
            for i in self.influences.iter() {
                i.joint.check(def.joint_count())?;
            }
        }
        let meshes = &mut dna.try_geometry_mut()?.meshes;
        let index = self.mesh.check(meshes.len())?.get();
        let mesh = &mut meshes[index];
        let vertex = self.vertex.check(mesh.vertex_count())?.get();
        if mesh.skin_weights.is_empty() {
            mesh.skin_weights = vec![SkinWeights::default(); mesh.vertex_count()];
        }
        if let Some(skin) = mesh.skin_weights.get_mut(vertex) {
            skin.influences.clone_from(&self.influences);
        }
        let count = u16::try_from(self.influences.len()).unwrap_or(u16::MAX);
        mesh.max_influence_per_vertex = mesh.max_influence_per_vertex.max(count);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, JointIndex};

    fn influences(pairs: &[(u16, f32)]) -> Vec<Influence> {
        pairs
            .iter()
            .map(|&(joint, weight)| Influence {
                joint: JointIndex(joint),
                weight,
            })
            .collect()
    }

    #[test]
    fn replaces_influences() {
        let given = influences(&[(1, 0.2), (2, 0.3), (4, 0.5)]);
        let rig = SetSkinWeightsCommand::new(MeshIndex(0), VertexIndex(2), given.clone())
            .apply(fixture::rig())
            .unwrap();
        let mesh = rig.mesh(MeshIndex(0)).unwrap();
        assert_eq!(mesh.skin_weights[2].influences, given);
        assert_eq!(mesh.max_influence_per_vertex, 3);
        rig.validate().unwrap();
    }

    #[test]
    fn fills_missing_table() {
        let mut rig = fixture::rig();
        rig.try_geometry_mut().unwrap().meshes[1].skin_weights.clear();
        let rig = SetSkinWeightsCommand::new(MeshIndex(1), VertexIndex(1), influences(&[(0, 1.0)]))
            .apply(rig)
            .unwrap();
        let skin = &rig.mesh(MeshIndex(1)).unwrap().skin_weights;
        assert_eq!(skin.len(), 3);
        assert!(skin[0].influences.is_empty());
        assert_eq!(skin[1].influences, influences(&[(0, 1.0)]));
    }

    #[test]
    fn ranges() {
        let mut rig = fixture::rig();
        let one = influences(&[(0, 1.0)]);
        assert!(SetSkinWeightsCommand::new(MeshIndex(3), VertexIndex(0), one.clone())
            .run(&mut rig)
            .is_err());
        assert!(SetSkinWeightsCommand::new(MeshIndex(0), VertexIndex(4), one)
            .run(&mut rig)
            .is_err());
        assert!(SetSkinWeightsCommand::new(MeshIndex(0), VertexIndex(0), influences(&[(5, 1.0)]))
            .run(&mut rig)
            .is_err());
        assert_eq!(rig, fixture::rig());
    }
}
