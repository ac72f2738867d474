use dna::{Dna, MeshIndex, TypedIndex};
use nalgebra::Vector3;

use crate::{command::mask_weights, Command, Error, Result, VectorOperation};

/// Combine one mesh's neutral vertex positions with `positions`, weighted per vertex by `mask`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetVertexPositionsCommand {
    pub mesh: MeshIndex,
    pub positions: Vec<Vector3<f32>>,
    /// Empty, or one weight per vertex; weights outside `0..=1` are accepted.
    pub mask: Vec<f32>,
    pub operation: VectorOperation,
}

impl SetVertexPositionsCommand {
    pub fn new(mesh: MeshIndex, positions: Vec<Vector3<f32>>, operation: VectorOperation) -> Self {
        Self {
            mesh,
            positions,
            mask: Vec::new(),
            operation,
        }
    }

    pub fn with_mask(mut self, mask: Vec<f32>) -> Self {
        self.mask = mask;
        self
    }
}

impl Command for SetVertexPositionsCommand {
    /// # Errors
    /// * [InvalidOperation](dna::Error::InvalidOperation) if `positions` or `mask` don't have one
    ///   entry per vertex
    #[tracing::instrument(level = "debug", skip_all, fields(mesh = %self.mesh, op = %self.operation))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let meshes = &mut dna.try_geometry_mut()?.meshes;
        let mesh = self.mesh.check(meshes.len())?;
        let vertices = &mut meshes[mesh.get()].positions;
        if vertices.len() != self.positions.len() {
            return Err(Error::invalid(format!(
                "mesh {mesh} has {} vertices, but {} positions were given",
                vertices.len(),
                self.positions.len()
            )));
        }
        let weight = mask_weights(&self.mask, vertices.len())?;
        for (i, (p, v)) in vertices.iter_mut().zip(&self.positions).enumerate() {
            *p = self.operation.apply(*p, *v, weight(i));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::fixture;

    fn quad() -> Vec<Vector3<f32>> {
        fixture::geometry().meshes[0].positions.clone()
    }

    #[test]
    fn interpolate_with_mask() {
        let target = vec![Vector3::new(2.0, 2.0, 2.0); 4];
        let rig = SetVertexPositionsCommand::new(MeshIndex(0), target, VectorOperation::Interpolate)
            .with_mask(vec![0.0, 0.5, 1.0, 0.0])
            .apply(fixture::rig())
            .unwrap();
        let positions = rig.vertex_positions(MeshIndex(0)).unwrap();
        assert_eq!(positions[0], quad()[0]);
        assert_eq!(positions[1], Vector3::new(1.5, 1.0, 1.0));
        assert_eq!(positions[2], Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn mismatched_lengths() {
        let mut rig = fixture::rig();
        let short = SetVertexPositionsCommand::new(MeshIndex(0), quad()[..3].to_vec(), VectorOperation::Add);
        assert!(matches!(
            short.run(&mut rig),
            Err(Error::Dna(dna::Error::InvalidOperation(_)))
        ));
        let bad_mask = SetVertexPositionsCommand::new(MeshIndex(0), quad(), VectorOperation::Add)
            .with_mask(vec![1.0]);
        assert!(bad_mask.run(&mut rig).is_err());
        let no_mesh = SetVertexPositionsCommand::new(MeshIndex(3), quad(), VectorOperation::Add);
        assert!(matches!(
            no_mesh.run(&mut rig),
            Err(Error::Dna(dna::Error::IndexOutOfRange(_)))
        ));
        assert_eq!(rig, fixture::rig());
    }

    #[test]
    fn needs_geometry() {
        let mut rig = fixture::rig().restrict(dna::DataLayer::Behavior);
        let cmd = SetVertexPositionsCommand::new(MeshIndex(0), quad(), VectorOperation::Add);
        assert!(matches!(
            cmd.run(&mut rig),
            Err(Error::Dna(dna::Error::LayerNotLoaded(_)))
        ));
    }
}
