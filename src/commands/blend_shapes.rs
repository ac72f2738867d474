use std::collections::HashMap;

use dna::{Dna, LayersMut, LodMapping, Mesh, MeshIndex, TypedIndex, VertexIndex};
use nalgebra::Vector3;

use crate::{command::mask_weights, Command, Error, Result, VectorOperation};

/// Combine one blend-shape target's deltas with `deltas`, weighted per entry by `mask`.
///
/// Without `vertex_indices`, `deltas` align positionally with the target's existing key order.
/// With them, each delta applies to the named vertex; vertices the target doesn't have yet are
/// appended, starting from a zero delta.
#[derive(Debug, Clone, PartialEq)]
pub struct SetBlendShapeTargetDeltasCommand {
    pub mesh: MeshIndex,
    /// Position of the target within the mesh's target list.
    pub target: usize,
    pub deltas: Vec<Vector3<f32>>,
    pub vertex_indices: Option<Vec<VertexIndex>>,
    /// Empty, or one weight per delta.
    pub mask: Vec<f32>,
    pub operation: VectorOperation,
}

impl SetBlendShapeTargetDeltasCommand {
    pub fn new(
        mesh: MeshIndex,
        target: usize,
        deltas: Vec<Vector3<f32>>,
        operation: VectorOperation,
    ) -> Self {
        Self {
            mesh,
            target,
            deltas,
            vertex_indices: None,
            mask: Vec::new(),
            operation,
        }
    }

    pub fn with_vertex_indices(mut self, vertex_indices: Vec<VertexIndex>) -> Self {
        self.vertex_indices = Some(vertex_indices);
        self
    }

    pub fn with_mask(mut self, mask: Vec<f32>) -> Self {
        self.mask = mask;
        self
    }
}

impl Command for SetBlendShapeTargetDeltasCommand {
    /// # Errors
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) for a missing mesh or target, or (when
    ///   geometry is loaded) a vertex past the end of the mesh
    /// * [InvalidOperation](dna::Error::InvalidOperation) if `deltas`, `vertex_indices`, and
    ///   `mask` don't line up
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(mesh = %self.mesh, target = self.target, op = %self.operation)
    )]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let vertex_count = dna
            .geometry()
            .and_then(|g| g.meshes.get(self.mesh.get()))
            .map(Mesh::vertex_count);
        let targets = &mut dna.try_blend_shapes_mut()?.targets;
        let mesh = self.mesh.check(targets.len())?;
        let targets = &mut targets[mesh.get()];
        let len = targets.len();
        let target = targets
            .get_mut(self.target)
            .ok_or_else(|| Error::out_of_range("blend shape target", self.target, len))?;
        let weight = mask_weights(&self.mask, self.deltas.len())?;
        let op = self.operation;

        let Some(vertices) = &self.vertex_indices else {
            if self.deltas.len() != target.len() {
                return Err(Error::invalid(format!(
                    "target has {} deltas, but {} were given",
                    target.len(),
                    self.deltas.len()
                )));
            }
            for (i, (d, v)) in target.deltas.iter_mut().zip(&self.deltas).enumerate() {
                *d = op.apply(*d, *v, weight(i));
            }
            return Ok(());
        };

        if vertices.len() != self.deltas.len() {
            return Err(Error::invalid(format!(
                "{} vertex indices given for {} deltas",
                vertices.len(),
                self.deltas.len()
            )));
        }
        if let Some(count) = vertex_count {
            for v in vertices {
                v.check(count)?;
            }
        }
        let mut keys: HashMap<VertexIndex, usize> = target
            .vertex_indices
            .iter()
            .enumerate()
            .map(|(k, &vertex)| (vertex, k))
            .collect();
        for (i, (&vertex, v)) in vertices.iter().zip(&self.deltas).enumerate() {
            match keys.get(&vertex) {
                Some(&k) => target.deltas[k] = op.apply(target.deltas[k], *v, weight(i)),
                None => {
                    keys.insert(vertex, target.vertex_indices.len());
                    target.vertex_indices.push(vertex);
                    target.deltas.push(op.apply(Vector3::zeros(), *v, weight(i)));
                }
            }
        }
        Ok(())
    }
}

/// Remove every blend-shape channel, target, mapping, and the behavior driving them.
///
/// The number of levels of detail is kept; each level's channel list becomes empty.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClearBlendShapesCommand;

impl Command for ClearBlendShapesCommand {
    fn run(&self, dna: &mut Dna) -> Result<()> {
        dna.try_definition()?;
        let LayersMut {
            definition,
            behavior,
            blend_shapes,
            ..
        } = dna.layers_mut();
        if let Some(def) = definition {
            let levels = def.lod_blend_shape_mapping.lod_count();
            def.blend_shape_channel_names.clear();
            def.mesh_blend_shape_channel_mapping.clear();
            def.lod_blend_shape_mapping = LodMapping::from_levels(vec![Vec::new(); levels]);
        }
        if let Some(behavior) = behavior {
            behavior.blend_shape_channels.clear();
        }
        if let Some(blend_shapes) = blend_shapes {
            blend_shapes.targets.iter_mut().for_each(Vec::clear);
        }
        Ok(())
    }
}

/// Drop blend-shape deltas whose magnitude is at most `threshold`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PruneBlendShapeTargetsCommand {
    pub threshold: f32,
}

impl PruneBlendShapeTargetsCommand {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Command for PruneBlendShapeTargetsCommand {
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let threshold2 = self.threshold * self.threshold;
        let mut pruned = 0usize;
        for target in dna.try_blend_shapes_mut()?.targets.iter_mut().flatten() {
            let before = target.len();
            target.retain(|_, d| d.norm_squared() > threshold2);
            pruned += before - target.len();
        }
        tracing::debug!(threshold = self.threshold, pruned, "pruned blend shape deltas");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, BlendShapeChannelIndex};

    fn head_target(rig: &Dna, target: usize) -> &dna::BlendShapeTarget {
        &rig.blend_shape_targets(MeshIndex(0)).unwrap()[target]
    }

    #[test]
    fn positional() {
        let rig = SetBlendShapeTargetDeltasCommand::new(
            MeshIndex(0),
            0,
            vec![Vector3::new(0.0, 1.0, 0.0); 2],
            VectorOperation::Add,
        )
        .with_mask(vec![1.0, 0.5])
        .apply(fixture::rig())
        .unwrap();
        let t = head_target(&rig, 0);
        assert_eq!(t.vertex_indices, vec![VertexIndex(0), VertexIndex(1)]);
        assert_eq!(t.deltas, vec![Vector3::zeros(), Vector3::zeros()]);
    }

    #[test]
    fn keyed_updates_and_appends() {
        let rig = SetBlendShapeTargetDeltasCommand::new(
            MeshIndex(0),
            1,
            vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0)],
            VectorOperation::Add,
        )
        .with_vertex_indices(vec![VertexIndex(3), VertexIndex(2)])
        .apply(fixture::rig())
        .unwrap();
        let t = head_target(&rig, 1);
        assert_eq!(t.vertex_indices, vec![VertexIndex(3), VertexIndex(2)]);
        assert_eq!(
            t.deltas,
            vec![Vector3::new(0.1 + 1.0, 0.2, 0.0), Vector3::new(0.0, 0.0, 2.0)]
        );
        rig.validate().unwrap();
    }

    #[test]
    fn keyed_repeats_combine() {
        // vertex 2 is new to the target and named twice; the second entry updates the first
        let rig = SetBlendShapeTargetDeltasCommand::new(
            MeshIndex(0),
            0,
            vec![
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 2.0),
            ],
            VectorOperation::Add,
        )
        .with_vertex_indices(vec![VertexIndex(2), VertexIndex(0), VertexIndex(2)])
        .apply(fixture::rig())
        .unwrap();
        let t = head_target(&rig, 0);
        assert_eq!(
            t.vertex_indices,
            vec![VertexIndex(0), VertexIndex(1), VertexIndex(2)]
        );
        assert_eq!(
            t.deltas,
            vec![
                Vector3::zeros(),
                Vector3::new(0.0, -0.5, 0.0),
                Vector3::new(0.0, 0.0, 3.0)
            ]
        );
    }

    #[test]
    fn rejects() {
        let mut rig = fixture::rig();
        let d = vec![Vector3::zeros()];
        let cases = [
            // wrong positional length
            SetBlendShapeTargetDeltasCommand::new(MeshIndex(0), 0, d.clone(), VectorOperation::Add),
            // no such target
            SetBlendShapeTargetDeltasCommand::new(MeshIndex(1), 1, d.clone(), VectorOperation::Add),
            // vertex past the mesh
            SetBlendShapeTargetDeltasCommand::new(MeshIndex(1), 0, d.clone(), VectorOperation::Add)
                .with_vertex_indices(vec![VertexIndex(3)]),
            // indices don't match deltas
            SetBlendShapeTargetDeltasCommand::new(MeshIndex(1), 0, d, VectorOperation::Add)
                .with_vertex_indices(vec![]),
        ];
        for cmd in cases {
            assert!(cmd.run(&mut rig).is_err(), "{cmd:?}");
        }
        assert_eq!(rig, fixture::rig());
    }

    #[test]
    fn clear() {
        let rig = ClearBlendShapesCommand.apply(fixture::rig()).unwrap();
        let def = rig.definition().unwrap();
        assert!(def.blend_shape_channel_names.is_empty());
        assert!(def.mesh_blend_shape_channel_mapping.is_empty());
        assert_eq!(def.lod_blend_shape_mapping.lod_count(), 2);
        assert!(def.lod_blend_shape_mapping.levels().all(|l| l.is_empty()));
        assert_eq!(rig.behavior().unwrap().blend_shape_channels.lods, vec![0, 0]);
        assert!(rig.blend_shapes().unwrap().targets.iter().all(Vec::is_empty));
        assert_eq!(rig.lod_count().unwrap(), 2);
        rig.validate().unwrap();
    }

    #[test]
    fn prune() {
        let rig = PruneBlendShapeTargetsCommand::new(0.5)
            .apply(fixture::rig())
            .unwrap();
        let t = head_target(&rig, 0);
        assert_eq!(t.vertex_indices, vec![VertexIndex(0)]);
        assert!(head_target(&rig, 1).is_empty());
        assert_eq!(head_target(&rig, 1).channel, BlendShapeChannelIndex(1));
        // exactly at the threshold goes too
        assert!(rig.blend_shape_targets(MeshIndex(2)).unwrap()[0].is_empty());
    }
}
