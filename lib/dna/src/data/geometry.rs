use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::{BlendShapeChannelIndex, JointIndex, TypedIndex, VertexIndex};

/// Neutral meshes, in mesh-table order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub meshes: Vec<Mesh>,
}

/// Blend-shape targets of each mesh, in mesh-table order.
///
/// Stored apart from [Geometry] so the (usually very large) deltas can be left unloaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendShapes {
    pub targets: Vec<Vec<BlendShapeTarget>>,
}

/// One corner of a face: which position, texture coordinate, and normal it uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexLayout {
    pub position: u32,
    pub texture_coordinate: u32,
    pub normal: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub joint: JointIndex,
    pub weight: f32,
}

/// Joint influences on a single vertex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkinWeights {
    pub influences: Vec<Influence>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vector3<f32>>,
    pub texture_coordinates: Vec<Vector2<f32>>,
    /// May be empty.
    pub normals: Vec<Vector3<f32>>,
    pub layouts: Vec<VertexLayout>,
    /// Each face is a list of indices into `layouts`.
    pub faces: Vec<Vec<u32>>,
    pub max_influence_per_vertex: u16,
    /// One entry per vertex position, or none at all.
    pub skin_weights: Vec<SkinWeights>,
}

impl Mesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The layout indices of every face containing layout `layout`.
    pub fn faces_with_layout(&self, layout: u32) -> impl Iterator<Item = &[u32]> + '_ {
        self.faces
            .iter()
            .filter(move |f| f.contains(&layout))
            .map(Vec::as_slice)
    }
}

/// Sparse per-vertex offsets applied to a mesh by one blend-shape channel.
///
/// `vertex_indices` and `deltas` are parallel; their order is the target's key order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendShapeTarget {
    pub channel: BlendShapeChannelIndex,
    pub vertex_indices: Vec<VertexIndex>,
    pub deltas: Vec<Vector3<f32>>,
}

impl BlendShapeTarget {
    #[inline]
    pub fn len(&self) -> usize {
        self.vertex_indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    pub fn delta(&self, vertex: VertexIndex) -> Option<&Vector3<f32>> {
        self.vertex_indices
            .iter()
            .position(|&v| v == vertex)
            .and_then(|i| self.deltas.get(i))
    }

    /// Iterate through `(vertex, delta)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexIndex, &Vector3<f32>)> + '_ {
        self.vertex_indices.iter().copied().zip(&self.deltas)
    }

    /// Drop entries for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(VertexIndex, &Vector3<f32>) -> bool) {
        let (vertex_indices, deltas): (Vec<_>, Vec<_>) = self
            .vertex_indices
            .iter()
            .copied()
            .zip(self.deltas.iter().copied())
            .filter(|(v, d)| keep(*v, d))
            .unzip();
        self.vertex_indices = vertex_indices;
        self.deltas = deltas;
    }

    /// The largest vertex index referenced, if any.
    pub fn max_vertex(&self) -> Option<usize> {
        self.vertex_indices.iter().map(|v| v.get()).max()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_lookup_and_retain() {
        let mut t = BlendShapeTarget {
            channel: BlendShapeChannelIndex(0),
            vertex_indices: vec![VertexIndex(4), VertexIndex(1), VertexIndex(7)],
            deltas: vec![
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ],
        };
        assert_eq!(t.delta(VertexIndex(7)), Some(&Vector3::new(0.0, 2.0, 0.0)));
        assert_eq!(t.delta(VertexIndex(2)), None);
        assert_eq!(t.max_vertex(), Some(7));

        t.retain(|_, d| d.norm() > 0.0);
        assert_eq!(t.vertex_indices, vec![VertexIndex(4), VertexIndex(7)]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn adjacent_faces() {
        let mesh = Mesh {
            faces: vec![vec![0, 1, 2], vec![2, 3, 0], vec![3, 4, 5]],
            ..Default::default()
        };
        assert_eq!(mesh.faces_with_layout(0).count(), 2);
        assert_eq!(mesh.faces_with_layout(5).count(), 1);
    }
}
