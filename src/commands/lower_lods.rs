use dna::{Definition, Dna, Mesh, MeshIndex, TypedIndex};
use nalgebra::{Point2, Vector2, Vector3};

use crate::{
    geom::{Aabb, Triangle},
    Command, Result,
};

/// Texture coordinates closer than this on both axes are considered equal.
const UV_TOLERANCE: f32 = 0.0002;
/// How many texture coordinates are sampled when looking for a mirrored texture map.
const MIRROR_SAMPLES: usize = 10;

/// Recompute the vertex positions of a mesh's lower-detail variants from the mesh itself.
///
/// Each vertex of a variant is located, by texture coordinate, within a triangle of the source
/// mesh, and takes the barycentric blend of that triangle's positions. Vertices with several
/// layouts take the mean of their layouts' results.
///
/// The variants are, for each level of detail after the first one containing the mesh, the
/// first mesh of that level whose name shares the mesh's prefix (up to the first `_`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CalculateMeshLowerLodsCommand {
    pub mesh: MeshIndex,
}

impl CalculateMeshLowerLodsCommand {
    pub fn new(mesh: MeshIndex) -> Self {
        Self { mesh }
    }
}

fn name_prefix(name: &str) -> &str {
    name.split_once('_').map_or(name, |(prefix, _)| prefix)
}

/// The lower-detail variants of `mesh`, most detailed first.
pub fn lower_lod_meshes(def: &Definition, mesh: MeshIndex) -> Vec<MeshIndex> {
    let Some(prefix) = def.mesh_names.get(mesh.get()).map(|n| name_prefix(n)) else {
        return Vec::new();
    };
    let mapping = &def.lod_mesh_mapping;
    let Some(first) = mapping.lowest_level_containing(&[mesh]) else {
        return Vec::new();
    };
    mapping
        .levels()
        .skip(first as usize + 1)
        .filter_map(|level| {
            level.iter().copied().find(|&m| {
                m != mesh
                    && def
                        .mesh_names
                        .get(m.get())
                        .is_some_and(|n| name_prefix(n) == prefix)
            })
        })
        .collect()
}

fn near(a: &Point2<f32>, b: &Point2<f32>) -> bool {
    (a.x - b.x).abs() < UV_TOLERANCE && (a.y - b.y).abs() < UV_TOLERANCE
}

/// Texture coordinates with any mirrored half moved aside.
///
/// Some meshes store their texture map twice, the second half mirroring the first. Left as it
/// is, every lookup would hit two triangles; the first half's matches are shifted by `u + 1`.
fn separate_mirrored(uvs: &[Vector2<f32>]) -> Vec<Point2<f32>> {
    let mut res: Vec<Point2<f32>> = uvs.iter().map(|&uv| Point2::from(uv)).collect();
    if res.len() % 2 != 0 {
        return res;
    }
    let (first, second) = res.split_at_mut(uvs.len() / 2);
    let mirrored = first
        .iter()
        .take(MIRROR_SAMPLES)
        .all(|a| second.iter().any(|b| near(a, b)));
    if mirrored {
        for a in first.iter_mut() {
            if second.iter().any(|b| near(a, b)) {
                a.x += 1.0;
            }
        }
    }
    res
}

/// The source mesh, triangulated in texture space.
#[derive(Debug)]
struct UvMapping {
    triangles: Vec<Triangle>,
    /// Position indices of each triangle's corners.
    corners: Vec<[usize; 3]>,
    bounds: Vec<Aabb>,
    positions: Vec<Vector3<f32>>,
}

impl UvMapping {
    fn new(mesh: &Mesh) -> Self {
        let uvs = separate_mirrored(&mesh.texture_coordinates);
        let mut res = Self {
            triangles: Vec::new(),
            corners: Vec::new(),
            bounds: Vec::new(),
            positions: mesh.positions.clone(),
        };
        let corner = |layout: u32| {
            let layout = mesh.layouts.get(layout as usize)?;
            let uv = uvs.get(layout.texture_coordinate as usize)?;
            Some((*uv, layout.position as usize))
        };
        for face in mesh.faces.iter() {
            // fan out from the front of the face, dropping a corner each step
            let mut rest = face.as_slice();
            while let [a, b, .., c] = rest {
                if let (Some(a), Some(b), Some(c)) = (corner(*a), corner(*b), corner(*c)) {
                    res.triangles.push(Triangle::new(a.0, b.0, c.0));
                    res.corners.push([a.1, b.1, c.1]);
                    res.bounds.push(Aabb::around(&[a.0, b.0, c.0]));
                }
                rest = &rest[1..];
            }
        }
        res
    }

    /// Barycentric weights of `uv` in the first triangle containing it, or failing that, the
    /// last triangle whose bounds contain it.
    fn locate(&self, uv: &Point2<f32>) -> Option<(Vector3<f32>, [usize; 3])> {
        let mut fallback = None;
        for ((tri, bounds), corners) in self.triangles.iter().zip(&self.bounds).zip(&self.corners) {
            if !bounds.contains(uv) {
                continue;
            }
            let weights = tri.barycentric(uv);
            if Triangle::is_inside(&weights) {
                return Some((weights, *corners));
            }
            fallback = Some((weights, *corners));
        }
        fallback
    }

    /// The triangle nearest to `uv` among those whose bounds overlap a face around layout
    /// `layout` of `target`.
    fn nearest(
        &self,
        target: &Mesh,
        uvs: &[Point2<f32>],
        layout: u32,
        uv: &Point2<f32>,
    ) -> Option<(Vector3<f32>, [usize; 3])> {
        let mut best: Option<(f32, usize)> = None;
        for face in target.faces_with_layout(layout) {
            let face_uvs: Vec<Point2<f32>> = face
                .iter()
                .filter_map(|&l| target.layouts.get(l as usize))
                .filter_map(|l| uvs.get(l.texture_coordinate as usize))
                .copied()
                .collect();
            let face_bounds = Aabb::around(&face_uvs);
            for (i, bounds) in self.bounds.iter().enumerate() {
                if !bounds.overlaps(&face_bounds) {
                    continue;
                }
                let distance = bounds.distance(uv);
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, i));
                }
            }
        }
        let (_, i) = best?;
        Some((self.triangles[i].barycentric(uv), self.corners[i]))
    }

    fn blend(&self, weights: &Vector3<f32>, corners: &[usize; 3]) -> Option<Vector3<f32>> {
        let mut res = Vector3::zeros();
        for (w, &c) in weights.iter().zip(corners) {
            res += self.positions.get(c)? * *w;
        }
        Some(res)
    }

    /// Rewrite the positions of `target` from the source mesh.
    ///
    /// Positions no layout of `target` could be located for keep their old value.
    fn project_onto(&self, target: &mut Mesh) -> usize {
        let uvs = separate_mirrored(&target.texture_coordinates);
        let mut means = vec![(Vector3::<f32>::zeros(), 0u32); target.positions.len()];
        let mut missed = 0;
        for (vli, layout) in target.layouts.iter().enumerate() {
            let Some(uv) = uvs.get(layout.texture_coordinate as usize) else {
                continue;
            };
            let hit = self
                .locate(uv)
                .or_else(|| self.nearest(target, &uvs, vli as u32, uv));
            let Some(p) = hit.and_then(|(w, c)| self.blend(&w, &c)) else {
                missed += 1;
                continue;
            };
            if let Some((mean, n)) = means.get_mut(layout.position as usize) {
                *n += 1;
                *mean += (p - *mean) / *n as f32;
            }
        }
        for (p, (mean, n)) in target.positions.iter_mut().zip(means) {
            if n > 0 {
                *p = mean;
            }
        }
        missed
    }
}

impl Command for CalculateMeshLowerLodsCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(mesh = %self.mesh))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let def = dna.try_definition()?;
        let mesh = self.mesh.check(def.mesh_count())?;
        let lower = lower_lod_meshes(def, mesh);
        if lower.is_empty() {
            tracing::debug!("no lower levels of detail");
            return Ok(());
        }

        let meshes = &mut dna.try_geometry_mut()?.meshes;
        let mapping = UvMapping::new(&meshes[mesh.check(meshes.len())?.get()]);
        for m in lower {
            let Some(target) = meshes.get_mut(m.get()) else {
                continue;
            };
            let missed = mapping.project_onto(target);
            if missed > 0 {
                tracing::warn!(mesh = %m, missed, "some vertex layouts lie outside the source mesh");
            }
            tracing::trace!(mesh = %m, "recomputed positions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, LodMapping};

    fn close(a: &[Vector3<f32>], b: &[Vector3<f32>]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| (a - b).norm() < 1e-5)
    }

    #[test]
    fn finds_variants() {
        let def = fixture::definition();
        assert_eq!(lower_lod_meshes(&def, MeshIndex(0)), vec![MeshIndex(1)]);
        assert!(lower_lod_meshes(&def, MeshIndex(1)).is_empty());
        assert!(lower_lod_meshes(&def, MeshIndex(2)).is_empty());
        assert!(lower_lod_meshes(&def, MeshIndex(7)).is_empty());
    }

    #[test]
    fn only_first_match_per_level() {
        let mut def = fixture::definition();
        def.mesh_names.push("head_lod1_extra".into());
        def.lod_mesh_mapping = LodMapping::from_levels([
            vec![MeshIndex(0), MeshIndex(2)],
            vec![MeshIndex(3), MeshIndex(1)],
            vec![MeshIndex(2)],
        ]);
        assert_eq!(lower_lod_meshes(&def, MeshIndex(0)), vec![MeshIndex(3)]);
    }

    #[test]
    fn mirrored_halves() {
        let half = [Vector2::new(0.1, 0.2), Vector2::new(0.3, 0.4)];
        let uvs: Vec<_> = half.iter().chain(half.iter().rev()).copied().collect();
        let separated = separate_mirrored(&uvs);
        assert_eq!(separated[0], Point2::new(0.1 + 1.0, 0.2));
        assert_eq!(separated[1], Point2::new(0.3 + 1.0, 0.4));
        assert_eq!(separated[2], Point2::new(0.3, 0.4));

        let plain = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)];
        assert_eq!(separate_mirrored(&plain)[0], Point2::new(0.0, 0.0));
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let mapping = UvMapping::new(&fixture::geometry().meshes[0]);
        assert_eq!(mapping.corners, vec![[0, 1, 3], [1, 2, 3]]);
    }

    #[test]
    fn projects_by_texture_coordinate() {
        let mut rig = fixture::rig();
        rig.try_geometry_mut().unwrap().meshes[1].positions = vec![Vector3::new(9.0, 9.0, 9.0); 3];
        let rig = CalculateMeshLowerLodsCommand::new(MeshIndex(0))
            .apply(rig)
            .unwrap();
        // the source's positions equal its texture coordinates
        let expected: Vec<_> = fixture::geometry().meshes[1]
            .texture_coordinates
            .iter()
            .map(|uv| Vector3::new(uv.x, uv.y, 0.0))
            .collect();
        assert!(close(rig.vertex_positions(MeshIndex(1)).unwrap(), &expected));
        // nothing else moves
        assert_eq!(rig.mesh(MeshIndex(0)).unwrap(), &fixture::geometry().meshes[0]);
        assert_eq!(rig.mesh(MeshIndex(2)).unwrap(), &fixture::geometry().meshes[2]);
    }

    #[test]
    fn falls_back_to_nearest_triangle() {
        let mut rig = fixture::rig();
        // pull one corner just outside the source's texture map
        rig.try_geometry_mut().unwrap().meshes[1].texture_coordinates[0] =
            Vector2::new(-0.01, 0.25);
        let rig = CalculateMeshLowerLodsCommand::new(MeshIndex(0))
            .apply(rig)
            .unwrap();
        let p = rig.vertex_positions(MeshIndex(1)).unwrap()[0];
        // extrapolated from the nearest triangle
        assert!((p - Vector3::new(-0.01, 0.25, 0.0)).norm() < 1e-5, "{p:?}");
    }

    #[test]
    fn consistent_rig_is_left_alone() {
        let rig = CalculateMeshLowerLodsCommand::new(MeshIndex(0))
            .apply(fixture::rig())
            .unwrap();
        assert_eq!(rig, fixture::rig());
    }

    #[test]
    fn idempotent() {
        let cmd = CalculateMeshLowerLodsCommand::new(MeshIndex(0));
        let once = cmd.apply(fixture::rig()).unwrap();
        let twice = cmd.apply(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
