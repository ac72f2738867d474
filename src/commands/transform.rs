//! Whole-rig affine edits.
//!
//! Neutral joint translations are parent-relative, so only root joints take the full transform;
//! child joints take its linear part (or nothing, for translations).

use dna::{Dna, JointIndex, LayersMut, RotationUnit, TypedIndex, JOINT_ATTRIBUTE_COUNT};
use nalgebra::{Rotation3, Vector3};

use crate::{Command, Result};

/// Attributes `0..3` of each joint are translations.
const TRANSLATION_ATTRIBUTES: u16 = 3;

fn is_root(hierarchy: &[JointIndex], joint: usize) -> bool {
    hierarchy.get(joint).is_some_and(|p| p.get() == joint)
}

/// `p' = origin + factor·(p - origin)` for root joints and vertex positions; everything
/// parent-relative or offset-like is multiplied by `factor` alone.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleCommand {
    pub factor: f32,
    pub origin: Vector3<f32>,
}

impl ScaleCommand {
    pub fn new(factor: f32, origin: Vector3<f32>) -> Self {
        Self { factor, origin }
    }
}

impl Command for ScaleCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(factor = self.factor, origin = ?self.origin))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        if self.factor == 1.0 {
            return Ok(());
        }
        let (f, o) = (self.factor, self.origin);
        let LayersMut {
            definition,
            behavior,
            geometry,
            blend_shapes,
            ..
        } = dna.layers_mut();

        if let Some(def) = definition {
            for (j, t) in def.neutral_joint_translations.iter_mut().enumerate() {
                *t = if is_root(&def.joint_hierarchy, j) {
                    o + (*t - o) * f
                } else {
                    *t * f
                };
            }
        }
        if let Some(behavior) = behavior {
            for group in behavior.joints.groups.iter_mut() {
                let cols = group.col_count();
                if cols == 0 {
                    continue;
                }
                for (row, &output) in group.values.chunks_mut(cols).zip(&group.output_indices) {
                    if output % JOINT_ATTRIBUTE_COUNT < TRANSLATION_ATTRIBUTES {
                        row.iter_mut().for_each(|v| *v *= f);
                    }
                }
            }
        }
        if let Some(geometry) = geometry {
            for p in geometry.meshes.iter_mut().flat_map(|m| m.positions.iter_mut()) {
                *p = o + (*p - o) * f;
            }
        }
        if let Some(blend_shapes) = blend_shapes {
            for d in blend_shapes
                .targets
                .iter_mut()
                .flatten()
                .flat_map(|t| t.deltas.iter_mut())
            {
                *d *= f;
            }
        }
        Ok(())
    }
}

/// Rotate the rig about `origin` by XYZ Euler angles, in degrees.
///
/// Root joints are rotated about `origin` in the model's rotation unit; positions about
/// `origin`, and normals and blend-shape deltas about the origin of their own space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RotateCommand {
    pub degrees: Vector3<f32>,
    pub origin: Vector3<f32>,
}

impl RotateCommand {
    pub fn new(degrees: Vector3<f32>, origin: Vector3<f32>) -> Self {
        Self { degrees, origin }
    }

    fn rotation(&self) -> Rotation3<f32> {
        let r = self.degrees.map(f32::to_radians);
        Rotation3::from_euler_angles(r.x, r.y, r.z)
    }
}

fn euler_to_rotation(angles: Vector3<f32>, unit: RotationUnit) -> Rotation3<f32> {
    let r = match unit {
        RotationUnit::Degrees => angles.map(f32::to_radians),
        RotationUnit::Radians => angles,
    };
    Rotation3::from_euler_angles(r.x, r.y, r.z)
}

fn rotation_to_euler(rotation: &Rotation3<f32>, unit: RotationUnit) -> Vector3<f32> {
    let (x, y, z) = rotation.euler_angles();
    let r = Vector3::new(x, y, z);
    match unit {
        RotationUnit::Degrees => r.map(f32::to_degrees),
        RotationUnit::Radians => r,
    }
}

impl Command for RotateCommand {
    #[tracing::instrument(level = "debug", skip_all, fields(degrees = ?self.degrees, origin = ?self.origin))]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        if self.degrees == Vector3::zeros() {
            return Ok(());
        }
        let (r, o) = (self.rotation(), self.origin);
        let unit = dna
            .descriptor()
            .map_or(RotationUnit::Degrees, |d| d.rotation_unit);
        let LayersMut {
            definition,
            geometry,
            blend_shapes,
            ..
        } = dna.layers_mut();

        if let Some(def) = definition {
            let joints = def
                .neutral_joint_translations
                .iter_mut()
                .zip(def.neutral_joint_rotations.iter_mut())
                .enumerate();
            for (j, (t, rot)) in joints {
                if is_root(&def.joint_hierarchy, j) {
                    *t = o + r * (*t - o);
                    *rot = rotation_to_euler(&(r * euler_to_rotation(*rot, unit)), unit);
                }
            }
        }
        if let Some(geometry) = geometry {
            for mesh in geometry.meshes.iter_mut() {
                for p in mesh.positions.iter_mut() {
                    *p = o + r * (*p - o);
                }
                for n in mesh.normals.iter_mut() {
                    *n = r * *n;
                }
            }
        }
        if let Some(blend_shapes) = blend_shapes {
            for d in blend_shapes
                .targets
                .iter_mut()
                .flatten()
                .flat_map(|t| t.deltas.iter_mut())
            {
                *d = r * *d;
            }
        }
        Ok(())
    }
}

/// Move root joints and vertex positions by `translation`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TranslateCommand {
    pub translation: Vector3<f32>,
}

impl TranslateCommand {
    pub fn new(translation: Vector3<f32>) -> Self {
        Self { translation }
    }
}

impl Command for TranslateCommand {
    fn run(&self, dna: &mut Dna) -> Result<()> {
        let v = self.translation;
        if v == Vector3::zeros() {
            return Ok(());
        }
        let LayersMut {
            definition,
            geometry,
            ..
        } = dna.layers_mut();
        if let Some(def) = definition {
            for (j, t) in def.neutral_joint_translations.iter_mut().enumerate() {
                if is_root(&def.joint_hierarchy, j) {
                    *t += v;
                }
            }
        }
        if let Some(geometry) = geometry {
            for p in geometry.meshes.iter_mut().flat_map(|m| m.positions.iter_mut()) {
                *p += v;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, MeshIndex};

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn scale_about_origin() {
        let rig = ScaleCommand::new(2.0, Vector3::new(0.0, 120.0, 0.0))
            .apply(fixture::rig())
            .unwrap();
        let def = rig.definition().unwrap();
        assert_eq!(def.neutral_joint_translations[0], Vector3::new(0.0, 80.0, 0.0));
        assert_eq!(def.neutral_joint_translations[1], Vector3::new(0.0, 20.0, 0.0));
        // head translate x is scaled, jaw rotate x isn't
        assert_eq!(rig.behavior().unwrap().joints.groups[0].values, vec![1.0, 1.0]);
        assert_eq!(
            rig.vertex_positions(MeshIndex(0)).unwrap()[2],
            Vector3::new(2.0, -118.0, 0.0)
        );
        assert_eq!(
            rig.blend_shape_targets(MeshIndex(0)).unwrap()[0].deltas[0],
            Vector3::new(0.0, -2.0, 0.0)
        );
    }

    #[test]
    fn scale_by_one_is_skipped() {
        let rig = ScaleCommand::new(1.0, Vector3::new(5.0, 5.0, 5.0))
            .apply(fixture::rig())
            .unwrap();
        assert_eq!(rig, fixture::rig());
    }

    #[test]
    fn rotate_quarter_turn() {
        let rig = RotateCommand::new(Vector3::new(0.0, 0.0, 90.0), Vector3::zeros())
            .apply(fixture::rig())
            .unwrap();
        let def = rig.definition().unwrap();
        assert!(close(def.neutral_joint_translations[0], Vector3::new(-100.0, 0.0, 0.0)));
        assert!(close(def.neutral_joint_rotations[0], Vector3::new(0.0, 0.0, 90.0)));
        // children are parent-relative
        assert_eq!(def.neutral_joint_translations[1], Vector3::new(0.0, 10.0, 0.0));
        assert_eq!(def.neutral_joint_rotations[1], Vector3::new(10.0, 0.0, 0.0));

        let head = rig.mesh(MeshIndex(0)).unwrap();
        assert!(close(head.positions[1], Vector3::new(0.0, 1.0, 0.0)));
        assert!(close(head.normals[0], Vector3::z()));
        let delta = rig.blend_shape_targets(MeshIndex(0)).unwrap()[0].deltas[0];
        assert!(close(delta, Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn rotate_in_radians() {
        let mut rig = fixture::rig();
        rig.try_descriptor_mut().unwrap().rotation_unit = RotationUnit::Radians;
        let rig = RotateCommand::new(Vector3::new(90.0, 0.0, 0.0), Vector3::zeros())
            .apply(rig)
            .unwrap();
        let rotation = rig.definition().unwrap().neutral_joint_rotations[0];
        assert!(close(rotation, Vector3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0)));
    }

    #[test]
    fn translate_roots_and_vertices() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let rig = TranslateCommand::new(v).apply(fixture::rig()).unwrap();
        let def = rig.definition().unwrap();
        assert_eq!(def.neutral_joint_translations[0], Vector3::new(1.0, 102.0, 3.0));
        assert_eq!(
            def.neutral_joint_translations[1..],
            fixture::definition().neutral_joint_translations[1..]
        );
        assert_eq!(
            rig.vertex_positions(MeshIndex(2)).unwrap()[0],
            Vector3::new(1.0, 2.0, 4.0)
        );
        // offsets don't move
        assert_eq!(rig.blend_shapes(), fixture::rig().blend_shapes());
    }
}
