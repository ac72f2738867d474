use crate::{
    AnimatedMapIndex, Behavior, BlendShapeChannelIndex, BlendShapes, Definition, Error,
    Geometry, JointIndex, LodMapping, MeshIndex, Result, TypedIndex,
};

/// Read-only view of the integer cross-references between the loaded layers of a
/// [Dna](crate::Dna).
///
/// Obtained through [Dna::references](crate::Dna::references).
#[derive(Debug, Clone, Copy)]
pub struct ReferenceIndex<'dna> {
    definition: &'dna Definition,
    behavior: Option<&'dna Behavior>,
    geometry: Option<&'dna Geometry>,
    blend_shapes: Option<&'dna BlendShapes>,
}

fn check_all<I: TypedIndex>(items: impl IntoIterator<Item = I>, len: usize) -> Result<()> {
    for i in items {
        i.check(len)?;
    }
    Ok(())
}

fn check_raw(kind: &'static str, items: impl IntoIterator<Item = usize>, len: usize) -> Result<()> {
    match items.into_iter().find(|&i| i >= len) {
        Some(i) => Err(Error::out_of_range(kind, i, len)),
        None => Ok(()),
    }
}

fn check_mapping<I: TypedIndex>(mapping: &LodMapping<I>, len: usize) -> Result<()> {
    check_raw(
        "level-of-detail list",
        mapping.lods().iter().map(|&l| l as usize),
        mapping.lists().len(),
    )?;
    check_all(mapping.lists().iter().flatten().copied(), len)
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::ReferentialViolation(format!(
            "{what}: expected {expected} entries, found {actual}"
        )));
    }
    Ok(())
}

impl<'dna> ReferenceIndex<'dna> {
    pub fn new(
        definition: &'dna Definition,
        behavior: Option<&'dna Behavior>,
        geometry: Option<&'dna Geometry>,
        blend_shapes: Option<&'dna BlendShapes>,
    ) -> Self {
        Self {
            definition,
            behavior,
            geometry,
            blend_shapes,
        }
    }

    #[inline]
    pub fn definition(&self) -> &'dna Definition {
        self.definition
    }

    #[inline]
    pub fn joints(&self) -> &'dna LodMapping<JointIndex> {
        &self.definition.lod_joint_mapping
    }

    #[inline]
    pub fn meshes(&self) -> &'dna LodMapping<MeshIndex> {
        &self.definition.lod_mesh_mapping
    }

    #[inline]
    pub fn blend_shape_channels(&self) -> &'dna LodMapping<BlendShapeChannelIndex> {
        &self.definition.lod_blend_shape_mapping
    }

    #[inline]
    pub fn animated_maps(&self) -> &'dna LodMapping<AnimatedMapIndex> {
        &self.definition.lod_animated_map_mapping
    }

    #[inline]
    pub fn lod_count(&self) -> usize {
        self.definition.lod_count()
    }

    /// Joints which are their own parent.
    pub fn root_joints(&self) -> impl Iterator<Item = JointIndex> + 'dna {
        self.definition
            .joint_hierarchy
            .iter()
            .enumerate()
            .filter(|&(i, p)| p.get() == i)
            .map(|(_, &p)| p)
    }

    /// Direct children of `joint`, in index order.
    pub fn children_of(&self, joint: JointIndex) -> impl Iterator<Item = JointIndex> + 'dna {
        self.definition
            .joint_hierarchy
            .iter()
            .enumerate()
            .filter(move |&(i, &p)| p == joint && i != joint.get())
            .filter_map(|(i, _)| JointIndex::try_from_usize(i))
    }

    /// Check every cross-reference between the loaded layers.
    ///
    /// # Errors
    /// * [Error::IndexOutOfRange] if any reference is past the end of the table it points into
    /// * [Error::ReferentialViolation] if parallel tables disagree in length, or the hierarchy
    ///   isn't rooted at joint 0 alone
    pub fn validate(&self) -> Result<()> {
        let def = self.definition;
        let joints = def.joint_count();
        let meshes = def.mesh_count();
        let channels = def.blend_shape_channel_count();
        let animated_maps = def.animated_map_count();

        check_len("joint hierarchy", def.joint_hierarchy.len(), joints)?;
        check_len(
            "neutral joint translations",
            def.neutral_joint_translations.len(),
            joints,
        )?;
        check_len(
            "neutral joint rotations",
            def.neutral_joint_rotations.len(),
            joints,
        )?;
        check_all(def.joint_hierarchy.iter().copied(), joints)?;
        for (i, &parent) in def.joint_hierarchy.iter().enumerate() {
            match (i, parent.get() == i) {
                (0, false) => {
                    return Err(Error::ReferentialViolation(format!(
                        "root joint has parent {parent}"
                    )))
                }
                (0, true) | (_, false) => {}
                (_, true) => {
                    return Err(Error::ReferentialViolation(format!(
                        "joint {i} is its own parent"
                    )))
                }
            }
        }

        check_mapping(&def.lod_joint_mapping, joints)?;
        check_mapping(&def.lod_mesh_mapping, meshes)?;
        check_mapping(&def.lod_blend_shape_mapping, channels)?;
        check_mapping(&def.lod_animated_map_mapping, animated_maps)?;
        for &(mesh, channel) in def.mesh_blend_shape_channel_mapping.iter() {
            mesh.check(meshes)?;
            channel.check(channels)?;
        }

        if let Some(behavior) = self.behavior {
            let rows = behavior.joints.row_count as usize;
            for group in behavior.joints.groups.iter() {
                check_all(group.joint_indices.iter().copied(), joints)?;
                check_raw(
                    "joint attribute",
                    group.output_indices.iter().map(|&o| o as usize),
                    rows,
                )?;
            }
            check_all(
                behavior.blend_shape_channels.output_indices.iter().copied(),
                channels,
            )?;
            check_raw(
                AnimatedMapIndex::KIND,
                behavior
                    .animated_maps
                    .conditionals
                    .rows
                    .iter()
                    .map(|r| r.output as usize),
                animated_maps,
            )?;
        }

        if let Some(geometry) = self.geometry {
            check_len("mesh table", geometry.meshes.len(), meshes)?;
            for mesh in geometry.meshes.iter() {
                let layouts = &mesh.layouts;
                check_raw(
                    "vertex position",
                    layouts.iter().map(|l| l.position as usize),
                    mesh.positions.len(),
                )?;
                check_raw(
                    "texture coordinate",
                    layouts.iter().map(|l| l.texture_coordinate as usize),
                    mesh.texture_coordinates.len(),
                )?;
                if !mesh.normals.is_empty() {
                    check_raw(
                        "normal",
                        layouts.iter().map(|l| l.normal as usize),
                        mesh.normals.len(),
                    )?;
                }
                check_raw(
                    "vertex layout",
                    mesh.faces.iter().flatten().map(|&f| f as usize),
                    layouts.len(),
                )?;
                check_all(
                    mesh.skin_weights
                        .iter()
                        .flat_map(|s| s.influences.iter().map(|i| i.joint)),
                    joints,
                )?;
            }
        }

        if let Some(blend_shapes) = self.blend_shapes {
            check_len("blend shape target table", blend_shapes.targets.len(), meshes)?;
            for (m, targets) in blend_shapes.targets.iter().enumerate() {
                let vertices = self
                    .geometry
                    .and_then(|g| g.meshes.get(m))
                    .map(|mesh| mesh.vertex_count());
                for target in targets.iter() {
                    target.channel.check(channels)?;
                    if let Some(vertices) = vertices {
                        check_all(target.vertex_indices.iter().copied(), vertices)?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{fixture, VertexIndex};

    #[test]
    fn fixture_is_consistent() {
        let dna = fixture::rig();
        let refs = dna.references().unwrap();
        refs.validate().unwrap();
        assert_eq!(refs.root_joints().collect::<Vec<_>>(), vec![JointIndex::ROOT]);
        assert_eq!(
            refs.children_of(JointIndex::ROOT).collect::<Vec<_>>(),
            vec![JointIndex(1), JointIndex(3)]
        );
        assert_eq!(refs.lod_count(), 2);
    }

    #[test]
    fn second_root() {
        let mut dna = fixture::rig();
        dna.try_definition_mut().unwrap().joint_hierarchy[2] = JointIndex(2);
        assert!(matches!(
            dna.validate(),
            Err(Error::ReferentialViolation(_))
        ));
    }

    #[test]
    fn dangling_skin_joint() {
        let mut dna = fixture::rig();
        dna.try_geometry_mut().unwrap().meshes[0].skin_weights[0].influences[0].joint =
            JointIndex(200);
        assert!(matches!(
            dna.validate(),
            Err(Error::IndexOutOfRange(e)) if e.kind == "joint" && e.index == 200
        ));
    }

    #[test]
    fn target_vertex_past_mesh() {
        let mut dna = fixture::rig();
        dna.try_blend_shapes_mut().unwrap().targets[0][0]
            .vertex_indices
            .push(VertexIndex(4));
        dna.try_blend_shapes_mut().unwrap().targets[0][0]
            .deltas
            .push(Default::default());
        assert!(matches!(
            dna.validate(),
            Err(Error::IndexOutOfRange(e)) if e.kind == "vertex"
        ));
    }

    #[test]
    fn lod_list_past_table() {
        let mut dna = fixture::rig();
        let def = dna.try_definition_mut().unwrap();
        def.lod_mesh_mapping = LodMapping::from_levels([vec![MeshIndex(0), MeshIndex(9)]]);
        assert!(matches!(
            dna.validate(),
            Err(Error::IndexOutOfRange(e)) if e.kind == "mesh"
        ));
    }
}
