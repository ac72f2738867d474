//! Selective binary decoding.
//!
//! [BinaryReader] parses only the header up front; each layer is decoded on request by seeking
//! straight to its section, so layers outside the requested mask are never touched.

use crate::{
    codec::{Cursor, Header, Section},
    AnimatedMapBehavior, Behavior, BlendShapeChannelBehavior, BlendShapeTarget, BlendShapes,
    Conditional, ConditionalTable, Controls, CoordinateSystem, Definition, Descriptor, Dna,
    Error, Geometry, Influence, JointBehavior, JointGroup, LayerBitmask, LodMapping, Mesh,
    PsdEntry, PsdMatrix, Result, SkinWeights, TypedIndex, VertexIndex, VertexLayout,
};

/// Decode a container, loading only the layers in `mask` (and the layers they imply).
pub fn decode(data: &[u8], mask: impl Into<LayerBitmask>) -> Result<Dna> {
    Dna::new().read(&BinaryReader::new(data)?, mask)
}

/// A parsed header over the raw bytes of a container.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    header: Header,
}

impl<'a> BinaryReader<'a> {
    /// Parse the header of `data`.
    ///
    /// # Errors
    /// * [Error::CorruptFormat] on a malformed header
    /// * [Error::UnsupportedVersion] on an unknown header version
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = Header::read(data)?;
        tracing::trace!(
            generation = header.generation,
            version = header.version,
            layers = ?header.layers,
            "parsed container header"
        );
        Ok(Self { data, header })
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Layers present in the underlying container.
    #[inline]
    pub fn layers(&self) -> LayerBitmask {
        self.header.layers
    }

    /// Position a cursor at the start of `section`'s payload, or [None] if it's absent.
    fn section(&self, section: Section) -> Result<Option<Cursor<'a>>> {
        let Some(offset) = self.header.offset(section) else {
            return Ok(None);
        };
        let mut cursor = Cursor::new(self.data).at_offset(offset)?;
        section.expect(&mut cursor)?;
        Ok(Some(cursor))
    }

    /// Ensure `cursor` consumed `section` exactly.
    fn finish(&self, section: Section, cursor: &Cursor<'_>) -> Result<()> {
        let end = self.header.section_end(section, self.data.len());
        if cursor.position() != end {
            return Err(Error::corrupt(
                cursor.position(),
                format!("{section:?} section should end at byte {end}"),
            ));
        }
        Ok(())
    }

    pub fn read_descriptor(&self) -> Result<Option<Descriptor>> {
        let Some(mut c) = self.section(Section::Descriptor)? else {
            return Ok(None);
        };
        let res = Descriptor {
            name: c.read_string()?,
            archetype: c.read_enum("archetype")?,
            gender: c.read_enum("gender")?,
            age: c.read_u16()?,
            metadata: c.read_vec(8, |c| Ok((c.read_string()?, c.read_string()?)))?,
            translation_unit: c.read_enum("translation unit")?,
            rotation_unit: c.read_enum("rotation unit")?,
            coordinate_system: CoordinateSystem {
                x: c.read_enum("direction")?,
                y: c.read_enum("direction")?,
                z: c.read_enum("direction")?,
            },
            lod_count: c.read_u16()?,
            max_lod: c.read_u16()?,
            complexity: c.read_string()?,
            db_name: c.read_string()?,
        };
        self.finish(Section::Descriptor, &c)?;
        tracing::debug!(name = %res.name, lod_count = res.lod_count, "read descriptor");
        Ok(Some(res))
    }

    pub fn read_definition(&self) -> Result<Option<Definition>> {
        let Some(mut c) = self.section(Section::Definition)? else {
            return Ok(None);
        };
        let lod_joint_mapping = read_lod_mapping(&mut c)?;
        let lod_blend_shape_mapping = read_lod_mapping(&mut c)?;
        let lod_animated_map_mapping = read_lod_mapping(&mut c)?;
        let lod_mesh_mapping = read_lod_mapping(&mut c)?;
        let gui_control_names = c.read_string_vec()?;
        let raw_control_names = c.read_string_vec()?;
        let joint_names = c.read_string_vec()?;
        let blend_shape_channel_names = c.read_string_vec()?;
        let animated_map_names = c.read_string_vec()?;
        let mesh_names = c.read_string_vec()?;

        let offset = c.position();
        let meshes = c.read_index_vec()?;
        let channels = c.read_index_vec()?;
        if meshes.len() != channels.len() {
            return Err(Error::corrupt(
                offset,
                format!(
                    "mesh/channel mapping halves differ in length: {} vs {}",
                    meshes.len(),
                    channels.len()
                ),
            ));
        }

        let res = Definition {
            gui_control_names,
            raw_control_names,
            joint_names,
            blend_shape_channel_names,
            animated_map_names,
            mesh_names,
            lod_joint_mapping,
            lod_blend_shape_mapping,
            lod_animated_map_mapping,
            lod_mesh_mapping,
            mesh_blend_shape_channel_mapping: meshes.into_iter().zip(channels).collect(),
            joint_hierarchy: c.read_index_vec()?,
            neutral_joint_translations: c.read_vector3_vec()?,
            neutral_joint_rotations: c.read_vector3_vec()?,
        };
        self.finish(Section::Definition, &c)?;
        tracing::debug!(
            joints = res.joint_count(),
            meshes = res.mesh_count(),
            channels = res.blend_shape_channel_count(),
            "read definition"
        );
        Ok(Some(res))
    }

    pub fn read_behavior(&self) -> Result<Option<Behavior>> {
        let Some(mut c) = self.section(Section::Behavior)? else {
            return Ok(None);
        };
        let controls = Controls {
            psd_count: c.read_u16()?,
            conditionals: read_conditionals(&mut c)?,
            psds: read_psds(&mut c)?,
        };
        let joints = JointBehavior {
            row_count: c.read_u16()?,
            col_count: c.read_u16()?,
            groups: c.read_vec(20, read_joint_group)?,
        };
        let blend_shape_channels = {
            let lods = c.read_u16_vec()?;
            let offset = c.position();
            let input_indices = c.read_u16_vec()?;
            let output_indices = c.read_index_vec()?;
            if input_indices.len() != output_indices.len() {
                return Err(Error::corrupt(
                    offset,
                    "blend shape channel inputs and outputs differ in length",
                ));
            }
            BlendShapeChannelBehavior {
                lods,
                input_indices,
                output_indices,
            }
        };
        let animated_maps = AnimatedMapBehavior {
            lods: c.read_u16_vec()?,
            conditionals: read_conditionals(&mut c)?,
        };
        self.finish(Section::Behavior, &c)?;
        tracing::debug!(joint_groups = joints.groups.len(), "read behavior");
        Ok(Some(Behavior {
            controls,
            joints,
            blend_shape_channels,
            animated_maps,
        }))
    }

    /// Read the geometry section, decoding the neutral meshes if `rest` is set and the
    /// blend-shape targets if `blend_shapes` is set; whichever half isn't wanted is skipped.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn read_geometry(
        &self,
        rest: bool,
        blend_shapes: bool,
    ) -> Result<(Option<Geometry>, Option<BlendShapes>)> {
        let Some(mut c) = self.section(Section::Geometry)? else {
            return Ok((None, None));
        };
        let rest = rest && self.layers().contains(LayerBitmask::GEOMETRY_REST);
        let blend_shapes =
            blend_shapes && self.layers().contains(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY);

        let mesh_count = c.read_len(8)?;
        let mut meshes = Vec::with_capacity(if rest { mesh_count } else { 0 });
        let mut targets = Vec::with_capacity(if blend_shapes { mesh_count } else { 0 });
        for mesh_index in 0..mesh_count {
            let offset = c.position();
            let mesh_end = c.read_u32()? as usize;
            let rest_end = c.read_u32()? as usize;
            if rest_end < c.position() || mesh_end < rest_end || mesh_end > self.data.len() {
                return Err(Error::corrupt(
                    offset,
                    format!("bad offsets for mesh {mesh_index}: rest ends at {rest_end}, mesh at {mesh_end}"),
                ));
            }
            if rest {
                meshes.push(read_mesh(&mut c)?);
                expect_at(&c, rest_end, "mesh data")?;
            } else {
                c.seek(rest_end)?;
            }
            if blend_shapes {
                targets.push(c.read_vec(16, read_blend_shape_target)?);
                expect_at(&c, mesh_end, "blend shape targets")?;
            } else {
                tracing::trace!(mesh_index, bytes = mesh_end - rest_end, "skipping blend shape targets");
                c.seek(mesh_end)?;
            }
        }
        self.finish(Section::Geometry, &c)?;

        Ok((
            rest.then_some(Geometry { meshes }),
            blend_shapes.then_some(BlendShapes { targets }),
        ))
    }
}

fn expect_at(c: &Cursor<'_>, end: usize, what: &str) -> Result<()> {
    if c.position() != end {
        return Err(Error::corrupt(
            c.position(),
            format!("{what} should end at byte {end}"),
        ));
    }
    Ok(())
}

fn read_lod_mapping<I: TypedIndex<Repr = u16>>(c: &mut Cursor<'_>) -> Result<LodMapping<I>> {
    let lods = c.read_u16_vec()?;
    let lists = c.read_vec(4, Cursor::read_index_vec)?;
    Ok(LodMapping::from_raw_parts(lods, lists))
}

fn read_conditionals(c: &mut Cursor<'_>) -> Result<ConditionalTable> {
    let offset = c.position();
    let inputs = c.read_u16_vec()?;
    let outputs = c.read_u16_vec()?;
    let froms = c.read_f32_vec()?;
    let tos = c.read_f32_vec()?;
    let slopes = c.read_f32_vec()?;
    let cuts = c.read_f32_vec()?;
    let n = inputs.len();
    if [outputs.len(), froms.len(), tos.len(), slopes.len(), cuts.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err(Error::corrupt(offset, "conditional table columns differ in length"));
    }
    let rows = (0..n)
        .map(|i| Conditional {
            input: inputs[i],
            output: outputs[i],
            from: froms[i],
            to: tos[i],
            slope: slopes[i],
            cut: cuts[i],
        })
        .collect();
    Ok(ConditionalTable { rows })
}

fn read_psds(c: &mut Cursor<'_>) -> Result<PsdMatrix> {
    let offset = c.position();
    let rows = c.read_u16_vec()?;
    let cols = c.read_u16_vec()?;
    let values = c.read_f32_vec()?;
    if rows.len() != cols.len() || rows.len() != values.len() {
        return Err(Error::corrupt(offset, "PSD matrix columns differ in length"));
    }
    let entries = rows
        .into_iter()
        .zip(cols)
        .zip(values)
        .map(|((row, col), value)| PsdEntry { row, col, value })
        .collect();
    Ok(PsdMatrix { entries })
}

fn read_joint_group(c: &mut Cursor<'_>) -> Result<JointGroup> {
    let offset = c.position();
    let group = JointGroup {
        lods: c.read_u16_vec()?,
        input_indices: c.read_u16_vec()?,
        output_indices: c.read_u16_vec()?,
        values: c.read_f32_vec()?,
        joint_indices: c.read_index_vec()?,
    };
    if group.values.len() != group.row_count() * group.col_count() {
        return Err(Error::corrupt(
            offset,
            format!(
                "joint group has {} values for a {}×{} block",
                group.values.len(),
                group.row_count(),
                group.col_count()
            ),
        ));
    }
    if let Some(&lod) = group.lods.iter().find(|&&l| l as usize > group.row_count()) {
        return Err(Error::corrupt(
            offset,
            format!("joint group level uses {lod} of {} rows", group.row_count()),
        ));
    }
    Ok(group)
}

fn read_mesh(c: &mut Cursor<'_>) -> Result<Mesh> {
    let positions = c.read_vector3_vec()?;
    let texture_coordinates = c.read_vector2_vec()?;
    let normals = c.read_vector3_vec()?;

    let offset = c.position();
    let layout_positions = c.read_u32_vec()?;
    let layout_uvs = c.read_u32_vec()?;
    let layout_normals = c.read_u32_vec()?;
    if layout_positions.len() != layout_uvs.len() || layout_positions.len() != layout_normals.len()
    {
        return Err(Error::corrupt(offset, "vertex layout columns differ in length"));
    }
    let layouts = layout_positions
        .into_iter()
        .zip(layout_uvs)
        .zip(layout_normals)
        .map(|((position, texture_coordinate), normal)| VertexLayout {
            position,
            texture_coordinate,
            normal,
        })
        .collect();

    let faces = c.read_vec(4, Cursor::read_u32_vec)?;
    let max_influence_per_vertex = c.read_u16()?;
    let skin_weights = c.read_vec(8, |c| {
        let offset = c.position();
        let weights = c.read_f32_vec()?;
        let joints = c.read_index_vec()?;
        if weights.len() != joints.len() {
            return Err(Error::corrupt(offset, "skin weights and joints differ in length"));
        }
        Ok(SkinWeights {
            influences: joints
                .into_iter()
                .zip(weights)
                .map(|(joint, weight)| Influence { joint, weight })
                .collect(),
        })
    })?;

    Ok(Mesh {
        positions,
        texture_coordinates,
        normals,
        layouts,
        faces,
        max_influence_per_vertex,
        skin_weights,
    })
}

fn read_blend_shape_target(c: &mut Cursor<'_>) -> Result<BlendShapeTarget> {
    let channel = c.read_u16()?.into();
    let offset = c.position();
    let deltas = c.read_vector3_vec()?;
    let vertex_indices = c.read_vec(4, |c| c.read_u32().map(VertexIndex))?;
    if deltas.len() != vertex_indices.len() {
        return Err(Error::corrupt(offset, "blend shape deltas and vertices differ in length"));
    }
    Ok(BlendShapeTarget {
        channel,
        vertex_indices,
        deltas,
    })
}
