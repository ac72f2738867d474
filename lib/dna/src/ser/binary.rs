use crate::{
    codec::{ByteWriter, Header, Section, EOF_MAGIC, GENERATION, SECTION_COUNT, VERSION},
    Behavior, BlendShapeTarget, BlendShapes, Conditional, ConditionalTable, Definition, Descriptor, Dna,
    Geometry, JointGroup, LayerBitmask, LodMapping, Mesh, Result, TypedIndex,
};

/// Byte position of the first section offset within the header.
const OFFSETS_POS: usize = 3 + 2 + 2 + 2;

/// Encode the layers of `dna` selected by `mask` (and the layers they imply).
///
/// Selected layers which aren't loaded are left out, and recorded as absent in the header.
pub fn encode(dna: &Dna, mask: impl Into<LayerBitmask>) -> Result<Vec<u8>> {
    let layers = mask.into().closure() & dna.loaded();
    tracing::debug!(?layers, "encoding container");

    let mut w = ByteWriter::new();
    Header {
        generation: GENERATION,
        version: VERSION,
        layers,
        offsets: [0; SECTION_COUNT],
    }
    .write(&mut w);

    let mut offsets = [0usize; SECTION_COUNT];
    if let Some(d) = dna.descriptor() {
        if layers.contains(LayerBitmask::DESCRIPTOR) {
            offsets[Section::Descriptor as usize] = begin(&mut w, Section::Descriptor);
            write_descriptor(&mut w, d)?;
        }
    }
    if let Some(d) = dna.definition() {
        if layers.contains(LayerBitmask::DEFINITION) {
            offsets[Section::Definition as usize] = begin(&mut w, Section::Definition);
            write_definition(&mut w, d)?;
        }
    }
    if let Some(b) = dna.behavior() {
        if layers.contains(LayerBitmask::BEHAVIOR) {
            offsets[Section::Behavior as usize] = begin(&mut w, Section::Behavior);
            write_behavior(&mut w, b)?;
        }
    }
    if layers.has_geometry() {
        offsets[Section::Geometry as usize] = begin(&mut w, Section::Geometry);
        let geometry = dna
            .geometry()
            .filter(|_| layers.contains(LayerBitmask::GEOMETRY_REST));
        let blend_shapes = dna
            .blend_shapes()
            .filter(|_| layers.contains(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY));
        write_geometry(&mut w, geometry, blend_shapes)?;
    }
    w.write_bytes(EOF_MAGIC);

    for (i, &offset) in offsets.iter().enumerate() {
        w.patch_u32(OFFSETS_POS + 4 * i, offset)?;
    }
    Ok(w.into_bytes())
}

fn begin(w: &mut ByteWriter, section: Section) -> usize {
    let pos = w.position();
    w.write_u16(section as u16);
    pos
}

fn write_descriptor(w: &mut ByteWriter, d: &Descriptor) -> Result<()> {
    w.write_string(&d.name)?;
    w.write_enum(d.archetype);
    w.write_enum(d.gender);
    w.write_u16(d.age);
    w.write_vec(&d.metadata, |w, (k, v)| {
        w.write_string(k)?;
        w.write_string(v)
    })?;
    w.write_enum(d.translation_unit);
    w.write_enum(d.rotation_unit);
    w.write_enum(d.coordinate_system.x);
    w.write_enum(d.coordinate_system.y);
    w.write_enum(d.coordinate_system.z);
    w.write_u16(d.lod_count);
    w.write_u16(d.max_lod);
    w.write_string(&d.complexity)?;
    w.write_string(&d.db_name)
}

fn write_lod_mapping<I: TypedIndex<Repr = u16>>(
    w: &mut ByteWriter,
    m: &LodMapping<I>,
) -> Result<()> {
    w.write_u16_vec(m.lods())?;
    w.write_vec(m.lists(), |w, list| w.write_index_vec(list))
}

fn write_definition(w: &mut ByteWriter, d: &Definition) -> Result<()> {
    write_lod_mapping(w, &d.lod_joint_mapping)?;
    write_lod_mapping(w, &d.lod_blend_shape_mapping)?;
    write_lod_mapping(w, &d.lod_animated_map_mapping)?;
    write_lod_mapping(w, &d.lod_mesh_mapping)?;
    w.write_string_vec(&d.gui_control_names)?;
    w.write_string_vec(&d.raw_control_names)?;
    w.write_string_vec(&d.joint_names)?;
    w.write_string_vec(&d.blend_shape_channel_names)?;
    w.write_string_vec(&d.animated_map_names)?;
    w.write_string_vec(&d.mesh_names)?;
    let (meshes, channels): (Vec<_>, Vec<_>) =
        d.mesh_blend_shape_channel_mapping.iter().copied().unzip();
    w.write_index_vec(&meshes)?;
    w.write_index_vec(&channels)?;
    w.write_index_vec(&d.joint_hierarchy)?;
    w.write_vector3_vec(&d.neutral_joint_translations)?;
    w.write_vector3_vec(&d.neutral_joint_rotations)
}

fn write_conditionals(w: &mut ByteWriter, t: &ConditionalTable) -> Result<()> {
    w.write_vec(&t.rows, |w, r| {
        w.write_u16(r.input);
        Ok(())
    })?;
    w.write_vec(&t.rows, |w, r| {
        w.write_u16(r.output);
        Ok(())
    })?;
    let columns: [fn(&Conditional) -> f32; 4] =
        [|r| r.from, |r| r.to, |r| r.slope, |r| r.cut];
    for field in columns {
        w.write_vec(&t.rows, |w, r| {
            w.write_f32(field(r));
            Ok(())
        })?;
    }
    Ok(())
}

fn write_joint_group(w: &mut ByteWriter, g: &JointGroup) -> Result<()> {
    w.write_u16_vec(&g.lods)?;
    w.write_u16_vec(&g.input_indices)?;
    w.write_u16_vec(&g.output_indices)?;
    w.write_f32_vec(&g.values)?;
    w.write_index_vec(&g.joint_indices)
}

fn write_behavior(w: &mut ByteWriter, b: &Behavior) -> Result<()> {
    w.write_u16(b.controls.psd_count);
    write_conditionals(w, &b.controls.conditionals)?;
    let psds = &b.controls.psds.entries;
    w.write_vec(psds, |w, e| {
        w.write_u16(e.row);
        Ok(())
    })?;
    w.write_vec(psds, |w, e| {
        w.write_u16(e.col);
        Ok(())
    })?;
    w.write_vec(psds, |w, e| {
        w.write_f32(e.value);
        Ok(())
    })?;

    w.write_u16(b.joints.row_count);
    w.write_u16(b.joints.col_count);
    w.write_vec(&b.joints.groups, write_joint_group)?;

    let channels = &b.blend_shape_channels;
    w.write_u16_vec(&channels.lods)?;
    w.write_u16_vec(&channels.input_indices)?;
    w.write_index_vec(&channels.output_indices)?;

    w.write_u16_vec(&b.animated_maps.lods)?;
    write_conditionals(w, &b.animated_maps.conditionals)
}

fn write_mesh(w: &mut ByteWriter, m: &Mesh) -> Result<()> {
    w.write_vector3_vec(&m.positions)?;
    w.write_vector2_vec(&m.texture_coordinates)?;
    w.write_vector3_vec(&m.normals)?;
    let layout_positions: Vec<u32> = m.layouts.iter().map(|l| l.position).collect();
    let layout_uvs: Vec<u32> = m.layouts.iter().map(|l| l.texture_coordinate).collect();
    let layout_normals: Vec<u32> = m.layouts.iter().map(|l| l.normal).collect();
    w.write_u32_vec(&layout_positions)?;
    w.write_u32_vec(&layout_uvs)?;
    w.write_u32_vec(&layout_normals)?;
    w.write_vec(&m.faces, |w, f| w.write_u32_vec(f))?;
    w.write_u16(m.max_influence_per_vertex);
    w.write_vec(&m.skin_weights, |w, s| {
        w.write_vec(&s.influences, |w, i| {
            w.write_f32(i.weight);
            Ok(())
        })?;
        w.write_vec(&s.influences, |w, i| {
            w.write_u16(i.joint.raw());
            Ok(())
        })
    })
}

fn write_blend_shape_target(w: &mut ByteWriter, t: &BlendShapeTarget) -> Result<()> {
    w.write_u16(t.channel.raw());
    w.write_vector3_vec(&t.deltas)?;
    w.write_vec(&t.vertex_indices, |w, v| {
        w.write_u32(v.raw());
        Ok(())
    })
}

/// Write each mesh as `[mesh end][rest end] rest... targets...`, so readers can skip either half.
fn write_geometry(
    w: &mut ByteWriter,
    geometry: Option<&Geometry>,
    blend_shapes: Option<&BlendShapes>,
) -> Result<()> {
    let meshes = geometry.map(|g| g.meshes.as_slice()).unwrap_or_default();
    let targets = blend_shapes
        .map(|b| b.targets.as_slice())
        .unwrap_or_default();
    let count = meshes.len().max(targets.len());
    let empty = Mesh::default();

    w.write_len(count)?;
    for i in 0..count {
        let start = w.position();
        w.write_u32(0);
        w.write_u32(0);
        write_mesh(w, meshes.get(i).unwrap_or(&empty))?;
        let rest_end = w.position();
        w.write_vec(
            targets.get(i).map(Vec::as_slice).unwrap_or_default(),
            write_blend_shape_target,
        )?;
        let mesh_end = w.position();
        w.patch_u32(start, mesh_end)?;
        w.patch_u32(start + 4, rest_end)?;
    }
    Ok(())
}
