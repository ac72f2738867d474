use dna::{
    Definition, Dna, Influence, JointIndex, LayerBitmask, LayersMut, Remap, TypedIndex,
};

use crate::Result;

fn require(definition: Option<&mut Definition>) -> Result<&mut Definition> {
    definition.ok_or_else(|| dna::Error::LayerNotLoaded(LayerBitmask::DEFINITION).into())
}

/// The nearest ancestor of `joint` that survives `remap`, as a compacted index.
fn surviving_parent(hierarchy: &[JointIndex], remap: &Remap, joint: usize) -> JointIndex {
    let mut current = joint;
    // bounded, in case the hierarchy has a cycle
    for _ in 0..=hierarchy.len() {
        match hierarchy.get(current) {
            Some(&parent) if remap.is_kept(parent.get()) => {
                return remap.index(parent).unwrap_or(JointIndex::ROOT)
            }
            Some(&parent) if parent.get() != current => current = parent.get(),
            _ => break,
        }
    }
    JointIndex::ROOT
}

fn remap_influences(influences: &mut Vec<Influence>, remap: &Remap) {
    let had_any = !influences.is_empty();
    influences.retain_mut(|i| match remap.index(i.joint) {
        Some(joint) => {
            i.joint = joint;
            true
        }
        None => false,
    });
    // weights aren't renormalized, but a vertex never loses its last influence
    if had_any && influences.is_empty() {
        influences.push(Influence {
            joint: JointIndex::ROOT,
            weight: 1.0,
        });
    }
}

/// Compact the joint table.
///
/// Survivors are reparented to their nearest surviving ancestor; their neutral transforms are
/// kept as they are. Joint-group rows and skin influences of removed joints are dropped.
pub(crate) fn compact_joints(dna: &mut Dna, remap: &Remap) -> Result<()> {
    if remap.is_identity() {
        return Ok(());
    }
    let LayersMut {
        definition,
        behavior,
        geometry,
        ..
    } = dna.layers_mut();
    let def = require(definition)?;

    def.joint_hierarchy = remap
        .origins()
        .into_iter()
        .map(|old| surviving_parent(&def.joint_hierarchy, remap, old))
        .collect();
    remap.compact(&mut def.joint_names);
    remap.compact(&mut def.neutral_joint_translations);
    remap.compact(&mut def.neutral_joint_rotations);
    def.lod_joint_mapping.remap(remap);

    if let Some(behavior) = behavior {
        behavior.joints.remap_joints(remap);
    }
    if let Some(geometry) = geometry {
        for skin in geometry
            .meshes
            .iter_mut()
            .flat_map(|m| m.skin_weights.iter_mut())
        {
            remap_influences(&mut skin.influences, remap);
        }
    }
    tracing::trace!(
        before = remap.len_before(),
        after = remap.len_after(),
        "compacted joints"
    );
    Ok(())
}

/// Compact the mesh table, along with each mesh's geometry and blend-shape targets.
pub(crate) fn compact_meshes(dna: &mut Dna, remap: &Remap) -> Result<()> {
    if remap.is_identity() {
        return Ok(());
    }
    let LayersMut {
        definition,
        geometry,
        blend_shapes,
        ..
    } = dna.layers_mut();
    let def = require(definition)?;

    remap.compact(&mut def.mesh_names);
    def.lod_mesh_mapping.remap(remap);
    def.mesh_blend_shape_channel_mapping
        .retain_mut(|(mesh, _)| match remap.index(*mesh) {
            Some(new) => {
                *mesh = new;
                true
            }
            None => false,
        });

    if let Some(geometry) = geometry {
        remap.compact(&mut geometry.meshes);
    }
    if let Some(blend_shapes) = blend_shapes {
        remap.compact(&mut blend_shapes.targets);
    }
    tracing::trace!(
        before = remap.len_before(),
        after = remap.len_after(),
        "compacted meshes"
    );
    Ok(())
}

/// Compact the blend-shape channel table; targets driven by removed channels are dropped.
pub(crate) fn compact_channels(dna: &mut Dna, remap: &Remap) -> Result<()> {
    if remap.is_identity() {
        return Ok(());
    }
    let LayersMut {
        definition,
        behavior,
        blend_shapes,
        ..
    } = dna.layers_mut();
    let def = require(definition)?;

    remap.compact(&mut def.blend_shape_channel_names);
    def.lod_blend_shape_mapping.remap(remap);
    def.mesh_blend_shape_channel_mapping
        .retain_mut(|(_, channel)| match remap.index(*channel) {
            Some(new) => {
                *channel = new;
                true
            }
            None => false,
        });

    if let Some(behavior) = behavior {
        behavior.blend_shape_channels.remap_channels(remap);
    }
    if let Some(blend_shapes) = blend_shapes {
        for targets in blend_shapes.targets.iter_mut() {
            targets.retain_mut(|t| match remap.index(t.channel) {
                Some(new) => {
                    t.channel = new;
                    true
                }
                None => false,
            });
        }
    }
    tracing::trace!(
        before = remap.len_before(),
        after = remap.len_after(),
        "compacted blend shape channels"
    );
    Ok(())
}

pub(crate) fn compact_animated_maps(dna: &mut Dna, remap: &Remap) -> Result<()> {
    if remap.is_identity() {
        return Ok(());
    }
    let LayersMut {
        definition,
        behavior,
        ..
    } = dna.layers_mut();
    let def = require(definition)?;

    remap.compact(&mut def.animated_map_names);
    def.lod_animated_map_mapping.remap(remap);
    if let Some(behavior) = behavior {
        behavior.animated_maps.remap_animated_maps(remap);
    }
    tracing::trace!(
        before = remap.len_before(),
        after = remap.len_after(),
        "compacted animated maps"
    );
    Ok(())
}
