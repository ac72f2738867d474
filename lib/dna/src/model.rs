use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    de::binary::BinaryReader, Behavior, BlendShapeTarget, BlendShapes, Definition, Descriptor,
    Error, Geometry, JointIndex, Layer, LayerBitmask, Mesh, MeshIndex, ReferenceIndex, Result,
    TypedIndex,
};

/// One rig description, with any subset of its layers loaded.
///
/// # Invariants
///
/// * Once [Dna::read] returns, every loaded layer's cross-references are consistent with each
///   other (see [ReferenceIndex::validate])
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dna {
    descriptor: Layer<Descriptor>,
    definition: Layer<Definition>,
    behavior: Layer<Behavior>,
    geometry: Layer<Geometry>,
    blend_shapes: Layer<BlendShapes>,
}

/// Simultaneous mutable access to every loaded layer of a [Dna].
#[derive(Debug)]
pub struct LayersMut<'dna> {
    pub descriptor: Option<&'dna mut Descriptor>,
    pub definition: Option<&'dna mut Definition>,
    pub behavior: Option<&'dna mut Behavior>,
    pub geometry: Option<&'dna mut Geometry>,
    pub blend_shapes: Option<&'dna mut BlendShapes>,
}

fn when<T>(cond: bool, load: impl FnOnce() -> Result<Option<T>>) -> Result<Option<T>> {
    if cond {
        load()
    } else {
        Ok(None)
    }
}

fn not_loaded(layer: LayerBitmask) -> Error {
    Error::LayerNotLoaded(layer)
}

impl Dna {
    /// A model with nothing loaded.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = Layer::Loaded(descriptor);
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definition = Layer::Loaded(definition);
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = Layer::Loaded(behavior);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Layer::Loaded(geometry);
        self
    }

    pub fn with_blend_shapes(mut self, blend_shapes: BlendShapes) -> Self {
        self.blend_shapes = Layer::Loaded(blend_shapes);
        self
    }

    /// The layers currently loaded.
    pub fn loaded(&self) -> LayerBitmask {
        let mut res = LayerBitmask::empty();
        res.set(LayerBitmask::DESCRIPTOR, self.descriptor.is_loaded());
        res.set(LayerBitmask::DEFINITION, self.definition.is_loaded());
        res.set(LayerBitmask::BEHAVIOR, self.behavior.is_loaded());
        res.set(LayerBitmask::GEOMETRY_REST, self.geometry.is_loaded());
        res.set(
            LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY,
            self.blend_shapes.is_loaded(),
        );
        res
    }

    /// Load the layers of `mask` (and the layers they imply) which aren't loaded yet.
    ///
    /// Layers already loaded are carried over untouched, and layers missing from the file stay
    /// unloaded, so reading the same mask twice yields the same model.
    ///
    /// # Errors
    /// * [Error::CorruptFormat] if a section being loaded is malformed
    /// * [Error::IndexOutOfRange] or [Error::ReferentialViolation] if the result's
    ///   cross-references are inconsistent
    pub fn read(&self, reader: &BinaryReader<'_>, mask: impl Into<LayerBitmask>) -> Result<Dna> {
        let wanted = mask.into().closure() & reader.layers();
        let missing = wanted - self.loaded();
        let _span = tracing::debug_span!("read", ?wanted, ?missing).entered();

        let (geometry, blend_shapes) = if missing.has_geometry() {
            reader.read_geometry(
                missing.contains(LayerBitmask::GEOMETRY_REST),
                missing.contains(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY),
            )?
        } else {
            (None, None)
        };

        let res = Dna {
            descriptor: self.descriptor.clone().or_load(|| {
                when(missing.contains(LayerBitmask::DESCRIPTOR), || {
                    reader.read_descriptor()
                })
            })?,
            definition: self.definition.clone().or_load(|| {
                when(missing.contains(LayerBitmask::DEFINITION), || {
                    reader.read_definition()
                })
            })?,
            behavior: self.behavior.clone().or_load(|| {
                when(missing.contains(LayerBitmask::BEHAVIOR), || {
                    reader.read_behavior()
                })
            })?,
            geometry: self.geometry.clone().or_load(|| Ok(geometry))?,
            blend_shapes: self.blend_shapes.clone().or_load(|| Ok(blend_shapes))?,
        };
        res.validate()?;
        tracing::debug!(loaded = ?res.loaded(), "read container");
        Ok(res)
    }

    /// A copy of `self` with every layer outside `mask` (and the layers it implies) unloaded.
    pub fn restrict(&self, mask: impl Into<LayerBitmask>) -> Dna {
        let mask = mask.into().closure();
        let keep = |bit: LayerBitmask| mask.contains(bit);
        Dna {
            descriptor: self
                .descriptor()
                .filter(|_| keep(LayerBitmask::DESCRIPTOR))
                .cloned()
                .into(),
            definition: self
                .definition()
                .filter(|_| keep(LayerBitmask::DEFINITION))
                .cloned()
                .into(),
            behavior: self
                .behavior()
                .filter(|_| keep(LayerBitmask::BEHAVIOR))
                .cloned()
                .into(),
            geometry: self
                .geometry()
                .filter(|_| keep(LayerBitmask::GEOMETRY_REST))
                .cloned()
                .into(),
            blend_shapes: self
                .blend_shapes()
                .filter(|_| keep(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY))
                .cloned()
                .into(),
        }
    }

    /// Check the cross-references between loaded layers. Models without a definition have
    /// nothing to check.
    pub fn validate(&self) -> Result<()> {
        match self.definition() {
            Some(_) => self.references()?.validate(),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    #[inline]
    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_ref()
    }

    #[inline]
    pub fn behavior(&self) -> Option<&Behavior> {
        self.behavior.as_ref()
    }

    #[inline]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    #[inline]
    pub fn blend_shapes(&self) -> Option<&BlendShapes> {
        self.blend_shapes.as_ref()
    }

    pub fn try_descriptor(&self) -> Result<&Descriptor> {
        self.descriptor()
            .ok_or_else(|| not_loaded(LayerBitmask::DESCRIPTOR))
    }

    pub fn try_definition(&self) -> Result<&Definition> {
        self.definition()
            .ok_or_else(|| not_loaded(LayerBitmask::DEFINITION))
    }

    pub fn try_geometry(&self) -> Result<&Geometry> {
        self.geometry()
            .ok_or_else(|| not_loaded(LayerBitmask::GEOMETRY_REST))
    }

    pub fn try_blend_shapes(&self) -> Result<&BlendShapes> {
        self.blend_shapes()
            .ok_or_else(|| not_loaded(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY))
    }

    pub fn try_descriptor_mut(&mut self) -> Result<&mut Descriptor> {
        self.descriptor
            .as_mut()
            .ok_or_else(|| not_loaded(LayerBitmask::DESCRIPTOR))
    }

    pub fn try_definition_mut(&mut self) -> Result<&mut Definition> {
        self.definition
            .as_mut()
            .ok_or_else(|| not_loaded(LayerBitmask::DEFINITION))
    }

    pub fn try_behavior_mut(&mut self) -> Result<&mut Behavior> {
        self.behavior
            .as_mut()
            .ok_or_else(|| not_loaded(LayerBitmask::BEHAVIOR))
    }

    pub fn try_geometry_mut(&mut self) -> Result<&mut Geometry> {
        self.geometry
            .as_mut()
            .ok_or_else(|| not_loaded(LayerBitmask::GEOMETRY_REST))
    }

    pub fn try_blend_shapes_mut(&mut self) -> Result<&mut BlendShapes> {
        self.blend_shapes
            .as_mut()
            .ok_or_else(|| not_loaded(LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY))
    }

    /// Borrow every loaded layer mutably at once.
    pub fn layers_mut(&mut self) -> LayersMut<'_> {
        LayersMut {
            descriptor: self.descriptor.as_mut(),
            definition: self.definition.as_mut(),
            behavior: self.behavior.as_mut(),
            geometry: self.geometry.as_mut(),
            blend_shapes: self.blend_shapes.as_mut(),
        }
    }

    /// Index the cross-references of the loaded layers.
    ///
    /// # Errors
    /// * [Error::LayerNotLoaded] if the definition isn't loaded
    pub fn references(&self) -> Result<ReferenceIndex<'_>> {
        Ok(ReferenceIndex::new(
            self.try_definition()?,
            self.behavior(),
            self.geometry(),
            self.blend_shapes(),
        ))
    }

    /// Level-of-detail count, from the definition if loaded, otherwise from the descriptor.
    pub fn lod_count(&self) -> Result<usize> {
        match (self.definition(), self.descriptor()) {
            (Some(def), _) => Ok(def.lod_count()),
            (None, Some(desc)) => Ok(desc.lod_count as usize),
            (None, None) => Err(not_loaded(LayerBitmask::DESCRIPTOR)),
        }
    }

    pub fn joint_count(&self) -> Result<usize> {
        Ok(self.try_definition()?.joint_count())
    }

    pub fn joint_name(&self, joint: JointIndex) -> Result<&str> {
        let def = self.try_definition()?;
        let joint = joint.check(def.joint_count())?;
        Ok(&def.joint_names[joint.get()])
    }

    pub fn joint_parent(&self, joint: JointIndex) -> Result<JointIndex> {
        let def = self.try_definition()?;
        def.joint_parent(joint)
            .ok_or_else(|| Error::out_of_range(JointIndex::KIND, joint.get(), def.joint_count()))
    }

    pub fn neutral_joint_translation(&self, joint: JointIndex) -> Result<Vector3<f32>> {
        let def = self.try_definition()?;
        let joint = joint.check(def.neutral_joint_translations.len())?;
        Ok(def.neutral_joint_translations[joint.get()])
    }

    pub fn mesh_count(&self) -> Result<usize> {
        Ok(self.try_definition()?.mesh_count())
    }

    pub fn mesh_name(&self, mesh: MeshIndex) -> Result<&str> {
        let def = self.try_definition()?;
        let mesh = mesh.check(def.mesh_count())?;
        Ok(&def.mesh_names[mesh.get()])
    }

    pub fn mesh(&self, mesh: MeshIndex) -> Result<&Mesh> {
        let meshes = &self.try_geometry()?.meshes;
        let mesh = mesh.check(meshes.len())?;
        Ok(&meshes[mesh.get()])
    }

    pub fn vertex_positions(&self, mesh: MeshIndex) -> Result<&[Vector3<f32>]> {
        self.mesh(mesh).map(|m| m.positions.as_slice())
    }

    pub fn blend_shape_targets(&self, mesh: MeshIndex) -> Result<&[BlendShapeTarget]> {
        let targets = &self.try_blend_shapes()?.targets;
        let mesh = mesh.check(targets.len())?;
        Ok(&targets[mesh.get()])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{fixture, DataLayer};

    #[test]
    fn restrict_drops_layers() {
        let dna = fixture::rig();
        let light = dna.restrict(DataLayer::AllWithoutBlendShapes);
        assert!(light.blend_shapes().is_none());
        assert!(light.geometry().is_some());
        assert_eq!(light.loaded(), DataLayer::AllWithoutBlendShapes.mask());

        let desc = dna.restrict(DataLayer::Descriptor);
        assert_eq!(desc.loaded(), LayerBitmask::DESCRIPTOR);
        assert!(matches!(
            desc.joint_count(),
            Err(Error::LayerNotLoaded(LayerBitmask::DEFINITION))
        ));
        assert_eq!(desc.lod_count().ok(), Some(2));
    }

    #[test]
    fn getters() {
        let dna = fixture::rig();
        assert_eq!(dna.joint_name(JointIndex(0)).ok(), Some("spine"));
        assert_eq!(dna.joint_parent(JointIndex(2)).ok(), Some(JointIndex(1)));
        assert!(matches!(
            dna.joint_name(JointIndex(99)),
            Err(Error::IndexOutOfRange(_))
        ));
        assert_eq!(dna.mesh_name(MeshIndex(0)).ok(), Some("head_lod0_mesh"));
        assert_eq!(dna.vertex_positions(MeshIndex(0)).map(<[_]>::len).ok(), Some(4));
    }

    #[test]
    fn layers_mut_borrows_disjoint() {
        let mut dna = fixture::rig();
        let layers = dna.layers_mut();
        let (Some(def), Some(geometry)) = (layers.definition, layers.geometry) else {
            panic!("fixture should have a definition and geometry");
        };
        def.joint_names[0] = "root".into();
        geometry.meshes[0].positions[0].x = 7.0;
        assert_eq!(dna.joint_name(JointIndex(0)).ok(), Some("root"));
        assert_eq!(dna.vertex_positions(MeshIndex(0)).ok().map(|p| p[0].x), Some(7.0));
    }
}
