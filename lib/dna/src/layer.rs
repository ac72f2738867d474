use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

bitflags::bitflags! {
    /// The raw layer bits stored in a container header.
    ///
    /// Geometry is split in two so that blend-shape deltas (usually most of a file) can be
    /// skipped independently of the rest of the meshes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LayerBitmask: u16 {
        const DESCRIPTOR = 1 << 0;
        const DEFINITION = 1 << 1;
        const BEHAVIOR = 1 << 2;
        const GEOMETRY_BLEND_SHAPES_ONLY = 1 << 3;
        const GEOMETRY_REST = 1 << 4;
    }
}

impl LayerBitmask {
    /// Add every layer implied by the layers already in `self`: every layer implies
    /// [Self::DESCRIPTOR], and every layer past the descriptor implies [Self::DEFINITION].
    pub fn closure(self) -> Self {
        let mut res = self;
        if !self.is_empty() {
            res |= Self::DESCRIPTOR;
        }
        if self.intersects(Self::BEHAVIOR | Self::GEOMETRY_REST | Self::GEOMETRY_BLEND_SHAPES_ONLY) {
            res |= Self::DEFINITION;
        }
        res
    }

    /// Either half of the geometry layer.
    #[inline]
    pub fn has_geometry(self) -> bool {
        self.intersects(Self::GEOMETRY_REST | Self::GEOMETRY_BLEND_SHAPES_ONLY)
    }
}

/// The named, cumulative layer selections a container can be read or written with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLayer {
    Descriptor,
    Definition,
    Behavior,
    Geometry,
    GeometryWithoutBlendShapes,
    AllWithoutBlendShapes,
    All,
}

impl DataLayer {
    pub const fn mask(self) -> LayerBitmask {
        const D: LayerBitmask = LayerBitmask::DESCRIPTOR;
        const DF: LayerBitmask = LayerBitmask::DEFINITION;
        const B: LayerBitmask = LayerBitmask::BEHAVIOR;
        const GB: LayerBitmask = LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY;
        const GR: LayerBitmask = LayerBitmask::GEOMETRY_REST;
        match self {
            DataLayer::Descriptor => D,
            DataLayer::Definition => D.union(DF),
            DataLayer::Behavior => D.union(DF).union(B),
            DataLayer::Geometry => D.union(DF).union(GR).union(GB),
            DataLayer::GeometryWithoutBlendShapes => D.union(DF).union(GR),
            DataLayer::AllWithoutBlendShapes => D.union(DF).union(B).union(GR),
            DataLayer::All => LayerBitmask::all(),
        }
    }
}

impl From<DataLayer> for LayerBitmask {
    #[inline]
    fn from(layer: DataLayer) -> Self {
        layer.mask()
    }
}

impl std::fmt::Display for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataLayer::Descriptor => "descriptor",
            DataLayer::Definition => "definition",
            DataLayer::Behavior => "behavior",
            DataLayer::Geometry => "geometry",
            DataLayer::GeometryWithoutBlendShapes => "geometry-without-blend-shapes",
            DataLayer::AllWithoutBlendShapes => "all-without-blend-shapes",
            DataLayer::All => "all",
        })
    }
}

impl FromStr for DataLayer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "descriptor" => DataLayer::Descriptor,
            "definition" => DataLayer::Definition,
            "behavior" => DataLayer::Behavior,
            "geometry" => DataLayer::Geometry,
            "geometry-without-blend-shapes" => DataLayer::GeometryWithoutBlendShapes,
            "all-without-blend-shapes" => DataLayer::AllWithoutBlendShapes,
            "all" => DataLayer::All,
            _ => return Err(Error::invalid(format!("unknown data layer: {s:?}"))),
        })
    }
}

/// Load state of a single layer within a [Dna](crate::Dna).
///
/// A layer goes from [Layer::NotLoaded] to [Layer::Loaded] at most once; there is no way back
/// other than building a new model (see [Dna::restrict](crate::Dna::restrict)).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Layer<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Layer<T> {
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Layer::Loaded(_))
    }

    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Layer::Loaded(t) => Some(t),
            Layer::NotLoaded => None,
        }
    }

    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Layer::Loaded(t) => Some(t),
            Layer::NotLoaded => None,
        }
    }

    /// Load this layer with `load` if it isn't loaded yet; otherwise keep the existing data.
    pub fn or_load(self, load: impl FnOnce() -> Result<Option<T>>) -> Result<Self> {
        match self {
            Layer::Loaded(t) => Ok(Layer::Loaded(t)),
            Layer::NotLoaded => Ok(load()?.into()),
        }
    }
}

impl<T> From<Option<T>> for Layer<T> {
    #[inline]
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(t) => Layer::Loaded(t),
            None => Layer::NotLoaded,
        }
    }
}

// unloaded layers are `null` in the debug mirror
impl<T: Serialize> Serialize for Layer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_ref().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Layer<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Layer::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn named_layers_are_closed() {
        for layer in [
            DataLayer::Descriptor,
            DataLayer::Definition,
            DataLayer::Behavior,
            DataLayer::Geometry,
            DataLayer::GeometryWithoutBlendShapes,
            DataLayer::AllWithoutBlendShapes,
            DataLayer::All,
        ] {
            assert_eq!(layer.mask(), layer.mask().closure(), "{layer}");
            assert_eq!(layer.to_string().parse::<DataLayer>().ok(), Some(layer));
        }
    }

    #[test]
    fn closure_adds_implied() {
        assert_eq!(
            LayerBitmask::BEHAVIOR.closure(),
            DataLayer::Behavior.mask()
        );
        assert_eq!(
            LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY.closure(),
            LayerBitmask::DESCRIPTOR
                | LayerBitmask::DEFINITION
                | LayerBitmask::GEOMETRY_BLEND_SHAPES_ONLY
        );
        assert_eq!(LayerBitmask::empty().closure(), LayerBitmask::empty());
    }

    #[test]
    fn bad_layer_name() {
        assert!(matches!(
            "everything".parse::<DataLayer>(),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn or_load_keeps_existing() {
        let loaded = Layer::Loaded(1).or_load(|| Ok(Some(2))).ok();
        assert_eq!(loaded, Some(Layer::Loaded(1)));
        let fresh = Layer::<i32>::NotLoaded.or_load(|| Ok(Some(2))).ok();
        assert_eq!(fresh, Some(Layer::Loaded(2)));
    }
}
