use serde::{Deserialize, Serialize};

use super::wire_enum;

wire_enum! {
    pub enum Archetype {
        Asian = 0,
        Black = 1,
        Caucasian = 2,
        Hispanic = 3,
        Alien = 4,
        Other = 5,
    }
}

wire_enum! {
    pub enum Gender {
        Male = 0,
        Female = 1,
        Other = 2,
    }
}

wire_enum! {
    /// Unit of neutral joint translations and vertex positions.
    pub enum TranslationUnit {
        Cm = 0,
        M = 1,
    }
}

wire_enum! {
    /// Unit of neutral joint rotations.
    pub enum RotationUnit {
        Degrees = 0,
        Radians = 1,
    }
}

wire_enum! {
    pub enum Direction {
        Left = 0,
        Right = 1,
        Up = 2,
        Down = 3,
        Front = 4,
        Back = 5,
    }
}

/// Which world direction each local axis points in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub x: Direction,
    pub y: Direction,
    pub z: Direction,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self {
            x: Direction::Right,
            y: Direction::Up,
            z: Direction::Front,
        }
    }
}

/// Summary record of a rig; the only layer that's always cheap to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub archetype: Archetype,
    pub gender: Gender,
    pub age: u16,
    /// Free-form key/value pairs, in insertion order.
    pub metadata: Vec<(String, String)>,
    pub translation_unit: TranslationUnit,
    pub rotation_unit: RotationUnit,
    pub coordinate_system: CoordinateSystem,
    pub lod_count: u16,
    /// The level of detail (of the rig this one was derived from) that level 0 corresponds to.
    pub max_lod: u16,
    pub complexity: String,
    pub db_name: String,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            name: String::default(),
            archetype: Archetype::Other,
            gender: Gender::Other,
            age: 0,
            metadata: Vec::default(),
            translation_unit: TranslationUnit::Cm,
            rotation_unit: RotationUnit::Degrees,
            coordinate_system: CoordinateSystem::default(),
            lod_count: 0,
            max_lod: 0,
            complexity: String::default(),
            db_name: String::default(),
        }
    }
}

impl Descriptor {
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// Set a metadata value, replacing any existing value for `key`.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.metadata.push((key, value)),
        }
    }
}
