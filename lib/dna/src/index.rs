use dnacalib_common::typed_index;

typed_index! {
    /// Index into the joint table.
    pub struct JointIndex(u16) => "joint";
    /// Index into the mesh table.
    pub struct MeshIndex(u16) => "mesh";
    /// Index into the blend-shape channel table.
    pub struct BlendShapeChannelIndex(u16) => "blend shape channel";
    /// Index into the animated map table.
    pub struct AnimatedMapIndex(u16) => "animated map";
    /// Index of a vertex position within one mesh.
    pub struct VertexIndex(u32) => "vertex";
}

impl JointIndex {
    /// The sentinel root joint, which is its own parent.
    pub const ROOT: Self = Self(0);

    #[inline]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

/// The kinds of named entity a container holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    Joint,
    Mesh,
    BlendShapeChannel,
    AnimatedMap,
}

impl EntityKind {
    /// Same as the [TypedIndex::KIND](dnacalib_common::TypedIndex::KIND) of the matching index.
    pub const fn name(self) -> &'static str {
        use dnacalib_common::TypedIndex;
        match self {
            EntityKind::Joint => JointIndex::KIND,
            EntityKind::Mesh => MeshIndex::KIND,
            EntityKind::BlendShapeChannel => BlendShapeChannelIndex::KIND,
            EntityKind::AnimatedMap => AnimatedMapIndex::KIND,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
