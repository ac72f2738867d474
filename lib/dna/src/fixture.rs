//! A small, fully consistent rig for tests.
//!
//! * joints: `spine` (root), `neck`, `head`, `clavicle_l`, `jaw`
//!   (hierarchy `spine → neck → head → jaw`, `spine → clavicle_l`)
//! * meshes: `head_lod0_mesh` (a unit quad whose positions equal its texture coordinates),
//!   `head_lod1_mesh` (a single triangle inside that quad, positioned where the quad puts its
//!   texture coordinates), and
//!   `teeth_lod0_mesh`
//! * blend-shape channels: `jaw_open`, `smile_l`, `teeth_open`
//! * animated maps: `wrinkle_forehead`, `wrinkle_mouth`
//! * two levels of detail; level 1 keeps `spine`, `neck`, `head`, `head_lod1_mesh`, `jaw_open`
//!   and `wrinkle_forehead`

use nalgebra::{Vector2, Vector3};

use crate::{
    AnimatedMapBehavior, AnimatedMapIndex, Archetype, Behavior, BlendShapeChannelBehavior,
    BlendShapeChannelIndex, BlendShapeTarget, BlendShapes, Conditional, ConditionalTable,
    Controls, Definition, Descriptor, Dna, Gender, Geometry, Influence, JointBehavior,
    JointGroup, JointIndex, LodMapping, Mesh, MeshIndex, SkinWeights, VertexIndex, VertexLayout,
    JOINT_ATTRIBUTE_COUNT,
};

pub const JOINT_NAMES: [&str; 5] = ["spine", "neck", "head", "clavicle_l", "jaw"];
pub const MESH_NAMES: [&str; 3] = ["head_lod0_mesh", "head_lod1_mesh", "teeth_lod0_mesh"];

/// Every layer of the fixture rig.
pub fn rig() -> Dna {
    Dna::new()
        .with_descriptor(descriptor())
        .with_definition(definition())
        .with_behavior(behavior())
        .with_geometry(geometry())
        .with_blend_shapes(blend_shapes())
}

pub fn descriptor() -> Descriptor {
    let mut res = Descriptor {
        name: "fixture".into(),
        archetype: Archetype::Other,
        gender: Gender::Other,
        age: 30,
        lod_count: 2,
        complexity: "Base".into(),
        db_name: "fixture_db".into(),
        ..Default::default()
    };
    res.set_metadata("origin", "test");
    res
}

fn names<const N: usize>(names: [&str; N]) -> Vec<String> {
    names.iter().map(|&n| n.to_owned()).collect()
}

pub fn definition() -> Definition {
    let j = JointIndex;
    let m = MeshIndex;
    let c = BlendShapeChannelIndex;
    let a = AnimatedMapIndex;
    Definition {
        gui_control_names: names(["CTRL_jaw", "CTRL_smile"]),
        raw_control_names: names(["jaw_open", "smile_l"]),
        joint_names: names(JOINT_NAMES),
        blend_shape_channel_names: names(["jaw_open", "smile_l", "teeth_open"]),
        animated_map_names: names(["wrinkle_forehead", "wrinkle_mouth"]),
        mesh_names: names(MESH_NAMES),
        lod_joint_mapping: LodMapping::from_levels([
            vec![j(0), j(1), j(2), j(3), j(4)],
            vec![j(0), j(1), j(2)],
        ]),
        lod_blend_shape_mapping: LodMapping::from_levels([vec![c(0), c(1), c(2)], vec![c(0)]]),
        lod_animated_map_mapping: LodMapping::from_levels([vec![a(0), a(1)], vec![a(0)]]),
        lod_mesh_mapping: LodMapping::from_levels([vec![m(0), m(2)], vec![m(1)]]),
        mesh_blend_shape_channel_mapping: vec![
            (m(0), c(0)),
            (m(0), c(1)),
            (m(1), c(0)),
            (m(2), c(2)),
        ],
        joint_hierarchy: vec![j(0), j(0), j(1), j(0), j(2)],
        neutral_joint_translations: vec![
            Vector3::new(0.0, 100.0, 0.0),
            Vector3::new(0.0, 10.0, 0.0),
            Vector3::new(0.0, 8.0, 0.0),
            Vector3::new(5.0, 5.0, 0.0),
            Vector3::new(0.0, -2.0, 3.0),
        ],
        neutral_joint_rotations: vec![
            Vector3::zeros(),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, -90.0),
            Vector3::zeros(),
        ],
    }
}

pub fn behavior() -> Behavior {
    let attrs = JOINT_ATTRIBUTE_COUNT;
    let gui_to_raw = |input, output| Conditional {
        input,
        output,
        from: 0.0,
        to: 1.0,
        slope: 1.0,
        cut: 0.0,
    };
    Behavior {
        controls: Controls {
            psd_count: 0,
            conditionals: ConditionalTable {
                rows: vec![gui_to_raw(0, 0), gui_to_raw(1, 1)],
            },
            psds: Default::default(),
        },
        joints: JointBehavior {
            row_count: JOINT_NAMES.len() as u16 * attrs,
            col_count: 2,
            groups: vec![JointGroup {
                lods: vec![2, 1],
                input_indices: vec![0],
                // head translate x, jaw rotate x
                output_indices: vec![2 * attrs, 4 * attrs + 3],
                values: vec![0.5, 1.0],
                joint_indices: vec![JointIndex(2), JointIndex(4)],
            }],
        },
        blend_shape_channels: BlendShapeChannelBehavior {
            lods: vec![3, 1],
            input_indices: vec![0, 1, 0],
            output_indices: vec![
                BlendShapeChannelIndex(0),
                BlendShapeChannelIndex(1),
                BlendShapeChannelIndex(2),
            ],
        },
        animated_maps: AnimatedMapBehavior {
            lods: vec![2, 1],
            conditionals: ConditionalTable {
                rows: vec![gui_to_raw(0, 0), gui_to_raw(1, 1)],
            },
        },
    }
}

fn identity_layouts(n: u32) -> Vec<VertexLayout> {
    (0..n)
        .map(|i| VertexLayout {
            position: i,
            texture_coordinate: i,
            normal: i,
        })
        .collect()
}

fn skin(joint: u16, n: usize) -> Vec<SkinWeights> {
    vec![
        SkinWeights {
            influences: vec![Influence {
                joint: JointIndex(joint),
                weight: 1.0,
            }],
        };
        n
    ]
}

pub fn geometry() -> Geometry {
    let quad_uvs = vec![
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];
    let mut head_skin = skin(2, 4);
    // lower lip follows the jaw
    head_skin[0].influences = vec![
        Influence {
            joint: JointIndex(2),
            weight: 0.25,
        },
        Influence {
            joint: JointIndex(4),
            weight: 0.75,
        },
    ];
    let head = Mesh {
        positions: quad_uvs.iter().map(|uv| Vector3::new(uv.x, uv.y, 0.0)).collect(),
        texture_coordinates: quad_uvs,
        normals: vec![Vector3::z(); 4],
        layouts: identity_layouts(4),
        faces: vec![vec![0, 1, 2, 3]],
        max_influence_per_vertex: 2,
        skin_weights: head_skin,
    };

    let lod1_uvs = vec![
        Vector2::new(0.25, 0.25),
        Vector2::new(0.75, 0.25),
        Vector2::new(0.5, 0.75),
    ];
    let head_lod1 = Mesh {
        positions: lod1_uvs.iter().map(|uv| Vector3::new(uv.x, uv.y, 0.0)).collect(),
        texture_coordinates: lod1_uvs,
        normals: vec![Vector3::z(); 3],
        layouts: identity_layouts(3),
        faces: vec![vec![0, 1, 2]],
        max_influence_per_vertex: 1,
        skin_weights: skin(2, 3),
    };

    let teeth = Mesh {
        positions: vec![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 1.0),
            Vector3::new(0.0, 1.0, 1.0),
        ],
        texture_coordinates: vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ],
        normals: Vec::new(),
        layouts: identity_layouts(3),
        faces: vec![vec![0, 1, 2]],
        max_influence_per_vertex: 1,
        skin_weights: skin(4, 3),
    };

    Geometry {
        meshes: vec![head, head_lod1, teeth],
    }
}

pub fn blend_shapes() -> BlendShapes {
    let target = |channel, entries: &[(u32, [f32; 3])]| BlendShapeTarget {
        channel: BlendShapeChannelIndex(channel),
        vertex_indices: entries.iter().map(|&(v, _)| VertexIndex(v)).collect(),
        deltas: entries.iter().map(|&(_, d)| Vector3::from(d)).collect(),
    };
    BlendShapes {
        targets: vec![
            vec![
                target(0, &[(0, [0.0, -1.0, 0.0]), (1, [0.0, -0.5, 0.0])]),
                target(1, &[(3, [0.1, 0.2, 0.0])]),
            ],
            vec![target(0, &[(0, [0.0, -1.0, 0.0])])],
            vec![target(2, &[(1, [0.0, 0.0, 0.5])])],
        ],
    }
}
