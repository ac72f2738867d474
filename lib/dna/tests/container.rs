use dna::{
    codec::{Header, Section},
    de::binary::{decode, BinaryReader},
    fixture, ser, DataLayer, Dna, DnaFile, Error, LayerBitmask, Writer,
};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

/// Any combination of layer bits, not necessarily closed.
#[derive(Debug, Clone, Copy)]
struct Mask(LayerBitmask);

impl Arbitrary for Mask {
    fn arbitrary(g: &mut Gen) -> Self {
        Self(LayerBitmask::from_bits_truncate(u16::arbitrary(g)))
    }
}

const NAMED: [DataLayer; 7] = [
    DataLayer::Descriptor,
    DataLayer::Definition,
    DataLayer::Behavior,
    DataLayer::Geometry,
    DataLayer::GeometryWithoutBlendShapes,
    DataLayer::AllWithoutBlendShapes,
    DataLayer::All,
];

fn geometry_offset(bytes: &[u8]) -> usize {
    Header::read(bytes)
        .unwrap()
        .offset(Section::Geometry)
        .unwrap()
}

#[quickcheck]
fn written_subset_reads_back(mask: Mask) -> bool {
    let rig = fixture::rig();
    let bytes = ser::binary::encode(&rig, mask.0).unwrap();
    decode(&bytes, DataLayer::All).unwrap() == rig.restrict(mask.0)
}

#[quickcheck]
fn read_subset_of_full_file(mask: Mask) -> bool {
    let rig = fixture::rig();
    let bytes = ser::binary::encode(&rig, DataLayer::All).unwrap();
    decode(&bytes, mask.0).unwrap() == rig.restrict(mask.0)
}

#[test]
fn named_layers_round_trip() {
    let rig = fixture::rig();
    for layer in NAMED {
        let bytes = ser::binary::encode(&rig, layer).unwrap();
        let header = Header::read(&bytes).unwrap();
        assert_eq!(header.layers, layer.mask(), "{layer}");
        assert_eq!(decode(&bytes, layer).unwrap(), rig.restrict(layer), "{layer}");
    }
}

#[test]
fn reads_are_idempotent() {
    let bytes = ser::binary::encode(&fixture::rig(), DataLayer::All).unwrap();
    let reader = BinaryReader::new(&bytes).unwrap();

    let once = Dna::new().read(&reader, DataLayer::Definition).unwrap();
    let twice = once.read(&reader, DataLayer::Definition).unwrap();
    assert_eq!(once, twice);

    // widening keeps what's loaded, and adds the rest
    let full = twice.read(&reader, DataLayer::All).unwrap();
    assert_eq!(full, fixture::rig());
    assert_eq!(full.read(&reader, DataLayer::Descriptor).unwrap(), full);
}

#[test]
fn loaded_layers_are_not_reread() {
    let bytes = ser::binary::encode(&fixture::rig(), DataLayer::All).unwrap();
    let reader = BinaryReader::new(&bytes).unwrap();

    let mut edited = Dna::new().read(&reader, DataLayer::Definition).unwrap();
    edited.try_definition_mut().unwrap().joint_names[1] = "neck_01".into();
    let widened = edited.read(&reader, DataLayer::Behavior).unwrap();
    assert_eq!(widened.definition().unwrap().joint_names[1], "neck_01");
    assert!(widened.behavior().is_some());
}

#[test]
fn missing_layers_stay_unloaded() {
    let bytes = ser::binary::encode(&fixture::rig(), DataLayer::Definition).unwrap();
    let dna = decode(&bytes, DataLayer::All).unwrap();
    assert_eq!(dna.loaded(), DataLayer::Definition.mask());
    assert!(matches!(
        dna.try_geometry(),
        Err(Error::LayerNotLoaded(LayerBitmask::GEOMETRY_REST))
    ));
}

#[test]
fn blend_shapes_are_skipped() {
    let mut bytes = ser::binary::encode(&fixture::rig(), DataLayer::All).unwrap();
    // tag, mesh count, then the first mesh's end and rest-end offsets
    let geometry = geometry_offset(&bytes);
    let rest_end_at = geometry + 2 + 4 + 4;
    let rest_end =
        u32::from_be_bytes(bytes[rest_end_at..rest_end_at + 4].try_into().unwrap()) as usize;
    // poison the first mesh's target count
    bytes[rest_end..rest_end + 4].copy_from_slice(&u32::MAX.to_be_bytes());

    let light = decode(&bytes, DataLayer::AllWithoutBlendShapes).unwrap();
    assert_eq!(
        light,
        fixture::rig().restrict(DataLayer::AllWithoutBlendShapes)
    );
    assert!(matches!(
        decode(&bytes, DataLayer::All),
        Err(Error::CorruptFormat { offset, .. }) if offset == rest_end
    ));
}

#[test]
fn later_sections_are_not_touched() {
    let mut bytes = ser::binary::encode(&fixture::rig(), DataLayer::All).unwrap();
    let definition = Header::read(&bytes)
        .unwrap()
        .offset(Section::Definition)
        .unwrap();
    bytes[definition] = 0xff;

    let desc = decode(&bytes, DataLayer::Descriptor).unwrap();
    assert_eq!(desc.descriptor(), fixture::rig().descriptor());
    assert!(matches!(
        decode(&bytes, DataLayer::Definition),
        Err(Error::CorruptFormat { .. })
    ));
}

#[test]
fn unknown_enum_value() {
    let mut bytes = ser::binary::encode(&fixture::rig(), DataLayer::Descriptor).unwrap();
    let descriptor = Header::read(&bytes)
        .unwrap()
        .offset(Section::Descriptor)
        .unwrap();
    // tag, then the name "fixture", then the archetype
    let archetype = descriptor + 2 + 4 + "fixture".len();
    bytes[archetype..archetype + 2].copy_from_slice(&77u16.to_be_bytes());
    assert!(matches!(
        decode(&bytes, DataLayer::Descriptor),
        Err(Error::CorruptFormat { offset, .. }) if offset == archetype
    ));
}

#[test]
fn inconsistent_file_is_rejected() {
    let mut rig = fixture::rig();
    rig.try_definition_mut().unwrap().joint_hierarchy[3] = dna::JointIndex(40);
    let bytes = ser::binary::encode(&rig, DataLayer::All).unwrap();
    assert!(matches!(
        decode(&bytes, DataLayer::Definition),
        Err(Error::IndexOutOfRange(e)) if e.index == 40
    ));
}

#[test]
fn file_round_trip() {
    let path = std::env::temp_dir().join(format!("dna-file-round-trip-{}.dna", std::process::id()));
    let mut writer = Writer::new();
    writer.set_from(&fixture::rig());
    writer.write(&path).unwrap();

    let loaded = dna::load(&path, DataLayer::AllWithoutBlendShapes);
    let mapped = DnaFile::open(&path).map(|f| f.len());
    std::fs::remove_file(&path).ok();

    assert_eq!(
        loaded.unwrap(),
        fixture::rig().restrict(DataLayer::AllWithoutBlendShapes)
    );
    assert_eq!(mapped.unwrap(), writer.to_bytes().unwrap().len());
}

#[test]
fn missing_file() {
    assert!(matches!(
        dna::load("/nonexistent/rig.dna", DataLayer::All),
        Err(Error::Io(_))
    ));
}
