use bedrock_nbt::{
    read_nbt, read_nbt_stream, write_nbt, write_nbt_stream, NbtCompound, NbtList, NbtRoot,
    NbtTag, StringEncoding, TagType,
};
use rand::Rng;

/// A block palette entry exactly as Bedrock writes it to disk.
fn palette_entry_bytes(name: &str) -> Vec<u8> {
    let mut buf = vec![0x0A, 0x00, 0x00];

    buf.push(0x08);
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(b"name");
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());

    buf.push(0x0A);
    buf.extend_from_slice(&6u16.to_le_bytes());
    buf.extend_from_slice(b"states");
    buf.push(0x08);
    buf.extend_from_slice(&10u16.to_le_bytes());
    buf.extend_from_slice(b"stone_type");
    buf.extend_from_slice(&5u16.to_le_bytes());
    buf.extend_from_slice(b"stone");
    buf.push(0x00);

    buf.push(0x03);
    buf.extend_from_slice(&7u16.to_le_bytes());
    buf.extend_from_slice(b"version");
    buf.extend_from_slice(&18_100_737i32.to_le_bytes());

    buf.push(0x00);
    buf
}

#[test]
fn disk_palette_entry_is_byte_identical() {
    let bytes = palette_entry_bytes("minecraft:stone");
    let root = read_nbt(&mut &bytes[..], StringEncoding::Utf8).unwrap();
    assert_eq!(root.compound.get_str("name"), Some("minecraft:stone"));
    assert_eq!(
        root.compound
            .get_compound("states")
            .and_then(|s| s.get_str("stone_type")),
        Some("stone")
    );
    assert_eq!(root.compound.get_int("version"), Some(18_100_737));

    let mut out = Vec::new();
    write_nbt(&mut out, &root, StringEncoding::Utf8).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn concatenated_stream_is_byte_identical() {
    let mut bytes = palette_entry_bytes("minecraft:air");
    bytes.extend_from_slice(&palette_entry_bytes("minecraft:dirt"));
    let roots = read_nbt_stream(&mut &bytes[..], StringEncoding::Utf8).unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[1].compound.get_str("name"), Some("minecraft:dirt"));

    let mut out = Vec::new();
    write_nbt_stream(&mut out, &roots, StringEncoding::Utf8).unwrap();
    assert_eq!(out, bytes);
}

fn random_scalar(rng: &mut impl Rng, tag_type: TagType) -> NbtTag {
    match tag_type {
        TagType::Byte => NbtTag::Byte(rng.gen()),
        TagType::Short => NbtTag::Short(rng.gen()),
        TagType::Int => NbtTag::Int(rng.gen()),
        TagType::Long => NbtTag::Long(rng.gen()),
        TagType::Float => NbtTag::Float(rng.gen_range(-1000.0..1000.0)),
        TagType::Double => NbtTag::Double(rng.gen_range(-1.0e6..1.0e6)),
        TagType::ByteArray => NbtTag::ByteArray((0..rng.gen_range(0..8)).map(|_| rng.gen()).collect()),
        TagType::IntArray => NbtTag::IntArray((0..rng.gen_range(0..8)).map(|_| rng.gen()).collect()),
        TagType::LongArray => NbtTag::LongArray((0..rng.gen_range(0..8)).map(|_| rng.gen()).collect()),
        _ => NbtTag::String(random_name(rng)),
    }
}

fn random_name(rng: &mut impl Rng) -> String {
    (0..rng.gen_range(0..12))
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

const SCALARS: [TagType; 10] = [
    TagType::Byte,
    TagType::Short,
    TagType::Int,
    TagType::Long,
    TagType::Float,
    TagType::Double,
    TagType::ByteArray,
    TagType::String,
    TagType::IntArray,
    TagType::LongArray,
];

fn random_compound(rng: &mut impl Rng, depth: u32) -> NbtCompound {
    let mut c = NbtCompound::new();
    for i in 0..rng.gen_range(0..6) {
        let name = format!("{}{i}", random_name(rng));
        let tag = match rng.gen_range(0..4) {
            0 if depth > 0 => NbtTag::Compound(random_compound(rng, depth - 1)),
            1 if depth > 0 => {
                let element_type = SCALARS[rng.gen_range(0..SCALARS.len())];
                let items = (0..rng.gen_range(0..5))
                    .map(|_| random_scalar(rng, element_type))
                    .collect::<Vec<_>>();
                let mut list = NbtList::new(element_type);
                for item in items {
                    list.push(item).unwrap();
                }
                NbtTag::List(list)
            }
            _ => {
                let ty = SCALARS[rng.gen_range(0..SCALARS.len())];
                random_scalar(rng, ty)
            }
        };
        c.insert(name, tag);
    }
    c
}

#[test]
fn random_trees_reencode_identically() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let root = NbtRoot::new(random_name(&mut rng), random_compound(&mut rng, 3));
        for encoding in [StringEncoding::Utf8, StringEncoding::VarintAscii] {
            let mut first = Vec::new();
            write_nbt(&mut first, &root, encoding).unwrap();
            let decoded = read_nbt(&mut &first[..], encoding).unwrap();
            assert_eq!(decoded, root);
            let mut second = Vec::new();
            write_nbt(&mut second, &decoded, encoding).unwrap();
            assert_eq!(first, second);
        }
    }
}
