//! NBT (Named Binary Tag) codec for Minecraft Bedrock Edition saves.
//!
//! Numbers are always little-endian. Strings come in two encodings, chosen by
//! the caller per call site to match whatever produced the bytes:
//! - [`StringEncoding::Utf8`]: u16 little-endian byte length, then UTF-8.
//! - [`StringEncoding::VarintAscii`]: varint length, then raw bytes.
//!
//! Decoding then re-encoding a tree reproduces the original bytes: compounds
//! keep their entry order and lists keep their declared element type.

pub mod error;
mod ascii;
mod io;
mod le;
pub mod tag;

pub use error::NbtError;
pub use tag::{NbtCompound, NbtList, NbtRoot, NbtTag, TagType};

use bytes::{Buf, BufMut};

/// String encoding used by a particular NBT stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    #[default]
    Utf8,
    VarintAscii,
}

/// Read one root compound.
pub fn read_nbt(buf: &mut impl Buf, encoding: StringEncoding) -> Result<NbtRoot, NbtError> {
    match encoding {
        StringEncoding::Utf8 => io::read_nbt::<le::LeVariant>(buf),
        StringEncoding::VarintAscii => io::read_nbt::<ascii::AsciiVariant>(buf),
    }
}

/// Read zero or more concatenated root compounds until the buffer is empty.
pub fn read_nbt_stream(
    buf: &mut impl Buf,
    encoding: StringEncoding,
) -> Result<Vec<NbtRoot>, NbtError> {
    match encoding {
        StringEncoding::Utf8 => io::read_nbt_stream::<le::LeVariant>(buf),
        StringEncoding::VarintAscii => io::read_nbt_stream::<ascii::AsciiVariant>(buf),
    }
}

/// Write one root compound. Fails on strings or arrays too long for their
/// length prefix, leaving a partial root in `buf`.
pub fn write_nbt(
    buf: &mut impl BufMut,
    root: &NbtRoot,
    encoding: StringEncoding,
) -> Result<(), NbtError> {
    match encoding {
        StringEncoding::Utf8 => io::write_nbt::<le::LeVariant>(buf, root),
        StringEncoding::VarintAscii => io::write_nbt::<ascii::AsciiVariant>(buf, root),
    }
}

/// Write roots back to back, the inverse of [`read_nbt_stream`].
pub fn write_nbt_stream(
    buf: &mut impl BufMut,
    roots: &[NbtRoot],
    encoding: StringEncoding,
) -> Result<(), NbtError> {
    for root in roots {
        write_nbt(buf, root, encoding)?;
    }
    Ok(())
}

/// Read standard little-endian NBT (UTF-8 strings) from a buffer.
pub fn read_nbt_le(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    read_nbt(buf, StringEncoding::Utf8)
}

/// Write standard little-endian NBT (UTF-8 strings) to a buffer.
pub fn write_nbt_le(buf: &mut impl BufMut, root: &NbtRoot) -> Result<(), NbtError> {
    write_nbt(buf, root, StringEncoding::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip(root: &NbtRoot, encoding: StringEncoding) {
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, root, encoding).unwrap();
        let bytes = buf.freeze();
        let decoded = read_nbt(&mut bytes.clone(), encoding).unwrap();
        assert_eq!(decoded, *root);

        let mut again = BytesMut::new();
        write_nbt(&mut again, &decoded, encoding).unwrap();
        assert_eq!(again.freeze(), bytes);
    }

    fn roundtrip_le(root: &NbtRoot) {
        roundtrip(root, StringEncoding::Utf8);
    }

    fn single(name: &str, tag: NbtTag) -> NbtRoot {
        let mut c = NbtCompound::new();
        c.insert(name.into(), tag);
        NbtRoot::new("", c)
    }

    // -- Standard LE tests --

    #[test]
    fn le_empty_compound() {
        roundtrip_le(&NbtRoot::new("", NbtCompound::new()));
    }

    #[test]
    fn le_root_name() {
        roundtrip_le(&NbtRoot::new("hello world", NbtCompound::new()));
    }

    #[test]
    fn le_scalars() {
        roundtrip_le(&single("val", NbtTag::Byte(42)));
        roundtrip_le(&single("val", NbtTag::Short(-1234)));
        roundtrip_le(&single("val", NbtTag::Int(100_000)));
        roundtrip_le(&single("val", NbtTag::Long(i64::MAX)));
        roundtrip_le(&single("val", NbtTag::Float(3.125)));
        roundtrip_le(&single("val", NbtTag::Double(std::f64::consts::PI)));
    }

    #[test]
    fn le_string_unicode() {
        roundtrip_le(&single("val", NbtTag::String("日本語".into())));
    }

    #[test]
    fn le_arrays() {
        roundtrip_le(&single("val", NbtTag::ByteArray(vec![1, -2, 3, -4, 5])));
        roundtrip_le(&single("val", NbtTag::IntArray(vec![100, -200, 300])));
        roundtrip_le(&single("val", NbtTag::LongArray(vec![i64::MIN, 0, i64::MAX])));
    }

    #[test]
    fn le_list_of_ints() {
        let list = NbtList::from_items(vec![NbtTag::Int(1), NbtTag::Int(2), NbtTag::Int(3)]).unwrap();
        roundtrip_le(&single("list", NbtTag::List(list)));
    }

    #[test]
    fn le_empty_typed_list() {
        roundtrip_le(&single("list", NbtTag::List(NbtList::new(TagType::Compound))));
        roundtrip_le(&single("list", NbtTag::List(NbtList::new(TagType::End))));
    }

    #[test]
    fn le_list_of_lists() {
        let inner = NbtList::from_items(vec![NbtTag::Short(7)]).unwrap();
        let outer = NbtList::from_items(vec![
            NbtTag::List(inner),
            NbtTag::List(NbtList::new(TagType::Short)),
        ])
        .unwrap();
        roundtrip_le(&single("nested", NbtTag::List(outer)));
    }

    #[test]
    fn le_complex_structure() {
        let mut inner = NbtCompound::new();
        inner.insert("name".into(), NbtTag::String("Steve".into()));
        inner.insert("health".into(), NbtTag::Float(20.0));
        inner.insert("xp".into(), NbtTag::Int(1500));

        let item = |id: i16, count: i8| {
            let mut item = NbtCompound::new();
            item.insert("id".into(), NbtTag::Short(id));
            item.insert("count".into(), NbtTag::Byte(count));
            NbtTag::Compound(item)
        };

        let mut c = NbtCompound::new();
        c.insert("player".into(), NbtTag::Compound(inner));
        c.insert("version".into(), NbtTag::Int(19133));
        c.insert(
            "inventory".into(),
            NbtTag::List(NbtList::from_items(vec![item(1, 64), item(4, 32)]).unwrap()),
        );
        roundtrip_le(&NbtRoot::new("level", c));
    }

    // -- Varint-length string tests --

    #[test]
    fn ascii_roundtrip() {
        let mut c = NbtCompound::new();
        c.insert("name".into(), NbtTag::String("minecraft:stone".into()));
        c.insert("val".into(), NbtTag::Short(3));
        roundtrip(&NbtRoot::new("", c), StringEncoding::VarintAscii);
    }

    #[test]
    fn ascii_string_layout() {
        let root = single("a", NbtTag::String("xy".into()));
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, &root, StringEncoding::VarintAscii).unwrap();
        // compound, root name len 0, string tag, name "a", value "xy", end
        assert_eq!(&buf[..], &[10, 0, 8, 1, b'a', 2, b'x', b'y', 0]);
    }

    #[test]
    fn ascii_keeps_high_bytes() {
        let bytes: &[u8] = &[10, 0, 8, 1, b'k', 2, 0xC3, 0xFF, 0];
        let root = read_nbt(&mut &bytes[..], StringEncoding::VarintAscii).unwrap();
        let mut out = BytesMut::new();
        write_nbt(&mut out, &root, StringEncoding::VarintAscii).unwrap();
        assert_eq!(&out[..], bytes);
    }

    #[test]
    fn encodings_differ() {
        let root = single("val", NbtTag::Int(100));
        let mut le_buf = BytesMut::new();
        write_nbt(&mut le_buf, &root, StringEncoding::Utf8).unwrap();
        let mut ascii_buf = BytesMut::new();
        write_nbt(&mut ascii_buf, &root, StringEncoding::VarintAscii).unwrap();
        // Two u16 lengths become two one-byte varints.
        assert_eq!(le_buf.len(), ascii_buf.len() + 2);
    }

    #[test]
    fn oversized_string_is_rejected() {
        let root = single("s", NbtTag::String("x".repeat(70_000)));
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_nbt(&mut buf, &root, StringEncoding::Utf8),
            Err(NbtError::StringTooLong(70_000))
        ));
        // The varint prefix has room for it.
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, &root, StringEncoding::VarintAscii).unwrap();

        let max = single("s", NbtTag::String("x".repeat(65_535)));
        write_nbt_le(&mut BytesMut::new(), &max).unwrap();
    }

    #[test]
    fn ascii_rejects_wide_chars() {
        let latin = single("s", NbtTag::String("caf\u{e9}".into()));
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, &latin, StringEncoding::VarintAscii).unwrap();
        assert_eq!(&buf[buf.len() - 6..], &[4, b'c', b'a', b'f', 0xE9, 0]);

        let euro = single("s", NbtTag::String("5\u{20ac}".into()));
        assert!(matches!(
            write_nbt(&mut BytesMut::new(), &euro, StringEncoding::VarintAscii),
            Err(NbtError::UnencodableChar('\u{20ac}'))
        ));
        write_nbt(&mut BytesMut::new(), &euro, StringEncoding::Utf8).unwrap();
    }

    // -- Streams --

    #[test]
    fn stream_of_roots() {
        let roots = vec![
            single("a", NbtTag::Int(1)),
            NbtRoot::new("second", NbtCompound::new()),
            single("c", NbtTag::String("three".into())),
        ];
        let mut buf = BytesMut::new();
        write_nbt_stream(&mut buf, &roots, StringEncoding::Utf8).unwrap();
        let decoded = read_nbt_stream(&mut buf.freeze(), StringEncoding::Utf8).unwrap();
        assert_eq!(decoded, roots);
    }

    #[test]
    fn empty_stream_is_ok() {
        let decoded = read_nbt_stream(&mut bytes::Bytes::new(), StringEncoding::Utf8).unwrap();
        assert!(decoded.is_empty());
    }

    // -- Error cases --

    #[test]
    fn empty_buffer_error() {
        let data = bytes::Bytes::new();
        assert!(read_nbt_le(&mut data.clone()).is_err());
        assert!(read_nbt(&mut data.clone(), StringEncoding::VarintAscii).is_err());
    }

    #[test]
    fn wrong_root_type_error() {
        let data = bytes::Bytes::from_static(&[1]);
        assert!(matches!(
            read_nbt_le(&mut data.clone()),
            Err(NbtError::ExpectedCompound { got: 1 })
        ));
    }

    #[test]
    fn truncated_compound() {
        let root = single("val", NbtTag::Long(5));
        let mut buf = BytesMut::new();
        write_nbt_le(&mut buf, &root).unwrap();
        let cut = buf.freeze().slice(..10);
        assert!(matches!(read_nbt_le(&mut cut.clone()), Err(NbtError::UnexpectedEof)));
    }

    #[test]
    fn missing_end_marker() {
        let root = single("val", NbtTag::Byte(5));
        let mut buf = BytesMut::new();
        write_nbt_le(&mut buf, &root).unwrap();
        let len = buf.len();
        let cut = buf.freeze().slice(..len - 1);
        assert!(matches!(read_nbt_le(&mut cut.clone()), Err(NbtError::UnexpectedEof)));
    }

    #[test]
    fn negative_list_length() {
        let mut data = vec![10, 0, 0, 9, 1, 0, b'l', 3];
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.push(0);
        assert!(matches!(
            read_nbt_le(&mut &data[..]),
            Err(NbtError::NegativeLength(-1))
        ));
    }

    #[test]
    fn end_typed_list_with_items() {
        let mut data = vec![10, 0, 0, 9, 1, 0, b'l', 0];
        data.extend_from_slice(&2i32.to_le_bytes());
        data.push(0);
        assert!(matches!(read_nbt_le(&mut &data[..]), Err(NbtError::UnexpectedEnd)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let data = [10, 0, 0, 1, 1, 0, b'a', 1, 1, 1, 0, b'a', 2, 0];
        assert!(matches!(
            read_nbt_le(&mut &data[..]),
            Err(NbtError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn nesting_limit() {
        // Lists of lists, each with one element, deeper than the limit.
        let mut data = vec![10, 0, 0, 9, 1, 0, b'l'];
        for _ in 0..600 {
            data.push(9);
            data.extend_from_slice(&1i32.to_le_bytes());
        }
        assert!(matches!(
            read_nbt_le(&mut &data[..]),
            Err(NbtError::NestingTooDeep { limit: 512 })
        ));
    }

    #[test]
    fn unknown_tag_type() {
        let data = [10, 0, 0, 42, 1, 0, b'x', 0];
        assert!(matches!(read_nbt_le(&mut &data[..]), Err(NbtError::UnknownTagType(42))));
    }
}
