//! Generic NBT read/write engine, parameterized by string variant.
//!
//! Decoding keeps an explicit stack of open compounds and lists instead of
//! recursing, so hostile nesting costs heap rather than call stack. Each frame
//! owns its children by value; closing a frame moves the finished tag into its
//! parent.

use bytes::{Buf, BufMut};

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtList, NbtRoot, NbtTag, TagType};

/// Maximum nesting depth to prevent unbounded memory on corrupt input.
const MAX_DEPTH: usize = 512;

/// Abstraction over the two string encodings.
pub(crate) trait NbtVariant {
    fn write_string(buf: &mut impl BufMut, s: &str) -> Result<(), NbtError>;
    fn read_string(buf: &mut impl Buf) -> Result<String, NbtError>;
}

// -----------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------

pub(crate) fn read_nbt<V: NbtVariant>(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    if !buf.has_remaining() {
        return Err(NbtError::UnexpectedEof);
    }
    let tag_type = buf.get_u8();
    if tag_type != TagType::Compound.id() {
        return Err(NbtError::ExpectedCompound { got: tag_type });
    }
    let name = V::read_string(buf)?;
    let compound = read_compound_body::<V>(buf)?;
    Ok(NbtRoot { name, compound })
}

/// Zero or more concatenated roots, until the buffer is exhausted.
pub(crate) fn read_nbt_stream<V: NbtVariant>(buf: &mut impl Buf) -> Result<Vec<NbtRoot>, NbtError> {
    let mut roots = Vec::new();
    while buf.has_remaining() {
        roots.push(read_nbt::<V>(buf)?);
    }
    Ok(roots)
}

/// Where a finished frame goes in its parent.
enum Slot {
    Root,
    Named(String),
    Element,
}

enum FrameKind {
    Compound(NbtCompound),
    List {
        element_type: TagType,
        remaining: usize,
        items: Vec<NbtTag>,
    },
}

struct Frame {
    slot: Slot,
    kind: FrameKind,
}

impl Frame {
    fn finish(self) -> (Slot, NbtTag) {
        let tag = match self.kind {
            FrameKind::Compound(map) => NbtTag::Compound(map),
            FrameKind::List {
                element_type,
                items,
                ..
            } => NbtTag::List(NbtList::from_parts(element_type, items)),
        };
        (self.slot, tag)
    }

    fn attach(&mut self, slot: Slot, tag: NbtTag) -> Result<(), NbtError> {
        match (&mut self.kind, slot) {
            (FrameKind::Compound(map), Slot::Named(name)) => map.insert_new(name, tag),
            (FrameKind::List { items, .. }, Slot::Element) => {
                items.push(tag);
                Ok(())
            }
            // Frames are only ever opened with the slot matching their parent.
            _ => Err(NbtError::UnexpectedEnd),
        }
    }
}

/// Either a finished scalar value or a container that still needs its children.
enum Value {
    Scalar(NbtTag),
    Open(FrameKind),
}

enum Step {
    Continue,
    Open(Frame),
    Close,
}

fn read_compound_body<V: NbtVariant>(buf: &mut impl Buf) -> Result<NbtCompound, NbtError> {
    let mut stack = vec![Frame {
        slot: Slot::Root,
        kind: FrameKind::Compound(NbtCompound::new()),
    }];

    loop {
        let step = match stack.last_mut() {
            None => return Err(NbtError::UnexpectedEnd),
            Some(Frame {
                kind: FrameKind::Compound(map),
                ..
            }) => {
                ensure_remaining(buf, 1)?;
                let type_id = buf.get_u8();
                if type_id == TagType::End.id() {
                    Step::Close
                } else {
                    let tag_type = TagType::from_id(type_id)?;
                    let name = V::read_string(buf)?;
                    match read_value::<V>(buf, tag_type)? {
                        Value::Scalar(tag) => {
                            map.insert_new(name, tag)?;
                            Step::Continue
                        }
                        Value::Open(kind) => Step::Open(Frame {
                            slot: Slot::Named(name),
                            kind,
                        }),
                    }
                }
            }
            Some(Frame {
                kind:
                    FrameKind::List {
                        element_type,
                        remaining,
                        items,
                    },
                ..
            }) => {
                if *remaining == 0 {
                    Step::Close
                } else {
                    *remaining -= 1;
                    match read_value::<V>(buf, *element_type)? {
                        Value::Scalar(tag) => {
                            items.push(tag);
                            Step::Continue
                        }
                        Value::Open(kind) => Step::Open(Frame {
                            slot: Slot::Element,
                            kind,
                        }),
                    }
                }
            }
        };

        match step {
            Step::Continue => {}
            Step::Open(frame) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
                }
                stack.push(frame);
            }
            Step::Close => {
                let Some(frame) = stack.pop() else {
                    return Err(NbtError::UnexpectedEnd);
                };
                let (slot, tag) = frame.finish();
                match stack.last_mut() {
                    Some(parent) => parent.attach(slot, tag)?,
                    None => {
                        return match tag {
                            NbtTag::Compound(map) => Ok(map),
                            _ => Err(NbtError::UnexpectedEnd),
                        }
                    }
                }
            }
        }
    }
}

fn read_value<V: NbtVariant>(buf: &mut impl Buf, tag_type: TagType) -> Result<Value, NbtError> {
    let tag = match tag_type {
        TagType::End => return Err(NbtError::UnexpectedEnd),
        TagType::Byte => {
            ensure_remaining(buf, 1)?;
            NbtTag::Byte(buf.get_i8())
        }
        TagType::Short => {
            ensure_remaining(buf, 2)?;
            NbtTag::Short(buf.get_i16_le())
        }
        TagType::Int => {
            ensure_remaining(buf, 4)?;
            NbtTag::Int(buf.get_i32_le())
        }
        TagType::Long => {
            ensure_remaining(buf, 8)?;
            NbtTag::Long(buf.get_i64_le())
        }
        TagType::Float => {
            ensure_remaining(buf, 4)?;
            NbtTag::Float(buf.get_f32_le())
        }
        TagType::Double => {
            ensure_remaining(buf, 8)?;
            NbtTag::Double(buf.get_f64_le())
        }
        TagType::ByteArray => {
            let len = read_len(buf, 1)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i8());
            }
            NbtTag::ByteArray(arr)
        }
        TagType::String => NbtTag::String(V::read_string(buf)?),
        TagType::IntArray => {
            let len = read_len(buf, 4)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i32_le());
            }
            NbtTag::IntArray(arr)
        }
        TagType::LongArray => {
            let len = read_len(buf, 8)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i64_le());
            }
            NbtTag::LongArray(arr)
        }
        TagType::List => {
            ensure_remaining(buf, 5)?;
            let element_type = TagType::from_id(buf.get_u8())?;
            let len = buf.get_i32_le();
            if len < 0 {
                return Err(NbtError::NegativeLength(len));
            }
            let len = len as usize;
            if element_type == TagType::End && len > 0 {
                return Err(NbtError::UnexpectedEnd);
            }
            return Ok(Value::Open(FrameKind::List {
                element_type,
                remaining: len,
                // Every element takes at least one byte, so cap the reservation.
                items: Vec::with_capacity(len.min(buf.remaining())),
            }));
        }
        TagType::Compound => return Ok(Value::Open(FrameKind::Compound(NbtCompound::new()))),
    };
    Ok(Value::Scalar(tag))
}

/// Read an i32 element count and check that `count * width` bytes follow.
fn read_len(buf: &mut impl Buf, width: usize) -> Result<usize, NbtError> {
    ensure_remaining(buf, 4)?;
    let len = buf.get_i32_le();
    if len < 0 {
        return Err(NbtError::NegativeLength(len));
    }
    let len = len as usize;
    ensure_remaining(buf, len.checked_mul(width).ok_or(NbtError::UnexpectedEof)?)?;
    Ok(len)
}

pub(crate) fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), NbtError> {
    if buf.remaining() < needed {
        Err(NbtError::UnexpectedEof)
    } else {
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------

pub(crate) fn write_nbt<V: NbtVariant>(buf: &mut impl BufMut, root: &NbtRoot) -> Result<(), NbtError> {
    buf.put_u8(TagType::Compound.id());
    V::write_string(buf, &root.name)?;
    write_compound::<V>(buf, &root.compound)
}

fn put_len(buf: &mut impl BufMut, len: usize) -> Result<(), NbtError> {
    let len = i32::try_from(len).map_err(|_| NbtError::LengthOverflow(len))?;
    buf.put_i32_le(len);
    Ok(())
}

fn write_tag<V: NbtVariant>(buf: &mut impl BufMut, tag: &NbtTag) -> Result<(), NbtError> {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16_le(*v),
        NbtTag::Int(v) => buf.put_i32_le(*v),
        NbtTag::Long(v) => buf.put_i64_le(*v),
        NbtTag::Float(v) => buf.put_f32_le(*v),
        NbtTag::Double(v) => buf.put_f64_le(*v),
        NbtTag::ByteArray(arr) => {
            put_len(buf, arr.len())?;
            for &b in arr {
                buf.put_i8(b);
            }
        }
        NbtTag::String(s) => V::write_string(buf, s)?,
        NbtTag::List(list) => {
            buf.put_u8(list.element_type().id());
            put_len(buf, list.len())?;
            for item in list.iter() {
                write_tag::<V>(buf, item)?;
            }
        }
        NbtTag::Compound(map) => write_compound::<V>(buf, map)?,
        NbtTag::IntArray(arr) => {
            put_len(buf, arr.len())?;
            for &v in arr {
                buf.put_i32_le(v);
            }
        }
        NbtTag::LongArray(arr) => {
            put_len(buf, arr.len())?;
            for &v in arr {
                buf.put_i64_le(v);
            }
        }
    }
    Ok(())
}

fn write_compound<V: NbtVariant>(buf: &mut impl BufMut, map: &NbtCompound) -> Result<(), NbtError> {
    for (name, tag) in map.iter() {
        buf.put_u8(tag.tag_type_id());
        V::write_string(buf, name)?;
        write_tag::<V>(buf, tag)?;
    }
    buf.put_u8(TagType::End.id());
    Ok(())
}
