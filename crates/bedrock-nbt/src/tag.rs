//! NBT tag types.

use std::collections::HashMap;
use std::fmt;

use crate::error::NbtError;

/// Tag type codes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagType {
    pub fn from_id(id: u8) -> Result<Self, NbtError> {
        Ok(match id {
            0 => TagType::End,
            1 => TagType::Byte,
            2 => TagType::Short,
            3 => TagType::Int,
            4 => TagType::Long,
            5 => TagType::Float,
            6 => TagType::Double,
            7 => TagType::ByteArray,
            8 => TagType::String,
            9 => TagType::List,
            10 => TagType::Compound,
            11 => TagType::IntArray,
            12 => TagType::LongArray,
            other => return Err(NbtError::UnknownTagType(other)),
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// A list tag. All items share `element_type`, which is recorded once, so an
/// empty list still remembers what it would hold.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtList {
    element_type: TagType,
    items: Vec<NbtTag>,
}

impl NbtList {
    /// An empty list of the given element type.
    pub fn new(element_type: TagType) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    /// Build a list from items, taking the element type from the first item
    /// (`End` when empty).
    pub fn from_items(items: Vec<NbtTag>) -> Result<Self, NbtError> {
        let element_type = items.first().map_or(TagType::End, NbtTag::tag_type);
        let mut list = Self::new(element_type);
        list.items.reserve(items.len());
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }

    pub fn push(&mut self, item: NbtTag) -> Result<(), NbtError> {
        if self.items.is_empty() && self.element_type == TagType::End {
            self.element_type = item.tag_type();
        }
        if item.tag_type() != self.element_type {
            return Err(NbtError::ListTypeMismatch {
                expected: self.element_type.id(),
                got: item.tag_type_id(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn element_type(&self) -> TagType {
        self.element_type
    }

    pub fn items(&self) -> &[NbtTag] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NbtTag> {
        self.items.iter()
    }

    pub(crate) fn from_parts(element_type: TagType, items: Vec<NbtTag>) -> Self {
        Self {
            element_type,
            items,
        }
    }
}

/// A compound tag: named tags in insertion order, names unique.
///
/// Order is kept so that re-encoding a decoded compound reproduces its bytes.
/// Lookups go through a name index.
#[derive(Debug, Clone, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtTag)>,
    index: HashMap<String, usize>,
}

impl PartialEq for NbtCompound {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl NbtCompound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn insert(&mut self, name: String, tag: NbtTag) -> Option<NbtTag> {
        match self.index.get(&name) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, tag)),
            None => {
                self.push(name, tag);
                None
            }
        }
    }

    /// Insert a name that must not already be present.
    pub(crate) fn insert_new(&mut self, name: String, tag: NbtTag) -> Result<(), NbtError> {
        if self.contains_key(&name) {
            return Err(NbtError::DuplicateName(name));
        }
        self.push(name, tag);
        Ok(())
    }

    fn push(&mut self, name: String, tag: NbtTag) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, tag));
    }

    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NbtTag> {
        let i = *self.index.get(name)?;
        Some(&mut self.entries[i].1)
    }

    pub fn remove(&mut self, name: &str) -> Option<NbtTag> {
        let removed = self.index.remove(name)?;
        for i in self.index.values_mut() {
            if *i > removed {
                *i -= 1;
            }
        }
        Some(self.entries.remove(removed).1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NbtTag)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        self.get(name).and_then(NbtTag::as_byte)
    }

    pub fn get_short(&self, name: &str) -> Option<i16> {
        self.get(name).and_then(NbtTag::as_short)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(NbtTag::as_int)
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(NbtTag::as_long)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(NbtTag::as_string)
    }

    pub fn get_compound(&self, name: &str) -> Option<&NbtCompound> {
        self.get(name).and_then(NbtTag::as_compound)
    }

    pub fn get_list(&self, name: &str) -> Option<&NbtList> {
        self.get(name).and_then(NbtTag::as_list)
    }
}

impl FromIterator<(String, NbtTag)> for NbtCompound {
    fn from_iter<I: IntoIterator<Item = (String, NbtTag)>>(iter: I) -> Self {
        let mut compound = NbtCompound::new();
        for (name, tag) in iter {
            compound.insert(name, tag);
        }
        compound
    }
}

/// A named root compound (the root always has a name, often empty string).
#[derive(Debug, Clone, PartialEq)]
pub struct NbtRoot {
    pub name: String,
    pub compound: NbtCompound,
}

impl NbtRoot {
    pub fn new(name: impl Into<String>, compound: NbtCompound) -> Self {
        Self {
            name: name.into(),
            compound,
        }
    }
}

/// Represents any NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    pub fn tag_type(&self) -> TagType {
        match self {
            NbtTag::Byte(_) => TagType::Byte,
            NbtTag::Short(_) => TagType::Short,
            NbtTag::Int(_) => TagType::Int,
            NbtTag::Long(_) => TagType::Long,
            NbtTag::Float(_) => TagType::Float,
            NbtTag::Double(_) => TagType::Double,
            NbtTag::ByteArray(_) => TagType::ByteArray,
            NbtTag::String(_) => TagType::String,
            NbtTag::List(_) => TagType::List,
            NbtTag::Compound(_) => TagType::Compound,
            NbtTag::IntArray(_) => TagType::IntArray,
            NbtTag::LongArray(_) => TagType::LongArray,
        }
    }

    /// Returns the numeric tag type ID (1-12). TAG_End is 0 but not representable here.
    pub fn tag_type_id(&self) -> u8 {
        self.tag_type().id()
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            NbtTag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match self {
            NbtTag::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NbtTag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            NbtTag::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            NbtTag::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            NbtTag::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            NbtTag::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&NbtCompound> {
        match self {
            NbtTag::Compound(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NbtList> {
        match self {
            NbtTag::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            NbtTag::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            NbtTag::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            NbtTag::LongArray(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for NbtTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NbtTag::Byte(v) => write!(f, "{v}b"),
            NbtTag::Short(v) => write!(f, "{v}s"),
            NbtTag::Int(v) => write!(f, "{v}"),
            NbtTag::Long(v) => write!(f, "{v}L"),
            NbtTag::Float(v) => write!(f, "{v}f"),
            NbtTag::Double(v) => write!(f, "{v}d"),
            NbtTag::ByteArray(v) => write!(f, "[B; {} elements]", v.len()),
            NbtTag::String(v) => write!(f, "\"{v}\""),
            NbtTag::List(v) => write!(f, "[{} elements]", v.len()),
            NbtTag::Compound(v) => write!(f, "{{{} entries}}", v.len()),
            NbtTag::IntArray(v) => write!(f, "[I; {} elements]", v.len()),
            NbtTag::LongArray(v) => write!(f, "[L; {} elements]", v.len()),
        }
    }
}
