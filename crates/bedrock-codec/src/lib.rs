//! Low-level binary decoding shared by the LevelDB reader, the NBT codec and
//! the chunk decoder.
//!
//! Everything here is a pure function over a byte slice: fixed-width numbers in
//! either byte order, LEB128 varints, a bounds-checked [`ByteReader`] cursor and
//! block decompression.

pub mod compression;
pub mod error;
pub mod primitive;
pub mod reader;
pub mod varint;

pub use error::{CodecError, ErrorKind, LoadError};
pub use reader::ByteReader;
