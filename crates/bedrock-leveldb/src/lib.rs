//! Read-only LevelDB reader for the files of a Bedrock world's `db/` folder.
//!
//! Parses sorted tables (`.ldb`) and write-ahead logs (`.log`) into one
//! ordered key-value map. Nothing is ever written back, compacted or
//! checksummed; the log writers only exist to build fixtures. A file that
//! fails to parse is skipped and reported through [`KeyValueStore::errors`].

pub mod block;
pub mod error;
pub mod log;
pub mod record;
pub mod store;
pub mod table;

pub use error::DbError;
pub use log::{encode_batch, frame_records};
pub use record::{KeyFormat, KeyValueRecord, RecordArena};
pub use store::{classify_file, DbFileKind, KeyValueStore, Lookup, Origin, StoreEntry};
