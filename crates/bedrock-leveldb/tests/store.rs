use bedrock_codec::compression::{compress, BlockCompression};
use bedrock_codec::varint::put_var_u32;
use bedrock_leveldb::block::Block;
use bedrock_leveldb::log::{BLOCK_SIZE, HEADER_LEN};
use bedrock_leveldb::table::{TABLE_MAGIC, FOOTER_LEN};
use bedrock_leveldb::{KeyFormat, KeyValueStore, Lookup, Origin};
use bytes::Bytes;

fn record(out: &mut Vec<u8>, shared: usize, unshared: &[u8], value: &[u8]) {
    put_var_u32(out, shared as u32);
    put_var_u32(out, unshared.len() as u32);
    put_var_u32(out, value.len() as u32);
    out.extend_from_slice(unshared);
    out.extend_from_slice(value);
}

fn internal(key: &[u8], sequence: u64, live: bool) -> Vec<u8> {
    let mut out = key.to_vec();
    out.extend_from_slice(&((sequence << 8) | u64::from(live)).to_le_bytes());
    out
}

/// Records (already prefix-encoded) plus a single restart at offset 0.
fn finish_block(mut body: Vec<u8>) -> Vec<u8> {
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&1u32.to_le_bytes());
    body
}

fn block_of(keys: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut prev: &[u8] = &[];
    for (i, (key, value)) in keys.iter().enumerate() {
        let shared = if i == 0 {
            0
        } else {
            prev.iter().zip(key).take_while(|(a, b)| a == b).count()
        };
        record(&mut body, shared, &key[shared..], value);
        prev = key;
    }
    finish_block(body)
}

fn handle(offset: usize, size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    put_var_u32(&mut out, offset as u32);
    put_var_u32(&mut out, size as u32);
    out
}

/// A one-data-block table compressed with raw deflate, as Bedrock writes it.
fn table(keys: &[(Vec<u8>, Vec<u8>)]) -> Bytes {
    let mut file = Vec::new();
    let put_block = |file: &mut Vec<u8>, raw: &[u8]| {
        let body = compress(raw, BlockCompression::ZlibRaw, 6).unwrap();
        let h = handle(file.len(), body.len());
        file.extend_from_slice(&body);
        file.push(BlockCompression::ZlibRaw as u8);
        file.extend_from_slice(&[0; 4]);
        h
    };
    let data = put_block(&mut file, &block_of(keys));
    let last = keys.last().map(|(k, _)| k.clone()).unwrap_or_default();
    let meta = put_block(&mut file, &finish_block(Vec::new()));
    let index = put_block(&mut file, &block_of(&[(last, data)]));

    let mut footer = meta;
    footer.extend_from_slice(&index);
    footer.resize(FOOTER_LEN - 8, 0);
    file.extend_from_slice(&footer);
    file.extend_from_slice(&TABLE_MAGIC.to_le_bytes());
    Bytes::from(file)
}

fn batch(sequence: u64, entries: &[(&[u8], Option<&[u8]>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&sequence.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (key, value) in entries {
        out.push(u8::from(value.is_some()));
        put_var_u32(&mut out, key.len() as u32);
        out.extend_from_slice(key);
        if let Some(value) = value {
            put_var_u32(&mut out, value.len() as u32);
            out.extend_from_slice(value);
        }
    }
    out
}

fn full_record(payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() + HEADER_LEN <= BLOCK_SIZE);
    let mut out = vec![0, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.push(1);
    out.extend_from_slice(payload);
    out
}

#[test]
fn block_with_restart_and_shared_prefix() {
    let mut body = Vec::new();
    record(&mut body, 0, b"abcdef", b"first");
    record(&mut body, 3, b"xyz", b"second");
    let block = Block::new(Bytes::from(finish_block(body))).unwrap();
    let arena = block.records(KeyFormat::Plain).unwrap();

    assert_eq!(arena.len(), 2);
    assert!(arena.record(0).unwrap().is_restart_point());
    assert!(!arena.record(1).unwrap().is_restart_point());
    let (a, b) = (arena.key(0).unwrap(), arena.key(1).unwrap());
    assert_eq!(a, b"abcdef");
    assert_eq!(b, b"abcxyz");
    assert_eq!(a[..3], b[..3]);
    assert_ne!(a[3..], b[3..]);
}

#[test]
fn log_full_record_with_tombstone() {
    let log = full_record(&batch(7, &[(b"alive", Some(b"yes")), (b"dead", None)]));
    let mut store = KeyValueStore::new();
    store.init([("db/000003.log", Bytes::from(log))]);

    assert!(!store.is_error());
    assert_eq!(store.len(), 2);
    assert!(matches!(store.lookup(b"alive"), Lookup::Present(v) if &v[..] == b"yes"));
    assert_eq!(store.lookup(b"dead"), Lookup::Deleted);
    assert_eq!(store.lookup(b"unknown"), Lookup::Missing);
}

#[test]
fn log_wins_over_table() {
    let ldb = table(&[
        (internal(b"kept", 1, true), b"table".to_vec()),
        (internal(b"replaced", 2, true), b"table".to_vec()),
        (internal(b"removed", 3, true), b"table".to_vec()),
    ]);
    let log = full_record(&batch(
        1,
        &[(b"replaced", Some(b"log")), (b"removed", None)],
    ));

    let mut store = KeyValueStore::new();
    // Input order must not matter: tables always load before logs.
    store.init([
        ("db/000002.log".to_string(), Bytes::from(log)),
        ("db/000005.ldb".to_string(), ldb),
    ]);

    assert!(!store.is_error(), "{:?}", store.errors());
    assert_eq!(store.get(b"kept").map(|v| &v[..]), Some(&b"table"[..]));
    assert_eq!(store.get(b"replaced").map(|v| &v[..]), Some(&b"log"[..]));
    assert_eq!(store.lookup(b"removed"), Lookup::Deleted);
    assert_eq!(store.entry(b"kept").map(|e| e.origin), Some(Origin::Table));
    assert_eq!(store.entry(b"kept").map(|e| e.sequence), Some(1));
}

#[test]
fn newer_table_sequence_wins() {
    let older = table(&[(internal(b"k", 10, true), b"old".to_vec())]);
    let newer = table(&[(internal(b"k", 20, true), b"new".to_vec())]);
    let deleted = table(&[(internal(b"k", 15, false), Vec::new())]);

    let mut store = KeyValueStore::new();
    store.init([
        ("000009.ldb", newer),
        ("000004.ldb", older),
        ("000006.ldb", deleted),
    ]);
    assert_eq!(store.get(b"k").map(|v| &v[..]), Some(&b"new"[..]));
    assert_eq!(store.entry(b"k").map(|e| e.sequence), Some(20));
}

#[test]
fn table_deletion_is_a_tombstone() {
    let ldb = table(&[(internal(b"gone", 4, false), Vec::new())]);
    let mut store = KeyValueStore::new();
    store.init([("000010.ldb", ldb)]);
    assert_eq!(store.lookup(b"gone"), Lookup::Deleted);
    assert_eq!(store.tombstone_count(), 1);
}

fn temp_db_path() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("bedrock_leveldb_test_{}", rand::random::<u64>()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn read_dir_files(path: &std::path::Path) -> Vec<(String, Bytes)> {
    std::fs::read_dir(path)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let name = entry.file_name().to_string_lossy().into_owned();
            (name, Bytes::from(std::fs::read(entry.path()).unwrap()))
        })
        .collect()
}

#[test]
fn reads_database_written_by_leveldb() {
    let path = temp_db_path();
    {
        let opts = rusty_leveldb::Options {
            create_if_missing: true,
            ..rusty_leveldb::Options::default()
        };
        let mut db = rusty_leveldb::DB::open(&path, opts).unwrap();
        for i in 0..500u32 {
            let key = format!("chunk-{i:05}");
            db.put(key.as_bytes(), &i.to_le_bytes()).unwrap();
        }
        db.delete(b"chunk-00007").unwrap();
        db.flush().unwrap();
        db.compact_range(b"chunk-", b"chunk-99999").unwrap();
        db.put(b"after-compaction", b"tail").unwrap();
        db.flush().unwrap();
    }

    let mut store = KeyValueStore::new();
    store.init(read_dir_files(&path));
    assert!(!store.is_error(), "{:?}", store.errors());

    for i in 0..500u32 {
        let key = format!("chunk-{i:05}");
        if i == 7 {
            assert!(store.get(key.as_bytes()).is_none());
        } else {
            assert_eq!(
                store.get(key.as_bytes()).map(|v| v.to_vec()),
                Some(i.to_le_bytes().to_vec()),
                "{key}"
            );
        }
    }
    assert_eq!(store.get(b"after-compaction").map(|v| &v[..]), Some(&b"tail"[..]));

    std::fs::remove_dir_all(&path).ok();
}
