//! Index snapshot persistence.
//!
//! The on-disk format is a fixed header followed by a zstd-compressed
//! postcard payload:
//!
//! ```text
//! [magic 8B] [format version u32 LE] [fnv1a checksum u64 LE] [zstd(postcard)]
//! ```
//!
//! The checksum covers the uncompressed payload bytes. Any integrity
//! failure on load - wrong magic, unknown version, checksum mismatch,
//! decompression or decode error - surfaces as [`LocateError::Corrupt`]:
//! the caller reports it and requires an explicit rebuild, never a silent
//! partial load. A missing file is simply an empty index.
//!
//! Writes go to a sibling temp file and are published with an atomic
//! rename, so a crash mid-write leaves the prior committed snapshot intact.

use std::fs::{self, File};
use std::hash::Hasher;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::error::{LocateError, Result};
use crate::types::PathRecord;

use super::generation::Generation;

pub const INDEX_MAGIC: [u8; 8] = *b"LOCATDB\0";
/// Increment when changing the payload format.
pub const INDEX_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 8;

/// The durable payload. The trigram postings are derived data and are
/// rebuilt from the records on load rather than persisted.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    roots: Vec<PathBuf>,
    stamp: u64,
    records: Vec<PathRecord>,
}

/// Contents restored from a snapshot file.
pub struct LoadedSnapshot {
    pub records: Vec<PathRecord>,
    pub roots: Vec<PathBuf>,
    pub stamp: u64,
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Writes a generation snapshot to `path` (temp file + atomic rename).
pub fn write_snapshot(path: &Path, generation: &Generation) -> Result<()> {
    let payload = PersistedIndex {
        roots: generation.roots().to_vec(),
        stamp: generation.stamp().unwrap_or(0),
        records: generation.records().to_vec(),
    };

    let encoded = postcard::to_allocvec(&payload).map_err(|error| {
        LocateError::Internal(format!("failed to encode index snapshot: {error}"))
    })?;
    let checksum = fnv1a(&encoded);

    let compressed = zstd::stream::encode_all(encoded.as_slice(), 6).map_err(|error| {
        LocateError::Internal(format!("failed to compress index snapshot: {error}"))
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut output = File::create(&tmp_path)?;
        output.write_all(&INDEX_MAGIC)?;
        output.write_all(&INDEX_FORMAT_VERSION.to_le_bytes())?;
        output.write_all(&checksum.to_le_bytes())?;
        output.write_all(&compressed)?;
        output.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    log::debug!(
        "wrote index snapshot path={} records={} bytes={}",
        path.display(),
        generation.len(),
        HEADER_LEN + compressed.len(),
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Loads a snapshot from `path`.
///
/// Returns `Ok(None)` when no snapshot exists yet.
pub fn load_snapshot(path: &Path) -> Result<Option<LoadedSnapshot>> {
    let mut input = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    if data.len() < HEADER_LEN {
        return Err(corrupt(path, "file shorter than header"));
    }
    if data[..8] != INDEX_MAGIC {
        return Err(corrupt(path, "bad magic"));
    }

    let version = u32::from_le_bytes(data[8..12].try_into().expect("fixed slice"));
    if version != INDEX_FORMAT_VERSION {
        return Err(corrupt(
            path,
            &format!("unsupported format version {version}"),
        ));
    }

    let expected_checksum = u64::from_le_bytes(data[12..20].try_into().expect("fixed slice"));

    let encoded = zstd::stream::decode_all(&data[HEADER_LEN..])
        .map_err(|error| corrupt(path, &format!("decompression failed: {error}")))?;

    if fnv1a(&encoded) != expected_checksum {
        return Err(corrupt(path, "checksum mismatch"));
    }

    let payload: PersistedIndex = postcard::from_bytes(&encoded)
        .map_err(|error| corrupt(path, &format!("decode failed: {error}")))?;

    log::debug!(
        "loaded index snapshot path={} records={} stamp={}",
        path.display(),
        payload.records.len(),
        payload.stamp,
    );

    Ok(Some(LoadedSnapshot {
        records: payload.records,
        roots: payload.roots,
        stamp: payload.stamp,
    }))
}

fn corrupt(path: &Path, reason: &str) -> LocateError {
    LocateError::Corrupt(format!("{}: {reason}", path.display()))
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;
    use tempfile::TempDir;

    fn record(path: &str) -> PathRecord {
        PathRecord {
            full_path: path.to_string(),
            basename: path.rsplit('/').next().unwrap_or(path).to_string(),
            depth: 1,
            kind: RecordKind::File,
            size_bytes: 7,
            modified_at: Some(1_700_000_000),
        }
    }

    fn sample_generation() -> Generation {
        Generation::assemble(
            vec![record("/data/a.txt"), record("/data/b.txt")],
            vec![PathBuf::from("/data")],
            1_700_000_123,
        )
    }

    #[test]
    fn round_trips_records_roots_and_stamp() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");

        write_snapshot(&db, &sample_generation()).unwrap();
        let loaded = load_snapshot(&db).unwrap().unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].full_path, "/data/a.txt");
        assert_eq!(loaded.records[0].size_bytes, 7);
        assert_eq!(loaded.roots, vec![PathBuf::from("/data")]);
        assert_eq!(loaded.stamp, 1_700_000_123);
    }

    #[test]
    fn missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let loaded = load_snapshot(&temp.path().join("absent.db")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");
        fs::write(&db, b"LOC").unwrap();
        assert!(matches!(load_snapshot(&db), Err(LocateError::Corrupt(_))));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");
        fs::write(&db, vec![0u8; 64]).unwrap();
        assert!(matches!(load_snapshot(&db), Err(LocateError::Corrupt(_))));
    }

    #[test]
    fn flipped_payload_byte_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");
        write_snapshot(&db, &sample_generation()).unwrap();

        let mut data = fs::read(&db).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&db, &data).unwrap();

        assert!(matches!(load_snapshot(&db), Err(LocateError::Corrupt(_))));
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");
        write_snapshot(&db, &sample_generation()).unwrap();

        let mut data = fs::read(&db).unwrap();
        data[8] = 0xfe;
        fs::write(&db, &data).unwrap();

        assert!(matches!(load_snapshot(&db), Err(LocateError::Corrupt(_))));
    }

    #[test]
    fn rewrite_replaces_previous_snapshot() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("index.db");

        write_snapshot(&db, &sample_generation()).unwrap();
        let next = Generation::assemble(
            vec![record("/data/c.txt")],
            vec![PathBuf::from("/data")],
            1_700_000_200,
        );
        write_snapshot(&db, &next).unwrap();

        let loaded = load_snapshot(&db).unwrap().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].full_path, "/data/c.txt");
    }
}
