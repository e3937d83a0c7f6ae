//! Chronicler V1: read-only legacy chunk-file migration surface
//! (`spec.md` §3.5, §4.5). Never extend this format — new code paths
//! exist only in V2.

use std::fs::File;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::format::{Entry, Operation};

const CHUNK_PREFIX: &str = "chunk-";
const CHUNK_EXT: &str = "hyd1";

/// Lists a Swamp's V1 chunk files in deterministic lexicographic filename
/// order, regardless of the order the filesystem returns directory
/// entries in. Chunk numbers are zero-padded so lexicographic order and
/// numeric order agree.
pub fn list_chunk_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(crate::error::Error::from_io)? {
        let entry = entry.map_err(crate::error::Error::from_io)?;
        let name = entry.file_name();
        let name = name.to_string_lossy().into_owned();
        if name.starts_with(CHUNK_PREFIX) && name.ends_with(&format!(".{CHUNK_EXT}")) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}

/// Iterates a Swamp's chunk files in order and applies their entries with
/// the same fold semantics as the V2 reader: INSERT/UPDATE overwrite,
/// DELETE removes. Used to seed a fresh Beacon before rewriting the Swamp
/// via V2.
pub fn load(dir: impl AsRef<Path>) -> Result<FxHashMap<String, Vec<u8>>> {
    let mut map = FxHashMap::default();
    for path in list_chunk_files(dir)? {
        let mut file = File::open(&path).map_err(crate::error::Error::from_io)?;
        loop {
            match Entry::read_from(&mut file) {
                Ok(entry) => match entry.operation {
                    Operation::Insert | Operation::Update => {
                        map.insert(entry.key, entry.data);
                    }
                    Operation::Delete => {
                        map.remove(&entry.key);
                    }
                },
                Err(_) => break,
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_chunk(dir: &Path, n: u64, entries: &[Entry]) {
        let path = dir.join(format!("{CHUNK_PREFIX}{n:06}.{CHUNK_EXT}"));
        let mut file = File::create(path).unwrap();
        for e in entries {
            let mut buf = Vec::new();
            e.write_to(&mut buf).unwrap();
            file.write_all(&buf).unwrap();
        }
    }

    #[test]
    fn discovers_chunks_in_ascending_numeric_order() {
        let dir = tempdir().unwrap();
        write_chunk(dir.path(), 2, &[Entry::insert("b", b"2".to_vec())]);
        write_chunk(dir.path(), 1, &[Entry::insert("a", b"1".to_vec())]);
        let files = list_chunk_files(dir.path()).unwrap();
        assert!(files[0].to_string_lossy().contains("000001"));
        assert!(files[1].to_string_lossy().contains("000002"));
    }

    #[test]
    fn load_applies_fold_semantics_across_chunks() {
        let dir = tempdir().unwrap();
        write_chunk(dir.path(), 1, &[Entry::insert("k", b"v1".to_vec())]);
        write_chunk(
            dir.path(),
            2,
            &[Entry::update("k", b"v2".to_vec()), Entry::insert("other", b"x".to_vec())],
        );
        let map = load(dir.path()).unwrap();
        assert_eq!(map.get("k").unwrap(), b"v2");
        assert_eq!(map.get("other").unwrap(), b"x");
    }

    #[test]
    fn load_applies_delete() {
        let dir = tempdir().unwrap();
        write_chunk(
            dir.path(),
            1,
            &[Entry::insert("k", b"v1".to_vec()), Entry::delete("k")],
        );
        let map = load(dir.path()).unwrap();
        assert!(!map.contains_key("k"));
    }
}
