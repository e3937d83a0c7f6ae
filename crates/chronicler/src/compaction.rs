//! Fragmentation measurement and the compaction protocol (`spec.md` §4.4).

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use hydraide_core::Treasure;

use crate::error::{Error, Result};
use crate::format::{Entry, Header};
use crate::reader::Reader;
use crate::writer::Writer;

/// `1 - (live_entries / total_entries)`. `total_entries` counts every
/// entry ever written (including superseded and tombstoned ones); a fresh,
/// never-compacted file with no updates or deletes has fragmentation 0.
/// `live_entries` excludes shadow-deleted Treasures — a tombstone is kept
/// in the live map so its key stays retrievable, but compaction is what
/// reclaims it, so it doesn't count as live for this ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragmentation {
    pub live_entries: usize,
    pub total_entries: usize,
    pub ratio: f64,
}

/// Decodes `data` as a Treasure body and reports whether it is a shadow
/// delete. A body that doesn't decode as a Treasure (e.g. test fixtures
/// writing raw bytes) is treated as live.
fn is_tombstone_body(data: &[u8]) -> bool {
    Treasure::from_bytes(0, data, None)
        .map(|t| t.is_tombstone())
        .unwrap_or(false)
}

/// Scans `path` and computes its fragmentation ratio. Reads the footer
/// when present (for the live count) but always needs a raw entry count,
/// which requires a full scan regardless of footer availability.
pub fn calculate_fragmentation(path: impl AsRef<Path>) -> Result<Fragmentation> {
    let result = Reader::load(path.as_ref())?;
    let live_entries = result
        .live
        .values()
        .filter(|data| !is_tombstone_body(data))
        .count();
    let total_entries = count_total_entries(path.as_ref())?;
    let ratio = if total_entries == 0 {
        0.0
    } else {
        1.0 - (live_entries as f64 / total_entries as f64)
    };
    Ok(Fragmentation {
        live_entries,
        total_entries,
        ratio,
    })
}

fn count_total_entries(path: &Path) -> Result<usize> {
    use std::io::Read;
    let mut file = File::open(path).map_err(Error::from_io)?;
    let header = Header::read_from(&mut file)?;
    let file_len = file.seek(SeekFrom::End(0)).map_err(Error::from_io)?;

    // Reuse the reader's trailer lookup to bound the scan at the footer,
    // excluding it (and the trailer) from the raw entry count.
    file.seek(SeekFrom::Start(
        file_len.saturating_sub(crate::format::Trailer::ENCODED_LEN),
    ))
    .map_err(Error::from_io)?;
    let mut maybe_trailer = [0u8; crate::format::Trailer::ENCODED_LEN as usize];
    let trailer_offset = if file_len >= crate::format::Trailer::ENCODED_LEN
        && file.read_exact(&mut maybe_trailer).is_ok()
    {
        let mut cur = std::io::Cursor::new(&maybe_trailer[..]);
        crate::format::Trailer::read_from(&mut cur)
            .ok()
            .map(|t| t.footer_offset)
    } else {
        None
    };
    let scan_end = trailer_offset.unwrap_or(file_len);

    file.seek(SeekFrom::Start(header.encoded_len()))
        .map_err(Error::from_io)?;
    let mut count = 0usize;
    loop {
        let pos = file.stream_position().map_err(Error::from_io)?;
        if pos >= scan_end {
            break;
        }
        let remaining = scan_end - pos;
        const BLOCK_HEADER_LEN: u64 = 16;
        if remaining < BLOCK_HEADER_LEN {
            break;
        }
        let mut hdr = [0u8; BLOCK_HEADER_LEN as usize];
        if file.read_exact(&mut hdr).is_err() {
            break;
        }
        let compressed_len = u32::from_le_bytes(hdr[4..8].try_into().unwrap()) as u64;
        let entry_count = u32::from_le_bytes(hdr[8..12].try_into().unwrap()) as usize;
        if remaining - BLOCK_HEADER_LEN < compressed_len {
            break;
        }
        file.seek(SeekFrom::Current(compressed_len as i64))
            .map_err(Error::from_io)?;
        count += entry_count;
    }
    Ok(count)
}

/// Compacts `path` if its fragmentation exceeds `threshold`, or
/// unconditionally when `force` is set. The writer for `path` must already
/// be closed. On success the original file is atomically replaced; on any
/// failure before the rename, the `.compacting` scratch file is removed
/// and the original is left untouched.
pub fn compact_if_needed(
    path: impl AsRef<Path>,
    threshold: f64,
    force: bool,
    created_at_ms: i64,
    max_block_size: usize,
) -> Result<Option<Fragmentation>> {
    let path = path.as_ref();
    let frag = calculate_fragmentation(path)?;
    if !force && frag.ratio <= threshold {
        return Ok(None);
    }

    tracing::info!(
        path = %path.display(),
        ratio = frag.ratio,
        forced = force,
        "compaction triggered"
    );

    let result = Reader::load(path)?;
    let compacting_path = path.with_extension("compacting");

    // Packed in key-sorted order rather than `result.live`'s FxHashMap
    // iteration order, so that compacting the same logical contents twice
    // in a row produces byte-identical files (`spec.md` §8).
    let mut live_keys: Vec<&String> = result.live.keys().collect();
    live_keys.sort();

    let outcome = (|| -> Result<()> {
        let mut writer = Writer::open(
            &compacting_path,
            result.header.swamp_name.clone(),
            created_at_ms,
            max_block_size,
        )?;
        for key in live_keys {
            let data = &result.live[key];
            if is_tombstone_body(data) {
                continue;
            }
            writer.write_entry(Entry::insert(key.clone(), data.clone()))?;
        }
        writer.close()?;
        Ok(())
    })();

    if let Err(e) = outcome {
        tracing::error!(path = %path.display(), error = %e, "compaction failed, discarding scratch file");
        let _ = std::fs::remove_file(&compacting_path);
        return Err(e);
    }

    std::fs::rename(&compacting_path, path).map_err(Error::from_io)?;
    Ok(Some(frag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fragmentation_reflects_superseded_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swamp.hyd");
        let mut w = Writer::open(&path, "s/r/w", 1, 1).unwrap();
        w.write_entry(Entry::insert("k", b"v1".to_vec())).unwrap();
        w.write_entry(Entry::update("k", b"v2".to_vec())).unwrap();
        w.close().unwrap();

        let frag = calculate_fragmentation(&path).unwrap();
        assert_eq!(frag.live_entries, 1);
        assert_eq!(frag.total_entries, 2);
        assert!(frag.ratio > 0.0);
    }

    #[test]
    fn compaction_rewrites_file_with_only_live_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swamp.hyd");
        let mut w = Writer::open(&path, "s/r/w", 1, 1).unwrap();
        w.write_entry(Entry::insert("k", b"v1".to_vec())).unwrap();
        w.write_entry(Entry::update("k", b"v2".to_vec())).unwrap();
        w.write_entry(Entry::insert("other", b"x".to_vec()))
            .unwrap();
        w.close().unwrap();

        let outcome = compact_if_needed(&path, 0.0, true, 2000, 64 * 1024).unwrap();
        assert!(outcome.is_some());

        let reloaded = Reader::load(&path).unwrap();
        assert_eq!(reloaded.live.len(), 2);
        assert_eq!(reloaded.live.get("k").unwrap(), b"v2");

        let frag = calculate_fragmentation(&path).unwrap();
        assert_eq!(frag.live_entries, frag.total_entries);
    }

    #[test]
    fn repeated_compaction_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swamp.hyd");
        let mut w = Writer::open(&path, "s/r/w", 1, 1).unwrap();
        // Keys inserted out of sorted order so packing by hash-map
        // iteration order (instead of key order) would likely disagree
        // across the two compactions below.
        w.write_entry(Entry::insert("zeta", b"z".to_vec())).unwrap();
        w.write_entry(Entry::insert("alpha", b"a".to_vec())).unwrap();
        w.write_entry(Entry::insert("mu", b"m".to_vec())).unwrap();
        w.write_entry(Entry::update("alpha", b"a2".to_vec())).unwrap();
        w.close().unwrap();

        compact_if_needed(&path, 0.0, true, 2000, 64 * 1024).unwrap();
        let first = std::fs::read(&path).unwrap();

        compact_if_needed(&path, 0.0, true, 2000, 64 * 1024).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn below_threshold_skips_compaction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swamp.hyd");
        let mut w = Writer::open(&path, "s/r/w", 1000, 64 * 1024).unwrap();
        w.write_entry(Entry::insert("k", b"v".to_vec())).unwrap();
        w.close().unwrap();

        let outcome = compact_if_needed(&path, 0.5, false, 2000, 64 * 1024).unwrap();
        assert!(outcome.is_none());
    }
}
