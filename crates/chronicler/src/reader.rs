//! The Chronicler V2 file reader and replay logic (`spec.md` §4.4).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::format::{Block, FooterLocation, Header, IndexFooter, Operation, Trailer};

/// The folded result of replaying a file's entries: the live, most-recent
/// data blob for every surviving key (`spec.md` §4.4 fold semantics).
pub struct LoadResult {
    pub header: Header,
    pub live: FxHashMap<String, Vec<u8>>,
}

pub struct Reader;

impl Reader {
    /// Opens `path`, prefers the trailer-indicated footer when its CRC
    /// verifies, and falls back to a full block scan otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadResult> {
        let mut file = File::open(path.as_ref()).map_err(Error::from_io)?;
        let header = Header::read_from(&mut file)?;
        let file_len = file.seek(SeekFrom::End(0)).map_err(Error::from_io)?;

        let trailer = Self::read_trailer(&mut file, file_len);

        if let Some(trailer) = &trailer {
            if let Some(footer) = Self::read_footer(&mut file, trailer) {
                if let Ok(live) = Self::materialize_from_footer(&mut file, &footer) {
                    return Ok(LoadResult { header, live });
                }
            }
        }

        let scan_end = trailer.map(|t| t.footer_offset).unwrap_or(file_len);
        tracing::warn!(
            path = %path.as_ref().display(),
            "footer missing or corrupt, falling back to full block scan"
        );
        let live = Self::full_scan(&mut file, header.encoded_len(), scan_end)?;
        Ok(LoadResult { header, live })
    }

    fn read_trailer(file: &mut File, file_len: u64) -> Option<Trailer> {
        if file_len < Trailer::ENCODED_LEN {
            return None;
        }
        file.seek(SeekFrom::Start(file_len - Trailer::ENCODED_LEN))
            .ok()?;
        let trailer = Trailer::read_from(file).ok()?;
        if trailer.footer_offset > file_len {
            return None;
        }
        Some(trailer)
    }

    fn read_footer(file: &mut File, trailer: &Trailer) -> Option<IndexFooter> {
        file.seek(SeekFrom::Start(trailer.footer_offset)).ok()?;
        let mut buf = vec![0u8; trailer.footer_length as usize];
        file.read_exact(&mut buf).ok()?;
        if crc32c::crc32c(&buf) != trailer.footer_crc32c {
            return None;
        }
        let mut cur = std::io::Cursor::new(&buf[..]);
        IndexFooter::read_from(&mut cur).ok()
    }

    fn materialize_from_footer(
        file: &mut File,
        footer: &IndexFooter,
    ) -> Result<FxHashMap<String, Vec<u8>>> {
        let mut live = FxHashMap::default();
        for (key, loc) in &footer.entries {
            let FooterLocation::Live {
                block_offset,
                entry_offset,
            } = loc
            else {
                continue;
            };
            file.seek(SeekFrom::Start(*block_offset))
                .map_err(Error::from_io)?;
            let entries = Block::read(file, *block_offset)?;
            let entry = entries
                .into_iter()
                .find(|(offset, _)| offset == entry_offset)
                .map(|(_, e)| e)
                .ok_or_else(|| {
                    Error::CorruptEntry(format!("footer points at missing entry for key {key}"))
                })?;
            live.insert(key.clone(), entry.data);
        }
        Ok(live)
    }

    /// Scans raw blocks from `start` up to `end`, folding INSERT/UPDATE/
    /// DELETE entries into a keyed map. Stops cleanly (without error) the
    /// moment it encounters a block header or payload that the remaining
    /// bytes cannot satisfy — the unflushed tail block a crash mid-write
    /// may have left behind. A block that is fully present but fails its
    /// CRC is a hard error, not a truncation.
    fn full_scan(file: &mut File, start: u64, end: u64) -> Result<FxHashMap<String, Vec<u8>>> {
        file.seek(SeekFrom::Start(start)).map_err(Error::from_io)?;
        let mut map = FxHashMap::default();
        loop {
            let pos = file.stream_position().map_err(Error::from_io)?;
            if pos >= end {
                break;
            }
            let remaining = end - pos;
            match Self::try_read_one_block(file, pos, remaining)? {
                None => break,
                Some(entries) => {
                    for (_, entry) in entries {
                        match entry.operation {
                            Operation::Insert | Operation::Update => {
                                map.insert(entry.key, entry.data);
                            }
                            Operation::Delete => {
                                map.remove(&entry.key);
                            }
                        }
                    }
                }
            }
        }
        Ok(map)
    }

    /// Reads one block's header and payload, returning `None` (without
    /// error) if fewer bytes remain than the block declares — treated as a
    /// truncated trailing block rather than corruption.
    fn try_read_one_block(
        file: &mut File,
        block_offset: u64,
        remaining: u64,
    ) -> Result<Option<Vec<(u32, crate::format::Entry)>>> {
        const BLOCK_HEADER_LEN: u64 = 4 + 4 + 4 + 4;
        if remaining < BLOCK_HEADER_LEN {
            return Ok(None);
        }
        let mut header_buf = [0u8; BLOCK_HEADER_LEN as usize];
        match file.read_exact(&mut header_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(Error::from_io(e)),
        }
        let compressed_len = u32::from_le_bytes(header_buf[4..8].try_into().unwrap()) as u64;
        if remaining - BLOCK_HEADER_LEN < compressed_len {
            return Ok(None);
        }
        file.seek(SeekFrom::Start(block_offset))
            .map_err(Error::from_io)?;
        let entries = Block::read(file, block_offset)?;
        Ok(Some(entries))
    }
}
