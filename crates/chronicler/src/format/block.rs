//! A length-prefixed, zstd-compressed sequence of entries (`spec.md` §3.4).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::format::entry::Entry;

/// A sealed block's on-disk layout (`spec.md` §6):
/// `[uncompressed_len: u32][compressed_len: u32][entry_count: u32][crc32c: u32][compressed_payload]`.
pub struct Block;

impl Block {
    /// Serialize `entries` into a sealed, compressed block and append it to
    /// `w`. Returns the total bytes written and, for each entry in order,
    /// its byte offset within the block's *decompressed* payload — the
    /// `entry_offset` half of the index footer's location (block_offset,
    /// entry_offset) pair.
    pub fn write<W: Write>(w: &mut W, entries: &[Entry]) -> Result<(u64, Vec<u32>)> {
        let mut raw = Vec::new();
        let mut offsets = Vec::with_capacity(entries.len());
        for e in entries {
            offsets.push(raw.len() as u32);
            e.write_to(&mut raw)?;
        }
        let compressed = zstd::encode_all(&raw[..], 0).map_err(Error::from_io)?;
        let crc = crc32c::crc32c(&compressed);

        w.write_u32::<LittleEndian>(raw.len() as u32)
            .map_err(Error::from_io)?;
        w.write_u32::<LittleEndian>(compressed.len() as u32)
            .map_err(Error::from_io)?;
        w.write_u32::<LittleEndian>(entries.len() as u32)
            .map_err(Error::from_io)?;
        w.write_u32::<LittleEndian>(crc).map_err(Error::from_io)?;
        w.write_all(&compressed).map_err(Error::from_io)?;

        Ok(((4 + 4 + 4 + 4 + compressed.len()) as u64, offsets))
    }

    /// Read and verify one block from `r`, returning its decoded entries and
    /// each entry's byte offset within the block's decompressed payload
    /// (used to build the index footer).
    ///
    /// `block_start_offset` is the file offset this block's header begins
    /// at, surfaced in [`Error::BlockCrcMismatch`] for diagnostics.
    pub fn read<R: Read>(r: &mut R, block_start_offset: u64) -> Result<Vec<(u32, Entry)>> {
        let uncompressed_len = r.read_u32::<LittleEndian>().map_err(Error::from_io)? as usize;
        let compressed_len = r.read_u32::<LittleEndian>().map_err(Error::from_io)? as usize;
        let entry_count = r.read_u32::<LittleEndian>().map_err(Error::from_io)?;
        let expected_crc = r.read_u32::<LittleEndian>().map_err(Error::from_io)?;

        let mut compressed = vec![0u8; compressed_len];
        r.read_exact(&mut compressed).map_err(Error::from_io)?;

        let actual_crc = crc32c::crc32c(&compressed);
        if actual_crc != expected_crc {
            return Err(Error::BlockCrcMismatch {
                offset: block_start_offset,
            });
        }

        let raw = zstd::decode_all(&compressed[..]).map_err(Error::from_io)?;
        if raw.len() != uncompressed_len {
            return Err(Error::CorruptEntry(
                "decompressed length mismatch".to_string(),
            ));
        }

        let mut cur = std::io::Cursor::new(&raw[..]);
        let mut out = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let offset = cur.position() as u32;
            let entry = Entry::read_from(&mut cur)?;
            out.push((offset, entry));
        }
        Ok(out)
    }
}
