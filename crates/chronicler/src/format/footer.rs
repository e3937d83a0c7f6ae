//! Index footer and trailer (`spec.md` §3.4).
//!
//! The footer is advisory: a reader must always be able to reconstruct the
//! same information by a full scan, and falls back to doing so whenever the
//! trailer is missing or its CRC does not verify.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Magic bytes ending a Chronicler V2 file.
pub const TRAILER_MAGIC: &[u8; 7] = b"HYD2END";

/// Where a key's most recent non-DELETE entry lives, or that it is a
/// tombstone (latest entry was DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterLocation {
    Live { block_offset: u64, entry_offset: u32 },
    Tombstone,
}

/// A dense Key → location mapping, written at compaction time and on
/// graceful close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFooter {
    pub entries: FxHashMap<String, FooterLocation>,
}

impl IndexFooter {
    pub fn new() -> Self {
        IndexFooter::default()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize> {
        let mut total = 0usize;
        w.write_u32::<LittleEndian>(self.entries.len() as u32)
            .map_err(Error::from_io)?;
        total += 4;
        // Sorted by key rather than iterated in FxHashMap bucket order, so
        // that writing the same logical index twice produces identical
        // bytes (`spec.md` §8's idempotent-compaction property).
        let mut sorted: Vec<(&String, &FooterLocation)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, loc) in sorted {
            let key_bytes = key.as_bytes();
            if key_bytes.len() > u16::MAX as usize {
                return Err(Error::CorruptEntry(format!(
                    "key {key} exceeds the {}-byte footer key_len limit",
                    u16::MAX
                )));
            }
            w.write_u16::<LittleEndian>(key_bytes.len() as u16)
                .map_err(Error::from_io)?;
            w.write_all(key_bytes).map_err(Error::from_io)?;
            total += 2 + key_bytes.len();
            match loc {
                FooterLocation::Live {
                    block_offset,
                    entry_offset,
                } => {
                    w.write_u8(1).map_err(Error::from_io)?;
                    w.write_u64::<LittleEndian>(*block_offset)
                        .map_err(Error::from_io)?;
                    w.write_u32::<LittleEndian>(*entry_offset)
                        .map_err(Error::from_io)?;
                }
                FooterLocation::Tombstone => {
                    w.write_u8(2).map_err(Error::from_io)?;
                }
            }
            total += match loc {
                FooterLocation::Live { .. } => 1 + 8 + 4,
                FooterLocation::Tombstone => 1,
            };
        }
        Ok(total)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let count = r.read_u32::<LittleEndian>().map_err(Error::from_io)?;
        let mut entries = FxHashMap::default();
        for _ in 0..count {
            let key_len = r.read_u16::<LittleEndian>().map_err(Error::from_io)? as usize;
            let mut key_buf = vec![0u8; key_len];
            r.read_exact(&mut key_buf).map_err(Error::from_io)?;
            let key =
                String::from_utf8(key_buf).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let tag = r.read_u8().map_err(Error::from_io)?;
            let loc = match tag {
                1 => {
                    let block_offset = r.read_u64::<LittleEndian>().map_err(Error::from_io)?;
                    let entry_offset = r.read_u32::<LittleEndian>().map_err(Error::from_io)?;
                    FooterLocation::Live {
                        block_offset,
                        entry_offset,
                    }
                }
                2 => FooterLocation::Tombstone,
                other => {
                    return Err(Error::CorruptEntry(format!(
                        "unknown footer entry kind {other}"
                    )))
                }
            };
            entries.insert(key, loc);
        }
        Ok(IndexFooter { entries })
    }
}

/// The fixed-size record at the very end of the file, pointing back at the
/// footer and guarding its integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub footer_offset: u64,
    pub footer_length: u64,
    pub footer_crc32c: u32,
}

impl Trailer {
    pub const ENCODED_LEN: u64 = 8 + 8 + 4 + 7;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64::<LittleEndian>(self.footer_offset)
            .map_err(Error::from_io)?;
        w.write_u64::<LittleEndian>(self.footer_length)
            .map_err(Error::from_io)?;
        w.write_u32::<LittleEndian>(self.footer_crc32c)
            .map_err(Error::from_io)?;
        w.write_all(TRAILER_MAGIC).map_err(Error::from_io)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let footer_offset = r.read_u64::<LittleEndian>().map_err(Error::from_io)?;
        let footer_length = r.read_u64::<LittleEndian>().map_err(Error::from_io)?;
        let footer_crc32c = r.read_u32::<LittleEndian>().map_err(Error::from_io)?;
        let mut magic = [0u8; 7];
        r.read_exact(&mut magic).map_err(Error::from_io)?;
        if &magic != TRAILER_MAGIC {
            return Err(Error::CorruptEntry("bad trailer magic".to_string()));
        }
        Ok(Trailer {
            footer_offset,
            footer_length,
            footer_crc32c,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_round_trips() {
        let mut footer = IndexFooter::new();
        footer.entries.insert(
            "a".to_string(),
            FooterLocation::Live {
                block_offset: 100,
                entry_offset: 4,
            },
        );
        footer
            .entries
            .insert("b".to_string(), FooterLocation::Tombstone);

        let mut buf = Vec::new();
        footer.write_to(&mut buf).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        let decoded = IndexFooter::read_from(&mut cur).unwrap();
        assert_eq!(decoded, footer);
    }

    #[test]
    fn trailer_round_trips() {
        let t = Trailer {
            footer_offset: 12345,
            footer_length: 678,
            footer_crc32c: 0xdeadbeef,
        };
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, Trailer::ENCODED_LEN);
        let mut cur = std::io::Cursor::new(buf);
        assert_eq!(Trailer::read_from(&mut cur).unwrap(), t);
    }

    #[test]
    fn trailer_rejects_bad_magic() {
        let t = Trailer {
            footer_offset: 1,
            footer_length: 2,
            footer_crc32c: 3,
        };
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        let mut cur = std::io::Cursor::new(buf);
        assert!(Trailer::read_from(&mut cur).is_err());
    }
}
