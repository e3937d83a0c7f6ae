//! File header for a Chronicler V2 (`.hyd`) file (`spec.md` §3.4).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Magic bytes identifying a Chronicler V2 file.
pub const MAGIC: &[u8; 4] = b"HYD2";

/// Current on-disk format version (`spec.md` §6: `version: u16 = 2`).
pub const FORMAT_VERSION: u16 = 2;

/// File header: magic, version, flags, swamp name (for reverse lookup
/// during operational scans), and creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format_version: u16,
    pub flags: u16,
    pub swamp_name: String,
    pub created_at_ms: i64,
}

impl Header {
    pub fn new(swamp_name: impl Into<String>, created_at_ms: i64) -> Self {
        Header {
            format_version: FORMAT_VERSION,
            flags: 0,
            swamp_name: swamp_name.into(),
            created_at_ms,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC).map_err(Error::from_io)?;
        w.write_u16::<LittleEndian>(self.format_version)
            .map_err(Error::from_io)?;
        w.write_u16::<LittleEndian>(self.flags)
            .map_err(Error::from_io)?;
        let name_bytes = self.swamp_name.as_bytes();
        w.write_u32::<LittleEndian>(name_bytes.len() as u32)
            .map_err(Error::from_io)?;
        w.write_all(name_bytes).map_err(Error::from_io)?;
        w.write_i64::<LittleEndian>(self.created_at_ms)
            .map_err(Error::from_io)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(Error::from_io)?;
        if &magic != MAGIC {
            return Err(Error::CorruptEntry("bad file header magic".to_string()));
        }
        let format_version = r.read_u16::<LittleEndian>().map_err(Error::from_io)?;
        if format_version != FORMAT_VERSION {
            return Err(Error::FormatVersionUnsupported(format_version));
        }
        let flags = r.read_u16::<LittleEndian>().map_err(Error::from_io)?;
        let name_len = r.read_u32::<LittleEndian>().map_err(Error::from_io)? as usize;
        let mut name_buf = vec![0u8; name_len];
        r.read_exact(&mut name_buf).map_err(Error::from_io)?;
        let swamp_name =
            String::from_utf8(name_buf).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let created_at_ms = r.read_i64::<LittleEndian>().map_err(Error::from_io)?;
        Ok(Header {
            format_version,
            flags,
            swamp_name,
            created_at_ms,
        })
    }

    /// Encoded size in bytes, used to compute the first block's file offset.
    pub fn encoded_len(&self) -> u64 {
        (4 + 2 + 2 + 4 + self.swamp_name.len() + 8) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let h = Header::new("company/employees/emp-1234", 123456);
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, h.encoded_len());
        let mut cur = std::io::Cursor::new(buf);
        let h2 = Header::read_from(&mut cur).unwrap();
        assert_eq!(h, h2);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut cur = std::io::Cursor::new(vec![0u8; 20]);
        assert!(Header::read_from(&mut cur).is_err());
    }
}
