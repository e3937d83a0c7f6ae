//! Log entries recorded inside a Chronicler V2 block (`spec.md` §3.4).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// The mutation an entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// `spec.md` §6: `op: u8 {1=INSERT, 2=UPDATE, 3=DELETE}`.
    fn tag(self) -> u8 {
        match self {
            Operation::Insert => 1,
            Operation::Update => 2,
            Operation::Delete => 3,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(Operation::Insert),
            2 => Ok(Operation::Update),
            3 => Ok(Operation::Delete),
            other => Err(Error::CorruptEntry(format!(
                "unknown entry operation tag {other}"
            ))),
        }
    }
}

/// `{ operation, key, data }`. For `Delete`, `data` is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub operation: Operation,
    pub key: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn insert(key: impl Into<String>, data: Vec<u8>) -> Self {
        Entry {
            operation: Operation::Insert,
            key: key.into(),
            data,
        }
    }

    pub fn update(key: impl Into<String>, data: Vec<u8>) -> Self {
        Entry {
            operation: Operation::Update,
            key: key.into(),
            data,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Entry {
            operation: Operation::Delete,
            key: key.into(),
            data: Vec::new(),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u8(self.operation.tag()).map_err(Error::from_io)?;
        let key_bytes = self.key.as_bytes();
        if key_bytes.len() > u16::MAX as usize {
            return Err(Error::CorruptEntry(format!(
                "key {} exceeds the {}-byte entry key_len limit",
                self.key,
                u16::MAX
            )));
        }
        w.write_u16::<LittleEndian>(key_bytes.len() as u16)
            .map_err(Error::from_io)?;
        w.write_all(key_bytes).map_err(Error::from_io)?;
        let data = if matches!(self.operation, Operation::Delete) {
            &[][..]
        } else {
            &self.data[..]
        };
        w.write_u32::<LittleEndian>(data.len() as u32)
            .map_err(Error::from_io)?;
        w.write_all(data).map_err(Error::from_io)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let operation = Operation::from_tag(r.read_u8().map_err(Error::from_io)?)?;
        let key_len = r.read_u16::<LittleEndian>().map_err(Error::from_io)? as usize;
        let mut key_buf = vec![0u8; key_len];
        r.read_exact(&mut key_buf).map_err(Error::from_io)?;
        let key = String::from_utf8(key_buf).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let data_len = r.read_u32::<LittleEndian>().map_err(Error::from_io)? as usize;
        let mut data = vec![0u8; data_len];
        r.read_exact(&mut data).map_err(Error::from_io)?;
        Ok(Entry {
            operation,
            key,
            data,
        })
    }

    /// Byte length this entry would occupy once encoded, used to decide
    /// when the pending block buffer has reached `maxBlockSize`.
    pub fn encoded_len(&self) -> usize {
        1 + 2 + self.key.len() + 4 + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_insert() {
        let e = Entry::insert("k", vec![1, 2, 3]);
        let mut buf = Vec::new();
        e.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), e.encoded_len());
        let mut cur = std::io::Cursor::new(buf);
        assert_eq!(Entry::read_from(&mut cur).unwrap(), e);
    }

    #[test]
    fn delete_carries_no_data() {
        let e = Entry::delete("k");
        let mut buf = Vec::new();
        e.write_to(&mut buf).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        let decoded = Entry::read_from(&mut cur).unwrap();
        assert!(decoded.data.is_empty());
        assert_eq!(decoded.operation, Operation::Delete);
    }
}
