//! The Treasure record (`spec.md` §3.2, §4.2).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{Error, Result};
use crate::treasure::guard::{Guard, GuardId, Mode};
use crate::treasure::metadata::{now, Metadata, Timestamp};
use crate::treasure::value::{TriBool, Value};

/// A single key-value record inside a Swamp.
///
/// All mutating operations require a currently-held write guard id
/// (`spec.md` §4.2); reads of already-decoded fields (`get_key`,
/// `get_deleted_at`, ...) do not.
pub struct Treasure {
    key: String,
    value: Option<Value>,
    metadata: Metadata,
    /// V1 back-reference: the chunk file this Treasure was last loaded
    /// from, set only for records migrated from the legacy format.
    file_name: Option<String>,
    guard: Guard,
}

impl Treasure {
    /// Construct a new, valueless Treasure for `key`. A value must be set
    /// via one of the typed setters under a write guard before the record
    /// is considered live.
    pub fn new(key: impl Into<String>) -> Self {
        Treasure {
            key: key.into(),
            value: None,
            metadata: Metadata::default(),
            file_name: None,
            guard: Guard::new(),
        }
    }

    /// `start_guard(write, purpose)`.
    pub fn start_guard(&self, write: bool, purpose: &str) -> GuardId {
        let mode = if write { Mode::Write } else { Mode::Read };
        self.guard.acquire(mode, purpose)
    }

    /// `release_guard(id)`.
    pub fn release_guard(&self, id: GuardId) {
        self.guard.release(id)
    }

    fn check(&self, guard_id: GuardId) -> Result<()> {
        self.guard.check_write(guard_id)
    }

    // -- typed setters -----------------------------------------------------

    /// Set the value to a string, replacing any previously set variant.
    pub fn set_string(&mut self, guard_id: GuardId, v: impl Into<String>) -> Result<()> {
        self.check(guard_id)?;
        self.value = Some(Value::String(v.into()));
        Ok(())
    }

    /// Set the value to a byte blob.
    pub fn set_bytes(&mut self, guard_id: GuardId, v: Vec<u8>) -> Result<()> {
        self.check(guard_id)?;
        self.value = Some(Value::Bytes(v));
        Ok(())
    }

    /// Set the value to a `uint32` slice.
    pub fn set_uint32_slice(&mut self, guard_id: GuardId, v: Vec<u32>) -> Result<()> {
        self.check(guard_id)?;
        self.value = Some(Value::Uint32Slice(v));
        Ok(())
    }

    /// Set the value to a tri-valued bool.
    pub fn set_bool(&mut self, guard_id: GuardId, v: TriBool) -> Result<()> {
        self.check(guard_id)?;
        self.value = Some(Value::Bool(v));
        Ok(())
    }
}

macro_rules! numeric_setter {
    ($name:ident, $ty:ty, $variant:ident) => {
        impl Treasure {
            #[doc = concat!("Set the value to a `", stringify!($ty), "`.")]
            pub fn $name(&mut self, guard_id: GuardId, v: $ty) -> Result<()> {
                self.check(guard_id)?;
                self.value = Some(Value::$variant(v));
                Ok(())
            }
        }
    };
}

numeric_setter!(set_int8, i8, Int8);
numeric_setter!(set_int16, i16, Int16);
numeric_setter!(set_int32, i32, Int32);
numeric_setter!(set_int64, i64, Int64);
numeric_setter!(set_uint8, u8, Uint8);
numeric_setter!(set_uint16, u16, Uint16);
numeric_setter!(set_uint32, u32, Uint32);
numeric_setter!(set_uint64, u64, Uint64);
numeric_setter!(set_float32, f32, Float32);
numeric_setter!(set_float64, f64, Float64);

impl Treasure {
    // -- metadata setters ----------------------------------------------

    /// Set the key. Per `spec.md` §3.2 invariant iv, this is only valid
    /// as the first assignment; subsequent calls are rejected.
    pub fn set_key(&mut self, guard_id: GuardId, key: impl Into<String>) -> Result<()> {
        self.check(guard_id)?;
        if !self.key.is_empty() {
            return Err(Error::InvalidValueVariant(
                "key is immutable after first assignment",
            ));
        }
        self.key = key.into();
        Ok(())
    }

    /// Set `CreatedAt`, defaulting to `now()` if `at` is `None`.
    pub fn set_created_at(&mut self, guard_id: GuardId, at: Option<Timestamp>) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.created_at = at.unwrap_or_else(now);
        Ok(())
    }

    /// Set `UpdatedAt`, defaulting to `now()` if `at` is `None`. Named
    /// `set_modified_at` to match `spec.md` §4.2's public operation list.
    pub fn set_modified_at(&mut self, guard_id: GuardId, at: Option<Timestamp>) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.updated_at = at.unwrap_or_else(now);
        Ok(())
    }

    /// Set `ExpiredAt`. `0` means "never expires".
    pub fn set_expiration_time(&mut self, guard_id: GuardId, at: Timestamp) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.expired_at = at;
        Ok(())
    }

    /// Set `CreatedBy`.
    pub fn set_created_by(&mut self, guard_id: GuardId, by: impl Into<String>) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.created_by = by.into();
        Ok(())
    }

    /// Set `UpdatedBy`.
    pub fn set_updated_by(&mut self, guard_id: GuardId, by: impl Into<String>) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.updated_by = by.into();
        Ok(())
    }

    // -- deletion --------------------------------------------------------

    /// Mark this Treasure as shadow-deleted: sets `DeletedAt`/`DeletedBy`
    /// and clears the value, turning it into a tombstone (`spec.md` §3.2
    /// invariant ii).
    pub fn shadow_delete(&mut self, guard_id: GuardId, by: impl Into<String>) -> Result<()> {
        self.check(guard_id)?;
        self.metadata.deleted_at = now();
        self.metadata.deleted_by = by.into();
        self.value = None;
        Ok(())
    }

    /// Prepare the record body for deletion without stamping metadata —
    /// used by the Chronicler when folding a DELETE log entry into an
    /// already-decoded Treasure during replay.
    pub fn body_set_for_deletion(&mut self, guard_id: GuardId) -> Result<()> {
        self.check(guard_id)?;
        self.value = None;
        Ok(())
    }

    // -- accessors ---------------------------------------------------------

    /// The Treasure's key.
    pub fn get_key(&self) -> &str {
        &self.key
    }

    /// `DeletedAt`, `0` if not deleted.
    pub fn get_deleted_at(&self) -> Timestamp {
        self.metadata.deleted_at
    }

    /// The V1 back-reference file name, if this record was loaded from a
    /// legacy chunk file.
    pub fn get_file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Read-only access to the value, if any (`None` for a tombstone).
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Read-only access to metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether this record is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.metadata.is_tombstone()
    }

    /// Whether `ExpiredAt` has passed relative to `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.metadata.is_expired_at(now)
    }

    // -- conversion ----------------------------------------------------

    /// Deep-clone the Treasure's content (value + metadata + key) into a
    /// fresh Treasure with its own, newly-`Idle` guard — this is how a
    /// Treasure crosses the Beacon boundary for mutation by external code
    /// (`spec.md` §3.6).
    pub fn clone_content(&self, guard_id: GuardId) -> Result<Treasure> {
        self.check(guard_id)?;
        Ok(Treasure {
            key: self.key.clone(),
            value: self.value.clone(),
            metadata: self.metadata.clone(),
            file_name: self.file_name.clone(),
            guard: Guard::new(),
        })
    }

    /// Encode the full Treasure (value tag, value, metadata, deletion
    /// flags) into the compact byte stream stored as a Chronicler entry's
    /// `data` payload (`spec.md` §4.2, §6).
    pub fn to_bytes(&self, guard_id: GuardId) -> Result<Vec<u8>> {
        self.check(guard_id)?;
        let mut out = Vec::new();
        write_string(&mut out, &self.key);
        out.write_u8(if self.is_tombstone() { 1 } else { 0 })
            .map_err(io_encode_err)?;
        match &self.value {
            None => out.write_u8(0).map_err(io_encode_err)?,
            Some(v) => {
                out.write_u8(v.type_tag()).map_err(io_encode_err)?;
                encode_value(&mut out, v)?;
            }
        }
        out.write_i64::<LittleEndian>(self.metadata.created_at)
            .map_err(io_encode_err)?;
        write_string(&mut out, &self.metadata.created_by);
        out.write_i64::<LittleEndian>(self.metadata.updated_at)
            .map_err(io_encode_err)?;
        write_string(&mut out, &self.metadata.updated_by);
        out.write_i64::<LittleEndian>(self.metadata.expired_at)
            .map_err(io_encode_err)?;
        out.write_i64::<LittleEndian>(self.metadata.deleted_at)
            .map_err(io_encode_err)?;
        write_string(&mut out, &self.metadata.deleted_by);
        Ok(out)
    }

    /// Reverse of [`Treasure::to_bytes`]. `guard_id` is accepted for
    /// signature symmetry with `to_bytes` (both are listed together under
    /// "conversion" in `spec.md` §4.2) but is not checked against any
    /// pre-existing guard: the decoded Treasure does not exist yet, so
    /// there is nothing for the caller to have already acquired a guard
    /// on. `file_name`, when present, is stamped as the V1 back-reference.
    pub fn from_bytes(_guard_id: GuardId, data: &[u8], file_name: Option<String>) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let key = read_string(&mut cur)?;
        let tombstone = cur.read_u8().map_err(io_decode_err)? != 0;
        let type_tag = cur.read_u8().map_err(io_decode_err)?;
        let value = if type_tag == 0 {
            None
        } else {
            Some(decode_value(&mut cur, type_tag)?)
        };
        let created_at = cur.read_i64::<LittleEndian>().map_err(io_decode_err)?;
        let created_by = read_string(&mut cur)?;
        let updated_at = cur.read_i64::<LittleEndian>().map_err(io_decode_err)?;
        let updated_by = read_string(&mut cur)?;
        let expired_at = cur.read_i64::<LittleEndian>().map_err(io_decode_err)?;
        let deleted_at = cur.read_i64::<LittleEndian>().map_err(io_decode_err)?;
        let deleted_by = read_string(&mut cur)?;

        if tombstone && value.is_some() {
            return Err(Error::DecodeError(
                "tombstone entry carried a value".to_string(),
            ));
        }

        Ok(Treasure {
            key,
            value,
            metadata: Metadata {
                created_at,
                created_by,
                updated_at,
                updated_by,
                expired_at,
                deleted_at,
                deleted_by,
            },
            file_name,
            guard: Guard::new(),
        })
    }
}

fn io_encode_err(e: std::io::Error) -> Error {
    Error::EncodeError(e.to_string())
}

fn io_decode_err(e: std::io::Error) -> Error {
    Error::DecodeError(e.to_string())
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.write_u32::<LittleEndian>(bytes.len() as u32).unwrap();
    out.extend_from_slice(bytes);
}

fn read_string(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cur.read_u32::<LittleEndian>().map_err(io_decode_err)? as usize;
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf).map_err(io_decode_err)?;
    String::from_utf8(buf).map_err(|e| Error::DecodeError(e.to_string()))
}

fn encode_value(out: &mut Vec<u8>, v: &Value) -> Result<()> {
    match v {
        Value::Int8(n) => out.write_i8(*n).map_err(io_encode_err),
        Value::Int16(n) => out.write_i16::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Int32(n) => out.write_i32::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Int64(n) => out.write_i64::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Uint8(n) => out.write_u8(*n).map_err(io_encode_err),
        Value::Uint16(n) => out.write_u16::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Uint32(n) => out.write_u32::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Uint64(n) => out.write_u64::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Float32(n) => out.write_f32::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Float64(n) => out.write_f64::<LittleEndian>(*n).map_err(io_encode_err),
        Value::Bool(b) => {
            let tag = match b {
                TriBool::True => 1u8,
                TriBool::False => 2u8,
                TriBool::Unset => 0u8,
            };
            out.write_u8(tag).map_err(io_encode_err)
        }
        Value::String(s) => {
            write_string(out, s);
            Ok(())
        }
        Value::Bytes(b) => {
            out.write_u32::<LittleEndian>(b.len() as u32)
                .map_err(io_encode_err)?;
            out.extend_from_slice(b);
            Ok(())
        }
        Value::Uint32Slice(v) => {
            out.write_u32::<LittleEndian>(v.len() as u32)
                .map_err(io_encode_err)?;
            for n in v {
                out.write_u32::<LittleEndian>(*n).map_err(io_encode_err)?;
            }
            Ok(())
        }
    }
}

fn decode_value(cur: &mut Cursor<&[u8]>, type_tag: u8) -> Result<Value> {
    Ok(match type_tag {
        1 => Value::Int8(cur.read_i8().map_err(io_decode_err)?),
        2 => Value::Int16(cur.read_i16::<LittleEndian>().map_err(io_decode_err)?),
        3 => Value::Int32(cur.read_i32::<LittleEndian>().map_err(io_decode_err)?),
        4 => Value::Int64(cur.read_i64::<LittleEndian>().map_err(io_decode_err)?),
        5 => Value::Uint8(cur.read_u8().map_err(io_decode_err)?),
        6 => Value::Uint16(cur.read_u16::<LittleEndian>().map_err(io_decode_err)?),
        7 => Value::Uint32(cur.read_u32::<LittleEndian>().map_err(io_decode_err)?),
        8 => Value::Uint64(cur.read_u64::<LittleEndian>().map_err(io_decode_err)?),
        9 => Value::Float32(cur.read_f32::<LittleEndian>().map_err(io_decode_err)?),
        10 => Value::Float64(cur.read_f64::<LittleEndian>().map_err(io_decode_err)?),
        11 => {
            let tag = cur.read_u8().map_err(io_decode_err)?;
            Value::Bool(match tag {
                1 => TriBool::True,
                2 => TriBool::False,
                _ => TriBool::Unset,
            })
        }
        12 => Value::String(read_string(cur)?),
        13 => {
            let len = cur.read_u32::<LittleEndian>().map_err(io_decode_err)? as usize;
            let mut buf = vec![0u8; len];
            cur.read_exact(&mut buf).map_err(io_decode_err)?;
            Value::Bytes(buf)
        }
        14 => {
            let len = cur.read_u32::<LittleEndian>().map_err(io_decode_err)? as usize;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.read_u32::<LittleEndian>().map_err(io_decode_err)?);
            }
            Value::Uint32Slice(v)
        }
        other => {
            return Err(Error::DecodeError(format!(
                "unknown value type tag {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_string_value() {
        let mut t = Treasure::new("persistent-key");
        let id = t.start_guard(true, "test");
        t.set_string(id, "persistent-content").unwrap();
        t.set_created_at(id, Some(1000)).unwrap();
        t.set_created_by(id, "tester").unwrap();
        t.release_guard(id);

        let encode_id = t.start_guard(true, "encode");
        let bytes = t.to_bytes(encode_id).unwrap();
        t.release_guard(encode_id);

        let decoded = Treasure::from_bytes(1, &bytes, None).unwrap();
        assert_eq!(decoded.get_key(), "persistent-key");
        assert_eq!(
            decoded.value(),
            Some(&Value::String("persistent-content".to_string()))
        );
        assert_eq!(decoded.metadata().created_at, 1000);
        assert_eq!(decoded.metadata().created_by, "tester");
        assert!(!decoded.is_tombstone());
    }

    #[test]
    fn round_trip_every_numeric_variant() {
        let cases: Vec<(fn(&mut Treasure, GuardId) -> Result<()>, Value)> = vec![
            (|t, id| t.set_int8(id, -5), Value::Int8(-5)),
            (|t, id| t.set_int16(id, -500), Value::Int16(-500)),
            (|t, id| t.set_int32(id, -70000), Value::Int32(-70000)),
            (|t, id| t.set_int64(id, -5_000_000_000), Value::Int64(-5_000_000_000)),
            (|t, id| t.set_uint8(id, 5), Value::Uint8(5)),
            (|t, id| t.set_uint16(id, 500), Value::Uint16(500)),
            (|t, id| t.set_uint32(id, 70000), Value::Uint32(70000)),
            (|t, id| t.set_uint64(id, 5_000_000_000), Value::Uint64(5_000_000_000)),
            (|t, id| t.set_float64(id, std::f64::consts::PI), Value::Float64(std::f64::consts::PI)),
        ];
        for (setter, expected) in cases {
            let mut t = Treasure::new("k");
            let id = t.start_guard(true, "test");
            setter(&mut t, id).unwrap();
            let bytes = t.to_bytes(id).unwrap();
            t.release_guard(id);
            let decoded = Treasure::from_bytes(1, &bytes, None).unwrap();
            assert_eq!(decoded.value(), Some(&expected));
        }
    }

    #[test]
    fn guard_violation_without_guard_id() {
        let mut t = Treasure::new("k");
        let id = t.start_guard(true, "test");
        t.release_guard(id);
        // `id` is now stale.
        assert!(matches!(
            t.set_string(id, "x"),
            Err(Error::GuardViolation(_))
        ));
    }

    #[test]
    fn shadow_delete_clears_value_and_stamps_metadata() {
        let mut t = Treasure::new("k");
        let id = t.start_guard(true, "test");
        t.set_string(id, "v").unwrap();
        t.shadow_delete(id, "tester").unwrap();
        assert!(t.is_tombstone());
        assert!(t.value().is_none());
        assert_eq!(t.metadata().deleted_by, "tester");
    }

    #[test]
    fn key_is_immutable_after_first_assignment() {
        let mut t = Treasure::new("k");
        let id = t.start_guard(true, "test");
        assert!(t.set_key(id, "k2").is_err());
    }
}
