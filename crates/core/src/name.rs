//! Name & Island hash (component A).
//!
//! A [`Name`] is the three-segment address of a Swamp: Sanctuary, Realm,
//! Swamp. Its canonical form is a single path-joined string, and its
//! deterministic hash (`xxhash64`) drives both Island routing and the
//! on-disk folder layout described in `spec.md` §3.1 and §6.

use crate::error::{Error, Result};
use xxhash_rust::xxh64::xxh64;

/// Per-segment size limit (1 KiB), per `spec.md` §4.1.
const MAX_SEGMENT_BYTES: usize = 1024;

/// Fixed xxhash64 seed. Changing this would silently re-route every
/// existing Swamp, so it is a compile-time constant, not configuration.
const HASH_SEED: u64 = 0;

/// A Swamp's hierarchical three-part name: Sanctuary / Realm / Swamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    sanctuary: String,
    realm: String,
    swamp: String,
}

impl Name {
    /// Construct a Name, validating each segment per `spec.md` §4.1:
    /// non-empty, free of path separators, and no more than 1 KiB.
    pub fn new(
        sanctuary: impl Into<String>,
        realm: impl Into<String>,
        swamp: impl Into<String>,
    ) -> Result<Self> {
        let sanctuary = sanctuary.into();
        let realm = realm.into();
        let swamp = swamp.into();
        validate_segment(&sanctuary)?;
        validate_segment(&realm)?;
        validate_segment(&swamp)?;
        Ok(Name {
            sanctuary,
            realm,
            swamp,
        })
    }

    /// The Sanctuary segment.
    pub fn sanctuary(&self) -> &str {
        &self.sanctuary
    }

    /// The Realm segment.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// The Swamp segment.
    pub fn swamp(&self) -> &str {
        &self.swamp
    }

    /// The canonical form: `sanctuary/realm/swamp`, the exact string hashed
    /// for routing and folder placement (`spec.md` §6).
    pub fn canonical(&self) -> String {
        format!("{}/{}/{}", self.sanctuary, self.realm, self.swamp)
    }

    /// `xxhash64(canonical)`, used both for Island routing and for the
    /// `swamp_hashhex` folder segment.
    pub fn hash(&self) -> u64 {
        xxh64(self.canonical().as_bytes(), HASH_SEED)
    }

    /// `1 + ((hash >> 32) mod all_islands)`. Upper bits are used for the
    /// modulo so that Island assignment decorrelates from the low bits used
    /// for hex-prefix bucketing in [`folder_path`].
    ///
    /// # Panics
    ///
    /// Panics if `all_islands` is zero; the spec requires `all_islands > 0`
    /// as a one-time init invariant the embedder is responsible for.
    pub fn island_id(&self, all_islands: u64) -> u64 {
        assert!(all_islands > 0, "all_islands must be > 0");
        1 + ((self.hash() >> 32) % all_islands)
    }

    /// The on-disk path beneath an island root:
    /// `hashhex[0..2]/hashhex[2..4]/swamp_hashhex.hyd`, per `spec.md` §3.1.
    pub fn folder_path(&self, island_id: u64) -> std::path::PathBuf {
        let hash_hex = format!("{:016x}", self.hash());
        std::path::PathBuf::from(island_id.to_string())
            .join(&hash_hex[0..2])
            .join(&hash_hex[2..4])
            .join(format!("{hash_hex}.hyd"))
    }

    /// The on-disk folder holding the legacy V1 chunk files for this Swamp:
    /// the same path as [`folder_path`] with the `.hyd` extension replaced
    /// by a bare directory, per `spec.md` §6.
    pub fn v1_folder_path(&self, island_id: u64) -> std::path::PathBuf {
        let hash_hex = format!("{:016x}", self.hash());
        std::path::PathBuf::from(island_id.to_string())
            .join(&hash_hex[0..2])
            .join(&hash_hex[2..4])
            .join(hash_hex)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::InvalidName {
            segment: segment.to_string(),
            reason: "segment must not be empty",
        });
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(Error::InvalidName {
            segment: segment.to_string(),
            reason: "segment must not contain path separators",
        });
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(Error::InvalidName {
            segment: segment.chars().take(32).collect(),
            reason: "segment exceeds 1 KiB",
        });
    }
    Ok(())
}
