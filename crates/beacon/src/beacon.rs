//! The in-memory per-Swamp index (`spec.md` §3.3, §4.3).

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use hydraide_core::{GuardId, Timestamp, Treasure, Value};

use crate::error::{Error, Result};
use crate::order::{Direction, OrderPosition, SortDimension};

/// A sortable projection of a single Treasure's field, used while rebuilding
/// the ordered view. Kept as a small closed set of variants rather than a
/// generic so that [`compare`] can apply the NaN-last rule for floats.
enum SortKey {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
}

fn compare(a: &SortKey, b: &SortKey, asc: bool) -> Ordering {
    match (a, b) {
        (SortKey::Str(x), SortKey::Str(y)) => {
            let c = x.cmp(y);
            if asc {
                c
            } else {
                c.reverse()
            }
        }
        (SortKey::I64(x), SortKey::I64(y)) => {
            let c = x.cmp(y);
            if asc {
                c
            } else {
                c.reverse()
            }
        }
        (SortKey::U64(x), SortKey::U64(y)) => {
            let c = x.cmp(y);
            if asc {
                c
            } else {
                c.reverse()
            }
        }
        (SortKey::F64(x), SortKey::F64(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let c = x.partial_cmp(y).unwrap();
                if asc {
                    c
                } else {
                    c.reverse()
                }
            }
        },
        _ => Ordering::Equal,
    }
}

fn extract(dim: SortDimension, t: &Treasure) -> Option<SortKey> {
    match dim {
        SortDimension::Key => Some(SortKey::Str(t.get_key().to_string())),
        SortDimension::CreatedAt => Some(SortKey::I64(t.metadata().created_at)),
        SortDimension::UpdatedAt => Some(SortKey::I64(t.metadata().updated_at)),
        SortDimension::ExpiredAt => Some(SortKey::I64(t.metadata().expired_at)),
        SortDimension::ValueInt8 => match t.value() {
            Some(Value::Int8(n)) => Some(SortKey::I64(*n as i64)),
            _ => None,
        },
        SortDimension::ValueInt16 => match t.value() {
            Some(Value::Int16(n)) => Some(SortKey::I64(*n as i64)),
            _ => None,
        },
        SortDimension::ValueInt32 => match t.value() {
            Some(Value::Int32(n)) => Some(SortKey::I64(*n as i64)),
            _ => None,
        },
        SortDimension::ValueInt64 => match t.value() {
            Some(Value::Int64(n)) => Some(SortKey::I64(*n)),
            _ => None,
        },
        SortDimension::ValueUint8 => match t.value() {
            Some(Value::Uint8(n)) => Some(SortKey::U64(*n as u64)),
            _ => None,
        },
        SortDimension::ValueUint16 => match t.value() {
            Some(Value::Uint16(n)) => Some(SortKey::U64(*n as u64)),
            _ => None,
        },
        SortDimension::ValueUint32 => match t.value() {
            Some(Value::Uint32(n)) => Some(SortKey::U64(*n as u64)),
            _ => None,
        },
        SortDimension::ValueUint64 => match t.value() {
            Some(Value::Uint64(n)) => Some(SortKey::U64(*n)),
            _ => None,
        },
        SortDimension::ValueFloat32 => match t.value() {
            Some(Value::Float32(n)) => Some(SortKey::F64(*n as f64)),
            _ => None,
        },
        SortDimension::ValueFloat64 => match t.value() {
            Some(Value::Float64(n)) => Some(SortKey::F64(*n)),
            _ => None,
        },
        SortDimension::ValueString => match t.value() {
            Some(Value::String(s)) => Some(SortKey::Str(s.clone())),
            _ => None,
        },
    }
}

/// Holds the live contents of exactly one Swamp: a primary key→Treasure
/// index, an initialized flag, and an optional ordered view over one sort
/// dimension at a time (`spec.md` §3.3).
pub struct Beacon {
    primary: FxHashMap<String, Treasure>,
    insertion_order: Vec<String>,
    initialized: bool,
    is_ordered: bool,
    order: Vec<String>,
    sort: Option<(SortDimension, Direction)>,
    order_dirty: bool,
}

impl Beacon {
    pub fn new() -> Self {
        Beacon {
            primary: FxHashMap::default(),
            insertion_order: Vec::new(),
            initialized: false,
            is_ordered: false,
            order: Vec::new(),
            sort: None,
            order_dirty: true,
        }
    }

    pub fn set_initialized(&mut self, b: bool) {
        self.initialized = b;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Toggles whether the auxiliary ordered view is maintained. Disabling
    /// it does not clear any already-computed order; re-enabling simply
    /// resumes paying the rebuild cost on the next mutation.
    pub fn set_is_ordered(&mut self, b: bool) {
        self.is_ordered = b;
        if !b {
            self.sort = None;
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    /// Whether the active ordered view (if any) is sorted by `ExpiredAt`,
    /// in either direction — the precondition `shift_expired` checks.
    pub fn is_ordered_by_expiry(&self) -> bool {
        matches!(self.sort, Some((SortDimension::ExpiredAt, _)))
    }

    fn require_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Insert if absent, otherwise overwrite in the primary index;
    /// invalidates the ordered view.
    pub fn add(&mut self, treasure: Treasure) -> Result<()> {
        self.require_initialized()?;
        let key = treasure.get_key().to_string();
        if self.primary.insert(key.clone(), treasure).is_none() {
            self.insertion_order.push(key);
        }
        self.order_dirty = true;
        Ok(())
    }

    /// Bulk insert, single rebuild of the ordered view.
    pub fn push_many_from_map(&mut self, map: FxHashMap<String, Treasure>) -> Result<()> {
        self.require_initialized()?;
        for (key, treasure) in map {
            if self.primary.insert(key.clone(), treasure).is_none() {
                self.insertion_order.push(key);
            }
        }
        self.order_dirty = true;
        self.refresh_order_if_needed()?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<&Treasure>> {
        self.require_initialized()?;
        Ok(self.primary.get(key))
    }

    pub fn is_exists(&self, key: &str) -> Result<bool> {
        self.require_initialized()?;
        Ok(self.primary.contains_key(key))
    }

    /// Number of live Treasures currently held. Unlike the other query
    /// operations this does not require `is_initialized()`, since it is a
    /// plain accessor with a well-defined answer (`0`) on a fresh or
    /// just-reset Beacon.
    pub fn count(&self) -> usize {
        self.primary.len()
    }

    /// Tears the Beacon down to a blank, uninitialized state: clears the
    /// primary index and ordered view and resets `is_initialized()` to
    /// `false`. Used during idle eviction (`spec.md` §4.6).
    pub fn reset(&mut self) {
        self.primary.clear();
        self.insertion_order.clear();
        self.order.clear();
        self.sort = None;
        self.order_dirty = true;
        self.initialized = false;
    }

    /// Removes from the primary index and the ordered view.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.require_initialized()?;
        if self.primary.remove(key).is_none() {
            return Err(Error::KeyNotFound(key.to_string()));
        }
        self.insertion_order.retain(|k| k != key);
        self.order.retain(|k| k != key);
        Ok(())
    }

    /// Remove and return a single Treasure.
    pub fn shift_one(&mut self, key: &str) -> Result<Option<Treasure>> {
        self.require_initialized()?;
        let removed = self.primary.remove(key);
        if removed.is_some() {
            self.insertion_order.retain(|k| k != key);
            self.order.retain(|k| k != key);
        }
        Ok(removed)
    }

    /// Remove up to `n` arbitrary Treasures.
    pub fn shift_many(&mut self, n: usize) -> Result<Vec<Treasure>> {
        self.require_initialized()?;
        let keys: Vec<String> = self.primary.keys().take(n).cloned().collect();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(t) = self.primary.remove(&key) {
                out.push(t);
            }
            self.insertion_order.retain(|k| k != &key);
            self.order.retain(|k| k != &key);
        }
        Ok(out)
    }

    /// Returns a deep-cloned list of every live Treasure; if `reset` is
    /// true the Beacon is cleared afterwards.
    pub fn clone_unordered_treasures(&mut self, reset: bool) -> Result<Vec<Treasure>> {
        self.require_initialized()?;
        let mut out = Vec::with_capacity(self.primary.len());
        for t in self.primary.values() {
            out.push(clone_treasure(t)?);
        }
        if reset {
            self.primary.clear();
            self.insertion_order.clear();
            self.order.clear();
            self.order_dirty = true;
        }
        Ok(out)
    }

    fn apply_sort(&mut self, dim: SortDimension, asc: bool) -> Result<()> {
        self.require_initialized()?;
        let mut entries: Vec<(String, SortKey)> = self
            .primary
            .values()
            .filter(|t| !t.is_tombstone())
            .filter_map(|t| extract(dim, t).map(|sk| (t.get_key().to_string(), sk)))
            .collect();
        if entries.is_empty() {
            return Err(Error::SortTypeMismatch);
        }
        entries.sort_by(|a, b| compare(&a.1, &b.1, asc).then_with(|| a.0.cmp(&b.0)));
        self.order = entries.into_iter().map(|(k, _)| k).collect();
        self.sort = Some((dim, if asc { Direction::Asc } else { Direction::Desc }));
        self.order_dirty = false;
        self.is_ordered = true;
        Ok(())
    }

    fn refresh_order_if_needed(&mut self) -> Result<()> {
        if !self.order_dirty {
            return Ok(());
        }
        match self.sort {
            Some((dim, dir)) => self.apply_sort(dim, dir == Direction::Asc),
            None => {
                self.order = self
                    .insertion_order
                    .iter()
                    .filter(|k| {
                        self.primary
                            .get(k.as_str())
                            .map(|t| !t.is_tombstone())
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                self.order_dirty = false;
                Ok(())
            }
        }
    }

    /// Requires the Beacon to be sorted by `ExpiredAt`. Removes up to `n`
    /// Treasures whose `ExpiredAt` is non-zero and `<= now`, shifting from
    /// the end matching the active sort direction.
    pub fn shift_expired(&mut self, n: usize, now: Timestamp) -> Result<Vec<Treasure>> {
        self.require_initialized()?;
        let (dim, dir) = self.sort.ok_or(Error::NotSortedByExpiry)?;
        if dim != SortDimension::ExpiredAt {
            return Err(Error::NotSortedByExpiry);
        }
        self.refresh_order_if_needed()?;

        let mut out = Vec::new();
        while out.len() < n {
            let candidate_key = match dir {
                Direction::Asc => self.order.first().cloned(),
                Direction::Desc => self.order.last().cloned(),
            };
            let Some(key) = candidate_key else { break };
            let expired = self
                .primary
                .get(&key)
                .map(|t| t.metadata().expired_at > 0 && t.metadata().expired_at <= now)
                .unwrap_or(false);
            if !expired {
                break;
            }
            match dir {
                Direction::Asc => self.order.remove(0),
                Direction::Desc => self.order.pop().unwrap(),
            };
            self.insertion_order.retain(|k| k != &key);
            if let Some(t) = self.primary.remove(&key) {
                out.push(t);
            }
        }
        if !out.is_empty() {
            tracing::debug!(count = out.len(), "shifted expired treasures out of beacon");
        }
        Ok(out)
    }

    /// Paginated scan over the ordered view with an optional time window.
    /// The window only applies when the active sort dimension is a
    /// timestamp field (`spec.md` §4.3).
    pub fn get_many_from_order_position(&mut self, pos: OrderPosition) -> Result<Vec<Treasure>> {
        self.require_initialized()?;
        self.refresh_order_if_needed()?;

        let windowed: Vec<&String> = if let Some((dim, _)) = self.sort {
            let time_dim = matches!(
                dim,
                SortDimension::CreatedAt | SortDimension::UpdatedAt | SortDimension::ExpiredAt
            );
            if time_dim && (pos.from_time.is_some() || pos.to_time.is_some()) {
                self.order
                    .iter()
                    .filter(|k| {
                        let Some(t) = self.primary.get(k.as_str()) else {
                            return false;
                        };
                        let ts = match dim {
                            SortDimension::CreatedAt => t.metadata().created_at,
                            SortDimension::UpdatedAt => t.metadata().updated_at,
                            SortDimension::ExpiredAt => t.metadata().expired_at,
                            _ => unreachable!(),
                        };
                        pos.from_time.map(|f| ts >= f).unwrap_or(true)
                            && pos.to_time.map(|t2| ts <= t2).unwrap_or(true)
                    })
                    .collect()
            } else {
                self.order.iter().collect()
            }
        } else {
            self.order.iter().collect()
        };

        if pos.from >= windowed.len() {
            return Ok(Vec::new());
        }
        let end = if pos.limit == 0 {
            windowed.len()
        } else {
            (pos.from + pos.limit).min(windowed.len())
        };

        let mut out = Vec::with_capacity(end - pos.from);
        for key in &windowed[pos.from..end] {
            if let Some(t) = self.primary.get(key.as_str()) {
                out.push(clone_treasure(t)?);
            }
        }
        Ok(out)
    }
}

impl Default for Beacon {
    fn default() -> Self {
        Self::new()
    }
}

fn clone_treasure(t: &Treasure) -> Result<Treasure> {
    let id: GuardId = t.start_guard(true, "beacon-clone");
    let cloned = t
        .clone_content(id)
        .map_err(|_| Error::KeyNotFound(t.get_key().to_string()));
    t.release_guard(id);
    cloned
}

macro_rules! sort_pair {
    ($asc:ident, $desc:ident, $dim:expr) => {
        impl Beacon {
            pub fn $asc(&mut self) -> Result<()> {
                self.apply_sort($dim, true)
            }
            pub fn $desc(&mut self) -> Result<()> {
                self.apply_sort($dim, false)
            }
        }
    };
}

sort_pair!(sort_by_key_asc, sort_by_key_desc, SortDimension::Key);
sort_pair!(
    sort_by_creation_time_asc,
    sort_by_creation_time_desc,
    SortDimension::CreatedAt
);
sort_pair!(
    sort_by_update_time_asc,
    sort_by_update_time_desc,
    SortDimension::UpdatedAt
);
sort_pair!(
    sort_by_expiration_time_asc,
    sort_by_expiration_time_desc,
    SortDimension::ExpiredAt
);
sort_pair!(
    sort_by_value_int8_asc,
    sort_by_value_int8_desc,
    SortDimension::ValueInt8
);
sort_pair!(
    sort_by_value_int16_asc,
    sort_by_value_int16_desc,
    SortDimension::ValueInt16
);
sort_pair!(
    sort_by_value_int32_asc,
    sort_by_value_int32_desc,
    SortDimension::ValueInt32
);
sort_pair!(
    sort_by_value_int64_asc,
    sort_by_value_int64_desc,
    SortDimension::ValueInt64
);
sort_pair!(
    sort_by_value_uint8_asc,
    sort_by_value_uint8_desc,
    SortDimension::ValueUint8
);
sort_pair!(
    sort_by_value_uint16_asc,
    sort_by_value_uint16_desc,
    SortDimension::ValueUint16
);
sort_pair!(
    sort_by_value_uint32_asc,
    sort_by_value_uint32_desc,
    SortDimension::ValueUint32
);
sort_pair!(
    sort_by_value_uint64_asc,
    sort_by_value_uint64_desc,
    SortDimension::ValueUint64
);
sort_pair!(
    sort_by_value_float32_asc,
    sort_by_value_float32_desc,
    SortDimension::ValueFloat32
);
sort_pair!(
    sort_by_value_float64_asc,
    sort_by_value_float64_desc,
    SortDimension::ValueFloat64
);
sort_pair!(
    sort_by_value_string_asc,
    sort_by_value_string_desc,
    SortDimension::ValueString
);
