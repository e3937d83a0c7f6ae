//! Sort dimensions and the ordered-view pagination cursor (`spec.md` §4.3).

/// Which field the Beacon's auxiliary ordered view is currently sorted by.
/// `Direction` is tracked alongside so `shift_expired` knows which end of
/// the ordered view to shift from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDimension {
    Key,
    CreatedAt,
    UpdatedAt,
    ExpiredAt,
    ValueInt8,
    ValueInt16,
    ValueInt32,
    ValueInt64,
    ValueUint8,
    ValueUint16,
    ValueUint32,
    ValueUint64,
    ValueFloat32,
    ValueFloat64,
    ValueString,
}

/// Sort direction for the currently active [`SortDimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A pagination cursor over the Beacon's ordered view (`spec.md` §4.3).
///
/// `from_time`/`to_time` only constrain the scan when the active sort
/// dimension is `CreatedAt`, `UpdatedAt`, or `ExpiredAt`; otherwise they
/// are ignored. `limit == 0` means unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPosition {
    pub from: usize,
    pub limit: usize,
    pub from_time: Option<i64>,
    pub to_time: Option<i64>,
}

impl OrderPosition {
    /// Convenience constructor for an unbounded, unwindowed page starting
    /// at `from` with at most `limit` results (`0` for unlimited).
    pub fn new(from: usize, limit: usize) -> Self {
        OrderPosition {
            from,
            limit,
            from_time: None,
            to_time: None,
        }
    }

    /// Restrict the scan to the `[from_time, to_time]` window; only takes
    /// effect against a time-based sort dimension.
    pub fn with_time_window(mut self, from_time: Option<i64>, to_time: Option<i64>) -> Self {
        self.from_time = from_time;
        self.to_time = to_time;
        self
    }
}
