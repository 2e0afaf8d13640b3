//! Sort keys, sort direction and the keyset comparator abstraction

use std::{cmp::Ordering, fmt, marker::PhantomData};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::pagination::COMPOSITE_KEY_SEPARATOR;

/// A totally ordered value that can be carried inside a cursor
pub trait CursorKey: Clone + Ord + fmt::Debug + Send + Sync + 'static {
    /// Human readable name of the key type, used in cursor errors
    const KIND: &'static str;

    /// Text form written into the cursor
    fn to_cursor_value(&self) -> String;

    /// Inverse of [`CursorKey::to_cursor_value`]
    fn parse_cursor_value(value: &str) -> Option<Self>;
}

impl CursorKey for i64 {
    const KIND: &'static str = "integer";

    fn to_cursor_value(&self) -> String {
        self.to_string()
    }

    fn parse_cursor_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl CursorKey for Uuid {
    const KIND: &'static str = "uuid";

    fn to_cursor_value(&self) -> String {
        self.hyphenated().to_string()
    }

    fn parse_cursor_value(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok()
    }
}

/// Composite `(timestamp, id)` key
///
/// Ordered by timestamp first; the id breaks ties so that two entities created
/// in the same instant still have a strict relative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampedKey {
    pub at: DateTime<Utc>,
    pub id: Uuid,
}

impl TimestampedKey {
    pub fn new(at: DateTime<Utc>, id: Uuid) -> Self {
        Self { at, id }
    }
}

impl CursorKey for TimestampedKey {
    const KIND: &'static str = "timestamp and id";

    fn to_cursor_value(&self) -> String {
        format!(
            "{}{}{}",
            self.at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            COMPOSITE_KEY_SEPARATOR,
            self.id.hyphenated()
        )
    }

    fn parse_cursor_value(value: &str) -> Option<Self> {
        let (at, id) = value.split_once(COMPOSITE_KEY_SEPARATOR)?;
        let at = DateTime::parse_from_rfc3339(at).ok()?.with_timezone(&Utc);
        let id = Uuid::parse_str(id).ok()?;

        Some(Self { at, id })
    }
}

/// Order in which a collection is traversed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Maps a natural key ordering onto traversal order
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Statically typed sort key extraction for one entity type
///
/// Every list endpoint hands one of these to the paginator together with its
/// source. Items are always ordered by the natural [`Ord`] of their key: the
/// SQL sources sort by the same `(created_at, id)` columns, so the in-memory
/// and PostgreSQL backends page identically. A different order needs a
/// different key type, not a different comparator.
pub trait Keyset<T>: Send + Sync {
    type Key: CursorKey;

    fn key(&self, item: &T) -> Self::Key;
}

/// Ordering helpers available on every [`Keyset`]
///
/// Blanket-implemented, so no keyset can change how its keys compare.
pub trait KeysetExt<T>: Keyset<T> {
    /// Orders two items in traversal order for the given direction
    fn compare_items(&self, a: &T, b: &T, direction: Direction) -> Ordering {
        direction.apply(self.key(a).cmp(&self.key(b)))
    }
}

impl<T, Ks: Keyset<T> + ?Sized> KeysetExt<T> for Ks {}

/// Keyset built from a key-extraction closure, using the key's natural order
pub struct KeyFn<F, K> {
    extract: F,
    _key: PhantomData<fn() -> K>,
}

impl<F, K> KeyFn<F, K> {
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            _key: PhantomData,
        }
    }
}

impl<T, F, K> Keyset<T> for KeyFn<F, K>
where
    F: Fn(&T) -> K + Send + Sync,
    K: CursorKey,
{
    type Key = K;

    fn key(&self, item: &T) -> K {
        (self.extract)(item)
    }
}

/// Entities ordered by the moment they were created
pub trait Timestamped {
    fn timestamped_key(&self) -> TimestampedKey;
}

/// Keyset over any [`Timestamped`] entity
#[derive(Debug, Clone, Copy, Default)]
pub struct Chronological;

impl<T: Timestamped> Keyset<T> for Chronological {
    type Key = TimestampedKey;

    fn key(&self, item: &T) -> TimestampedKey {
        item.timestamped_key()
    }
}
