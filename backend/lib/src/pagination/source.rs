//! Data sources the paginator can read from
//!
//! A source answers one kind of question: "give me at most `limit` items
//! strictly beyond this key, in this order". The PostgreSQL repository answers
//! it with `WHERE`/`ORDER BY`/`LIMIT`; [`MemorySource`] answers it over a
//! vector using the entity's [`Keyset`].

use std::cmp::Ordering;

use async_trait::async_trait;

use super::key::{CursorKey, Direction, Keyset, KeysetExt};
use crate::data::error::RepositoryResult;

/// Bounds, order and size of a single fetch
///
/// * `after`: only items strictly beyond this key in traversal order
/// * `until`: only items strictly before this key in traversal order
/// * `direction`: traversal order of the returned items
/// * `limit`: maximum number of items to return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWindow<K> {
    pub after: Option<K>,
    pub until: Option<K>,
    pub direction: Direction,
    pub limit: usize,
}

impl<K: CursorKey> KeyWindow<K> {
    pub fn new(direction: Direction, limit: usize) -> Self {
        Self {
            after: None,
            until: None,
            direction,
            limit,
        }
    }

    pub fn after(mut self, key: K) -> Self {
        self.after = Some(key);
        self
    }

    pub fn until(mut self, key: K) -> Self {
        self.until = Some(key);
        self
    }

    /// Whether `key` lies inside the window bounds
    pub fn admits(&self, key: &K) -> bool {
        let beyond_after = self.after.as_ref().map_or(true, |after| {
            self.direction.apply(key.cmp(after)) == Ordering::Greater
        });
        let before_until = self.until.as_ref().map_or(true, |until| {
            self.direction.apply(key.cmp(until)) == Ordering::Less
        });

        beyond_after && before_until
    }

    /// Applies the window to an in-memory collection
    pub fn select<T, S>(&self, items: impl IntoIterator<Item = T>, keyset: &S) -> Vec<T>
    where
        S: Keyset<T, Key = K>,
    {
        let mut selected: Vec<T> = items
            .into_iter()
            .filter(|item| self.admits(&keyset.key(item)))
            .collect();

        selected.sort_by(|a, b| keyset.compare_items(a, b, self.direction));
        selected.truncate(self.limit);
        selected
    }
}

/// A filterable, orderable collection the paginator can fetch windows from
#[async_trait]
pub trait KeysetSource: Send + Sync {
    type Item: Send;
    type Key: CursorKey;

    /// Returns the items inside `window`, ordered by `window.direction`
    async fn fetch(&self, window: KeyWindow<Self::Key>) -> RepositoryResult<Vec<Self::Item>>;
}

/// Source over an owned snapshot of items
pub struct MemorySource<T, S> {
    items: Vec<T>,
    keyset: S,
}

impl<T, S> MemorySource<T, S>
where
    S: Keyset<T>,
{
    pub fn new(items: Vec<T>, keyset: S) -> Self {
        Self { items, keyset }
    }

    pub fn keyset(&self) -> &S {
        &self.keyset
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds an item, as a concurrent writer would between two page requests
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
    }

    /// Removes every item whose key equals `key`
    pub fn remove(&mut self, key: &S::Key) {
        let keyset = &self.keyset;
        self.items
            .retain(|item| keyset.key(item) != *key);
    }
}

#[async_trait]
impl<T, S> KeysetSource for MemorySource<T, S>
where
    T: Clone + Send + Sync,
    S: Keyset<T>,
{
    type Item = T;
    type Key = S::Key;

    async fn fetch(&self, window: KeyWindow<S::Key>) -> RepositoryResult<Vec<T>> {
        Ok(window.select(self.items.iter().cloned(), &self.keyset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::key::KeyFn;

    fn numbers() -> MemorySource<i64, KeyFn<fn(&i64) -> i64, i64>> {
        MemorySource::new(vec![3, 1, 5, 2, 4], KeyFn::new((|n: &i64| *n) as fn(&i64) -> i64))
    }

    #[test]
    fn window_bounds_are_exclusive() {
        let window = KeyWindow::new(Direction::Ascending, 10).after(2_i64).until(5);

        assert!(!window.admits(&2));
        assert!(window.admits(&3));
        assert!(window.admits(&4));
        assert!(!window.admits(&5));
    }

    #[test]
    fn descending_window_flips_bounds() {
        let window = KeyWindow::new(Direction::Descending, 10).after(5_i64).until(2);

        assert!(!window.admits(&5));
        assert!(window.admits(&4));
        assert!(window.admits(&3));
        assert!(!window.admits(&2));
        assert!(!window.admits(&6));
    }

    #[tokio::test]
    async fn memory_source_orders_and_limits() {
        let source = numbers();

        let ascending = source
            .fetch(KeyWindow::new(Direction::Ascending, 3))
            .await
            .unwrap();
        assert_eq!(ascending, vec![1, 2, 3]);

        let descending = source
            .fetch(KeyWindow::new(Direction::Descending, 2).after(4))
            .await
            .unwrap();
        assert_eq!(descending, vec![3, 2]);
    }

    #[tokio::test]
    async fn memory_source_remove_drops_matching_keys() {
        let mut source = numbers();
        source.remove(&3);

        let all = source
            .fetch(KeyWindow::new(Direction::Ascending, 10))
            .await
            .unwrap();
        assert_eq!(all, vec![1, 2, 4, 5]);
        assert_eq!(source.len(), 4);
    }
}
