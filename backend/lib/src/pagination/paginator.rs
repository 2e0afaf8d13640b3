//! Keyset paginator
//!
//! Produces one [`Page`] per call from a [`KeysetSource`], resuming strictly
//! after the key carried by the request cursor and, in standard mode, stopping
//! strictly before the key carried by the optional `until` cursor. Each call is a stateless
//! function of the source contents, the cursor, the page size and the
//! direction, so rows inserted or deleted between two calls never cause
//! duplicates or loops: the boundary is the decoded key value itself, not the
//! row it came from.
//!
//! Two modes exist:
//! - [`PaginationMode::Standard`]: stops at the end of the collection
//! - [`PaginationMode::WrapAround`]: fills a short last page with items from
//!   the start of the collection

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    cursor::{CursorCodec, CursorError},
    key::{CursorKey, Keyset, KeysetExt},
    page::Page,
    request::PageRequest,
    source::{KeyWindow, KeysetSource},
};
use crate::data::error::RepositoryError;

/// What to do with a cursor that cannot be decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorPolicy {
    /// Reject the request
    #[default]
    Strict,
    /// Ignore the cursor and serve the first page
    Lenient,
}

impl std::str::FromStr for CursorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown cursor policy: {other}")),
        }
    }
}

/// How the end of the collection is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// Stop at the end of the collection
    #[default]
    Standard,
    /// Cycle back to the start of the collection to fill a short page
    WrapAround,
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("Source error: {0}")]
    Source(#[from] RepositoryError),

    #[error("Pagination cancelled")]
    Cancelled,
}

/// Keyset paginator shared by every list endpoint
///
/// Holds the cursor policy and codec so that all endpoints built on the same
/// paginator issue and check cursors identically.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    policy: CursorPolicy,
    codec: CursorCodec,
}

impl Paginator {
    pub fn new(policy: CursorPolicy) -> Self {
        Self {
            policy,
            codec: CursorCodec::default(),
        }
    }

    /// Signs cursors with `codec` instead of the built-in secret
    pub fn with_codec(mut self, codec: CursorCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn policy(&self) -> CursorPolicy {
        self.policy
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Fetches the page described by `request`, stopping at the end of the collection
    pub async fn paginate<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        self.paginate_with_mode(source, keyset, request, PaginationMode::Standard)
            .await
    }

    /// Fetches the page described by `request`, wrapping to the start of the
    /// collection when fewer than `page_size` items remain
    pub async fn paginate_wrapping<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        self.paginate_with_mode(source, keyset, request, PaginationMode::WrapAround)
            .await
    }

    /// Same as [`Paginator::paginate_with_mode`], aborting when `token` is cancelled
    ///
    /// A cancelled call returns [`PaginationError::Cancelled`] and never a partial page.
    pub async fn paginate_cancellable<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
        mode: PaginationMode,
        token: &CancellationToken,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Pagination cancelled before completion");
                Err(PaginationError::Cancelled)
            }
            page = self.paginate_with_mode(source, keyset, request, mode) => page,
        }
    }

    pub async fn paginate_with_mode<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
        mode: PaginationMode,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        let boundary = self.resolve_boundary::<Src::Key>(request.cursor.as_deref())?;
        let limit = self.resolve_boundary::<Src::Key>(request.until.as_deref())?;

        debug!(
            page_size = request.page_size,
            direction = ?request.direction,
            ?mode,
            resumed = boundary.is_some(),
            bounded = limit.is_some(),
            "Paginating"
        );

        match mode {
            PaginationMode::Standard => {
                self.standard(source, keyset, request, boundary, limit)
                    .await
            }
            // the wrapped page spans the whole collection, so `until` does not apply
            PaginationMode::WrapAround => self.wrapping(source, keyset, request, boundary).await,
        }
    }

    /// Decodes the request cursor, applying the cursor policy on failure
    fn resolve_boundary<K: CursorKey>(
        &self,
        cursor: Option<&str>,
    ) -> Result<Option<K>, PaginationError> {
        let Some(cursor) = cursor.filter(|cursor| !cursor.is_empty()) else {
            return Ok(None);
        };

        match self.codec.decode_key::<K>(cursor) {
            Ok(key) => Ok(Some(key)),
            Err(error) => match self.policy {
                CursorPolicy::Strict => {
                    debug!(%error, "Rejecting invalid cursor");
                    Err(PaginationError::InvalidCursor(error))
                }
                CursorPolicy::Lenient => {
                    warn!(%error, "Ignoring invalid cursor, restarting from the first page");
                    Ok(None)
                }
            },
        }
    }

    async fn standard<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
        boundary: Option<Src::Key>,
        limit: Option<Src::Key>,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        // one extra row answers has-more without a second query
        let mut window = KeyWindow::new(request.direction, request.page_size + 1);
        if let Some(boundary) = boundary {
            window = window.after(boundary);
        }
        if let Some(limit) = limit {
            window = window.until(limit);
        }

        let mut items = source.fetch(window).await?;
        let has_more = items.len() > request.page_size;
        items.truncate(request.page_size);

        Ok(self.finish(items, keyset, has_more))
    }

    async fn wrapping<Src, Ks>(
        &self,
        source: &Src,
        keyset: &Ks,
        request: &PageRequest,
        boundary: Option<Src::Key>,
    ) -> Result<Page<Src::Item>, PaginationError>
    where
        Src: KeysetSource,
        Ks: Keyset<Src::Item, Key = Src::Key>,
    {
        let direction = request.direction;

        let mut window = KeyWindow::new(direction, request.page_size);
        if let Some(boundary) = boundary {
            window = window.after(boundary);
        }

        let mut items = source.fetch(window).await?;

        if !items.is_empty() && items.len() < request.page_size {
            let remaining = request.page_size - items.len();
            let first = keyset.key(&items[0]);

            let wrapped = source
                .fetch(KeyWindow::new(direction, remaining).until(first))
                .await?;

            debug!(wrapped = wrapped.len(), "Filled page from the start of the collection");

            items.extend(wrapped);
            items.sort_by(|a, b| keyset.compare_items(a, b, direction));
        }

        let has_more = match items.last() {
            Some(last) => !source
                .fetch(KeyWindow::new(direction, 1).after(keyset.key(last)))
                .await?
                .is_empty(),
            None => false,
        };

        Ok(self.finish(items, keyset, has_more))
    }

    fn finish<T, Ks>(&self, items: Vec<T>, keyset: &Ks, has_more: bool) -> Page<T>
    where
        Ks: Keyset<T>,
    {
        let next_cursor = items
            .last()
            .map(|last| self.codec.encode_key(&keyset.key(last)));

        Page::new(items, next_cursor, has_more)
    }
}
