//! Cursor-based keyset pagination
//!
//! ## Key Components
//! - [`cursor`] - opaque cursor codec
//! - [`Keyset`] - sort key extraction and ordering for one entity type
//! - [`KeysetSource`] - collections the paginator can fetch key windows from
//! - [`Paginator`] - produces [`Page`]s, in standard or wrap-around mode
//! - [`PageRequest`] - validated cursor and page size, extracted from the query string
//!
//! ## Usage Example
//! ```ignore
//! let source = MemorySource::new(posts, Chronological);
//! let request = PageRequest::first(20).descending();
//!
//! let page = Paginator::default()
//!     .paginate(&source, &Chronological, &request)
//!     .await?;
//! ```

pub mod cursor;
pub mod key;
pub mod page;
pub mod paginator;
pub mod request;
pub mod source;

pub use cursor::{CursorCodec, CursorError};
pub use key::{
    Chronological, CursorKey, Direction, KeyFn, Keyset, KeysetExt, Timestamped, TimestampedKey,
};
pub use page::Page;
pub use paginator::{CursorPolicy, PaginationError, PaginationMode, Paginator};
pub use request::PageRequest;
pub use source::{KeyWindow, KeysetSource, MemorySource};
