use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use super::key::Direction;
use crate::{config::PaginationConfig, error::Error};

/// Resolved pagination parameters for a list endpoint
///
/// Values:
/// * `cursor`: opaque cursor returned by the previous page, `None` to start from the beginning
/// * `until`: opaque cursor the page must stop before, `None` to run to the end
/// * `page_size`: maximum number of items in the page, validated against [`PaginationConfig`]
/// * `direction`: traversal order, chosen by the endpoint rather than the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub until: Option<String>,
    pub page_size: usize,
    pub direction: Direction,
}

impl PageRequest {
    /// Builds a request after checking the page size against `config`
    pub fn new(
        cursor: Option<String>,
        page_size: usize,
        config: &PaginationConfig,
    ) -> Result<Self, Error> {
        if page_size < config.min_page_size || page_size > config.max_page_size {
            return Err(Error::BadRequest(format!(
                "pageSize must be between {} and {}",
                config.min_page_size, config.max_page_size
            )));
        }

        Ok(Self {
            cursor: cursor.filter(|cursor| !cursor.is_empty()),
            until: None,
            page_size,
            direction: Direction::default(),
        })
    }

    /// First page of `page_size` items, ascending
    ///
    /// Callers are trusted to pass a sane size; HTTP input goes through [`PageRequest::new`].
    pub fn first(page_size: usize) -> Self {
        Self {
            cursor: None,
            until: None,
            page_size,
            direction: Direction::default(),
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into()).filter(|cursor| !cursor.is_empty());
        self
    }

    /// Stops the page strictly before the key carried by `cursor`
    pub fn until(mut self, cursor: impl Into<String>) -> Self {
        self.until = Some(cursor.into()).filter(|cursor| !cursor.is_empty());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn descending(self) -> Self {
        self.with_direction(Direction::Descending)
    }
}

/// Pagination query parameters for list endpoints
///
/// Parameters:
/// * `cursor`: the `nextCursor` of the previous page (optional)
/// * `pageSize`: number of items per page (defaults to [`PaginationConfig::default_page_size`])
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    cursor: Option<String>,
    page_size: Option<usize>,
}

impl<S> FromRequestParts<S> for PageRequest
where
    PaginationConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;

        let config = PaginationConfig::from_ref(state);
        let page_size = query.page_size.unwrap_or(config.default_page_size);

        Self::new(query.cursor, page_size, &config)
    }
}
