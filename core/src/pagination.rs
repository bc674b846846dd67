//! Lazy traversal of paged endpoints.
//!
//! # Design
//! `Paginator` wraps a page-fetching closure and flattens pages into a
//! forward-only `Iterator<Item = Result<T, ApiError>>`. A page is only
//! requested when the consumer asks for an item past the buffered ones, so
//! dropping the iterator early never costs an extra round-trip. Iteration
//! ends after an empty page, after the page that reaches the reported total,
//! or after a page flagged `hasNext: false`. An error is yielded once and
//! ends the sequence. Restarting means building a new paginator, which
//! starts again at page zero.

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// Position of the next page to fetch. Page numbers are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageCursor {
    pub fn first(page_size: u32) -> Result<Self, ApiError> {
        if page_size == 0 {
            return Err(ApiError::validation("page size must be at least 1"));
        }
        Ok(Self {
            page_number: 0,
            page_size,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_number) * u64::from(self.page_size)
    }

    fn next(self) -> Self {
        Self {
            page_number: self.page_number + 1,
            ..self
        }
    }
}

/// One page of results as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: Option<u64>,
    pub has_next: Option<bool>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_count: None,
            has_next: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }
}

/// Names of the envelope fields carrying a page's items and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageShape {
    pub items_field: &'static str,
    pub total_field: Option<&'static str>,
    pub has_next_field: Option<&'static str>,
}

impl Default for PageShape {
    fn default() -> Self {
        Self {
            items_field: "results",
            total_field: Some("totalCount"),
            has_next_field: Some("hasNext"),
        }
    }
}

impl PageShape {
    /// Decode a page envelope. A missing or `null` items field is an empty
    /// page; a bare JSON array is accepted as the items themselves.
    pub fn decode<T: DeserializeOwned>(
        &self,
        status: u16,
        body: Value,
    ) -> Result<Page<T>, ApiError> {
        let (items, total_count, has_next) = match body {
            Value::Array(items) => (Value::Array(items), None, None),
            Value::Object(mut map) => {
                let total = self
                    .total_field
                    .and_then(|f| map.get(f))
                    .and_then(Value::as_u64);
                let has_next = self
                    .has_next_field
                    .and_then(|f| map.get(f))
                    .and_then(Value::as_bool);
                let items = map.remove(self.items_field).unwrap_or(Value::Null);
                (items, total, has_next)
            }
            Value::Null => (Value::Null, None, None),
            other => {
                return Err(ApiError::decode(
                    status,
                    "page envelope is not a JSON object",
                    other.to_string(),
                ))
            }
        };

        let items = match items {
            Value::Null => Vec::new(),
            items => {
                let raw = items.to_string();
                serde_json::from_value(items).map_err(|e| {
                    ApiError::decode(status, format!("page items could not be decoded: {e}"), raw)
                })?
            }
        };

        Ok(Page {
            items,
            total_count,
            has_next,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// More pages may be fetched once the buffer drains.
    Active,
    /// The buffered items are the last ones.
    LastPage,
    Done,
}

/// Iterator over every record of a paged endpoint.
pub struct Paginator<T, F> {
    fetch: F,
    cursor: PageCursor,
    buffer: VecDeque<T>,
    fetched: u64,
    total: Option<u64>,
    pages: u32,
    state: State,
}

impl<T, F> Paginator<T, F>
where
    F: FnMut(PageCursor) -> Result<Page<T>, ApiError>,
{
    pub fn new(page_size: u32, fetch: F) -> Result<Self, ApiError> {
        Ok(Self {
            fetch,
            cursor: PageCursor::first(page_size)?,
            buffer: VecDeque::new(),
            fetched: 0,
            total: None,
            pages: 0,
            state: State::Active,
        })
    }

    /// Total reported by the server, once a page carrying it was fetched.
    pub fn total_count(&self) -> Option<u64> {
        self.total
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }

    fn fetch_page(&mut self) -> Result<(), ApiError> {
        let cursor = self.cursor;
        let page = (self.fetch)(cursor)?;
        self.pages += 1;

        if page.total_count.is_some() {
            self.total = page.total_count;
        }
        let count = page.items.len() as u64;
        debug!(
            page_number = cursor.page_number,
            page_size = cursor.page_size,
            items = count,
            total = ?self.total,
            "fetched page"
        );

        if count == 0 {
            self.state = State::Done;
            return Ok(());
        }

        self.fetched += count;
        self.buffer.extend(page.items);
        self.cursor = cursor.next();

        let reached_total = self.total.is_some_and(|total| self.fetched >= total);
        self.state = if reached_total || page.has_next == Some(false) {
            State::LastPage
        } else {
            State::Active
        };
        Ok(())
    }
}

impl<T, F> Iterator for Paginator<T, F>
where
    F: FnMut(PageCursor) -> Result<Page<T>, ApiError>,
{
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            match self.state {
                State::Done | State::LastPage => {
                    self.state = State::Done;
                    return None;
                }
                State::Active => {
                    if let Err(err) = self.fetch_page() {
                        self.state = State::Done;
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}

impl<T, F> std::iter::FusedIterator for Paginator<T, F> where
    F: FnMut(PageCursor) -> Result<Page<T>, ApiError>
{
}

impl<T, F> std::fmt::Debug for Paginator<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("fetched", &self.fetched)
            .field("total", &self.total)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
