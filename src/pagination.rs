use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest offset a cursor may carry; offsets are bound as Postgres BIGINT
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Opaque continuation token. Clients must hand it back unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(u64);

impl Cursor {
    pub fn start() -> Self {
        Cursor(0)
    }

    pub fn offset(&self) -> u64 {
        self.0
    }

    /// Saturates at `MAX_OFFSET`
    pub fn advance(self, rows: usize) -> Self {
        let next = self
            .0
            .checked_add(rows as u64)
            .filter(|offset| *offset <= MAX_OFFSET)
            .unwrap_or(MAX_OFFSET);
        Cursor(next)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{:x}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('c')
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .filter(|offset| *offset <= MAX_OFFSET)
            .map(Cursor)
            .ok_or_else(|| format!("invalid cursor '{}'", s))
    }
}

impl TryFrom<String> for Cursor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub num_items: u32,
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    pub fn first(num_items: u32) -> Self {
        Self {
            num_items,
            cursor: None,
        }
    }

    pub fn after(num_items: u32, cursor: Cursor) -> Self {
        Self {
            num_items,
            cursor: Some(cursor),
        }
    }

    pub fn offset(&self) -> u64 {
        self.cursor.unwrap_or_default().offset()
    }

    /// Rows to fetch: one extra to learn whether more remain
    pub fn window(&self) -> u64 {
        self.num_items as u64 + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: Vec<T>,
    pub is_done: bool,
    pub continue_cursor: Cursor,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with `request.window()` as the limit
    pub fn from_window(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let is_done = rows.len() <= request.num_items as usize;
        rows.truncate(request.num_items as usize);
        let continue_cursor = request.cursor.unwrap_or_default().advance(rows.len());

        Self {
            page: rows,
            is_done,
            continue_cursor,
        }
    }

    /// Authoritative "can load more" signal
    pub fn can_load_more(&self) -> bool {
        !self.is_done
    }
}

/// Advisory display metadata, only meaningful when the total is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Metadata for the page a request addresses
    pub fn for_request(request: &PageRequest, total: u64) -> Self {
        let limit = (request.num_items as u64).max(1);
        Self::new(request.offset() / limit + 1, limit, total)
    }
}
