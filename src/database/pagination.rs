use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Paging window. Deserialized values go through [`PageRequest::new`], so a
/// decoded request is always clamped.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Deserialize)]
struct RawPageRequest {
    limit: Option<i64>,
    offset: Option<i64>,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::new(raw.limit, raw.offset)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Clamps user supplied `limit`/`offset` query values into a usable window.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page: PageRequest) -> Self {
        if rows.is_empty() && page.offset == 0 {
            return Self::no_rows();
        }

        let next_offset = page.offset + page.limit;
        let next_offset = (next_offset < total_rows).then_some(next_offset);
        let prev_offset = (page.offset > 0).then(|| (page.offset - page.limit).max(0));

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
        }
    }
}
