//! Collection paging.
//!
//! Three styles are supported and one is selected by configuration:
//! - **page number**: `?pa=<n|end>&size=<k>`
//! - **limit/offset**: `?limit=<k>&offset=<n>`
//! - **cursor**: `?cursor=<token>`, ordered by creation time then id
//!
//! Handlers count the collection, turn the query into a [`Plan`], hand the
//! plan's [`Window`] to the service layer and wrap the rows with
//! [`Plan::finish`].

use crate::errors::AppError;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Value of `pa` that selects the last page.
pub const LAST_PAGE: &str = "end";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    PageNumber,
    LimitOffset,
    Cursor,
}

impl FromStr for PaginationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "page" | "page-number" | "page_number" => Ok(Self::PageNumber),
            "limit" | "limit-offset" | "limit_offset" => Ok(Self::LimitOffset),
            "cursor" => Ok(Self::Cursor),
            other => Err(format!("unknown pagination style `{other}`")),
        }
    }
}

/// Paging defaults and caps shared by every collection endpoint.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub style: PaginationStyle,
    /// Page size for the page-number and cursor styles.
    pub page_size: i64,
    /// Upper bound for a client-supplied `size`.
    pub max_page_size: i64,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            style: PaginationStyle::PageNumber,
            page_size: 3,
            max_page_size: 10,
            default_limit: 3,
            max_limit: 10,
        }
    }
}

/// Raw paging parameters. Everything is kept as text so malformed values
/// fall back to defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub pa: Option<String>,
    pub size: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub cursor: Option<String>,
}

/// Position of the last row handed out by a cursor page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorKey {
    pub created: Option<DateTime<Utc>>,
    pub id: i64,
}

impl CursorKey {
    pub fn by_id(id: i64) -> Self {
        Self { created: None, id }
    }

    pub fn encode(&self) -> String {
        let created = self.created.map(|c| c.to_rfc3339()).unwrap_or_default();
        general_purpose::URL_SAFE_NO_PAD.encode(format!("{}|{}", created, self.id))
    }

    pub fn decode(token: &str) -> Option<Self> {
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(token).ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        let (created, id) = raw.rsplit_once('|')?;
        let created = if created.is_empty() {
            None
        } else {
            Some(DateTime::parse_from_rfc3339(created).ok()?.with_timezone(&Utc))
        };
        Some(Self {
            created,
            id: id.parse().ok()?,
        })
    }
}

/// What the service layer needs to fetch one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
    /// Only rows strictly after this key (cursor style).
    pub after: Option<CursorKey>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }

    /// Carry a filter parameter over into the `next`/`previous` links.
    pub fn keep_param(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        for link in [&mut self.next, &mut self.previous].into_iter().flatten() {
            link.push_str(&format!("&{name}={value}"));
        }
        self
    }
}

/// A resolved paging request.
#[derive(Debug, Clone)]
pub struct Plan {
    style: PaginationStyle,
    limit: i64,
    offset: i64,
    after: Option<CursorKey>,
    page: i64,
    /// Echo the client's `size`/`limit` in generated links.
    explicit_size: bool,
}

impl Plan {
    /// Resolve `query` against `config` for a collection of `total` rows.
    ///
    /// Fails with 404 for pages outside the collection and for undecodable
    /// cursors.
    pub fn new(config: &PaginationConfig, query: &PageQuery, total: i64) -> Result<Self, AppError> {
        match config.style {
            PaginationStyle::PageNumber => {
                let requested = positive(query.size.as_deref());
                let size = requested
                    .map(|s| s.min(config.max_page_size))
                    .unwrap_or(config.page_size)
                    .max(1);
                let num_pages = ((total + size - 1) / size).max(1);
                let page = match query.pa.as_deref() {
                    None => 1,
                    Some(LAST_PAGE) => num_pages,
                    Some(raw) => raw
                        .parse::<i64>()
                        .ok()
                        .filter(|p| (1..=num_pages).contains(p))
                        .ok_or_else(|| AppError::not_found("Invalid page."))?,
                };
                Ok(Self {
                    style: config.style,
                    limit: size,
                    offset: (page - 1) * size,
                    after: None,
                    page,
                    explicit_size: requested.is_some(),
                })
            }
            PaginationStyle::LimitOffset => {
                let requested = positive(query.limit.as_deref());
                let limit = requested
                    .map(|l| l.min(config.max_limit))
                    .unwrap_or(config.default_limit)
                    .max(1);
                let offset = query
                    .offset
                    .as_deref()
                    .and_then(|o| o.parse::<i64>().ok())
                    .filter(|o| *o >= 0)
                    .unwrap_or(0);
                Ok(Self {
                    style: config.style,
                    limit,
                    offset,
                    after: None,
                    page: 0,
                    explicit_size: true,
                })
            }
            PaginationStyle::Cursor => {
                let after = match query.cursor.as_deref() {
                    None => None,
                    Some(token) => Some(
                        CursorKey::decode(token)
                            .ok_or_else(|| AppError::not_found("Invalid cursor"))?,
                    ),
                };
                Ok(Self {
                    style: config.style,
                    limit: config.page_size.max(1),
                    offset: 0,
                    after,
                    page: 0,
                    explicit_size: false,
                })
            }
        }
    }

    /// Rows to request from the store. Cursor pages over-fetch by one to
    /// learn whether another page exists.
    pub fn window(&self) -> Window {
        let limit = match self.style {
            PaginationStyle::Cursor => self.limit + 1,
            _ => self.limit,
        };
        Window {
            limit,
            offset: self.offset,
            after: self.after.clone(),
        }
    }

    /// Wrap fetched rows into the response envelope.
    pub fn finish<T>(self, mut rows: Vec<T>, total: i64, key: impl Fn(&T) -> CursorKey) -> Page<T> {
        match self.style {
            PaginationStyle::PageNumber => {
                let size = self.size_param();
                let last = self.offset.saturating_add(self.limit) >= total;
                Page {
                    count: Some(total),
                    next: (!last).then(|| format!("?pa={}{}", self.page + 1, size)),
                    previous: (self.page > 1).then(|| format!("?pa={}{}", self.page - 1, size)),
                    results: rows,
                }
            }
            PaginationStyle::LimitOffset => {
                // offset is client-chosen and unbounded
                let end = self.offset.saturating_add(self.limit);
                let next = (end < total).then(|| {
                    format!("?limit={}&offset={}", self.limit, end)
                });
                let previous = (self.offset > 0).then(|| {
                    if self.offset - self.limit <= 0 {
                        format!("?limit={}", self.limit)
                    } else {
                        format!("?limit={}&offset={}", self.limit, self.offset - self.limit)
                    }
                });
                Page {
                    count: Some(total),
                    next,
                    previous,
                    results: rows,
                }
            }
            PaginationStyle::Cursor => {
                let has_more = rows.len() as i64 > self.limit;
                rows.truncate(self.limit as usize);
                let next = if has_more {
                    rows.last().map(|row| format!("?cursor={}", key(row).encode()))
                } else {
                    None
                };
                Page {
                    count: None,
                    next,
                    previous: None,
                    results: rows,
                }
            }
        }
    }

    fn size_param(&self) -> String {
        if self.explicit_size {
            format!("&size={}", self.limit)
        } else {
            String::new()
        }
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.parse::<i64>().ok()).filter(|v| *v > 0)
}
