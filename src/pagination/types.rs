//! Pagination types
//!
//! Defines the cursor styles, the per-job pagination state and page results.

use crate::error::{Error, Result};
use crate::request::BaseQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How an endpoint tells the client where the next page starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CursorStyle {
    /// One request, no pagination
    #[default]
    Single,

    /// Absolute next-page URL in the response body (e.g., Bitbucket `next`)
    NextUrl {
        /// Path to the next URL in the response body
        #[serde(default = "default_next_path")]
        path: String,
        /// Re-add base query keys missing from the next URL
        #[serde(default)]
        echo_base_query: bool,
    },

    /// Absolute next-page URL in an RFC 5988 `Link` header (e.g., GitHub)
    LinkHeader {
        /// Rel value to follow
        #[serde(default = "default_rel")]
        rel: String,
        /// Re-add base query keys missing from the next URL
        #[serde(default)]
        echo_base_query: bool,
    },

    /// Opaque continuation token (e.g., Slack, Stripe)
    Token {
        /// Query parameter carrying the token
        cursor_param: String,
        /// Path to the token in the response body
        cursor_path: String,
        /// Optional boolean field; `false` ends pagination
        #[serde(default)]
        has_more_path: Option<String>,
    },

    /// Numeric offset, advanced by the number of items returned
    Offset {
        /// Query parameter for the offset (e.g., `$skip`)
        offset_param: String,
        /// Query parameter for the page size (e.g., `$top`)
        #[serde(default)]
        limit_param: Option<String>,
        /// Page size value
        #[serde(default)]
        limit: Option<u64>,
        /// First offset
        #[serde(default)]
        start: u64,
    },

    /// Numeric page number, advanced by one
    PageNumber {
        /// Query parameter for the page number
        page_param: String,
        /// First page number (usually 0 or 1)
        #[serde(default = "default_start_page")]
        start_page: u64,
        /// Optional page size parameter name
        #[serde(default)]
        page_size_param: Option<String>,
        /// Page size value
        #[serde(default)]
        page_size: Option<u64>,
    },
}

fn default_next_path() -> String {
    "next".to_string()
}

fn default_rel() -> String {
    "next".to_string()
}

fn default_start_page() -> u64 {
    1
}

impl CursorStyle {
    /// Next URL taken from a body field
    pub fn next_url(path: impl Into<String>) -> Self {
        Self::NextUrl {
            path: path.into(),
            echo_base_query: false,
        }
    }

    /// Next URL taken from the `Link` header
    pub fn link_header(rel: impl Into<String>) -> Self {
        Self::LinkHeader {
            rel: rel.into(),
            echo_base_query: false,
        }
    }

    /// Opaque token pagination
    pub fn token(cursor_param: impl Into<String>, cursor_path: impl Into<String>) -> Self {
        Self::Token {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            has_more_path: None,
        }
    }

    /// Offset pagination with a fixed page size
    pub fn offset(offset_param: impl Into<String>, limit_param: impl Into<String>, limit: u64) -> Self {
        Self::Offset {
            offset_param: offset_param.into(),
            limit_param: Some(limit_param.into()),
            limit: Some(limit),
            start: 0,
        }
    }

    /// Page number pagination
    pub fn page_number(page_param: impl Into<String>, start_page: u64) -> Self {
        Self::PageNumber {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
        }
    }

    /// Set the page size for page number pagination
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u64) -> Self {
        if let Self::PageNumber {
            page_size_param,
            page_size,
            ..
        } = &mut self
        {
            *page_size_param = Some(param.into());
            *page_size = Some(size);
        }
        self
    }

    /// Set the `has_more` field for token pagination
    #[must_use]
    pub fn with_has_more(mut self, path: impl Into<String>) -> Self {
        if let Self::Token { has_more_path, .. } = &mut self {
            *has_more_path = Some(path.into());
        }
        self
    }

    /// Echo the base query onto absolute next URLs
    #[must_use]
    pub fn echoing_base_query(mut self) -> Self {
        if let Self::NextUrl {
            echo_base_query, ..
        }
        | Self::LinkHeader {
            echo_base_query, ..
        } = &mut self
        {
            *echo_base_query = true;
        }
        self
    }

    /// Short name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::NextUrl { .. } => "next_url",
            Self::LinkHeader { .. } => "link_header",
            Self::Token { .. } => "token",
            Self::Offset { .. } => "offset",
            Self::PageNumber { .. } => "page_number",
        }
    }

    /// Whether the next page is found by counting rather than by a response field
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Offset { .. } | Self::PageNumber { .. })
    }

    /// Cursor the first request starts from
    pub fn initial_cursor(&self) -> Option<Cursor> {
        match self {
            Self::Offset { start, .. } => Some(Cursor::Offset(*start)),
            Self::PageNumber { start_page, .. } => Some(Cursor::Page(*start_page)),
            _ => None,
        }
    }

    /// Query keys this style writes on top of the base query
    pub fn cursor_keys(&self) -> Vec<&str> {
        match self {
            Self::Single | Self::NextUrl { .. } | Self::LinkHeader { .. } => Vec::new(),
            Self::Token { cursor_param, .. } => vec![cursor_param.as_str()],
            Self::Offset {
                offset_param,
                limit_param,
                ..
            } => std::iter::once(offset_param.as_str())
                .chain(limit_param.as_deref())
                .collect(),
            Self::PageNumber {
                page_param,
                page_size_param,
                ..
            } => std::iter::once(page_param.as_str())
                .chain(page_size_param.as_deref())
                .collect(),
        }
    }

    /// Default behavior for an empty page that still carries a cursor
    pub fn default_empty_page_policy(&self) -> EmptyPagePolicy {
        if self.is_numeric() {
            EmptyPagePolicy::Stop
        } else {
            EmptyPagePolicy::Continue
        }
    }

    /// Check the style is usable with a job's base query
    pub fn validate(&self, base: &BaseQuery) -> Result<()> {
        for key in self.cursor_keys() {
            if key.is_empty() {
                return Err(Error::invalid_value(
                    self.name(),
                    "cursor parameter names must not be empty",
                ));
            }
            if base.contains_key(key) {
                return Err(Error::config(format!(
                    "base query key '{key}' collides with the {} cursor parameter",
                    self.name()
                )));
            }
        }

        match self {
            Self::Offset {
                limit_param: Some(param),
                limit: None,
                ..
            } => Err(Error::invalid_value(
                param.as_str(),
                "offset pagination needs a limit when a limit parameter is set",
            )),
            Self::PageNumber {
                page_size_param: Some(param),
                page_size: None,
                ..
            } => Err(Error::invalid_value(
                param.as_str(),
                "page_number pagination needs a page size when a page size parameter is set",
            )),
            Self::Token { cursor_path, .. } if cursor_path.is_empty() => Err(Error::invalid_value(
                "cursor_path",
                "token pagination needs a cursor path",
            )),
            _ => Ok(()),
        }
    }
}

/// What to do with an empty page that still carries a next cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPagePolicy {
    /// Keep following the cursor
    Continue,
    /// Treat the empty page as the last one
    Stop,
}

/// Pagination settings for one endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Cursor style
    #[serde(default)]
    pub cursor: CursorStyle,
    /// Path to the items array (`None` = the body itself is the array)
    #[serde(default)]
    pub items_path: Option<String>,
    /// Empty page handling (defaults per cursor style)
    #[serde(default)]
    pub empty_page: Option<EmptyPagePolicy>,
    /// Stop after this many pages
    #[serde(default)]
    pub max_pages: Option<u64>,
}

impl PaginationConfig {
    /// Create a config for a cursor style
    pub fn new(cursor: CursorStyle) -> Self {
        Self {
            cursor,
            ..Default::default()
        }
    }

    /// Set the items path
    #[must_use]
    pub fn with_items_path(mut self, path: impl Into<String>) -> Self {
        self.items_path = Some(path.into());
        self
    }

    /// Set the empty page policy
    #[must_use]
    pub fn with_empty_page(mut self, policy: EmptyPagePolicy) -> Self {
        self.empty_page = Some(policy);
        self
    }

    /// Set the page ceiling
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Effective empty page policy
    pub fn empty_page_policy(&self) -> EmptyPagePolicy {
        self.empty_page
            .unwrap_or_else(|| self.cursor.default_empty_page_policy())
    }

    /// Validate against a job's base query before any request is issued
    pub fn validate(&self, base: &BaseQuery) -> Result<()> {
        self.cursor.validate(base)?;

        if self.cursor.is_numeric() && self.empty_page == Some(EmptyPagePolicy::Continue) {
            return Err(Error::invalid_value(
                "empty_page",
                format!(
                    "{} pagination ends on an empty page; 'continue' would never terminate",
                    self.cursor.name()
                ),
            ));
        }

        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }

        Ok(())
    }
}

/// Position of the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Absolute URL, used verbatim
    Url(String),
    /// Opaque token
    Token(String),
    /// Numeric offset
    Offset(u64),
    /// Page number
    Page(u64),
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "url cursor {url}"),
            Self::Token(token) => write!(f, "token cursor {token}"),
            Self::Offset(offset) => write!(f, "offset cursor {offset}"),
            Self::Page(page) => write!(f, "page cursor {page}"),
        }
    }
}

/// Tracks pagination state during one paginator run
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Where the next request resumes (`None` before a cursor-less first page)
    pub cursor: Option<Cursor>,
    /// Pages fetched so far
    pub pages_fetched: u64,
    /// Total items fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state for a cursor style
    pub fn for_style(style: &CursorStyle) -> Self {
        Self {
            cursor: style.initial_cursor(),
            ..Default::default()
        }
    }

    /// Record a fetched page and move to its next cursor
    pub fn advance(&mut self, items: usize, next: Option<Cursor>) {
        self.pages_fetched += 1;
        self.total_fetched += items as u64;
        self.done = next.is_none();
        self.cursor = next;
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// Items of one page plus where the next one starts
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Records in page order
    pub items: Vec<Value>,
    /// Next cursor; `None` ends pagination
    pub next_cursor: Option<Cursor>,
}

impl PageResult {
    /// Check if this is the last page
    pub fn is_terminal(&self) -> bool {
        self.next_cursor.is_none()
    }
}
