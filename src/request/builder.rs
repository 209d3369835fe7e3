//! Request builder
//!
//! Derives the request for the next page from the immutable base query and
//! the paginator's current state.

use super::types::{BaseQuery, PageRequest};
use crate::error::{Error, Result};
use crate::pagination::{Cursor, CursorStyle, PaginationState};
use crate::types::{Method, StringMap};

/// Builds page requests for one fetch job
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: String,
    method: Method,
    base: BaseQuery,
    auth_query: BaseQuery,
    headers: StringMap,
}

impl RequestBuilder {
    /// Create a builder for an endpoint URL and the job's base query
    pub fn new(url: impl Into<String>, method: Method, base: BaseQuery) -> Self {
        Self {
            url: url.into(),
            method,
            base,
            auth_query: BaseQuery::empty(),
            headers: StringMap::new(),
        }
    }

    /// Set the credential parameters sent with every page, next URLs included.
    /// Base query keys win on conflicts.
    #[must_use]
    pub fn with_auth_query(mut self, query: BaseQuery) -> Self {
        self.auth_query = query;
        self
    }

    /// Set the headers sent with every page
    #[must_use]
    pub fn with_headers(mut self, headers: StringMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a header sent with every page
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Endpoint URL of the first page
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The job's base query
    pub fn base_query(&self) -> &BaseQuery {
        &self.base
    }

    /// Credential parameters sent with every page
    pub fn auth_query(&self) -> &BaseQuery {
        &self.auth_query
    }

    /// Build the request for the page `state` points at.
    ///
    /// The returned parameter mapping is always newly allocated and contains
    /// exactly the credentials, the base query and the cursor keys for this
    /// page. Absolute next-URL cursors bypass the base query entirely unless
    /// the style asks for it to be echoed; credentials are always re-added.
    pub fn build(&self, style: &CursorStyle, state: &PaginationState) -> Result<PageRequest> {
        let params = match (style, &state.cursor) {
            (
                CursorStyle::NextUrl {
                    echo_base_query, ..
                }
                | CursorStyle::LinkHeader {
                    echo_base_query, ..
                },
                Some(Cursor::Url(next)),
            ) => return self.follow(next, *echo_base_query, state),
            (
                CursorStyle::Single
                | CursorStyle::NextUrl { .. }
                | CursorStyle::LinkHeader { .. }
                | CursorStyle::Token { .. },
                None,
            ) => self.base_params(),
            (CursorStyle::Token { cursor_param, .. }, Some(Cursor::Token(token))) => {
                let mut params = self.base_params();
                params.insert(cursor_param.clone(), token.clone());
                params
            }
            (
                CursorStyle::Offset {
                    offset_param,
                    limit_param,
                    limit,
                    ..
                },
                Some(Cursor::Offset(offset)),
            ) => {
                let mut params = self.base_params();
                params.insert(offset_param.clone(), offset.to_string());
                if let Some(limit_param) = limit_param {
                    let limit = limit.ok_or_else(|| {
                        Error::config(format!(
                            "offset pagination sends '{limit_param}' but no limit is configured"
                        ))
                    })?;
                    params.insert(limit_param.clone(), limit.to_string());
                }
                params
            }
            (
                CursorStyle::PageNumber {
                    page_param,
                    page_size_param,
                    page_size,
                    ..
                },
                Some(Cursor::Page(page)),
            ) => {
                let mut params = self.base_params();
                params.insert(page_param.clone(), page.to_string());
                if let Some(size_param) = page_size_param {
                    let size = page_size.ok_or_else(|| {
                        Error::config(format!(
                            "page_number pagination sends '{size_param}' but no page size is configured"
                        ))
                    })?;
                    params.insert(size_param.clone(), size.to_string());
                }
                params
            }
            (style, None) => {
                return Err(Error::config(format!(
                    "{} pagination requires a cursor in the pagination state",
                    style.name()
                )))
            }
            (style, Some(cursor)) => {
                return Err(Error::config(format!(
                    "{} pagination cannot resume from {cursor}",
                    style.name()
                )))
            }
        };

        Ok(PageRequest {
            url: self.url.clone(),
            method: self.method,
            params,
            headers: self.headers.clone(),
            cursor: state.cursor.clone(),
        })
    }

    fn base_params(&self) -> StringMap {
        self.auth_query.merged_with(&self.base).to_params()
    }

    /// Request for an absolute next URL, used verbatim apart from the keys it
    /// does not already carry
    fn follow(&self, next: &str, echo_base_query: bool, state: &PaginationState) -> Result<PageRequest> {
        let echoed = if echo_base_query {
            self.auth_query.merged_with(&self.base)
        } else {
            self.auth_query.clone()
        };

        let mut params = StringMap::new();
        if !echoed.is_empty() {
            let parsed = url::Url::parse(next)?;
            for (key, value) in echoed.iter() {
                if !parsed.query_pairs().any(|(k, _)| k == key) {
                    params.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(PageRequest {
            url: next.to_string(),
            method: self.method,
            params,
            headers: self.headers.clone(),
            cursor: state.cursor.clone(),
        })
    }
}
