//! Page extraction
//!
//! Turns one decoded response into the page's items and the cursor for the
//! page after it, according to the endpoint's [`CursorStyle`].

use super::types::{Cursor, CursorStyle, EmptyPagePolicy, PageResult, PaginationConfig};
use crate::error::{Error, Result};
use crate::request::PageRequest;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;

/// Extract items and the next cursor from a decoded response body.
///
/// Malformed payloads (items missing or not an array, a next link of the
/// wrong type) fail with [`Error::MalformedResponse`] carrying a short shape
/// summary of what was received.
pub fn extract_page(
    body: &Value,
    headers: &HeaderMap,
    request: &PageRequest,
    config: &PaginationConfig,
) -> Result<PageResult> {
    let items = extract_items(body, config.items_path.as_deref())?;

    let next_cursor = match &config.cursor {
        CursorStyle::Single => None,
        CursorStyle::NextUrl { path, .. } => next_url_from_body(body, path, request)?,
        CursorStyle::LinkHeader { rel, .. } => headers
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_link_header(value, rel))
            .map(|next| resolve_url(&request.url, &next))
            .transpose()?
            .map(Cursor::Url),
        CursorStyle::Token {
            cursor_path,
            has_more_path,
            ..
        } => next_token(body, cursor_path, has_more_path.as_deref())?,
        CursorStyle::Offset { start, .. } => {
            let current = match request.cursor {
                Some(Cursor::Offset(offset)) => offset,
                _ => *start,
            };
            (!items.is_empty()).then(|| Cursor::Offset(current + items.len() as u64))
        }
        CursorStyle::PageNumber { start_page, .. } => {
            let current = match request.cursor {
                Some(Cursor::Page(page)) => page,
                _ => *start_page,
            };
            (!items.is_empty()).then(|| Cursor::Page(current + 1))
        }
    };

    let next_cursor = match config.empty_page_policy() {
        EmptyPagePolicy::Stop if items.is_empty() => None,
        _ => next_cursor,
    };

    Ok(PageResult { items, next_cursor })
}

fn extract_items(body: &Value, items_path: Option<&str>) -> Result<Vec<Value>> {
    let found = match items_path {
        Some(path) => lookup_path(body, path).ok_or_else(|| {
            Error::malformed(format!("items field '{path}' is missing"), describe_shape(body))
        })?,
        None => body,
    };

    match found {
        Value::Array(items) => Ok(items.clone()),
        other => Err(Error::malformed(
            match items_path {
                Some(path) => format!("items field '{path}' is {}, expected array", kind_of(other)),
                None => format!("response body is {}, expected array", kind_of(other)),
            },
            describe_shape(body),
        )),
    }
}

fn next_url_from_body(body: &Value, path: &str, request: &PageRequest) -> Result<Option<Cursor>> {
    match lookup_path(body, path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(next)) if next.is_empty() => Ok(None),
        Some(Value::String(next)) => Ok(Some(Cursor::Url(resolve_url(&request.url, next)?))),
        Some(other) => Err(Error::malformed(
            format!("next link '{path}' is {}, expected string", kind_of(other)),
            describe_shape(body),
        )),
    }
}

fn next_token(body: &Value, cursor_path: &str, has_more_path: Option<&str>) -> Result<Option<Cursor>> {
    if let Some(has_more) = has_more_path {
        match lookup_path(body, has_more) {
            Some(Value::Bool(false)) => return Ok(None),
            None | Some(Value::Bool(true)) | Some(Value::Null) => {}
            Some(other) => {
                return Err(Error::malformed(
                    format!("'{has_more}' is {}, expected boolean", kind_of(other)),
                    describe_shape(body),
                ))
            }
        }
    }

    match lookup_path(body, cursor_path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) if token.is_empty() => Ok(None),
        Some(Value::String(token)) => Ok(Some(Cursor::Token(token.clone()))),
        Some(Value::Number(n)) => Ok(Some(Cursor::Token(n.to_string()))),
        Some(other) => Err(Error::malformed(
            format!("cursor '{cursor_path}' is {}, expected string", kind_of(other)),
            describe_shape(body),
        )),
    }
}

/// Resolve a possibly relative next link against the URL that returned it
fn resolve_url(current: &str, next: &str) -> Result<String> {
    match url::Url::parse(next) {
        Ok(_) => Ok(next.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(url::Url::parse(current)?.join(next)?.to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse a Link header and extract the URL for the given rel
fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    header.split(',').find_map(|part| {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"').trim_matches('\''));
            }
        }

        match (url, rel) {
            (Some(u), Some(r)) if r.split_whitespace().any(|r| r == target_rel) => Some(u.to_string()),
            _ => None,
        }
    })
}

/// Resolve a dotted path (`$.` prefix optional) inside a JSON value
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// One-line summary of a payload's shape for error messages,
/// e.g. `{next: string, values: array[2]}`
pub fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{key}: {}", kind_of(value)))
                .collect();
            fields.sort();
            format!("{{{}}}", fields.join(", "))
        }
        other => kind_of(other),
    }
}

fn kind_of(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array[{}]", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}
