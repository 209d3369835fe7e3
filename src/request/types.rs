//! Request value types

use crate::error::{Error, Result};
use crate::pagination::Cursor;
use crate::types::{Method, StringMap};
use serde::{Deserialize, Serialize};

/// Filter parameters for one fetch job.
///
/// A `BaseQuery` is immutable once constructed: there is no way to insert
/// into or remove from an existing value. Builder-style methods return a new
/// query. "No filters" is [`BaseQuery::empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseQuery {
    params: StringMap,
}

impl BaseQuery {
    /// Query with no filters
    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a new query with one more parameter
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = self.params.clone();
        params.insert(key.into(), value.into());
        Self { params }
    }

    /// Return a new query with the parameter only when a value is present
    #[must_use]
    pub fn with_optional(&self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self.clone(),
        }
    }

    /// Combine two queries, `overrides` winning on key conflicts
    #[must_use]
    pub fn merged_with(&self, overrides: &BaseQuery) -> Self {
        let mut params = self.params.clone();
        for (key, value) in &overrides.params {
            params.insert(key.clone(), value.clone());
        }
        Self { params }
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check whether a parameter is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over the parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Copy the parameters into a new, caller-owned mapping
    pub fn to_params(&self) -> StringMap {
        self.params.clone()
    }
}

impl From<StringMap> for BaseQuery {
    fn from(params: StringMap) -> Self {
        Self { params }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BaseQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A single page request, built fresh for every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Fully qualified URL
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Query parameters (GET) or JSON body fields (POST)
    pub params: StringMap,
    /// Request headers, including auth
    pub headers: StringMap,
    /// Cursor this request resumes from (`None` for a first page)
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    /// Rate limiting key for this request: `host` or `host:port`
    pub fn host(&self) -> Result<String> {
        let url = url::Url::parse(&self.url)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("URL '{}' has no host", self.url)))?;
        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}
