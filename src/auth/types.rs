//! Auth configuration types
//!
//! Values may contain `{{ env.* }}` or `{{ vars.* }}` templates; they are
//! rendered when the authenticator resolves credentials.

use crate::request::BaseQuery;
use crate::types::StringMap;
use serde::{Deserialize, Serialize};

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Where to place the API key
        #[serde(default)]
        location: Location,
        /// Header name (for header location)
        #[serde(default)]
        header_name: Option<String>,
        /// Query parameter name (for query location)
        #[serde(default)]
        query_param: Option<String>,
        /// Prefix to add before the value (e.g., "OAuth ")
        #[serde(default)]
        prefix: Option<String>,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username (may be empty for token-only schemes)
        #[serde(default)]
        username: String,
        /// Password
        #[serde(default)]
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Custom headers
    CustomHeaders {
        /// Headers to add to each request
        headers: StringMap,
    },
}

impl AuthConfig {
    /// Auth type name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::CustomHeaders { .. } => "custom_headers",
        }
    }
}

/// Resolved credentials, applied to every request of a source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Headers to send
    pub headers: StringMap,
    /// Query parameters to send
    pub query: BaseQuery,
}
