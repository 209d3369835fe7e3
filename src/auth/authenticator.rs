//! Authenticator implementation
//!
//! Turns an auth configuration into the headers and query parameters every
//! request of a source carries.

use super::types::{AuthConfig, Credentials, Location};
use crate::error::{Error, Result};
use crate::request::BaseQuery;
use crate::template::{self, TemplateContext};
use base64::Engine;
use tracing::debug;

/// Authenticator resolves credentials for a source
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    config: AuthConfig,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Auth configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Render templates and produce the credentials to attach
    pub fn resolve(&self, ctx: &TemplateContext) -> Result<Credentials> {
        let render = |value: &str| template::render(value, ctx);
        let mut credentials = Credentials::default();

        match &self.config {
            AuthConfig::None => {}

            AuthConfig::ApiKey {
                location,
                header_name,
                query_param,
                prefix,
                value,
            } => {
                let value = render(value)?;
                if value.is_empty() {
                    return Err(Error::invalid_value("auth.value", "rendered to an empty string"));
                }
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => {
                        let header = header_name.as_deref().unwrap_or("Authorization");
                        credentials.headers.insert(header.to_string(), val);
                    }
                    Location::Query => {
                        let param = query_param.as_deref().unwrap_or("api_key");
                        credentials.query = BaseQuery::empty().with(param, val);
                    }
                }
            }

            AuthConfig::Basic { username, password } => {
                let pair = format!("{}:{}", render(username)?, render(password)?);
                let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
                credentials
                    .headers
                    .insert("Authorization".to_string(), format!("Basic {encoded}"));
            }

            AuthConfig::Bearer { token } => {
                credentials
                    .headers
                    .insert("Authorization".to_string(), format!("Bearer {}", render(token)?));
            }

            AuthConfig::CustomHeaders { headers } => {
                credentials.headers = template::render_map(headers, ctx)?;
            }
        }

        debug!(auth = self.config.name(), headers = credentials.headers.len(), "Resolved credentials");
        Ok(credentials)
    }
}
