//! Tests for the auth module

use super::*;
use crate::template::TemplateContext;
use crate::types::StringMap;
use base64::Engine;
use pretty_assertions::assert_eq;

fn ctx() -> TemplateContext {
    let vars: StringMap = [
        ("token".to_string(), "secret-token".to_string()),
        ("user".to_string(), "alice".to_string()),
    ]
    .into_iter()
    .collect();
    TemplateContext::with_vars(vars)
}

#[test]
fn test_no_auth() {
    let credentials = Authenticator::new(AuthConfig::None).resolve(&ctx()).unwrap();
    assert_eq!(credentials, Credentials::default());
}

#[test]
fn test_api_key_header() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: Some("X-API-Key".to_string()),
        query_param: None,
        prefix: None,
        value: "{{ vars.token }}".to_string(),
    });

    let credentials = auth.resolve(&ctx()).unwrap();
    assert_eq!(credentials.headers.get("X-API-Key").map(String::as_str), Some("secret-token"));
    assert!(credentials.query.is_empty());
}

#[test]
fn test_api_key_header_with_prefix() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: None,
        query_param: None,
        prefix: Some("OAuth ".to_string()),
        value: "abc".to_string(),
    });

    let credentials = auth.resolve(&ctx()).unwrap();
    assert_eq!(credentials.headers.get("Authorization").map(String::as_str), Some("OAuth abc"));
}

#[test]
fn test_api_key_query() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Query,
        header_name: None,
        query_param: Some("key".to_string()),
        prefix: None,
        value: "abc".to_string(),
    });

    let credentials = auth.resolve(&ctx()).unwrap();
    assert!(credentials.headers.is_empty());
    assert_eq!(credentials.query.get("key"), Some("abc"));
}

#[test]
fn test_api_key_empty_value_rejected() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: None,
        query_param: None,
        prefix: None,
        value: String::new(),
    });
    assert!(auth.resolve(&ctx()).unwrap_err().is_config());
}

#[test]
fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "{{ vars.user }}".to_string(),
        password: "pw".to_string(),
    });

    let credentials = auth.resolve(&ctx()).unwrap();
    let expected = base64::engine::general_purpose::STANDARD.encode("alice:pw");
    assert_eq!(
        credentials.headers.get("Authorization"),
        Some(&format!("Basic {expected}"))
    );
}

#[test]
fn test_basic_auth_token_only() {
    // Token as password with an empty username
    let auth = Authenticator::new(AuthConfig::Basic {
        username: String::new(),
        password: "{{ vars.token }}".to_string(),
    });

    let credentials = auth.resolve(&ctx()).unwrap();
    let expected = base64::engine::general_purpose::STANDARD.encode(":secret-token");
    assert_eq!(
        credentials.headers.get("Authorization"),
        Some(&format!("Basic {expected}"))
    );
}

#[test]
fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "{{ vars.token }}".to_string(),
    });
    let credentials = auth.resolve(&ctx()).unwrap();
    assert_eq!(
        credentials.headers.get("Authorization").map(String::as_str),
        Some("Bearer secret-token")
    );
}

#[test]
fn test_custom_headers() {
    let headers: StringMap = [
        ("Authorization".to_string(), "{{ vars.token }}".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ]
    .into_iter()
    .collect();
    let auth = Authenticator::new(AuthConfig::CustomHeaders { headers });

    let credentials = auth.resolve(&ctx()).unwrap();
    assert_eq!(credentials.headers.len(), 2);
    assert_eq!(
        credentials.headers.get("Authorization").map(String::as_str),
        Some("secret-token")
    );
}

#[test]
fn test_undefined_variable_fails() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "{{ vars.missing }}".to_string(),
    });
    let err = auth.resolve(&ctx()).unwrap_err();
    assert!(err.to_string().contains("vars.missing"));
}

#[test]
fn test_auth_config_from_yaml() {
    let yaml = r"
type: api_key
header_name: Authorization
prefix: 'OAuth '
value: '{{ env.STATUSPAGE_API_KEY }}'
";
    let config: AuthConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.name(), "api_key");
    assert!(matches!(config, AuthConfig::ApiKey { location: Location::Header, .. }));

    let config: AuthConfig = serde_yaml::from_str("type: basic\npassword: x").unwrap();
    assert!(matches!(config, AuthConfig::Basic { ref username, .. } if username.is_empty()));

    assert_eq!(AuthConfig::default(), AuthConfig::None);
}
