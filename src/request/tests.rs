//! Tests for the request module

use super::*;
use crate::pagination::{Cursor, CursorStyle, PaginationState};
use crate::types::Method;
use pretty_assertions::assert_eq;

fn state_at(cursor: Option<Cursor>) -> PaginationState {
    PaginationState {
        cursor,
        ..Default::default()
    }
}

#[test]
fn test_base_query_is_never_mutated() {
    let base = BaseQuery::empty().with("role", "member");
    let extended = base.with("q", "state=\"OPEN\"");

    assert_eq!(base.len(), 1);
    assert_eq!(extended.len(), 2);
    assert_eq!(extended.get("role"), Some("member"));
}

#[test]
fn test_with_optional_none_leaves_no_key() {
    let base = BaseQuery::empty()
        .with_optional("organization", None::<String>)
        .with_optional("q", Some("open"));
    assert!(!base.contains_key("organization"));
    assert_eq!(base.get("q"), Some("open"));
}

#[test]
fn test_merged_with_overrides_win() {
    let endpoint = BaseQuery::empty().with("ps", "100").with("state", "OPEN");
    let job = BaseQuery::empty().with("state", "MERGED");
    let merged = endpoint.merged_with(&job);

    assert_eq!(merged.get("ps"), Some("100"));
    assert_eq!(merged.get("state"), Some("MERGED"));
    assert_eq!(endpoint.get("state"), Some("OPEN"));
}

#[test]
fn test_each_build_gets_fresh_params() {
    let builder = RequestBuilder::new(
        "https://sonar.example.com/api/issues/search",
        Method::GET,
        BaseQuery::empty().with("componentKeys", "core"),
    );
    let style = CursorStyle::page_number("p", 1).with_page_size("ps", 100);

    let mut first = builder.build(&style, &state_at(Some(Cursor::Page(1)))).unwrap();
    first.params.insert("leak".into(), "yes".into());

    let second = builder.build(&style, &state_at(Some(Cursor::Page(2)))).unwrap();
    assert!(!second.params.contains_key("leak"));
    assert_eq!(second.params.len(), 3);
    assert_eq!(second.params["p"], "2");
    assert_eq!(second.params["ps"], "100");
    assert_eq!(builder.base_query().len(), 1);
}

#[test]
fn test_params_are_base_plus_cursor_keys() {
    let base = BaseQuery::empty().with("api-version", "7.1");
    let builder = RequestBuilder::new("https://dev.azure.com/org/_apis/projects", Method::GET, base);
    let style = CursorStyle::offset("$skip", "$top", 50);

    let req = builder.build(&style, &state_at(Some(Cursor::Offset(100)))).unwrap();
    let keys: Vec<_> = req.params.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["$skip", "$top", "api-version"]);
    assert_eq!(req.params["$skip"], "100");
    assert_eq!(req.cursor, Some(Cursor::Offset(100)));
}

#[test]
fn test_token_first_page_has_no_cursor_param() {
    let builder = RequestBuilder::new("https://api.example.com/items", Method::GET, BaseQuery::empty());
    let style = CursorStyle::token("after", "meta.next");

    let first = builder.build(&style, &state_at(None)).unwrap();
    assert!(first.params.is_empty());

    let next = builder
        .build(&style, &state_at(Some(Cursor::Token("abc".into()))))
        .unwrap();
    assert_eq!(next.params["after"], "abc");
}

#[test]
fn test_next_url_is_used_verbatim() {
    let builder = RequestBuilder::new(
        "https://api.bitbucket.org/2.0/repositories/acme",
        Method::GET,
        BaseQuery::empty().with("role", "member"),
    )
    .header("Accept", "application/json");
    let style = CursorStyle::next_url("next");

    let first = builder.build(&style, &state_at(None)).unwrap();
    assert_eq!(first.params["role"], "member");

    let next_url = "https://api.bitbucket.org/2.0/repositories/acme?role=member&page=2";
    let second = builder
        .build(&style, &state_at(Some(Cursor::Url(next_url.into()))))
        .unwrap();
    assert_eq!(second.url, next_url);
    assert!(second.params.is_empty());
    assert_eq!(second.headers["Accept"], "application/json");
}

#[test]
fn test_echo_base_query_adds_only_missing_keys() {
    let builder = RequestBuilder::new(
        "https://api.example.com/items",
        Method::GET,
        BaseQuery::empty().with("role", "member").with("q", "open"),
    );
    let style = CursorStyle::next_url("next").echoing_base_query();

    let req = builder
        .build(
            &style,
            &state_at(Some(Cursor::Url("https://api.example.com/items?page=2&role=member".into()))),
        )
        .unwrap();
    assert_eq!(req.params.len(), 1);
    assert_eq!(req.params["q"], "open");
}

#[test]
fn test_credentials_follow_next_urls() {
    let builder = RequestBuilder::new(
        "https://api.example.com/items",
        Method::GET,
        BaseQuery::empty().with("state", "open"),
    )
    .with_auth_query(BaseQuery::empty().with("api_key", "k"));
    let style = CursorStyle::next_url("next");

    let first = builder.build(&style, &state_at(None)).unwrap();
    assert_eq!(first.params.len(), 2);
    assert_eq!(first.params["api_key"], "k");

    let second = builder
        .build(
            &style,
            &state_at(Some(Cursor::Url("https://api.example.com/items?page=2".into()))),
        )
        .unwrap();
    assert_eq!(second.params.len(), 1);
    assert_eq!(second.params["api_key"], "k");

    let signed = builder
        .build(
            &style,
            &state_at(Some(Cursor::Url("https://api.example.com/items?page=3&api_key=k2".into()))),
        )
        .unwrap();
    assert!(signed.params.is_empty());
}

#[test]
fn test_base_query_overrides_credentials() {
    let builder = RequestBuilder::new(
        "https://api.example.com/items",
        Method::GET,
        BaseQuery::empty().with("token", "job"),
    )
    .with_auth_query(BaseQuery::empty().with("token", "source"));

    let req = builder.build(&CursorStyle::page_number("page", 1), &state_at(Some(Cursor::Page(1)))).unwrap();
    assert_eq!(req.params["token"], "job");
    assert_eq!(req.params["page"], "1");
}

#[test]
fn test_numeric_style_without_cursor_is_config_error() {
    let builder = RequestBuilder::new("https://api.example.com/items", Method::GET, BaseQuery::empty());
    let err = builder
        .build(&CursorStyle::page_number("page", 1), &state_at(None))
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("page_number"));
}

#[test]
fn test_mismatched_cursor_is_config_error() {
    let builder = RequestBuilder::new("https://api.example.com/items", Method::GET, BaseQuery::empty());
    let err = builder
        .build(&CursorStyle::token("after", "next"), &state_at(Some(Cursor::Page(2))))
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_page_request_host() {
    let req = PageRequest {
        url: "http://127.0.0.1:8080/items?x=1".into(),
        method: Method::GET,
        params: Default::default(),
        headers: Default::default(),
        cursor: None,
    };
    assert_eq!(req.host().unwrap(), "127.0.0.1:8080");

    let req = PageRequest {
        url: "https://api.statuspage.io/v1/pages".into(),
        ..req
    };
    assert_eq!(req.host().unwrap(), "api.statuspage.io");
}
