//! Tests for the registry module

use super::*;
use crate::error::Error;
use crate::pagination::{CursorStyle, EmptyPagePolicy, PaginationConfig};
use crate::partition::PartitionConfig;
use crate::types::Method;
use pretty_assertions::assert_eq;

crate::resource_kinds! {
    /// Kinds used by these tests
    enum TestKind {
        Repository => "repository",
        PullRequest => "pull_request",
    }
}

fn registry() -> ResourceRegistry {
    ResourceRegistry::new()
        .with_endpoint(
            "repository",
            Endpoint::new(
                "repositories/{{ vars.workspace }}",
                PaginationConfig::new(CursorStyle::next_url("next")).with_items_path("values"),
            ),
        )
        .with_endpoint(
            "pull_request",
            Endpoint::new(
                "repositories/{{ vars.workspace }}/{{ parent.slug }}/pullrequests",
                PaginationConfig::new(CursorStyle::next_url("next")).with_items_path("values"),
            ),
        )
}

#[test]
fn test_kind_ids_round_trip() {
    assert_eq!(TestKind::ALL.len(), 2);
    assert_eq!(TestKind::PullRequest.as_str(), "pull_request");
    assert_eq!(TestKind::PullRequest.to_string(), "pull_request");
    assert_eq!(TestKind::from_id("repository"), Some(TestKind::Repository));
    assert_eq!(TestKind::from_id("team"), None);

    let err = "team".parse::<TestKind>().unwrap_err();
    assert!(matches!(err, Error::UnknownResourceKind { ref kind } if kind == "team"));
}

#[test]
fn test_endpoint_lookup() {
    let registry = registry();
    assert_eq!(registry.len(), 2);
    assert!(registry.endpoint("repository").is_ok());
    assert!(matches!(
        registry.endpoint("commit"),
        Err(Error::UnknownResourceKind { .. })
    ));
    assert_eq!(
        registry.kinds().collect::<Vec<_>>(),
        vec!["pull_request", "repository"]
    );
}

#[test]
fn test_validate_kinds_reports_missing() {
    assert!(registry().validate_kinds::<TestKind>().is_ok());

    let partial = ResourceRegistry::new().with_endpoint(
        "repository",
        Endpoint::new("repositories", PaginationConfig::default()),
    );
    let err = partial.validate_kinds::<TestKind>().unwrap_err();
    assert!(err.to_string().contains("pull_request"));
}

#[test]
fn test_validate_checks_every_endpoint() {
    assert!(registry().validate().is_ok());

    let bad = registry().with_endpoint(
        "commit",
        Endpoint::new(
            "commits",
            PaginationConfig::new(CursorStyle::page_number("page", 1))
                .with_empty_page(EmptyPagePolicy::Continue),
        ),
    );
    let err = bad.validate().unwrap_err();
    assert!(err.to_string().contains("resource 'commit'"));

    let bad_root = ResourceRegistry::new().with_endpoint(
        "x",
        Endpoint::new("{{ config.path }}", PaginationConfig::default()),
    );
    assert!(bad_root.validate().is_err());
}

#[test]
fn test_endpoint_from_yaml() {
    let yaml = r"
path: _apis/git/repositories
query:
  api-version: '7.1'
items_path: value
cursor:
  type: offset
  offset_param: $skip
  limit_param: $top
  limit: 100
max_pages: 50
";
    let endpoint: Endpoint = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(endpoint.method, Method::GET);
    assert_eq!(endpoint.base_query.get("api-version"), Some("7.1"));
    assert_eq!(endpoint.pagination.items_path.as_deref(), Some("value"));
    assert_eq!(endpoint.pagination.max_pages, Some(50));
    assert_eq!(
        endpoint.pagination.cursor,
        CursorStyle::offset("$skip", "$top", 100)
    );
    assert!(endpoint.validate().is_ok());
}

#[test]
fn test_post_endpoint_from_yaml() {
    let yaml = "path: search\nmethod: POST\n";
    let endpoint: Endpoint = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(endpoint.method, Method::POST);
    assert_eq!(endpoint.pagination.cursor, CursorStyle::Single);
}

#[test]
fn test_partitioned_endpoint_from_yaml() {
    let yaml = r"
path: '{{ parent.project.name }}/_apis/git/repositories/{{ parent.id }}/pullrequests'
partition:
  type: parent
  kind: repository
  disabled_path: isDisabled
items_path: value
";
    let endpoint: Endpoint = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        endpoint.partition.as_ref().and_then(PartitionConfig::parent_kind),
        Some("repository")
    );
    assert!(endpoint.validate().is_ok());
}

#[test]
fn test_lineage_orders_parents_first() {
    let parent = |kind: &str| PartitionConfig::Parent {
        kind: kind.to_string(),
        id_path: "id".into(),
        disabled_path: None,
        param: None,
    };
    let registry = ResourceRegistry::new()
        .with_endpoint("project", Endpoint::new("projects", PaginationConfig::default()))
        .with_endpoint(
            "repository",
            Endpoint::new("{{ parent.id }}/repos", PaginationConfig::default()).with_partition(parent("project")),
        )
        .with_endpoint(
            "pull_request",
            Endpoint::new("{{ parent.id }}/prs", PaginationConfig::default()).with_partition(parent("repository")),
        );

    assert!(registry.validate().is_ok());
    assert_eq!(registry.lineage("pull_request").unwrap(), vec!["project", "repository"]);
    assert!(registry.lineage("project").unwrap().is_empty());

    let cyclic = registry.with_endpoint(
        "project",
        Endpoint::new("projects", PaginationConfig::default()).with_partition(parent("pull_request")),
    );
    assert!(cyclic.lineage("pull_request").unwrap_err().is_config());
    assert!(cyclic.validate().is_err());
}

#[test]
fn test_lineage_unknown_parent() {
    let registry = ResourceRegistry::new().with_endpoint(
        "pull_request",
        Endpoint::new("prs", PaginationConfig::default()).with_partition(PartitionConfig::Parent {
            kind: "repository".into(),
            id_path: "id".into(),
            disabled_path: None,
            param: None,
        }),
    );
    assert!(matches!(
        registry.lineage("pull_request"),
        Err(Error::UnknownResourceKind { .. })
    ));
}
