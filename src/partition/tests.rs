//! Tests for partition module

use super::*;
use serde_json::json;

// ============================================================================
// PartitionConfig Tests
// ============================================================================

#[test]
fn test_parse_parent_partition() {
    let yaml = r"
type: parent
kind: repository
id_path: slug
disabled_path: isDisabled
";
    let config: PartitionConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.parent_kind(), Some("repository"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_parent_partition_default_id_path() {
    let config: PartitionConfig = serde_yaml::from_str("type: parent\nkind: project").unwrap();
    match config {
        PartitionConfig::Parent { id_path, .. } => assert_eq!(id_path, "id"),
        PartitionConfig::List { .. } => panic!("expected parent partition"),
    }
}

#[test]
fn test_list_partition_needs_values() {
    let config: PartitionConfig = serde_yaml::from_str("type: list\nparam: componentKeys").unwrap();
    assert!(config.parent_kind().is_none());
    assert!(config.validate().unwrap_err().is_config());
}

// ============================================================================
// ListRouter Tests
// ============================================================================

#[test]
fn test_list_router_one_job_per_value() {
    let router = ListRouter::new("issue", "componentKeys", vec!["web".into(), "api".into(), "web".into()]);

    let jobs = router.jobs().unwrap();
    assert_eq!(router.resource_kind(), "issue");
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, "issue/web");
    assert_eq!(jobs[0].base_query.get("componentKeys"), Some("web"));
    assert_eq!(jobs[0].base_query.len(), 1);
    assert_eq!(jobs[1].base_query.get("componentKeys"), Some("api"));
    assert!(jobs.iter().all(|job| job.parent.is_none()));
}

// ============================================================================
// ParentRouter Tests
// ============================================================================

#[test]
fn test_parent_router_builds_child_jobs() {
    let records = vec![
        json!({"slug": "api", "project": {"name": "core"}}),
        json!({"slug": "web", "project": {"name": "core"}}),
    ];
    let router = ParentRouter::new("pull_request", records, "slug");

    let jobs = router.jobs().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, "pull_request/api");
    let parent = jobs[0].parent.as_ref().unwrap();
    assert_eq!(parent.id, "api");
    assert_eq!(parent.record["project"]["name"], "core");
    assert!(jobs[0].base_query.is_empty());
}

#[test]
fn test_parent_router_nested_and_numeric_ids() {
    let records = vec![json!({"meta": {"id": 7}}), json!({"meta": {"id": 7}}), json!({"meta": {}})];
    let router = ParentRouter::new("build", records, "meta.id").with_param("definitionId");

    let jobs = router.jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "build/7");
    assert_eq!(jobs[0].base_query.get("definitionId"), Some("7"));
}

#[test]
fn test_parent_router_marks_disabled_parents() {
    let records = vec![
        json!({"id": "r1", "isDisabled": false}),
        json!({"id": "r2", "isDisabled": true}),
        json!({"id": "r3"}),
    ];
    let router = ParentRouter::new("pull_request", records, "id").with_disabled_path("isDisabled");

    let eligible: Vec<_> = router
        .jobs()
        .unwrap()
        .into_iter()
        .map(|job| (job.id.clone(), job.is_eligible()))
        .collect();
    assert_eq!(
        eligible,
        vec![
            ("pull_request/r1".to_string(), true),
            ("pull_request/r2".to_string(), false),
            ("pull_request/r3".to_string(), true),
        ]
    );
}

// ============================================================================
// build_router Tests
// ============================================================================

#[test]
fn test_build_router_list_from_var() {
    let config = PartitionConfig::List {
        param: "componentKeys".into(),
        values: vec![],
        from_var: Some("components".into()),
    };
    let vars = [("components".to_string(), "web, api,,".to_string())].into_iter().collect();

    let jobs = build_router("issue", &config, vec![], &vars).unwrap().jobs().unwrap();
    let keys: Vec<_> = jobs.iter().filter_map(|j| j.base_query.get("componentKeys")).collect();
    assert_eq!(keys, vec!["web", "api"]);
}

#[test]
fn test_build_router_missing_var() {
    let config = PartitionConfig::List {
        param: "componentKeys".into(),
        values: vec![],
        from_var: Some("components".into()),
    };
    let err = build_router("issue", &config, vec![], &StringMap::new()).err().unwrap();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
}

#[test]
fn test_build_router_parent() {
    let config = PartitionConfig::Parent {
        kind: "repository".into(),
        id_path: "id".into(),
        disabled_path: Some("isDisabled".into()),
        param: None,
    };
    let records = vec![json!({"id": "a", "isDisabled": true})];
    let jobs = build_router("pull_request", &config, records, &StringMap::new())
        .unwrap()
        .jobs()
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].is_eligible());
}
