//! Template interpolation for YAML configs
//!
//! Handles `{{ root.path }}` interpolation in endpoint paths, headers and
//! secrets. Three roots are understood:
//!
//! - `parent` - fields of the parent record a child job was derived from
//! - `vars` - run variables (`--var workspace=acme`)
//! - `env` - process environment variables, for secrets

use crate::error::{Error, Result};
use crate::pagination::lookup_path;
use crate::types::StringMap;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ root.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z0-9_\-]+)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Parent record, for child jobs
    pub parent: Option<Value>,
    /// Run variables
    pub vars: StringMap,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with run variables
    pub fn with_vars(vars: StringMap) -> Self {
        Self {
            vars,
            ..Default::default()
        }
    }

    /// Set the parent record
    #[must_use]
    pub fn with_parent(mut self, parent: Value) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Resolve a variable path (e.g., "parent.slug", "env.API_TOKEN")
    pub fn get(&self, path: &str) -> Option<String> {
        let (root, rest) = path.split_once('.')?;
        match root {
            "parent" => self
                .parent
                .as_ref()
                .and_then(|parent| lookup_path(parent, rest))
                .and_then(value_to_string),
            "vars" => self.vars.get(rest).cloned(),
            "env" => std::env::var(rest).ok(),
            _ => None,
        }
    }
}

/// Render a template string with the given context.
///
/// Every undefined variable is reported in a single error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &Captures<'_>| {
        let var_path = &cap[1];
        ctx.get(var_path).unwrap_or_else(|| {
            missing.push(var_path.to_string());
            String::new()
        })
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Render every value of a string map
pub fn render_map(map: &StringMap, ctx: &TemplateContext) -> Result<StringMap> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), render(value, ctx)?)))
        .collect()
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Check that a template only references known roots
pub fn check_roots(template: &str) -> Result<()> {
    for var in extract_variables(template) {
        let root = var.split('.').next().unwrap_or_default();
        if !matches!(root, "parent" | "vars" | "env") || !var.contains('.') {
            return Err(Error::template(format!(
                "'{{{{ {var} }}}}' must start with parent., vars. or env."
            )));
        }
    }
    Ok(())
}

/// Convert a scalar JSON value to a string for substitution
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> StringMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_vars_substitution() {
        let ctx = TemplateContext::with_vars(vars(&[("workspace", "acme")]));
        let result = render("repositories/{{ vars.workspace }}", &ctx).unwrap();
        assert_eq!(result, "repositories/acme");
    }

    #[test]
    fn test_parent_nested_value() {
        let ctx = TemplateContext::new().with_parent(json!({
            "id": 42,
            "project": {"name": "Core"}
        }));
        let result = render("{{parent.project.name}}/_apis/git/repositories/{{ parent.id }}", &ctx).unwrap();
        assert_eq!(result, "Core/_apis/git/repositories/42");
    }

    #[test]
    fn test_env_lookup() {
        std::env::set_var("FETCHKIT_TEMPLATE_TEST_TOKEN", "s3cret");
        let result = render("Bearer {{ env.FETCHKIT_TEMPLATE_TEST_TOKEN }}", &TemplateContext::new()).unwrap();
        assert_eq!(result, "Bearer s3cret");
    }

    #[test]
    fn test_undefined_variables_are_all_reported() {
        let err = render("{{ vars.a }}/{{ parent.id }}", &TemplateContext::new()).unwrap_err();
        match err {
            Error::UndefinedVariable { variable } => assert_eq!(variable, "vars.a, parent.id"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_scalar_parent_field_is_undefined() {
        let ctx = TemplateContext::new().with_parent(json!({"links": {"self": "x"}}));
        assert!(render("{{ parent.links }}", &ctx).is_err());
    }

    #[test]
    fn test_no_templates() {
        let result = render("plain/path", &TemplateContext::new()).unwrap();
        assert_eq!(result, "plain/path");
        assert!(!has_templates("plain/path"));
        assert!(has_templates("{{ vars.x }}"));
    }

    #[test]
    fn test_extract_variables_and_roots() {
        assert_eq!(
            extract_variables("{{ vars.org }}/{{ parent.slug }}"),
            vec!["vars.org", "parent.slug"]
        );
        assert!(check_roots("{{ vars.org }}/{{ env.HOME }}").is_ok());
        assert!(check_roots("{{ config.api_key }}").is_err());
        assert!(check_roots("{{ workspace }}").is_err());
    }

    #[test]
    fn test_render_map() {
        let ctx = TemplateContext::with_vars(vars(&[("org", "acme")]));
        let rendered = render_map(&vars(&[("X-Org", "{{ vars.org }}")]), &ctx).unwrap();
        assert_eq!(rendered["X-Org"], "acme");
    }
}
