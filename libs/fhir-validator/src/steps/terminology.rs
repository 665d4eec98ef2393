//! Terminology validation
//!
//! Every `Coding` carrying both `system` and `code` is looked up in the
//! configured [`TerminologyService`], one lookup at a time, each bounded by
//! the plan's timeout.

use super::{root, walk, Visitor};
use crate::config::{TimeoutPolicy, UnknownSystemPolicy};
use crate::plan::TerminologyPlan;
use crate::terminology::{CodeLookup, TerminologyService};
use ferrum_models::{IssueCode, PropertyTable, SchemaRegistry, ValidationIssue};
use serde_json::{Map, Value};

/// A coding found in the resource, with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingRef {
    pub path: String,
    pub system: String,
    pub code: String,
    pub display: Option<String>,
}

/// Codings of `resource` that name both a system and a code.
pub fn collect_codings(resource: &Value, registry: &SchemaRegistry) -> Vec<CodingRef> {
    let Some((table, object)) = root(registry, resource) else {
        return Vec::new();
    };
    let mut collector = CodingCollector::default();
    walk(registry, table, object, table.type_name(), &mut collector);
    collector.codings
}

pub async fn validate_terminology<T: TerminologyService + ?Sized>(
    resource: &Value,
    plan: &TerminologyPlan,
    registry: &SchemaRegistry,
    service: &T,
    issues: &mut Vec<ValidationIssue>,
) {
    for coding in collect_codings(resource, registry) {
        let lookup = tokio::time::timeout(plan.timeout, service.lookup(&coding.system, &coding.code));
        match lookup.await {
            Err(_) => {
                tracing::warn!(
                    system = %coding.system,
                    code = %coding.code,
                    timeout_ms = plan.timeout.as_millis() as u64,
                    "terminology lookup timed out"
                );
                let message = format!(
                    "Terminology lookup for '{}|{}' timed out",
                    coding.system, coding.code
                );
                let issue = match plan.on_timeout {
                    TimeoutPolicy::Ignore => None,
                    TimeoutPolicy::Warn => Some(ValidationIssue::warning(IssueCode::Timeout, message)),
                    TimeoutPolicy::Error => Some(ValidationIssue::error(IssueCode::Timeout, message)),
                };
                push(issues, issue, &coding.path);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "terminology lookup failed");
                let issue = ValidationIssue::warning(
                    IssueCode::Exception,
                    format!("Could not check '{}|{}': {}", coding.system, coding.code, e),
                );
                push(issues, Some(issue), &coding.path);
            }
            Ok(Ok(CodeLookup::UnknownSystem)) => {
                let message = format!("Code system '{}' is not known", coding.system);
                let issue = match plan.unknown_system {
                    UnknownSystemPolicy::Ignore => None,
                    UnknownSystemPolicy::Warn => {
                        Some(ValidationIssue::warning(IssueCode::NotFound, message))
                    }
                    UnknownSystemPolicy::Error => {
                        Some(ValidationIssue::error(IssueCode::NotFound, message))
                    }
                };
                push(issues, issue, &format!("{}.system", coding.path));
            }
            Ok(Ok(CodeLookup::NotFound)) => {
                let issue = ValidationIssue::error(
                    IssueCode::CodeInvalid,
                    format!(
                        "Unknown code '{}' in system '{}'",
                        coding.code, coding.system
                    ),
                );
                push(issues, Some(issue), &format!("{}.code", coding.path));
            }
            Ok(Ok(CodeLookup::Found { display })) => {
                let mismatch = match (&coding.display, &display) {
                    (Some(given), Some(expected)) => !given.eq_ignore_ascii_case(expected),
                    _ => false,
                };
                if plan.check_display && mismatch {
                    let issue = ValidationIssue::warning(
                        IssueCode::Value,
                        format!(
                            "Display '{}' for code '{}' does not match '{}'",
                            coding.display.as_deref().unwrap_or_default(),
                            coding.code,
                            display.as_deref().unwrap_or_default()
                        ),
                    );
                    push(issues, Some(issue), &format!("{}.display", coding.path));
                }
            }
        }
    }
}

fn push(issues: &mut Vec<ValidationIssue>, issue: Option<ValidationIssue>, path: &str) {
    if let Some(issue) = issue {
        issues.push(
            issue
                .with_location(path)
                .with_expression(vec![path.to_string()]),
        );
    }
}

#[derive(Default)]
struct CodingCollector {
    codings: Vec<CodingRef>,
}

impl Visitor for CodingCollector {
    fn visit_object(&mut self, table: &PropertyTable, object: &Map<String, Value>, path: &str) {
        if table.type_name() != "Coding" {
            return;
        }
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        if let (Some(system), Some(code)) = (text("system"), text("code")) {
            self.codings.push(CodingRef {
                path: path.to_string(),
                system,
                code,
                display: text("display"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminologyMode;
    use crate::error::TerminologyError;
    use crate::terminology::InMemoryTerminology;
    use async_trait::async_trait;
    use ferrum_models::IssueSeverity;
    use serde_json::json;
    use std::time::Duration;

    fn plan() -> TerminologyPlan {
        TerminologyPlan {
            mode: TerminologyMode::Local,
            timeout: Duration::from_millis(200),
            on_timeout: TimeoutPolicy::Warn,
            unknown_system: UnknownSystemPolicy::Warn,
            check_display: true,
        }
    }

    fn observation() -> Value {
        json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [
                {"system": "http://loinc.org", "code": "29463-7", "display": "Weight"},
                {"system": "http://loinc.org", "code": "0000-0"},
                {"system": "urn:local", "code": "w"},
                {"code": "no-system"}
            ]}
        })
    }

    fn loinc() -> InMemoryTerminology {
        InMemoryTerminology::new().with_code("http://loinc.org", "29463-7", Some("Body weight"))
    }

    #[test]
    fn test_collect_codings() {
        let registry = SchemaRegistry::builtin();
        let codings = collect_codings(&observation(), &registry);
        assert_eq!(codings.len(), 3);
        assert_eq!(codings[0].path, "Observation.code.coding[0]");
        assert_eq!(codings[0].display.as_deref(), Some("Weight"));
    }

    #[tokio::test]
    async fn test_lookup_outcomes() {
        let registry = SchemaRegistry::builtin();
        let mut issues = Vec::new();
        validate_terminology(&observation(), &plan(), &registry, &loinc(), &mut issues).await;

        let summary: Vec<_> = issues
            .iter()
            .map(|i| (i.severity, i.code, i.location.clone().unwrap_or_default()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (
                    IssueSeverity::Warning,
                    IssueCode::Value,
                    "Observation.code.coding[0].display".to_string()
                ),
                (
                    IssueSeverity::Error,
                    IssueCode::CodeInvalid,
                    "Observation.code.coding[1].code".to_string()
                ),
                (
                    IssueSeverity::Warning,
                    IssueCode::NotFound,
                    "Observation.code.coding[2].system".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_system_policy() {
        let registry = SchemaRegistry::builtin();
        let mut strict = plan();
        strict.unknown_system = UnknownSystemPolicy::Error;
        strict.check_display = false;

        let mut issues = Vec::new();
        validate_terminology(&observation(), &strict, &registry, &loinc(), &mut issues).await;
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(ValidationIssue::is_error));
    }

    struct Slow;

    #[async_trait]
    impl TerminologyService for Slow {
        async fn lookup(&self, _system: &str, _code: &str) -> Result<CodeLookup, TerminologyError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CodeLookup::NotFound)
        }
    }

    struct Down;

    #[async_trait]
    impl TerminologyService for Down {
        async fn lookup(&self, _system: &str, _code: &str) -> Result<CodeLookup, TerminologyError> {
            Err(TerminologyError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_timeout_policy() {
        let registry = SchemaRegistry::builtin();
        let resource = json!({
            "resourceType": "Observation",
            "code": {"coding": [{"system": "http://loinc.org", "code": "1"}]}
        });

        let mut fast = plan();
        fast.timeout = Duration::from_millis(10);
        let mut issues = Vec::new();
        validate_terminology(&resource, &fast, &registry, &Slow, &mut issues).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Timeout);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);

        fast.on_timeout = TimeoutPolicy::Ignore;
        let mut issues = Vec::new();
        validate_terminology(&resource, &fast, &registry, &Slow, &mut issues).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_is_warning() {
        let registry = SchemaRegistry::builtin();
        let mut issues = Vec::new();
        validate_terminology(&observation(), &plan(), &registry, &Down, &mut issues).await;
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.code == IssueCode::Exception && !i.is_error()));
    }
}
