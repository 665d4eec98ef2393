//! Validation contract
//!
//! Models do not validate themselves. A [`Validator`] is an external
//! collaborator (schema checks, terminology lookups, remote services) that
//! receives the canonical JSON of an instance and reports an aggregated
//! [`ValidationOutcome`]. `ferrum-validator` ships one implementation.

use crate::error::{Error, Result};
use crate::model::FhirModel;
use async_trait::async_trait;
use serde_json::Value;

/// Anything that can judge a canonical resource.
///
/// Implementations own their timeout and retry policy; callers only await.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, resource: &Value) -> ValidationOutcome;
}

#[async_trait]
impl<V: Validator + ?Sized> Validator for std::sync::Arc<V> {
    async fn validate(&self, resource: &Value) -> ValidationOutcome {
        (**self).validate(resource).await
    }
}

/// Validation capability of a model.
#[async_trait]
pub trait Validatable: Sync {
    /// Run `validator` over the canonical form of `self`.
    async fn validate_with<V: Validator + ?Sized>(&self, validator: &V) -> Result<ValidationOutcome>;

    /// Like [`Validatable::validate_with`], but a failed outcome becomes
    /// [`Error::Validation`].
    async fn ensure_valid<V: Validator + ?Sized>(&self, validator: &V) -> Result<()> {
        let outcome = self.validate_with(validator).await?;
        outcome.into_result()
    }
}

#[async_trait]
impl<M: FhirModel> Validatable for M {
    async fn validate_with<V: Validator + ?Sized>(&self, validator: &V) -> Result<ValidationOutcome> {
        let resource = self.to_value()?;
        let outcome = validator.validate(&resource).await;
        tracing::debug!(
            type_name = M::table().type_name(),
            valid = outcome.valid,
            issues = outcome.issues.len(),
            "validated model"
        );
        Ok(outcome)
    }
}

/// Validation result for a single resource
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub resource_type: Option<String>,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn success(resource_type: Option<String>) -> Self {
        Self {
            resource_type,
            valid: true,
            issues: Vec::new(),
        }
    }

    /// Build an outcome from collected issues; valid unless one of them is
    /// an error or fatal.
    pub fn from_issues(resource_type: Option<String>, issues: Vec<ValidationIssue>) -> Self {
        let valid = !issues.iter().any(ValidationIssue::is_error);
        Self {
            resource_type,
            valid,
            issues,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    /// One-line description used by [`Error::Validation`].
    pub fn summary(&self) -> String {
        let subject = self.resource_type.as_deref().unwrap_or("resource");
        let mut summary = format!(
            "Validation of {} failed with {} error(s) and {} warning(s)",
            subject,
            self.error_count(),
            self.warning_count()
        );
        if let Some(first) = self.issues.iter().find(|i| i.is_error()) {
            summary.push_str(": ");
            if let Some(ref location) = first.location {
                summary.push_str(location);
                summary.push_str(": ");
            }
            summary.push_str(&first.diagnostics);
        }
        summary
    }

    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }

    pub fn to_operation_outcome(&self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(|i| i.to_json()).collect::<Vec<_>>()
        })
    }
}

/// Individual validation issue
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    pub location: Option<String>,
    pub expression: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn new(severity: IssueSeverity, code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            diagnostics: diagnostics.into(),
            location: None,
            expression: None,
        }
    }

    pub fn error(code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }

    pub fn warning(code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, code, diagnostics)
    }

    pub fn information(code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Information, code, diagnostics)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_expression(mut self, expression: Vec<String>) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, IssueSeverity::Error | IssueSeverity::Fatal)
    }

    pub fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.to_string().to_lowercase(),
            "code": self.code.to_string(),
            "diagnostics": self.diagnostics,
        });

        if let Some(ref loc) = self.location {
            issue["location"] = serde_json::json!([loc]);
        }

        if let Some(ref expr) = self.expression {
            issue["expression"] = serde_json::json!(expr);
        }

        issue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal => write!(f, "Fatal"),
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Information => write!(f, "Information"),
        }
    }
}

/// FHIR `IssueType` codes produced by model validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    Invalid,
    Structure,
    Required,
    Value,
    Invariant,
    NotSupported,
    NotFound,
    CodeInvalid,
    Extension,
    BusinessRule,
    Conflict,
    Exception,
    Timeout,
    Incomplete,
    Informational,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::Structure => "structure",
            Self::Required => "required",
            Self::Value => "value",
            Self::Invariant => "invariant",
            Self::NotSupported => "not-supported",
            Self::NotFound => "not-found",
            Self::CodeInvalid => "code-invalid",
            Self::Extension => "extension",
            Self::BusinessRule => "business-rule",
            Self::Conflict => "conflict",
            Self::Exception => "exception",
            Self::Timeout => "timeout",
            Self::Incomplete => "incomplete",
            Self::Informational => "informational",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> ValidationOutcome {
        ValidationOutcome::from_issues(
            Some("Patient".to_string()),
            vec![
                ValidationIssue::warning(IssueCode::Value, "Deprecated code"),
                ValidationIssue::error(IssueCode::Required, "Missing required field")
                    .with_location("Patient.name"),
            ],
        )
    }

    #[test]
    fn test_validation_outcome_operations() {
        let outcome = failed();

        assert!(!outcome.valid);
        assert!(outcome.has_errors());
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.warning_count(), 1);
    }

    #[test]
    fn test_warnings_only_is_valid() {
        let outcome = ValidationOutcome::from_issues(
            None,
            vec![ValidationIssue::warning(IssueCode::Value, "odd")],
        );
        assert!(outcome.valid);
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn test_summary_names_first_error() {
        let summary = failed().summary();
        assert!(summary.starts_with("Validation of Patient failed with 1 error(s)"));
        assert!(summary.ends_with("Patient.name: Missing required field"));
    }

    #[test]
    fn test_into_result_aggregates() {
        let err = failed().into_result().unwrap_err();
        let outcome = err.validation_outcome().unwrap();
        assert_eq!(outcome.issues.len(), 2);
    }

    #[test]
    fn test_operation_outcome_conversion() {
        let outcome = ValidationOutcome::from_issues(
            Some("Patient".to_string()),
            vec![ValidationIssue::error(IssueCode::Required, "name is required")
                .with_location("Patient.name")
                .with_expression(vec!["Patient.name".to_string()])],
        );

        let op_outcome = outcome.to_operation_outcome();
        assert_eq!(op_outcome["resourceType"], "OperationOutcome");
        assert_eq!(op_outcome["issue"][0]["severity"], "error");
        assert_eq!(op_outcome["issue"][0]["code"], "required");
        assert_eq!(op_outcome["issue"][0]["location"][0], "Patient.name");
    }
}
