use crate::config::ValidatorConfig;
use crate::plan::{PrimitivesPlan, SchemaPlan, Step, TerminologyPlan, ValidationPlan};
use crate::terminology::{InMemoryTerminology, TerminologyService};
use crate::ConfigError;
use async_trait::async_trait;
use ferrum_models::{SchemaRegistry, ValidationIssue, ValidationOutcome};
use serde_json::Value;
use std::sync::Arc;

/// Reusable validator - owns plan, schema registry and terminology service
pub struct SchemaValidator<T: TerminologyService = InMemoryTerminology> {
    plan: ValidationPlan,
    registry: Arc<SchemaRegistry>,
    terminology: Arc<T>,
}

impl SchemaValidator<InMemoryTerminology> {
    /// Validator with an empty in-memory terminology.
    pub fn new(plan: ValidationPlan, registry: SchemaRegistry) -> Self {
        Self::with_terminology(plan, registry, InMemoryTerminology::new())
    }
}

impl<T: TerminologyService> SchemaValidator<T> {
    pub fn with_terminology(plan: ValidationPlan, registry: SchemaRegistry, terminology: T) -> Self {
        Self {
            plan,
            registry: Arc::new(registry),
            terminology: Arc::new(terminology),
        }
    }

    pub fn from_config(
        config: &ValidatorConfig,
        registry: SchemaRegistry,
        terminology: T,
    ) -> Result<Self, ConfigError> {
        let plan = config.compile()?;
        Ok(Self::with_terminology(plan, registry, terminology))
    }

    pub async fn validate(&self, resource: &Value) -> ValidationOutcome {
        ValidationRun::new(
            &self.plan,
            &self.registry,
            self.terminology.as_ref(),
            resource,
        )
        .execute()
        .await
    }

    pub async fn validate_batch(&self, resources: &[Value]) -> Vec<ValidationOutcome> {
        let mut outcomes = Vec::with_capacity(resources.len());
        for resource in resources {
            outcomes.push(self.validate(resource).await);
        }
        outcomes
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn terminology(&self) -> &Arc<T> {
        &self.terminology
    }
}

#[async_trait]
impl<T: TerminologyService> ferrum_models::Validator for SchemaValidator<T> {
    async fn validate(&self, resource: &Value) -> ValidationOutcome {
        SchemaValidator::validate(self, resource).await
    }
}

/// Short-lived validation execution
struct ValidationRun<'a, T: TerminologyService> {
    plan: &'a ValidationPlan,
    registry: &'a SchemaRegistry,
    terminology: &'a T,
    resource: &'a Value,
    issues: Vec<ValidationIssue>,
}

impl<'a, T: TerminologyService> ValidationRun<'a, T> {
    fn new(
        plan: &'a ValidationPlan,
        registry: &'a SchemaRegistry,
        terminology: &'a T,
        resource: &'a Value,
    ) -> Self {
        Self {
            plan,
            registry,
            terminology,
            resource,
            issues: Vec::new(),
        }
    }

    async fn execute(mut self) -> ValidationOutcome {
        for step in &self.plan.steps {
            if self.plan.fail_fast && self.has_errors() {
                tracing::debug!(step = step.name(), "fail_fast: skipping remaining steps");
                break;
            }

            if self.issues.len() >= self.plan.max_issues {
                break;
            }

            let before = self.issues.len();
            self.execute_step(step).await;
            tracing::debug!(
                step = step.name(),
                issues = self.issues.len() - before,
                "validation step finished"
            );
        }

        self.issues.truncate(self.plan.max_issues);
        ValidationOutcome::from_issues(self.get_resource_type(), self.issues)
    }

    async fn execute_step(&mut self, step: &Step) {
        match step {
            Step::Schema(plan) => self.validate_schema(plan),
            Step::Primitives(plan) => self.validate_primitives(plan),
            Step::Terminology(plan) => self.validate_terminology(plan).await,
        }
    }

    fn validate_schema(&mut self, plan: &SchemaPlan) {
        crate::steps::schema::validate_schema(self.resource, plan, self.registry, &mut self.issues);
    }

    fn validate_primitives(&mut self, plan: &PrimitivesPlan) {
        crate::steps::primitives::validate_primitives(
            self.resource,
            plan,
            self.registry,
            &mut self.issues,
        );
    }

    async fn validate_terminology(&mut self, plan: &TerminologyPlan) {
        crate::steps::terminology::validate_terminology(
            self.resource,
            plan,
            self.registry,
            self.terminology,
            &mut self.issues,
        )
        .await;
    }

    fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    fn get_resource_type(&self) -> Option<String> {
        self.resource
            .get("resourceType")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Preset, TerminologyMode};
    use ferrum_models::IssueCode;
    use serde_json::json;

    fn validator(config: ValidatorConfig) -> SchemaValidator {
        let terminology =
            InMemoryTerminology::new().with_code("http://loinc.org", "29463-7", Some("Body weight"));
        SchemaValidator::from_config(&config, SchemaRegistry::builtin(), terminology).unwrap()
    }

    #[tokio::test]
    async fn test_valid_observation() {
        let v = validator(ValidatorConfig::preset(Preset::Authoring));
        let outcome = v
            .validate(&json!({
                "resourceType": "Observation",
                "status": "final",
                "code": {"coding": [{"system": "http://loinc.org", "code": "29463-7"}]},
                "valueQuantity": {"value": 72, "unit": "kg"},
                "effectiveDateTime": "2024-03-01T08:00:00Z"
            }))
            .await;
        assert!(outcome.valid, "{}", outcome.summary());
        assert_eq!(outcome.resource_type.as_deref(), Some("Observation"));
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_first_failing_step() {
        let resource = json!({"resourceType": "Patient", "bogus": 1, "active": "yes"});

        let all = validator(ValidatorConfig::builder().fail_fast(false).build());
        let outcome = all.validate(&resource).await;
        assert_eq!(outcome.error_count(), 2);

        let fast = validator(ValidatorConfig::builder().fail_fast(true).build());
        let outcome = fast.validate(&resource).await;
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.issues[0].code, IssueCode::Structure);
    }

    #[tokio::test]
    async fn test_max_issues_truncates() {
        let v = validator(ValidatorConfig::builder().max_issues(2).build());
        let outcome = v
            .validate(&json!({"resourceType": "Patient", "a": 1, "b": 2, "c": 3}))
            .await;
        assert_eq!(outcome.issues.len(), 2);
        assert!(!outcome.valid);
    }

    #[tokio::test]
    async fn test_terminology_step_runs_when_enabled() {
        let resource = json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "nope"}]}
        });

        let without = validator(ValidatorConfig::default());
        assert!(without.validate(&resource).await.valid);

        let with = validator(
            ValidatorConfig::builder()
                .terminology_mode(TerminologyMode::Local)
                .build(),
        );
        let outcome = with.validate(&resource).await;
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.issues[0].code, IssueCode::CodeInvalid);
    }

    #[tokio::test]
    async fn test_batch_and_trait_object() {
        let v = Arc::new(validator(ValidatorConfig::default()));
        let outcomes = v
            .validate_batch(&[
                json!({"resourceType": "Patient"}),
                json!({"resourceType": "Nope"}),
            ])
            .await;
        assert!(outcomes[0].valid);
        assert!(!outcomes[1].valid);

        let dynamic: Arc<dyn ferrum_models::Validator> = v;
        let outcome = dynamic.validate(&json!({"resourceType": "Patient"})).await;
        assert!(outcome.valid);
    }
}
