use ferrum_models::datatypes::{CodeableConcept, Coding, HumanName, Quantity};
use ferrum_models::resources::{ObservationBuilder, ObservationValue, PatientBuilder};
use ferrum_models::{Error, IssueCode, SchemaRegistry, Validatable};
use ferrum_validator::{
    InMemoryTerminology, Preset, SchemaValidator, TerminologyMode, ValidatorConfig,
};
use serde_json::json;

fn weight() -> CodeableConcept {
    CodeableConcept::from_coding(Coding::new("http://loinc.org", "29463-7"))
}

fn server() -> SchemaValidator {
    let config = ValidatorConfig::builder()
        .preset(Preset::Server)
        .terminology_mode(TerminologyMode::Local)
        .build();
    let terminology =
        InMemoryTerminology::new().with_code("http://loinc.org", "29463-7", Some("Body weight"));
    SchemaValidator::from_config(&config, SchemaRegistry::builtin(), terminology).unwrap()
}

#[tokio::test]
async fn test_build_validated_with_schema_validator() {
    let validator = server();

    let observation = ObservationBuilder::new()
        .status("final")
        .code(weight())
        .value(ObservationValue::Quantity(Quantity::ucum(72, "kg")))
        .build_validated(&validator)
        .await
        .unwrap();
    assert_eq!(observation.status.as_deref(), Some("final"));

    let err = ObservationBuilder::new()
        .status("final")
        .build_validated(&validator)
        .await
        .unwrap_err();
    let outcome = err.validation_outcome().expect("validation failure");
    assert_eq!(outcome.issues[0].code, IssueCode::Required);
    assert_eq!(
        outcome.issues[0].location.as_deref(),
        Some("Observation.code")
    );
}

#[tokio::test]
async fn test_bad_primitive_fails_validation() {
    let validator = server();
    let result = PatientBuilder::new()
        .add_name(HumanName::family("Smith"))
        .birth_date("1970-13-01")
        .build_validated(&validator)
        .await;

    match result {
        Err(Error::Validation(outcome)) => {
            assert_eq!(outcome.error_count(), 1);
            assert_eq!(
                outcome.issues[0].location.as_deref(),
                Some("Patient.birthDate")
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_code_through_model() {
    let validator = server();
    let observation = ObservationBuilder::new()
        .status("final")
        .code(CodeableConcept::from_coding(Coding::new("http://loinc.org", "0000-0")))
        .build()
        .unwrap();

    let outcome = observation.validate_with(&validator).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.issues[0].code, IssueCode::CodeInvalid);
}

#[tokio::test]
async fn test_runtime_registry_types() {
    let tables = r#"[
        {"type": "Device", "envelope": "resource", "properties": [
            {"name": "status", "kind": "scalar", "type": "code", "required": true},
            {"name": "serialNumber", "kind": "scalar", "type": "string"}
        ]}
    ]"#;
    let mut registry = SchemaRegistry::builtin();
    registry.extend(SchemaRegistry::from_json_str(tables).unwrap());

    let plan = ValidatorConfig::default().compile().unwrap();
    let validator = SchemaValidator::new(plan, registry);

    let ok = validator
        .validate(&json!({"resourceType": "Device", "status": "active", "serialNumber": "A1"}))
        .await;
    assert!(ok.valid, "{}", ok.summary());

    let missing = validator
        .validate(&json!({"resourceType": "Device", "serialNumber": 42}))
        .await;
    assert_eq!(missing.error_count(), 2);
}

#[tokio::test]
async fn test_operation_outcome_output() {
    let validator = server();
    let outcome = validator
        .validate(&json!({"resourceType": "Patient", "gender": "not a code "}))
        .await;

    let operation_outcome = outcome.to_operation_outcome();
    assert_eq!(operation_outcome["resourceType"], "OperationOutcome");
    assert_eq!(operation_outcome["issue"][0]["severity"], "error");
    assert_eq!(operation_outcome["issue"][0]["code"], "value");
}
