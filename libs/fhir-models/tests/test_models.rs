use async_trait::async_trait;
use ferrum_models::datatypes::{
    CodeableConcept, Coding, Extension, ExtensionValue, HumanName, Narrative, Quantity,
};
use ferrum_models::resources::{
    Observation, ObservationBuilder, ObservationValue, Patient, PatientBuilder,
};
use ferrum_models::{
    ChoiceType, Error, FhirModel, HasExtensions, HasId, IssueCode, Validatable, ValidationIssue,
    ValidationOutcome, Validator,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect()
}

#[test]
fn test_patient_active_before_name() {
    let patient = Patient::builder()
        .add_to_array("name", json!({"family": "Smith"}))
        .set("active", true)
        .build()
        .unwrap();

    let json = patient.to_value().unwrap();
    assert_eq!(
        json,
        json!({"resourceType": "Patient", "active": true, "name": [{"family": "Smith"}]})
    );
    assert_eq!(keys(&json), vec!["resourceType", "active", "name"]);
}

#[test]
fn test_choice_uri_then_canonical_keeps_canonical() {
    let siblings_of_uri = ExtensionValue::VARIANTS
        .iter()
        .filter(|key| **key != "valueUri")
        .copied()
        .collect::<Vec<_>>();
    let siblings_of_canonical = ExtensionValue::VARIANTS
        .iter()
        .filter(|key| **key != "valueCanonical")
        .copied()
        .collect::<Vec<_>>();

    let ext = Extension::builder()
        .set("url", "http://example.org/source")
        .set_choice_variant("valueUri", "http://x", &siblings_of_uri)
        .set_choice_variant("valueCanonical", "y", &siblings_of_canonical)
        .build()
        .unwrap();

    let json = ext.to_value().unwrap();
    assert_eq!(json["valueCanonical"], "y");
    assert!(json.get("valueUri").is_none());
    assert_eq!(keys(&json), vec!["url", "valueCanonical"]);
}

#[test]
fn test_typed_choice_switch() {
    let ext = Extension::builder()
        .set_choice(ExtensionValue::Uri("http://x".to_string()))
        .set_choice(ExtensionValue::Canonical("y".to_string()))
        .build()
        .unwrap();
    assert_eq!(ext.value, Some(ExtensionValue::Canonical("y".to_string())));
}

#[test]
fn test_unknown_key_dropped() {
    let patient = Patient::from_value(json!({"active": true, "favouriteColour": "blue"})).unwrap();
    let json = patient.to_value().unwrap();
    assert_eq!(json["active"], true);
    assert!(json.get("favouriteColour").is_none());
}

#[test]
fn test_with_does_not_touch_receiver() {
    let patient = PatientBuilder::new()
        .active(true)
        .add_name(HumanName::family("Smith"))
        .build()
        .unwrap();
    let before = patient.to_value().unwrap();

    let updated = patient
        .with(object(json!({"active": false, "gender": "female"})))
        .unwrap();

    assert_eq!(patient.to_value().unwrap(), before);
    assert_eq!(updated.active, Some(false));
    assert_eq!(updated.gender.as_deref(), Some("female"));
    assert_eq!(updated.name, patient.name);
}

#[test]
fn test_with_replaces_arrays_wholesale() {
    let patient = PatientBuilder::new()
        .add_name(HumanName::family("Smith").with_given("Jane"))
        .add_name(HumanName::family("Jones"))
        .build()
        .unwrap();

    let updated = patient.with(object(json!({"name": [{"family": "Doe"}]}))).unwrap();
    assert_eq!(updated.name, Some(vec![HumanName::family("Doe")]));
}

#[test]
fn test_with_switches_choice_variant() {
    let observation = ObservationBuilder::new()
        .status("final")
        .value(ObservationValue::String("high".to_string()))
        .build()
        .unwrap();

    let updated = observation
        .with(object(json!({"valueQuantity": {"value": 7, "unit": "mmol/L"}})))
        .unwrap();
    assert!(matches!(updated.value, Some(ObservationValue::Quantity(_))));
}

#[test]
fn test_apply_transform_sees_view() {
    let patient = PatientBuilder::new().active(true).build().unwrap();

    let flipped = patient
        .apply_transform(|view| {
            let active = view.get("active").and_then(Value::as_bool).unwrap_or(false);
            object(json!({"active": !active}))
        })
        .unwrap();

    assert_eq!(flipped.active, Some(false));
    assert_eq!(patient.active, Some(true));
}

#[test]
fn test_clone_is_independent() {
    let original = PatientBuilder::new()
        .add_name(HumanName::family("Smith"))
        .build()
        .unwrap();
    let mut copy = original.clone();
    assert_eq!(copy.to_value().unwrap(), original.to_value().unwrap());

    copy.name.as_mut().unwrap().push(HumanName::family("Jones"));
    copy.name.as_mut().unwrap()[0].family = Some("Changed".to_string());

    let names = original.name.as_ref().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].family.as_deref(), Some("Smith"));
}

#[test]
fn test_display_is_canonical_json() {
    let patient = PatientBuilder::new().id("p1").active(true).build().unwrap();
    assert_eq!(
        patient.to_string(),
        r#"{"resourceType":"Patient","id":"p1","active":true}"#
    );
}

#[test]
fn test_models_nest_through_serde() {
    let patient = PatientBuilder::new()
        .add_name(HumanName::family("Smith"))
        .build()
        .unwrap();
    let wrapped = serde_json::to_value(vec![patient.clone()]).unwrap();
    assert_eq!(wrapped[0]["resourceType"], "Patient");

    let parsed: Vec<Patient> = serde_json::from_value(wrapped).unwrap();
    assert_eq!(parsed[0], patient);
}

#[test]
fn test_resource_envelope_fields() {
    let mut patient = Patient::from_value(json!({
        "resourceType": "Patient",
        "active": true,
        "text": {"div": "<div xmlns=\"http://www.w3.org/1999/xhtml\">Jane</div>", "status": "generated"},
        "meta": {"lastUpdated": "2024-01-01T00:00:00Z", "versionId": "2"},
        "id": "p1"
    }))
    .unwrap();

    patient.add_extension(Extension::new(
        "http://example.org/flag",
        ExtensionValue::Boolean(true),
    ));
    assert_eq!(patient.id(), Some("p1"));
    assert!(patient.extension_by_url("http://example.org/flag").is_some());

    let json = patient.to_value().unwrap();
    assert_eq!(
        keys(&json),
        vec!["resourceType", "id", "meta", "text", "extension", "active"]
    );
    assert_eq!(keys(&json["meta"]), vec!["versionId", "lastUpdated"]);
    assert_eq!(keys(&json["text"]), vec!["status", "div"]);
}

#[test]
fn test_contained_resources() {
    let mut observation = ObservationBuilder::new().status("final").build().unwrap();
    let patient = PatientBuilder::new().id("inline").active(true).build().unwrap();
    observation.resource.add_contained(&patient).unwrap();

    let json = observation.to_value().unwrap();
    assert_eq!(json["contained"][0]["resourceType"], "Patient");

    let parsed = Observation::from_value(json).unwrap();
    let contained: Vec<Patient> = parsed.resource.contained_of().unwrap();
    assert_eq!(contained, vec![patient]);
    assert!(parsed.resource.contained_of::<Observation>().unwrap().is_empty());
}

#[test]
fn test_non_object_input() {
    let err = Patient::from_value(json!([1, 2])).unwrap_err();
    assert!(matches!(err, Error::ExpectedObject { found: "array", .. }));

    let err = Patient::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, Error::SerializationError(_)));
}

#[test]
fn test_pretty_output_keeps_order() {
    let observation = ObservationBuilder::new()
        .code(CodeableConcept::from_coding(
            Coding::new("http://loinc.org", "29463-7").with_display("Body weight"),
        ))
        .status("final")
        .value(ObservationValue::Quantity(Quantity::ucum(72, "kg")))
        .build()
        .unwrap();

    let pretty = observation.to_json_pretty().unwrap();
    let status = pretty.find("\"status\"").unwrap();
    let code = pretty.find("\"code\"").unwrap();
    let value = pretty.find("\"valueQuantity\"").unwrap();
    assert!(status < code && code < value);
}

#[test]
fn test_to_builder_roundtrip() {
    let patient = PatientBuilder::new().active(true).build().unwrap();
    let rebuilt = patient
        .to_builder()
        .unwrap()
        .set("gender", "other")
        .build()
        .unwrap();
    assert_eq!(rebuilt.active, Some(true));
    assert_eq!(rebuilt.gender.as_deref(), Some("other"));
}

/// Rejects patients without a name; counts how often it ran.
#[derive(Default)]
struct RequireName {
    calls: AtomicUsize,
}

#[async_trait]
impl Validator for RequireName {
    async fn validate(&self, resource: &Value) -> ValidationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut issues = Vec::new();
        if resource.get("name").is_none() {
            issues.push(
                ValidationIssue::error(IssueCode::Required, "name is required")
                    .with_location("Patient.name"),
            );
        }
        if resource.get("gender").is_none() {
            issues.push(ValidationIssue::warning(IssueCode::Incomplete, "gender missing"));
        }
        ValidationOutcome::from_issues(resource_type, issues)
    }
}

#[tokio::test]
async fn test_build_validated_success() {
    let validator = RequireName::default();
    let patient = PatientBuilder::new()
        .add_name(HumanName::family("Smith"))
        .build_validated(&validator)
        .await
        .unwrap();

    assert_eq!(patient.name.as_ref().map(Vec::len), Some(1));
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_build_validated_aggregates_failure() {
    let validator = RequireName::default();
    let err = PatientBuilder::new()
        .active(true)
        .build_validated(&validator)
        .await
        .unwrap_err();

    let outcome = err.validation_outcome().expect("validation error");
    assert_eq!(outcome.error_count(), 1);
    assert_eq!(outcome.warning_count(), 1);
    assert!(err.to_string().contains("Patient.name: name is required"));
}

#[tokio::test]
async fn test_build_validated_skips_validator_on_build_error() {
    let validator = RequireName::default();
    let result = Patient::builder()
        .set("active", "not a boolean")
        .build_validated(&validator)
        .await;

    assert!(matches!(result, Err(Error::InvalidFieldValue { .. })));
    assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_validatable_capability() {
    let validator = RequireName::default();
    let patient = PatientBuilder::new().active(true).build().unwrap();

    let outcome = patient.validate_with(&validator).await.unwrap();
    assert!(!outcome.valid);
    assert!(patient.ensure_valid(&validator).await.is_err());

    let narrative = Narrative::generated("<div xmlns=\"http://www.w3.org/1999/xhtml\"/>");
    assert!(narrative.validate_with(&validator).await.is_ok());
}
