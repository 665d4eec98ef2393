//! Primitive value formats
//!
//! JSON kind and lexical checks for FHIR primitive types. Values whose type
//! has no rule here (e.g. `xhtml`) are only checked to be strings.
//!
//! A `null` inside a repeating primitive is a placeholder: it is valid only
//! when the parallel `_name` array carries extensions at the same index.

use super::{is_primitive, root, walk, Visitor};
use crate::plan::PrimitivesPlan;
use chrono::{DateTime, NaiveDate, NaiveTime};
use ferrum_models::{IssueCode, PropertyTable, SchemaRegistry, ValidationIssue};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub fn validate_primitives(
    resource: &Value,
    plan: &PrimitivesPlan,
    registry: &SchemaRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    // Unknown or missing resourceType is reported by the schema step.
    let Some((table, object)) = root(registry, resource) else {
        return;
    };
    let mut visitor = PrimitiveVisitor { plan, issues };
    walk(registry, table, object, table.type_name(), &mut visitor);
}

struct PrimitiveVisitor<'a> {
    plan: &'a PrimitivesPlan,
    issues: &'a mut Vec<ValidationIssue>,
}

impl PrimitiveVisitor<'_> {
    fn report(&mut self, message: String, path: String) {
        self.issues.push(
            ValidationIssue::error(IssueCode::Value, message)
                .with_location(path.as_str())
                .with_expression(vec![path]),
        );
    }
}

impl Visitor for PrimitiveVisitor<'_> {
    fn visit_object(&mut self, table: &PropertyTable, object: &Map<String, Value>, path: &str) {
        if !self.plan.check_placeholders {
            return;
        }
        for (key, value) in object {
            let Value::Array(items) = value else {
                continue;
            };
            if key.starts_with('_') || !table.type_of(key).is_some_and(is_primitive) {
                continue;
            }
            let shadows = object.get(&format!("_{key}")).and_then(Value::as_array);
            for (index, item) in items.iter().enumerate() {
                let extended = shadows
                    .and_then(|shadows| shadows.get(index))
                    .is_some_and(|shadow| !shadow.is_null());
                if item.is_null() && !extended {
                    self.report(
                        format!("Null in {key}[{index}] without extensions in _{key}[{index}]"),
                        format!("{path}.{key}[{index}]"),
                    );
                }
            }
        }
    }

    fn visit_value(&mut self, type_code: &str, value: &Value, path: &str) {
        if !is_primitive(type_code) || value.is_object() || value.is_array() {
            return;
        }
        if self.plan.skip_types.contains(type_code) {
            return;
        }
        if let Err(message) = check_primitive(type_code, value) {
            self.report(message, path.to_string());
        }
    }
}

/// Check one JSON value against the lexical rules of a primitive type.
pub fn check_primitive(type_code: &str, value: &Value) -> Result<(), String> {
    match type_code {
        "boolean" => match value {
            Value::Bool(_) => Ok(()),
            other => Err(format!("Expected a boolean, found {}", other)),
        },
        "integer" => check_integer(value, i64::from(i32::MIN)),
        "unsignedInt" => check_integer(value, 0),
        "positiveInt" => check_integer(value, 1),
        "decimal" => match value {
            Value::Number(_) => Ok(()),
            other => Err(format!("Expected a decimal number, found {}", other)),
        },
        "integer64" => match value {
            Value::String(text) if text.parse::<i64>().is_ok() => Ok(()),
            other => Err(format!("Expected a 64-bit integer string, found {}", other)),
        },
        _ => {
            let Value::String(text) = value else {
                return Err(format!("Expected a {} string, found {}", type_code, value));
            };
            check_string(type_code, text)
        }
    }
}

fn check_integer(value: &Value, min: i64) -> Result<(), String> {
    let Some(number) = value.as_i64() else {
        return Err(format!("Expected an integer, found {}", value));
    };
    if number < min || number > i64::from(i32::MAX) {
        return Err(format!(
            "Integer {} is outside the range {}..{}",
            number,
            min,
            i32::MAX
        ));
    }
    Ok(())
}

fn check_string(type_code: &str, text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err(format!("{} value must not be empty", type_code));
    }

    let valid = match type_code {
        "id" => pattern(&ID, r"^[A-Za-z0-9\-\.]{1,64}$").is_match(text),
        "code" => pattern(&CODE, r"^[^\s]+( [^\s]+)*$").is_match(text),
        "uri" | "url" | "canonical" => !text.chars().any(char::is_whitespace),
        "oid" => pattern(&OID, r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$").is_match(text),
        "uuid" => pattern(
            &UUID,
            r"^urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .is_match(text),
        "base64Binary" => pattern(&BASE64, r"^(\s*([0-9a-zA-Z\+/=]){4}\s*)+$").is_match(text),
        "date" => is_date(text),
        "dateTime" => is_date_time(text),
        "instant" => DateTime::parse_from_rfc3339(text).is_ok(),
        "time" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f").is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid {}", text, type_code))
    }
}

static ID: OnceLock<Regex> = OnceLock::new();
static CODE: OnceLock<Regex> = OnceLock::new();
static OID: OnceLock<Regex> = OnceLock::new();
static UUID: OnceLock<Regex> = OnceLock::new();
static BASE64: OnceLock<Regex> = OnceLock::new();
static PARTIAL_DATE: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("primitive regex must compile"))
}

/// `YYYY`, `YYYY-MM` or a full calendar date.
fn is_date(text: &str) -> bool {
    match text.len() {
        10 => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        _ => pattern(&PARTIAL_DATE, r"^[0-9]{4}(-(0[1-9]|1[0-2]))?$").is_match(text),
    }
}

/// A date, or a full date and time with seconds and a timezone.
fn is_date_time(text: &str) -> bool {
    if text.contains('T') {
        DateTime::parse_from_rfc3339(text).is_ok()
    } else {
        is_date(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PrimitivesPlan;
    use serde_json::json;

    #[test]
    fn test_check_primitive() {
        assert!(check_primitive("boolean", &json!(true)).is_ok());
        assert!(check_primitive("boolean", &json!("true")).is_err());
        assert!(check_primitive("integer", &json!(-5)).is_ok());
        assert!(check_primitive("integer", &json!(1.5)).is_err());
        assert!(check_primitive("integer", &json!(3_000_000_000i64)).is_err());
        assert!(check_primitive("positiveInt", &json!(0)).is_err());
        assert!(check_primitive("unsignedInt", &json!(0)).is_ok());
        assert!(check_primitive("decimal", &json!(72.5)).is_ok());
        assert!(check_primitive("integer64", &json!("9007199254740993")).is_ok());
        assert!(check_primitive("string", &json!("   ")).is_err());
        assert!(check_primitive("string", &json!(5)).is_err());
        assert!(check_primitive("id", &json!("abc-1.2")).is_ok());
        assert!(check_primitive("id", &json!("has space")).is_err());
        assert!(check_primitive("code", &json!("final")).is_ok());
        assert!(check_primitive("code", &json!(" final")).is_err());
        assert!(check_primitive("uri", &json!("http://loinc.org")).is_ok());
        assert!(check_primitive("uri", &json!("http://a b")).is_err());
        assert!(check_primitive("oid", &json!("urn:oid:1.2.840")).is_ok());
        assert!(check_primitive("markdown", &json!("*bold*")).is_ok());
    }

    #[test]
    fn test_dates() {
        for ok in ["2024", "2024-02", "2024-02-29"] {
            assert!(check_primitive("date", &json!(ok)).is_ok(), "{ok}");
        }
        for bad in ["2023-02-29", "2024-13", "24-01-01", "2024-1-1"] {
            assert!(check_primitive("date", &json!(bad)).is_err(), "{bad}");
        }

        assert!(check_primitive("dateTime", &json!("2024-01-01T10:00:00Z")).is_ok());
        assert!(check_primitive("dateTime", &json!("2024-01-01T10:00:00.123+02:00")).is_ok());
        assert!(check_primitive("dateTime", &json!("2024")).is_ok());
        assert!(check_primitive("dateTime", &json!("2024-01-01T10:00")).is_err());

        assert!(check_primitive("instant", &json!("2024-01-01T10:00:00Z")).is_ok());
        assert!(check_primitive("instant", &json!("2024-01-01")).is_err());

        assert!(check_primitive("time", &json!("23:59:59")).is_ok());
        assert!(check_primitive("time", &json!("24:00:00")).is_err());
    }

    #[test]
    fn test_validate_primitives_locations() {
        let registry = SchemaRegistry::builtin();
        let resource = json!({
            "resourceType": "Patient",
            "active": "yes",
            "birthDate": "1970-02-30",
            "name": [{"given": ["Jane", 7]}],
            "deceasedBoolean": false
        });

        let mut issues = Vec::new();
        validate_primitives(&resource, &PrimitivesPlan::default(), &registry, &mut issues);

        let locations: Vec<_> = issues
            .iter()
            .filter_map(|issue| issue.location.as_deref())
            .collect();
        assert_eq!(
            locations,
            vec!["Patient.active", "Patient.birthDate", "Patient.name[0].given[1]"]
        );
        assert!(issues.iter().all(|issue| issue.code == IssueCode::Value));
    }

    #[test]
    fn test_repeating_primitive_placeholders() {
        let registry = SchemaRegistry::builtin();
        let resource = json!({
            "resourceType": "Patient",
            "name": [
                {"given": ["Ann", null], "_given": [null, {"extension": [{"url": "http://example.org/x", "valueCode": "masked"}]}]},
                {"given": [null, "Bo"]}
            ]
        });

        let mut issues = Vec::new();
        validate_primitives(&resource, &PrimitivesPlan::default(), &registry, &mut issues);
        let locations: Vec<_> = issues
            .iter()
            .filter_map(|issue| issue.location.as_deref())
            .collect();
        assert_eq!(locations, vec!["Patient.name[1].given[0]"]);

        let lenient = PrimitivesPlan {
            check_placeholders: false,
            ..PrimitivesPlan::default()
        };
        let mut issues = Vec::new();
        validate_primitives(&resource, &lenient, &registry, &mut issues);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_skip_types() {
        let registry = SchemaRegistry::builtin();
        let resource = json!({"resourceType": "Patient", "birthDate": "yesterday", "gender": " male"});

        let mut plan = PrimitivesPlan::default();
        plan.skip_types.insert("date".to_string());
        let mut issues = Vec::new();
        validate_primitives(&resource, &plan, &registry, &mut issues);

        let locations: Vec<_> = issues
            .iter()
            .filter_map(|issue| issue.location.as_deref())
            .collect();
        assert_eq!(locations, vec!["Patient.gender"]);
    }
}
