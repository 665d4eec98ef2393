//! Structural validation against property tables
//!
//! Checks, at every level whose type is registered:
//! - the element is known to the type
//! - arrays appear exactly where the table declares them
//! - required elements are present
//! - at most one variant of each choice group is set
//! - modifier extensions, when the plan forbids them
//! - objects and primitives are not swapped

use super::{is_primitive, walk, Visitor};
use crate::plan::SchemaPlan;
use ferrum_models::{IssueCode, PropertyTable, SchemaRegistry, ValidationIssue};
use serde_json::{Map, Value};

pub fn validate_schema(
    resource: &Value,
    plan: &SchemaPlan,
    registry: &SchemaRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(object) = resource.as_object() else {
        issues.push(ValidationIssue::error(
            IssueCode::Structure,
            "Resource must be a JSON object",
        ));
        return;
    };

    let resource_type = match object.get("resourceType") {
        Some(Value::String(name)) => name.as_str(),
        Some(_) => {
            issues.push(
                ValidationIssue::error(IssueCode::Structure, "resourceType must be a string")
                    .with_location("resourceType"),
            );
            return;
        }
        None => {
            issues.push(
                ValidationIssue::error(IssueCode::Required, "Missing resourceType")
                    .with_location("resourceType"),
            );
            return;
        }
    };

    let Some(table) = registry.get(resource_type) else {
        issues.push(
            ValidationIssue::error(
                IssueCode::NotSupported,
                format!("Unknown resource type '{}'", resource_type),
            )
            .with_location("resourceType"),
        );
        return;
    };

    if !table.is_resource() {
        issues.push(
            ValidationIssue::error(
                IssueCode::Structure,
                format!("'{}' is a datatype, not a resource", resource_type),
            )
            .with_location("resourceType"),
        );
        return;
    }

    let mut visitor = SchemaVisitor { plan, issues };
    walk(registry, table, object, resource_type, &mut visitor);
}

struct SchemaVisitor<'a> {
    plan: &'a SchemaPlan,
    issues: &'a mut Vec<ValidationIssue>,
}

impl SchemaVisitor<'_> {
    fn push(&mut self, issue: ValidationIssue, path: String) {
        self.issues
            .push(issue.with_location(path.clone()).with_expression(vec![path]));
    }

    fn check_unknown(&mut self, key: &str, path: String) {
        let message = format!("Unknown element '{}'", key);
        let issue = if self.plan.allow_unknown_elements {
            ValidationIssue::warning(IssueCode::Structure, message)
        } else {
            ValidationIssue::error(IssueCode::Structure, message)
        };
        self.push(issue, path);
    }

    fn check_shape(&mut self, table: &PropertyTable, key: &str, value: &Value, path: String) {
        let expects_array = table.is_array(key);
        match value {
            Value::Null => self.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("Element '{}' must not be null", key),
                ),
                path,
            ),
            Value::Array(_) if !expects_array => self.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("Element '{}' must be a single value, found an array", key),
                ),
                path,
            ),
            Value::Array(items) if items.is_empty() => self.push(
                ValidationIssue::warning(
                    IssueCode::Structure,
                    format!("Element '{}' is an empty array", key),
                ),
                path,
            ),
            Value::Array(_) => {}
            _ if expects_array => self.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("Element '{}' must be an array", key),
                ),
                path,
            ),
            _ => {}
        }
    }

    fn check_required(&mut self, table: &PropertyTable, object: &Map<String, Value>, path: &str) {
        for def in table.properties.iter().filter(|def| def.required) {
            let name = def.name.as_ref();
            let count = match object.get(name) {
                Some(Value::Array(items)) => items.len(),
                Some(Value::Null) | None => 0,
                Some(_) => 1,
            };
            if count == 0 {
                let max = if def.is_array() { "*" } else { "1" };
                self.push(
                    ValidationIssue::error(
                        IssueCode::Required,
                        format!(
                            "Element '{}' has cardinality 1..{}, but found 0 occurrence(s)",
                            name, max
                        ),
                    ),
                    format!("{path}.{name}"),
                );
            }
        }
    }

    fn check_choices(&mut self, table: &PropertyTable, object: &Map<String, Value>, path: &str) {
        for group in table.choice_groups() {
            let present: Vec<&str> = table
                .choice_members(group)
                .into_iter()
                .filter(|member| object.contains_key(*member))
                .collect();
            if present.len() > 1 {
                self.push(
                    ValidationIssue::error(
                        IssueCode::Structure,
                        format!(
                            "Only one of {}[x] may be present, found {}",
                            group,
                            present.join(", ")
                        ),
                    ),
                    format!("{path}.{group}[x]"),
                );
            }
        }
    }

    fn check_modifier_extensions(&mut self, object: &Map<String, Value>, path: &str) {
        if self.plan.allow_modifier_extensions {
            return;
        }
        let present = match object.get("modifierExtension") {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        if present {
            self.push(
                ValidationIssue::error(
                    IssueCode::Extension,
                    "Modifier extensions are not allowed",
                ),
                format!("{path}.modifierExtension"),
            );
        }
    }
}

impl Visitor for SchemaVisitor<'_> {
    fn visit_object(&mut self, table: &PropertyTable, object: &Map<String, Value>, path: &str) {
        for (key, value) in object {
            let child_path = format!("{path}.{key}");
            if !table.allows(key) {
                self.check_unknown(key, child_path);
                continue;
            }
            if key == "resourceType" {
                if value.as_str() != Some(table.type_name()) {
                    self.push(
                        ValidationIssue::error(
                            IssueCode::Invalid,
                            format!(
                                "resourceType must be '{}', found {}",
                                table.type_name(),
                                value
                            ),
                        ),
                        child_path,
                    );
                }
                continue;
            }
            self.check_shape(table, key, value, child_path);
        }

        self.check_required(table, object, path);
        self.check_choices(table, object, path);
        self.check_modifier_extensions(object, path);
    }

    fn visit_value(&mut self, type_code: &str, value: &Value, path: &str) {
        match value {
            Value::Array(_) => self.push(
                ValidationIssue::error(IssueCode::Structure, "Nested arrays are not allowed"),
                path.to_string(),
            ),
            Value::Object(object) if type_code == "Resource" => {
                let message = match object.get("resourceType").and_then(Value::as_str) {
                    Some(name) => format!("Unknown resource type '{}'", name),
                    None => "Contained resource is missing resourceType".to_string(),
                };
                self.push(
                    ValidationIssue::error(IssueCode::NotSupported, message),
                    path.to_string(),
                );
            }
            Value::Object(_) if is_primitive(type_code) => self.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("Expected a primitive {} value, found an object", type_code),
                ),
                path.to_string(),
            ),
            Value::Object(_) => {
                tracing::trace!(type_code, path, "no table registered, not descending");
            }
            _ if !is_primitive(type_code) => self.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("Expected a {} object, found a primitive value", type_code),
                ),
                path.to_string(),
            ),
            _ => {}
        }
    }
}
