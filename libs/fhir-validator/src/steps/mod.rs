//! Validation steps and the table-driven walk they share

pub mod primitives;
pub mod schema;
pub mod terminology;

use ferrum_models::{PropertyTable, SchemaRegistry};
use serde_json::{Map, Value};

/// Callbacks for [`walk`]. Both default to doing nothing.
pub(crate) trait Visitor {
    /// An object with a registered table, before its children are visited.
    fn visit_object(&mut self, _table: &PropertyTable, _object: &Map<String, Value>, _path: &str) {
    }

    /// Anything that is not an object with a registered table: primitives,
    /// misplaced arrays, and objects of types the registry does not know.
    fn visit_value(&mut self, _type_code: &str, _value: &Value, _path: &str) {}
}

/// The root table and object of `resource`, if its `resourceType` is known.
pub(crate) fn root<'a>(
    registry: &'a SchemaRegistry,
    resource: &'a Value,
) -> Option<(&'a PropertyTable, &'a Map<String, Value>)> {
    let object = resource.as_object()?;
    let resource_type = object.get("resourceType")?.as_str()?;
    let table = registry.get(resource_type)?;
    Some((table, object))
}

/// Depth-first walk of `object` as an instance of `table`.
///
/// Paths look like `Patient.name[0].given[1]`. Keys the table does not
/// allow are not descended into; `null` items (shadow array padding) are
/// skipped.
pub(crate) fn walk<V: Visitor>(
    registry: &SchemaRegistry,
    table: &PropertyTable,
    object: &Map<String, Value>,
    path: &str,
    visitor: &mut V,
) {
    visitor.visit_object(table, object, path);

    for (key, value) in object {
        let Some(type_code) = child_type(table, key) else {
            continue;
        };
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}.{key}[{index}]");
                    walk_child(registry, type_code, item, &item_path, visitor);
                }
            }
            other => walk_child(registry, type_code, other, &format!("{path}.{key}"), visitor),
        }
    }
}

fn walk_child<V: Visitor>(
    registry: &SchemaRegistry,
    type_code: &str,
    value: &Value,
    path: &str,
    visitor: &mut V,
) {
    match value {
        Value::Null => {}
        Value::Object(object) => match table_for(registry, type_code, object) {
            Some(table) => walk(registry, table, object, path, visitor),
            None => visitor.visit_value(type_code, value, path),
        },
        other => visitor.visit_value(type_code, other, path),
    }
}

fn table_for<'r>(
    registry: &'r SchemaRegistry,
    type_code: &str,
    object: &Map<String, Value>,
) -> Option<&'r PropertyTable> {
    if type_code == "Resource" {
        object
            .get("resourceType")
            .and_then(Value::as_str)
            .and_then(|name| registry.get(name))
    } else {
        registry.get(type_code)
    }
}

fn child_type<'t>(table: &'t PropertyTable, key: &str) -> Option<&'t str> {
    if key == "resourceType" || !table.allows(key) {
        None
    } else if key.starts_with('_') {
        Some("Element")
    } else {
        table.type_of(key)
    }
}

/// Primitive FHIR types start lowercase; complex types and resources do not.
pub(crate) fn is_primitive(type_code: &str) -> bool {
    type_code.starts_with(|c: char| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Collect {
        objects: Vec<String>,
        values: Vec<(String, String)>,
    }

    impl Visitor for Collect {
        fn visit_object(&mut self, table: &PropertyTable, _object: &Map<String, Value>, path: &str) {
            self.objects.push(format!("{path}:{}", table.type_name()));
        }

        fn visit_value(&mut self, type_code: &str, _value: &Value, path: &str) {
            self.values.push((path.to_string(), type_code.to_string()));
        }
    }

    #[test]
    fn test_walk_paths() {
        let registry = SchemaRegistry::builtin();
        let resource = json!({
            "resourceType": "Patient",
            "name": [{"family": "Smith", "given": ["Jane", "Q"]}],
            "_birthDate": {"id": "bd"},
            "birthDate": "1970-01-01",
            "unknown": {"family": "ignored"}
        });
        let (table, object) = root(&registry, &resource).unwrap();

        let mut collect = Collect::default();
        walk(&registry, table, object, "Patient", &mut collect);

        assert_eq!(
            collect.objects,
            vec![
                "Patient:Patient",
                "Patient.name[0]:HumanName",
                "Patient._birthDate:Element"
            ]
        );
        assert!(collect
            .values
            .contains(&("Patient.name[0].given[1]".to_string(), "string".to_string())));
        assert!(collect
            .values
            .contains(&("Patient.birthDate".to_string(), "date".to_string())));
        assert!(collect.values.iter().all(|(path, _)| !path.contains("unknown")));
    }

    #[test]
    fn test_root_requires_known_type() {
        let registry = SchemaRegistry::builtin();
        assert!(root(&registry, &json!({"resourceType": "Nope"})).is_none());
        assert!(root(&registry, &json!({"active": true})).is_none());
        assert!(root(&registry, &json!([])).is_none());
    }
}
