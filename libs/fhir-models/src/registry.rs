//! Runtime schema registry
//!
//! Typed models carry their tables as compiled-in statics. The registry holds
//! tables as data instead, so the framework can order and filter JSON for
//! types that have no Rust struct: a table file produced by `ferrum-codegen`
//! is enough.

use crate::error::{json_kind, Error, Result};
use crate::serializer::serialize;
use crate::table::PropertyTable;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, PropertyTable>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the tables of every compiled-in model.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for table in crate::datatypes::tables()
            .into_iter()
            .chain(crate::resources::tables())
        {
            registry.register(table.clone());
        }
        registry
    }

    /// Add a table, replacing (and returning) any table of the same type.
    pub fn register(&mut self, table: PropertyTable) -> Option<PropertyTable> {
        let name = table.type_name().to_string();
        let previous = self.tables.insert(name, table);
        if let Some(ref previous) = previous {
            tracing::debug!(type_name = previous.type_name(), "replaced property table");
        }
        previous
    }

    /// Register every table of `other`, overriding on conflict.
    pub fn extend(&mut self, other: SchemaRegistry) {
        for (_, table) in other.tables {
            self.register(table);
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&PropertyTable> {
        self.tables.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.tables.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &PropertyTable> {
        self.tables.values()
    }

    /// Parse a JSON array of property tables.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tables: Vec<PropertyTable> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for table in tables {
            registry.register(table);
        }
        tracing::debug!(types = registry.len(), "loaded property tables");
        Ok(registry)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let tables: Vec<&PropertyTable> = self.tables.values().collect();
        Ok(serde_json::to_string_pretty(&tables)?)
    }

    /// Canonicalize a resource, picking its table from `resourceType`.
    pub fn canonicalize(&self, value: Value) -> Result<Value> {
        let type_name = value
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidResource("missing resourceType".to_string()))?;
        self.canonicalize_as(&type_name, value)
    }

    /// Canonicalize `value` as an instance of `type_name`.
    ///
    /// Unknown keys are dropped and keys are reordered at every level whose
    /// type is registered. Nested values of unregistered types are kept
    /// as they are.
    pub fn canonicalize_as(&self, type_name: &str, value: Value) -> Result<Value> {
        let table = self
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        match value {
            Value::Object(map) => Ok(Value::Object(self.canonicalize_object(table, map))),
            other => Err(Error::ExpectedObject {
                type_name: type_name.to_string(),
                found: json_kind(&other),
            }),
        }
    }

    fn canonicalize_object(&self, table: &PropertyTable, map: Map<String, Value>) -> Map<String, Value> {
        serialize(map, table)
            .into_iter()
            .map(|(key, value)| {
                let value = match child_type(table, &key) {
                    Some(type_code) => self.canonicalize_child(type_code, value),
                    None => value,
                };
                (key, value)
            })
            .collect()
    }

    fn canonicalize_child(&self, type_code: &str, value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.canonicalize_child(type_code, item))
                    .collect(),
            ),
            Value::Object(map) => {
                let table = if type_code == "Resource" {
                    map.get("resourceType")
                        .and_then(Value::as_str)
                        .and_then(|name| self.get(name))
                } else {
                    self.get(type_code)
                };
                match table {
                    Some(table) => Value::Object(self.canonicalize_object(table, map)),
                    None => {
                        tracing::trace!(type_code, "no table registered, keeping value as is");
                        Value::Object(map)
                    }
                }
            }
            other => other,
        }
    }
}

fn child_type<'t>(table: &'t PropertyTable, key: &str) -> Option<&'t str> {
    if key == "resourceType" {
        None
    } else if key.starts_with('_') {
        Some("Element")
    } else {
        table.type_of(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{EnvelopeKind, PropertyDef};
    use serde_json::json;

    const WIDGET_PROPERTIES: &[PropertyDef] = &[
        PropertyDef::scalar("label", "string"),
        PropertyDef::shadow("_label"),
        PropertyDef::array("part", "WidgetPart"),
    ];
    const PART_PROPERTIES: &[PropertyDef] = &[
        PropertyDef::scalar("size", "integer"),
        PropertyDef::scalar("kind", "code"),
    ];
    static WIDGET: PropertyTable =
        PropertyTable::new("Widget", EnvelopeKind::Resource, WIDGET_PROPERTIES);
    static PART: PropertyTable = PropertyTable::new("WidgetPart", EnvelopeKind::Backbone, PART_PROPERTIES);

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::builtin();
        registry.register(WIDGET.clone());
        registry.register(PART.clone());
        registry
    }

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_canonicalize_nested() {
        let input = json!({
            "part": [{"kind": "bolt", "colour": "red", "size": 3}],
            "label": "w",
            "resourceType": "Widget",
            "extra": true
        });

        let out = registry().canonicalize(input).unwrap();
        assert_eq!(keys(&out), vec!["resourceType", "label", "part"]);
        assert_eq!(keys(&out["part"][0]), vec!["size", "kind"]);
    }

    #[test]
    fn test_canonicalize_shadow_and_extension() {
        let input = json!({
            "resourceType": "Widget",
            "_label": {
                "extension": [{"valueString": "x", "url": "http://example.org/e", "junk": 1}],
                "id": "l"
            }
        });

        let out = registry().canonicalize(input).unwrap();
        assert_eq!(keys(&out["_label"]), vec!["id", "extension"]);
        assert_eq!(keys(&out["_label"]["extension"][0]), vec!["url", "valueString"]);
    }

    #[test]
    fn test_canonicalize_contained_by_resource_type() {
        let input = json!({
            "resourceType": "Widget",
            "contained": [{"label": "inner", "resourceType": "Widget", "zzz": 0}]
        });
        let out = registry().canonicalize(input).unwrap();
        assert_eq!(keys(&out["contained"][0]), vec!["resourceType", "label"]);
    }

    #[test]
    fn test_unknown_type() {
        let err = registry().canonicalize(json!({"resourceType": "Gadget"})).unwrap_err();
        assert!(matches!(err, Error::UnknownType(ref name) if name == "Gadget"));
    }

    #[test]
    fn test_json_roundtrip() {
        let registry = registry();
        let json = registry.to_json_string().unwrap();
        let parsed = SchemaRegistry::from_json_str(&json).unwrap();
        assert_eq!(parsed.len(), registry.len());
        assert_eq!(parsed.get("Widget"), Some(&WIDGET));
    }

    #[test]
    fn test_builtin_contains_models() {
        let registry = SchemaRegistry::builtin();
        assert!(registry.contains("Patient"));
        assert!(registry.contains("Extension"));
        assert!(registry.contains("Element"));
    }
}
