//! Ordered serializer
//!
//! JSON key order is irrelevant to JSON itself but not to the systems that
//! diff FHIR documents as text. Output is always: envelope fields in envelope
//! order, then the type's properties in property-table order. Nothing else,
//! and nothing absent.

use crate::bag::PropertyBag;
use crate::table::PropertyTable;
use serde_json::{Map, Value};

/// Move the properties of `bag` into `out` in canonical order.
///
/// Keys not listed by `table` are discarded.
pub fn emit_properties(bag: PropertyBag, table: &PropertyTable, out: &mut Map<String, Value>) {
    let mut entries = bag.into_map();
    for name in table.canonical_order() {
        if let Some(value) = entries.remove(name) {
            if !value.is_null() {
                out.insert(name.to_string(), value);
            }
        }
    }

    for name in entries.keys() {
        tracing::debug!(
            type_name = table.type_name(),
            field = %name,
            "property not in canonical order, not serialized"
        );
    }
}

/// Reorder a loose JSON object according to `table`.
///
/// This is the descriptor-only path used when no typed model exists for a
/// type: envelope fields first, then the table order. `resourceType` is
/// forced to the table's type name for resources.
pub fn serialize(source: Map<String, Value>, table: &PropertyTable) -> Map<String, Value> {
    let mut bag = PropertyBag::assign(source, table);
    let mut out = Map::new();

    for name in table.envelope.fields() {
        if *name == "resourceType" {
            bag.remove(name);
            out.insert(
                "resourceType".to_string(),
                Value::String(table.type_name().to_string()),
            );
        } else if let Some(value) = bag.remove(name) {
            out.insert(name.to_string(), value);
        }
    }

    emit_properties(bag, table, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{EnvelopeKind, PropertyDef};
    use serde_json::json;

    const PATIENT_PROPERTIES: &[PropertyDef] = &[
        PropertyDef::array("identifier", "Identifier"),
        PropertyDef::scalar("active", "boolean"),
        PropertyDef::shadow("_active"),
        PropertyDef::array("name", "HumanName"),
        PropertyDef::scalar("gender", "code"),
        PropertyDef::shadow("_gender"),
    ];
    static PATIENT: PropertyTable =
        PropertyTable::new("Patient", EnvelopeKind::Resource, PATIENT_PROPERTIES);

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn keys(map: &Map<String, Value>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_serialize_orders_envelope_then_table() {
        let source = object(json!({
            "gender": "female",
            "name": [{"family": "Smith"}],
            "extension": [],
            "active": true,
            "id": "p1",
            "_active": {"id": "a"}
        }));

        let out = serialize(source, &PATIENT);
        assert_eq!(
            keys(&out),
            vec!["resourceType", "id", "extension", "active", "_active", "name", "gender"]
        );
    }

    #[test]
    fn test_serialize_skips_absent_and_unknown() {
        let source = object(json!({"active": false, "photo": [], "gender": null}));
        let out = serialize(source, &PATIENT);
        assert_eq!(keys(&out), vec!["resourceType", "active"]);
        assert_eq!(out["active"], false);
    }

    #[test]
    fn test_serialize_overrides_resource_type() {
        let out = serialize(object(json!({"resourceType": "Other"})), &PATIENT);
        assert_eq!(out["resourceType"], "Patient");
    }

    #[test]
    fn test_emit_properties_uses_table_order() {
        let mut bag = PropertyBag::new();
        bag.insert("name", json!([{"family": "Smith"}]));
        bag.insert("active", json!(true));

        let mut out = Map::new();
        emit_properties(bag, &PATIENT, &mut out);
        assert_eq!(keys(&out), vec!["active", "name"]);
    }
}
