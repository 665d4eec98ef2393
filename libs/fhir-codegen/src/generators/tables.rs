//! Property tables as runtime data
//!
//! Produces a [`SchemaRegistry`] holding one table per structured type and
//! backbone element; `SchemaRegistry::to_json_string` writes it in the
//! format `SchemaRegistry::from_json_str` loads.

use crate::generators::Generator;
use crate::ir::TypeRegistry;
use anyhow::Result;
use ferrum_models::SchemaRegistry;

#[derive(Debug, Default)]
pub struct TablesGenerator;

impl TablesGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for TablesGenerator {
    type Output = SchemaRegistry;

    fn generate(&self, registry: &TypeRegistry) -> Result<Self::Output> {
        let mut schemas = SchemaRegistry::new();
        for type_def in registry.structured_types() {
            schemas.register(type_def.property_table());
            for backbone in &type_def.backbone_elements {
                schemas.register(backbone.property_table());
            }
        }
        tracing::debug!(tables = schemas.len(), "generated property tables");
        Ok(schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_value;
    use serde_json::json;

    #[test]
    fn test_tables_roundtrip_through_json() {
        let registry = parse_value(&json!({
            "resourceType": "StructureDefinition",
            "name": "Widget",
            "kind": "resource",
            "type": "Widget",
            "snapshot": {"element": [
                {"path": "Widget"},
                {"path": "Widget.status", "min": 1, "max": "1", "type": [{"code": "code"}]},
                {"path": "Widget.part", "min": 0, "max": "*", "type": [{"code": "BackboneElement"}]},
                {"path": "Widget.part.label", "min": 0, "max": "1", "type": [{"code": "string"}]}
            ]}
        }));

        let schemas = TablesGenerator::new().generate(&registry).unwrap();
        let names: Vec<&str> = schemas.type_names().collect();
        assert_eq!(names, vec!["Widget", "WidgetPart"]);

        let reloaded = SchemaRegistry::from_json_str(&schemas.to_json_string().unwrap()).unwrap();
        let widget = reloaded.get("Widget").unwrap();
        assert!(widget.get("status").unwrap().required);
        assert_eq!(widget.type_of("part"), Some("WidgetPart"));

        let canonical = reloaded
            .canonicalize(json!({
                "part": [{"extra": 1, "label": "a"}],
                "status": "on",
                "resourceType": "Widget"
            }))
            .unwrap();
        assert_eq!(
            canonical,
            json!({"resourceType": "Widget", "status": "on", "part": [{"label": "a"}]})
        );
    }
}
