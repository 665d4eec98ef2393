//! Parser for FHIR StructureDefinitions
//!
//! Extracts type information from StructureDefinitions and builds the
//! intermediate representation (IR). Snapshot element order is kept as the
//! canonical property order.

use crate::ir::{
    backbone_name, BackboneElement, Cardinality, Property, PropertyType, TypeDefinition, TypeKind,
    TypeRegistry,
};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Parse a file or every `*.json` file of a directory
pub fn parse_path(path: &Path) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    if path.is_dir() {
        let mut files: Vec<_> = fs::read_dir(path)
            .with_context(|| format!("reading directory {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();
        for file in files {
            add_file(&mut registry, &file)?;
        }
    } else {
        add_file(&mut registry, path)?;
    }
    Ok(registry)
}

fn add_file(registry: &mut TypeRegistry, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    add_value(registry, &value);
    Ok(())
}

/// Parse a StructureDefinition or a Bundle of them
pub fn parse_value(value: &Value) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    add_value(&mut registry, value);
    registry
}

fn add_value(registry: &mut TypeRegistry, value: &Value) {
    match value.get("resourceType").and_then(|v| v.as_str()) {
        Some("StructureDefinition") => match parse_structure_definition(value) {
            Ok(Some(type_def)) => registry.add_type(type_def),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "skipping StructureDefinition"),
        },
        Some("Bundle") => {
            let entries = value.get("entry").and_then(|v| v.as_array());
            for resource in entries.into_iter().flatten().filter_map(|e| e.get("resource")) {
                add_value(registry, resource);
            }
        }
        other => tracing::debug!(resource_type = ?other, "not a StructureDefinition, ignored"),
    }
}

/// Parse a single StructureDefinition into a TypeDefinition.
///
/// Profiles (`derivation: constraint`) and logical models yield `None`.
pub fn parse_structure_definition(sd: &Value) -> Result<Option<TypeDefinition>> {
    let sd_name = sd
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("StructureDefinition missing 'name'"))?;

    if sd.get("derivation").and_then(|v| v.as_str()) == Some("constraint") {
        tracing::debug!(name = sd_name, "profile, not a base type; skipped");
        return Ok(None);
    }

    let kind = match sd.get("kind").and_then(|v| v.as_str()) {
        Some("resource") => TypeKind::Resource,
        Some("complex-type") => TypeKind::ComplexType,
        Some("primitive-type") => TypeKind::PrimitiveType,
        other => {
            tracing::debug!(name = sd_name, kind = ?other, "unsupported kind; skipped");
            return Ok(None);
        }
    };

    // `type` is what element paths start with
    let name = sd
        .get("type")
        .and_then(|v| v.as_str())
        .filter(|t| !t.contains('/'))
        .unwrap_or(sd_name)
        .to_string();

    let url = sd.get("url").and_then(|v| v.as_str()).map(String::from);

    let description = sd
        .get("description")
        .and_then(|v| v.as_str())
        .map(String::from);

    let is_abstract = sd
        .get("abstract")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let base_type = sd
        .get("baseDefinition")
        .and_then(|v| v.as_str())
        .map(extract_type_name_from_url);

    let mut type_def = TypeDefinition {
        name,
        url,
        description,
        kind,
        base_type,
        properties: Vec::new(),
        is_abstract,
        backbone_elements: Vec::new(),
    };

    if kind != TypeKind::PrimitiveType {
        let elements = sd
            .get("snapshot")
            .and_then(|s| s.get("element"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("StructureDefinition '{}' has no snapshot", sd_name))?;
        parse_elements(elements, &mut type_def)?;
    }

    Ok(Some(type_def))
}

/// Split snapshot elements into direct properties and backbone elements
fn parse_elements(elements: &[Value], type_def: &mut TypeDefinition) -> Result<()> {
    let root_envelope = type_def.envelope();
    let paths: Vec<&str> = elements
        .iter()
        .filter(|e| !is_slice(e))
        .filter_map(|e| e.get("path").and_then(|v| v.as_str()))
        .collect();
    let parents: HashSet<&str> = paths
        .iter()
        .filter_map(|path| path.rsplit_once('.').map(|(parent, _)| parent))
        .collect();

    let mut backbone_index: HashMap<String, usize> = HashMap::new();

    for element in elements.iter().skip(1).filter(|e| !is_slice(e)) {
        let path = element
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Element missing 'path'"))?;
        let Some((parent, name)) = path.rsplit_once('.') else {
            continue;
        };

        let mut property = parse_element(element, path, name)?;

        if parents.contains(path) {
            let struct_name = backbone_name(path);
            let base = property
                .type_code()
                .unwrap_or("BackboneElement")
                .to_string();
            property.types = vec![PropertyType::new(struct_name.clone())];
            backbone_index.insert(path.to_string(), type_def.backbone_elements.len());
            type_def.backbone_elements.push(BackboneElement {
                name: struct_name,
                path: path.to_string(),
                description: property.description.clone(),
                base,
                properties: Vec::new(),
            });
        }

        if parent == type_def.name {
            if !root_envelope.contains(name) {
                type_def.properties.push(property);
            }
        } else if let Some(&index) = backbone_index.get(parent) {
            let backbone = &mut type_def.backbone_elements[index];
            if !backbone.envelope().contains(name) {
                backbone.properties.push(property);
            }
        } else {
            tracing::debug!(path, "parent element not found; skipped");
        }
    }

    Ok(())
}

fn is_slice(element: &Value) -> bool {
    element
        .get("id")
        .and_then(|v| v.as_str())
        .map(|id| id.contains(':'))
        .unwrap_or(false)
}

/// Parse a single element into a Property
fn parse_element(element: &Value, path: &str, name: &str) -> Result<Property> {
    let description = element
        .get("short")
        .and_then(|v| v.as_str())
        .or_else(|| element.get("definition").and_then(|v| v.as_str()))
        .map(String::from);

    // Parse cardinality
    let min = element.get("min").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    let max_str = element.get("max").and_then(|v| v.as_str());
    let max = match max_str {
        Some("*") => None,
        Some(n) => Some(
            n.parse()
                .map_err(|_| anyhow!("Invalid max '{}' at {}", n, path))?,
        ),
        None => Some(1),
    };

    let cardinality = Cardinality::new(min, max);
    let is_required = cardinality.is_required();

    // Parse types; a contentReference points at an earlier backbone
    let types = if let Some(type_array) = element.get("type").and_then(|v| v.as_array()) {
        type_array
            .iter()
            .filter_map(|t| parse_element_type(t).ok())
            .collect()
    } else if let Some(reference) = element.get("contentReference").and_then(|v| v.as_str()) {
        let target = reference.rsplit_once('#').map(|(_, p)| p).unwrap_or(reference);
        vec![PropertyType::new(backbone_name(target))]
    } else {
        Vec::new()
    };

    let is_modifier = element
        .get("isModifier")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let must_support = element
        .get("mustSupport")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(Property {
        name: name.to_string(),
        path: path.to_string(),
        description,
        types,
        cardinality,
        is_required,
        is_modifier,
        must_support,
    })
}

/// Parse a type specification from an element
fn parse_element_type(type_spec: &Value) -> Result<PropertyType> {
    let code = type_spec
        .get("code")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Type missing 'code'"))?;

    let profile = type_spec
        .get("profile")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_str())
        .map(String::from);

    let target_profiles = type_spec
        .get("targetProfile")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(PropertyType {
        code: system_type_code(code).to_string(),
        profile,
        target_profiles,
    })
}

/// FHIRPath system types used on `id` and primitive `value` elements.
fn system_type_code(code: &str) -> &str {
    match code {
        "http://hl7.org/fhirpath/System.String" => "string",
        "http://hl7.org/fhirpath/System.Boolean" => "boolean",
        "http://hl7.org/fhirpath/System.Integer" => "integer",
        "http://hl7.org/fhirpath/System.Decimal" => "decimal",
        "http://hl7.org/fhirpath/System.Date" => "date",
        "http://hl7.org/fhirpath/System.DateTime" => "dateTime",
        "http://hl7.org/fhirpath/System.Time" => "time",
        other => other,
    }
}

/// Extract the type name from a canonical URL
/// E.g., "http://hl7.org/fhir/StructureDefinition/Patient" -> "Patient"
fn extract_type_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
