//! Intermediate Representation (IR)
//!
//! Language-agnostic representation of FHIR types extracted from StructureDefinitions.
//! This IR serves as the bridge between FHIR definitions and the generators.

use ferrum_models::{EnvelopeKind, PropertyDef, PropertyKind, PropertyTable};
use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Registry of all types extracted from a set of StructureDefinitions
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// All types indexed by name
    types: BTreeMap<String, TypeDefinition>,
    /// Mapping from canonical URL to type name
    url_index: BTreeMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type to the registry, replacing any type of the same name
    pub fn add_type(&mut self, type_def: TypeDefinition) {
        if let Some(url) = &type_def.url {
            self.url_index.insert(url.clone(), type_def.name.clone());
        }
        self.types.insert(type_def.name.clone(), type_def);
    }

    /// Get a type by its canonical URL
    pub fn get_type_by_url(&self, url: &str) -> Option<&TypeDefinition> {
        self.url_index.get(url).and_then(|name| self.types.get(name))
    }

    /// Get a type by its name
    pub fn get_type_by_name(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all types, sorted by name
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Concrete resource types
    pub fn resource_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types
            .values()
            .filter(|t| t.kind == TypeKind::Resource && !t.is_abstract)
    }

    /// Concrete complex datatypes
    pub fn complex_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types
            .values()
            .filter(|t| t.kind == TypeKind::ComplexType && !t.is_abstract)
    }

    pub fn primitive_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types
            .values()
            .filter(|t| t.kind == TypeKind::PrimitiveType)
    }

    /// Types that get a property table and a generated module.
    pub fn structured_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values().filter(|t| {
            !t.is_abstract
                && t.kind != TypeKind::PrimitiveType
                && !ENVELOPE_TYPES.contains(&t.name.as_str())
        })
    }

    /// Whether `name` is a generated struct: a structured type or one of
    /// their backbone elements.
    pub fn is_struct(&self, name: &str) -> bool {
        self.structured_types()
            .any(|t| t.name == name || t.backbone_elements.iter().any(|b| b.name == name))
    }

    /// Other structured types a type refers to, in first-use order
    pub fn get_dependencies(&self, type_def: &TypeDefinition) -> Vec<String> {
        let own: HashSet<&str> = type_def
            .backbone_elements
            .iter()
            .map(|b| b.name.as_str())
            .collect();

        let mut deps = Vec::new();
        let properties = type_def
            .properties
            .iter()
            .chain(type_def.backbone_elements.iter().flat_map(|b| &b.properties));
        for property in properties {
            for prop_type in &property.types {
                let code = &prop_type.code;
                if !is_primitive_type(code)
                    && !own.contains(code.as_str())
                    && self.is_struct(code)
                    && !deps.contains(code)
                {
                    deps.push(code.clone());
                }
            }
        }
        deps
    }

    /// Whether `from` can reach `target` through single-valued (non-array)
    /// complex properties. A struct field on such a path must be boxed.
    pub fn reaches_through_scalars(&self, from: &str, target: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(properties) = self.properties_of(&current) else {
                continue;
            };
            for property in properties.iter().filter(|p| !p.cardinality.is_array()) {
                for prop_type in &property.types {
                    if !is_primitive_type(&prop_type.code) {
                        stack.push(prop_type.code.clone());
                    }
                }
            }
        }
        false
    }

    fn properties_of(&self, name: &str) -> Option<&[Property]> {
        if let Some(type_def) = self.types.get(name) {
            return Some(&type_def.properties);
        }
        self.types
            .values()
            .flat_map(|t| &t.backbone_elements)
            .find(|b| b.name == name)
            .map(|b| b.properties.as_slice())
    }
}

/// Abstract bases provided by the envelopes of `ferrum-models`.
pub const ENVELOPE_TYPES: &[&str] = &[
    "Element",
    "BackboneElement",
    "BackboneType",
    "DataType",
    "PrimitiveType",
    "Resource",
    "DomainResource",
];

/// Check if a type is a FHIR primitive
pub fn is_primitive_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "boolean"
            | "integer"
            | "unsignedInt"
            | "positiveInt"
            | "integer64"
            | "decimal"
            | "string"
            | "code"
            | "id"
            | "markdown"
            | "uri"
            | "url"
            | "canonical"
            | "oid"
            | "uuid"
            | "date"
            | "dateTime"
            | "instant"
            | "time"
            | "base64Binary"
            | "xhtml"
    )
}

/// A single type definition extracted from a StructureDefinition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// The type name (e.g., "Patient", "HumanName", "string")
    pub name: String,
    /// Canonical URL if available
    pub url: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
    /// Kind of type (resource, complex-type, primitive)
    pub kind: TypeKind,
    /// Base type this extends (if any)
    pub base_type: Option<String>,
    /// Properties in snapshot order, envelope elements excluded
    pub properties: Vec<Property>,
    /// Whether this is an abstract type
    pub is_abstract: bool,
    /// Backbone elements defined within this type, in snapshot order
    pub backbone_elements: Vec<BackboneElement>,
}

impl TypeDefinition {
    /// Envelope this type composes.
    pub fn envelope(&self) -> EnvelopeKind {
        match (self.kind, self.base_type.as_deref()) {
            (TypeKind::Resource, _) => EnvelopeKind::Resource,
            (TypeKind::BackboneElement, _) => EnvelopeKind::Backbone,
            (_, Some("BackboneElement" | "BackboneType")) => EnvelopeKind::Backbone,
            _ => EnvelopeKind::Element,
        }
    }

    /// Property table of this type: snapshot order, one entry per choice
    /// variant, `_shadow` entries after every primitive.
    pub fn property_table(&self) -> PropertyTable {
        build_table(&self.name, self.envelope(), &self.properties)
    }
}

/// Kind of FHIR type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// FHIR Resource (e.g., Patient, Observation)
    Resource,
    /// Complex datatype (e.g., HumanName, Address, Coding)
    ComplexType,
    /// Primitive type (e.g., string, integer, boolean)
    PrimitiveType,
    /// Backbone element (nested complex element within a resource)
    BackboneElement,
}

/// A property/field within a type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// Property name as in the element path (e.g., "name", "value[x]")
    pub name: String,
    /// Path in the FHIR element tree (e.g., "Patient.name")
    pub path: String,
    /// Human-readable description
    pub description: Option<String>,
    /// The type(s) this property can have
    pub types: Vec<PropertyType>,
    /// Cardinality
    pub cardinality: Cardinality,
    /// Whether this property is required
    pub is_required: bool,
    /// Whether this property is a modifier element
    pub is_modifier: bool,
    /// Whether this property must be supported
    pub must_support: bool,
}

impl Property {
    pub fn is_choice(&self) -> bool {
        self.name.ends_with("[x]")
    }

    /// Name without the `[x]` suffix: the choice group name.
    pub fn base_name(&self) -> &str {
        self.name.strip_suffix("[x]").unwrap_or(&self.name)
    }

    /// `(variant name, type code)` for each allowed type of a choice,
    /// e.g. `("valueQuantity", "Quantity")`.
    pub fn choice_variants(&self) -> Vec<(String, &str)> {
        self.types
            .iter()
            .map(|t| (choice_variant_name(self.base_name(), &t.code), t.code.as_str()))
            .collect()
    }

    /// The single type code of a non-choice property.
    pub fn type_code(&self) -> Option<&str> {
        self.types.first().map(|t| t.code.as_str())
    }
}

/// `value` + `dateTime` -> `valueDateTime`
pub fn choice_variant_name(base: &str, type_code: &str) -> String {
    let mut chars = type_code.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", base, first.to_ascii_uppercase(), chars.as_str()),
        None => base.to_string(),
    }
}

/// Struct name of a backbone element: its path in UpperCamelCase,
/// e.g. `Patient.contact` -> `PatientContact`
pub fn backbone_name(path: &str) -> String {
    path.split('.').map(|part| part.to_upper_camel_case()).collect()
}

/// Type reference for a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyType {
    /// Type code (e.g., "string", "CodeableConcept", "Reference")
    pub code: String,
    /// Target profile URL (for References or profiled types)
    pub profile: Option<String>,
    /// Target resource types (for Reference properties)
    pub target_profiles: Vec<String>,
}

impl PropertyType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            profile: None,
            target_profiles: Vec::new(),
        }
    }
}

/// Cardinality of a property (min..max)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cardinality {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (None means unbounded/*)
    pub max: Option<u32>,
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Check if this property is a list/array
    pub fn is_array(&self) -> bool {
        self.max.map(|m| m > 1).unwrap_or(true)
    }

    /// Check if this property is optional
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Check if this property is required
    pub fn is_required(&self) -> bool {
        self.min > 0
    }
}

/// A backbone element (inline complex type) within a type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneElement {
    /// Struct name (e.g., "PatientContact" for Patient.contact)
    pub name: String,
    /// Full path (e.g., "Patient.contact")
    pub path: String,
    /// Description
    pub description: Option<String>,
    /// `BackboneElement` inside resources, `Element` inside datatypes
    pub base: String,
    /// Properties of this backbone element
    pub properties: Vec<Property>,
}

impl BackboneElement {
    pub fn envelope(&self) -> EnvelopeKind {
        if self.base == "Element" {
            EnvelopeKind::Element
        } else {
            EnvelopeKind::Backbone
        }
    }

    pub fn property_table(&self) -> PropertyTable {
        build_table(&self.name, self.envelope(), &self.properties)
    }
}

fn build_table(type_name: &str, envelope: EnvelopeKind, properties: &[Property]) -> PropertyTable {
    let mut defs = Vec::new();
    for property in properties {
        if property.is_choice() {
            let group = property.base_name();
            for (variant, code) in property.choice_variants() {
                let shadow = is_primitive_type(code).then(|| format!("_{variant}"));
                defs.push(def(variant, PropertyKind::Choice, Some(code), Some(group), false));
                if let Some(shadow) = shadow {
                    defs.push(def(shadow, PropertyKind::Shadow, None, None, false));
                }
            }
            continue;
        }

        let Some(code) = property.type_code() else {
            tracing::debug!(path = %property.path, "property without a type, skipped");
            continue;
        };
        let kind = if property.cardinality.is_array() {
            PropertyKind::Array
        } else {
            PropertyKind::Scalar
        };
        defs.push(def(
            property.name.clone(),
            kind,
            Some(code),
            None,
            property.is_required,
        ));
        if is_primitive_type(code) {
            defs.push(def(
                format!("_{}", property.name),
                PropertyKind::Shadow,
                None,
                None,
                false,
            ));
        }
    }
    PropertyTable::owned(type_name.to_string(), envelope, defs)
}

fn def(
    name: String,
    kind: PropertyKind,
    type_code: Option<&str>,
    choice_of: Option<&str>,
    required: bool,
) -> PropertyDef {
    PropertyDef {
        name: Cow::Owned(name),
        kind,
        type_code: type_code.map(|code| Cow::Owned(code.to_string())),
        choice_of: choice_of.map(|group| Cow::Owned(group.to_string())),
        required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str, codes: &[&str], min: u32, max: Option<u32>) -> Property {
        Property {
            name: name.to_string(),
            path: format!("Thing.{name}"),
            description: None,
            types: codes.iter().map(|c| PropertyType::new(*c)).collect(),
            cardinality: Cardinality::new(min, max),
            is_required: min > 0,
            is_modifier: false,
            must_support: false,
        }
    }

    fn thing() -> TypeDefinition {
        TypeDefinition {
            name: "Thing".to_string(),
            url: None,
            description: None,
            kind: TypeKind::Resource,
            base_type: Some("DomainResource".to_string()),
            properties: vec![
                property("status", &["code"], 1, Some(1)),
                property("value[x]", &["Quantity", "string"], 0, Some(1)),
                property("note", &["string"], 0, None),
            ],
            is_abstract: false,
            backbone_elements: Vec::new(),
        }
    }

    #[test]
    fn test_property_table_layout() {
        let table = thing().property_table();
        let names: Vec<&str> = table.canonical_order().collect();
        assert_eq!(
            names,
            vec![
                "status",
                "_status",
                "valueQuantity",
                "valueString",
                "_valueString",
                "note",
                "_note"
            ]
        );
        assert!(table.is_resource());
        assert!(table.get("status").unwrap().required);
        assert_eq!(table.choice_group_of("valueString"), Some("value"));
        assert!(table.is_array("note"));
        assert!(table.is_array("_note"));
    }

    #[test]
    fn test_names() {
        assert_eq!(choice_variant_name("value", "dateTime"), "valueDateTime");
        assert_eq!(choice_variant_name("deceased", "boolean"), "deceasedBoolean");
        assert_eq!(backbone_name("Patient.contact"), "PatientContact");
        assert_eq!(
            backbone_name("Observation.referenceRange"),
            "ObservationReferenceRange"
        );
    }

    #[test]
    fn test_scalar_cycles() {
        let mut registry = TypeRegistry::new();
        let mut reference = thing();
        reference.name = "Reference".to_string();
        reference.kind = TypeKind::ComplexType;
        reference.properties = vec![property("identifier", &["Identifier"], 0, Some(1))];
        let mut identifier = thing();
        identifier.name = "Identifier".to_string();
        identifier.kind = TypeKind::ComplexType;
        identifier.properties = vec![property("assigner", &["Reference"], 0, Some(1))];
        registry.add_type(reference);
        registry.add_type(identifier);

        assert!(registry.reaches_through_scalars("Reference", "Identifier"));
        assert!(registry.reaches_through_scalars("Identifier", "Reference"));
        assert!(!registry.reaches_through_scalars("Reference", "Patient"));
    }
}
