//! Property tables
//!
//! A property table is the per-type schema metadata every model is built
//! against: the canonical (wire) order of its properties, which of them are
//! arrays, which are `_shadow` fields carrying primitive extensions, and how
//! choice-type variants group into one logical field.
//!
//! Tables are compiled in as `static` data for the typed models and can also
//! be loaded at runtime from JSON (see [`crate::registry::SchemaRegistry`]),
//! which is why every name is a `Cow<'static, str>`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Shape of a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    /// 0..1
    Scalar,
    /// 0..*
    Array,
    /// One concrete variant of a choice group (`valueQuantity`, `valueString`, ...)
    Choice,
    /// `_name` companion of a primitive property
    Shadow,
}

/// One entry of a property table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    pub name: Cow<'static, str>,
    pub kind: PropertyKind,
    /// FHIR type code of the value; `None` for shadow fields
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_code: Option<Cow<'static, str>>,
    /// Logical name of the choice group this variant belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_of: Option<Cow<'static, str>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PropertyDef {
    pub const fn scalar(name: &'static str, type_code: &'static str) -> Self {
        Self::new(name, PropertyKind::Scalar, Some(type_code), None, false)
    }

    pub const fn required_scalar(name: &'static str, type_code: &'static str) -> Self {
        Self::new(name, PropertyKind::Scalar, Some(type_code), None, true)
    }

    pub const fn array(name: &'static str, type_code: &'static str) -> Self {
        Self::new(name, PropertyKind::Array, Some(type_code), None, false)
    }

    pub const fn required_array(name: &'static str, type_code: &'static str) -> Self {
        Self::new(name, PropertyKind::Array, Some(type_code), None, true)
    }

    pub const fn choice(name: &'static str, group: &'static str, type_code: &'static str) -> Self {
        Self::new(
            name,
            PropertyKind::Choice,
            Some(type_code),
            Some(group),
            false,
        )
    }

    pub const fn shadow(name: &'static str) -> Self {
        Self::new(name, PropertyKind::Shadow, None, None, false)
    }

    const fn new(
        name: &'static str,
        kind: PropertyKind,
        type_code: Option<&'static str>,
        choice_of: Option<&'static str>,
        required: bool,
    ) -> Self {
        let type_code = match type_code {
            Some(code) => Some(Cow::Borrowed(code)),
            None => None,
        };
        let choice_of = match choice_of {
            Some(group) => Some(Cow::Borrowed(group)),
            None => None,
        };
        Self {
            name: Cow::Borrowed(name),
            kind,
            type_code,
            choice_of,
            required,
        }
    }

    pub fn is_array(&self) -> bool {
        self.kind == PropertyKind::Array
    }

    pub fn is_shadow(&self) -> bool {
        self.kind == PropertyKind::Shadow
    }
}

/// Which structural envelope a type composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeKind {
    /// Datatypes: `id`, `extension`
    Element,
    /// Nested, non-root structures: adds `modifierExtension`
    Backbone,
    /// Top-level addressable resources
    Resource,
}

const ELEMENT_FIELDS: &[&str] = &["id", "extension"];
const BACKBONE_FIELDS: &[&str] = &["id", "extension", "modifierExtension"];
const RESOURCE_FIELDS: &[&str] = &[
    "resourceType",
    "id",
    "meta",
    "implicitRules",
    "_implicitRules",
    "language",
    "_language",
    "text",
    "contained",
    "extension",
    "modifierExtension",
];

impl EnvelopeKind {
    /// Envelope field names in the order they are serialized.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Element => ELEMENT_FIELDS,
            Self::Backbone => BACKBONE_FIELDS,
            Self::Resource => RESOURCE_FIELDS,
        }
    }

    pub fn contains(self, name: &str) -> bool {
        self.fields().contains(&name)
    }

    /// FHIR type code of an envelope field, used to descend into it.
    pub fn field_type(self, name: &str) -> Option<&'static str> {
        if !self.contains(name) {
            return None;
        }
        match name {
            "id" | "implicitRules" | "language" | "resourceType" => Some("string"),
            "extension" | "modifierExtension" => Some("Extension"),
            "meta" => Some("Meta"),
            "text" => Some("Narrative"),
            "contained" => Some("Resource"),
            _ => None,
        }
    }

    /// Envelope fields that carry arrays.
    pub fn is_array_field(self, name: &str) -> bool {
        matches!(name, "extension" | "modifierExtension" | "contained") && self.contains(name)
    }
}

/// Canonical, ordered schema metadata for one concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTable {
    #[serde(rename = "type")]
    pub type_name: Cow<'static, str>,
    pub envelope: EnvelopeKind,
    /// Canonical order; envelope fields are not repeated here
    pub properties: Cow<'static, [PropertyDef]>,
}

impl PropertyTable {
    pub const fn new(
        type_name: &'static str,
        envelope: EnvelopeKind,
        properties: &'static [PropertyDef],
    ) -> Self {
        Self {
            type_name: Cow::Borrowed(type_name),
            envelope,
            properties: Cow::Borrowed(properties),
        }
    }

    /// Build a table from owned data (runtime-loaded schemas).
    pub fn owned(type_name: String, envelope: EnvelopeKind, properties: Vec<PropertyDef>) -> Self {
        Self {
            type_name: Cow::Owned(type_name),
            envelope,
            properties: Cow::Owned(properties),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_resource(&self) -> bool {
        self.envelope == EnvelopeKind::Resource
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|def| def.name == name)
    }

    /// Whether `name` may be assigned on an instance of this type.
    pub fn allows(&self, name: &str) -> bool {
        self.envelope.contains(name) || self.get(name).is_some()
    }

    /// Property names in canonical order.
    pub fn canonical_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties.iter().map(|def| def.name.as_ref())
    }

    /// Envelope names followed by property names: the full allow-list.
    pub fn allow_list(&self) -> impl Iterator<Item = &str> + '_ {
        self.envelope
            .fields()
            .iter()
            .copied()
            .chain(self.canonical_order())
    }

    pub fn choice_group_of(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|def| def.choice_of.as_deref())
    }

    /// Variant names of a choice group, in canonical order.
    pub fn choice_members(&self, group: &str) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|def| def.choice_of.as_deref() == Some(group))
            .map(|def| def.name.as_ref())
            .collect()
    }

    /// Every other variant of `chosen`'s group plus their shadow fields.
    ///
    /// Empty when `chosen` is not a choice variant of this type.
    pub fn choice_siblings(&self, chosen: &str) -> Vec<&str> {
        let Some(group) = self.choice_group_of(chosen) else {
            return Vec::new();
        };

        let mut siblings = Vec::new();
        for def in self.properties.iter() {
            if def.choice_of.as_deref() == Some(group) {
                if def.name != chosen {
                    siblings.push(def.name.as_ref());
                }
            } else if let Some(primary) = self.shadow_of(&def.name) {
                if primary != chosen && self.choice_group_of(primary) == Some(group) {
                    siblings.push(def.name.as_ref());
                }
            }
        }
        siblings
    }

    /// Distinct choice group names, in canonical order of first appearance.
    pub fn choice_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for group in self.properties.iter().filter_map(|d| d.choice_of.as_deref()) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    /// For a shadow field `_name` listed in this table, the primary name.
    pub fn shadow_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        let def = self.get(name)?;
        if def.is_shadow() {
            name.strip_prefix('_')
        } else {
            None
        }
    }

    /// FHIR type code of a property or envelope field.
    pub fn type_of(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(def) => def.type_code.as_deref(),
            None => self.envelope.field_type(name),
        }
    }

    /// Whether a property or envelope field holds an array.
    pub fn is_array(&self, name: &str) -> bool {
        match self.get(name) {
            Some(def) if def.is_shadow() => name
                .strip_prefix('_')
                .and_then(|primary| self.get(primary))
                .map(PropertyDef::is_array)
                .unwrap_or(false),
            Some(def) => def.is_array(),
            None => self.envelope.is_array_field(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVATION_PROPERTIES: &[PropertyDef] = &[
        PropertyDef::required_scalar("status", "code"),
        PropertyDef::shadow("_status"),
        PropertyDef::choice("valueQuantity", "value", "Quantity"),
        PropertyDef::choice("valueString", "value", "string"),
        PropertyDef::shadow("_valueString"),
        PropertyDef::choice("valueBoolean", "value", "boolean"),
        PropertyDef::shadow("_valueBoolean"),
        PropertyDef::array("note", "Annotation"),
    ];

    static OBSERVATION: PropertyTable =
        PropertyTable::new("Observation", EnvelopeKind::Resource, OBSERVATION_PROPERTIES);

    #[test]
    fn test_allows_envelope_and_properties() {
        assert!(OBSERVATION.allows("resourceType"));
        assert!(OBSERVATION.allows("contained"));
        assert!(OBSERVATION.allows("valueString"));
        assert!(OBSERVATION.allows("_valueString"));
        assert!(!OBSERVATION.allows("valueInteger"));
    }

    #[test]
    fn test_choice_siblings_include_shadows() {
        let siblings = OBSERVATION.choice_siblings("valueQuantity");
        assert_eq!(
            siblings,
            vec!["valueString", "_valueString", "valueBoolean", "_valueBoolean"]
        );

        let siblings = OBSERVATION.choice_siblings("valueString");
        assert_eq!(siblings, vec!["valueQuantity", "valueBoolean", "_valueBoolean"]);
    }

    #[test]
    fn test_choice_siblings_for_non_choice() {
        assert!(OBSERVATION.choice_siblings("status").is_empty());
        assert!(OBSERVATION.choice_siblings("unknown").is_empty());
    }

    #[test]
    fn test_choice_groups_and_members() {
        assert_eq!(OBSERVATION.choice_groups(), vec!["value"]);
        assert_eq!(
            OBSERVATION.choice_members("value"),
            vec!["valueQuantity", "valueString", "valueBoolean"]
        );
    }

    #[test]
    fn test_shadow_and_array_lookup() {
        assert_eq!(OBSERVATION.shadow_of("_status"), Some("status"));
        assert_eq!(OBSERVATION.shadow_of("status"), None);
        assert!(OBSERVATION.is_array("note"));
        assert!(OBSERVATION.is_array("extension"));
        assert!(!OBSERVATION.is_array("status"));
        assert_eq!(OBSERVATION.type_of("meta"), Some("Meta"));
    }

    #[test]
    fn test_table_json_roundtrip() {
        let json = serde_json::to_value(&OBSERVATION).unwrap();
        assert_eq!(json["type"], "Observation");
        assert_eq!(json["envelope"], "resource");
        assert_eq!(json["properties"][0]["name"], "status");
        assert_eq!(json["properties"][0]["required"], true);
        assert_eq!(json["properties"][2]["choiceOf"], "value");

        let parsed: PropertyTable = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, OBSERVATION);
    }
}
