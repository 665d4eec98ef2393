//! Structural envelopes
//!
//! Every FHIR structure composes exactly one envelope: [`Element`] for
//! datatypes, [`BackboneElement`] for nested structures inside a resource and
//! [`DomainResource`] for top-level resources. The envelope owns the fields
//! that are shared across the whole schema and knows how to read and write
//! them; the concrete type only handles its own property table.

use crate::bag::PropertyBag;
use crate::datatypes::{Extension, Meta, Narrative};
use crate::error::{Error, Result};
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyTable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Reads and writes the envelope part of a model.
pub trait Envelope: Debug + Clone + Default + PartialEq {
    const KIND: EnvelopeKind;

    /// Take the envelope fields out of an assigned bag.
    fn read(bag: &mut PropertyBag) -> Result<Self>;

    /// Emit the envelope fields, in envelope order, ahead of the properties.
    fn write(&self, table: &PropertyTable, out: &mut Map<String, Value>) -> Result<()>;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: Option<String>);

    fn extensions(&self) -> &[Extension];

    fn extensions_mut(&mut self) -> &mut Vec<Extension>;

    fn modifier_extensions(&self) -> &[Extension] {
        &[]
    }
}

/// Base of every datatype; also the payload of `_shadow` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,
}

impl Element {
    pub fn with_extension(extension: Extension) -> Self {
        Self {
            id: None,
            extension: Some(vec![extension]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.extension.as_ref().map_or(true, Vec::is_empty)
    }
}

impl Envelope for Element {
    const KIND: EnvelopeKind = EnvelopeKind::Element;

    fn read(bag: &mut PropertyBag) -> Result<Self> {
        Ok(Self {
            id: bag.take("id")?,
            extension: bag.take("extension")?,
        })
    }

    fn write(&self, _table: &PropertyTable, out: &mut Map<String, Value>) -> Result<()> {
        write_field(out, "id", &self.id)?;
        write_field(out, "extension", &self.extension)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn extensions(&self) -> &[Extension] {
        self.extension.as_deref().unwrap_or_default()
    }

    fn extensions_mut(&mut self) -> &mut Vec<Extension> {
        self.extension.get_or_insert_with(Vec::new)
    }
}

/// Envelope of nested, non-root structures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackboneElement {
    pub id: Option<String>,
    pub extension: Option<Vec<Extension>>,
    /// Extensions that change the meaning of the element
    pub modifier_extension: Option<Vec<Extension>>,
}

impl Envelope for BackboneElement {
    const KIND: EnvelopeKind = EnvelopeKind::Backbone;

    fn read(bag: &mut PropertyBag) -> Result<Self> {
        Ok(Self {
            id: bag.take("id")?,
            extension: bag.take("extension")?,
            modifier_extension: bag.take("modifierExtension")?,
        })
    }

    fn write(&self, _table: &PropertyTable, out: &mut Map<String, Value>) -> Result<()> {
        write_field(out, "id", &self.id)?;
        write_field(out, "extension", &self.extension)?;
        write_field(out, "modifierExtension", &self.modifier_extension)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn extensions(&self) -> &[Extension] {
        self.extension.as_deref().unwrap_or_default()
    }

    fn extensions_mut(&mut self) -> &mut Vec<Extension> {
        self.extension.get_or_insert_with(Vec::new)
    }

    fn modifier_extensions(&self) -> &[Extension] {
        self.modifier_extension.as_deref().unwrap_or_default()
    }
}

/// Envelope of top-level resources.
///
/// `resourceType` is not stored: it always equals the table's type name and
/// is written first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainResource {
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub implicit_rules: Option<String>,
    pub implicit_rules_ext: Option<Element>,
    pub language: Option<String>,
    pub language_ext: Option<Element>,
    pub text: Option<Narrative>,
    /// Inline resources, kept in their canonical JSON form
    pub contained: Option<Vec<Value>>,
    pub extension: Option<Vec<Extension>>,
    pub modifier_extension: Option<Vec<Extension>>,
}

impl DomainResource {
    /// Decode the contained resources of type `M`, skipping the others.
    pub fn contained_of<M: FhirModel>(&self) -> Result<Vec<M>> {
        let type_name = M::table().type_name();
        self.contained
            .iter()
            .flatten()
            .filter(|value| value.get("resourceType").and_then(Value::as_str) == Some(type_name))
            .map(|value| M::from_value(value.clone()))
            .collect()
    }

    /// Append a resource to `contained`.
    pub fn add_contained<M: FhirModel>(&mut self, resource: &M) -> Result<()> {
        if !M::table().is_resource() {
            return Err(Error::InvalidResource(format!(
                "{} is not a resource and cannot be contained",
                M::table().type_name()
            )));
        }
        let value = resource.to_value()?;
        self.contained.get_or_insert_with(Vec::new).push(value);
        Ok(())
    }
}

impl Envelope for DomainResource {
    const KIND: EnvelopeKind = EnvelopeKind::Resource;

    fn read(bag: &mut PropertyBag) -> Result<Self> {
        // Checked by the model constructor before assignment.
        bag.remove("resourceType");

        Ok(Self {
            id: bag.take("id")?,
            meta: bag.take("meta")?,
            implicit_rules: bag.take("implicitRules")?,
            implicit_rules_ext: bag.take("_implicitRules")?,
            language: bag.take("language")?,
            language_ext: bag.take("_language")?,
            text: bag.take("text")?,
            contained: bag.take("contained")?,
            extension: bag.take("extension")?,
            modifier_extension: bag.take("modifierExtension")?,
        })
    }

    fn write(&self, table: &PropertyTable, out: &mut Map<String, Value>) -> Result<()> {
        out.insert(
            "resourceType".to_string(),
            Value::String(table.type_name().to_string()),
        );
        write_field(out, "id", &self.id)?;
        write_field(out, "meta", &self.meta)?;
        write_field(out, "implicitRules", &self.implicit_rules)?;
        write_field(out, "_implicitRules", &self.implicit_rules_ext)?;
        write_field(out, "language", &self.language)?;
        write_field(out, "_language", &self.language_ext)?;
        write_field(out, "text", &self.text)?;
        write_field(out, "contained", &self.contained)?;
        write_field(out, "extension", &self.extension)?;
        write_field(out, "modifierExtension", &self.modifier_extension)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn extensions(&self) -> &[Extension] {
        self.extension.as_deref().unwrap_or_default()
    }

    fn extensions_mut(&mut self) -> &mut Vec<Extension> {
        self.extension.get_or_insert_with(Vec::new)
    }

    fn modifier_extensions(&self) -> &[Extension] {
        self.modifier_extension.as_deref().unwrap_or_default()
    }
}

fn write_field<T: Serialize>(out: &mut Map<String, Value>, name: &str, value: &Option<T>) -> Result<()> {
    if let Some(value) = value {
        let json = serde_json::to_value(value).map_err(|e| Error::invalid_field(name, e))?;
        out.insert(name.to_string(), json);
    }
    Ok(())
}

/// Models that carry an `id`.
pub trait HasId {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: impl Into<String>);
}

impl<M: FhirModel> HasId for M {
    fn id(&self) -> Option<&str> {
        self.envelope().id()
    }

    fn set_id(&mut self, id: impl Into<String>) {
        self.envelope_mut().set_id(Some(id.into()));
    }
}

/// Models that carry extensions (and, for backbones and resources, modifier
/// extensions).
pub trait HasExtensions {
    fn extensions(&self) -> &[Extension];
    fn modifier_extensions(&self) -> &[Extension];
    fn add_extension(&mut self, extension: Extension);

    /// First extension with the given `url`.
    fn extension_by_url(&self, url: &str) -> Option<&Extension> {
        self.extensions().iter().find(|ext| ext.url.as_deref() == Some(url))
    }
}

impl<M: FhirModel> HasExtensions for M {
    fn extensions(&self) -> &[Extension] {
        self.envelope().extensions()
    }

    fn modifier_extensions(&self) -> &[Extension] {
        self.envelope().modifier_extensions()
    }

    fn add_extension(&mut self, extension: Extension) {
        self.envelope_mut().extensions_mut().push(extension);
    }
}
