use super::{CodeableConcept, Period};
use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const IDENTIFIER_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("use", "code"),
    PropertyDef::shadow("_use"),
    PropertyDef::scalar("type", "CodeableConcept"),
    PropertyDef::scalar("system", "uri"),
    PropertyDef::shadow("_system"),
    PropertyDef::scalar("value", "string"),
    PropertyDef::shadow("_value"),
    PropertyDef::scalar("period", "Period"),
    PropertyDef::scalar("assigner", "Reference"),
];

static IDENTIFIER_TABLE: PropertyTable =
    PropertyTable::new("Identifier", EnvelopeKind::Element, IDENTIFIER_PROPERTIES);

/// Business identifier (MRN, SSN, ...)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identifier {
    pub element: Element,
    pub r#use: Option<String>,
    pub use_ext: Option<Element>,
    pub r#type: Option<CodeableConcept>,
    pub system: Option<String>,
    pub system_ext: Option<Element>,
    pub value: Option<String>,
    pub value_ext: Option<Element>,
    pub period: Option<Period>,
    /// Boxed: a Reference can itself carry an Identifier
    pub assigner: Option<Box<Reference>>,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl FhirModel for Identifier {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &IDENTIFIER_TABLE
    }

    fn envelope(&self) -> &Element {
        &self.element
    }

    fn envelope_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn read_properties(element: Element, bag: &mut PropertyBag) -> Result<Self> {
        Ok(Self {
            element,
            r#use: bag.take("use")?,
            use_ext: bag.take("_use")?,
            r#type: bag.take("type")?,
            system: bag.take("system")?,
            system_ext: bag.take("_system")?,
            value: bag.take("value")?,
            value_ext: bag.take("_value")?,
            period: bag.take("period")?,
            assigner: bag.take("assigner")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("use", &self.r#use)?;
        bag.put("_use", &self.use_ext)?;
        bag.put("type", &self.r#type)?;
        bag.put("system", &self.system)?;
        bag.put("_system", &self.system_ext)?;
        bag.put("value", &self.value)?;
        bag.put("_value", &self.value_ext)?;
        bag.put("period", &self.period)?;
        bag.put("assigner", &self.assigner)
    }
}

crate::impl_model_serde!(Identifier);

const REFERENCE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("reference", "string"),
    PropertyDef::shadow("_reference"),
    PropertyDef::scalar("type", "uri"),
    PropertyDef::shadow("_type"),
    PropertyDef::scalar("identifier", "Identifier"),
    PropertyDef::scalar("display", "string"),
    PropertyDef::shadow("_display"),
];

static REFERENCE_TABLE: PropertyTable =
    PropertyTable::new("Reference", EnvelopeKind::Element, REFERENCE_PROPERTIES);

/// A reference from one resource to another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    pub element: Element,
    pub reference: Option<String>,
    pub reference_ext: Option<Element>,
    pub r#type: Option<String>,
    pub type_ext: Option<Element>,
    pub identifier: Option<Identifier>,
    pub display: Option<String>,
    pub display_ext: Option<Element>,
}

impl Reference {
    /// Literal reference such as `Patient/123`.
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    /// `(type, id)` of a relative literal reference.
    pub fn target(&self) -> Option<(&str, &str)> {
        let reference = self.reference.as_deref()?;
        let (type_name, id) = reference.split_once('/')?;
        if type_name.is_empty() || id.is_empty() || id.contains('/') {
            return None;
        }
        Some((type_name, id))
    }
}

impl FhirModel for Reference {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &REFERENCE_TABLE
    }

    fn envelope(&self) -> &Element {
        &self.element
    }

    fn envelope_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn read_properties(element: Element, bag: &mut PropertyBag) -> Result<Self> {
        Ok(Self {
            element,
            reference: bag.take("reference")?,
            reference_ext: bag.take("_reference")?,
            r#type: bag.take("type")?,
            type_ext: bag.take("_type")?,
            identifier: bag.take("identifier")?,
            display: bag.take("display")?,
            display_ext: bag.take("_display")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("reference", &self.reference)?;
        bag.put("_reference", &self.reference_ext)?;
        bag.put("type", &self.r#type)?;
        bag.put("_type", &self.type_ext)?;
        bag.put("identifier", &self.identifier)?;
        bag.put("display", &self.display)?;
        bag.put("_display", &self.display_ext)
    }
}

crate::impl_model_serde!(Reference);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_target() {
        assert_eq!(Reference::to("Patient/123").target(), Some(("Patient", "123")));
        assert_eq!(Reference::to("#contained").target(), None);
        assert_eq!(Reference::to("http://x/Patient/1").target(), None);
    }

    #[test]
    fn test_identifier_with_assigner() {
        let input = json!({
            "system": "urn:oid:1.2.36.146.595.217.0.1",
            "value": "12345",
            "assigner": {"display": "Acme Healthcare", "reference": "Organization/1"}
        });
        let identifier = Identifier::from_value(input).unwrap();

        let json = identifier.to_value().unwrap();
        let assigner_keys: Vec<&str> = json["assigner"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(assigner_keys, vec!["reference", "display"]);
    }
}
