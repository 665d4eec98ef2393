use super::{CodeableConcept, Coding, HumanName, Identifier, Period, Quantity, Reference};
use crate::bag::PropertyBag;
use crate::choice::ChoiceShadow;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

crate::choice_type! {
    /// Extension.value[x]
    pub enum ExtensionValue("value") {
        Boolean(bool) => "valueBoolean", shadow "_valueBoolean";
        Canonical(String) => "valueCanonical", shadow "_valueCanonical";
        Code(String) => "valueCode", shadow "_valueCode";
        Date(String) => "valueDate", shadow "_valueDate";
        DateTime(String) => "valueDateTime", shadow "_valueDateTime";
        Decimal(serde_json::Number) => "valueDecimal", shadow "_valueDecimal";
        Id(String) => "valueId", shadow "_valueId";
        Instant(String) => "valueInstant", shadow "_valueInstant";
        Integer(i32) => "valueInteger", shadow "_valueInteger";
        Markdown(String) => "valueMarkdown", shadow "_valueMarkdown";
        String(String) => "valueString", shadow "_valueString";
        Uri(String) => "valueUri", shadow "_valueUri";
        Url(String) => "valueUrl", shadow "_valueUrl";
        CodeableConcept(CodeableConcept) => "valueCodeableConcept";
        Coding(Coding) => "valueCoding";
        HumanName(HumanName) => "valueHumanName";
        Identifier(Identifier) => "valueIdentifier";
        Period(Period) => "valuePeriod";
        Quantity(Quantity) => "valueQuantity";
        Reference(Reference) => "valueReference";
    }
}

const EXTENSION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::required_scalar("url", "uri"),
    PropertyDef::choice("valueBoolean", "value", "boolean"),
    PropertyDef::shadow("_valueBoolean"),
    PropertyDef::choice("valueCanonical", "value", "canonical"),
    PropertyDef::shadow("_valueCanonical"),
    PropertyDef::choice("valueCode", "value", "code"),
    PropertyDef::shadow("_valueCode"),
    PropertyDef::choice("valueDate", "value", "date"),
    PropertyDef::shadow("_valueDate"),
    PropertyDef::choice("valueDateTime", "value", "dateTime"),
    PropertyDef::shadow("_valueDateTime"),
    PropertyDef::choice("valueDecimal", "value", "decimal"),
    PropertyDef::shadow("_valueDecimal"),
    PropertyDef::choice("valueId", "value", "id"),
    PropertyDef::shadow("_valueId"),
    PropertyDef::choice("valueInstant", "value", "instant"),
    PropertyDef::shadow("_valueInstant"),
    PropertyDef::choice("valueInteger", "value", "integer"),
    PropertyDef::shadow("_valueInteger"),
    PropertyDef::choice("valueMarkdown", "value", "markdown"),
    PropertyDef::shadow("_valueMarkdown"),
    PropertyDef::choice("valueString", "value", "string"),
    PropertyDef::shadow("_valueString"),
    PropertyDef::choice("valueUri", "value", "uri"),
    PropertyDef::shadow("_valueUri"),
    PropertyDef::choice("valueUrl", "value", "url"),
    PropertyDef::shadow("_valueUrl"),
    PropertyDef::choice("valueCodeableConcept", "value", "CodeableConcept"),
    PropertyDef::choice("valueCoding", "value", "Coding"),
    PropertyDef::choice("valueHumanName", "value", "HumanName"),
    PropertyDef::choice("valueIdentifier", "value", "Identifier"),
    PropertyDef::choice("valuePeriod", "value", "Period"),
    PropertyDef::choice("valueQuantity", "value", "Quantity"),
    PropertyDef::choice("valueReference", "value", "Reference"),
];

static EXTENSION_TABLE: PropertyTable =
    PropertyTable::new("Extension", EnvelopeKind::Element, EXTENSION_PROPERTIES);

/// URI-keyed annotation carrying at most one typed value.
///
/// Complex extensions leave `value` empty and nest further extensions in
/// `element.extension`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extension {
    pub element: Element,
    pub url: Option<String>,
    pub value: Option<ExtensionValue>,
    pub value_ext: Option<ChoiceShadow>,
}

impl Extension {
    pub fn new(url: impl Into<String>, value: ExtensionValue) -> Self {
        Self {
            url: Some(url.into()),
            value: Some(value),
            ..Default::default()
        }
    }

    /// Extension with nested extensions instead of a value.
    pub fn complex(url: impl Into<String>, parts: Vec<Extension>) -> Self {
        Self {
            element: Element {
                id: None,
                extension: Some(parts),
            },
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

impl FhirModel for Extension {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &EXTENSION_TABLE
    }

    fn envelope(&self) -> &Element {
        &self.element
    }

    fn envelope_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn read_properties(element: Element, bag: &mut PropertyBag) -> Result<Self> {
        let value = bag.take_choice::<ExtensionValue>()?;
        Ok(Self {
            element,
            url: bag.take("url")?,
            value_ext: bag.take_choice_shadow(value.as_ref())?,
            value,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("url", &self.url)?;
        bag.put_choice(&self.value, &self.value_ext)
    }
}

crate::impl_model_serde!(Extension);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::ChoiceType;
    use serde_json::json;

    #[test]
    fn test_extension_json_order() {
        let ext = Extension::new("http://example.org/flag", ExtensionValue::Boolean(true));
        let json = ext.to_value().unwrap();
        assert_eq!(json, json!({"url": "http://example.org/flag", "valueBoolean": true}));
        assert_eq!(
            json.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["url", "valueBoolean"]
        );
    }

    #[test]
    fn test_extension_complex_value() {
        let ext = Extension::from_value(json!({
            "url": "http://example.org/weight",
            "valueQuantity": {"value": 72.5, "unit": "kg"}
        }))
        .unwrap();

        match ext.value {
            Some(ExtensionValue::Quantity(ref q)) => assert_eq!(q.unit.as_deref(), Some("kg")),
            ref other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_nested_extensions() {
        let ext = Extension::complex(
            "http://example.org/outer",
            vec![Extension::new("inner", ExtensionValue::Code("a".to_string()))],
        );
        let json = ext.to_value().unwrap();
        assert_eq!(json["extension"][0]["valueCode"], "a");

        let parsed = Extension::from_value(json).unwrap();
        assert_eq!(parsed, ext);
    }

    #[test]
    fn test_primitive_variant_shadow() {
        let ext = Extension::from_value(json!({
            "url": "http://example.org/e",
            "valueString": "x",
            "_valueString": {"id": "s1"},
            "_valueUri": {"id": "stale"}
        }))
        .unwrap();
        assert_eq!(ext.value.as_ref().map(ExtensionValue::key), Some("valueString"));
        assert_eq!(ext.value_ext.as_ref().and_then(|s| s.element.id.as_deref()), Some("s1"));
        assert!(!ext.to_value().unwrap().as_object().unwrap().contains_key("_valueUri"));
    }
}
