use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const CODING_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("system", "uri"),
    PropertyDef::shadow("_system"),
    PropertyDef::scalar("version", "string"),
    PropertyDef::shadow("_version"),
    PropertyDef::scalar("code", "code"),
    PropertyDef::shadow("_code"),
    PropertyDef::scalar("display", "string"),
    PropertyDef::shadow("_display"),
    PropertyDef::scalar("userSelected", "boolean"),
    PropertyDef::shadow("_userSelected"),
];

static CODING_TABLE: PropertyTable =
    PropertyTable::new("Coding", EnvelopeKind::Element, CODING_PROPERTIES);

/// A code defined by a terminology system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coding {
    pub element: Element,
    pub system: Option<String>,
    pub system_ext: Option<Element>,
    pub version: Option<String>,
    pub version_ext: Option<Element>,
    pub code: Option<String>,
    pub code_ext: Option<Element>,
    pub display: Option<String>,
    pub display_ext: Option<Element>,
    pub user_selected: Option<bool>,
    pub user_selected_ext: Option<Element>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

impl FhirModel for Coding {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &CODING_TABLE
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
            system: bag.take("system")?,
            system_ext: bag.take("_system")?,
            version: bag.take("version")?,
            version_ext: bag.take("_version")?,
            code: bag.take("code")?,
            code_ext: bag.take("_code")?,
            display: bag.take("display")?,
            display_ext: bag.take("_display")?,
            user_selected: bag.take("userSelected")?,
            user_selected_ext: bag.take("_userSelected")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("system", &self.system)?;
        bag.put("_system", &self.system_ext)?;
        bag.put("version", &self.version)?;
        bag.put("_version", &self.version_ext)?;
        bag.put("code", &self.code)?;
        bag.put("_code", &self.code_ext)?;
        bag.put("display", &self.display)?;
        bag.put("_display", &self.display_ext)?;
        bag.put("userSelected", &self.user_selected)?;
        bag.put("_userSelected", &self.user_selected_ext)
    }
}

crate::impl_model_serde!(Coding);

const CODEABLE_CONCEPT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::array("coding", "Coding"),
    PropertyDef::scalar("text", "string"),
    PropertyDef::shadow("_text"),
];

static CODEABLE_CONCEPT_TABLE: PropertyTable = PropertyTable::new(
    "CodeableConcept",
    EnvelopeKind::Element,
    CODEABLE_CONCEPT_PROPERTIES,
);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeableConcept {
    pub element: Element,
    pub coding: Option<Vec<Coding>>,
    pub text: Option<String>,
    pub text_ext: Option<Element>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: Some(vec![coding]),
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Whether any coding matches `system` and `code`.
    pub fn has_coding(&self, system: &str, code: &str) -> bool {
        self.coding.iter().flatten().any(|c| {
            c.system.as_deref() == Some(system) && c.code.as_deref() == Some(code)
        })
    }
}

impl FhirModel for CodeableConcept {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &CODEABLE_CONCEPT_TABLE
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
            coding: bag.take("coding")?,
            text: bag.take("text")?,
            text_ext: bag.take("_text")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("coding", &self.coding)?;
        bag.put("text", &self.text)?;
        bag.put("_text", &self.text_ext)
    }
}

crate::impl_model_serde!(CodeableConcept);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coding_canonical_order() {
        let coding = Coding::from_value(json!({
            "display": "Body weight",
            "code": "29463-7",
            "system": "http://loinc.org"
        }))
        .unwrap();

        let json = coding.to_json_string().unwrap();
        assert_eq!(
            json,
            r#"{"system":"http://loinc.org","code":"29463-7","display":"Body weight"}"#
        );
    }

    #[test]
    fn test_codeable_concept_has_coding() {
        let concept = CodeableConcept::from_coding(Coding::new("http://loinc.org", "29463-7"));
        assert!(concept.has_coding("http://loinc.org", "29463-7"));
        assert!(!concept.has_coding("http://loinc.org", "8302-2"));
        assert!(!CodeableConcept::from_text("weight").has_coding("http://loinc.org", "29463-7"));
    }
}
