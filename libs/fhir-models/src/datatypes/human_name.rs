use super::Period;
use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const HUMAN_NAME_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("use", "code"),
    PropertyDef::shadow("_use"),
    PropertyDef::scalar("text", "string"),
    PropertyDef::shadow("_text"),
    PropertyDef::scalar("family", "string"),
    PropertyDef::shadow("_family"),
    PropertyDef::array("given", "string"),
    PropertyDef::shadow("_given"),
    PropertyDef::array("prefix", "string"),
    PropertyDef::shadow("_prefix"),
    PropertyDef::array("suffix", "string"),
    PropertyDef::shadow("_suffix"),
    PropertyDef::scalar("period", "Period"),
];

static HUMAN_NAME_TABLE: PropertyTable =
    PropertyTable::new("HumanName", EnvelopeKind::Element, HUMAN_NAME_PROPERTIES);

/// Name of a person
///
/// Shadows of repeating primitives are parallel arrays: `given_ext[i]`
/// belongs to `given[i]` and is `None` where that entry has no extensions.
/// `given[i]` is `None` where the name part only carries extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumanName {
    pub element: Element,
    pub r#use: Option<String>,
    pub use_ext: Option<Element>,
    pub text: Option<String>,
    pub text_ext: Option<Element>,
    pub family: Option<String>,
    pub family_ext: Option<Element>,
    pub given: Option<Vec<Option<String>>>,
    pub given_ext: Option<Vec<Option<Element>>>,
    pub prefix: Option<Vec<Option<String>>>,
    pub prefix_ext: Option<Vec<Option<Element>>>,
    pub suffix: Option<Vec<Option<String>>>,
    pub suffix_ext: Option<Vec<Option<Element>>>,
    pub period: Option<Period>,
}

impl HumanName {
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            ..Default::default()
        }
    }

    pub fn with_given(mut self, given: impl Into<String>) -> Self {
        self.given.get_or_insert_with(Vec::new).push(Some(given.into()));
        self
    }

    /// "Given Family" built from the parts that are present.
    pub fn display(&self) -> String {
        if let Some(ref text) = self.text {
            return text.clone();
        }
        self.given
            .iter()
            .flatten()
            .flatten()
            .chain(self.family.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FhirModel for HumanName {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &HUMAN_NAME_TABLE
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
            text: bag.take("text")?,
            text_ext: bag.take("_text")?,
            family: bag.take("family")?,
            family_ext: bag.take("_family")?,
            given: bag.take("given")?,
            given_ext: bag.take("_given")?,
            prefix: bag.take("prefix")?,
            prefix_ext: bag.take("_prefix")?,
            suffix: bag.take("suffix")?,
            suffix_ext: bag.take("_suffix")?,
            period: bag.take("period")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("use", &self.r#use)?;
        bag.put("_use", &self.use_ext)?;
        bag.put("text", &self.text)?;
        bag.put("_text", &self.text_ext)?;
        bag.put("family", &self.family)?;
        bag.put("_family", &self.family_ext)?;
        bag.put("given", &self.given)?;
        bag.put("_given", &self.given_ext)?;
        bag.put("prefix", &self.prefix)?;
        bag.put("_prefix", &self.prefix_ext)?;
        bag.put("suffix", &self.suffix)?;
        bag.put("_suffix", &self.suffix_ext)?;
        bag.put("period", &self.period)
    }
}

crate::impl_model_serde!(HumanName);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        let name = HumanName::family("Smith").with_given("Jane").with_given("Q");
        assert_eq!(name.display(), "Jane Q Smith");
    }

    #[test]
    fn test_parallel_given_shadow() {
        let input = json!({
            "given": ["Jane", "Q"],
            "_given": [null, {"extension": [{"url": "http://example.org/initial", "valueBoolean": true}]}]
        });
        let name = HumanName::from_value(input.clone()).unwrap();

        let shadows = name.given_ext.as_ref().unwrap();
        assert!(shadows[0].is_none());
        assert!(shadows[1].is_some());
        assert_eq!(name.to_value().unwrap(), input);
    }

    #[test]
    fn test_given_placeholder_round_trip() {
        let input = json!({
            "given": ["Ann", null],
            "_given": [null, {"extension": [{"url": "http://example.org/data-absent", "valueCode": "masked"}]}]
        });
        let name = HumanName::from_value(input.clone()).unwrap();

        assert_eq!(name.given, Some(vec![Some("Ann".to_string()), None]));
        assert_eq!(name.display(), "Ann");
        assert_eq!(name.to_value().unwrap(), input);
    }
}
