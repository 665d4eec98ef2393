use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};
use serde_json::Number;

const QUANTITY_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("value", "decimal"),
    PropertyDef::shadow("_value"),
    PropertyDef::scalar("comparator", "code"),
    PropertyDef::shadow("_comparator"),
    PropertyDef::scalar("unit", "string"),
    PropertyDef::shadow("_unit"),
    PropertyDef::scalar("system", "uri"),
    PropertyDef::shadow("_system"),
    PropertyDef::scalar("code", "code"),
    PropertyDef::shadow("_code"),
];

static QUANTITY_TABLE: PropertyTable =
    PropertyTable::new("Quantity", EnvelopeKind::Element, QUANTITY_PROPERTIES);

pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// A measured amount
///
/// `value` keeps the JSON number as written (`7` stays `7`, `7.0` stays
/// `7.0`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantity {
    pub element: Element,
    pub value: Option<Number>,
    pub value_ext: Option<Element>,
    pub comparator: Option<String>,
    pub comparator_ext: Option<Element>,
    pub unit: Option<String>,
    pub unit_ext: Option<Element>,
    pub system: Option<String>,
    pub system_ext: Option<Element>,
    pub code: Option<String>,
    pub code_ext: Option<Element>,
}

impl Quantity {
    /// UCUM quantity whose human unit equals its code.
    pub fn ucum(value: impl Into<Number>, unit: &str) -> Self {
        Self {
            value: Some(value.into()),
            unit: Some(unit.to_string()),
            system: Some(UCUM_SYSTEM.to_string()),
            code: Some(unit.to_string()),
            ..Default::default()
        }
    }

    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(Number::as_f64)
    }
}

impl FhirModel for Quantity {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &QUANTITY_TABLE
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
            value: bag.take("value")?,
            value_ext: bag.take("_value")?,
            comparator: bag.take("comparator")?,
            comparator_ext: bag.take("_comparator")?,
            unit: bag.take("unit")?,
            unit_ext: bag.take("_unit")?,
            system: bag.take("system")?,
            system_ext: bag.take("_system")?,
            code: bag.take("code")?,
            code_ext: bag.take("_code")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("value", &self.value)?;
        bag.put("_value", &self.value_ext)?;
        bag.put("comparator", &self.comparator)?;
        bag.put("_comparator", &self.comparator_ext)?;
        bag.put("unit", &self.unit)?;
        bag.put("_unit", &self.unit_ext)?;
        bag.put("system", &self.system)?;
        bag.put("_system", &self.system_ext)?;
        bag.put("code", &self.code)?;
        bag.put("_code", &self.code_ext)
    }
}

crate::impl_model_serde!(Quantity);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_form_preserved() {
        let q = Quantity::from_value(json!({"unit": "kg", "value": 72})).unwrap();
        assert_eq!(q.to_json_string().unwrap(), r#"{"value":72,"unit":"kg"}"#);
        assert_eq!(q.value_f64(), Some(72.0));
    }

    #[test]
    fn test_ucum() {
        let q = Quantity::ucum(5, "mg");
        let json = q.to_value().unwrap();
        assert_eq!(json["system"], UCUM_SYSTEM);
        assert_eq!(json["code"], "mg");
    }

    #[test]
    fn test_rejects_string_value() {
        assert!(Quantity::from_value(json!({"value": "heavy"})).is_err());
    }
}
