use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const PERIOD_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("start", "dateTime"),
    PropertyDef::shadow("_start"),
    PropertyDef::scalar("end", "dateTime"),
    PropertyDef::shadow("_end"),
];

static PERIOD_TABLE: PropertyTable =
    PropertyTable::new("Period", EnvelopeKind::Element, PERIOD_PROPERTIES);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Period {
    pub element: Element,
    pub start: Option<String>,
    pub start_ext: Option<Element>,
    pub end: Option<String>,
    pub end_ext: Option<Element>,
}

impl Period {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            ..Default::default()
        }
    }
}

impl FhirModel for Period {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &PERIOD_TABLE
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
            start: bag.take("start")?,
            start_ext: bag.take("_start")?,
            end: bag.take("end")?,
            end_ext: bag.take("_end")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("start", &self.start)?;
        bag.put("_start", &self.start_ext)?;
        bag.put("end", &self.end)?;
        bag.put("_end", &self.end_ext)
    }
}

crate::impl_model_serde!(Period);
