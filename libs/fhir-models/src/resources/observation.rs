use crate::bag::PropertyBag;
use crate::choice::ChoiceShadow;
use crate::datatypes::{Annotation, CodeableConcept, Identifier, Period, Quantity, Reference};
use crate::envelope::{BackboneElement, DomainResource, Element};
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

crate::choice_type! {
    /// Observation.effective[x]
    pub enum ObservationEffective("effective") {
        DateTime(String) => "effectiveDateTime", shadow "_effectiveDateTime";
        Period(Period) => "effectivePeriod";
        Instant(String) => "effectiveInstant", shadow "_effectiveInstant";
    }
}

crate::choice_type! {
    /// Observation.value[x], shared with Observation.component.value[x]
    pub enum ObservationValue("value") {
        Quantity(Quantity) => "valueQuantity";
        CodeableConcept(CodeableConcept) => "valueCodeableConcept";
        String(String) => "valueString", shadow "_valueString";
        Boolean(bool) => "valueBoolean", shadow "_valueBoolean";
        Integer(i32) => "valueInteger", shadow "_valueInteger";
        DateTime(String) => "valueDateTime", shadow "_valueDateTime";
        Period(Period) => "valuePeriod";
    }
}

const OBSERVATION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::array("identifier", "Identifier"),
    PropertyDef::required_scalar("status", "code"),
    PropertyDef::shadow("_status"),
    PropertyDef::array("category", "CodeableConcept"),
    PropertyDef::required_scalar("code", "CodeableConcept"),
    PropertyDef::scalar("subject", "Reference"),
    PropertyDef::choice("effectiveDateTime", "effective", "dateTime"),
    PropertyDef::shadow("_effectiveDateTime"),
    PropertyDef::choice("effectivePeriod", "effective", "Period"),
    PropertyDef::choice("effectiveInstant", "effective", "instant"),
    PropertyDef::shadow("_effectiveInstant"),
    PropertyDef::scalar("issued", "instant"),
    PropertyDef::shadow("_issued"),
    PropertyDef::array("performer", "Reference"),
    PropertyDef::choice("valueQuantity", "value", "Quantity"),
    PropertyDef::choice("valueCodeableConcept", "value", "CodeableConcept"),
    PropertyDef::choice("valueString", "value", "string"),
    PropertyDef::shadow("_valueString"),
    PropertyDef::choice("valueBoolean", "value", "boolean"),
    PropertyDef::shadow("_valueBoolean"),
    PropertyDef::choice("valueInteger", "value", "integer"),
    PropertyDef::shadow("_valueInteger"),
    PropertyDef::choice("valueDateTime", "value", "dateTime"),
    PropertyDef::shadow("_valueDateTime"),
    PropertyDef::choice("valuePeriod", "value", "Period"),
    PropertyDef::scalar("dataAbsentReason", "CodeableConcept"),
    PropertyDef::array("interpretation", "CodeableConcept"),
    PropertyDef::array("note", "Annotation"),
    PropertyDef::array("component", "ObservationComponent"),
];

static OBSERVATION_TABLE: PropertyTable =
    PropertyTable::new("Observation", EnvelopeKind::Resource, OBSERVATION_PROPERTIES);

/// Measurements and simple assertions about a subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub resource: DomainResource,
    pub identifier: Option<Vec<Identifier>>,
    pub status: Option<String>,
    pub status_ext: Option<Element>,
    pub category: Option<Vec<CodeableConcept>>,
    pub code: Option<CodeableConcept>,
    pub subject: Option<Reference>,
    pub effective: Option<ObservationEffective>,
    pub effective_ext: Option<ChoiceShadow>,
    pub issued: Option<String>,
    pub issued_ext: Option<Element>,
    pub performer: Option<Vec<Reference>>,
    pub value: Option<ObservationValue>,
    pub value_ext: Option<ChoiceShadow>,
    pub data_absent_reason: Option<CodeableConcept>,
    pub interpretation: Option<Vec<CodeableConcept>>,
    pub note: Option<Vec<Annotation>>,
    pub component: Option<Vec<ObservationComponent>>,
}

impl FhirModel for Observation {
    type Envelope = DomainResource;

    fn table() -> &'static PropertyTable {
        &OBSERVATION_TABLE
    }

    fn envelope(&self) -> &DomainResource {
        &self.resource
    }

    fn envelope_mut(&mut self) -> &mut DomainResource {
        &mut self.resource
    }

    fn read_properties(resource: DomainResource, bag: &mut PropertyBag) -> Result<Self> {
        let effective = bag.take_choice::<ObservationEffective>()?;
        let value = bag.take_choice::<ObservationValue>()?;
        Ok(Self {
            resource,
            identifier: bag.take("identifier")?,
            status: bag.take("status")?,
            status_ext: bag.take("_status")?,
            category: bag.take("category")?,
            code: bag.take("code")?,
            subject: bag.take("subject")?,
            effective_ext: bag.take_choice_shadow(effective.as_ref())?,
            effective,
            issued: bag.take("issued")?,
            issued_ext: bag.take("_issued")?,
            performer: bag.take("performer")?,
            value_ext: bag.take_choice_shadow(value.as_ref())?,
            value,
            data_absent_reason: bag.take("dataAbsentReason")?,
            interpretation: bag.take("interpretation")?,
            note: bag.take("note")?,
            component: bag.take("component")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("identifier", &self.identifier)?;
        bag.put("status", &self.status)?;
        bag.put("_status", &self.status_ext)?;
        bag.put("category", &self.category)?;
        bag.put("code", &self.code)?;
        bag.put("subject", &self.subject)?;
        bag.put_choice(&self.effective, &self.effective_ext)?;
        bag.put("issued", &self.issued)?;
        bag.put("_issued", &self.issued_ext)?;
        bag.put("performer", &self.performer)?;
        bag.put_choice(&self.value, &self.value_ext)?;
        bag.put("dataAbsentReason", &self.data_absent_reason)?;
        bag.put("interpretation", &self.interpretation)?;
        bag.put("note", &self.note)?;
        bag.put("component", &self.component)
    }
}

crate::impl_model_serde!(Observation);

const OBSERVATION_COMPONENT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::required_scalar("code", "CodeableConcept"),
    PropertyDef::choice("valueQuantity", "value", "Quantity"),
    PropertyDef::choice("valueCodeableConcept", "value", "CodeableConcept"),
    PropertyDef::choice("valueString", "value", "string"),
    PropertyDef::shadow("_valueString"),
    PropertyDef::choice("valueBoolean", "value", "boolean"),
    PropertyDef::shadow("_valueBoolean"),
    PropertyDef::choice("valueInteger", "value", "integer"),
    PropertyDef::shadow("_valueInteger"),
    PropertyDef::choice("valueDateTime", "value", "dateTime"),
    PropertyDef::shadow("_valueDateTime"),
    PropertyDef::choice("valuePeriod", "value", "Period"),
    PropertyDef::scalar("dataAbsentReason", "CodeableConcept"),
    PropertyDef::array("interpretation", "CodeableConcept"),
];

static OBSERVATION_COMPONENT_TABLE: PropertyTable = PropertyTable::new(
    "ObservationComponent",
    EnvelopeKind::Backbone,
    OBSERVATION_COMPONENT_PROPERTIES,
);

/// Observation.component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationComponent {
    pub backbone: BackboneElement,
    pub code: Option<CodeableConcept>,
    pub value: Option<ObservationValue>,
    pub value_ext: Option<ChoiceShadow>,
    pub data_absent_reason: Option<CodeableConcept>,
    pub interpretation: Option<Vec<CodeableConcept>>,
}

impl ObservationComponent {
    pub fn new(code: CodeableConcept, value: ObservationValue) -> Self {
        Self {
            code: Some(code),
            value: Some(value),
            ..Default::default()
        }
    }
}

impl FhirModel for ObservationComponent {
    type Envelope = BackboneElement;

    fn table() -> &'static PropertyTable {
        &OBSERVATION_COMPONENT_TABLE
    }

    fn envelope(&self) -> &BackboneElement {
        &self.backbone
    }

    fn envelope_mut(&mut self) -> &mut BackboneElement {
        &mut self.backbone
    }

    fn read_properties(backbone: BackboneElement, bag: &mut PropertyBag) -> Result<Self> {
        let value = bag.take_choice::<ObservationValue>()?;
        Ok(Self {
            backbone,
            code: bag.take("code")?,
            value_ext: bag.take_choice_shadow(value.as_ref())?,
            value,
            data_absent_reason: bag.take("dataAbsentReason")?,
            interpretation: bag.take("interpretation")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("code", &self.code)?;
        bag.put_choice(&self.value, &self.value_ext)?;
        bag.put("dataAbsentReason", &self.data_absent_reason)?;
        bag.put("interpretation", &self.interpretation)
    }
}

crate::impl_model_serde!(ObservationComponent);

crate::typed_builder! {
    /// Named setters over `ModelBuilder<Observation>`.
    pub struct ObservationBuilder for Observation {
        push add_identifier(Identifier) => "identifier";
        set status(&str) => "status";
        push add_category(CodeableConcept) => "category";
        set code(CodeableConcept) => "code";
        set subject(Reference) => "subject";
        choice effective(ObservationEffective) => "effective";
        set issued(&str) => "issued";
        push add_performer(Reference) => "performer";
        choice value(ObservationValue) => "value";
        set data_absent_reason(CodeableConcept) => "dataAbsentReason";
        push add_interpretation(CodeableConcept) => "interpretation";
        push add_note(Annotation) => "note";
        push add_component(ObservationComponent) => "component";
    }
}
