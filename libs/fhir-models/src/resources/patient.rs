use crate::bag::PropertyBag;
use crate::choice::ChoiceShadow;
use crate::datatypes::{CodeableConcept, HumanName, Identifier, Period, Reference};
use crate::envelope::{BackboneElement, DomainResource, Element};
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

crate::choice_type! {
    /// Patient.deceased[x]
    pub enum PatientDeceased("deceased") {
        Boolean(bool) => "deceasedBoolean", shadow "_deceasedBoolean";
        DateTime(String) => "deceasedDateTime", shadow "_deceasedDateTime";
    }
}

const PATIENT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::array("identifier", "Identifier"),
    PropertyDef::scalar("active", "boolean"),
    PropertyDef::shadow("_active"),
    PropertyDef::array("name", "HumanName"),
    PropertyDef::scalar("gender", "code"),
    PropertyDef::shadow("_gender"),
    PropertyDef::scalar("birthDate", "date"),
    PropertyDef::shadow("_birthDate"),
    PropertyDef::choice("deceasedBoolean", "deceased", "boolean"),
    PropertyDef::shadow("_deceasedBoolean"),
    PropertyDef::choice("deceasedDateTime", "deceased", "dateTime"),
    PropertyDef::shadow("_deceasedDateTime"),
    PropertyDef::array("contact", "PatientContact"),
    PropertyDef::scalar("managingOrganization", "Reference"),
];

static PATIENT_TABLE: PropertyTable =
    PropertyTable::new("Patient", EnvelopeKind::Resource, PATIENT_PROPERTIES);

/// Demographics of a person receiving care
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patient {
    pub resource: DomainResource,
    pub identifier: Option<Vec<Identifier>>,
    pub active: Option<bool>,
    pub active_ext: Option<Element>,
    pub name: Option<Vec<HumanName>>,
    pub gender: Option<String>,
    pub gender_ext: Option<Element>,
    pub birth_date: Option<String>,
    pub birth_date_ext: Option<Element>,
    pub deceased: Option<PatientDeceased>,
    pub deceased_ext: Option<ChoiceShadow>,
    pub contact: Option<Vec<PatientContact>>,
    pub managing_organization: Option<Reference>,
}

impl FhirModel for Patient {
    type Envelope = DomainResource;

    fn table() -> &'static PropertyTable {
        &PATIENT_TABLE
    }

    fn envelope(&self) -> &DomainResource {
        &self.resource
    }

    fn envelope_mut(&mut self) -> &mut DomainResource {
        &mut self.resource
    }

    fn read_properties(resource: DomainResource, bag: &mut PropertyBag) -> Result<Self> {
        let deceased = bag.take_choice::<PatientDeceased>()?;
        Ok(Self {
            resource,
            identifier: bag.take("identifier")?,
            active: bag.take("active")?,
            active_ext: bag.take("_active")?,
            name: bag.take("name")?,
            gender: bag.take("gender")?,
            gender_ext: bag.take("_gender")?,
            birth_date: bag.take("birthDate")?,
            birth_date_ext: bag.take("_birthDate")?,
            deceased_ext: bag.take_choice_shadow(deceased.as_ref())?,
            deceased,
            contact: bag.take("contact")?,
            managing_organization: bag.take("managingOrganization")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("identifier", &self.identifier)?;
        bag.put("active", &self.active)?;
        bag.put("_active", &self.active_ext)?;
        bag.put("name", &self.name)?;
        bag.put("gender", &self.gender)?;
        bag.put("_gender", &self.gender_ext)?;
        bag.put("birthDate", &self.birth_date)?;
        bag.put("_birthDate", &self.birth_date_ext)?;
        bag.put_choice(&self.deceased, &self.deceased_ext)?;
        bag.put("contact", &self.contact)?;
        bag.put("managingOrganization", &self.managing_organization)
    }
}

crate::impl_model_serde!(Patient);

const PATIENT_CONTACT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::array("relationship", "CodeableConcept"),
    PropertyDef::scalar("name", "HumanName"),
    PropertyDef::scalar("gender", "code"),
    PropertyDef::shadow("_gender"),
    PropertyDef::scalar("organization", "Reference"),
    PropertyDef::scalar("period", "Period"),
];

static PATIENT_CONTACT_TABLE: PropertyTable = PropertyTable::new(
    "PatientContact",
    EnvelopeKind::Backbone,
    PATIENT_CONTACT_PROPERTIES,
);

/// Patient.contact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientContact {
    pub backbone: BackboneElement,
    pub relationship: Option<Vec<CodeableConcept>>,
    pub name: Option<HumanName>,
    pub gender: Option<String>,
    pub gender_ext: Option<Element>,
    pub organization: Option<Reference>,
    pub period: Option<Period>,
}

impl FhirModel for PatientContact {
    type Envelope = BackboneElement;

    fn table() -> &'static PropertyTable {
        &PATIENT_CONTACT_TABLE
    }

    fn envelope(&self) -> &BackboneElement {
        &self.backbone
    }

    fn envelope_mut(&mut self) -> &mut BackboneElement {
        &mut self.backbone
    }

    fn read_properties(backbone: BackboneElement, bag: &mut PropertyBag) -> Result<Self> {
        Ok(Self {
            backbone,
            relationship: bag.take("relationship")?,
            name: bag.take("name")?,
            gender: bag.take("gender")?,
            gender_ext: bag.take("_gender")?,
            organization: bag.take("organization")?,
            period: bag.take("period")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("relationship", &self.relationship)?;
        bag.put("name", &self.name)?;
        bag.put("gender", &self.gender)?;
        bag.put("_gender", &self.gender_ext)?;
        bag.put("organization", &self.organization)?;
        bag.put("period", &self.period)
    }
}

crate::impl_model_serde!(PatientContact);

crate::typed_builder! {
    /// Named setters over `ModelBuilder<Patient>`.
    pub struct PatientBuilder for Patient {
        push add_identifier(Identifier) => "identifier";
        set active(bool) => "active";
        push add_name(HumanName) => "name";
        set gender(&str) => "gender";
        set birth_date(&str) => "birthDate";
        choice deceased(PatientDeceased) => "deceased";
        push add_contact(PatientContact) => "contact";
        set managing_organization(Reference) => "managingOrganization";
    }
}
