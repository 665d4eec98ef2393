use super::Coding;
use crate::bag::PropertyBag;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const NARRATIVE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::required_scalar("status", "code"),
    PropertyDef::shadow("_status"),
    PropertyDef::required_scalar("div", "xhtml"),
];

static NARRATIVE_TABLE: PropertyTable =
    PropertyTable::new("Narrative", EnvelopeKind::Element, NARRATIVE_PROPERTIES);

/// Human-readable summary of a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Narrative {
    pub element: Element,
    pub status: Option<String>,
    pub status_ext: Option<Element>,
    /// Limited XHTML, stored verbatim
    pub div: Option<String>,
}

impl Narrative {
    pub fn generated(div: impl Into<String>) -> Self {
        Self {
            status: Some("generated".to_string()),
            div: Some(div.into()),
            ..Default::default()
        }
    }
}

impl FhirModel for Narrative {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &NARRATIVE_TABLE
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
            status: bag.take("status")?,
            status_ext: bag.take("_status")?,
            div: bag.take("div")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("status", &self.status)?;
        bag.put("_status", &self.status_ext)?;
        bag.put("div", &self.div)
    }
}

crate::impl_model_serde!(Narrative);

const META_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::scalar("versionId", "id"),
    PropertyDef::shadow("_versionId"),
    PropertyDef::scalar("lastUpdated", "instant"),
    PropertyDef::shadow("_lastUpdated"),
    PropertyDef::scalar("source", "uri"),
    PropertyDef::shadow("_source"),
    PropertyDef::array("profile", "canonical"),
    PropertyDef::shadow("_profile"),
    PropertyDef::array("security", "Coding"),
    PropertyDef::array("tag", "Coding"),
];

static META_TABLE: PropertyTable = PropertyTable::new("Meta", EnvelopeKind::Element, META_PROPERTIES);

/// Resource metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub element: Element,
    pub version_id: Option<String>,
    pub version_id_ext: Option<Element>,
    pub last_updated: Option<String>,
    pub last_updated_ext: Option<Element>,
    pub source: Option<String>,
    pub source_ext: Option<Element>,
    pub profile: Option<Vec<Option<String>>>,
    pub profile_ext: Option<Vec<Option<Element>>>,
    pub security: Option<Vec<Coding>>,
    pub tag: Option<Vec<Coding>>,
}

impl Meta {
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: Some(vec![Some(profile.into())]),
            ..Default::default()
        }
    }
}

impl FhirModel for Meta {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &META_TABLE
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
            version_id: bag.take("versionId")?,
            version_id_ext: bag.take("_versionId")?,
            last_updated: bag.take("lastUpdated")?,
            last_updated_ext: bag.take("_lastUpdated")?,
            source: bag.take("source")?,
            source_ext: bag.take("_source")?,
            profile: bag.take("profile")?,
            profile_ext: bag.take("_profile")?,
            security: bag.take("security")?,
            tag: bag.take("tag")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put("versionId", &self.version_id)?;
        bag.put("_versionId", &self.version_id_ext)?;
        bag.put("lastUpdated", &self.last_updated)?;
        bag.put("_lastUpdated", &self.last_updated_ext)?;
        bag.put("source", &self.source)?;
        bag.put("_source", &self.source_ext)?;
        bag.put("profile", &self.profile)?;
        bag.put("_profile", &self.profile_ext)?;
        bag.put("security", &self.security)?;
        bag.put("tag", &self.tag)
    }
}

crate::impl_model_serde!(Meta);
