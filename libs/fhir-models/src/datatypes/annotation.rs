use super::Reference;
use crate::bag::PropertyBag;
use crate::choice::ChoiceShadow;
use crate::envelope::Element;
use crate::error::Result;
use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

crate::choice_type! {
    /// Annotation.author[x]
    pub enum AnnotationAuthor("author") {
        Reference(Reference) => "authorReference";
        String(String) => "authorString", shadow "_authorString";
    }
}

const ANNOTATION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::choice("authorReference", "author", "Reference"),
    PropertyDef::choice("authorString", "author", "string"),
    PropertyDef::shadow("_authorString"),
    PropertyDef::scalar("time", "dateTime"),
    PropertyDef::shadow("_time"),
    PropertyDef::required_scalar("text", "markdown"),
    PropertyDef::shadow("_text"),
];

static ANNOTATION_TABLE: PropertyTable =
    PropertyTable::new("Annotation", EnvelopeKind::Element, ANNOTATION_PROPERTIES);

/// Text note with attribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub element: Element,
    pub author: Option<AnnotationAuthor>,
    pub author_ext: Option<ChoiceShadow>,
    pub time: Option<String>,
    pub time_ext: Option<Element>,
    pub text: Option<String>,
    pub text_ext: Option<Element>,
}

impl Annotation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

impl FhirModel for Annotation {
    type Envelope = Element;

    fn table() -> &'static PropertyTable {
        &ANNOTATION_TABLE
    }

    fn envelope(&self) -> &Element {
        &self.element
    }

    fn envelope_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn read_properties(element: Element, bag: &mut PropertyBag) -> Result<Self> {
        let author = bag.take_choice::<AnnotationAuthor>()?;
        Ok(Self {
            element,
            author_ext: bag.take_choice_shadow(author.as_ref())?,
            author,
            time: bag.take("time")?,
            time_ext: bag.take("_time")?,
            text: bag.take("text")?,
            text_ext: bag.take("_text")?,
        })
    }

    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()> {
        bag.put_choice(&self.author, &self.author_ext)?;
        bag.put("time", &self.time)?;
        bag.put("_time", &self.time_ext)?;
        bag.put("text", &self.text)?;
        bag.put("_text", &self.text_ext)
    }
}

crate::impl_model_serde!(Annotation);
