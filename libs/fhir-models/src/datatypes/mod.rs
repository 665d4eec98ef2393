//! General-purpose datatypes
//!
//! Each datatype composes the [`Element`](crate::envelope::Element) envelope
//! and follows the same template: a `static` property table, a struct with
//! one field per property (primitive properties paired with an `_ext`
//! shadow), a [`FhirModel`](crate::FhirModel) impl and the serde bridge.

mod annotation;
mod coding;
mod extension;
mod human_name;
mod identifier;
mod narrative;
mod period;
mod quantity;

pub use annotation::{Annotation, AnnotationAuthor};
pub use coding::{CodeableConcept, Coding};
pub use extension::{Extension, ExtensionValue};
pub use human_name::HumanName;
pub use identifier::{Identifier, Reference};
pub use narrative::{Meta, Narrative};
pub use period::Period;
pub use quantity::{Quantity, UCUM_SYSTEM};

use crate::model::FhirModel;
use crate::table::{EnvelopeKind, PropertyDef, PropertyTable};

const ELEMENT_PROPERTIES: &[PropertyDef] = &[];

/// Table of the bare `Element` type: the shape of every `_shadow` field.
pub static ELEMENT_TABLE: PropertyTable =
    PropertyTable::new("Element", EnvelopeKind::Element, ELEMENT_PROPERTIES);

/// Property tables of every datatype in this module.
pub fn tables() -> Vec<&'static PropertyTable> {
    vec![
        &ELEMENT_TABLE,
        Annotation::table(),
        CodeableConcept::table(),
        Coding::table(),
        Extension::table(),
        HumanName::table(),
        Identifier::table(),
        Meta::table(),
        Narrative::table(),
        Period::table(),
        Quantity::table(),
        Reference::table(),
    ]
}
