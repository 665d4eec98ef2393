//! FHIR data models
//!
//! Typed FHIR structures built on a small generic framework. Every concrete
//! type is an instantiation of the same pieces:
//!
//! - [`table`]: per-type schema metadata (canonical order, arrays, shadow
//!   fields, choice groups)
//! - [`bag`]: the property assignment engine every constructor runs through
//! - [`choice`]: choice types (`value[x]`) as enums, plus the draft-level
//!   variant switch
//! - [`envelope`]: `Element`, `BackboneElement` and `DomainResource`
//! - [`serializer`]: canonical-order JSON output
//! - [`model`] and [`update`]: construction, immutable `with` /
//!   `apply_transform`, deep clone
//! - [`builder`]: fluent builders, optionally validated
//! - [`validation`]: the contract an external validator implements
//! - [`registry`]: tables as runtime data, for types without a Rust struct
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::datatypes::HumanName;
//! use ferrum_models::resources::PatientBuilder;
//! use ferrum_models::FhirModel;
//!
//! let patient = PatientBuilder::new()
//!     .add_name(HumanName::family("Smith"))
//!     .active(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     patient.to_json_string().unwrap(),
//!     r#"{"resourceType":"Patient","active":true,"name":[{"family":"Smith"}]}"#
//! );
//! ```

pub mod bag;
pub mod builder;
pub mod choice;
pub mod datatypes;
pub mod envelope;
pub mod error;
pub mod model;
pub mod registry;
pub mod resources;
pub mod serializer;
pub mod table;
pub mod update;
pub mod validation;

pub use bag::{assign_props, PropertyBag};
pub use builder::ModelBuilder;
pub use choice::{set_choice_variant, ChoiceShadow, ChoiceType};
pub use envelope::{BackboneElement, DomainResource, Element, Envelope, HasExtensions, HasId};
pub use error::{Error, Result};
pub use model::FhirModel;
pub use registry::SchemaRegistry;
pub use serializer::serialize;
pub use table::{EnvelopeKind, PropertyDef, PropertyKind, PropertyTable};
pub use update::merge_shallow;
pub use validation::{
    IssueCode, IssueSeverity, Validatable, ValidationIssue, ValidationOutcome, Validator,
};

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
    pub use serde_json::Value;
}
