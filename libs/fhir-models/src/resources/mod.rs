//! Resources and their backbone elements

mod observation;
mod patient;

pub use observation::{
    Observation, ObservationBuilder, ObservationComponent, ObservationEffective, ObservationValue,
};
pub use patient::{Patient, PatientBuilder, PatientContact, PatientDeceased};

use crate::model::FhirModel;
use crate::table::PropertyTable;

/// Property tables of every resource and backbone element in this module.
pub fn tables() -> Vec<&'static PropertyTable> {
    vec![
        Observation::table(),
        ObservationComponent::table(),
        Patient::table(),
        PatientContact::table(),
    ]
}
