//! FHIR resource validation driven by property tables
//!
//! Configuration compiles into a [`ValidationPlan`]; a [`SchemaValidator`]
//! runs the plan's steps over canonical JSON and implements
//! [`ferrum_models::Validator`], so it plugs straight into
//! `build_validated`.
//!
//! ```rust,no_run
//! use ferrum_models::SchemaRegistry;
//! use ferrum_validator::{Preset, SchemaValidator, ValidatorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ValidatorConfig::preset(Preset::Server);
//! let validator = SchemaValidator::new(config.compile()?, SchemaRegistry::builtin());
//!
//! let outcome = validator
//!     .validate(&serde_json::json!({"resourceType": "Patient", "active": true}))
//!     .await;
//! assert!(outcome.valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod plan;
pub mod steps;
pub mod terminology;
pub mod validator;

pub use config::{
    ExecConfig, Preset, PrimitivesConfig, PrimitivesMode, SchemaConfig, SchemaMode,
    TerminologyConfig, TerminologyMode, TimeoutPolicy, UnknownSystemPolicy, ValidatorConfig,
    ValidatorConfigBuilder,
};
pub use error::{ConfigError, TerminologyError};
pub use plan::{PrimitivesPlan, SchemaPlan, Step, TerminologyPlan, ValidationPlan};
pub use terminology::{CodeLookup, InMemoryTerminology, TerminologyService};
pub use validator::SchemaValidator;
