//! Code generators
//!
//! Each output format has its own module that implements the `Generator` trait.

pub mod rust;
pub mod tables;

use crate::ir::TypeRegistry;
use anyhow::Result;

/// Trait that all generators must implement
pub trait Generator {
    /// The output type of this generator
    type Output;

    /// Generate output from the type registry
    fn generate(&self, registry: &TypeRegistry) -> Result<Self::Output>;
}

/// Configuration options for code generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Whether to generate documentation comments
    pub generate_docs: bool,
    /// Whether to generate a typed builder per type
    pub generate_builders: bool,
    /// Path the generated code uses to reach the models crate
    pub models_path: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generate_docs: true,
            generate_builders: true,
            models_path: "ferrum_models".to_string(),
        }
    }
}
