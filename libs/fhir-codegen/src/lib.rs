//! FHIR Code Generator
//!
//! Reads StructureDefinitions and produces the models `ferrum-models` works
//! with: Rust modules following the hand-written template, or property tables
//! a `SchemaRegistry` loads at runtime.
//!
//! ## Architecture
//!
//! The generator uses a three-stage pipeline:
//! 1. **Parser**: Extracts type information from FHIR StructureDefinitions
//! 2. **IR (Intermediate Representation)**: Language-agnostic type model
//! 3. **Generators**: Rust code or runtime tables from the IR

pub mod generators;
pub mod ir;
pub mod parser;
pub mod utils;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use generators::rust::RustGenerator;
use generators::tables::TablesGenerator;
use generators::GeneratorConfig;
use ir::TypeRegistry;
use serde_json::Value;

/// Main entry point for code generation
pub struct CodeGenerator {
    registry: TypeRegistry,
}

impl CodeGenerator {
    pub fn from_registry(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// Load a StructureDefinition, a Bundle of them, or a directory of
    /// JSON files.
    pub fn from_path(path: &Path) -> Result<Self> {
        let registry = parser::parse_path(path)
            .with_context(|| format!("reading definitions from {}", path.display()))?;
        Ok(Self { registry })
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            registry: parser::parse_value(value),
        }
    }

    /// Get the type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Run one generator over the registry
    pub fn generate<G: generators::Generator>(&self, generator: G) -> Result<G::Output> {
        generator.generate(&self.registry)
    }
}

/// Convenience helper to run the Rust code generator over `input`.
///
/// Returns the number of generated modules.
pub fn generate_rust(input: &Path, output_dir: &Path, config: GeneratorConfig) -> Result<usize> {
    let codegen = CodeGenerator::from_path(input).context("building type registry")?;
    tracing::info!(types = codegen.registry().len(), "loaded type definitions");

    let output = codegen
        .generate(RustGenerator::new(config))
        .context("running Rust generator")?;

    utils::write_modules(output_dir, &output.modules)?;

    Ok(output.modules.len())
}

/// Write the property tables of `input` as JSON to `output_file`.
///
/// Returns the number of tables written.
pub fn generate_tables(input: &Path, output_file: &Path) -> Result<usize> {
    let codegen = CodeGenerator::from_path(input).context("building type registry")?;

    let schemas = codegen
        .generate(TablesGenerator::new())
        .context("running tables generator")?;
    let json = schemas.to_json_string().context("serializing tables")?;

    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    fs::write(output_file, json)
        .with_context(|| format!("writing tables to {}", output_file.display()))?;

    Ok(schemas.len())
}
