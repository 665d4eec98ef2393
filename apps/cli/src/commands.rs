use anyhow::{bail, Context, Result};
use ferrum_codegen::generators::GeneratorConfig;
use ferrum_models::SchemaRegistry;
use ferrum_validator::{InMemoryTerminology, SchemaValidator, ValidatorConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn generate(input: &Path, out: &Path, tables_only: bool) -> Result<()> {
    let tables = ferrum_codegen::generate_tables(input, &out.join("tables.json"))?;
    tracing::info!(tables, "wrote property tables");

    if !tables_only {
        let modules = ferrum_codegen::generate_rust(input, out, GeneratorConfig::default())?;
        tracing::info!(modules, "wrote rust modules");
        println!("generated {modules} modules and {tables} tables in {}", out.display());
    } else {
        println!("generated {tables} tables in {}", out.display());
    }
    Ok(())
}

pub fn canonicalize(file: &Path, schema: Option<&Path>, pretty: bool) -> Result<()> {
    let registry = load_registry(schema)?;
    let resource = read_json(file)?;

    let canonical = registry
        .canonicalize(resource)
        .with_context(|| format!("canonicalizing {}", file.display()))?;
    let text = if pretty {
        serde_json::to_string_pretty(&canonical)?
    } else {
        serde_json::to_string(&canonical)?
    };
    println!("{text}");
    Ok(())
}

pub async fn validate(file: &Path, config: Option<&Path>, schema: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ValidatorConfig::from_yaml(&yaml)
                .with_context(|| format!("loading validator config {}", path.display()))?
        }
        None => ValidatorConfig::default(),
    };
    let validator =
        SchemaValidator::from_config(&config, load_registry(schema)?, InMemoryTerminology::new())
            .context("compiling validation plan")?;

    let resources = match read_json(file)? {
        Value::Array(items) => items,
        single => vec![single],
    };
    let outcomes = validator.validate_batch(&resources).await;

    let mut errors = 0;
    for outcome in &outcomes {
        println!("{}", serde_json::to_string_pretty(&outcome.to_operation_outcome())?);
        eprintln!("{}", outcome.summary());
        errors += outcome.error_count();
    }

    if errors > 0 {
        bail!("{} validation error(s) in {}", errors, file.display());
    }
    Ok(())
}

/// Builtin tables, extended with the tables file when one is given.
fn load_registry(schema: Option<&Path>) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::builtin();
    if let Some(path) = schema {
        let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let extra = SchemaRegistry::from_json_str(&json)
            .with_context(|| format!("loading property tables {}", path.display()))?;
        tracing::debug!(tables = extra.len(), "loaded extra property tables");
        registry.extend(extra);
    }
    Ok(registry)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
