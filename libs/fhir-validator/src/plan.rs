use crate::config::{
    PrimitivesConfig, SchemaConfig, TerminologyConfig, TerminologyMode, TimeoutPolicy,
    UnknownSystemPolicy,
};
use std::collections::BTreeSet;
use std::time::Duration;

/// Compiled validation plan - list of steps to execute
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    pub steps: Vec<Step>,
    pub fail_fast: bool,
    pub max_issues: usize,
}

#[derive(Debug, Clone)]
pub enum Step {
    Schema(SchemaPlan),
    Primitives(PrimitivesPlan),
    Terminology(TerminologyPlan),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Schema(_) => "schema",
            Step::Primitives(_) => "primitives",
            Step::Terminology(_) => "terminology",
        }
    }
}

// ============================================================================
// Step Plans
// ============================================================================

#[derive(Debug, Clone)]
pub struct SchemaPlan {
    pub allow_unknown_elements: bool,
    pub allow_modifier_extensions: bool,
}

impl From<&SchemaConfig> for SchemaPlan {
    fn from(cfg: &SchemaConfig) -> Self {
        Self {
            allow_unknown_elements: cfg.allow_unknown_elements,
            allow_modifier_extensions: cfg.allow_modifier_extensions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrimitivesPlan {
    pub skip_types: BTreeSet<String>,
    pub check_placeholders: bool,
}

impl Default for PrimitivesPlan {
    fn default() -> Self {
        Self::from(&PrimitivesConfig::default())
    }
}

impl From<&PrimitivesConfig> for PrimitivesPlan {
    fn from(cfg: &PrimitivesConfig) -> Self {
        Self {
            skip_types: cfg.skip_types.iter().cloned().collect(),
            check_placeholders: cfg.check_placeholders,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminologyPlan {
    pub mode: TerminologyMode,
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
    pub unknown_system: UnknownSystemPolicy,
    pub check_display: bool,
}

impl From<&TerminologyConfig> for TerminologyPlan {
    fn from(cfg: &TerminologyConfig) -> Self {
        Self {
            mode: cfg.mode,
            timeout: cfg.timeout,
            on_timeout: cfg.on_timeout,
            unknown_system: cfg.unknown_system,
            check_display: cfg.check_display,
        }
    }
}
