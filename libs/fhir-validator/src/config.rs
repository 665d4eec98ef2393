//! Validator configuration
//!
//! A [`ValidatorConfig`] is plain data: build it from a [`Preset`], the
//! fluent [`ValidatorConfigBuilder`], or YAML. [`ValidatorConfig::compile`]
//! checks it and turns it into a [`ValidationPlan`].

use crate::error::ConfigError;
use crate::plan::{PrimitivesPlan, SchemaPlan, Step, TerminologyPlan, ValidationPlan};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named starting points for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Bulk loading: structure only, tolerant of unknown elements
    Ingestion,
    /// Interactive editing: every check, nothing stops early
    Authoring,
    /// API endpoints: strict structure and formats, fail fast
    Server,
    /// Published content: everything on, terminology problems are errors
    Publication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SchemaMode {
    Off,
    #[default]
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PrimitivesMode {
    Off,
    #[default]
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TerminologyMode {
    #[default]
    Off,
    /// Check codings against the validator's terminology service
    Local,
}

/// What a terminology lookup that runs out of time turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeoutPolicy {
    Ignore,
    #[default]
    Warn,
    Error,
}

/// Severity used for codes from a system the service does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnknownSystemPolicy {
    Ignore,
    #[default]
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub mode: SchemaMode,
    /// Report unknown elements as warnings instead of errors
    pub allow_unknown_elements: bool,
    pub allow_modifier_extensions: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            mode: SchemaMode::On,
            allow_unknown_elements: false,
            allow_modifier_extensions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitivesConfig {
    pub mode: PrimitivesMode,
    /// Primitive type codes left unchecked, e.g. `markdown`
    pub skip_types: Vec<String>,
    /// Report `null` entries of repeating primitives that have no
    /// matching `_name[i]` extensions
    pub check_placeholders: bool,
}

impl Default for PrimitivesConfig {
    fn default() -> Self {
        Self {
            mode: PrimitivesMode::On,
            skip_types: Vec::new(),
            check_placeholders: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyConfig {
    pub mode: TerminologyMode,
    /// Per-lookup timeout, in milliseconds in YAML
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
    pub unknown_system: UnknownSystemPolicy,
    /// Warn when a coding's display differs from the service's display
    pub check_display: bool,
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            mode: TerminologyMode::Off,
            timeout: Duration::from_millis(1500),
            on_timeout: TimeoutPolicy::Warn,
            unknown_system: UnknownSystemPolicy::Warn,
            check_display: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub fail_fast: bool,
    pub max_issues: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_issues: 1000,
        }
    }
}

/// Complete validator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Applied before the explicit sections when loading YAML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    pub schema: SchemaConfig,
    pub primitives: PrimitivesConfig,
    pub terminology: TerminologyConfig,
    pub exec: ExecConfig,
}

impl ValidatorConfig {
    pub fn preset(preset: Preset) -> Self {
        let mut cfg = Self {
            preset: Some(preset),
            ..Self::default()
        };
        match preset {
            Preset::Ingestion => {
                cfg.schema.allow_unknown_elements = true;
                cfg.primitives.mode = PrimitivesMode::Off;
                cfg.exec.max_issues = 100;
            }
            Preset::Authoring => {
                cfg.terminology.mode = TerminologyMode::Local;
            }
            Preset::Server => {
                cfg.schema.allow_modifier_extensions = false;
                cfg.exec.fail_fast = true;
                cfg.exec.max_issues = 100;
            }
            Preset::Publication => {
                cfg.schema.allow_modifier_extensions = false;
                cfg.terminology.mode = TerminologyMode::Local;
                cfg.terminology.on_timeout = TimeoutPolicy::Error;
                cfg.terminology.unknown_system = UnknownSystemPolicy::Error;
            }
        }
        cfg
    }

    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    /// Parse YAML. A `preset` key seeds the defaults that the other
    /// sections then override field by field.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let preset = match raw.get("preset") {
            Some(value) => Some(serde_yaml::from_value::<Preset>(value.clone())?),
            None => None,
        };

        let Some(preset) = preset else {
            return Ok(serde_yaml::from_value(raw)?);
        };

        let mut base = serde_yaml::to_value(Self::preset(preset))?;
        merge_yaml(&mut base, raw);
        Ok(serde_yaml::from_value(base)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the configuration and lay out the steps to run.
    pub fn compile(&self) -> Result<ValidationPlan, ConfigError> {
        if self.exec.max_issues == 0 {
            return Err(ConfigError::ZeroMaxIssues);
        }

        let mut steps = Vec::new();
        if self.schema.mode == SchemaMode::On {
            steps.push(Step::Schema(SchemaPlan::from(&self.schema)));
        }
        if self.primitives.mode == PrimitivesMode::On {
            steps.push(Step::Primitives(PrimitivesPlan::from(&self.primitives)));
        }
        if self.terminology.mode != TerminologyMode::Off {
            if self.terminology.timeout.is_zero() {
                return Err(ConfigError::ZeroTerminologyTimeout);
            }
            steps.push(Step::Terminology(TerminologyPlan::from(&self.terminology)));
        }

        if steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }

        Ok(ValidationPlan {
            steps,
            fail_fast: self.exec.fail_fast,
            max_issues: self.exec.max_issues,
        })
    }
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_yaml(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Fluent construction of a [`ValidatorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    /// Replace everything set so far with the preset's values.
    pub fn preset(mut self, preset: Preset) -> Self {
        self.config = ValidatorConfig::preset(preset);
        self
    }

    pub fn schema_mode(mut self, mode: SchemaMode) -> Self {
        self.config.schema.mode = mode;
        self
    }

    pub fn allow_unknown_elements(mut self, allow: bool) -> Self {
        self.config.schema.allow_unknown_elements = allow;
        self
    }

    pub fn allow_modifier_extensions(mut self, allow: bool) -> Self {
        self.config.schema.allow_modifier_extensions = allow;
        self
    }

    pub fn primitives_mode(mut self, mode: PrimitivesMode) -> Self {
        self.config.primitives.mode = mode;
        self
    }

    pub fn skip_primitive_type(mut self, type_code: impl Into<String>) -> Self {
        self.config.primitives.skip_types.push(type_code.into());
        self
    }

    pub fn check_placeholders(mut self, check: bool) -> Self {
        self.config.primitives.check_placeholders = check;
        self
    }

    pub fn terminology_mode(mut self, mode: TerminologyMode) -> Self {
        self.config.terminology.mode = mode;
        self
    }

    pub fn terminology_timeout(mut self, timeout: Duration) -> Self {
        self.config.terminology.timeout = timeout;
        self
    }

    pub fn on_timeout(mut self, policy: TimeoutPolicy) -> Self {
        self.config.terminology.on_timeout = policy;
        self
    }

    pub fn unknown_system(mut self, policy: UnknownSystemPolicy) -> Self {
        self.config.terminology.unknown_system = policy;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.exec.fail_fast = fail_fast;
        self
    }

    pub fn max_issues(mut self, max_issues: usize) -> Self {
        self.config.exec.max_issues = max_issues;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
