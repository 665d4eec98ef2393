use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("terminology timeout must be greater than zero when terminology validation is on")]
    ZeroTerminologyTimeout,

    #[error("max_issues must be greater than zero")]
    ZeroMaxIssues,

    #[error("configuration enables no validation step")]
    NoSteps,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a terminology lookup itself (as opposed to an unknown code).
#[derive(Debug, Error)]
pub enum TerminologyError {
    #[error("terminology service unavailable: {0}")]
    Unavailable(String),

    #[error("terminology lookup failed: {0}")]
    Lookup(String),
}
