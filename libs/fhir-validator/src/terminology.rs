//! Terminology lookups
//!
//! The terminology step asks a [`TerminologyService`] about every `Coding`
//! it finds. [`InMemoryTerminology`] is a small fixed code list, enough for
//! tests and closed deployments; remote services implement the same trait.

use crate::error::TerminologyError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Answer for one `(system, code)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLookup {
    Found { display: Option<String> },
    NotFound,
    UnknownSystem,
}

#[async_trait]
pub trait TerminologyService: Send + Sync {
    async fn lookup(&self, system: &str, code: &str) -> Result<CodeLookup, TerminologyError>;
}

#[async_trait]
impl<T: TerminologyService + ?Sized> TerminologyService for std::sync::Arc<T> {
    async fn lookup(&self, system: &str, code: &str) -> Result<CodeLookup, TerminologyError> {
        (**self).lookup(system, code).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTerminology {
    systems: HashMap<String, HashMap<String, Option<String>>>,
}

impl InMemoryTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(
        mut self,
        system: impl Into<String>,
        code: impl Into<String>,
        display: Option<&str>,
    ) -> Self {
        self.add_code(system, code, display);
        self
    }

    pub fn add_code(
        &mut self,
        system: impl Into<String>,
        code: impl Into<String>,
        display: Option<&str>,
    ) {
        self.systems
            .entry(system.into())
            .or_default()
            .insert(code.into(), display.map(str::to_string));
    }

    /// Register a system with no codes, so lookups report `NotFound`
    /// rather than `UnknownSystem`.
    pub fn add_system(&mut self, system: impl Into<String>) {
        self.systems.entry(system.into()).or_default();
    }

    pub fn knows_system(&self, system: &str) -> bool {
        self.systems.contains_key(system)
    }

    pub fn code_count(&self) -> usize {
        self.systems.values().map(HashMap::len).sum()
    }
}

#[async_trait]
impl TerminologyService for InMemoryTerminology {
    async fn lookup(&self, system: &str, code: &str) -> Result<CodeLookup, TerminologyError> {
        let Some(codes) = self.systems.get(system) else {
            return Ok(CodeLookup::UnknownSystem);
        };
        Ok(match codes.get(code) {
            Some(display) => CodeLookup::Found {
                display: display.clone(),
            },
            None => CodeLookup::NotFound,
        })
    }
}
