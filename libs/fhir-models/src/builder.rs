//! Fluent builders
//!
//! A builder accumulates a draft bag shaped like the canonical JSON of its
//! target type and hands it to the model constructor on `build`. Setters
//! return `Self`; a value that fails to convert is remembered and reported by
//! `build`, so a chain never has to stop halfway.

use crate::choice::{set_choice_variant, siblings_of, ChoiceType};
use crate::error::{json_kind, Error, Result};
use crate::model::FhirModel;
use crate::validation::Validator;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;

pub struct ModelBuilder<M> {
    draft: Map<String, Value>,
    error: Option<Error>,
    _model: PhantomData<fn() -> M>,
}

impl<M: FhirModel> Default for ModelBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for ModelBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("draft", &self.draft)
            .field("error", &self.error)
            .finish()
    }
}

impl<M: FhirModel> ModelBuilder<M> {
    pub fn new() -> Self {
        Self::from_draft(Map::new())
    }

    pub fn from_draft(draft: Map<String, Value>) -> Self {
        Self {
            draft,
            error: None,
            _model: PhantomData,
        }
    }

    /// Assign one key.
    pub fn set<T: Serialize>(self, key: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => self.set_value(key, json),
            Err(e) => self.fail(Error::invalid_field(key, e)),
        }
    }

    pub fn set_value(mut self, key: &str, value: Value) -> Self {
        self.draft.insert(key.to_string(), value);
        self
    }

    pub fn unset(mut self, key: &str) -> Self {
        self.draft.remove(key);
        self
    }

    /// Append `item` to the array at `key`, creating the array if needed.
    pub fn add_to_array<T: Serialize>(mut self, key: &str, item: T) -> Self {
        let item = match serde_json::to_value(item) {
            Ok(item) => item,
            Err(e) => return self.fail(Error::invalid_field(key, e)),
        };

        let slot = self
            .draft
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let mismatch = match slot {
            Value::Array(items) => {
                items.push(item);
                None
            }
            other => Some(json_kind(other)),
        };

        match mismatch {
            Some(found) => self.fail(Error::invalid_field(key, format!("cannot append to a {found}"))),
            None => self,
        }
    }

    /// Set one variant of a choice group and drop `siblings` from the draft.
    ///
    /// The caller names the siblings; [`ModelBuilder::set_choice`] derives
    /// them from a [`ChoiceType`].
    pub fn set_choice_variant<T: Serialize>(mut self, chosen: &str, value: T, siblings: &[&str]) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => {
                set_choice_variant(&mut self.draft, chosen, json, siblings);
                self
            }
            Err(e) => self.fail(Error::invalid_field(chosen, e)),
        }
    }

    /// Typed choice setter: the variant key and its siblings come from `C`.
    pub fn set_choice<C: ChoiceType>(mut self, choice: C) -> Self {
        let key = choice.key();
        match choice.to_value() {
            Ok(json) => {
                let siblings = siblings_of::<C>(key);
                let siblings: Vec<&str> = siblings.iter().map(String::as_str).collect();
                set_choice_variant(&mut self.draft, key, json, &siblings);
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// The draft as it stands.
    pub fn draft(&self) -> &Map<String, Value> {
        &self.draft
    }

    pub fn build(self) -> Result<M> {
        if let Some(error) = self.error {
            return Err(error);
        }
        M::from_json(self.draft)
    }

    /// Build, then await `validator`. A failed outcome is returned as one
    /// [`Error::Validation`] carrying every issue; the instance is dropped.
    pub async fn build_validated<V: Validator + ?Sized>(self, validator: &V) -> Result<M> {
        let model = self.build()?;
        let resource = model.to_value()?;
        let outcome = validator.validate(&resource).await;
        if !outcome.valid {
            tracing::debug!(
                type_name = M::table().type_name(),
                errors = outcome.error_count(),
                "built model failed validation"
            );
            return Err(Error::Validation(outcome));
        }
        Ok(model)
    }

    fn fail(mut self, error: Error) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }
}

/// Declare a typed builder wrapping [`ModelBuilder`].
///
/// Each setter line maps a method to a wire key. `set` assigns, `push`
/// appends to an array and `choice` calls [`ModelBuilder::set_choice`].
#[macro_export]
macro_rules! typed_builder {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $model:ty {
            $($kind:ident $method:ident($arg:ty) => $key:literal;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        $vis struct $name {
            inner: $crate::ModelBuilder<$model>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn id(self, id: impl Into<String>) -> Self {
                Self { inner: self.inner.set("id", id.into()) }
            }

            pub fn add_extension(self, extension: $crate::datatypes::Extension) -> Self {
                Self { inner: self.inner.add_to_array("extension", extension) }
            }

            $($crate::typed_builder!(@setter $kind $method($arg) => $key);)*

            /// Escape hatch to the untyped builder.
            pub fn into_inner(self) -> $crate::ModelBuilder<$model> {
                self.inner
            }

            pub fn build(self) -> $crate::Result<$model> {
                self.inner.build()
            }

            pub async fn build_validated<V: $crate::Validator + ?Sized>(
                self,
                validator: &V,
            ) -> $crate::Result<$model> {
                self.inner.build_validated(validator).await
            }
        }
    };
    (@setter set $method:ident($arg:ty) => $key:literal) => {
        pub fn $method(self, value: $arg) -> Self {
            Self { inner: self.inner.set($key, value) }
        }
    };
    (@setter push $method:ident($arg:ty) => $key:literal) => {
        pub fn $method(self, item: $arg) -> Self {
            Self { inner: self.inner.add_to_array($key, item) }
        }
    };
    (@setter choice $method:ident($arg:ty) => $key:literal) => {
        pub fn $method(self, value: $arg) -> Self {
            Self { inner: self.inner.set_choice(value) }
        }
    };
}
