//! The model trait
//!
//! A concrete type supplies its property table, its envelope and two small
//! functions that move its own properties in and out of a [`PropertyBag`].
//! Construction, canonical serialization, immutable updates and builders
//! are provided on top of that.

use crate::bag::PropertyBag;
use crate::builder::ModelBuilder;
use crate::envelope::Envelope;
use crate::error::{json_kind, Error, Result};
use crate::serializer::emit_properties;
use crate::table::PropertyTable;
use crate::update::merge_shallow;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// A typed FHIR structure backed by a property table.
///
/// `Clone` is the deep clone: every nested value is owned, so a clone never
/// shares arrays or objects with its source.
pub trait FhirModel: Debug + Clone + Sized + Send + Sync {
    type Envelope: Envelope;

    fn table() -> &'static PropertyTable;

    fn envelope(&self) -> &Self::Envelope;

    fn envelope_mut(&mut self) -> &mut Self::Envelope;

    /// Take this type's own properties out of an assigned bag.
    fn read_properties(envelope: Self::Envelope, bag: &mut PropertyBag) -> Result<Self>;

    /// Put this type's own properties into `bag`, in any order.
    fn write_properties(&self, bag: &mut PropertyBag) -> Result<()>;

    /// Construct from a partial JSON object.
    ///
    /// Keys the table does not declare are dropped. A resource whose
    /// `resourceType` names another type is rejected.
    fn from_json(source: Map<String, Value>) -> Result<Self> {
        let table = Self::table();
        if table.is_resource() {
            check_resource_type(&source, table)?;
        }

        let mut bag = PropertyBag::assign(source, table);
        let envelope = Self::Envelope::read(&mut bag)?;
        let model = Self::read_properties(envelope, &mut bag)?;

        for name in bag.keys() {
            tracing::debug!(
                type_name = table.type_name(),
                field = name,
                "assigned property not consumed by the model"
            );
        }
        Ok(model)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_json(map),
            other => Err(Error::ExpectedObject {
                type_name: Self::table().type_name().to_string(),
                found: json_kind(&other),
            }),
        }
    }

    fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Canonical JSON: envelope fields, then properties in table order.
    fn to_json(&self) -> Result<Map<String, Value>> {
        let table = Self::table();
        let mut out = Map::new();
        self.envelope().write(table, &mut out)?;

        let mut bag = PropertyBag::new();
        self.write_properties(&mut bag)?;
        emit_properties(bag, table, &mut out);
        Ok(out)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Object(self.to_json()?))
    }

    fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// New instance with `changes` merged shallowly over the canonical view.
    fn with(&self, changes: Map<String, Value>) -> Result<Self> {
        let view = self.to_json()?;
        Self::from_json(merge_shallow(view, changes, Self::table()))
    }

    /// New instance with the patch returned by `transform` merged over the
    /// canonical view. `transform` only sees a shared borrow of the view.
    fn apply_transform<F>(&self, transform: F) -> Result<Self>
    where
        F: FnOnce(&Map<String, Value>) -> Map<String, Value>,
    {
        let view = self.to_json()?;
        let patch = transform(&view);
        Self::from_json(merge_shallow(view, patch, Self::table()))
    }

    /// Untyped fluent builder for this type.
    fn builder() -> ModelBuilder<Self> {
        ModelBuilder::new()
    }

    /// Builder seeded with this instance's canonical view.
    fn to_builder(&self) -> Result<ModelBuilder<Self>> {
        Ok(ModelBuilder::from_draft(self.to_json()?))
    }
}

fn check_resource_type(source: &Map<String, Value>, table: &PropertyTable) -> Result<()> {
    match source.get("resourceType") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(actual)) if actual == table.type_name() => Ok(()),
        Some(Value::String(actual)) => Err(Error::ResourceTypeMismatch {
            expected: table.type_name().to_string(),
            actual: actual.clone(),
        }),
        Some(other) => Err(Error::invalid_field(
            "resourceType",
            format!("expected a string, found {}", json_kind(other)),
        )),
    }
}

/// Implement serde `Serialize`, `Deserialize` and `Display` for a model
/// through its canonical JSON, so models nest in other models and in choice
/// variants.
#[macro_export]
macro_rules! impl_model_serde {
    ($ty:ty) => {
        impl $crate::__private::serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                use $crate::__private::serde::ser::Error as _;
                let json = $crate::FhirModel::to_json(self).map_err(S::Error::custom)?;
                $crate::__private::serde::Serialize::serialize(&json, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                use $crate::__private::serde::de::Error as _;
                let value =
                    <$crate::__private::Value as $crate::__private::serde::Deserialize>::deserialize(
                        deserializer,
                    )?;
                <$ty as $crate::FhirModel>::from_value(value).map_err(D::Error::custom)
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let json = $crate::FhirModel::to_json_string(self).map_err(|_| ::std::fmt::Error)?;
                f.write_str(&json)
            }
        }
    };
}
