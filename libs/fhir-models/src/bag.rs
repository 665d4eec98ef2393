//! Property assignment
//!
//! Every constructor runs its input through the same engine: only keys that
//! are both present in the source and listed by the type's property table
//! survive. Anything else is dropped without an error; dropped keys are
//! reported at `debug` level so schema drift stays observable.

use crate::choice::{ChoiceShadow, ChoiceType};
use crate::envelope::Element;
use crate::error::{Error, Result};
use crate::table::PropertyTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Copy the keys present in both `source` and `allow_list`.
///
/// The result follows allow-list order. Values are cloned shallowly as JSON
/// values; keys bound to `null` count as absent.
pub fn assign_props<'a>(
    source: &Map<String, Value>,
    allow_list: impl IntoIterator<Item = &'a str>,
) -> Map<String, Value> {
    let mut target = Map::new();
    for name in allow_list {
        match source.get(name) {
            Some(Value::Null) | None => {}
            Some(value) => {
                target.insert(name.to_string(), value.clone());
            }
        }
    }
    target
}

/// Draft property storage used while reading or writing a model.
///
/// Reading: the bag holds the allow-listed input and typed values are taken
/// out of it one property at a time. Writing: properties are put in any
/// order and the ordered serializer lays them out afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    entries: Map<String, Value>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the assignment engine over an owned source, moving values.
    pub fn assign(source: Map<String, Value>, table: &PropertyTable) -> Self {
        let mut entries = Map::new();
        for (name, value) in source {
            if value.is_null() {
                continue;
            }
            if table.allows(&name) {
                entries.insert(name, value);
            } else {
                tracing::debug!(
                    type_name = table.type_name(),
                    field = %name,
                    "dropping property not declared by the schema"
                );
            }
        }
        Self { entries }
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Remove `name` and decode it.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        match self.entries.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::invalid_field(name, e)),
        }
    }

    /// Remove whichever variant of `C`'s group is present.
    ///
    /// Two variants of the same group in one input is a conflict: a typed
    /// model can only ever carry one.
    pub fn take_choice<C: ChoiceType>(&mut self) -> Result<Option<C>> {
        let present: Vec<&'static str> = C::VARIANTS
            .iter()
            .copied()
            .filter(|key| self.entries.contains_key(*key))
            .collect();

        let Some(&first) = present.first() else {
            return Ok(None);
        };
        if let Some(second) = present.get(1) {
            return Err(Error::ChoiceConflict {
                group: C::GROUP.to_string(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }

        match self.entries.remove(first) {
            Some(value) => C::from_entry(first, value).transpose(),
            None => Ok(None),
        }
    }

    /// Remove the shadow of `C`'s group that belongs with `choice`.
    ///
    /// With a chosen variant, only that variant's shadow is kept. Without
    /// one, a lone shadow is kept as it is (extensions on an absent
    /// primitive); two shadows of one group conflict like two values do.
    pub fn take_choice_shadow<C: ChoiceType>(
        &mut self,
        choice: Option<&C>,
    ) -> Result<Option<ChoiceShadow>> {
        let present: Vec<&'static str> = C::SHADOWS
            .iter()
            .copied()
            .filter(|key| self.entries.contains_key(*key))
            .collect();

        let keep = match (choice, present.as_slice()) {
            (Some(choice), _) => choice.shadow_key(),
            (None, [first, second, ..]) => {
                return Err(Error::ChoiceConflict {
                    group: C::GROUP.to_string(),
                    first: first.to_string(),
                    second: second.to_string(),
                })
            }
            (None, present) => present.first().copied(),
        };

        let mut shadow = None;
        for key in present {
            if Some(key) == keep {
                shadow = self
                    .take::<Element>(key)?
                    .map(|element| ChoiceShadow::new(key, element));
            } else if self.entries.remove(key).is_some() {
                tracing::debug!(field = key, "dropping shadow of an unselected choice variant");
            }
        }
        Ok(shadow)
    }

    /// Put `value` under `name` when it is defined.
    pub fn put<T: Serialize>(&mut self, name: &str, value: &Option<T>) -> Result<()> {
        if let Some(value) = value {
            let json = serde_json::to_value(value).map_err(|e| Error::invalid_field(name, e))?;
            self.entries.insert(name.to_string(), json);
        }
        Ok(())
    }

    /// Put a choice value under its variant key, and its shadow under the
    /// shadow's own key.
    ///
    /// A shadow left over from a different variant than the current value
    /// is not written.
    pub fn put_choice<C: ChoiceType>(
        &mut self,
        choice: &Option<C>,
        shadow: &Option<ChoiceShadow>,
    ) -> Result<()> {
        if let Some(choice) = choice {
            self.entries.insert(choice.key().to_string(), choice.to_value()?);
        }
        let Some(shadow) = shadow else {
            return Ok(());
        };
        match choice.as_ref().map(ChoiceType::shadow_key) {
            Some(expected) if expected != Some(shadow.key) => {
                tracing::debug!(
                    field = shadow.key,
                    "dropping shadow that does not match the chosen variant"
                );
                Ok(())
            }
            _ => self.put(shadow.key, &Some(&shadow.element)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{EnvelopeKind, PropertyDef};
    use serde_json::json;

    const PROPERTIES: &[PropertyDef] = &[
        PropertyDef::scalar("active", "boolean"),
        PropertyDef::shadow("_active"),
        PropertyDef::array("name", "HumanName"),
    ];
    static TABLE: PropertyTable = PropertyTable::new("Patient", EnvelopeKind::Resource, PROPERTIES);

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_assign_props_filters_and_orders() {
        let source = object(json!({"zzz": 1, "name": [{"family": "Smith"}], "active": true}));
        let assigned = assign_props(&source, ["active", "name", "birthDate"]);

        let keys: Vec<&str> = assigned.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["active", "name"]);
        assert!(!assigned.contains_key("zzz"));
    }

    #[test]
    fn test_assign_props_skips_null() {
        let source = object(json!({"active": null}));
        assert!(assign_props(&source, ["active"]).is_empty());
    }

    #[test]
    fn test_bag_assign_drops_unknown() {
        let source = object(json!({"active": true, "favouriteColour": "blue", "id": "p1"}));
        let bag = PropertyBag::assign(source, &TABLE);

        assert!(bag.contains("active"));
        assert!(bag.contains("id"));
        assert!(!bag.contains("favouriteColour"));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_take_reports_field_name() {
        let mut bag = PropertyBag::from_map(object(json!({"active": "yes"})));
        let err = bag.take::<bool>("active").unwrap_err();
        assert!(matches!(err, Error::InvalidFieldValue { ref field, .. } if field == "active"));
    }

    #[test]
    fn test_put_skips_none() {
        let mut bag = PropertyBag::new();
        bag.put::<bool>("active", &None).unwrap();
        bag.put("name", &Some(vec![json!({"family": "Smith"})])).unwrap();
        assert!(!bag.contains("active"));
        assert_eq!(bag.as_map()["name"][0]["family"], "Smith");
    }

    #[test]
    fn test_put_choice_writes_lone_shadow() {
        use crate::resources::PatientDeceased;

        let mut bag = PropertyBag::from_map(object(json!({"_deceasedDateTime": {"id": "d"}})));
        let shadow = bag.take_choice_shadow::<PatientDeceased>(None).unwrap();
        assert_eq!(shadow.as_ref().map(|s| s.key), Some("_deceasedDateTime"));
        assert!(bag.is_empty());

        let mut out = PropertyBag::new();
        out.put_choice::<PatientDeceased>(&None, &shadow).unwrap();
        assert_eq!(out.as_map()["_deceasedDateTime"]["id"], "d");
    }

    #[test]
    fn test_put_choice_skips_mismatched_shadow() {
        use crate::resources::PatientDeceased;

        let shadow = Some(ChoiceShadow::new("_deceasedBoolean", Element::default()));
        let mut out = PropertyBag::new();
        out.put_choice(&Some(PatientDeceased::DateTime("2020".to_string())), &shadow)
            .unwrap();
        assert!(out.contains("deceasedDateTime"));
        assert!(!out.contains("_deceasedBoolean"));
    }
}
