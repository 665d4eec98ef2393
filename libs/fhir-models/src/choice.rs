//! Choice types (`value[x]` and friends)
//!
//! A choice group is one logical field that is represented on the wire by
//! exactly one of several type-suffixed keys (`valueQuantity`,
//! `valueString`, ...). Typed models hold a choice as an enum generated by
//! [`choice_type!`], which makes "two variants at once" unrepresentable.
//! Draft property bags use [`set_choice_variant`].

use crate::envelope::Element;
use crate::error::Result;
use serde_json::{Map, Value};

/// Set `chosen` to `value` and remove every sibling key from `bag`.
///
/// `siblings` lists the other variants of the group and their `_shadow`
/// names. The call does not check that `chosen` belongs to the group, and it
/// never touches the shadow of `chosen` itself.
pub fn set_choice_variant(
    bag: &mut Map<String, Value>,
    chosen: &str,
    value: Value,
    siblings: &[&str],
) {
    for sibling in siblings {
        if *sibling != chosen && bag.remove(*sibling).is_some() {
            tracing::trace!(chosen, cleared = *sibling, "cleared choice sibling");
        }
    }
    bag.insert(chosen.to_string(), value);
}

/// Sibling keys of `chosen` within `C`'s group, shadows included.
pub fn siblings_of<C: ChoiceType>(chosen: &str) -> Vec<String> {
    C::VARIANTS
        .iter()
        .filter(|key| **key != chosen)
        .flat_map(|key| [key.to_string(), format!("_{key}")])
        .collect()
}

/// Extensions of a primitive choice variant, tagged with the `_key` they
/// live under.
///
/// FHIR allows `_deceasedBoolean` without `deceasedBoolean`, so the shadow
/// names its variant itself rather than borrowing it from the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceShadow {
    /// Shadow key, e.g. `_deceasedBoolean`
    pub key: &'static str,
    pub element: Element,
}

impl ChoiceShadow {
    pub fn new(key: &'static str, element: Element) -> Self {
        Self { key, element }
    }

    /// Shadow for the variant of `choice`; `None` for complex variants.
    pub fn of<C: ChoiceType>(choice: &C, element: Element) -> Option<Self> {
        choice.shadow_key().map(|key| Self::new(key, element))
    }
}

/// A closed set of variants for one choice group.
pub trait ChoiceType: Sized {
    /// Logical group name (`"value"` for `value[x]`)
    const GROUP: &'static str;

    /// Wire keys of all variants, in canonical order
    const VARIANTS: &'static [&'static str];

    /// Shadow keys of the primitive variants
    const SHADOWS: &'static [&'static str];

    /// Wire key of this variant
    fn key(&self) -> &'static str;

    /// `_key` for primitive variants, which may carry extensions
    fn shadow_key(&self) -> Option<&'static str>;

    fn to_value(&self) -> Result<Value>;

    /// Decode the variant stored under `key`; `None` when `key` is not a
    /// member of this group.
    fn from_entry(key: &str, value: Value) -> Option<Result<Self>>;

    /// Parse a whole object that contains at most one variant of the group.
    fn find_in(map: &Map<String, Value>) -> Option<Result<Self>> {
        Self::VARIANTS
            .iter()
            .find_map(|key| map.get(*key).map(|value| Self::from_entry(key, value.clone())))
            .flatten()
    }
}

/// Declare a choice-group enum and its [`ChoiceType`] implementation.
///
/// ```
/// ferrum_models::choice_type! {
///     /// Patient.deceased[x]
///     pub enum Deceased("deceased") {
///         Boolean(bool) => "deceasedBoolean", shadow "_deceasedBoolean";
///         DateTime(String) => "deceasedDateTime", shadow "_deceasedDateTime";
///     }
/// }
///
/// use ferrum_models::ChoiceType;
/// assert_eq!(Deceased::Boolean(true).key(), "deceasedBoolean");
/// ```
#[macro_export]
macro_rules! choice_type {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($group:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident($ty:ty) => $key:literal $(, shadow $shadow:literal)?;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant($ty),
            )+
        }

        impl $crate::choice::ChoiceType for $name {
            const GROUP: &'static str = $group;
            const VARIANTS: &'static [&'static str] = &[$($key),+];
            const SHADOWS: &'static [&'static str] = &[$($($shadow,)?)+];

            fn key(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $key,)+
                }
            }

            fn shadow_key(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant(_) => $crate::choice_type!(@shadow $($shadow)?),)+
                }
            }

            fn to_value(&self) -> $crate::Result<$crate::__private::Value> {
                match self {
                    $(
                        Self::$variant(value) => $crate::__private::serde_json::to_value(value)
                            .map_err(|e| $crate::Error::invalid_field($key, e)),
                    )+
                }
            }

            fn from_entry(
                key: &str,
                value: $crate::__private::Value,
            ) -> Option<$crate::Result<Self>> {
                match key {
                    $(
                        $key => Some(
                            $crate::__private::serde_json::from_value::<$ty>(value)
                                .map(Self::$variant)
                                .map_err(|e| $crate::Error::invalid_field($key, e)),
                        ),
                    )+
                    _ => None,
                }
            }
        }
    };
    (@shadow $shadow:literal) => {
        Some($shadow)
    };
    (@shadow) => {
        None
    };
}
