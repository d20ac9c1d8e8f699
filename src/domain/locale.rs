//! Localized field values as returned by the two CMS APIs.
//!
//! The delivery API flattens a localized field to the value of the requested
//! locale while the management API keeps the full `{locale: value}` map. Both
//! shapes are captured by [`LocalizedValue`] and resolved by
//! [`LocalizedValue::resolve`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedValue<T> {
    Flattened(T),
    LocaleMap(IndexMap<String, T>),
}

/// Values that can be blank and should then be skipped during resolution.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> LocalizedValue<T>
where
    T: Blank,
{
    /// Pick the value for `default_locale`, falling back to the first
    /// non-blank locale in document order.
    pub fn resolve(&self, default_locale: &str) -> Option<&T> {
        match self {
            LocalizedValue::Flattened(value) => (!value.is_blank()).then_some(value),
            LocalizedValue::LocaleMap(map) => map
                .get(default_locale)
                .filter(|value| !value.is_blank())
                .or_else(|| map.values().find(|value| !value.is_blank())),
        }
    }
}

impl LocalizedValue<String> {
    pub fn resolve_string(&self, default_locale: &str) -> Option<String> {
        self.resolve(default_locale).cloned()
    }
}
