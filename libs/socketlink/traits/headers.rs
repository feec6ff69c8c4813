//! Request headers
//!
//! Two layers of headers are combined for every request:
//!
//! - the connection-wide defaults ([`HeaderSet`]), configured once at connect time
//! - the per-request layer ([`HeaderOverrides`]), which can replace a default
//!   or remove it entirely
//!
//! Header names are case-insensitive and are stored lowercased.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Concrete header name -> value mapping
///
/// Used for connection defaults and for the final headers sent with a
/// request. Inserting a name that is already present (in any casing)
/// replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderedEntries<String>", into = "BTreeMap<String, String>")]
pub struct HeaderSet {
    inner: BTreeMap<String, String>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any same-named value
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for HeaderSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<OrderedEntries<String>> for HeaderSet {
    fn from(entries: OrderedEntries<String>) -> Self {
        entries.0.into_iter().collect()
    }
}

impl From<HeaderSet> for BTreeMap<String, String> {
    fn from(set: HeaderSet) -> Self {
        set.inner
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// A single per-request header entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOverride {
    /// Send this value, replacing any default
    Set(String),
    /// Do not send this header, even if a default exists
    Remove,
}

impl From<Option<String>> for HeaderOverride {
    /// `None` and the empty string both mean removal
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.is_empty() => HeaderOverride::Set(v),
            _ => HeaderOverride::Remove,
        }
    }
}

/// Per-request header layer
///
/// ```
/// use socketlink::HeaderOverrides;
///
/// let overrides = HeaderOverrides::new()
///     .set("x-test-header-one", "baz")
///     .remove("x-test-header-two");
/// assert_eq!(overrides.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OrderedEntries<Option<String>>")]
pub struct HeaderOverrides {
    inner: BTreeMap<String, HeaderOverride>,
}

impl HeaderOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a header. An empty value is treated as a removal.
    pub fn set(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, Some(value.into()));
        self
    }

    /// Suppress a header for this request
    pub fn remove(mut self, name: impl AsRef<str>) -> Self {
        self.insert(name, None);
        self
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: Option<String>) {
        self.inner
            .insert(name.as_ref().to_ascii_lowercase(), HeaderOverride::from(value));
    }

    pub fn get(&self, name: &str) -> Option<&HeaderOverride> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<OrderedEntries<Option<String>>> for HeaderOverrides {
    fn from(entries: OrderedEntries<Option<String>>) -> Self {
        let mut overrides = HeaderOverrides::new();
        for (name, value) in entries.0 {
            overrides.insert(name, value);
        }
        overrides
    }
}

impl From<HeaderSet> for HeaderOverrides {
    fn from(set: HeaderSet) -> Self {
        let mut overrides = HeaderOverrides::new();
        for (name, value) in set.iter() {
            overrides.insert(name, Some(value.to_string()));
        }
        overrides
    }
}

/// Map entries in input order, so a later spelling of a name wins over an
/// earlier one when both are lowercased on insert
struct OrderedEntries<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = OrderedEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// Combine connection defaults with a per-request layer
///
/// - a per-request value replaces the same-named default
/// - a per-request removal drops the header even if a default exists
/// - defaults not mentioned per request pass through unchanged
pub fn merge(defaults: &HeaderSet, overrides: &HeaderOverrides) -> HeaderSet {
    let mut merged = defaults.clone();
    for (name, entry) in &overrides.inner {
        match entry {
            HeaderOverride::Set(value) => merged.insert(name, value.clone()),
            HeaderOverride::Remove => {
                merged.remove(name);
            }
        }
    }
    merged
}
