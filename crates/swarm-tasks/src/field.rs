// field.rs — Tagged values for loosely-typed document fields.
//
// tasks.json is shared by many agents and is sometimes edited by hand, so any
// field can hold a value of the wrong shape. Instead of rejecting the whole
// document, each field records what it found: nothing, an explicit null, a
// value of the wrong shape, or a typed value. Serializing writes back exactly
// the JSON that was read, so an untouched task keeps its checksum.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A single document field.
///
/// Struct fields of this type should be declared with
/// `#[serde(default, skip_serializing_if = "Field::is_absent")]` so a missing
/// key stays missing on save.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The key is not in the document.
    Absent,
    /// The key is present with a JSON `null`.
    Null,
    /// The key is present but its value does not have the expected shape.
    Malformed(Value),
    /// The key holds a well-formed value.
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// Absent or null: the two ways a document says "no value".
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Absent | Field::Null)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Field::Malformed(_))
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: DeserializeOwned> Field<T> {
    /// Classify a raw JSON value.
    ///
    /// The typed parse goes through the value's text so that large or
    /// high-precision numbers nested in `T` keep their exact digits.
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return Field::Null;
        }
        match serde_json::from_str::<T>(&value.to_string()) {
            Ok(typed) => Field::Present(typed),
            Err(_) => Field::Malformed(value),
        }
    }
}

impl Field<String> {
    /// The trimmed string, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.present()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// True when the field is unset or a non-blank string.
    pub fn is_optional_text(&self) -> bool {
        self.is_unset() || self.text().is_some()
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Present(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Absent | Field::Null => serializer.serialize_none(),
            Field::Malformed(raw) => raw.serialize(serializer),
            Field::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Field::from_value(value))
    }
}

/// One element of a list field. Wrong-shaped elements are kept as raw JSON
/// so the rest of the list stays usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Valid(T),
    Invalid(Value),
}

impl<T> Entry<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Entry::Valid(value) => Some(value),
            Entry::Invalid(_) => None,
        }
    }
}

/// The list of well-formed elements of a list field, or `None` when the
/// field is not a list at all. Unset fields yield an empty list.
pub fn valid_entries<T>(field: &Field<Vec<Entry<T>>>) -> Option<Vec<&T>> {
    match field {
        Field::Absent | Field::Null => Some(Vec::new()),
        Field::Malformed(_) => None,
        Field::Present(entries) => Some(entries.iter().filter_map(Entry::valid).collect()),
    }
}

/// Trimmed, non-empty, de-duplicated strings in first-seen order.
pub fn dedup_strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Wrap plain strings as a list field.
pub fn string_list(items: Vec<String>) -> Field<Vec<Entry<String>>> {
    Field::Present(items.into_iter().map(Entry::Valid).collect())
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent | Field::Null => write!(f, "-"),
            Field::Malformed(raw) => write!(f, "{}", raw),
            Field::Present(value) => write!(f, "{}", value),
        }
    }
}
