//! Ordered header container.
//!
//! HTTP allows a field to be repeated, so a header block is modeled as a list of distinct field
//! names, each carrying the list of values seen for it. Names keep the order in which they were
//! first inserted and values keep the order in which they were appended, which makes the wire
//! serialization of a request deterministic.
//!
//! Lookups are exact: the container never changes the case of a name. The request side keeps
//! names as the caller supplied them, the response side stores them lowercased.

use std::fmt;

/// A multimap from header field name to the ordered list of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates an empty header container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the list of `field`, creating the list if the field is new.
    pub fn append(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((field, vec![value])),
        }
    }

    /// Returns every value recorded for `field`, in insertion order.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first value recorded for `field`.
    pub fn get_first(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the distinct field names with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Iterates over `(field, value)` pairs, one per header line, in the order they would be
    /// serialized.
    pub fn lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (field, value) in iter {
            self.append(field, value);
        }
    }
}

impl fmt::Display for Headers {
    /// Formats the headers as `field: value` lines, each terminated by CRLF.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, value) in self.lines() {
            write!(f, "{field}: {value}\r\n")?;
        }
        Ok(())
    }
}
