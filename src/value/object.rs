use indexmap::map::{IntoIter, IndexMap, Iter, IterMut};
use std::iter::FromIterator;

use super::Value;

/// An ordered string-keyed map of response-name to completed value.
///
/// Order is preserved because `spec.md` §3 requires response-name insertion
/// order to be the emission order regardless of which sibling field resolved
/// first (§5 "Ordering guarantees").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self { fields: IndexMap::new() }
    }

    pub fn with_capacity(size: usize) -> Self {
        Self { fields: IndexMap::with_capacity(size) }
    }

    /// Inserts a field, merging into an existing object value at the same
    /// key rather than overwriting it. Used when the same response name is
    /// produced twice by overlapping selections that both resolve to
    /// objects (grouped-field-set merging happens earlier, but nested merges
    /// of this kind occur when assembling incremental payloads back into a
    /// parent shape).
    pub fn add_field(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match (value, self.fields.get_mut(&key)) {
            (Value::Object(incoming), Some(Value::Object(existing))) => {
                for (k, v) in incoming {
                    existing.add_field(k, v);
                }
                None
            }
            (value, _) => self.fields.insert(key, value),
        }
    }

    pub fn contains_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, String, Value> {
        self.fields.iter_mut()
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.add_field(k, v);
        }
        out
    }
}
