//! Named values used for metadata and dictionary entries.

use super::{TypedValue, Value};

/// A named, tag-checked value.
///
/// The name may be empty for anonymous comment metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaVariable {
    pub name: String,
    pub value: Value,
}

impl MetaVariable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn set_value<T: TypedValue>(&mut self, value: T) {
        self.value = value.into_value();
    }

    /// Returns the value only when its tag matches `T` exactly.
    pub fn get_value<T: TypedValue>(&self) -> Option<T> {
        T::from_value(&self.value)
    }

    #[inline]
    pub fn type_name(&self) -> String {
        self.value.type_name()
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.value.is_blocked()
    }
}

/// Insertion ordered string to [`MetaVariable`] map.
///
/// Writing an existing key replaces its value in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dictionary {
    entries: Vec<MetaVariable>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `var` under its own name. Returns the replaced variable.
    pub fn insert(&mut self, var: MetaVariable) -> Option<MetaVariable> {
        match self.entries.iter_mut().find(|e| e.name == var.name) {
            Some(existing) => Some(std::mem::replace(existing, var)),
            None => {
                self.entries.push(var);
                None
            }
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<MetaVariable> {
        self.insert(MetaVariable::new(name, value))
    }

    pub fn get(&self, name: &str) -> Option<&MetaVariable> {
        self.entries.iter().find(|e| e.name == name)
    }

    #[inline]
    pub fn get_value<T: TypedValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(MetaVariable::get_value)
    }

    #[inline]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<MetaVariable> {
        let index = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(index))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetaVariable> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = &'a MetaVariable;
    type IntoIter = std::slice::Iter<'a, MetaVariable>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<MetaVariable> for Dictionary {
    fn from_iter<I: IntoIterator<Item = MetaVariable>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for var in iter {
            dict.insert(var);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut dict = Dictionary::new();
        dict.set("a", Value::Float(1.0));
        dict.set("b", Value::Int(3));
        let old = dict.set("a", Value::Float(2.0));

        assert_eq!(old.map(|v| v.value), Some(Value::Float(1.0)));
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get_value::<f32>("a"), Some(2.0));

        // First insertion slot is kept.
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn tag_checked_access() {
        let mut var = MetaVariable::new("weight", Value::Double(0.5));
        assert_eq!(var.get_value::<f64>(), Some(0.5));
        assert_eq!(var.get_value::<f32>(), None);

        var.set_value(String::from("text"));
        assert_eq!(var.type_name(), "string");
        assert_eq!(var.get_value::<String>().as_deref(), Some("text"));
    }

    #[test]
    fn remove_entry() {
        let mut dict: Dictionary = [
            MetaVariable::new("x", Value::Int(1)),
            MetaVariable::new("y", Value::Int(2)),
        ]
        .into_iter()
        .collect();

        assert!(dict.remove("x").is_some());
        assert!(!dict.contains_key("x"));
        assert_eq!(dict.len(), 1);
    }
}
