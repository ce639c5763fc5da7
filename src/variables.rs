// src/variables.rs

//! The variable pool: named values tasks read as inputs and write as outputs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::types::{Args, Value};

/// Name to value mapping shared by the tasks of a graph run.
///
/// Ordered by name so logs and reports are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablePool {
    values: BTreeMap<String, Value>,
}

impl VariablePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Merge `values` into the pool; existing names are overwritten.
    pub fn extend<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Remove every entry holding `value`. Returns the names removed.
    pub fn remove_value(&mut self, value: &Value) -> Vec<String> {
        let names: Vec<String> = self
            .values
            .iter()
            .filter(|(_, v)| *v == value)
            .map(|(k, _)| k.clone())
            .collect();
        for name in &names {
            self.values.remove(name);
        }
        names
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ordered arguments for `inputs`; absent names become `None`.
    pub fn args_for<S: AsRef<str>>(&self, inputs: &[S]) -> Args {
        inputs
            .iter()
            .map(|name| self.values.get(name.as_ref()).cloned())
            .collect()
    }
}

impl From<BTreeMap<String, Value>> for VariablePool {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl From<HashMap<String, Value>> for VariablePool {
    fn from(values: HashMap<String, Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariablePool {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl fmt::Display for VariablePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_for_uses_none_for_absent_names() {
        let pool: VariablePool = [("value", 7)].into_iter().collect();
        let args = pool.args_for(&["run_id", "value"]);
        assert_eq!(args, vec![None, Some(Value::Int(7))]);
    }

    #[test]
    fn remove_value_drops_every_matching_entry() {
        let mut pool = VariablePool::new();
        pool.insert("a", "sample");
        pool.insert("b", "sample");
        pool.insert("c", 3);

        let removed = pool.remove_value(&Value::from("sample"));
        assert_eq!(removed, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(pool.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn extend_overwrites_existing_names() {
        let mut pool: VariablePool = [("x", 1)].into_iter().collect();
        pool.extend([("x", Value::Int(2)), ("y", Value::Int(3))]);
        assert_eq!(pool.get("x"), Some(&Value::Int(2)));
        assert_eq!(pool.to_string(), "{x: 2, y: 3}");
    }
}
