use std::collections::HashMap;
use std::fmt::Debug;

use anyhow::anyhow;
use tokio_sqlite::Value;

/// Maps column names to their position in a row.
#[derive(Clone)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self {
            names: Vec::new(),
            positions: HashMap::new(),
        };
        for name in names {
            let name = name.into();
            if !index.positions.contains_key(&name) {
                index.positions.insert(name.clone(), index.names.len());
                index.names.push(name);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    /// Same columns minus `name`, used for inserts that let sqlite pick the id.
    pub fn without(&self, name: &str) -> Self {
        Self::new(self.names.iter().filter(|n| n.as_str() != name).cloned())
    }

    pub fn get_value<'v>(&self, values: &'v [Value], name: &str) -> Result<&'v Value, anyhow::Error> {
        if values.len() != self.len() {
            return Err(anyhow!(
                "Row has {} values, expected {}",
                values.len(),
                self.len()
            ));
        }
        self.positions
            .get(name)
            .and_then(|index| values.get(*index))
            .ok_or(anyhow!("Unknown column '{name}'"))
    }

    pub fn set_value(&self, values: &mut [Value], name: &str, value: impl Into<Value>) -> bool {
        match self.positions.get(name).and_then(|index| values.get_mut(*index)) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn new_values(&self) -> Vec<Value> {
        vec![Value::Null; self.len()]
    }

    /// `"a", "b", "c"` for use in a column list.
    pub fn format_columns(&self) -> String {
        self.names
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `?1, ?2, ?3` matching [`Self::format_columns`].
    pub fn format_placeholders(&self) -> String {
        (1..=self.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Debug for ColumnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ColumnIndex").field(&self.names).finish()
    }
}

pub(super) fn value_as_i64(v: &Value) -> Result<i64, anyhow::Error> {
    match v {
        Value::Integer(i) => Ok(*i),
        _ => Err(anyhow!("Expected Integer for i64")),
    }
}

pub(super) fn value_as_string(v: &Value) -> Result<String, anyhow::Error> {
    match v {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(anyhow!("Expected Text for String")),
    }
}

pub(super) fn value_as_string_opt(v: &Value) -> Result<Option<String>, anyhow::Error> {
    match v {
        Value::Null => Ok(None),
        v => value_as_string(v).map(Some),
    }
}
