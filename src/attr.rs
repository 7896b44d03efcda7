// src/attr.rs

use std::{collections::BTreeMap, fs, path::Path};

use serde_yaml::Value as Yaml;

use crate::error::{ReadError, Result};
use crate::table::{Table, Value};

/// One node of an [`AttrMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Table(Table),
    Map(AttrMap),
    Seq(Vec<Entry>),
    Scalar(Value),
}

/// Ordered mapping from names to tables, nested mappings and scalars.
///
/// Result sets, their configuration documents and run-sets are all built
/// from this type; entries are addressed by arbitrary string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrMap(BTreeMap<String, Entry>);

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.0.insert(key.into(), entry)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn table(&self, key: &str) -> Option<&Table> {
        match self.get(key)? {
            Entry::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn map(&self, key: &str) -> Option<&AttrMap> {
        match self.get(key)? {
            Entry::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn scalar(&self, key: &str) -> Option<&Value> {
        match self.get(key)? {
            Entry::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Walks nested maps along a dotted path, e.g. `"model.subset_t"`.
    pub fn get_path(&self, path: &str) -> Option<&Entry> {
        let mut parts = path.split('.');
        let mut entry = self.get(parts.next()?)?;
        for part in parts {
            match entry {
                Entry::Map(m) => entry = m.get(part)?,
                _ => return None,
            }
        }
        Some(entry)
    }

    /// Loads a YAML document whose top level is a mapping. An empty
    /// document yields an empty map.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ReadError::io(path, e))?;
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let doc: Yaml = serde_yaml::from_str(&text).map_err(|source| ReadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        match yaml_to_entry(doc) {
            Entry::Map(m) => Ok(m),
            Entry::Scalar(Value::Null) => Ok(Self::new()),
            _ => Err(ReadError::NotAMapping {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FromIterator<(String, Entry)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AttrMap {
    type Item = (&'a String, &'a Entry);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn yaml_to_entry(value: Yaml) -> Entry {
    match value {
        Yaml::Null => Entry::Scalar(Value::Null),
        Yaml::Bool(b) => Entry::Scalar(Value::Bool(b)),
        Yaml::Number(n) => Entry::Scalar(match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        }),
        Yaml::String(s) => Entry::Scalar(Value::Str(s)),
        Yaml::Sequence(seq) => Entry::Seq(seq.into_iter().map(yaml_to_entry).collect()),
        Yaml::Mapping(map) => Entry::Map(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_entry(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_entry(tagged.value),
    }
}

fn yaml_key(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
