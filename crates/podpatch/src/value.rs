// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The heterogeneous tree that patches read from and write into.
//!
//! A session document mixes two kinds of inner nodes: typed [`Object`]s,
//! whose set of attributes is fixed by their type, and untyped [`Mapping`]s,
//! whose keys are free-form. Patch values start out as plain YAML data and
//! only become objects once they pass through the type registry.

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[cfg(test)]
#[path = "./value_test.rs"]
mod value_test;

/// Ordered string-keyed mapping.
pub type Mapping = IndexMap<String, Value>;

/// A node in a session document, a patch value or the templating scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Mapping),
    Object(Object),
}

/// An instance of a registered type.
///
/// Every attribute the type declares is present, unset ones hold
/// [`Value::Null`]. Attributes are stored and serialized under their
/// declared (wire) names, and can also be addressed in snake_case.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    kind: String,
    fields: IndexMap<String, Value>,
}

impl Object {
    /// Create an object of `kind` with the given declared attributes, all unset.
    pub(crate) fn with_fields<'a>(
        kind: impl Into<String>,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            kind: kind.into(),
            fields: names
                .into_iter()
                .map(|name| (name.to_string(), Value::Null))
                .collect(),
        }
    }

    /// Name of the registered type this object was built from.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Resolve a wire or snake_case name to the declared attribute name.
    fn attribute_name(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.fields.get_key_value(name) {
            return Some(key.as_str());
        }
        self.fields
            .keys()
            .find(|key| attribute_matches(key, name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_name(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = self.attribute_name(name)?;
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let name = self.attribute_name(name)?.to_string();
        self.fields.get_mut(&name)
    }

    /// Assign a declared attribute. Returns false if the type has no such attribute.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// All attributes in declaration order, including unset ones.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Look up a child by attribute (typed objects) or key (mappings).
    pub fn child(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(name),
            Value::Map(map) => map.get(name),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Value::child`].
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Object(object) => object.get_mut(name),
            Value::Map(map) => map.get_mut(name),
            _ => None,
        }
    }

    /// Follow a sequence of child names.
    pub fn pointer<'a, I>(&self, names: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .try_fold(self, |node, name| node.child(name))
    }

    /// Short human readable name of this node's shape, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Int(_) => "integer".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Map(_) => "mapping".to_string(),
            Value::Object(object) => object.kind.clone(),
        }
    }

    /// The text a scalar contributes when embedded in a larger string.
    pub fn to_template_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Null | Value::List(_) | Value::Map(_) | Value::Object(_) => None,
        }
    }
}

/// Whether `name` addresses the attribute declared as `declared`, either
/// verbatim or with both spelled in snake_case (`host_ipc` for `hostIPC`).
pub fn attribute_matches(declared: &str, name: &str) -> bool {
    declared == name || declared.to_case(Case::Snake) == name.to_case(Case::Snake)
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Value::Map(value)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_yaml::Value::deserialize(deserializer).map(Value::from)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Object(object) => object.serialize(serializer),
        }
    }
}

impl Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let set: Vec<_> = self.fields.iter().filter(|(_, v)| !v.is_null()).collect();
        let mut out = serializer.serialize_map(Some(set.len()))?;
        for (name, value) in set {
            out.serialize_entry(name, value)?;
        }
        out.end()
    }
}
