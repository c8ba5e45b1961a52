// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of `/`-delimited patch paths to mutable slots in a document.
//!
//! A path like `pod/spec/volumes` starts at a named root (`pod`), walks
//! through attributes of typed objects and keys of untyped mappings without
//! distinguishing the two, and ends at a [`Slot`]: the last container plus
//! the name of the field in it.

use crate::value::{Mapping, Value};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./path_test.rs"]
mod path_test;

/// Something that patch paths can be resolved against.
pub trait Document {
    /// Return the node that the first segment of a path names.
    fn root_mut(&mut self, name: &str) -> Option<&mut Value>;
}

/// A bare value is its own document; its children are the roots.
impl Document for Value {
    fn root_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.child_mut(name)
    }
}

/// Resolve `path` against `document`.
///
/// Every segment but the last must already exist. The last one need not:
/// assigning to a missing key of a mapping inserts it.
pub fn resolve<'a, D>(document: &'a mut D, path: &str) -> Result<Slot<'a>>
where
    D: Document + ?Sized,
{
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::path(path, "path contains an empty segment"));
    }
    let Some((field, parents)) = segments.split_last() else {
        return Err(Error::path(path, "path is empty"));
    };
    let Some((root, between)) = parents.split_first() else {
        return Err(Error::path(path, "path must name a root and at least one field"));
    };

    let mut node = document.root_mut(root).ok_or_else(|| {
        Error::path(path, format!("{root:?} does not name a root of this document"))
    })?;

    for segment in between {
        let shape = node.describe();
        node = node.child_mut(segment).ok_or_else(|| {
            Error::path(path, format!("{segment:?} does not exist on a {shape}"))
        })?;
    }

    if !matches!(node, Value::Object(_) | Value::Map(_)) {
        return Err(Error::path(
            path,
            format!("cannot address {field:?} inside a {}", node.describe()),
        ));
    }

    Ok(Slot {
        path: path.to_string(),
        container: node,
        field: field.to_string(),
    })
}

/// A named field of a typed object or a key of a mapping.
#[derive(Debug)]
pub struct Slot<'a> {
    path: String,
    container: &'a mut Value,
    field: String,
}

impl Slot<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Current value, if the field exists.
    pub fn get(&self) -> Option<&Value> {
        self.container.child(&self.field)
    }

    /// True when the field is missing or unset.
    pub fn is_vacant(&self) -> bool {
        self.get().is_none_or(Value::is_null)
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        match &mut *self.container {
            Value::Object(object) => {
                if object.set(&self.field, value) {
                    Ok(())
                } else {
                    Err(Error::path(
                        &self.path,
                        format!("{} has no attribute {:?}", object.kind(), self.field),
                    ))
                }
            }
            Value::Map(map) => {
                map.insert(self.field.clone(), value);
                Ok(())
            }
            other => Err(Error::path(
                &self.path,
                format!("cannot assign inside a {}", other.describe()),
            )),
        }
    }

    /// Replace the value.
    pub fn set(mut self, value: Value) -> Result<()> {
        self.assign(value)
    }

    /// Replace the value only if it is missing or unset. Returns whether it was set.
    pub fn set_default(mut self, value: Value) -> Result<bool> {
        if !self.is_vacant() {
            return Ok(false);
        }
        self.assign(value)?;
        Ok(true)
    }

    /// The sequence at this slot, created empty when the field is unset.
    fn sequence_mut(&mut self) -> Result<&mut Vec<Value>> {
        if self.is_vacant() {
            self.assign(Value::List(Vec::new()))?;
        }
        match self.container.child_mut(&self.field) {
            Some(Value::List(items)) => Ok(items),
            Some(other) => Err(Error::path(
                &self.path,
                format!("{:?} is a {}, not a sequence", self.field, other.describe()),
            )),
            None => Err(Error::path(
                &self.path,
                format!("{:?} does not exist", self.field),
            )),
        }
    }

    /// Append every item to the sequence at this slot.
    pub fn append_all(mut self, items: impl IntoIterator<Item = Value>) -> Result<()> {
        self.sequence_mut()?.extend(items);
        Ok(())
    }

    /// Append one item to the sequence at this slot.
    pub fn append(self, item: Value) -> Result<()> {
        self.append_all([item])
    }

    /// Insert one item at the front of the sequence at this slot.
    pub fn prepend(mut self, item: Value) -> Result<()> {
        self.sequence_mut()?.insert(0, item);
        Ok(())
    }

    /// Append a list's items, or a single non-list value, to the sequence here.
    pub fn extend(self, value: Value) -> Result<()> {
        match value {
            Value::List(items) => self.append_all(items),
            other => self.append(other),
        }
    }

    /// Assign each entry onto the existing object or mapping at this slot.
    pub fn merge(self, entries: Mapping) -> Result<()> {
        let Some(target) = self.container.child_mut(&self.field) else {
            return Err(Error::path(
                &self.path,
                format!("{:?} does not exist", self.field),
            ));
        };
        match target {
            Value::Object(object) => {
                for (key, value) in entries {
                    if !object.set(&key, value) {
                        return Err(Error::path(
                            &self.path,
                            format!("{} has no attribute {key:?}", object.kind()),
                        ));
                    }
                }
                Ok(())
            }
            Value::Map(map) => {
                map.extend(entries);
                Ok(())
            }
            other => Err(Error::path(
                &self.path,
                format!("cannot merge keys into a {}", other.describe()),
            )),
        }
    }
}
