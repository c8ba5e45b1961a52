// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The session document: a pod and, inside it, the notebook container.

use std::path::Path;

use crate::path::Document;
use crate::registry::TypeRegistry;
use crate::value::Value;

#[cfg(test)]
#[path = "./document_test.rs"]
mod document_test;

/// Name of the container that runs the user's notebook server.
pub const NOTEBOOK_CONTAINER_NAME: &str = "notebook";

/// A pod specification being prepared for one session.
///
/// Patch paths are rooted at `pod`, the pod itself, or at `notebook`, the
/// container in `pod/spec/containers` whose name is the notebook container
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct PodDocument {
    pub pod: Value,
    notebook: String,
}

impl PodDocument {
    pub fn new(pod: Value) -> Self {
        Self {
            pod,
            notebook: NOTEBOOK_CONTAINER_NAME.to_string(),
        }
    }

    /// Use a different container as the `notebook` root.
    pub fn with_notebook_container<S: Into<String>>(mut self, name: S) -> Self {
        self.notebook = name.into();
        self
    }

    /// Parse a pod manifest, typing it as a `V1Pod`.
    pub fn from_yaml<S: Into<String>>(yaml: S, registry: &TypeRegistry) -> crate::Result<Self> {
        let yaml = yaml.into();
        let value: Value = serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
            error: e,
            yaml_content: yaml.clone(),
        })?;
        let pod = registry.materialize_as("V1Pod", value)?;
        Ok(Self::new(pod))
    }

    /// Load a pod manifest from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P, registry: &TypeRegistry) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(yaml, registry)
    }

    pub fn notebook_container_name(&self) -> &str {
        &self.notebook
    }

    pub fn notebook(&self) -> Option<&Value> {
        self.pod
            .pointer(["spec", "containers"])?
            .as_list()?
            .iter()
            .find(|c| c.child("name").and_then(Value::as_str) == Some(self.notebook.as_str()))
    }

    pub fn notebook_mut(&mut self) -> Option<&mut Value> {
        let name = self.notebook.as_str();
        let containers = self.pod.child_mut("spec")?.child_mut("containers")?;
        match containers {
            Value::List(items) => items
                .iter_mut()
                .find(|c| c.child("name").and_then(Value::as_str) == Some(name)),
            _ => None,
        }
    }

    pub fn into_pod(self) -> Value {
        self.pod
    }
}

impl Document for PodDocument {
    fn root_mut(&mut self, name: &str) -> Option<&mut Value> {
        match name {
            "pod" => Some(&mut self.pod),
            "notebook" => self.notebook_mut(),
            _ => None,
        }
    }
}
