// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Per-session information that patches are selected and templated with.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::value::{Mapping, Value};

#[cfg(test)]
#[path = "./context_test.rs"]
mod context_test;

/// Identity of the user the session is spawned for.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    /// Login name.
    #[serde(alias = "username")]
    pub name: String,

    /// Numeric POSIX identity, when the user has one.
    #[serde(default)]
    pub uid: Option<i64>,

    #[serde(default)]
    pub gid: Option<i64>,

    /// Subject claim of the identity provider.
    #[serde(default)]
    pub sub: Option<String>,
}

/// Everything the engine knows about one session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Context {
    /// Container image the notebook will run.
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub user: UserInfo,

    /// Groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Additional values supplied by the host, reachable from templates.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Context {
    pub fn new<S: Into<String>>(image: S, user: UserInfo) -> Self {
        Self {
            image: image.into(),
            user,
            ..Default::default()
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra<S: Into<String>, V: Into<Value>>(mut self, key: S, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Parse a context from YAML.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();
        serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
            error: e,
            yaml_content: yaml,
        })
    }

    /// Load a context from a YAML file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(yaml)
    }

    /// The scope that `{dotted.reference}` placeholders are looked up in.
    ///
    /// Unset user ids are left out so that referencing them fails instead of
    /// rendering an empty string.
    pub fn to_value(&self) -> Value {
        let mut user = Mapping::new();
        user.insert("name".into(), Value::from(self.user.name.as_str()));
        user.insert("username".into(), Value::from(self.user.name.as_str()));
        if let Some(uid) = self.user.uid {
            user.insert("uid".into(), Value::Int(uid));
        }
        if let Some(gid) = self.user.gid {
            user.insert("gid".into(), Value::Int(gid));
        }
        if let Some(sub) = &self.user.sub {
            user.insert("sub".into(), Value::from(sub.as_str()));
        }

        let mut scope = Mapping::new();
        for (key, value) in &self.extra {
            scope.insert(key.clone(), value.clone());
        }
        scope.insert("image".into(), Value::from(self.image.as_str()));
        scope.insert("user".into(), Value::Map(user));
        scope.insert(
            "groups".into(),
            Value::List(self.groups.iter().map(|g| Value::from(g.as_str())).collect()),
        );
        Value::Map(scope)
    }
}
