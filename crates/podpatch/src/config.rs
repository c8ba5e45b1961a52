// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The rule set: exceptions, patch operations and the groups they apply to.
//!
//! ```yaml
//! exceptions:
//!   - image: "sample/.*"
//!
//! patches:
//!   - path: pod/spec/volumes
//!     op: extend
//!     value:
//!       - name: shared-data
//!         nfs: {server: nfs.example.com, path: /data, _: V1NFSVolumeSource}
//!         _: V1Volume
//!
//! ospool-patches:
//!   - path: notebook/security_context
//!     op: set
//!     value:
//!       run_as_user: "{user.uid}"
//!       run_as_group: "{user.gid}"
//!       _: V1SecurityContext
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// What a patch does to the slot its path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchKind {
    /// Replace the value.
    Set,
    /// Append each element of a list value to the sequence.
    Extend,
    /// Append the value as a single element.
    Append,
    /// Insert the value as a single element at the front.
    Prepend,
    /// Replace the value only if it is unset.
    SetDefault,
    /// Assign each key of a mapping value onto the existing node.
    MergeKeys,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Set => "set",
            PatchKind::Extend => "extend",
            PatchKind::Append => "append",
            PatchKind::Prepend => "prepend",
            PatchKind::SetDefault => "set-default",
            PatchKind::MergeKeys => "merge-keys",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single patch operation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatchOp {
    /// Slash-delimited, rooted at either `pod` or `notebook`.
    pub path: String,

    pub op: PatchKind,

    /// May contain `{dotted.reference}` placeholders and `_` type tags.
    #[serde(default)]
    pub value: Value,
}

/// A named list of patch operations, referenced from `user-options`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatchList {
    pub name: String,

    #[serde(default)]
    pub spec: Vec<PatchOp>,
}

/// Patch lists granted to members of any of the listed groups.
///
/// An empty group list grants the patch lists to everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct UserOptions {
    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub patch_lists: Vec<String>,
}

/// Skips all patching for sessions whose image fully matches `image`.
#[derive(Debug, Clone)]
pub struct ExceptionRule {
    image: String,
    matcher: Regex,
}

impl ExceptionRule {
    pub fn new<S: Into<String>>(image: S) -> Result<Self> {
        let image = image.into();
        let matcher =
            Regex::new(&format!("^(?:{image})$")).map_err(|error| Error::InvalidPattern {
                pattern: image.clone(),
                error,
            })?;
        Ok(Self { image, matcher })
    }

    /// The pattern as written in the configuration.
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn matches(&self, image: &str) -> bool {
        self.matcher.is_match(image)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExceptionRule {
    image: String,
}

/// On-disk shape of the configuration file.
#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    exceptions: Vec<RawExceptionRule>,
    #[serde(default)]
    patches: Vec<PatchOp>,
    #[serde(default)]
    ospool_patches: Vec<PatchOp>,
    #[serde(default)]
    patch_lists: Vec<PatchList>,
    #[serde(default)]
    user_options: Vec<UserOptions>,
}

/// A validated rule set. Never modified once loaded.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub exceptions: Vec<ExceptionRule>,

    /// Applied to every session that is not excepted.
    pub patches: Vec<PatchOp>,

    /// Applied only to members of the `ospool` group.
    pub ospool_patches: Vec<PatchOp>,

    pub patch_lists: Vec<PatchList>,

    pub user_options: Vec<UserOptions>,
}

impl Configuration {
    /// Parse and validate a configuration from YAML.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> Result<Self> {
        let yaml = yaml.into();

        // Stage 1: parse, so that an empty document is an empty rule set
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;
        if value.is_null() {
            return Ok(Self::default());
        }

        // Stage 2: deserialize into the file shape
        let file: ConfigFile = serde_yaml::from_value(value).map_err(|e| Error::InvalidYaml {
            error: e,
            yaml_content: yaml,
        })?;

        // Stage 3: compile patterns and check references
        let config = Self {
            exceptions: file
                .exceptions
                .into_iter()
                .map(|rule| ExceptionRule::new(rule.image))
                .collect::<Result<_>>()?,
            patches: file.patches,
            ospool_patches: file.ospool_patches,
            patch_lists: file.patch_lists,
            user_options: file.user_options,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        let config = Self::from_yaml(yaml)?;
        tracing::debug!(
            path = %path.display(),
            exceptions = config.exceptions.len(),
            patches = config.patch_ops().count(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Check the rules that cannot be expressed in the file's types.
    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        for list in &self.patch_lists {
            if !names.insert(list.name.as_str()) {
                return Err(Error::ValidationFailed(format!(
                    "patch list {:?} is defined more than once",
                    list.name
                )));
            }
        }

        for options in &self.user_options {
            for name in &options.patch_lists {
                if !names.contains(name.as_str()) {
                    return Err(Error::ValidationFailed(format!(
                        "user options refer to unknown patch list {name:?}"
                    )));
                }
            }
        }

        for patch in self.patch_ops() {
            if patch.path.split('/').any(str::is_empty) {
                return Err(Error::ValidationFailed(format!(
                    "patch path {:?} contains an empty segment",
                    patch.path
                )));
            }
            if patch.op == PatchKind::MergeKeys && patch.value.as_map().is_none() {
                return Err(Error::ValidationFailed(format!(
                    "merge-keys patch for {:?} needs a mapping value",
                    patch.path
                )));
            }
        }

        Ok(())
    }

    pub fn patch_list(&self, name: &str) -> Option<&PatchList> {
        self.patch_lists.iter().find(|list| list.name == name)
    }

    /// Every patch operation in the file, in file order.
    pub fn patch_ops(&self) -> impl Iterator<Item = &PatchOp> {
        self.patches
            .iter()
            .chain(&self.ospool_patches)
            .chain(self.patch_lists.iter().flat_map(|list| &list.spec))
    }
}

/// Shared access to the current configuration.
///
/// Readers take a [`ConfigHandle::snapshot`] and use it for a whole patch
/// pass; a reload publishes a new configuration without disturbing them.
pub struct ConfigHandle {
    current: ArcSwap<Configuration>,
}

impl ConfigHandle {
    pub fn new(config: Configuration) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn snapshot(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Publish a new configuration, returning the one it replaced.
    pub fn replace(&self, config: Configuration) -> Arc<Configuration> {
        self.current.swap(Arc::new(config))
    }

    /// Load `path` and publish it. On failure the current configuration stays.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = Configuration::load(path.as_ref())?;
        self.replace(config);
        tracing::info!(path = %path.as_ref().display(), "configuration reloaded");
        Ok(())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}
