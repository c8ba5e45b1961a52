// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for podpatch operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with podpatch Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading rules or patching a document.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Invalid YAML in a configuration, context or document file
    #[error("Invalid YAML: {error}")]
    #[diagnostic(
        code(podpatch::invalid_yaml),
        help("Check YAML syntax and the key names (configuration keys are kebab-case)")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(podpatch::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// An exception rule does not compile
    #[error("Invalid image pattern {pattern:?}")]
    #[diagnostic(
        code(podpatch::invalid_pattern),
        help("Image patterns are regular expressions matched against the whole image name")
    )]
    InvalidPattern {
        pattern: String,
        #[source]
        error: regex::Error,
    },

    /// Configuration is well formed YAML but semantically wrong
    #[error("Validation failed: {0}")]
    #[diagnostic(code(podpatch::validation_failed))]
    ValidationFailed(String),

    /// A patch path does not address anything in the document
    #[error("Cannot resolve path {path:?}: {reason}")]
    #[diagnostic(
        code(podpatch::path_resolution),
        help("Paths are '/'-delimited and must start at 'pod' or 'notebook'")
    )]
    PathResolution { path: String, reason: String },

    /// A placeholder names something the session context does not have
    #[error("Cannot resolve placeholder {{{placeholder}}}: {reason}")]
    #[diagnostic(
        code(podpatch::template_resolution),
        help("Available references include user.name, user.uid, user.gid, image and groups")
    )]
    TemplateResolution { placeholder: String, reason: String },

    /// A `_` tag names a type that is not registered
    #[error("Unknown type tag: {0}")]
    #[diagnostic(
        code(podpatch::unknown_type_tag),
        help("Use the Kubernetes API class name, for example V1Volume or V1SecurityContext")
    )]
    UnknownTypeTag(String),

    /// A tagged mapping carries a field its type does not declare
    #[error("{kind} has no field named {field:?}")]
    #[diagnostic(code(podpatch::unknown_field))]
    UnknownField { kind: String, field: String },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(podpatch::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn path(path: &str, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
