// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! podpatch - Rule-driven patching of notebook pod specifications
//!
//! This crate provides the engine a notebook spawner calls just before it
//! creates a user's pod: a declarative rule set says which parts of the pod
//! to change, for which users, and with what values.
//!
//! # Overview
//!
//! A [`Configuration`] holds image exceptions, general patches, patches for
//! members of the `ospool` group, and named patch lists granted through
//! `user-options`. For each session the [`PatchEngine`] selects the patches
//! that apply to its [`Context`], fills `{dotted.reference}` placeholders from
//! that context, converts `_`-tagged mappings into typed Kubernetes objects,
//! and applies each operation to a [`PodDocument`] in order.
//!
//! # Example
//!
//! ```yaml
//! # podpatch.yaml
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

pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod path;
mod reflect;
pub mod registry;
pub mod template;
pub mod value;

pub use config::{
    ConfigHandle, Configuration, ExceptionRule, PatchKind, PatchList, PatchOp, UserOptions,
};
pub use context::{Context, UserInfo};
pub use document::{PodDocument, NOTEBOOK_CONTAINER_NAME};
pub use engine::{PatchEngine, OSPOOL_GROUP};
pub use error::{Error, Result};
pub use filter::{is_eligible, should_except, ContextGroups, MembershipSource};
pub use path::{resolve, Document, Slot};
pub use registry::{TypeRegistry, TAG_KEY};
pub use template::render;
pub use value::{Mapping, Object, Value};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PODPATCH_CONFIG";

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/podpatch/podpatch.yaml";
