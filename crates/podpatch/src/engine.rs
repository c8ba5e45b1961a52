// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Applies the configured patches to a session document.

use std::sync::Arc;

use crate::config::{Configuration, PatchKind, PatchOp};
use crate::context::Context;
use crate::filter::{self, ContextGroups, MembershipSource};
use crate::path::{self, Document, Slot};
use crate::registry::{TAG_KEY, TypeRegistry};
use crate::template;
use crate::value::{Mapping, Value};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./engine_test.rs"]
mod engine_test;

/// Group whose members receive `ospool-patches`.
pub const OSPOOL_GROUP: &str = "ospool";

/// Applies one configuration to any number of sessions.
///
/// The engine holds no per-session state and can be shared between threads.
#[derive(Clone)]
pub struct PatchEngine {
    config: Arc<Configuration>,
    registry: Arc<TypeRegistry>,
    membership: Arc<dyn MembershipSource>,
}

impl PatchEngine {
    /// Create an engine using the Kubernetes type registry and the context's
    /// own group list for membership.
    pub fn new(config: Arc<Configuration>) -> Self {
        Self {
            config,
            registry: TypeRegistry::kubernetes(),
            membership: Arc::new(ContextGroups),
        }
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_membership<M: MembershipSource + 'static>(mut self, membership: M) -> Self {
        self.membership = Arc::new(membership);
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The patches that apply to this session, in the order they will run.
    ///
    /// Empty when the session's image matches an exception. Otherwise the
    /// general patches come first, then `ospool-patches` for ospool members,
    /// then the patch lists granted by each matching `user-options` entry.
    pub fn active_patches(&self, context: &Context) -> Vec<&PatchOp> {
        if filter::should_except(&self.config.exceptions, context) {
            tracing::info!(
                user = %context.user.name,
                image = %context.image,
                "Image is excepted, not applying any patches"
            );
            return Vec::new();
        }

        let membership = self.membership.as_ref();
        let mut active: Vec<&PatchOp> = self.config.patches.iter().collect();

        if filter::is_eligible(membership, context, OSPOOL_GROUP) {
            active.extend(&self.config.ospool_patches);
        }

        for options in &self.config.user_options {
            let granted = options.groups.is_empty()
                || options
                    .groups
                    .iter()
                    .any(|group| filter::is_eligible(membership, context, group));
            if !granted {
                continue;
            }
            for name in &options.patch_lists {
                if let Some(list) = self.config.patch_list(name) {
                    active.extend(&list.spec);
                }
            }
        }

        active
    }

    /// Apply every active patch to `document`, in order.
    ///
    /// Stops at the first failure; patches already applied stay applied, so
    /// callers should discard the document on error. Returns the number of
    /// patches applied.
    pub fn apply<D>(&self, document: &mut D, context: &Context) -> Result<usize>
    where
        D: Document + ?Sized,
    {
        let patches = self.active_patches(context);
        let scope = context.to_value();
        for patch in &patches {
            tracing::info!(
                user = %context.user.name,
                path = %patch.path,
                op = %patch.op,
                "Applying patch"
            );
            self.apply_with_scope(document, patch, &scope)?;
        }
        Ok(patches.len())
    }

    /// Apply a single patch regardless of exceptions and group gates.
    pub fn apply_patch<D>(&self, document: &mut D, patch: &PatchOp, context: &Context) -> Result<()>
    where
        D: Document + ?Sized,
    {
        self.apply_with_scope(document, patch, &context.to_value())
    }

    fn apply_with_scope<D>(&self, document: &mut D, patch: &PatchOp, scope: &Value) -> Result<()>
    where
        D: Document + ?Sized,
    {
        let rendered = template::render_with(&patch.value, scope)?;
        match patch.op {
            PatchKind::Set => {
                let (slot, value) = self.target(document, patch, rendered)?;
                slot.set(value)
            }
            PatchKind::Extend => {
                let (slot, value) = self.target(document, patch, rendered)?;
                slot.extend(value)
            }
            PatchKind::Append => {
                let (slot, value) = self.target(document, patch, rendered)?;
                slot.append(value)
            }
            PatchKind::Prepend => {
                let (slot, value) = self.target(document, patch, rendered)?;
                slot.prepend(value)
            }
            PatchKind::SetDefault => {
                let (slot, value) = self.target(document, patch, rendered)?;
                slot.set_default(value).map(|_| ())
            }
            PatchKind::MergeKeys => self.merge_keys(document, patch, rendered),
        }
    }

    /// Materialize a rendered value and resolve the slot it goes into.
    fn target<'d, D>(
        &self,
        document: &'d mut D,
        patch: &PatchOp,
        rendered: Value,
    ) -> Result<(Slot<'d>, Value)>
    where
        D: Document + ?Sized,
    {
        let value = self.registry.materialize(rendered)?;
        let slot = path::resolve(document, &patch.path)?;
        Ok((slot, value))
    }

    /// Set the whole value if the slot is unset, otherwise assign its keys one by one.
    fn merge_keys<D>(&self, document: &mut D, patch: &PatchOp, rendered: Value) -> Result<()>
    where
        D: Document + ?Sized,
    {
        let Value::Map(entries) = rendered else {
            return Err(Error::ValidationFailed(format!(
                "merge-keys patch for {:?} needs a mapping value",
                patch.path
            )));
        };

        let slot = path::resolve(document, &patch.path)?;
        if slot.is_vacant() {
            let value = self.registry.materialize(Value::Map(entries))?;
            return slot.set(value);
        }

        let mut fields = Mapping::with_capacity(entries.len());
        for (key, value) in entries {
            if key == TAG_KEY {
                continue;
            }
            fields.insert(key, self.registry.materialize(value)?);
        }
        slot.merge(fields)
    }
}
