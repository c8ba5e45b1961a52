// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Materialization of typed objects from tagged YAML data.
//!
//! Patch values are plain data. A mapping that carries the reserved `_` key
//! names the type it should become:
//!
//! ```yaml
//! value:
//!   name: shared-data
//!   nfs:
//!     server: nfs.example.com
//!     path: /data
//!     _: V1NFSVolumeSource
//!   _: V1Volume
//! ```
//!
//! Mappings without the key stay untyped. The set of known types is closed:
//! a [`TypeRegistry`] is built once from an explicit list and never grows.
//! The Kubernetes registry takes each type's attributes from the matching
//! `k8s-openapi` struct.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use crate::reflect::{self, Shape};
use crate::value::{attribute_matches, Mapping, Object, Value};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./registry_test.rs"]
mod registry_test;

/// Reserved mapping key naming the type of the mapping.
pub const TAG_KEY: &str = "_";

/// What an attribute of a registered type holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Anything; left as-is when loading documents.
    Any,
    /// A single object of the named type.
    Object(&'static str),
    /// A list of objects of the named type.
    ListOf(&'static str),
}

/// One declared attribute of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

pub const fn any(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Any,
    }
}

pub const fn object(name: &'static str, kind: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Object(kind),
    }
}

pub const fn list_of(name: &'static str, kind: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::ListOf(kind),
    }
}

/// A registered type: its tag name and declared attributes.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
    /// Name that [`FieldKind`] references to this type use before the
    /// registry resolves them to tags.
    type_name: &'static str,
}

impl TypeDescriptor {
    /// Describe a type by hand. Nested kinds name other tags directly.
    pub fn new(name: &'static str, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            name,
            fields: fields.into_iter().collect(),
            type_name: name,
        }
    }

    /// Describe `T` by the attributes its `Deserialize` impl accepts.
    ///
    /// Attributes holding a nested struct (or a list of them) refer to it by
    /// its Rust name, which [`TypeRegistry::new`] maps back to a tag.
    pub fn of<T: DeserializeOwned>(name: &'static str) -> Self {
        let Some(reflected) = reflect::reflect::<T>() else {
            return Self::new(name, Vec::new());
        };
        let fields = reflected
            .fields
            .into_iter()
            .map(|(field, shape)| match shape {
                Shape::Scalar => any(field),
                Shape::Struct(kind) => object(field, kind),
                Shape::ListOf(kind) => list_of(field, kind),
            })
            .collect();
        Self {
            name,
            fields,
            type_name: reflected.name,
        }
    }

    /// Find a declared attribute by its wire name or snake_case name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| attribute_matches(f.name, name)))
    }

    /// Build an object from already materialized attribute values.
    pub fn construct(&self, values: Mapping) -> Result<Object> {
        let mut object = Object::with_fields(self.name, self.fields.iter().map(|f| f.name));
        for (name, value) in values {
            if !object.set(&name, value) {
                return Err(Error::UnknownField {
                    kind: self.name.to_string(),
                    field: name,
                });
            }
        }
        Ok(object)
    }
}

/// Closed mapping from tag name to type.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<&'static str, TypeDescriptor>,
}

static KUBERNETES: Lazy<Arc<TypeRegistry>> =
    Lazy::new(|| Arc::new(TypeRegistry::new(kubernetes_types())));

impl TypeRegistry {
    /// Register `types`. Nested kinds that name no registered type
    /// become [`FieldKind::Any`].
    pub fn new(types: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let mut types: IndexMap<_, _> = types.into_iter().map(|t| (t.name, t)).collect();
        let tags: HashMap<&'static str, &'static str> =
            types.values().map(|t| (t.type_name, t.name)).collect();
        for descriptor in types.values_mut() {
            for field in &mut descriptor.fields {
                field.kind = match field.kind {
                    FieldKind::Object(kind) => tags
                        .get(kind)
                        .map_or(FieldKind::Any, |&tag| FieldKind::Object(tag)),
                    FieldKind::ListOf(kind) => tags
                        .get(kind)
                        .map_or(FieldKind::Any, |&tag| FieldKind::ListOf(tag)),
                    FieldKind::Any => FieldKind::Any,
                };
            }
        }
        Self { types }
    }

    /// The Kubernetes core/v1 types that session documents are made of.
    pub fn kubernetes() -> Arc<TypeRegistry> {
        Arc::clone(&KUBERNETES)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Convert tagged mappings into objects, recursively.
    ///
    /// Untagged mappings stay mappings, though their values are still
    /// materialized so that tagged values nested inside them are converted.
    pub fn materialize(&self, value: Value) -> Result<Value> {
        self.build(value, None, false)
    }

    /// Materialize a whole document as an object of `kind`.
    ///
    /// Unlike [`TypeRegistry::materialize`], untagged mappings found under
    /// attributes with a known type are converted to that type, so a plain
    /// pod manifest becomes a fully typed `V1Pod`. Explicit tags still win.
    pub fn materialize_as(&self, kind: &str, value: Value) -> Result<Value> {
        let descriptor = self
            .get(kind)
            .ok_or_else(|| Error::UnknownTypeTag(kind.to_string()))?;
        self.build(value, Some(descriptor.name), true)
    }

    fn build(&self, value: Value, hint: Option<&str>, follow_hints: bool) -> Result<Value> {
        match value {
            Value::Map(mut map) => {
                let tag = match map.shift_remove(TAG_KEY) {
                    Some(Value::String(tag)) => Some(tag),
                    Some(other) => {
                        return Err(Error::UnknownTypeTag(format!(
                            "<{} used as a tag>",
                            other.describe()
                        )));
                    }
                    None => hint.map(str::to_string),
                };

                let Some(tag) = tag else {
                    let mut fields = Mapping::with_capacity(map.len());
                    for (key, value) in map {
                        fields.insert(key, self.build(value, None, follow_hints)?);
                    }
                    return Ok(Value::Map(fields));
                };

                let descriptor = self
                    .get(&tag)
                    .ok_or_else(|| Error::UnknownTypeTag(tag.clone()))?;

                let mut fields = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    let child_hint = match descriptor.field(&key).map(|f| f.kind) {
                        Some(FieldKind::Object(kind) | FieldKind::ListOf(kind)) if follow_hints => {
                            Some(kind)
                        }
                        _ => None,
                    };
                    fields.insert(key, self.build(value, child_hint, follow_hints)?);
                }
                descriptor.construct(fields).map(Value::Object)
            }
            Value::List(items) => items
                .into_iter()
                .map(|item| self.build(item, hint, follow_hints))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            other => Ok(other),
        }
    }
}


/// Registers each tag as the `k8s-openapi` struct of the same Kubernetes type.
macro_rules! kubernetes_types {
    ($($tag:literal => $ty:ty,)*) => {
        vec![$(TypeDescriptor::of::<$ty>($tag),)*]
    };
}

fn kubernetes_types() -> Vec<TypeDescriptor> {
    use k8s_openapi::api::core::v1 as api;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1 as meta;

    kubernetes_types! {
        "V1Pod" => api::Pod,
        "V1PodSpec" => api::PodSpec,
        "V1ObjectMeta" => meta::ObjectMeta,
        "V1OwnerReference" => meta::OwnerReference,
        "V1LabelSelector" => meta::LabelSelector,
        "V1LabelSelectorRequirement" => meta::LabelSelectorRequirement,
        "V1Container" => api::Container,
        "V1ContainerPort" => api::ContainerPort,
        "V1EnvVar" => api::EnvVar,
        "V1EnvVarSource" => api::EnvVarSource,
        "V1EnvFromSource" => api::EnvFromSource,
        "V1ConfigMapEnvSource" => api::ConfigMapEnvSource,
        "V1SecretEnvSource" => api::SecretEnvSource,
        "V1ConfigMapKeySelector" => api::ConfigMapKeySelector,
        "V1SecretKeySelector" => api::SecretKeySelector,
        "V1ObjectFieldSelector" => api::ObjectFieldSelector,
        "V1ResourceFieldSelector" => api::ResourceFieldSelector,
        "V1ResourceRequirements" => api::ResourceRequirements,
        "V1SecurityContext" => api::SecurityContext,
        "V1PodSecurityContext" => api::PodSecurityContext,
        "V1Capabilities" => api::Capabilities,
        "V1SELinuxOptions" => api::SELinuxOptions,
        "V1SeccompProfile" => api::SeccompProfile,
        "V1Sysctl" => api::Sysctl,
        "V1VolumeMount" => api::VolumeMount,
        "V1VolumeDevice" => api::VolumeDevice,
        "V1Probe" => api::Probe,
        "V1ExecAction" => api::ExecAction,
        "V1HTTPGetAction" => api::HTTPGetAction,
        "V1HTTPHeader" => api::HTTPHeader,
        "V1TCPSocketAction" => api::TCPSocketAction,
        "V1GRPCAction" => api::GRPCAction,
        "V1Lifecycle" => api::Lifecycle,
        "V1LifecycleHandler" => api::LifecycleHandler,
        "V1Volume" => api::Volume,
        "V1NFSVolumeSource" => api::NFSVolumeSource,
        "V1ConfigMapVolumeSource" => api::ConfigMapVolumeSource,
        "V1SecretVolumeSource" => api::SecretVolumeSource,
        "V1EmptyDirVolumeSource" => api::EmptyDirVolumeSource,
        "V1HostPathVolumeSource" => api::HostPathVolumeSource,
        "V1PersistentVolumeClaimVolumeSource" => api::PersistentVolumeClaimVolumeSource,
        "V1CSIVolumeSource" => api::CSIVolumeSource,
        "V1ProjectedVolumeSource" => api::ProjectedVolumeSource,
        "V1VolumeProjection" => api::VolumeProjection,
        "V1ConfigMapProjection" => api::ConfigMapProjection,
        "V1SecretProjection" => api::SecretProjection,
        "V1DownwardAPIProjection" => api::DownwardAPIProjection,
        "V1ServiceAccountTokenProjection" => api::ServiceAccountTokenProjection,
        "V1DownwardAPIVolumeSource" => api::DownwardAPIVolumeSource,
        "V1DownwardAPIVolumeFile" => api::DownwardAPIVolumeFile,
        "V1KeyToPath" => api::KeyToPath,
        "V1LocalObjectReference" => api::LocalObjectReference,
        "V1Toleration" => api::Toleration,
        "V1Affinity" => api::Affinity,
        "V1NodeAffinity" => api::NodeAffinity,
        "V1NodeSelector" => api::NodeSelector,
        "V1NodeSelectorTerm" => api::NodeSelectorTerm,
        "V1NodeSelectorRequirement" => api::NodeSelectorRequirement,
        "V1PreferredSchedulingTerm" => api::PreferredSchedulingTerm,
        "V1PodAffinity" => api::PodAffinity,
        "V1PodAntiAffinity" => api::PodAntiAffinity,
        "V1PodAffinityTerm" => api::PodAffinityTerm,
        "V1WeightedPodAffinityTerm" => api::WeightedPodAffinityTerm,
        "V1TopologySpreadConstraint" => api::TopologySpreadConstraint,
        "V1PodDNSConfig" => api::PodDNSConfig,
        "V1PodDNSConfigOption" => api::PodDNSConfigOption,
        "V1PodReadinessGate" => api::PodReadinessGate,
        "V1HostAlias" => api::HostAlias,
    }
}
