// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::error::Error;
use kube::Resource;
use std::collections::BTreeMap;
use std::fmt;

pub const APP_LABEL_KEY: &str = "app";

/// Identity of a namespaced object: the key a trigger delivers and the key
/// every child is derived from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> ObjectKey {
        ObjectKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Extracts the key from an object handed over by the trigger source.
    pub fn from_resource<K: Resource>(obj: &K) -> Result<ObjectKey, Error> {
        let meta = obj.meta();
        let name = meta
            .name
            .as_ref()
            .ok_or_else(|| Error::MissingObjectKey(".metadata.name"))?;
        let namespace = meta
            .namespace
            .as_ref()
            .ok_or_else(|| Error::MissingObjectKey(".metadata.namespace"))?;
        Ok(ObjectKey::new(namespace.clone(), name.clone()))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The child kinds a MyApp owns, in the order they are converged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Deployment,
    PodDisruptionBudget,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Deployment => "Deployment",
            ChildKind::PodDisruptionBudget => "PodDisruptionBudget",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn deployment_name(key: &ObjectKey) -> String {
    key.name.clone()
}

pub fn pod_disruption_budget_name(key: &ObjectKey) -> String {
    key.name.clone()
}

pub fn container_name(key: &ObjectKey) -> String {
    key.name.clone()
}

/// Selector shared by the pod template, the Deployment and the PDB.
pub fn app_labels(key: &ObjectKey) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), key.name.clone())])
}
