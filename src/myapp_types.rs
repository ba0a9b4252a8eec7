// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of one application: a single-container workload plus the
/// disruption budget protecting its pods.
#[derive(CustomResource, Default, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(group = "apps.example.com", version = "v1", kind = "MyApp")]
#[kube(shortname = "myapp", namespaced)]
pub struct MyAppSpec {
    /// Unset leaves the replica count to the Deployment default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}
