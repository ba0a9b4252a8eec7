// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;

use crate::executable_model::api_server::{Fault, RequestRecord};

#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub struct ObjectMapKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

// The "state" of the exec API server model. Objects are stored in their
// serialized form, the way the real server stores them.
#[derive(Default)]
pub struct ApiServerState {
    pub resources: BTreeMap<ObjectMapKey, serde_json::Value>,
    pub uid_counter: u64,
    pub resource_version_counter: u64,
    pub requests: Vec<RequestRecord>,
    pub faults: Vec<Fault>,
}

impl ApiServerState {
    pub fn new() -> ApiServerState {
        ApiServerState::default()
    }
}
