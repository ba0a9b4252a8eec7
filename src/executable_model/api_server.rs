// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cluster_client::{ClientError, ClusterClient, ClusterObject};
use crate::executable_model::api_server_state::{ApiServerState, ObjectMapKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
}

/// One request as the model received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRecord {
    pub verb: Verb,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// A single-shot failure: the next request matching `verb` and `kind` fails
/// with the given API status instead of being served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub verb: Verb,
    pub kind: String,
    pub reason: String,
    pub code: u16,
}

impl Fault {
    pub fn new(verb: Verb, kind: impl Into<String>, reason: impl Into<String>, code: u16) -> Fault {
        Fault {
            verb,
            kind: kind.into(),
            reason: reason.into(),
            code,
        }
    }
}

// ExecutableApiServer follows the admission rules of the real API server for
// the requests the controller issues: gets answer "not found" as an absent
// object, creates reject a missing name, a namespace mismatch, an existing
// object and more than one controller owner reference, and successful creates
// stamp a fresh uid and resource version.
#[derive(Default)]
pub struct ExecutableApiServer {
    state: Mutex<ApiServerState>,
}

fn kind_of<K: ClusterObject>() -> String {
    K::kind(&()).to_string()
}

impl ExecutableApiServer {
    pub fn new() -> ExecutableApiServer {
        ExecutableApiServer::default()
    }

    fn state(&self) -> MutexGuard<'_, ApiServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inject_fault(&self, fault: Fault) {
        self.state().faults.push(fault);
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.state().requests.clone()
    }

    pub fn count_requests(&self, verb: Verb) -> usize {
        self.state().requests.iter().filter(|r| r.verb == verb).count()
    }

    /// Reads an object without going through the request path: nothing is
    /// logged and no fault fires.
    pub fn lookup<K: ClusterObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = ObjectMapKey {
            kind: kind_of::<K>(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        self.state()
            .resources
            .get(&key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn count<K: ClusterObject>(&self) -> usize {
        let kind = kind_of::<K>();
        self.state().resources.keys().filter(|k| k.kind == kind).count()
    }

    /// Stores an object on behalf of some other client (a user applying a
    /// MyApp, a different controller replica). Not recorded as a request.
    pub fn seed<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K, ClientError> {
        let mut state = self.state();
        Self::handle_create(&mut state, namespace, obj)
    }

    /// Removes an object. Owned children stay: cascading deletion is the
    /// garbage collector's job, not the API server's.
    pub fn remove<K: ClusterObject>(&self, namespace: &str, name: &str) -> bool {
        let key = ObjectMapKey {
            kind: kind_of::<K>(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let mut state = self.state();
        let removed = state.resources.remove(&key).is_some();
        if removed {
            state.resource_version_counter += 1;
        }
        removed
    }

    fn take_fault(state: &mut ApiServerState, verb: Verb, kind: &str) -> Option<ClientError> {
        let pos = state.faults.iter().position(|f| f.verb == verb && f.kind == kind)?;
        let fault = state.faults.remove(pos);
        if fault.reason == "AlreadyExists" {
            return Some(ClientError::AlreadyExists("injected fault".to_string()));
        }
        Some(ClientError::api(fault.reason, fault.code, "injected fault"))
    }

    fn handle_get<K: ClusterObject>(
        state: &mut ApiServerState,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        let kind = kind_of::<K>();
        state.requests.push(RequestRecord {
            verb: Verb::Get,
            kind: kind.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if let Some(err) = Self::take_fault(state, Verb::Get, &kind) {
            return Err(err);
        }
        let key = ObjectMapKey {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        match state.resources.get(&key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn create_request_admission_check<K: ClusterObject>(
        state: &ApiServerState,
        namespace: &str,
        obj: &K,
    ) -> Result<ObjectMapKey, ClientError> {
        let meta = obj.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| ClientError::api("Invalid", 422, "metadata.name is required"))?;
        if let Some(obj_namespace) = &meta.namespace {
            if obj_namespace != namespace {
                return Err(ClientError::api(
                    "BadRequest",
                    400,
                    "the namespace of the object does not match the namespace of the request",
                ));
            }
        }
        let key = ObjectMapKey {
            kind: kind_of::<K>(),
            namespace: namespace.to_string(),
            name,
        };
        if state.resources.contains_key(&key) {
            return Err(ClientError::AlreadyExists(format!(
                "{} \"{}\" already exists",
                key.kind, key.name
            )));
        }
        let controllers = meta
            .owner_references
            .as_ref()
            .map(|refs| refs.iter().filter(|r| r.controller == Some(true)).count())
            .unwrap_or(0);
        if controllers > 1 {
            return Err(ClientError::api(
                "Invalid",
                422,
                "only one reference can have Controller set to true",
            ));
        }
        Ok(key)
    }

    fn handle_create<K: ClusterObject>(
        state: &mut ApiServerState,
        namespace: &str,
        obj: &K,
    ) -> Result<K, ClientError> {
        let key = Self::create_request_admission_check(state, namespace, obj)?;

        let mut created = obj.clone();
        let meta = created.meta_mut();
        meta.namespace = Some(namespace.to_string());
        meta.uid = Some(format!("uid-{}", state.uid_counter));
        meta.resource_version = Some(state.resource_version_counter.to_string());
        meta.deletion_timestamp = None;

        let value = serde_json::to_value(&created)?;
        state.resources.insert(key, value);
        state.uid_counter += 1;
        state.resource_version_counter += 1;
        Ok(created)
    }
}

#[async_trait]
impl ClusterClient for ExecutableApiServer {
    async fn get<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        let mut state = self.state();
        Self::handle_get(&mut state, namespace, name)
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K, ClientError> {
        let mut state = self.state();
        let kind = kind_of::<K>();
        state.requests.push(RequestRecord {
            verb: Verb::Create,
            kind: kind.clone(),
            namespace: namespace.to_string(),
            name: obj.meta().name.clone().unwrap_or_default(),
        });
        if let Some(err) = Self::take_fault(&mut state, Verb::Create, &kind) {
            return Err(err);
        }
        Self::handle_create(&mut state, namespace, obj)
    }
}
