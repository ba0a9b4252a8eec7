// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use core::fmt::Debug;
use kube::api::{Api, PostParams, Resource};
use kube::core::{ErrorResponse, NamespaceResourceScope};
use kube::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Namespaced, statically typed objects the client can read and create.
pub trait ClusterObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + DeserializeOwned
    + Serialize
    + Debug
    + Send
    + Sync
    + 'static
{
}

impl<K> ClusterObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("AlreadyExists: {0}")]
    AlreadyExists(String),
    #[error("{reason} ({code}): {message}")]
    Api {
        reason: String,
        code: u16,
        message: String,
    },
    #[error("Failed to talk to the API server: {0}")]
    Kube(#[source] kube::Error),
    #[error("Failed to (de)serialize object: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists(_))
    }

    pub fn api(reason: impl Into<String>, code: u16, message: impl Into<String>) -> ClientError {
        ClientError::Api {
            reason: reason.into(),
            code,
            message: message.into(),
        }
    }
}

// Only the status reason is inspected: "AlreadyExists" is the one outcome
// the reconciler recovers from. "NotFound" never reaches this point because
// reads go through get_opt.
impl From<kube::Error> for ClientError {
    fn from(error: kube::Error) -> ClientError {
        match error {
            kube::Error::Api(ErrorResponse {
                reason,
                message,
                ..
            }) if reason == "AlreadyExists" => ClientError::AlreadyExists(message),
            kube::Error::Api(ErrorResponse {
                reason,
                code,
                message,
                ..
            }) => ClientError::Api {
                reason,
                code,
                message,
            },
            other => ClientError::Kube(other),
        }
    }
}

/// The reads and writes the reconciler needs from the cluster.
///
/// `get` returns `Ok(None)` when the object does not exist, so a missing
/// object is never confused with a failed read.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError>;

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K, ClientError>;
}

#[async_trait]
impl<T: ClusterClient> ClusterClient for Arc<T> {
    async fn get<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        (**self).get(namespace, name).await
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K, ClientError> {
        (**self).create(namespace, obj).await
    }
}

/// `ClusterClient` backed by a live API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> KubeClusterClient {
        KubeClusterClient { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K, ClientError> {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), obj).await?)
    }
}
