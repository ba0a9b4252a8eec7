// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cluster_client::{ClientError, ClusterClient, ClusterObject};
use crate::common::*;
use crate::error::Error;
use crate::myapp_types::*;
use crate::resources::*;

/// Result of one reconcile pass.
#[derive(Debug)]
pub enum Outcome {
    /// A missing child was created; the pass stops there and asks to be
    /// run again to check the next child.
    Created(ChildKind),
    NoOpSynced,
    /// The MyApp itself is gone. Its children are left to the cluster's
    /// cascading deletion.
    NotFound,
    Failed(Error),
}

impl Outcome {
    pub fn requeue(&self) -> bool {
        matches!(self, Outcome::Created(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created(kind) => write!(f, "created {}", kind),
            Outcome::NoOpSynced => f.write_str("synced"),
            Outcome::NotFound => f.write_str("not found"),
            Outcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// A single reconcile pass for one identity. This is what the trigger side
/// holds on to, so the engine and its wrappers are interchangeable.
#[async_trait]
pub trait Reconcile: Send + Sync {
    async fn reconcile(&self, key: &ObjectKey, cancel: &CancellationToken) -> Outcome;
}

enum ChildState {
    InSync,
    Created,
}

/// Drives one MyApp toward its Deployment and PodDisruptionBudget, one
/// corrective action per pass.
///
/// Nothing is remembered between passes: every pass re-reads the cluster.
pub struct ConvergenceEngine<C> {
    client: C,
}

impl<C: ClusterClient> ConvergenceEngine<C> {
    pub fn new(client: C) -> ConvergenceEngine<C> {
        ConvergenceEngine { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn converge(
        &self,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        // Quorum read of the MyApp before taking any action.
        let app = guarded(key, cancel, self.client.get::<MyApp>(&key.namespace, &key.name))
            .await?
            .map_err(|source| Error::ClientReadFailure {
                kind: "MyApp",
                key: key.clone(),
                source,
            })?;
        let app = match app {
            Some(app) => app,
            None => {
                info!("{} not found, end reconcile", key);
                return Ok(Outcome::NotFound);
            }
        };

        // The Deployment goes first: the PDB only makes sense once the pods
        // it selects can exist.
        if let ChildState::Created = self
            .create_if_absent(key, &app, ChildKind::Deployment, deployment_name(key), cancel, || {
                make_deployment(key, &app.spec)
            })
            .await?
        {
            return Ok(Outcome::Created(ChildKind::Deployment));
        }

        if let ChildState::Created = self
            .create_if_absent(
                key,
                &app,
                ChildKind::PodDisruptionBudget,
                pod_disruption_budget_name(key),
                cancel,
                || make_pod_disruption_budget(key, &app.spec),
            )
            .await?
        {
            return Ok(Outcome::Created(ChildKind::PodDisruptionBudget));
        }

        Ok(Outcome::NoOpSynced)
    }

    async fn create_if_absent<K, F>(
        &self,
        key: &ObjectKey,
        app: &MyApp,
        kind: ChildKind,
        child_name: String,
        cancel: &CancellationToken,
        build: F,
    ) -> Result<ChildState, Error>
    where
        K: ClusterObject,
        F: FnOnce() -> K + Send,
    {
        let existing = guarded(key, cancel, self.client.get::<K>(&key.namespace, &child_name))
            .await?
            .map_err(|source| Error::ClientReadFailure {
                kind: kind.as_str(),
                key: key.clone(),
                source,
            })?;
        if existing.is_some() {
            debug!("{} {}/{} exists", kind, key.namespace, child_name);
            return Ok(ChildState::InSync);
        }

        let mut child = build();
        set_controller_reference(app, child.meta_mut()).map_err(|source| {
            Error::OwnershipAttachFailure {
                kind,
                key: key.clone(),
                source,
            }
        })?;

        info!("Create {}: {}/{}", kind, key.namespace, child_name);
        match guarded(key, cancel, self.client.create(&key.namespace, &child)).await? {
            Ok(_) => Ok(ChildState::Created),
            Err(err) if err.is_already_exists() => {
                // Another pass won the race; the child is there either way.
                info!("{} {}/{} already exists", kind, key.namespace, child_name);
                Ok(ChildState::InSync)
            }
            Err(source) => Err(Error::ClientCreateFailure {
                kind,
                key: key.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl<C: ClusterClient> Reconcile for ConvergenceEngine<C> {
    async fn reconcile(&self, key: &ObjectKey, cancel: &CancellationToken) -> Outcome {
        match self.converge(key, cancel).await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Runs one client call unless `cancel` fires first. A token that is already
/// cancelled wins before the call is ever polled.
async fn guarded<T, Fut>(
    key: &ObjectKey,
    cancel: &CancellationToken,
    call: Fut,
) -> Result<Result<T, ClientError>, Error>
where
    Fut: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled(key.clone())),
        res = call => Ok(res),
    }
}
