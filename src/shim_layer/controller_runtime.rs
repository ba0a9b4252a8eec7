// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::{
    api::{Api, Resource},
    core::NamespaceResourceScope,
    runtime::{
        controller::{self, Action, Controller},
        reflector::ObjectRef,
        watcher,
    },
    Client,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cluster_client::KubeClusterClient;
use crate::common::ObjectKey;
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::metrics::{Instrumented, PrometheusSink};
use crate::myapp_types::MyApp;
use crate::reconciler::{ConvergenceEngine, Reconcile};
use crate::shim_layer::reconcile::{ReconcileDecision, ReconcileEntrypoint};

const CONTROLLER_NAME: &str = "myapp-controller";
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// Data is passed to reconcile and error_policy.
pub struct Data {
    pub entrypoint: ReconcileEntrypoint,
    pub cancel: CancellationToken,
    pub config: ControllerConfig,
}

/// run_controller builds the reconciler stack and runs it until a shutdown
/// signal arrives. MyApps are watched together with the Deployments and
/// PodDisruptionBudgets they own, so a change to either child re-triggers
/// the owning MyApp.
pub async fn run_controller(config: ControllerConfig) -> Result<()> {
    let client = Client::try_default().await?;

    let sink = Arc::new(PrometheusSink::new()?);
    let engine = ConvergenceEngine::new(KubeClusterClient::new(client.clone()));
    let reconciler: Arc<dyn Reconcile> = Arc::new(Instrumented::new(engine, sink.clone()));

    // Passes still in flight when the process is asked to stop abort at
    // their next API call instead of running to completion.
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let upkeep = spawn_metrics_upkeep(sink.handle(), cancel.clone());

    let apps = scoped_api::<MyApp>(&client, &config);
    let deployments = scoped_api::<Deployment>(&client, &config);
    let pdbs = scoped_api::<PodDisruptionBudget>(&client, &config);

    let data = Arc::new(Data {
        entrypoint: ReconcileEntrypoint::new(reconciler),
        cancel,
        config,
    });

    info!("starting {}", CONTROLLER_NAME);
    Controller::new(apps, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(pdbs, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, data)
        .for_each(|res| async move {
            report_controller_reconciled(CONTROLLER_NAME, &res)
        })
        .await;
    info!("controller terminated");
    upkeep.abort();
    debug!("metrics at shutdown:\n{}", sink.render());
    Ok(())
}

/// Drains recorded histogram samples every `METRICS_UPKEEP_INTERVAL` until
/// `cancel` fires.
pub fn spawn_metrics_upkeep(
    handle: PrometheusHandle,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(METRICS_UPKEEP_INTERVAL) => {}
            }
            trace!("running metrics upkeep");
            handle.run_upkeep();
        }
    })
}

fn scoped_api<K>(client: &Client, config: &ControllerConfig) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug,
{
    match &config.namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Controller triggers this whenever a MyApp or one of its children changed.
/// The object handed over only supplies the key; the pass re-reads it.
pub async fn reconcile(app: Arc<MyApp>, data: Arc<Data>) -> Result<Action, Error> {
    let key = ObjectKey::from_resource(app.as_ref())?;
    let decision = data.entrypoint.on_trigger(&key, &data.cancel).await?;
    Ok(decision_to_action(decision, &data.config))
}

pub fn decision_to_action(decision: ReconcileDecision, config: &ControllerConfig) -> Action {
    if decision.requeue {
        Action::requeue(config.requeue_after)
    } else {
        Action::await_change()
    }
}

// error_policy defines the controller's behavior when the reconcile ends with an error.
pub fn error_policy(_app: Arc<MyApp>, error: &Error, data: Arc<Data>) -> Action {
    if error.is_cancelled() {
        debug!("Reconcile cancelled: {}", error);
    } else {
        warn!("Reconcile failed due to error: {}", error);
    }
    Action::requeue(data.config.error_backoff)
}

pub fn report_controller_reconciled<K, QueueErr>(
    controller_name: &str,
    result: &std::result::Result<(ObjectRef<K>, Action), controller::Error<Error, QueueErr>>,
) where
    K: Resource,
    QueueErr: std::error::Error + 'static,
{
    match result {
        Ok((obj, _)) => {
            tracing::info!(
                controller.name = controller_name,
                object = %obj,
                "Reconciled object"
            );
        }
        Err(err) => {
            tracing::error!(
                controller.name = controller_name,
                error = err as &dyn std::error::Error,
                "Failed to reconcile object",
            );
        }
    }
}
