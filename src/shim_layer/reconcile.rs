// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::common::ObjectKey;
use crate::error::Error;
use crate::reconciler::{Outcome, Reconcile};

/// What the trigger queue should do with the key once the pass returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileDecision {
    pub requeue: bool,
}

/// Boundary between the trigger queue and the reconciler: one call per
/// delivered key.
#[derive(Clone)]
pub struct ReconcileEntrypoint {
    reconciler: Arc<dyn Reconcile>,
}

impl ReconcileEntrypoint {
    pub fn new(reconciler: Arc<dyn Reconcile>) -> ReconcileEntrypoint {
        ReconcileEntrypoint { reconciler }
    }

    /// Runs one pass and maps its outcome onto the queue contract:
    /// a created child asks for a requeue, a synced or missing MyApp waits for
    /// the next change, and a failure is returned so the queue backs off.
    pub async fn on_trigger(
        &self,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> Result<ReconcileDecision, Error> {
        let start = Instant::now();
        let outcome = self.reconciler.reconcile(key, cancel).await;
        let elapsed = start.elapsed();

        match outcome {
            Outcome::Failed(err) => {
                warn!(
                    namespace = %key.namespace,
                    name = %key.name,
                    duration_secs = elapsed.as_secs_f64(),
                    error = %err,
                    "Reconcile failed"
                );
                Err(err)
            }
            outcome => {
                info!(
                    namespace = %key.namespace,
                    name = %key.name,
                    duration_secs = elapsed.as_secs_f64(),
                    outcome = %outcome,
                    "Reconciled"
                );
                Ok(ReconcileDecision {
                    requeue: outcome.requeue(),
                })
            }
        }
    }
}
