// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::common::ObjectKey;
use crate::reconciler::{Outcome, Reconcile};

pub const RECONCILE_ATTEMPTS: &str = "myapp_reconcile_attempts_total";
pub const RECONCILE_DURATION: &str = "myapp_reconcile_duration_seconds";

/// Bucket bounds, in seconds, of the duration histogram.
pub const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Bucket a pass is reported under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileResult {
    Success,
    Error,
    /// Kept as its own series for passes that bail out before doing any
    /// work; no pass ends up here today.
    Skipped,
}

impl ReconcileResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileResult::Success => "success",
            ReconcileResult::Error => "error",
            ReconcileResult::Skipped => "skipped",
        }
    }
}

impl From<&Outcome> for ReconcileResult {
    fn from(outcome: &Outcome) -> ReconcileResult {
        match outcome {
            Outcome::Created(_) | Outcome::NoOpSynced | Outcome::NotFound => {
                ReconcileResult::Success
            }
            Outcome::Failed(_) => ReconcileResult::Error,
        }
    }
}

impl fmt::Display for ReconcileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("metrics sink unavailable: {0}")]
pub struct SinkError(pub String);

/// Write-only destination for reconcile metrics.
pub trait MetricsSink: Send + Sync {
    fn record_attempt(&self, key: &ObjectKey) -> Result<(), SinkError>;

    fn record_duration(
        &self,
        result: ReconcileResult,
        elapsed: Duration,
    ) -> Result<(), SinkError>;
}

/// Wraps a reconciler and reports every pass to a sink. The wrapped
/// reconciler's outcome is returned untouched; sink failures are dropped.
pub struct Instrumented<R> {
    inner: R,
    sink: Arc<dyn MetricsSink>,
}

impl<R: Reconcile> Instrumented<R> {
    pub fn new(inner: R, sink: Arc<dyn MetricsSink>) -> Instrumented<R> {
        Instrumented { inner, sink }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Reconcile> Reconcile for Instrumented<R> {
    async fn reconcile(&self, key: &ObjectKey, cancel: &CancellationToken) -> Outcome {
        if let Err(err) = self.sink.record_attempt(key) {
            debug!("Dropping attempt metric for {}: {}", key, err);
        }

        let start = Instant::now();
        let outcome = self.inner.reconcile(key, cancel).await;
        let elapsed = start.elapsed();

        let result = ReconcileResult::from(&outcome);
        if let Err(err) = self.sink.record_duration(result, elapsed) {
            debug!("Dropping duration metric for {}: {}", key, err);
        }
        outcome
    }
}

/// Sink backed by a Prometheus recorder owned by this value rather than
/// installed as the process-wide recorder.
///
/// Durations are exported as a histogram with `DURATION_BUCKETS`. The owner
/// has to call `run_upkeep` on `handle()` periodically, otherwise samples
/// accumulate between renders.
pub struct PrometheusSink {
    recorder: PrometheusRecorder,
}

impl PrometheusSink {
    pub fn new() -> Result<PrometheusSink, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(RECONCILE_DURATION.to_string()),
                DURATION_BUCKETS,
            )?
            .build_recorder();
        ::metrics::with_local_recorder(&recorder, || {
            ::metrics::describe_counter!(RECONCILE_ATTEMPTS, "Reconcile passes started per MyApp");
            ::metrics::describe_histogram!(
                RECONCILE_DURATION,
                ::metrics::Unit::Seconds,
                "Wall-clock duration of reconcile passes by result"
            );
        });
        Ok(PrometheusSink { recorder })
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.recorder.handle()
    }

    /// Text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.recorder.handle().render()
    }
}

impl MetricsSink for PrometheusSink {
    fn record_attempt(&self, key: &ObjectKey) -> Result<(), SinkError> {
        ::metrics::with_local_recorder(&self.recorder, || {
            ::metrics::counter!(
                RECONCILE_ATTEMPTS,
                "namespace" => key.namespace.clone(),
                "name" => key.name.clone()
            )
            .increment(1);
        });
        Ok(())
    }

    fn record_duration(
        &self,
        result: ReconcileResult,
        elapsed: Duration,
    ) -> Result<(), SinkError> {
        ::metrics::with_local_recorder(&self.recorder, || {
            ::metrics::histogram!(RECONCILE_DURATION, "result" => result.as_str())
                .record(elapsed.as_secs_f64());
        });
        Ok(())
    }
}

/// Sink that keeps everything in memory; handy for asserting on metrics.
#[derive(Default)]
pub struct InMemorySink {
    attempts: Mutex<HashMap<ObjectKey, u64>>,
    durations: Mutex<Vec<(ReconcileResult, Duration)>>,
}

impl InMemorySink {
    pub fn new() -> InMemorySink {
        InMemorySink::default()
    }

    pub fn attempts(&self, key: &ObjectKey) -> u64 {
        self.attempts
            .lock()
            .map(|attempts| attempts.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn durations(&self) -> Vec<(ReconcileResult, Duration)> {
        self.durations
            .lock()
            .map(|durations| durations.clone())
            .unwrap_or_default()
    }

    pub fn observations(&self, result: ReconcileResult) -> usize {
        self.durations().iter().filter(|(r, _)| *r == result).count()
    }
}

impl MetricsSink for InMemorySink {
    fn record_attempt(&self, key: &ObjectKey) -> Result<(), SinkError> {
        let mut attempts = self
            .attempts
            .lock()
            .map_err(|_| SinkError("attempt counters poisoned".to_string()))?;
        *attempts.entry(key.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn record_duration(
        &self,
        result: ReconcileResult,
        elapsed: Duration,
    ) -> Result<(), SinkError> {
        self.durations
            .lock()
            .map_err(|_| SinkError("duration observations poisoned".to_string()))?
            .push((result, elapsed));
        Ok(())
    }
}
