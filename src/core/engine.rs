use crate::domain::model::Snapshot;
use crate::domain::ports::{Pipeline, Trigger};
use crate::utils::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What one run captured and where it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_at: DateTime<Utc>,
    pub accounts: usize,
    pub zones: usize,
    pub records: usize,
    pub artifacts: Vec<String>,
}

impl RunSummary {
    fn new(run_at: DateTime<Utc>, snapshot: &Snapshot, artifacts: Vec<String>) -> Self {
        Self {
            run_at,
            accounts: snapshot.len(),
            zones: snapshot.values().map(|zones| zones.len()).sum(),
            records: snapshot
                .values()
                .flat_map(|zones| zones.values())
                .map(|records| records.len())
                .sum(),
            artifacts,
        }
    }
}

pub struct BackupEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> BackupEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        let run_at = Utc::now();
        tracing::info!(run_at = %run_at, "Starting DNS zone backup");

        let snapshot = self.pipeline.extract(cancel).await?;
        if cancel.is_cancelled() {
            return Err(BackupError::Cancelled);
        }

        let summary_base = RunSummary::new(run_at, &snapshot, Vec::new());
        tracing::info!(
            accounts = summary_base.accounts,
            zones = summary_base.zones,
            records = summary_base.records,
            "Snapshot captured"
        );

        let artifacts = self.pipeline.load(snapshot, run_at, cancel).await?;
        Ok(RunSummary {
            artifacts,
            ..summary_base
        })
    }
}

#[async_trait::async_trait]
impl<P: Pipeline> Trigger for BackupEngine<P> {
    async fn run_once(&self, cancel: CancellationToken) -> Result<()> {
        match self.run(&cancel).await {
            Ok(summary) => {
                tracing::info!(
                    accounts = summary.accounts,
                    zones = summary.zones,
                    files = summary.artifacts.len(),
                    "Backup run completed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, severity = ?e.severity(), "Backup run failed");
                Err(e)
            }
        }
    }
}

/// Runs the trigger immediately and then every `period` until `cancel` fires.
/// A failed run is logged and the schedule continues.
pub async fn run_on_interval<T: Trigger>(trigger: &T, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // A run that fails is already logged by the trigger.
                let _ = trigger.run_once(cancel.child_token()).await;
            }
        }
    }
    tracing::info!("Backup schedule stopped");
}
