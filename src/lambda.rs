#[cfg(feature = "lambda")]
use anyhow::Context as _;
#[cfg(feature = "lambda")]
use dns_backup::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use dns_backup::{build_aws_engine, BackupConfig, RunSummary};
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "lambda")]
use std::time::{Duration, SystemTime, UNIX_EPOCH};
#[cfg(feature = "lambda")]
use tokio_util::sync::CancellationToken;

/// Time left for the run to wind down before the invocation deadline.
#[cfg(feature = "lambda")]
const DEADLINE_MARGIN: Duration = Duration::from_secs(5);

/// Scheduled events carry their own fields; only `accounts` is read.
#[cfg(feature = "lambda")]
#[derive(Debug, Default, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
}

#[cfg(feature = "lambda")]
#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub summary: RunSummary,
}

#[cfg(feature = "lambda")]
async fn backup(request: Request, cancel: CancellationToken) -> anyhow::Result<RunSummary> {
    let mut config = BackupConfig::from_env().context("loading DNS_BACKUP_* configuration")?;
    if let Some(accounts) = request.accounts {
        tracing::info!(accounts = accounts.len(), "Account list taken from the event");
        config.job.accounts = accounts;
    }
    config.validate().context("invalid configuration")?;

    let engine = build_aws_engine(config)
        .await
        .context("setting up AWS clients")?;

    engine.run(&cancel).await.context("backup run failed")
}

#[cfg(feature = "lambda")]
fn time_left(deadline_ms: u64) -> Duration {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    Duration::from_millis(deadline_ms.saturating_sub(now_ms)).saturating_sub(DEADLINE_MARGIN)
}

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!(request_id = %event.context.request_id, "Starting DNS backup Lambda function");

    let cancel = CancellationToken::new();
    let watchdog = {
        let cancel = cancel.clone();
        let remaining = time_left(event.context.deadline);
        tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            tracing::warn!("Invocation deadline approaching, cancelling run");
            cancel.cancel();
        })
    };

    let result = backup(event.payload, cancel).await;
    watchdog.abort();

    let summary = result.inspect_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "DNS backup failed");
    })?;

    tracing::info!(
        accounts = summary.accounts,
        zones = summary.zones,
        "DNS backup Lambda function completed successfully"
    );
    Ok(Response {
        message: "DNS backup completed successfully".to_string(),
        summary,
    })
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
