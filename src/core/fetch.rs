use crate::core::gate::{cancellable, AdmissionGate};
use crate::domain::model::{AccountId, Session, Snapshot, ZoneRecords};
use crate::domain::ports::{ZoneClient, ZoneDirectory};
use crate::utils::error::BackupError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Captures every hosted zone and record set visible to a set of sessions.
pub struct ZoneFetcher<D: ZoneDirectory> {
    directory: Arc<D>,
    concurrency: usize,
}

impl<D: ZoneDirectory> ZoneFetcher<D> {
    pub fn new(directory: Arc<D>, concurrency: usize) -> Self {
        Self {
            directory,
            concurrency,
        }
    }

    /// One worker per session. Each worker fills its own accumulator; the
    /// snapshot is assembled here as workers finish.
    pub async fn fetch_all(
        &self,
        sessions: &BTreeMap<AccountId, Session>,
        cancel: &CancellationToken,
    ) -> Snapshot {
        let gate = AdmissionGate::new(self.concurrency);
        let mut workers = JoinSet::new();

        for session in sessions.values() {
            let directory = Arc::clone(&self.directory);
            let gate = gate.clone();
            let cancel = cancel.clone();
            let session = session.clone();

            workers.spawn(async move {
                let _permit = match gate.admit(&cancel).await {
                    Ok(permit) => permit,
                    Err(_) => return (session.account, None),
                };
                let client = directory.connect(&session);
                let zones = fetch_account(&client, &session.account, &cancel).await;
                (session.account, zones)
            });
        }

        let mut snapshot = Snapshot::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((account, Some(zones))) => {
                    let bucket = snapshot.entry(account).or_default();
                    for (zone, records) in zones {
                        bucket.entry(zone).or_default().extend(records);
                    }
                }
                Ok((_, None)) => {}
                Err(e) => tracing::error!(error = %e, "Zone fetch worker panicked"),
            }
        }

        tracing::info!(
            sessions = sessions.len(),
            accounts = snapshot.len(),
            zones = snapshot.values().map(|z| z.len()).sum::<usize>(),
            "Hosted zone fetch finished"
        );
        snapshot
    }
}

/// Lists one account's zones and drains every record page.
///
/// Returns `None` when the zone listing itself fails. A failing record page
/// ends the account's work but keeps what was already captured.
async fn fetch_account<C: ZoneClient>(
    client: &C,
    account: &AccountId,
    cancel: &CancellationToken,
) -> Option<ZoneRecords> {
    tracing::info!(account = %account, "Fetching hosted zones");

    let hosted_zones = match cancellable(cancel, client.list_hosted_zones()).await {
        Ok(zones) => zones,
        Err(e) => {
            log_discovery_failure(account, None, &e);
            return None;
        }
    };

    let mut captured = ZoneRecords::new();
    for zone in hosted_zones {
        let bucket = captured.entry(zone.name.clone()).or_default();
        let mut cursor = None;

        loop {
            let page = match cancellable(cancel, client.list_record_sets(&zone.id, cursor.as_ref()))
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    log_discovery_failure(account, Some(&zone.name), &e);
                    return Some(captured);
                }
            };

            bucket.extend(page.records);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            account = %account,
            zone = %zone.name,
            records = bucket.len(),
            "Captured zone records"
        );
    }

    Some(captured)
}

fn log_discovery_failure(account: &AccountId, zone: Option<&str>, error: &BackupError) {
    match zone {
        Some(zone) => tracing::warn!(
            account = %account,
            zone = %zone,
            error = %error,
            "Failed to list resource record sets, abandoning account"
        ),
        None => tracing::warn!(
            account = %account,
            error = %error,
            "Failed to list hosted zones, abandoning account"
        ),
    }
}
