use crate::core::gate::cancellable;
use crate::core::zone_file::generate_zone_file;
use crate::domain::model::{AccountId, Snapshot};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use tokio_util::sync::CancellationToken;

pub const RECORDS_PATH: &str = "zones/records.json";

pub fn zone_file_path(account: &AccountId, zone_name: &str) -> String {
    format!("zones/{0}/{0}-{1}.zone", account, zone_name)
}

/// A file written by a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: Vec<u8>,
}

/// Writes the snapshot document and one zone file per (account, zone).
pub struct BackupPersister<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> BackupPersister<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// The first render or write failure stops the loop; zones after it are
    /// not written and files already written stay in place.
    pub async fn persist(
        &self,
        snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> Result<Vec<Artifact>> {
        match self.storage.exists(RECORDS_PATH).await {
            Ok(true) => tracing::debug!(path = RECORDS_PATH, "Replacing previous snapshot"),
            Ok(false) => tracing::info!(path = RECORDS_PATH, "Writing first snapshot"),
            Err(e) => tracing::warn!(path = RECORDS_PATH, error = %e, "Could not probe storage"),
        }

        let mut artifacts = Vec::new();

        let document = serde_json::to_vec_pretty(snapshot)?;
        self.write(RECORDS_PATH.to_string(), document, cancel, &mut artifacts)
            .await?;

        for (account, zones) in snapshot {
            for (zone_name, records) in zones {
                let rendered = generate_zone_file(records, zone_name).map_err(|e| {
                    tracing::error!(
                        account = %account,
                        zone = %zone_name,
                        error = %e,
                        "Zone file rendering failed, aborting persistence"
                    );
                    e
                })?;

                self.write(
                    zone_file_path(account, zone_name),
                    rendered.into_bytes(),
                    cancel,
                    &mut artifacts,
                )
                .await?;
            }
        }

        tracing::info!(files = artifacts.len(), "Backup artifacts written");
        Ok(artifacts)
    }

    async fn write(
        &self,
        path: String,
        contents: Vec<u8>,
        cancel: &CancellationToken,
        artifacts: &mut Vec<Artifact>,
    ) -> Result<()> {
        cancellable(cancel, self.storage.put(&path, &contents)).await?;
        tracing::debug!(path = %path, bytes = contents.len(), "Artifact written");
        artifacts.push(Artifact { path, contents });
        Ok(())
    }
}
