use crate::core::archive::store_archive;
use crate::core::assume::{RoleAssumer, RoleTemplate};
use crate::core::fetch::ZoneFetcher;
use crate::core::persist::BackupPersister;
use crate::domain::model::{AccountId, Snapshot};
use crate::domain::ports::{ConfigProvider, CredentialBroker, Pipeline, Storage, ZoneDirectory};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Assume -> fetch -> render/persist over the configured accounts.
pub struct ZoneBackupPipeline<B, D, S, C>
where
    B: CredentialBroker,
    D: ZoneDirectory,
    S: Storage,
    C: ConfigProvider,
{
    broker: Arc<B>,
    directory: Arc<D>,
    storage: S,
    config: C,
    role: RoleTemplate,
}

impl<B, D, S, C> ZoneBackupPipeline<B, D, S, C>
where
    B: CredentialBroker,
    D: ZoneDirectory,
    S: Storage,
    C: ConfigProvider,
{
    pub fn new(broker: Arc<B>, directory: Arc<D>, storage: S, config: C) -> Result<Self> {
        let role = RoleTemplate::parse(config.assume_role())?;
        Ok(Self {
            broker,
            directory,
            storage,
            config,
            role,
        })
    }

    fn accounts(&self) -> BTreeSet<AccountId> {
        self.config
            .accounts()
            .iter()
            .map(|id| AccountId::new(id.trim()))
            .collect()
    }
}

#[async_trait::async_trait]
impl<B, D, S, C> Pipeline for ZoneBackupPipeline<B, D, S, C>
where
    B: CredentialBroker,
    D: ZoneDirectory,
    S: Storage,
    C: ConfigProvider,
{
    async fn extract(&self, cancel: &CancellationToken) -> Result<Snapshot> {
        let accounts = self.accounts();
        tracing::info!(accounts = accounts.len(), "Assuming backup role");

        let sessions = RoleAssumer::new(
            Arc::clone(&self.broker),
            self.role.clone(),
            self.config.assume_concurrency(),
        )
        .with_session_name(self.config.session_name())
        .assume_all(&accounts, cancel)
        .await;

        let snapshot = ZoneFetcher::new(Arc::clone(&self.directory), self.config.fetch_concurrency())
            .fetch_all(&sessions, cancel)
            .await;

        Ok(snapshot)
    }

    async fn load(
        &self,
        snapshot: Snapshot,
        run_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let artifacts = BackupPersister::new(&self.storage)
            .persist(&snapshot, cancel)
            .await?;

        let mut written: Vec<String> = artifacts.iter().map(|a| a.path.clone()).collect();
        if let Some(name) = self.config.archive_name() {
            let archived = store_archive(&self.storage, &artifacts, name, run_at, cancel).await?;
            written.extend(archived);
        }

        Ok(written)
    }
}
