use crate::domain::model::{
    HostedZone, RecordPage, RecordPageToken, Session, Snapshot, TemporaryCredentials,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Durable sink for backup artifacts. Every `put` overwrites.
pub trait Storage: Send + Sync {
    fn put(&self, path: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool>> + Send;
    fn delete(&self, path: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Exchanges the process' base identity for credentials scoped to one role.
pub trait CredentialBroker: Send + Sync + 'static {
    fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> impl Future<Output = Result<TemporaryCredentials>> + Send;
}

/// Builds DNS clients bound to an assumed session.
pub trait ZoneDirectory: Send + Sync + 'static {
    type Client: ZoneClient;

    fn connect(&self, session: &Session) -> Self::Client;
}

pub trait ZoneClient: Send + Sync + 'static {
    /// All hosted zones visible to the session, provider paging already drained.
    fn list_hosted_zones(&self) -> impl Future<Output = Result<Vec<HostedZone>>> + Send;

    /// One page of record sets; `start` is the cursor returned by the previous page.
    fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&RecordPageToken>,
    ) -> impl Future<Output = Result<RecordPage>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn accounts(&self) -> &[String];
    fn assume_role(&self) -> &str;
    fn session_name(&self) -> &str;
    fn assume_concurrency(&self) -> usize;
    fn fetch_concurrency(&self) -> usize;
    /// File name of the run archive, `None` when archiving is off.
    fn archive_name(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Assumes roles and captures every zone's records.
    async fn extract(&self, cancel: &CancellationToken) -> Result<Snapshot>;

    /// Writes the snapshot and its zone files; returns the written paths.
    async fn load(
        &self,
        snapshot: Snapshot,
        run_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>>;
}

/// Entry point invoked by whatever decides when a backup runs.
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn run_once(&self, cancel: CancellationToken) -> Result<()>;
}
