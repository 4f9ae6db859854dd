pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{BackupConfig, StorageConfig};

pub use adapters::{AnyStorage, AwsContext, LocalStorage, Route53Directory, S3Storage, StsCredentialBroker};
pub use core::{
    engine::{run_on_interval, BackupEngine, RunSummary},
    pipeline::ZoneBackupPipeline,
};
pub use utils::error::{BackupError, Result};

/// The pipeline wired to AWS, as both binaries run it.
pub type AwsBackupEngine = BackupEngine<
    ZoneBackupPipeline<StsCredentialBroker, Route53Directory, AnyStorage, BackupConfig>,
>;

/// Builds the AWS-backed engine for an already validated configuration.
pub async fn build_aws_engine(config: BackupConfig) -> Result<AwsBackupEngine> {
    let context = AwsContext::new(&config.job.region).await;
    let broker = std::sync::Arc::new(StsCredentialBroker::new(&context));
    let storage = AnyStorage::from_config(
        &config.storage,
        &context,
        broker.as_ref(),
        &config.job.session_name,
    )
    .await?;
    let directory = std::sync::Arc::new(Route53Directory::new(context));

    let pipeline = ZoneBackupPipeline::new(broker, directory, storage, config)?;
    Ok(BackupEngine::new(pipeline))
}
