#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::{ArchiveConfig, BackupConfig, JobConfig, S3Auth, StorageConfig};
