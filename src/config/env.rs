use crate::config::toml_config::{
    parse_account_list, ArchiveConfig, BackupConfig, JobConfig, S3Auth, StorageConfig,
    DEFAULT_REGION,
};
use crate::core::archive::DEFAULT_ARCHIVE_NAME;
use crate::core::assume::{DEFAULT_CONCURRENCY, DEFAULT_SESSION_NAME};
use crate::utils::error::{BackupError, Result};
use crate::utils::validation::validate_required_field;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "DNS_BACKUP_";

impl BackupConfig {
    /// Loads configuration from `DNS_BACKUP_*` variables. When
    /// `DNS_BACKUP_CONFIG` names a file, that file is used instead.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        if let Some(path) = var("CONFIG") {
            return Self::from_file(path);
        }

        let accounts = var("ACCOUNTS");
        let assume_role = var("ASSUME_ROLE");
        let job = JobConfig {
            accounts: parse_account_list(validate_required_field(
                "DNS_BACKUP_ACCOUNTS",
                &accounts,
            )?),
            assume_role: validate_required_field("DNS_BACKUP_ASSUME_ROLE", &assume_role)?.clone(),
            session_name: var("SESSION_NAME").unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            region: var("REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            assume_concurrency: parse_or("ASSUME_CONCURRENCY", var("ASSUME_CONCURRENCY"), DEFAULT_CONCURRENCY)?,
            fetch_concurrency: parse_or("FETCH_CONCURRENCY", var("FETCH_CONCURRENCY"), DEFAULT_CONCURRENCY)?,
        };

        let storage = match var("STORAGE_KIND").as_deref().unwrap_or("s3") {
            "local" => {
                let path = var("STORAGE_PATH");
                StorageConfig::Local {
                    path: validate_required_field("DNS_BACKUP_STORAGE_PATH", &path)?.clone(),
                }
            }
            "s3" => {
                let bucket = var("S3_BUCKET");
                StorageConfig::S3 {
                    bucket: validate_required_field("DNS_BACKUP_S3_BUCKET", &bucket)?.clone(),
                    region: var("S3_REGION"),
                    prefix: var("S3_PREFIX").unwrap_or_default(),
                    endpoint_url: var("S3_ENDPOINT_URL"),
                    auth: match var("S3_ROLE_ARN") {
                        Some(role_arn) => S3Auth::AssumeRole { role_arn },
                        None => S3Auth::Default,
                    },
                }
            }
            other => {
                return Err(BackupError::InvalidConfigValueError {
                    field: "DNS_BACKUP_STORAGE_KIND".to_string(),
                    value: other.to_string(),
                    reason: "expected 'local' or 's3'".to_string(),
                })
            }
        };

        let archive = ArchiveConfig {
            enabled: parse_or("ARCHIVE", var("ARCHIVE"), false)?,
            name: var("ARCHIVE_NAME").unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string()),
        };

        Ok(Self {
            job,
            storage,
            archive,
        })
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BackupError::InvalidConfigValueError {
                field: format!("{}{}", ENV_PREFIX, name),
                value: raw.clone(),
                reason: "cannot be parsed".to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_minimal_s3_environment() {
        let config = BackupConfig::from_lookup(lookup(&[
            ("DNS_BACKUP_ACCOUNTS", "111111111111, 222222222222"),
            ("DNS_BACKUP_ASSUME_ROLE", "reader"),
            ("DNS_BACKUP_S3_BUCKET", "dns-backups"),
        ]))
        .unwrap();

        assert_eq!(config.job.accounts, vec!["111111111111", "222222222222"]);
        assert_eq!(config.job.assume_concurrency, 30);
        assert_eq!(
            config.storage,
            StorageConfig::S3 {
                bucket: "dns-backups".to_string(),
                region: None,
                prefix: String::new(),
                endpoint_url: None,
                auth: S3Auth::Default,
            }
        );
        assert!(!config.archive.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_storage_and_overrides() {
        let config = BackupConfig::from_lookup(lookup(&[
            ("DNS_BACKUP_ACCOUNTS", "111111111111"),
            ("DNS_BACKUP_ASSUME_ROLE", "reader"),
            ("DNS_BACKUP_STORAGE_KIND", "local"),
            ("DNS_BACKUP_STORAGE_PATH", "/var/backups/dns"),
            ("DNS_BACKUP_FETCH_CONCURRENCY", "5"),
            ("DNS_BACKUP_ARCHIVE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.job.fetch_concurrency, 5);
        assert!(config.archive.enabled);
        assert_eq!(config.archive.name, "zones.zip");
        assert!(matches!(config.storage, StorageConfig::Local { .. }));
    }

    #[test]
    fn test_missing_required_variables() {
        let result = BackupConfig::from_lookup(lookup(&[("DNS_BACKUP_ASSUME_ROLE", "reader")]));
        assert!(matches!(
            result,
            Err(BackupError::MissingConfigError { ref field }) if field == "DNS_BACKUP_ACCOUNTS"
        ));

        let result = BackupConfig::from_lookup(lookup(&[
            ("DNS_BACKUP_ACCOUNTS", "111111111111"),
            ("DNS_BACKUP_ASSUME_ROLE", "reader"),
        ]));
        assert!(matches!(
            result,
            Err(BackupError::MissingConfigError { ref field }) if field == "DNS_BACKUP_S3_BUCKET"
        ));
    }

    #[test]
    fn test_unparsable_number_is_rejected() {
        let result = BackupConfig::from_lookup(lookup(&[
            ("DNS_BACKUP_ACCOUNTS", "111111111111"),
            ("DNS_BACKUP_ASSUME_ROLE", "reader"),
            ("DNS_BACKUP_S3_BUCKET", "dns-backups"),
            ("DNS_BACKUP_ASSUME_CONCURRENCY", "lots"),
        ]));
        assert!(matches!(
            result,
            Err(BackupError::InvalidConfigValueError { .. })
        ));
    }
}
