use crate::core::assume::{RoleTemplate, DEFAULT_CONCURRENCY, DEFAULT_SESSION_NAME};
use crate::core::archive::DEFAULT_ARCHIVE_NAME;
use crate::core::ConfigProvider;
use crate::utils::error::{BackupError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

pub const DEFAULT_REGION: &str = "eu-west-1";
const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub job: JobConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Either a TOML array or a comma-separated string.
    #[serde(deserialize_with = "deserialize_accounts")]
    pub accounts: Vec<String>,
    pub assume_role: String,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_concurrency")]
    pub assume_concurrency: usize,
    #[serde(default = "default_concurrency")]
    pub fetch_concurrency: usize,
}

/// Storage backend, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        path: String,
    },
    S3 {
        bucket: String,
        /// Defaults to the job region.
        region: Option<String>,
        #[serde(default)]
        prefix: String,
        /// Path-style endpoint for S3-compatible stores.
        endpoint_url: Option<String>,
        #[serde(default)]
        auth: S3Auth,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum S3Auth {
    /// The process' own identity.
    #[default]
    Default,
    /// Credentials of a role in the bucket's account.
    AssumeRole { role_arn: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_archive_name")]
    pub name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: default_archive_name(),
        }
    }
}

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

/// Splits `"1111, 2222,3333"` into ids, dropping whitespace and empty items.
pub fn parse_account_list(raw: &str) -> Vec<String> {
    raw.replace(char::is_whitespace, "")
        .split(',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_accounts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Accounts {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Accounts::deserialize(deserializer)? {
        Accounts::List(ids) => ids
            .iter()
            .flat_map(|id| parse_account_list(id))
            .collect(),
        Accounts::Joined(raw) => parse_account_list(&raw),
    })
}

impl BackupConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            BackupError::config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| BackupError::config(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| BackupError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let job = &self.job;
        if job.accounts.is_empty() {
            return Err(BackupError::MissingConfigError {
                field: "job.accounts".to_string(),
            });
        }
        for account in &job.accounts {
            validation::validate_account_id("job.accounts", account)?;
        }
        RoleTemplate::parse(&job.assume_role)?;
        validation::validate_non_empty_string("job.session_name", &job.session_name)?;
        validation::validate_aws_region("job.region", &job.region)?;
        validation::validate_range(
            "job.assume_concurrency",
            job.assume_concurrency,
            1,
            MAX_CONCURRENCY,
        )?;
        validation::validate_range(
            "job.fetch_concurrency",
            job.fetch_concurrency,
            1,
            MAX_CONCURRENCY,
        )?;

        match &self.storage {
            StorageConfig::Local { path } => validation::validate_path("storage.path", path)?,
            StorageConfig::S3 {
                bucket,
                region,
                endpoint_url,
                auth,
                ..
            } => {
                validation::validate_s3_bucket_name("storage.bucket", bucket)?;
                if let Some(region) = region {
                    validation::validate_aws_region("storage.region", region)?;
                }
                if let Some(url) = endpoint_url {
                    validation::validate_url("storage.endpoint_url", url)?;
                }
                if let S3Auth::AssumeRole { role_arn } = auth {
                    validation::validate_non_empty_string("storage.auth.role_arn", role_arn)?;
                }
            }
        }

        if self.archive.enabled {
            validation::validate_non_empty_string("archive.name", &self.archive.name)?;
        }

        Ok(())
    }
}

impl ConfigProvider for BackupConfig {
    fn accounts(&self) -> &[String] {
        &self.job.accounts
    }

    fn assume_role(&self) -> &str {
        &self.job.assume_role
    }

    fn session_name(&self) -> &str {
        &self.job.session_name
    }

    fn assume_concurrency(&self) -> usize {
        self.job.assume_concurrency
    }

    fn fetch_concurrency(&self) -> usize {
        self.job.fetch_concurrency
    }

    fn archive_name(&self) -> Option<&str> {
        self.archive.enabled.then_some(self.archive.name.as_str())
    }
}

impl Validate for BackupConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
