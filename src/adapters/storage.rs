use crate::adapters::aws::{sdk_credentials, AwsContext};
use crate::config::{S3Auth, StorageConfig};
use crate::domain::ports::{CredentialBroker, Storage};
use crate::utils::error::{BackupError, Result};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackupError::storage(path, e))?;
        }

        tokio::fs::write(&full_path, data)
            .await
            .map_err(|e| BackupError::storage(path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .map_err(|e| BackupError::storage(path, e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackupError::storage(path, e)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn key(&self, path: &str) -> String {
        object_key(&self.prefix, path)
    }
}

fn object_key(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

impl Storage for S3Storage {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = self.key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| BackupError::storage(key, DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let key = self.key(path);
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => match err.into_service_error() {
                HeadObjectError::NotFound(_) => Ok(false),
                err => Err(BackupError::storage(key, DisplayErrorContext(&err))),
            },
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.key(path);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| BackupError::storage(key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}

/// The storage backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum AnyStorage {
    Local(LocalStorage),
    S3(S3Storage),
}

impl AnyStorage {
    /// Builds the configured backend. An S3 `assume-role` auth is resolved
    /// here, once, through `broker`.
    pub async fn from_config<B: CredentialBroker>(
        config: &StorageConfig,
        context: &AwsContext,
        broker: &B,
        session_name: &str,
    ) -> Result<Self> {
        match config {
            StorageConfig::Local { path } => Ok(Self::Local(LocalStorage::new(path))),
            StorageConfig::S3 {
                bucket,
                region,
                prefix,
                endpoint_url,
                auth,
            } => {
                let mut builder = aws_sdk_s3::config::Builder::from(context.sdk_config())
                    .region(aws_sdk_s3::config::Region::new(
                        region.clone().unwrap_or_else(|| context.region().to_string()),
                    ));

                if let Some(url) = endpoint_url {
                    builder = builder.endpoint_url(url).force_path_style(true);
                }

                if let S3Auth::AssumeRole { role_arn } = auth {
                    tracing::debug!(role_arn = %role_arn, "Assuming storage role");
                    let credentials = broker.assume_role(role_arn, session_name).await?;
                    builder = builder.credentials_provider(sdk_credentials(&credentials));
                }

                tracing::info!(bucket = %bucket, prefix = %prefix, "Using S3 storage");
                Ok(Self::S3(S3Storage::new(
                    S3Client::from_conf(builder.build()),
                    bucket.clone(),
                    prefix.clone(),
                )))
            }
        }
    }
}

impl Storage for AnyStorage {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        match self {
            Self::Local(storage) => storage.put(path, data).await,
            Self::S3(storage) => storage.put(path, data).await,
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match self {
            Self::Local(storage) => storage.exists(path).await,
            Self::S3(storage) => storage.exists(path).await,
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self {
            Self::Local(storage) => storage.delete(path).await,
            Self::S3(storage) => storage.delete(path).await,
        }
    }
}
