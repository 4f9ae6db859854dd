use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unable to assume role in account {account}: {message}")]
    CredentialError { account: String, message: String },

    #[error("Discovery failed for account {account}{}: {message}", zone_suffix(.zone))]
    DiscoveryError {
        account: String,
        zone: Option<String>,
        message: String,
    },

    #[error("Invalid zone {zone}: {message}")]
    ZoneFileError { zone: String, message: String },

    #[error("Storage operation on '{path}' failed: {message}")]
    StorageError { path: String, message: String },

    #[error("Backup run was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a run that ended with this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Low => 130, // interrupted
            Self::Medium => 2,
            Self::High => 1,
            Self::Critical => 3,
        }
    }
}

impl BackupError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::StorageError {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Low,
            Self::CredentialError { .. } | Self::DiscoveryError { .. } => ErrorSeverity::Medium,
            Self::ZoneFileError { .. } | Self::SerializationError(_) | Self::ZipError(_) => {
                ErrorSeverity::High
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::StorageError { .. }
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Check the configuration file and DNS_BACKUP_* environment variables"
            }
            Self::CredentialError { .. } => {
                "Verify the role exists in the target account and trusts the calling identity"
            }
            Self::DiscoveryError { .. } => {
                "Verify the assumed role grants route53:ListHostedZones and route53:ListResourceRecordSets"
            }
            Self::ZoneFileError { .. } => {
                "Inspect zones/records.json for the zone; its apex SOA record is missing or malformed"
            }
            Self::StorageError { .. } | Self::IoError(_) => {
                "Check that the storage location exists and is writable"
            }
            Self::SerializationError(_) | Self::ZipError(_) => {
                "Re-run the backup; the snapshot could not be encoded"
            }
            Self::Cancelled => "The run was interrupted; the next scheduled run starts from scratch",
        }
    }
}

fn zone_suffix(zone: &Option<String>) -> String {
    zone.as_deref()
        .map(|z| format!(" (zone {z})"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_error_message_includes_zone() {
        let err = BackupError::DiscoveryError {
            account: "111111111111".to_string(),
            zone: Some("example.com.".to_string()),
            message: "throttled".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Discovery failed for account 111111111111 (zone example.com.): throttled"
        );

        let err = BackupError::DiscoveryError {
            account: "111111111111".to_string(),
            zone: None,
            message: "denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Discovery failed for account 111111111111: denied"
        );
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(BackupError::config("bad").severity(), ErrorSeverity::Critical);
        assert_eq!(
            BackupError::ZoneFileError {
                zone: "example.com.".to_string(),
                message: "no SOA".to_string(),
            }
            .severity(),
            ErrorSeverity::High
        );
        assert_eq!(BackupError::Cancelled.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_cancelled_run_exits_non_zero() {
        assert_eq!(BackupError::Cancelled.severity().exit_code(), 130);
        assert_eq!(BackupError::config("bad").severity().exit_code(), 3);
    }
}
