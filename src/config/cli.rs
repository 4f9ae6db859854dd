use crate::config::toml_config::{parse_account_list, BackupConfig, StorageConfig};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "dns-backup")]
#[command(about = "Back up Route 53 hosted zones across AWS accounts")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "dns-backup.toml")]
    pub config: String,

    /// Comma-separated account ids, replacing the configured list
    #[arg(long)]
    pub accounts: Option<String>,

    /// Write to this local directory instead of the configured storage
    #[arg(long)]
    pub output: Option<String>,

    /// Keep running, starting a backup every N seconds
    #[arg(long)]
    pub interval_secs: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut BackupConfig) {
        if let Some(accounts) = &self.accounts {
            config.job.accounts = parse_account_list(accounts);
            tracing::info!(accounts = config.job.accounts.len(), "🔧 Account list overridden");
        }
        if let Some(path) = &self.output {
            config.storage = StorageConfig::Local { path: path.clone() };
            tracing::info!(path = %path, "🔧 Writing to local directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_accounts_and_storage() {
        let mut config = BackupConfig::from_toml_str(
            r#"
[job]
accounts = ["111111111111"]
assume_role = "reader"

[storage]
kind = "s3"
bucket = "dns-backups"
"#,
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "dns-backup",
            "--accounts",
            "222222222222,333333333333",
            "--output",
            "./out",
        ]);
        cli.apply_overrides(&mut config);

        assert_eq!(config.job.accounts, vec!["222222222222", "333333333333"]);
        assert_eq!(
            config.storage,
            StorageConfig::Local {
                path: "./out".to_string()
            }
        );
    }

    #[test]
    fn test_defaults() {
        let cli = CliConfig::parse_from(["dns-backup"]);
        assert_eq!(cli.config, "dns-backup.toml");
        assert_eq!(cli.interval_secs, None);
        assert!(!cli.verbose);
    }
}
