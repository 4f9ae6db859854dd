use clap::Parser;
use dns_backup::utils::{logger, validation::Validate};
use dns_backup::{build_aws_engine, run_on_interval, AwsBackupEngine, BackupConfig, BackupError, CliConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting dns-backup CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let engine = match prepare(&cli).await {
        Ok(engine) => engine,
        Err(e) => exit_with(&e),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping");
                cancel.cancel();
            }
        });
    }

    match cli.interval_secs {
        Some(secs) => {
            tracing::info!(interval_secs = secs, "⏱️ Running on a schedule");
            run_on_interval(&engine, Duration::from_secs(secs.max(1)), cancel).await;
        }
        None => match engine.run(&cancel).await {
            Ok(summary) => {
                tracing::info!(
                    accounts = summary.accounts,
                    zones = summary.zones,
                    records = summary.records,
                    "✅ Backup completed"
                );
                println!(
                    "✅ Backed up {} zones ({} records) from {} accounts",
                    summary.zones, summary.records, summary.accounts
                );
                for path in &summary.artifacts {
                    println!("📁 {}", path);
                }
            }
            Err(e) => exit_with(&e),
        },
    }

    Ok(())
}

async fn prepare(cli: &CliConfig) -> dns_backup::Result<AwsBackupEngine> {
    let mut config = BackupConfig::from_file(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    build_aws_engine(config).await
}

fn exit_with(e: &BackupError) -> ! {
    tracing::error!(error = %e, severity = ?e.severity(), "❌ Backup failed");
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code())
}
