use crate::core::gate::cancellable;
use crate::core::persist::Artifact;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Datelike, Utc};
use std::io::Write;
use tokio_util::sync::CancellationToken;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const DEFAULT_ARCHIVE_NAME: &str = "zones.zip";
pub const LATEST_ARCHIVE_PATH: &str = "archives/latest.zip";

/// Key of the dated copy, e.g. `archives/2024/3/7/1709812345-zones.zip`.
pub fn dated_archive_path(run_at: DateTime<Utc>, name: &str) -> String {
    format!(
        "archives/{}/{}/{}/{}-{}",
        run_at.year(),
        run_at.month(),
        run_at.day(),
        run_at.timestamp(),
        name
    )
}

/// Bundles artifacts into a zip. Entries are sorted and carry a fixed
/// timestamp so identical artifacts yield identical bytes.
pub fn bundle(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut sorted: Vec<&Artifact> = artifacts.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let options =
        SimpleFileOptions::default().last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for artifact in sorted {
        zip.start_file(artifact.path.as_str(), options)?;
        zip.write_all(&artifact.contents)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Writes the run archive as `latest` and under its dated key.
pub async fn store_archive<S: Storage>(
    storage: &S,
    artifacts: &[Artifact],
    name: &str,
    run_at: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    let archive = bundle(artifacts)?;
    let dated = dated_archive_path(run_at, name);

    tracing::debug!(
        entries = artifacts.len(),
        bytes = archive.len(),
        "Writing run archive"
    );
    cancellable(cancel, storage.put(LATEST_ARCHIVE_PATH, &archive)).await?;
    cancellable(cancel, storage.put(&dated, &archive)).await?;

    tracing::info!(latest = LATEST_ARCHIVE_PATH, dated = %dated, "Run archive stored");
    Ok(vec![LATEST_ARCHIVE_PATH.to_string(), dated])
}
