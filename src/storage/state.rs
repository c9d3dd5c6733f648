//! Last-run timestamp persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Single-timestamp state file driving the incremental window.
#[derive(Debug, Clone)]
pub struct RunState {
    path: PathBuf,
}

impl RunState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last run time. A missing file means "never ran" (Unix epoch).
    pub async fn load_last_run(&self) -> Result<DateTime<Utc>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "no last-run file at {}, starting from the epoch",
                    self.path.display()
                );
                return Ok(DateTime::<Utc>::UNIX_EPOCH);
            }
            Err(e) => return Err(AppError::reading(self.path.display(), e)),
        };

        parse_timestamp(text.trim()).ok_or_else(|| {
            AppError::reading(
                self.path.display(),
                format!("invalid timestamp '{}'", text.trim()),
            )
        })
    }

    /// Overwrite the last run time (write to temp, then rename).
    pub async fn save_last_run(&self, at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(at.to_rfc3339().as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
