//! Content-addressed article archives.
//!
//! Each article lands in `<sha256(link)>.zip` with two deflated entries:
//! the raw page markup and a JSON projection of the parsed article. Files
//! are written to a temporary file in the archive directory and linked into
//! place without overwriting, so concurrent writers of the same link leave
//! exactly one complete archive behind.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{AppError, Result};
use crate::models::FullArticle;
use crate::utils::content_address;

const HTML_ENTRY: &str = "article.html";
const JSON_ENTRY: &str = "article.json";
const EXTENSION: &str = "zip";

/// Outcome of an archive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archived {
    pub path: PathBuf,
    /// `false` when an archive for the link already existed
    pub written: bool,
}

/// Archive directory keyed by content address.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic archive path for a canonical link.
    pub fn path_for(&self, link: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", content_address(link), EXTENSION))
    }

    /// Write the article's archive unless one already exists.
    pub async fn archive(&self, article: &FullArticle) -> Result<Archived> {
        let path = self.path_for(article.link());

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            log::debug!("archive {} already exists", path.display());
            return Ok(Archived {
                path,
                written: false,
            });
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::saving(self.root.display(), e))?;

        let json = serde_json::to_vec_pretty(article)
            .map_err(|e| AppError::saving(path.display(), e))?;
        let html = article.raw_markup.clone().into_bytes();

        let dir = self.root.clone();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_container(&dir, &target, &html, &json))
            .await
            .map_err(|e| AppError::saving(path.display(), e))??;

        if !written {
            log::debug!("archive {} was written concurrently", path.display());
        }
        Ok(Archived { path, written })
    }

    /// Read an archived article back, markup included.
    pub async fn retrieve(&self, path: impl AsRef<Path>) -> Result<FullArticle> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();

        let (html, json) = tokio::task::spawn_blocking(move || read_parts(&path))
            .await
            .map_err(|e| AppError::reading(&display, e))??;

        let mut article: FullArticle =
            serde_json::from_str(&json).map_err(|e| AppError::reading(&display, e))?;
        article.raw_markup = html;
        Ok(article)
    }

    /// Unpack both parts of an archive into `out_dir`.
    ///
    /// Files are named `<stem>_article.html` and `<stem>_article.json`.
    pub async fn extract(
        &self,
        path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Result<(PathBuf, PathBuf)> {
        let path = path.as_ref().to_path_buf();
        let out_dir = out_dir.as_ref().to_path_buf();
        let display = path.display().to_string();

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::reading(&display, "archive path has no file name"))?
            .to_string();

        let (html, json) = tokio::task::spawn_blocking(move || read_parts(&path))
            .await
            .map_err(|e| AppError::reading(&display, e))??;

        tokio::fs::create_dir_all(&out_dir).await?;
        let html_path = out_dir.join(format!("{stem}_{HTML_ENTRY}"));
        let json_path = out_dir.join(format!("{stem}_{JSON_ENTRY}"));
        tokio::fs::write(&html_path, html).await?;
        tokio::fs::write(&json_path, json).await?;

        Ok((html_path, json_path))
    }
}

/// Build the zip in a temp file next to `target`, then link it into place.
///
/// Returns `Ok(false)` if `target` appeared in the meantime.
fn write_container(dir: &Path, target: &Path, html: &[u8], json: &[u8]) -> Result<bool> {
    let saving = |e: &dyn std::fmt::Display| AppError::saving(target.display(), e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| saving(&e))?;
    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(HTML_ENTRY, options).map_err(|e| saving(&e))?;
        zip.write_all(html).map_err(|e| saving(&e))?;
        zip.start_file(JSON_ENTRY, options).map_err(|e| saving(&e))?;
        zip.write_all(json).map_err(|e| saving(&e))?;
        zip.finish().map_err(|e| saving(&e))?;
    }
    tmp.as_file().sync_all().map_err(|e| saving(&e))?;

    match tmp.persist_noclobber(target) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(saving(&e.error)),
    }
}

/// Read `(html, json)` from an archive.
fn read_parts(path: &Path) -> Result<(String, String)> {
    let reading = |e: &dyn std::fmt::Display| AppError::reading(path.display(), e);

    let file = File::open(path).map_err(|e| reading(&e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| reading(&e))?;

    let mut read_entry = |name: &str| -> Result<String> {
        let mut entry = zip.by_name(name).map_err(|e| reading(&e))?;
        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(|e| reading(&e))?;
        Ok(text)
    };

    let html = read_entry(HTML_ENTRY)?;
    let json = read_entry(JSON_ENTRY)?;
    Ok((html, json))
}
