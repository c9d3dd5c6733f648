// src/pipeline/extract.rs

//! Archive lookup for the read-side commands.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::FullArticle;
use crate::storage::ArchiveStore;
use crate::utils::parse_source_url;

/// Resolve a user argument to an archive file.
///
/// Accepts an existing path, a bare archive name inside the archive
/// directory, or the canonical link of an archived article.
pub fn locate_archive(store: &ArchiveStore, input: &str) -> Result<PathBuf> {
    let direct = Path::new(input);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let in_store = store.root().join(input);
    if in_store.is_file() {
        return Ok(in_store);
    }

    if input.contains("://") && parse_source_url(input).is_some() {
        let by_link = store.path_for(input);
        if by_link.is_file() {
            return Ok(by_link);
        }
    }

    Err(AppError::reading(input, "no such archive"))
}

/// Load an archived article by path, name or link.
pub async fn retrieve_article(store: &ArchiveStore, input: &str) -> Result<FullArticle> {
    let path = locate_archive(store, input)?;
    store.retrieve(&path).await
}

/// Unpack an archived article by path, name or link.
pub async fn extract_article(
    store: &ArchiveStore,
    input: &str,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let path = locate_archive(store, input)?;
    let parts = store.extract(&path, out_dir).await?;
    log::info!(
        "Extracted {} into {} and {}",
        path.display(),
        parts.0.display(),
        parts.1.display()
    );
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_item;
    use tempfile::TempDir;

    async fn archived_store() -> (TempDir, ArchiveStore, FullArticle, PathBuf) {
        let dir = TempDir::new().unwrap();
        let store = ArchiveStore::new(dir.path().join("archives"));
        let article = FullArticle::from_item(&make_item("news", 1), "H", "B", "<p>M</p>", "English");
        let path = store.archive(&article).await.unwrap().path;
        (dir, store, article, path)
    }

    #[tokio::test]
    async fn test_retrieve_by_link_name_and_path() {
        let (_dir, store, article, path) = archived_store().await;
        let name = path.file_name().unwrap().to_str().unwrap().to_string();

        for input in [article.link().to_string(), name, path.display().to_string()] {
            let restored = retrieve_article(&store, &input).await.unwrap();
            assert_eq!(restored.header, "H");
        }
    }

    #[tokio::test]
    async fn test_extract_by_link() {
        let (dir, store, article, _) = archived_store().await;
        let out = dir.path().join("out");

        let (html, json) = extract_article(&store, article.link(), &out).await.unwrap();
        assert!(html.is_file());
        assert!(json.is_file());
    }

    #[tokio::test]
    async fn test_unknown_archive() {
        let (_dir, store, _, _) = archived_store().await;
        let err = locate_archive(&store, "https://mock.test/news/999").unwrap_err();
        assert!(matches!(err, AppError::Reading { .. }));
    }
}
