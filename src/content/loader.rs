//! Content loader - reads post sources from the source directory

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::ReadError;
use crate::Site;

/// Raw text of one source document
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the source directory
    pub source: PathBuf,
    /// File contents, or why they could not be read
    pub text: Result<String, ReadError>,
}

impl SourceDocument {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: Ok(text.into()),
        }
    }
}

/// Loads documents from the source directory
pub struct ContentLoader<'a> {
    site: &'a Site,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Load every markdown document, sorted by relative path.
    ///
    /// A file that cannot be read or decoded is still returned, carrying its
    /// error; only failing to walk the source root itself is fatal.
    pub fn load_documents(&self) -> Result<Vec<SourceDocument>> {
        let source_dir = &self.site.source_dir;
        if !source_dir.exists() {
            tracing::warn!("Source directory {:?} does not exist", source_dir);
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path(), source_dir))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(e).with_context(|| format!("Failed to walk {:?}", source_dir));
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !is_markdown_file(path) {
                continue;
            }

            let text = fs::read(path)
                .map_err(ReadError::from)
                .and_then(ReadError::decode);
            if let Err(e) = &text {
                tracing::warn!("Failed to read {:?}: {}", path, e);
            }
            let source = path.strip_prefix(source_dir).unwrap_or(path).to_path_buf();
            documents.push(SourceDocument { source, text });
        }

        documents.sort_by(|a, b| a.source.cmp(&b.source));
        tracing::debug!("Loaded {} documents from {:?}", documents.len(), source_dir);

        Ok(documents)
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

/// Dot-files and dot-directories below the source root are ignored
fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .map(|relative| {
            relative.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_documents_in_source_order() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("_posts");
        fs::create_dir_all(posts.join("2021")).unwrap();
        fs::create_dir_all(posts.join(".drafts")).unwrap();
        fs::write(posts.join("b.md"), "b").unwrap();
        fs::write(posts.join("2021/a.markdown"), "a").unwrap();
        fs::write(posts.join("notes.txt"), "skip").unwrap();
        fs::write(posts.join(".drafts/hidden.md"), "skip").unwrap();

        let site = Site::new(dir.path()).unwrap();
        let docs = ContentLoader::new(&site).load_documents().unwrap();

        let sources: Vec<_> = docs.iter().map(|d| d.source.clone()).collect();
        assert_eq!(
            sources,
            vec![PathBuf::from("2021/a.markdown"), PathBuf::from("b.md")]
        );
        assert_eq!(docs[1].text.as_deref(), Ok("b"));
    }

    #[test]
    fn test_undecodable_file_is_returned_with_its_error() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("good.md"), "---\ntitle: Good\n---\n").unwrap();
        fs::write(posts.join("latin1.md"), b"---\ntitle: Caf\xe9\n---\n").unwrap();

        let site = Site::new(dir.path()).unwrap();
        let docs = ContentLoader::new(&site).load_documents().unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].text.is_ok());
        assert_eq!(docs[1].source, PathBuf::from("latin1.md"));
        assert_eq!(
            docs[1].text,
            Err(ReadError::InvalidUtf8 { valid_up_to: 14 })
        );
    }

    #[test]
    fn test_missing_source_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(ContentLoader::new(&site).load_documents().unwrap().is_empty());
    }
}
