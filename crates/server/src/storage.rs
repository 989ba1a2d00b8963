//! Report storage.
//!
//! Persisted reports are written to
//! `<root>/<prefix>/<name>_<unix millis>.<ext>`. When a public base URL is
//! configured the returned reference is that URL joined with the relative
//! path; otherwise it is the file path.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;
use crate::render::RenderedDocument;

/// Errors raised while persisting a report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The public URL could not be built.
    #[error("invalid public URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Where a persisted report can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredReference {
    /// Publicly reachable URL.
    Url(Url),
    /// Local file path.
    Path(PathBuf),
}

impl StoredReference {
    /// The public URL, if the reference is one.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            Self::Path(_) => None,
        }
    }
}

impl fmt::Display for StoredReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Somewhere rendered reports can be persisted.
pub trait StorageSink: Send + Sync {
    /// Persist `document`. `name` is a file-name stem such as
    /// `production_2025-06-01_to_2025-06-30`.
    fn persist(
        &self,
        document: &RenderedDocument,
        name: &str,
    ) -> impl Future<Output = Result<StoredReference, StorageError>> + Send;
}

/// Filesystem-backed storage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    prefix: String,
    public_base_url: Option<Url>,
}

impl LocalStorage {
    /// Create storage writing under `root/prefix`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            public_base_url: None,
        }
    }

    /// Return public URLs under `base` instead of file paths.
    #[must_use]
    pub fn with_public_base_url(mut self, base: Url) -> Self {
        self.public_base_url = Some(base);
        self
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_path(&self, name: &str, extension: &str) -> String {
        let file = format!(
            "{}_{}.{extension}",
            sanitize(name),
            Utc::now().timestamp_millis()
        );
        if self.prefix.is_empty() {
            file
        } else {
            format!("{}/{file}", self.prefix)
        }
    }
}

impl From<&StorageConfig> for LocalStorage {
    fn from(config: &StorageConfig) -> Self {
        let storage = Self::new(config.root.clone(), config.prefix.clone());
        match &config.public_base_url {
            Some(base) => storage.with_public_base_url(base.clone()),
            None => storage,
        }
    }
}

impl StorageSink for LocalStorage {
    async fn persist(
        &self,
        document: &RenderedDocument,
        name: &str,
    ) -> Result<StoredReference, StorageError> {
        let relative = self.relative_path(name, document.extension);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &document.bytes).await?;

        tracing::info!(path = %path.display(), bytes = document.bytes.len(), "Report stored");

        match &self.public_base_url {
            Some(base) => Ok(StoredReference::Url(base.join(&relative)?)),
            None => Ok(StoredReference::Path(path)),
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
