//! Static files for the admin console.

use std::path::{Path, PathBuf};

use crate::http::codec::{Response, CONTENT_TYPE_HTML, CONTENT_TYPE_ICON};
use crate::types::Result;

pub const INDEX_FILE: &str = "webserver.html";
pub const FAVICON_FILE: &str = "favicon.ico";

/// Serves the console page and icon from a web root.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    web_root: PathBuf,
}

impl StaticAssets {
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// `GET /`
    pub async fn index(&self) -> Result<Response> {
        self.serve(INDEX_FILE, CONTENT_TYPE_HTML).await
    }

    /// `GET /favicon.ico`
    pub async fn favicon(&self) -> Result<Response> {
        self.serve(FAVICON_FILE, CONTENT_TYPE_ICON).await
    }

    async fn serve(&self, name: &str, content_type: &'static str) -> Result<Response> {
        let path = self.web_root.join(name);
        let body = tokio::fs::read(&path).await.map_err(|e| {
            tracing::warn!("Cannot read {}: {}", path.display(), e);
            e
        })?;
        Ok(Response::new(content_type, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;

    #[tokio::test]
    async fn test_serves_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "<html></html>").unwrap();
        std::fs::write(dir.path().join(FAVICON_FILE), [0u8, 0, 1, 0]).unwrap();
        let assets = StaticAssets::new(dir.path());

        let index = assets.index().await.unwrap();
        assert_eq!(index.content_type, CONTENT_TYPE_HTML);
        assert_eq!(index.body, b"<html></html>".to_vec());

        let icon = assets.favicon().await.unwrap();
        assert_eq!(icon.content_type, CONTENT_TYPE_ICON);
        assert_eq!(icon.body, vec![0, 0, 1, 0]);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let assets = StaticAssets::new(dir.path());
        assert!(matches!(assets.index().await, Err(Error::Io(_))));
    }
}
