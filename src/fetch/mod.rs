// src/fetch/mod.rs
pub mod client;

use crate::config::Source;
use crate::utils::error::FetchError;

/// Reads the raw document behind `source`: downloaded for URLs, read from disk for paths.
pub async fn load_source(source: &Source) -> Result<String, FetchError> {
    match source {
        Source::Url(url) => client::download_document(url).await,
        Source::Path(path) => {
            tracing::info!("Reading document from: {}", path.display());
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Read {
                    path: path.display().to_string(),
                    source,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_path_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html><body>saved page</body></html>").unwrap();

        let content = tokio_test::block_on(load_source(&Source::Path(path))).unwrap();
        assert!(content.contains("saved page"));
    }

    #[test]
    fn test_missing_path_source() {
        let source = Source::Path(PathBuf::from("/definitely/not/here.html"));
        let err = tokio_test::block_on(load_source(&source)).unwrap_err();
        assert!(matches!(err, FetchError::Read { .. }));
    }
}
