// src/fetch/client.rs
use crate::utils::error::FetchError;
use reqwest::{header, StatusCode};

// Archived Wikipedia pages reject requests without a descriptive User-Agent
const USER_AGENT: &str = concat!("table_etl/", env!("CARGO_PKG_VERSION"), " (tabular ETL jobs)");

/// Creates a reqwest client configured for page downloads.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT) // Set the required User-Agent
        .build()
}

/// Downloads a page and returns its body as text. Non-2xx responses are errors.
pub async fn download_document(url: &str) -> Result<String, FetchError> {
    let client = build_client()?; // Propagate client build error if any

    tracing::info!("Downloading document from: {}", url);
    tracing::debug!("Using User-Agent: {}", USER_AGENT);

    let response = client.get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
        .send()
        .await?; // Propagates reqwest::Error as FetchError::Network

    check_status(response.status(), url)?;

    let body = response.text().await?;
    tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);

    Ok(body)
}

/// Maps a non-2xx status to an error: 404 is `NotFound`, anything else `Http`.
fn check_status(status: StatusCode, url: &str) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(url.to_string()));
    }
    Err(FetchError::Http(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("table_etl/"));
    }

    #[test]
    fn test_status_mapping() {
        let url = "https://example.com/page";
        assert!(check_status(StatusCode::OK, url).is_ok());
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, url),
            Err(FetchError::NotFound(u)) if u == url
        ));
        assert!(matches!(
            check_status(StatusCode::SERVICE_UNAVAILABLE, url),
            Err(FetchError::Http(s)) if s == StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(matches!(
            check_status(StatusCode::MOVED_PERMANENTLY, url),
            Err(FetchError::Http(_))
        ));
    }
}
