//! Error taxonomy for the scrape pipeline.
//!
//! Transport and parse problems are typed so callers can decide whether to
//! retry, skip the item, or abort the run.

use thiserror::Error;

/// Errors produced while fetching or parsing portal pages.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network-level failure (DNS, connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The portal answered with a non-success status code.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The portal answered 200 but the body is empty or not an HTML document.
    /// The portal does this sporadically under load.
    #[error("{url} returned an empty or non-HTML page")]
    EmptyPage { url: String },

    /// An expected fragment was missing from an otherwise valid page.
    #[error("parse failure: {0}")]
    Parse(String),
}

impl ScrapeError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Client errors (4xx) and parse failures are permanent for a given URL;
    /// everything else is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Transport { .. } => true,
            ScrapeError::Status { status, .. } => *status >= 500,
            ScrapeError::EmptyPage { .. } => true,
            ScrapeError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryability() {
        let server_err = ScrapeError::Status {
            url: "http://example.invalid".into(),
            status: 503,
        };
        assert!(server_err.is_retryable());

        let not_found = ScrapeError::Status {
            url: "http://example.invalid".into(),
            status: 404,
        };
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_parse_not_retryable() {
        assert!(!ScrapeError::Parse("no table".into()).is_retryable());
    }

    #[test]
    fn test_empty_page_retryable() {
        let err = ScrapeError::EmptyPage {
            url: "http://example.invalid".into(),
        };
        assert!(err.is_retryable());
    }
}
