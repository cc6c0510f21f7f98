// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

/// Page could not be retrieved. A page that loads but lacks a selector is not an error.
///
/// Causes are reachable through `source()` and are not repeated in the message.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read body of {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of a crawl. Only `WatermarkUnavailable` ends a run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error("could not parse {what} of {url}: {reason}")]
    Parse {
        url: String,
        what: &'static str,
        reason: String,
    },
    #[error("failed to store {url}")]
    Persistence {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cannot determine the last processed listing date")]
    WatermarkUnavailable(#[source] anyhow::Error),
}

impl CrawlError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::WatermarkUnavailable(_))
    }
}

/// Message and causes on one line, for log fields.
pub fn chain<E>(err: E) -> String
where
    E: std::error::Error + Send + Sync + 'static,
{
    format!("{:#}", anyhow::Error::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn persistence_cause_is_rendered_once() {
        let err = CrawlError::Persistence {
            url: "https://e.test/1".into(),
            source: anyhow!("UNIQUE constraint failed: job_listings.source_url"),
        };

        let line = chain(err);
        assert_eq!(
            line,
            "failed to store https://e.test/1: UNIQUE constraint failed: job_listings.source_url"
        );
        assert_eq!(line.matches("UNIQUE constraint failed").count(), 1);
    }

    #[test]
    fn watermark_cause_is_rendered_once() {
        let err = anyhow::Error::new(CrawlError::WatermarkUnavailable(anyhow!(
            "unable to open database file"
        )));

        let rendered = format!("{err:#}");
        assert!(rendered.starts_with("cannot determine the last processed listing date"));
        assert_eq!(rendered.matches("unable to open database file").count(), 1);
        assert!(CrawlError::WatermarkUnavailable(anyhow!("x")).is_fatal());
    }

    #[test]
    fn transport_errors_pass_their_message_through() {
        let err = CrawlError::from(FetchError::Status {
            url: "https://e.test/2".into(),
            status: StatusCode::NOT_FOUND,
        });
        assert!(!err.is_fatal());
        assert_eq!(chain(err), "https://e.test/2 answered with HTTP 404 Not Found");
    }
}
