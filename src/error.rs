// =============================================================================
// error.rs — HOW A CRAWL GOES WRONG
// =============================================================================
//
// Two families. CrawlError covers everything between "send the GET" and "hand
// the record to the sink". StoreError covers the write. Neither ever escapes
// the orchestrator: they end up as log lines.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Network or transport failure while fetching the page.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a page.
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The markup no longer has the shape the parser expects. Not transient:
    /// the parser needs updating.
    #[error("page structure changed: {0}")]
    Structural(String),

    /// A cell could not be decoded as a locale-formatted number.
    #[error("failed to parse {what} from '{text}': {reason}")]
    Parse {
        what: &'static str,
        text: String,
        reason: String,
    },

    /// A record was built that breaks a model invariant.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The consumer side of the delivery channel is gone.
    #[error("record sink closed")]
    SinkClosed,
}

impl CrawlError {
    pub fn structural(message: impl Into<String>) -> Self {
        CrawlError::Structural(message.into())
    }

    pub fn parse(what: &'static str, text: &str, reason: impl Into<String>) -> Self {
        CrawlError::Parse {
            what,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis write failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backend refused the record.
    #[error("store rejected record {key}: {reason}")]
    Rejected { key: String, reason: String },
}
