// =============================================================================
// crawlers/mod.rs — ONE BANK, ONE CRAWLER
// =============================================================================
//
// Every bank publishes its rates on its own page with its own markup. Each
// gets a SiteCrawler that knows the URL and the table layout, fetches the page,
// runs the extractor and pushes records into the shared sink.
//
// A crawler never fails outward. If the page won't load or no longer looks
// like we expect, it logs why and returns; the other crawlers carry on.
// =============================================================================

pub mod danske_bank;
pub mod dummy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::CrawlError;
use crate::models::InterestRateRecord;

/// Something that produces rate records from a live source.
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch, extract and deliver records to `sink`, in extraction order.
    /// Errors are logged here and never returned.
    async fn produce(&self, sink: RecordSink);
}

/// The producer end of a crawl run's delivery channel.
///
/// Carries the run's crawl timestamp so every record of the run is stamped
/// with the same instant, whichever crawler built it.
#[derive(Debug, Clone)]
pub struct RecordSink {
    tx: mpsc::Sender<InterestRateRecord>,
    crawled_at: DateTime<Utc>,
}

impl RecordSink {
    pub fn new(tx: mpsc::Sender<InterestRateRecord>, crawled_at: DateTime<Utc>) -> Self {
        Self { tx, crawled_at }
    }

    pub fn crawled_at(&self) -> DateTime<Utc> {
        self.crawled_at
    }

    /// Hand one record to the consumer. Waits while the consumer is busy.
    pub async fn deliver(&self, record: InterestRateRecord) -> Result<(), CrawlError> {
        self.tx.send(record).await.map_err(|_| CrawlError::SinkClosed)
    }
}
