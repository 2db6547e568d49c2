// =============================================================================
// dummy.rs — A BANK THAT DOESN'T EXIST
// =============================================================================
//
// Emits a handful of synthetic list-rate records on a fixed cadence without
// touching the network. Useful for checking the sink, the orchestrator and a
// store end to end when no bank should be bothered.
// =============================================================================

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, warn};

use crate::crawlers::{RecordSink, SiteCrawler};
use crate::models::{Bank, InterestRateRecord, RateType, Term};

pub const DUMMY_BANK_NAME: &str = "Dummy Bank";

pub struct DummyCrawler {
    records: usize,
    interval: Duration,
}

impl DummyCrawler {
    pub fn new(records: usize, interval: Duration) -> Self {
        Self { records, interval }
    }

    fn synthetic_record(&self, index: usize, sink: &RecordSink) -> InterestRateRecord {
        let crawled_at = sink.crawled_at();
        // 3.00, 3.25, 3.50, ... percent, cycling through the terms.
        let rate = Decimal::new(300 + 25 * index as i64, 2);
        InterestRateRecord {
            bank: Bank::new(DUMMY_BANK_NAME),
            nominal_rate: rate,
            effective_rate: rate,
            term: Term::ALL[index % Term::ALL.len()],
            rate_type: RateType::List,
            discount_boundary: None,
            union_discount: false,
            changed_on: crawled_at.date_naive(),
            last_crawled_at: crawled_at,
        }
    }
}

#[async_trait]
impl SiteCrawler for DummyCrawler {
    fn name(&self) -> &str {
        DUMMY_BANK_NAME
    }

    async fn produce(&self, sink: RecordSink) {
        for index in 0..self.records {
            if index > 0 {
                tokio::time::sleep(self.interval).await;
            }
            info!(record = index + 1, of = self.records, "dummy crawler crawling");
            if let Err(e) = sink.deliver(self.synthetic_record(index, &sink)).await {
                warn!(error = %e, "dummy crawler: sink closed");
                return;
            }
        }
    }
}
