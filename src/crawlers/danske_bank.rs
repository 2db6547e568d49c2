// =============================================================================
// danske_bank.rs — DANSKE BANK'S CURRENT MORTGAGE RATES
// =============================================================================
//
// Danske Bank publishes its rates as two HTML tables on one page: the regular
// loan-to-value discounted rates, and the same grid for union members. Both
// tables start with a header cell reading "Belåningsgrad" in bold, followed by
// four loan-to-value bands. Every other row is a term.
//
// Real page:
//   https://danskebank.se/privat/produkter/bolan/relaterat/aktuella-bolanerantor
//
// If they redesign the page this is where it breaks, and it should break
// loudly: wrong anchor count, unknown label, ragged row. All of those log a
// structural error and the crawler emits nothing for the affected table.
// =============================================================================

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::crawlers::{RecordSink, SiteCrawler};
use crate::error::CrawlError;
use crate::extract::labels::{DANSKE_BANK_BOUNDARY_LABELS, SWEDISH_TERM_LABELS};
use crate::extract::rates::RateCellFormat;
use crate::extract::{self, ExtractContext, TableLayout, TableRole};
use crate::models::Bank;

pub const DANSKE_BANK_URL: &str =
    "https://danskebank.se/privat/produkter/bolan/relaterat/aktuella-bolanerantor";

pub const DANSKE_BANK_NAME: &str = "Danske Bank";

/// Regular table first, union-discounted table second. The page prints one
/// figure per cell, sometimes followed by a footnote marker.
pub const DANSKE_BANK_LAYOUT: TableLayout = TableLayout {
    anchor_selector: "table tbody tr td b",
    ratio_phrase: "Belåningsgrad",
    tables: &[TableRole::Standard, TableRole::UnionDiscounted],
    term_labels: SWEDISH_TERM_LABELS,
    boundary_labels: DANSKE_BANK_BOUNDARY_LABELS,
    cell_format: RateCellFormat::NominalOnly,
};

pub struct DanskeBankCrawler {
    client: reqwest::Client,
    url: Url,
    bank: Bank,
    layout: TableLayout,
}

impl DanskeBankCrawler {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self {
            client,
            url,
            bank: Bank::new(DANSKE_BANK_NAME),
            layout: DANSKE_BANK_LAYOUT,
        }
    }

    /// Build from configuration: URL override, user agent, optional timeout.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let url = Url::parse(&config.danske_bank_url)?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        info!(
            url = url.as_str(),
            timeout = ?config.http_timeout,
            "Danske Bank crawler configured"
        );
        Ok(Self::new(client, url))
    }

    async fn fetch(&self) -> Result<String, CrawlError> {
        let url = self.url.as_str();
        debug!(url, "fetching Danske Bank rate page");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|source| CrawlError::Fetch {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response.text().await.map_err(|source| CrawlError::Fetch {
            url: url.to_string(),
            source,
        })
    }

    /// Extract a fetched page and deliver what survives. Tables that fail
    /// structurally are logged and skipped; healthy ones are still delivered.
    /// Returns how many records the sink accepted.
    pub(crate) async fn deliver_page(&self, html: &str, sink: &RecordSink) -> usize {
        let crawled_at = sink.crawled_at();
        let ctx = ExtractContext {
            bank: self.bank.clone(),
            // TODO: read the change date from the list-rate table once that
            // table is parsed; until then the crawl date stands in for it.
            changed_on: crawled_at.date_naive(),
            crawled_at,
        };

        let tables = match extract::extract_tables(html, &self.layout, &ctx) {
            Ok(tables) => tables,
            Err(e) => {
                error!(error = %e, "Danske Bank: could not locate rate tables, fix parser?");
                return 0;
            }
        };

        let mut delivered = 0usize;
        for table in tables {
            let records = match table.outcome {
                Ok(records) => records,
                Err(e) => {
                    error!(
                        error = %e,
                        table = ?table.role,
                        "Danske Bank: failed to parse rate table"
                    );
                    continue;
                }
            };
            debug!(table = ?table.role, rows = records.len(), "parsed rate table");

            for record in records {
                if let Err(e) = sink.deliver(record).await {
                    warn!(error = %e, delivered, "Danske Bank: sink closed mid-crawl");
                    return delivered;
                }
                delivered += 1;
            }
        }

        info!(delivered, "Danske Bank: rate records delivered");
        delivered
    }
}

#[async_trait]
impl SiteCrawler for DanskeBankCrawler {
    fn name(&self) -> &str {
        DANSKE_BANK_NAME
    }

    async fn produce(&self, sink: RecordSink) {
        let html = match self.fetch().await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "Danske Bank: failed reading rate page");
                return;
            }
        };
        self.deliver_page(&html, &sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{page, rate_rows, table, HEADER};
    use crate::models::{InterestRateRecord, RateType};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn crawler(url: &str) -> DanskeBankCrawler {
        DanskeBankCrawler::new(reqwest::Client::new(), Url::parse(url).unwrap())
    }

    async fn drain(mut rx: mpsc::Receiver<InterestRateRecord>) -> Vec<InterestRateRecord> {
        let mut out = Vec::new();
        while let Some(r) = rx.recv().await {
            out.push(r);
        }
        out
    }

    fn sink() -> (RecordSink, mpsc::Receiver<InterestRateRecord>) {
        let (tx, rx) = mpsc::channel(64);
        let crawled_at = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        (RecordSink::new(tx, crawled_at), rx)
    }

    #[tokio::test]
    async fn test_delivers_both_tables_in_order() {
        let html = page(&[
            table(&HEADER, &rate_rows(&["3 mån", "1 år", "3 år"])),
            table(&HEADER, &rate_rows(&["3 mån", "1 år", "3 år"])),
        ]);
        let (sink, rx) = sink();
        let crawled_at = sink.crawled_at();

        let delivered = crawler(DANSKE_BANK_URL).deliver_page(&html, &sink).await;
        drop(sink);
        let records = drain(rx).await;

        assert_eq!(delivered, 24);
        assert_eq!(records.len(), 24);
        assert!(records[..12].iter().all(|r| !r.union_discount));
        assert!(records[12..].iter().all(|r| r.union_discount));
        for r in &records {
            assert_eq!(r.bank.as_str(), DANSKE_BANK_NAME);
            assert_eq!(r.rate_type, RateType::RatioDiscounted);
            assert_eq!(r.last_crawled_at, crawled_at);
            assert_eq!(r.changed_on, crawled_at.date_naive());
        }
    }

    #[tokio::test]
    async fn test_single_table_page_emits_nothing() {
        let html = page(&[table(&HEADER, &rate_rows(&["3 mån", "1 år"]))]);
        let (sink, rx) = sink();

        crawler(DANSKE_BANK_URL).deliver_page(&html, &sink).await;
        drop(sink);

        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_broken_table_is_skipped_healthy_one_delivered() {
        let html = page(&[
            table(&HEADER, &rate_rows(&["3 mån", "fast ränta"])),
            table(&HEADER, &rate_rows(&["2 år"])),
        ]);
        let (sink, rx) = sink();

        crawler(DANSKE_BANK_URL).deliver_page(&html, &sink).await;
        drop(sink);
        let records = drain(rx).await;

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.union_discount));
    }

    #[tokio::test]
    async fn test_closed_sink_stops_delivery() {
        let html = page(&[
            table(&HEADER, &rate_rows(&["3 mån"])),
            table(&HEADER, &rate_rows(&["3 mån"])),
        ]);
        let (sink, rx) = sink();
        drop(rx);

        let delivered = crawler(DANSKE_BANK_URL).deliver_page(&html, &sink).await;

        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_sink_closed_mid_page_stops_at_that_record() {
        let html = page(&[
            table(&HEADER, &rate_rows(&["3 mån", "1 år"])),
            table(&HEADER, &rate_rows(&["3 mån", "1 år"])),
        ]);
        let (tx, mut rx) = mpsc::channel(1);
        let sink = RecordSink::new(tx, Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap());
        let reader = tokio::spawn(async move {
            for _ in 0..3 {
                rx.recv().await.unwrap();
            }
        });

        let crawler = crawler(DANSKE_BANK_URL);
        let (delivered, reader) = tokio::join!(crawler.deliver_page(&html, &sink), reader);
        reader.unwrap();

        // Three were read, at most one more sat in the slot when the reader left.
        assert!((3..=4).contains(&delivered), "delivered {delivered}");
    }

    #[tokio::test]
    async fn test_footnote_marker_does_not_become_effective_rate() {
        let mut rows = rate_rows(&["3 mån"]);
        rows[0].1[0] = "3,45&nbsp;%<sup>1</sup>".to_string();
        let html = page(&[table(&HEADER, &rows), table(&HEADER, &rows)]);
        let ctx = ExtractContext {
            bank: Bank::new(DANSKE_BANK_NAME),
            changed_on: Utc::now().date_naive(),
            crawled_at: Utc::now(),
        };

        let tables = extract::extract_tables(&html, &DANSKE_BANK_LAYOUT, &ctx).unwrap();

        for extraction in tables {
            let records = extraction.outcome.unwrap();
            assert_eq!(records[0].nominal_rate, dec!(3.45));
            assert_eq!(records[0].effective_rate, dec!(3.45));
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_emits_nothing() {
        // Nothing listens on port 9 of the loopback interface.
        let (sink, rx) = sink();

        crawler("http://127.0.0.1:9/rates").produce(sink).await;

        assert!(drain(rx).await.is_empty());
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let mut config = Config::default();
        config.danske_bank_url = "not a url".to_string();
        assert!(DanskeBankCrawler::from_config(&config).is_err());
    }
}
