// =============================================================================
// orchestrator.rs — MANY CRAWLERS IN, ONE WRITER OUT
// =============================================================================
//
// One crawl run:
//
//   idle ──> running ──> draining ──> complete
//
// running:  every crawler runs in its own task and pushes records into one
//           shared channel; a single consumer task upserts them one by one.
// draining: all crawlers have returned. The orchestrator drops the last
//           sender it holds, which closes the channel. This happens exactly
//           once, and only after every producer is gone.
// complete: the consumer has seen the channel close and drained it.
//
// Nothing in here fails. A crawler that errors logs and returns, a store write
// that errors is logged and the consumer moves to the next record. There is no
// timeout either: a crawler stuck on a fetch holds the run in `running`.
// =============================================================================

use chrono::{DateTime, Utc};
use portable_atomic::{AtomicU64, Ordering};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::crawlers::{RecordSink, SiteCrawler};
use crate::models::InterestRateRecord;
use crate::store::Store;

/// tokio's mpsc can't be zero-sized; with one slot a producer waits until the
/// consumer has taken the previous record.
const DELIVERY_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Draining,
    Complete,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Running => write!(f, "running"),
            RunPhase::Draining => write!(f, "draining"),
            RunPhase::Complete => write!(f, "complete"),
        }
    }
}

/// Counters for one run. Logged when the run completes.
#[derive(Default)]
struct DeliveryStats {
    received: AtomicU64,
    stored: AtomicU64,
    store_failures: AtomicU64,
}

pub struct CrawlService {
    store: Arc<dyn Store>,
    crawlers: Vec<Arc<dyn SiteCrawler>>,
}

impl CrawlService {
    pub fn new(store: Arc<dyn Store>, crawlers: Vec<Arc<dyn SiteCrawler>>) -> Self {
        Self { store, crawlers }
    }

    /// Run every crawler to completion and deliver everything they emit.
    /// Returns once all crawlers have returned and every record has been
    /// offered to the store.
    pub async fn run(&self) {
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl_run", %run_id);
        self.run_inner(Utc::now()).instrument(span).await
    }

    async fn run_inner(&self, crawled_at: DateTime<Utc>) {
        let mut phase = RunPhase::Idle;
        info!(%phase, crawlers = self.crawlers.len(), %crawled_at, "crawl run starting");

        let (tx, rx) = mpsc::channel::<InterestRateRecord>(DELIVERY_CAPACITY);
        let stats = Arc::new(DeliveryStats::default());

        let producers: Vec<(String, JoinHandle<()>)> = self
            .crawlers
            .iter()
            .map(|crawler| {
                let crawler = Arc::clone(crawler);
                let name = crawler.name().to_string();
                let sink = RecordSink::new(tx.clone(), crawled_at);
                let span = info_span!("crawler", crawler = %name);
                let handle = tokio::spawn(
                    async move {
                        info!("crawler online");
                        crawler.produce(sink).await;
                        info!("crawler finished");
                    }
                    .instrument(span),
                );
                (name, handle)
            })
            .collect();

        let consumer = tokio::spawn(
            consume(rx, Arc::clone(&self.store), Arc::clone(&stats)).in_current_span(),
        );

        phase = transition(phase, RunPhase::Running);

        let (names, handles): (Vec<String>, Vec<JoinHandle<()>>) = producers.into_iter().unzip();
        let mut crawler_panics = 0usize;
        for (name, joined) in names.iter().zip(futures::future::join_all(handles).await) {
            if let Err(e) = joined {
                crawler_panics += 1;
                error!(crawler = %name, error = %e, "crawler task died");
            }
        }

        phase = transition(phase, RunPhase::Draining);
        // Every producer has returned and dropped its sink. This is the last
        // sender, so dropping it closes the channel.
        drop(tx);

        if let Err(e) = consumer.await {
            error!(error = %e, "record consumer task died");
        }

        phase = transition(phase, RunPhase::Complete);
        info!(
            %phase,
            received = stats.received.load(Ordering::Relaxed),
            stored = stats.stored.load(Ordering::Relaxed),
            store_failures = stats.store_failures.load(Ordering::Relaxed),
            crawler_panics,
            "crawl run complete"
        );
    }
}

fn transition(from: RunPhase, to: RunPhase) -> RunPhase {
    info!(%from, %to, "crawl run phase change");
    to
}

/// The single writer. Runs until every sender is gone.
async fn consume(
    mut rx: mpsc::Receiver<InterestRateRecord>,
    store: Arc<dyn Store>,
    stats: Arc<DeliveryStats>,
) {
    info!("record consumer starting");

    while let Some(record) = rx.recv().await {
        stats.received.fetch_add(1, Ordering::Relaxed);
        match store.upsert(&record).await {
            Ok(()) => {
                stats.stored.fetch_add(1, Ordering::Relaxed);
                debug!(key = %record.upsert_key(), "upserted {}", record);
            }
            Err(e) => {
                stats.store_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, record = ?record, "failed to upsert rate record");
            }
        }
    }

    info!("record channel closed, consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Bank, RateType, Term};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::time::Duration;

    /// Emits `count` list-rate records for `bank` and returns.
    struct FixedCrawler {
        bank: &'static str,
        count: usize,
    }

    #[async_trait]
    impl SiteCrawler for FixedCrawler {
        fn name(&self) -> &str {
            self.bank
        }

        async fn produce(&self, sink: RecordSink) {
            for i in 0..self.count {
                let record = InterestRateRecord {
                    bank: Bank::new(self.bank),
                    nominal_rate: Decimal::new(200 + i as i64, 2),
                    effective_rate: Decimal::new(200 + i as i64, 2),
                    term: Term::ALL[i % Term::ALL.len()],
                    rate_type: RateType::List,
                    discount_boundary: None,
                    union_discount: false,
                    changed_on: sink.crawled_at().date_naive(),
                    last_crawled_at: sink.crawled_at(),
                };
                if sink.deliver(record).await.is_err() {
                    return;
                }
            }
        }
    }

    /// Never returns, like a fetch against a server that never answers.
    struct HungCrawler;

    #[async_trait]
    impl SiteCrawler for HungCrawler {
        fn name(&self) -> &str {
            "hung"
        }

        async fn produce(&self, _sink: RecordSink) {
            std::future::pending::<()>().await
        }
    }

    struct PanickingCrawler;

    #[async_trait]
    impl SiteCrawler for PanickingCrawler {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn produce(&self, _sink: RecordSink) {
            panic!("markup exploded");
        }
    }

    /// Fails every other call, remembering what it accepted.
    #[derive(Default)]
    struct FlakyStore {
        calls: Mutex<usize>,
        accepted: Mutex<Vec<InterestRateRecord>>,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn upsert(&self, record: &InterestRateRecord) -> Result<(), StoreError> {
            let call = {
                let mut calls = self.calls.lock();
                *calls += 1;
                *calls
            };
            if call % 2 == 0 {
                return Err(StoreError::Rejected {
                    key: record.upsert_key(),
                    reason: "simulated outage".to_string(),
                });
            }
            self.accepted.lock().push(record.clone());
            Ok(())
        }
    }

    fn fixed(bank: &'static str, count: usize) -> Arc<dyn SiteCrawler> {
        Arc::new(FixedCrawler { bank, count })
    }

    fn hung() -> Arc<dyn SiteCrawler> {
        Arc::new(HungCrawler)
    }

    fn panicking() -> Arc<dyn SiteCrawler> {
        Arc::new(PanickingCrawler)
    }

    #[tokio::test]
    async fn test_all_records_from_all_crawlers_are_stored() {
        let store = Arc::new(MemoryStore::new());
        let service = CrawlService::new(
            store.clone(),
            vec![fixed("Bank A", 11), fixed("Bank B", 7), fixed("Bank C", 0)],
        );

        service.run().await;

        let records = store.records();
        assert_eq!(records.len(), 18);
        assert_eq!(records.iter().filter(|r| r.bank.as_str() == "Bank A").count(), 11);
        let stamp = records[0].last_crawled_at;
        assert!(records.iter().all(|r| r.last_crawled_at == stamp));
    }

    #[tokio::test]
    async fn test_run_with_no_crawlers_completes() {
        let store = Arc::new(MemoryStore::new());
        CrawlService::new(store.clone(), Vec::new()).run().await;
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_crawler_gates_completion_but_not_delivery() {
        let store = Arc::new(MemoryStore::new());
        let service = CrawlService::new(
            store.clone(),
            vec![fixed("Bank A", 5), hung(), fixed("Bank B", 6)],
        );

        let outcome = tokio::time::timeout(Duration::from_secs(30), service.run()).await;

        assert!(outcome.is_err(), "run must not complete while a crawler hangs");
        assert_eq!(store.len(), 11);
    }

    #[tokio::test]
    async fn test_store_failures_do_not_stop_the_consumer() {
        let store = Arc::new(FlakyStore::default());
        let service = CrawlService::new(store.clone(), vec![fixed("Bank A", 10)]);

        service.run().await;

        assert_eq!(*store.calls.lock(), 10);
        let accepted = store.accepted.lock();
        assert_eq!(accepted.len(), 5);
        // Calls 1, 3, 5, ... succeed; records arrive in extraction order.
        let rates: Vec<Decimal> = accepted.iter().map(|r| r.nominal_rate).collect();
        let expected: Vec<Decimal> = (0..10).step_by(2).map(|i| Decimal::new(200 + i, 2)).collect();
        assert_eq!(rates, expected);
    }

    #[tokio::test]
    async fn test_panicking_crawler_is_contained() {
        let store = Arc::new(MemoryStore::new());
        let service = CrawlService::new(
            store.clone(),
            vec![fixed("Bank A", 3), panicking(), fixed("Bank B", 4)],
        );

        service.run().await;

        assert_eq!(store.len(), 7);
    }

    #[test]
    fn test_phase_names() {
        let names: Vec<String> = [
            RunPhase::Idle,
            RunPhase::Running,
            RunPhase::Draining,
            RunPhase::Complete,
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();
        assert_eq!(names, ["idle", "running", "draining", "complete"]);
    }
}
