// =============================================================================
// main.rs — BOLAN CRAWLER
// =============================================================================
//
// One crawl run per invocation. Every enabled bank crawler fetches its rate
// page, turns the tables into InterestRateRecords and hands them to a single
// writer, which upserts them into Redis (or into memory when no Redis URL is
// configured). The process exits once every crawler has returned and every
// record has been offered to the store.
//
// Schedule it with cron, a systemd timer, whatever. It does not loop.
// =============================================================================

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use bolan_crawler::config::Config;
use bolan_crawler::crawlers::danske_bank::DanskeBankCrawler;
use bolan_crawler::crawlers::dummy::DummyCrawler;
use bolan_crawler::crawlers::SiteCrawler;
use bolan_crawler::orchestrator::CrawlService;
use bolan_crawler::store::{MemoryStore, RedisStore, Store};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .init();

    info!("bolan crawler starting");

    let config = Config::from_env();
    info!(
        redis = config.redis_url.is_some(),
        danske_bank = config.danske_bank_enabled,
        dummy = config.dummy_enabled,
        "configuration loaded"
    );

    let crawlers = build_crawlers(&config)?;
    if crawlers.is_empty() {
        warn!("no crawlers enabled, nothing will be stored");
    }

    match config.redis_url.as_deref() {
        Some(url) => {
            let store = RedisStore::connect(url, config.redis_hash.as_str()).await?;
            CrawlService::new(Arc::new(store), crawlers).run().await;
        }
        None => {
            warn!("BOLAN_REDIS_URL not set, keeping records in memory for this run");
            let store = Arc::new(MemoryStore::new());
            CrawlService::new(store.clone() as Arc<dyn Store>, crawlers)
                .run()
                .await;
            for record in store.records() {
                info!(key = %record.upsert_key(), "{}", record);
            }
            info!(records = store.len(), "in-memory store summary");
        }
    }

    info!("bolan crawler finished");
    Ok(())
}

fn build_crawlers(config: &Config) -> anyhow::Result<Vec<Arc<dyn SiteCrawler>>> {
    let mut crawlers: Vec<Arc<dyn SiteCrawler>> = Vec::new();

    if config.danske_bank_enabled {
        crawlers.push(Arc::new(DanskeBankCrawler::from_config(config)?));
    }
    if config.dummy_enabled {
        crawlers.push(Arc::new(DummyCrawler::new(
            config.dummy_records,
            config.dummy_interval,
        )));
    }

    Ok(crawlers)
}
