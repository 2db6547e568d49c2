// =============================================================================
// config.rs — KNOBS
// =============================================================================
//
// The core takes plain constructor arguments; this is how the binary finds
// them. Everything comes from BOLAN_* environment variables (a .env file is
// honoured), with defaults that crawl Danske Bank into an in-memory store.
// =============================================================================

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::crawlers::danske_bank::DANSKE_BANK_URL;

const DEFAULT_REDIS_HASH: &str = "bolan:interest_rates";
const DEFAULT_USER_AGENT: &str = "BolanCrawler/0.1 (+rate-comparison)";
const DEFAULT_DUMMY_RECORDS: usize = 4;
const DEFAULT_DUMMY_INTERVAL_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // STORE
    // =========================================================================
    /// Redis URL. Unset means records go to an in-memory store and are
    /// summarised in the log when the run ends.
    pub redis_url: Option<String>,

    /// Redis hash that holds one field per record key.
    pub redis_hash: String,

    // =========================================================================
    // HTTP
    // =========================================================================
    pub user_agent: String,

    /// Request timeout. Unset means none: a hung fetch hangs the run.
    pub http_timeout: Option<Duration>,

    // =========================================================================
    // CRAWLERS
    // =========================================================================
    pub danske_bank_enabled: bool,
    pub danske_bank_url: String,

    pub dummy_enabled: bool,
    pub dummy_records: usize,
    pub dummy_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: None,
            redis_hash: DEFAULT_REDIS_HASH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: None,
            danske_bank_enabled: true,
            danske_bank_url: DANSKE_BANK_URL.to_string(),
            dummy_enabled: false,
            dummy_records: DEFAULT_DUMMY_RECORDS,
            dummy_interval: Duration::from_secs(DEFAULT_DUMMY_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read `BOLAN_*` variables over the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Config {
            redis_url: env_opt("BOLAN_REDIS_URL"),
            redis_hash: env_or_default("BOLAN_REDIS_HASH", &defaults.redis_hash),
            user_agent: env_or_default("BOLAN_USER_AGENT", &defaults.user_agent),
            http_timeout: parse_timeout(env_opt("BOLAN_HTTP_TIMEOUT_SECS").as_deref()),
            danske_bank_enabled: parse_flag(
                env_opt("BOLAN_DANSKE_BANK_ENABLED").as_deref(),
                defaults.danske_bank_enabled,
            ),
            danske_bank_url: env_or_default("BOLAN_DANSKE_BANK_URL", &defaults.danske_bank_url),
            dummy_enabled: parse_flag(
                env_opt("BOLAN_DUMMY_CRAWLER").as_deref(),
                defaults.dummy_enabled,
            ),
            dummy_records: env_parse("BOLAN_DUMMY_RECORDS", DEFAULT_DUMMY_RECORDS),
            dummy_interval: Duration::from_secs(env_parse(
                "BOLAN_DUMMY_INTERVAL_SECS",
                DEFAULT_DUMMY_INTERVAL_SECS,
            )),
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// A set, non-blank variable.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A numeric variable; unset or unparseable falls back to `default`.
fn env_parse<T: FromStr + Copy + fmt::Display>(key: &str, default: T) -> T {
    parse_or_default(key, env_opt(key).as_deref(), default)
}

fn parse_or_default<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Copy + fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = raw, default = %default, "unparseable value, using default");
            default
        }),
        None => default,
    }
}

/// Whole seconds. Zero or garbage means no timeout; reqwest would otherwise
/// fail every request instantly.
fn parse_timeout(value: Option<&str>) -> Option<Duration> {
    let raw = value?;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warn!("BOLAN_HTTP_TIMEOUT_SECS is 0, running without a request timeout");
            None
        }
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!(
                value = raw,
                error = %e,
                "BOLAN_HTTP_TIMEOUT_SECS is not a whole number of seconds, ignoring"
            );
            None
        }
    }
}

/// `1/true/yes/on` and `0/false/no/off`, any case. Anything else keeps the default.
fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
