// =============================================================================
// lib.rs — BOLAN CRAWLER
// =============================================================================
//
// Mortgage-rate crawling for Swedish banks. Site crawlers turn a bank's rate
// page into InterestRateRecords, the orchestrator fans them into one writer,
// and a Store upserts them. The binary in main.rs wires this to the
// environment; everything here takes plain arguments.
// =============================================================================

pub mod config;
pub mod crawlers;
pub mod error;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod store;
