//! # Creator Leaderboard
//!
//! Backend for a creator-program leaderboard spanning five seasons.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (seasons, entries, handle normalization)
//! - **storage**: Append-only JSONL snapshot store for historical seasons
//! - **fetch**: Paginated client for the live upstream leaderboard
//! - **scrape**: Program page scraping
//! - **search**: Cross-season user lookup and suggestions
//! - **scheduler**: Periodic snapshot runs with a re-entrancy guard
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod config;
pub mod fetch;
pub mod models;
pub mod scheduler;
pub mod scrape;
pub mod search;
pub mod storage;

pub use models::*;
