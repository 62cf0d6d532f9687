//! # pagefeed
//!
//! Lazily stream items from paginated JSON APIs with automatic pagination
//! detection.
//!
//! Given one initial HTTP exchange, pagefeed detects which pagination scheme
//! the API uses — total pages, total items, last page, cursor, Link header,
//! offset or a user-supplied strategy — and drives it to completion, fetching
//! the remaining pages with bounded concurrency, retries, backoff and rate
//! limiting while exposing everything as a single, order-preserving lazy
//! stream of items. The whole result set is never materialized in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::TryStreamExt;
//! use pagefeed::JsonPages;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> pagefeed::Result<()> {
//!     let mut items = JsonPages::from("https://example.com/api/v1/users")
//!         .total_pages("meta.total_pages")
//!         .concurrency(5)
//!         .attempts(3)
//!         .throttle(30, Duration::from_secs(60))
//!         .collect("data.*");
//!
//!     while let Some(item) = items.try_next().await? {
//!         // process each item as it streams in
//!         let _ = item;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      JsonPages (builder)                       │
//! │        signals · concurrency · retries · rate limits           │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │
//! ┌──────────┬───────────┬────────┴──────┬────────────┬────────────┐
//! │  Source  │ Strategy  │     Fetch     │ Rate Limit │  Response  │
//! ├──────────┼───────────┼───────────────┼────────────┼────────────┤
//! │ Endpoint │ TotalPages│ Book ledger   │ Windows    │ Items path │
//! │ Request  │ TotalItems│ Batches       │ Threshold  │ Signals    │
//! │ Response │ LastPage  │ Retry/backoff │ Reset wait │ Headers    │
//! │ Custom   │ Cursor    │ Page ordering │            │ Tokens     │
//! │          │ LinkHeader│               │            │            │
//! └──────────┴───────────┴───────────────┴────────────┴────────────┘
//! ```
//!
//! ## Partial progress
//!
//! When a page keeps failing, iteration ends with
//! [`Error::OutOfAttempts`] carrying the failed page numbers and a replay of
//! every item fetched before the failure, so consumers can persist progress
//! instead of losing it.

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module declarations
// ============================================================================

/// The fluent entry point
pub mod builder;

/// Immutable run configuration
pub mod config;

/// Error types
pub mod error;

/// Page ledger and concurrent fetch scheduler
pub mod fetch;

/// HTTP transport wrapper
pub mod http;

/// Pagination strategies and matching
pub mod pagination;

/// Request-quota windows
pub mod rate_limit;

/// Response value object and JSON extraction
pub mod response;

/// Source adapter
pub mod source;

/// Common types and aliases
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::JsonPages;
pub use config::{Config, RateLimitQuota, SignalKey};
pub use error::{Error, OutOfAttemptsError, Result};
pub use fetch::FetchStats;
pub use http::{ClientConfig, HttpClient, PageRequest, TapCallbacks};
pub use pagination::{Paginate, PaginationContext, Strategy};
pub use rate_limit::{RateLimit, RateLimits};
pub use response::{Dot, Response};
pub use source::{Source, SourceInput};
pub use types::{Backoff, ItemStream, JsonValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
