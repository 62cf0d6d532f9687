//! Common types and type aliases
//!
//! Shared type definitions used across multiple modules.

use crate::error::Result;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// The lazy sequence of paginated items returned to the caller.
///
/// Nothing is fetched until the stream is first polled; errors raised while
/// paginating surface at the poll that encounters them.
pub type ItemStream = Pin<Box<dyn Stream<Item = Result<JsonValue>> + Send>>;

/// Backoff strategy: maps a 1-based attempt number to the delay before the
/// next retry cycle.
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;
