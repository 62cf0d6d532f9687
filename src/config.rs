//! Run configuration
//!
//! [`Config`] is the immutable snapshot of everything the builder collected,
//! built once before iteration starts. At most one pagination signal is
//! expected to be active at a time; the strategy matcher enforces mutual
//! exclusivity through predicate ordering rather than validation.

use crate::pagination::Paginate;
use crate::response::{Dot, Response};
use crate::types::{Backoff, JsonValue};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of concurrent page requests.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default number of fetch attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// A pagination signal: either a key to look up on the response, or a
/// callback receiving the whole response.
///
/// A key is tried against the HTTP headers first (case-insensitively), then
/// resolved as a dot path into the JSON body.
#[derive(Clone)]
pub enum SignalKey {
    /// A dot path into the body, or an HTTP header name.
    Key(String),
    /// A callback extracting the value from the response.
    Callback(Arc<dyn Fn(&Response) -> Option<JsonValue> + Send + Sync>),
}

impl SignalKey {
    /// Create a callback signal.
    pub fn callback(f: impl Fn(&Response) -> Option<JsonValue> + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    /// A display name for diagnostics.
    pub fn name(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Callback(_) => "<callback>",
        }
    }
}

impl From<&str> for SignalKey {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for SignalKey {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl fmt::Debug for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "Key({key:?})"),
            Self::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// A request quota: at most `requests` dispatches per `per` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitQuota {
    /// Requests allowed within one window.
    pub requests: u32,
    /// The window length.
    pub per: Duration,
}

/// The immutable pagination configuration.
#[derive(Clone)]
pub struct Config {
    /// Dot path to extract items from each page body.
    pub items_path: Dot,
    /// Name of the page parameter in query strings (and of embedded page
    /// tokens in pagination URLs).
    pub page_name: String,
    /// Number of the first page (0 or 1 for most APIs).
    pub first_page: u64,
    /// Pattern matching the page number inside the URL path instead of the
    /// query string; capture group 1 is replaced with the page token.
    pub page_in_path: Option<Regex>,
    /// Signal holding the total number of pages.
    pub total_pages_key: Option<SignalKey>,
    /// Signal holding the total number of items.
    pub total_items_key: Option<SignalKey>,
    /// Signal holding the cursor of the next page.
    pub cursor_key: Option<SignalKey>,
    /// Signal holding the number of the last page.
    pub last_page_key: Option<SignalKey>,
    /// Query parameter carrying an item offset instead of a page number.
    pub offset_key: Option<String>,
    /// Whether pagination metadata lives in the `Link` header.
    pub has_link_header: bool,
    /// User-defined pagination strategy, taking precedence over built-ins.
    pub custom: Option<Arc<dyn Paginate>>,
    /// Fixed number of items per page, overriding the count observed on the
    /// first page.
    pub per_page: Option<usize>,
    /// Query parameter to stamp the per-page count on outgoing requests.
    pub per_page_key: Option<String>,
    /// Expected item count of the first page, for APIs whose first page is
    /// not representative.
    pub first_page_items: Option<usize>,
    /// Maximum number of concurrent page requests.
    pub concurrency: usize,
    /// Number of fetch attempts before raising out-of-attempts.
    pub attempts: u32,
    /// Backoff strategy between retry cycles.
    pub backoff: Option<Backoff>,
    /// Request quotas to respect while fetching.
    pub rate_limits: Vec<RateLimitQuota>,
}

impl Config {
    /// The delay to sleep before the next retry cycle.
    ///
    /// Defaults to `attempt² × 100ms` when no backoff strategy is set.
    pub(crate) fn backoff_delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Some(backoff) => backoff(attempt),
            None => Duration::from_millis(u64::from(attempt) * u64::from(attempt) * 100),
        }
    }

    /// The number of items per page used for length math and offsets:
    /// a configured override wins, otherwise the count observed on the
    /// first page is authoritative.
    pub(crate) fn items_per_page(&self, counted: usize) -> usize {
        self.per_page.or(self.first_page_items).unwrap_or(counted)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("items_path", &self.items_path)
            .field("page_name", &self.page_name)
            .field("first_page", &self.first_page)
            .field("page_in_path", &self.page_in_path.as_ref().map(Regex::as_str))
            .field("total_pages_key", &self.total_pages_key)
            .field("total_items_key", &self.total_items_key)
            .field("cursor_key", &self.cursor_key)
            .field("last_page_key", &self.last_page_key)
            .field("offset_key", &self.offset_key)
            .field("has_link_header", &self.has_link_header)
            .field("custom", &self.custom.as_ref().map(|_| "<custom>"))
            .field("per_page", &self.per_page)
            .field("per_page_key", &self.per_page_key)
            .field("first_page_items", &self.first_page_items)
            .field("concurrency", &self.concurrency)
            .field("attempts", &self.attempts)
            .field("backoff", &self.backoff.as_ref().map(|_| "<callback>"))
            .field("rate_limits", &self.rate_limits)
            .finish()
    }
}
