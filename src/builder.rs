//! The fluent entry point
//!
//! [`JsonPages`] collects the pagination settings, then [`JsonPages::collect`]
//! turns them into the lazy item stream. Nothing happens until the stream is
//! polled: the source is resolved, the strategy matched and the first page
//! fetched on first poll, and any configuration error surfaces there.

use crate::config::{Config, RateLimitQuota, SignalKey, DEFAULT_ATTEMPTS, DEFAULT_CONCURRENCY};
use crate::error::{Error, Result};
use crate::http::{ClientConfig, HttpClient, PageRequest, TapCallbacks};
use crate::pagination::{Paginate, PaginationContext, Strategy};
use crate::response::{Dot, Response};
use crate::source::{AnySource, Source, SourceInput};
use crate::types::{Backoff, ItemStream};
use futures::stream::{self, TryStreamExt};
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Lazily load items from any paginated JSON API.
///
/// ```rust,no_run
/// use futures::TryStreamExt;
/// use pagefeed::JsonPages;
///
/// # async fn example() -> pagefeed::Result<()> {
/// let mut items = JsonPages::from("https://example.com/api/v1/users")
///     .total_pages("meta.total_pages")
///     .concurrency(5)
///     .collect("data.*");
///
/// while let Some(item) = items.try_next().await? {
///     println!("{item}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct JsonPages {
    source: SourceInput,
    page_name: String,
    page_in_path: Option<String>,
    first_page: u64,
    total_pages_key: Option<SignalKey>,
    total_items_key: Option<SignalKey>,
    cursor_key: Option<SignalKey>,
    last_page_key: Option<SignalKey>,
    offset_key: Option<String>,
    has_link_header: bool,
    custom: Option<Arc<dyn Paginate>>,
    per_page: Option<usize>,
    per_page_key: Option<String>,
    first_page_items: Option<usize>,
    concurrency: usize,
    attempts: u32,
    backoff: Option<Backoff>,
    rate_limits: Vec<RateLimitQuota>,
    client_config: ClientConfig,
    taps: TapCallbacks,
}

impl JsonPages {
    /// Start from a JSON source: an endpoint, a pre-built request or an
    /// already-received response.
    #[allow(clippy::should_implement_trait)]
    pub fn from(source: impl Into<SourceInput>) -> Self {
        Self::with_input(source.into())
    }

    /// Start from a user-defined [`Source`] implementation.
    pub fn from_source(source: impl Source + 'static) -> Self {
        Self::with_input(SourceInput::custom(source))
    }

    fn with_input(source: SourceInput) -> Self {
        Self {
            source,
            page_name: "page".into(),
            page_in_path: None,
            first_page: 1,
            total_pages_key: None,
            total_items_key: None,
            cursor_key: None,
            last_page_key: None,
            offset_key: None,
            has_link_header: false,
            custom: None,
            per_page: None,
            per_page_key: None,
            first_page_items: None,
            concurrency: DEFAULT_CONCURRENCY,
            attempts: DEFAULT_ATTEMPTS,
            backoff: None,
            rate_limits: Vec::new(),
            client_config: ClientConfig::default(),
            taps: TapCallbacks::default(),
        }
    }

    // ========================================================================
    // Pagination signals
    // ========================================================================

    /// Set the name of the page parameter (default `page`).
    #[must_use]
    pub fn page_name(mut self, name: impl Into<String>) -> Self {
        self.page_name = name.into();
        self
    }

    /// Match the page number inside the URL path; capture group 1 is
    /// replaced with the page token.
    #[must_use]
    pub fn page_in_path(mut self, pattern: impl Into<String>) -> Self {
        self.page_in_path = Some(pattern.into());
        self
    }

    /// Set the number of the first page (default 1).
    #[must_use]
    pub fn first_page(mut self, page: u64) -> Self {
        self.first_page = page;
        self
    }

    /// Read the total number of pages from the given key or callback.
    #[must_use]
    pub fn total_pages(mut self, key: impl Into<SignalKey>) -> Self {
        self.total_pages_key = Some(key.into());
        self
    }

    /// Read the total number of items from the given key or callback.
    #[must_use]
    pub fn total_items(mut self, key: impl Into<SignalKey>) -> Self {
        self.total_items_key = Some(key.into());
        self
    }

    /// Read the cursor of the next page from the given key or callback.
    #[must_use]
    pub fn cursor(mut self, key: impl Into<SignalKey>) -> Self {
        self.cursor_key = Some(key.into());
        self
    }

    /// Read the number of the last page from the given key or callback.
    #[must_use]
    pub fn last_page(mut self, key: impl Into<SignalKey>) -> Self {
        self.last_page_key = Some(key.into());
        self
    }

    /// Paginate by item offset: the given query parameter carries
    /// `(page - first_page) × items_per_page` instead of a page number.
    #[must_use]
    pub fn offset(mut self, key: impl Into<String>) -> Self {
        self.offset_key = Some(key.into());
        self
    }

    /// Read pagination metadata from the `Link` header.
    #[must_use]
    pub fn link_header(mut self) -> Self {
        self.has_link_header = true;
        self
    }

    /// Use a custom pagination strategy, taking precedence over built-ins.
    #[must_use]
    pub fn pagination(mut self, strategy: impl Paginate + 'static) -> Self {
        self.custom = Some(Arc::new(strategy));
        self
    }

    // ========================================================================
    // Page sizing
    // ========================================================================

    /// Fix the number of items per page instead of counting the first page.
    #[must_use]
    pub fn per_page(mut self, count: usize) -> Self {
        self.per_page = Some(count);
        self
    }

    /// Stamp the per-page count on outgoing requests under this query key.
    #[must_use]
    pub fn per_page_key(mut self, key: impl Into<String>) -> Self {
        self.per_page_key = Some(key.into());
        self
    }

    /// Expected item count of the first page, for APIs whose first page is
    /// not representative.
    #[must_use]
    pub fn first_page_items(mut self, count: usize) -> Self {
        self.first_page_items = Some(count);
        self
    }

    // ========================================================================
    // Fetching behavior
    // ========================================================================

    /// Set the maximum number of concurrent page requests (default 3).
    #[must_use]
    pub fn concurrency(mut self, max: usize) -> Self {
        self.concurrency = max.max(1);
        self
    }

    /// Fetch pages synchronously, one at a time.
    #[must_use]
    pub fn sync(self) -> Self {
        self.concurrency(1)
    }

    /// Set the number of fetch attempts before giving up (default 3).
    #[must_use]
    pub fn attempts(mut self, times: u32) -> Self {
        self.attempts = times.max(1);
        self
    }

    /// Set the backoff strategy between retry cycles
    /// (default `attempt² × 100ms`).
    #[must_use]
    pub fn backoff(mut self, backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Respect a rate limit of `requests` per window. May be called multiple
    /// times to track several windows at once.
    #[must_use]
    pub fn throttle(mut self, requests: u32, per: Duration) -> Self {
        self.rate_limits.push(RateLimitQuota { requests, per });
        self
    }

    /// Set the server connection timeout (default 5s).
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.client_config.connect_timeout = timeout;
        self
    }

    /// Set the per-request timeout (default 5s).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.client_config.request_timeout = timeout;
        self
    }

    /// Add a default header to every outgoing request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.client_config.default_headers.append(name, value);
        }
        self
    }

    /// Set the user agent of outgoing requests.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_config.user_agent = agent.into();
        self
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Run a hook before every request is sent.
    #[must_use]
    pub fn on_request(mut self, tap: impl Fn(&PageRequest) + Send + Sync + 'static) -> Self {
        self.taps.on_request(tap);
        self
    }

    /// Run a hook after every successful response.
    #[must_use]
    pub fn on_response(mut self, tap: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.taps.on_response(tap);
        self
    }

    /// Run a hook whenever an HTTP transaction fails.
    #[must_use]
    pub fn on_error(mut self, tap: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.taps.on_error(tap);
        self
    }

    // ========================================================================
    // Terminal
    // ========================================================================

    /// Stream the items found at the given path on every page.
    ///
    /// The stream restarts from scratch if collected again from a fresh
    /// builder; it is not resumable mid-way.
    pub fn collect(self, items_path: impl Into<String>) -> ItemStream {
        let items_path = items_path.into();
        Box::pin(stream::once(async move { self.run(items_path).await }).try_flatten())
    }

    async fn run(self, items_path: String) -> Result<ItemStream> {
        let page_in_path = match &self.page_in_path {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                Error::config(format!("invalid page-in-path pattern [{pattern}]: {e}"))
            })?),
            None => None,
        };

        let config = Arc::new(Config {
            items_path: Dot::new(&items_path),
            page_name: self.page_name,
            first_page: self.first_page,
            page_in_path,
            total_pages_key: self.total_pages_key,
            total_items_key: self.total_items_key,
            cursor_key: self.cursor_key,
            last_page_key: self.last_page_key,
            offset_key: self.offset_key,
            has_link_header: self.has_link_header,
            custom: self.custom,
            per_page: self.per_page,
            per_page_key: self.per_page_key,
            first_page_items: self.first_page_items,
            concurrency: self.concurrency,
            attempts: self.attempts,
            backoff: self.backoff,
            rate_limits: self.rate_limits,
        });

        let source = AnySource::resolve(self.source)?;
        let strategy = Strategy::select(&config)?;
        debug!(?strategy, items_path = %config.items_path, "starting pagination run");

        let client = Arc::new(HttpClient::with_config(self.client_config).with_taps(self.taps));
        strategy
            .run(PaginationContext::new(source, client, config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn unsupported_source_surfaces_on_first_poll() {
        let error = JsonPages::from("definitely not a url")
            .total_pages("meta.total_pages")
            .collect("data.*")
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        assert!(matches!(error, Error::UnsupportedSource { .. }));
    }

    #[tokio::test]
    async fn unsupported_pagination_surfaces_without_fetching() {
        let error = JsonPages::from("https://example.invalid/api/v1/users")
            .collect("data.*")
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        assert!(matches!(error, Error::UnsupportedPagination { .. }));
    }

    #[tokio::test]
    async fn invalid_path_pattern_is_a_config_error() {
        let error = JsonPages::from("https://example.invalid/api/v1/users")
            .total_pages("meta.total_pages")
            .page_in_path("([unclosed")
            .collect("data.*")
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn builder_clamps_degenerate_settings() {
        let pages = JsonPages::from("https://example.com").concurrency(0).attempts(0);
        assert_eq!(pages.concurrency, 1);
        assert_eq!(pages.attempts, 1);
    }
}
