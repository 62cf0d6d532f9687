//! Pagination types and traits

use super::pager::Pager;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::FetchScheduler;
use crate::http::{HttpClient, PageRequest};
use crate::rate_limit::RateLimits;
use crate::response::Response;
use crate::source::AnySource;
use crate::types::{ItemStream, JsonValue};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a pagination strategy needs to drive a run: the resolved
/// source, the HTTP client and the immutable configuration.
pub struct PaginationContext {
    pub(crate) source: AnySource,
    pub(crate) client: Arc<HttpClient>,
    pub(crate) config: Arc<Config>,
}

impl PaginationContext {
    pub(crate) fn new(source: AnySource, client: Arc<HttpClient>, config: Arc<Config>) -> Self {
        Self {
            source,
            client,
            config,
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The HTTP client of this run.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// The request fetching the first page.
    pub fn request(&self) -> Result<PageRequest> {
        self.source.request()
    }

    /// Hand over the first response, fetching it at most once per run.
    pub async fn pull_response(&mut self) -> Result<Response> {
        let (response, _) = self.source.pull_response(&self.client).await?;
        Ok(response)
    }

    /// Fresh rate-limit windows built from the configured quotas.
    pub fn rate_limits(&self) -> RateLimits {
        RateLimits::from_quotas(&self.config.rate_limits)
    }

    /// Fan pages `from..=to` out through the concurrent fetch scheduler,
    /// yielding their items in ascending page order.
    ///
    /// `items_per_page` feeds the offset computation; pass the item count
    /// observed on the first page. Custom strategies get the same bounded
    /// concurrency, retry and rate-limiting behavior as the built-ins.
    pub fn fetch_pages(&self, from: u64, to: u64, items_per_page: usize) -> Result<ItemStream> {
        let pager = Pager::new(&self.config, items_per_page);
        let template = self.source.request()?;
        let scheduler = FetchScheduler::new(
            Arc::clone(&self.client),
            Arc::clone(&self.config),
            pager,
            template,
            from,
            to,
            self.rate_limits(),
        );
        Ok(scheduler.into_items())
    }

    /// Extract the configured items from a page response.
    pub fn items_of(&self, response: &Response) -> Result<Vec<JsonValue>> {
        response.items(&self.config.items_path)
    }
}

/// A user-defined pagination strategy.
///
/// Registered through the builder, it takes precedence over every built-in
/// strategy. Implementations that discover they are misconfigured should
/// return [`Error::InvalidPagination`](crate::Error::InvalidPagination).
#[async_trait]
pub trait Paginate: Send + Sync {
    /// Yield the paginated items.
    async fn paginate(&self, ctx: PaginationContext) -> Result<ItemStream>;
}

/// The built-in pagination strategies, in matching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// User-defined strategy, takes precedence over all built-ins.
    Custom,
    /// Each page reveals the cursor of the next one.
    CursorAware,
    /// The response carries the number of the last page.
    LastPageAware,
    /// Pagination metadata lives in the `Link` header.
    LinkHeaderAware,
    /// The response carries the total number of items.
    TotalItemsAware,
    /// The response carries the total number of pages.
    TotalPagesAware,
}

impl Strategy {
    /// The fixed, order-sensitive list of strategies to probe.
    pub(crate) const ORDERED: [Self; 6] = [
        Self::Custom,
        Self::CursorAware,
        Self::LastPageAware,
        Self::LinkHeaderAware,
        Self::TotalItemsAware,
        Self::TotalPagesAware,
    ];

    /// Whether the configuration matches this strategy.
    pub fn matches(self, config: &Config) -> bool {
        match self {
            Self::Custom => config.custom.is_some(),
            Self::CursorAware => {
                config.cursor_key.is_some()
                    && config.total_items_key.is_none()
                    && config.total_pages_key.is_none()
                    && config.last_page_key.is_none()
            }
            Self::LastPageAware => config.last_page_key.is_some(),
            Self::LinkHeaderAware => {
                config.has_link_header
                    && config.total_items_key.is_none()
                    && config.total_pages_key.is_none()
                    && config.last_page_key.is_none()
            }
            Self::TotalItemsAware => {
                config.total_items_key.is_some()
                    && config.total_pages_key.is_none()
                    && config.last_page_key.is_none()
            }
            Self::TotalPagesAware => config.total_pages_key.is_some(),
        }
    }

    /// Select the strategy for the given configuration: the first matching
    /// predicate wins, deterministically.
    pub fn select(config: &Config) -> Result<Self> {
        Self::ORDERED
            .into_iter()
            .find(|strategy| strategy.matches(config))
            .ok_or_else(|| Error::UnsupportedPagination {
                config: Box::new(config.clone()),
            })
    }
}
