//! Pagination strategy implementations
//!
//! Length-aware strategies read the pagination signal off the first page,
//! compute the total page count and fan the remaining pages out through the
//! fetch scheduler. Cursor-aware strategies are inherently sequential: each
//! fetch depends on the previous response, so only rate limiting applies to
//! the traversal, never concurrency.

use super::pager::{PageToken, Pager};
use super::types::{PaginationContext, Strategy};
use crate::config::{Config, SignalKey};
use crate::error::{Error, Result};
use crate::fetch::FetchScheduler;
use crate::http::{HttpClient, PageRequest};
use crate::rate_limit::RateLimits;
use crate::response::Response;
use crate::types::{ItemStream, JsonValue};
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The Link header format (RFC 5988 style).
static LINK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<\s*([^\s>]+)\s*>.*?"\s*([^\s"]+)\s*""#).expect("link header pattern is valid")
});

/// Parse a Link header into a `rel => URI` map.
pub(crate) fn parse_link_header(header: &str) -> HashMap<String, String> {
    LINK_HEADER
        .captures_iter(header)
        .filter_map(|captures| {
            let uri = captures.get(1)?.as_str().to_string();
            let rel = captures.get(2)?.as_str().to_string();
            Some((rel, uri))
        })
        .collect()
}

impl Strategy {
    /// Drive the matched strategy to completion, returning the lazy item
    /// sequence.
    pub(crate) async fn run(self, ctx: PaginationContext) -> Result<ItemStream> {
        debug!(strategy = ?self, "running pagination");
        match self {
            Self::Custom => run_custom(ctx).await,
            Self::CursorAware => cursor_aware(ctx).await,
            Self::LastPageAware => length_aware(ctx, LengthSignal::LastPage).await,
            Self::LinkHeaderAware => link_header_aware(ctx).await,
            Self::TotalItemsAware => length_aware(ctx, LengthSignal::TotalItems).await,
            Self::TotalPagesAware => length_aware(ctx, LengthSignal::TotalPages).await,
        }
    }
}

async fn run_custom(ctx: PaginationContext) -> Result<ItemStream> {
    let custom = ctx
        .config
        .custom
        .clone()
        .ok_or_else(|| Error::invalid_pagination("no custom pagination configured"))?;

    custom.paginate(ctx).await
}

// ============================================================================
// Length-Aware Strategies
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum LengthSignal {
    TotalPages,
    TotalItems,
    LastPage,
}

async fn length_aware(mut ctx: PaginationContext, signal: LengthSignal) -> Result<ItemStream> {
    let config = Arc::clone(&ctx.config);
    let key = match signal {
        LengthSignal::TotalPages => config.total_pages_key.clone(),
        LengthSignal::TotalItems => config.total_items_key.clone(),
        LengthSignal::LastPage => config.last_page_key.clone(),
    }
    .ok_or_else(|| Error::invalid_pagination("missing pagination signal key"))?;

    let mut limits = RateLimits::from_quotas(&config.rate_limits);
    let (response, sent) = ctx.source.pull_response(&ctx.client).await?;
    if sent {
        limits.hit();
    }

    let (items, captured) = response.items_and_signal(&config.items_path, &key)?;
    let pager = Pager::new(&config, config.items_per_page(items.len()));

    let page = captured
        .as_ref()
        .and_then(|value| pager.page_of(value))
        .ok_or_else(|| Error::invalid_key(key.name()))?;

    let total_pages = match signal {
        LengthSignal::TotalPages => page,
        LengthSignal::TotalItems => pages_for_total_items(page, pager.items_per_page()),
        LengthSignal::LastPage => last_page_to_count(page, config.first_page),
    };

    chain_remaining(&ctx, config, pager, limits, items, total_pages)
}

/// Total items divided by the items observed on the first page, rounded up;
/// an empty first page means there is nothing further to fetch.
fn pages_for_total_items(total_items: u64, items_per_page: usize) -> u64 {
    if items_per_page == 0 {
        return 0;
    }
    let per_page = items_per_page as u64;
    (total_items + per_page - 1) / per_page
}

/// With 0-based numbering the last page denotes the index of the final
/// page, so the page count is one more.
fn last_page_to_count(last_page: u64, first_page: u64) -> u64 {
    if first_page == 0 {
        last_page + 1
    } else {
        last_page
    }
}

/// Chain the remaining pages behind the first page's items. The first page
/// was already fetched for signal extraction and is never fetched again.
fn chain_remaining(
    ctx: &PaginationContext,
    config: Arc<Config>,
    pager: Pager,
    limits: RateLimits,
    first_items: Vec<JsonValue>,
    total_pages: u64,
) -> Result<ItemStream> {
    let from = config.first_page + 1;
    let to = if config.first_page == 0 {
        total_pages.saturating_sub(1)
    } else {
        total_pages
    };

    let first = stream::iter(first_items.into_iter().map(Ok::<_, Error>));
    if from > to {
        return Ok(Box::pin(first));
    }

    let template = ctx.source.request()?;
    let scheduler = FetchScheduler::new(
        Arc::clone(&ctx.client),
        config,
        pager,
        template,
        from,
        to,
        limits,
    );

    Ok(Box::pin(first.chain(scheduler.into_items())))
}

// ============================================================================
// Cursor-Aware Strategies
// ============================================================================

/// Where the next-page token of a cursor traversal comes from.
enum NextTokenSource {
    /// A signal key on the response.
    Key(SignalKey),
    /// The `rel="next"` URI of the Link header.
    LinkHeader,
}

struct CursorState {
    client: Arc<HttpClient>,
    config: Arc<Config>,
    pager: Pager,
    template: PageRequest,
    limits: RateLimits,
    tokens: NextTokenSource,
    pending: Option<Response>,
    next: Option<PageToken>,
}

impl CursorState {
    fn next_of(&self, response: &Response) -> Result<(Vec<JsonValue>, Option<PageToken>)> {
        match &self.tokens {
            NextTokenSource::Key(key) => {
                let (items, captured) =
                    response.items_and_signal(&self.config.items_path, key)?;
                let token = captured.and_then(|value| self.pager.token_of(&value, false));
                Ok((items, token))
            }
            NextTokenSource::LinkHeader => {
                let items = response.items(&self.config.items_path)?;
                let links = parse_link_header(&response.header("link").unwrap_or_default());
                let token = links
                    .get("next")
                    .and_then(|uri| self.pager.token_of_str(uri, false));
                Ok((items, token))
            }
        }
    }
}

async fn cursor_aware(mut ctx: PaginationContext) -> Result<ItemStream> {
    let config = Arc::clone(&ctx.config);
    let key = config
        .cursor_key
        .clone()
        .ok_or_else(|| Error::invalid_pagination("missing cursor key"))?;

    let mut limits = RateLimits::from_quotas(&config.rate_limits);
    let (response, sent) = ctx.source.pull_response(&ctx.client).await?;
    if sent {
        limits.hit();
    }

    cursor_stream(&ctx, config, limits, response, NextTokenSource::Key(key))
}

/// Walk pages sequentially, rewriting the request URI with each revealed
/// token until a page omits it.
fn cursor_stream(
    ctx: &PaginationContext,
    config: Arc<Config>,
    limits: RateLimits,
    first: Response,
    tokens: NextTokenSource,
) -> Result<ItemStream> {
    let template = ctx.source.request()?;
    let pager = Pager::new(&config, config.per_page.unwrap_or_default());
    let state = CursorState {
        client: Arc::clone(&ctx.client),
        config,
        pager,
        template,
        limits,
        tokens,
        pending: Some(first),
        next: None,
    };

    let pages = stream::try_unfold(state, |mut state| async move {
        let response = if let Some(response) = state.pending.take() {
            response
        } else if let Some(token) = state.next.take() {
            state.limits.respect_delay().await;
            let request = state.pager.request_for(&state.template, &token)?;
            state.limits.hit();
            state.client.send(request).await?
        } else {
            return Ok::<_, Error>(None);
        };

        let (items, next) = state.next_of(&response)?;
        state.next = next;
        Ok(Some((
            stream::iter(items.into_iter().map(Ok::<_, Error>)),
            state,
        )))
    });

    Ok(Box::pin(pages.try_flatten()))
}

// ============================================================================
// Link Header Strategy
// ============================================================================

/// A `rel="last"` link makes the pagination length-aware; a `rel="next"`
/// link makes it cursor-aware; neither means the first page is all there is.
async fn link_header_aware(mut ctx: PaginationContext) -> Result<ItemStream> {
    let config = Arc::clone(&ctx.config);
    let mut limits = RateLimits::from_quotas(&config.rate_limits);
    let (response, sent) = ctx.source.pull_response(&ctx.client).await?;
    if sent {
        limits.hit();
    }

    let links = parse_link_header(&response.header("link").unwrap_or_default());

    if let Some(last_uri) = links.get("last") {
        let items = response.items(&config.items_path)?;
        let pager = Pager::new(&config, config.items_per_page(items.len()));
        let last_page = pager
            .token_of_str(last_uri, true)
            .and_then(|token| token.number())
            .ok_or_else(|| Error::invalid_key("Link"))?;
        let total_pages = last_page_to_count(last_page, config.first_page);

        chain_remaining(&ctx, config, pager, limits, items, total_pages)
    } else if links.contains_key("next") {
        cursor_stream(&ctx, config, limits, response, NextTokenSource::LinkHeader)
    } else {
        let items = response.items(&config.items_path)?;
        Ok(Box::pin(stream::iter(
            items.into_iter().map(Ok::<_, Error>),
        )))
    }
}
