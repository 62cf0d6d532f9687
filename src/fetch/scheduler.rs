//! The concurrent fetch scheduler
//!
//! Given a range of page numbers, dispatches at most
//! `min(concurrency, rate_limit_threshold)` requests at a time, collects
//! completions into the [`Book`] and yields items strictly in ascending page
//! order. A batch with transient failures is not drained: its successes stay
//! in the book, the failed pages are claimed first by the next batch, and
//! only once a cycle completes cleanly does the book flush. After exhausting
//! the configured attempts the scheduler raises
//! [`Error::OutOfAttempts`](crate::Error::OutOfAttempts) carrying the pages
//! still outstanding and the items fetched before the failure.

use super::book::Book;
use crate::config::Config;
use crate::error::{Error, OutOfAttemptsError, Result};
use crate::http::{HttpClient, PageRequest};
use crate::pagination::{PageToken, Pager};
use crate::rate_limit::RateLimits;
use crate::response::Response;
use crate::types::{ItemStream, JsonValue};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counters of one scheduler run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FetchStats {
    /// Pages fetched successfully.
    pub pages_fetched: u64,
    /// Items yielded so far.
    pub items_yielded: u64,
    /// Retry cycles triggered by transient failures.
    pub retry_cycles: u32,
}

/// Fetches an ordered range of pages with bounded concurrency.
pub(crate) struct FetchScheduler {
    client: Arc<HttpClient>,
    config: Arc<Config>,
    pager: Pager,
    template: PageRequest,
    book: Book,
    limits: RateLimits,
    next_page: u64,
    last_page: u64,
    failures: u32,
    stats: FetchStats,
}

impl FetchScheduler {
    /// Schedule pages `from..=to`, requested by rewriting `template`.
    pub(crate) fn new(
        client: Arc<HttpClient>,
        config: Arc<Config>,
        pager: Pager,
        template: PageRequest,
        from: u64,
        to: u64,
        limits: RateLimits,
    ) -> Self {
        Self {
            client,
            config,
            pager,
            template,
            book: Book::new(),
            limits,
            next_page: from,
            last_page: to,
            failures: 0,
            stats: FetchStats::default(),
        }
    }

    /// The scheduled pages as a lazy item stream.
    ///
    /// Each poll that exhausts the buffered items runs one more batch cycle;
    /// abandoning the stream stops scheduling further batches, though a
    /// dispatched batch always settles in full first.
    pub(crate) fn into_items(self) -> ItemStream {
        let pages = stream::try_unfold(self, |mut scheduler| async move {
            match scheduler.next_items().await? {
                Some(items) => Ok::<_, Error>(Some((
                    stream::iter(items.into_iter().map(Ok::<_, Error>)),
                    scheduler,
                ))),
                None => Ok(None),
            }
        });

        Box::pin(pages.try_flatten())
    }

    /// Run batch cycles until a drain produces items, the range is
    /// exhausted, or the run fails for good.
    async fn next_items(&mut self) -> Result<Option<Vec<JsonValue>>> {
        loop {
            if !self.book.has_failed_pages() && self.next_page > self.last_page {
                let leftover = self.drain_items()?;
                if !leftover.is_empty() {
                    return Ok(Some(leftover));
                }
                debug!(
                    pages = self.stats.pages_fetched,
                    items = self.stats.items_yielded,
                    retries = self.stats.retry_cycles,
                    "page range exhausted"
                );
                return Ok(None);
            }

            self.limits.respect_delay().await;

            let pages = self.claim_pages();
            if pages.is_empty() {
                continue;
            }

            let completions = self.dispatch(pages).await;

            let mut cause = None;
            for (page, outcome) in completions {
                match outcome {
                    Ok(response) => {
                        self.stats.pages_fetched += 1;
                        self.book.add_page(page, response);
                    }
                    Err(error) if error.is_retryable() => {
                        warn!(page, error = %error, "page fetch failed");
                        self.book.add_failed_page(page);
                        cause = Some(error);
                    }
                    Err(error) => return Err(error),
                }
            }

            if let Some(cause) = cause {
                self.failures += 1;
                self.stats.retry_cycles += 1;
                if self.failures >= self.config.attempts {
                    return Err(self.out_of_attempts(cause));
                }

                let delay = self.config.backoff_delay(self.failures);
                warn!(
                    attempt = self.failures,
                    delay_ms = delay.as_millis() as u64,
                    "retrying failed pages after backoff"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let drained = self.drain_items()?;
            if !drained.is_empty() {
                return Ok(Some(drained));
            }
        }
    }

    /// Claim the next batch of pages: previously-failed pages first (oldest
    /// first), then the next unfetched pages, capped by the concurrency
    /// limit and the remaining rate-limit quota.
    fn claim_pages(&mut self) -> Vec<u64> {
        let concurrency = self.config.concurrency.max(1);
        let limit = match self.limits.threshold() {
            Some(threshold) => concurrency.min(threshold as usize),
            None => concurrency,
        };

        let mut pages = Vec::with_capacity(limit);
        while pages.len() < limit {
            if let Some(failed) = self.book.pull_failed_page() {
                pages.push(failed);
            } else if self.next_page <= self.last_page {
                pages.push(self.next_page);
                self.next_page += 1;
            } else {
                break;
            }
        }
        pages
    }

    /// Send one batch, recording a hit per dispatched request. Completions
    /// arrive in completion order; the book restores page order later.
    async fn dispatch(&mut self, pages: Vec<u64>) -> Vec<(u64, Result<Response>)> {
        debug!(batch = pages.len(), first = ?pages.first(), "dispatching page batch");

        let mut prepared = Vec::with_capacity(pages.len());
        for page in pages {
            let request = self.pager.request_for(&self.template, &PageToken::Number(page));
            if request.is_ok() {
                self.limits.hit();
            }
            prepared.push((page, request));
        }

        let client = Arc::clone(&self.client);
        let concurrency = self.config.concurrency.max(1);

        stream::iter(prepared)
            .map(move |(page, request)| {
                let client = Arc::clone(&client);
                async move {
                    match request {
                        Ok(request) => (page, client.send(request).await),
                        Err(error) => (page, Err(error)),
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    fn drain_items(&mut self) -> Result<Vec<JsonValue>> {
        let mut items = Vec::new();
        for response in self.book.drain_ready() {
            items.extend(response.items(&self.config.items_path)?);
        }
        self.stats.items_yielded += items.len() as u64;
        Ok(items)
    }

    /// Package the partial progress into the out-of-attempts container.
    fn out_of_attempts(&mut self, cause: Error) -> Error {
        let failed_pages = self.book.pull_failed_pages();
        let mut items = Vec::new();
        for response in self.book.drain_all() {
            if let Ok(page_items) = response.items(&self.config.items_path) {
                items.extend(page_items);
            }
        }

        Error::OutOfAttempts(Box::new(OutOfAttemptsError {
            cause: Box::new(cause),
            failed_pages,
            items,
        }))
    }
}
