//! HTTP transport
//!
//! A thin wrapper around reqwest: connection/request timeouts, default
//! headers and observability taps. Retrying is deliberately not handled
//! here — the fetch scheduler owns retries together with its page ledger.

mod client;

pub use client::{ClientConfig, HttpClient, PageRequest, TapCallbacks};

#[cfg(test)]
mod tests;
