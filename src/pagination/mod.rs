//! Pagination strategies
//!
//! Supports: total pages, total items, last page, Link header and cursor
//! pagination, plus user-defined strategies.
//!
//! # Overview
//!
//! [`Strategy`] is the closed set of built-in pagination families. Selection
//! is an ordered linear scan over predicates on the configuration: the first
//! match wins, so mutually exclusive signals are resolved by precedence
//! rather than validation. Length-aware families compute the page count up
//! front and fan out through the concurrent fetch scheduler; cursor-aware
//! families walk pages sequentially, each fetch revealing the next token.
//! Offset and page-in-path settings are cross-cutting modifiers applied by
//! [`Pager`] when a page token becomes a request URL, not strategies of
//! their own.

mod pager;
mod strategies;
mod types;

pub use types::{Paginate, PaginationContext, Strategy};

pub(crate) use pager::{PageToken, Pager};
pub(crate) use strategies::parse_link_header;

#[cfg(test)]
mod tests;
