//! Page token resolution and request rewriting
//!
//! Pagination metadata may be a raw number, an opaque cursor string or a
//! full next-page URL with the token embedded in its query string or path.
//! [`Pager`] normalizes all of those into a [`PageToken`] and turns a token
//! back into the request for that page, applying the offset and page-in-path
//! modifiers uniformly for every strategy.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::PageRequest;
use crate::types::JsonValue;
use regex::Regex;
use std::fmt;
use url::Url;

/// The value identifying which page to fetch next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageToken {
    /// A page number.
    Number(u64),
    /// An opaque cursor.
    Cursor(String),
}

impl PageToken {
    /// The numeric page, if this token is one.
    pub(crate) fn number(&self) -> Option<u64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Cursor(_) => None,
        }
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Cursor(cursor) => f.write_str(cursor),
        }
    }
}

/// Maps page tokens to request URLs and back.
#[derive(Debug, Clone)]
pub(crate) struct Pager {
    page_name: String,
    first_page: u64,
    page_in_path: Option<Regex>,
    offset_key: Option<String>,
    per_page_key: Option<String>,
    per_page_value: Option<usize>,
    items_per_page: usize,
}

impl Pager {
    /// Build a pager; `items_per_page` is the per-page item count resolved
    /// from the first page (used by the offset modifier).
    pub(crate) fn new(config: &Config, items_per_page: usize) -> Self {
        Self {
            page_name: config.page_name.clone(),
            first_page: config.first_page,
            page_in_path: config.page_in_path.clone(),
            offset_key: config.offset_key.clone(),
            per_page_key: config.per_page_key.clone(),
            per_page_value: config.per_page,
            items_per_page,
        }
    }

    pub(crate) fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// The numeric page out of the given value, if any.
    pub(crate) fn page_of(&self, value: &JsonValue) -> Option<u64> {
        self.token_of(value, true)?.number()
    }

    /// The page token out of the given value.
    ///
    /// Numbers and numeric strings become page numbers; strings that look
    /// like URLs have their embedded token extracted; other strings are
    /// opaque cursors unless `only_numeric` is set.
    pub(crate) fn token_of(&self, value: &JsonValue, only_numeric: bool) -> Option<PageToken> {
        match value {
            JsonValue::Number(number) => number.as_u64().map(PageToken::Number),
            JsonValue::String(value) => self.token_of_str(value, only_numeric),
            _ => None,
        }
    }

    /// The page token out of the given string, applying the same rules as
    /// [`Pager::token_of`].
    pub(crate) fn token_of_str(&self, value: &str, only_numeric: bool) -> Option<PageToken> {
        if value.is_empty() {
            return None;
        }
        if let Ok(number) = value.parse::<u64>() {
            return Some(PageToken::Number(number));
        }
        if let Ok(url) = Url::parse(value) {
            if matches!(url.scheme(), "http" | "https") {
                return self.token_from_url(&url, only_numeric);
            }
        }

        if only_numeric {
            None
        } else {
            Some(PageToken::Cursor(value.to_string()))
        }
    }

    fn token_from_url(&self, url: &Url, only_numeric: bool) -> Option<PageToken> {
        if let Some(pattern) = &self.page_in_path {
            let captured = pattern.captures(url.path())?.get(1)?.as_str().to_string();
            return self.token_of_str(&captured, only_numeric);
        }

        let (_, value) = url
            .query_pairs()
            .find(|(name, _)| *name == self.page_name)?;
        self.token_of_str(&value, only_numeric)
    }

    /// The request for the given page token, derived from the first page's
    /// request.
    pub(crate) fn request_for(&self, template: &PageRequest, token: &PageToken) -> Result<PageRequest> {
        let mut url = template.url.clone();

        if let Some(key) = &self.offset_key {
            let page = token.number().ok_or_else(|| Error::invalid_key(key.as_str()))?;
            let offset = page.saturating_sub(self.first_page) * self.items_per_page as u64;
            url = with_query_param(&url, key, &offset.to_string());
        } else if let Some(pattern) = &self.page_in_path {
            let path = url.path().to_string();
            let capture = pattern
                .captures(&path)
                .and_then(|captures| captures.get(1))
                .ok_or_else(|| Error::InvalidPageInPath {
                    path: path.clone(),
                    pattern: pattern.as_str().to_string(),
                })?;
            let range = capture.range();
            let replaced = format!("{}{token}{}", &path[..range.start], &path[range.end..]);
            url.set_path(&replaced);
        } else {
            url = with_query_param(&url, &self.page_name, &token.to_string());
        }

        if let (Some(key), Some(per_page)) = (&self.per_page_key, self.per_page_value) {
            url = with_query_param(&url, key, &per_page.to_string());
        }

        Ok(template.clone().with_url(url))
    }
}

/// Set a query parameter, replacing any existing value and preserving the
/// other parameters.
fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != key)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut updated = url.clone();
    {
        let mut pairs = updated.query_pairs_mut();
        pairs.clear();
        for (name, value) in &kept {
            pairs.append_pair(name, value);
        }
        pairs.append_pair(key, value);
    }
    updated
}
