//! Response value object and JSON extraction
//!
//! [`Response`] wraps the status, headers and raw body of one HTTP exchange.
//! Extraction is a pure function over those bytes: [`Response::items`] pulls
//! the item sequence out of a body by dot path, and [`Response::signal`]
//! resolves a pagination signal, preferring a same-named HTTP header over a
//! body pointer so APIs can publish metadata either way.

use crate::config::SignalKey;
use crate::error::{Error, Result};
use crate::http::PageRequest;
use crate::types::JsonValue;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// A dot- or slash-notation path into a JSON document.
///
/// `*` (or the JSON-pointer style `-`) matches every element of an array;
/// a path of just `*` addresses the root array. Paths without a wildcard
/// resolve to a single value; when that value is an array, item extraction
/// yields its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dot {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

impl Dot {
    /// Parse a dot path like `data.*` or a slash path like `/data/-`.
    pub fn new(path: &str) -> Self {
        let separator = if path.starts_with('/') { '/' } else { '.' };
        let segments = path
            .split(separator)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "*" | "-" => Segment::Wildcard,
                _ => match segment.parse::<usize>() {
                    Ok(index) => Segment::Index(index),
                    Err(_) => Segment::Key(segment.to_string()),
                },
            })
            .collect();

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// The original path string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Resolve the path to a single value; wildcards resolve to nothing.
    pub(crate) fn value_at<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Key(key) => current.get(key)?,
                Segment::Index(index) => current.get(index)?,
                Segment::Wildcard => return None,
            };
        }
        Some(current)
    }

    /// Collect every value matching the path, in document order.
    pub(crate) fn collect(&self, root: &JsonValue, out: &mut Vec<JsonValue>) {
        Self::walk(root, &self.segments, out);
    }

    fn walk(current: &JsonValue, segments: &[Segment], out: &mut Vec<JsonValue>) {
        let Some((head, rest)) = segments.split_first() else {
            out.push(current.clone());
            return;
        };

        match head {
            Segment::Key(key) => {
                if let Some(next) = current.get(key) {
                    Self::walk(next, rest, out);
                }
            }
            Segment::Index(index) => {
                if let Some(next) = current.get(index) {
                    Self::walk(next, rest, out);
                }
            }
            Segment::Wildcard => {
                if let Some(elements) = current.as_array() {
                    for element in elements {
                        Self::walk(element, rest, out);
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Dot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The response of one HTTP exchange.
///
/// Retains a backreference to the request that produced it, so a response
/// used as a pagination source can tell which endpoint the remaining pages
/// come from.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    url: Option<Url>,
    request: Option<PageRequest>,
}

impl Response {
    /// Create a synthetic response, e.g. one received outside this crate.
    ///
    /// Without [`Response::with_request`] such a response cannot be used as a
    /// pagination source: the adapter fails with
    /// [`Error::RequestNotSent`](crate::Error::RequestNotSent).
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            url: None,
            request: None,
        }
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Attach the request that produced this response.
    #[must_use]
    pub fn with_request(mut self, request: PageRequest) -> Self {
        self.url = Some(request.url.clone());
        self.request = Some(request);
        self
    }

    /// Build a response from a reqwest exchange, reading the full body.
    pub(crate) async fn from_reqwest(
        response: reqwest::Response,
        request: PageRequest,
    ) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            body,
            url: Some(url),
            request: Some(request),
        })
    }

    /// The HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The URL this response came from.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The request that produced this response, if it was actually sent.
    pub fn request(&self) -> Option<&PageRequest> {
        self.request.as_ref()
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<JsonValue> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }

    /// Extract the items addressed by the given path, preserving body order.
    pub fn items(&self, path: &Dot) -> Result<Vec<JsonValue>> {
        let body = self.json()?;
        Ok(Self::items_of(&body, path))
    }

    /// Resolve a pagination signal: header first, then body pointer.
    pub fn signal(&self, key: &SignalKey) -> Result<Option<JsonValue>> {
        match key {
            SignalKey::Callback(callback) => Ok(callback(self)),
            SignalKey::Key(key) => {
                if let Some(value) = self.header(key) {
                    return Ok(Some(JsonValue::String(value)));
                }
                let body = self.json()?;
                Ok(Dot::new(key).value_at(&body).cloned())
            }
        }
    }

    /// Extract the items and capture a pagination signal in the same pass,
    /// parsing the body only once.
    pub fn items_and_signal(
        &self,
        path: &Dot,
        key: &SignalKey,
    ) -> Result<(Vec<JsonValue>, Option<JsonValue>)> {
        let body = self.json()?;
        let items = Self::items_of(&body, path);

        let value = match key {
            SignalKey::Callback(callback) => callback(self),
            SignalKey::Key(key) => self
                .header(key)
                .map(JsonValue::String)
                .or_else(|| Dot::new(key).value_at(&body).cloned()),
        };

        Ok((items, value))
    }

    fn items_of(body: &JsonValue, path: &Dot) -> Vec<JsonValue> {
        // A wildcard-free path addressing an array enumerates its elements.
        if !path.has_wildcard() {
            return match path.value_at(body) {
                Some(JsonValue::Array(elements)) => elements.clone(),
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            };
        }

        let mut matches = Vec::new();
        path.collect(body, &mut matches);
        matches
    }
}
