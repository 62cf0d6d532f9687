//! Source adapter
//!
//! Wraps the heterogeneous inputs a pagination run can start from — a bare
//! endpoint, a pre-built request, an already-received response or a
//! user-defined [`Source`] — behind one contract: produce a request, produce
//! a response. The probing order is fixed (custom source, endpoint, request,
//! response); the first matching variant wins and is kept for the run. The
//! response is memoized so pagination metadata and the first page's items
//! come from a single exchange.

use crate::error::{Error, Result};
use crate::http::{HttpClient, PageRequest};
use crate::response::Response;
use async_trait::async_trait;
use std::fmt;
use url::Url;

/// A user-defined JSON source.
///
/// Implementations own their means of producing the first request; the
/// default `response` sends that request through the run's client.
#[async_trait]
pub trait Source: Send + Sync {
    /// The request fetching the first page.
    fn request(&self) -> Result<PageRequest>;

    /// The response of the first page.
    async fn response(&self, client: &HttpClient) -> Result<Response> {
        client.send(self.request()?).await
    }
}

/// The raw input a pagination run starts from.
pub enum SourceInput {
    /// A user-defined source implementing the [`Source`] capability.
    Custom(Box<dyn Source>),
    /// A bare endpoint string.
    Endpoint(String),
    /// An already-parsed endpoint URL.
    Url(Url),
    /// A pre-built request.
    Request(PageRequest),
    /// An already-received response.
    Response(Box<Response>),
}

impl SourceInput {
    /// Wrap a user-defined source.
    pub fn custom(source: impl Source + 'static) -> Self {
        Self::Custom(Box::new(source))
    }
}

impl fmt::Debug for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => write!(f, "Custom(..)"),
            Self::Endpoint(endpoint) => write!(f, "Endpoint({endpoint:?})"),
            Self::Url(url) => write!(f, "Url({url})"),
            Self::Request(request) => write!(f, "Request({} {})", request.method, request.url),
            Self::Response(_) => write!(f, "Response(..)"),
        }
    }
}

impl From<&str> for SourceInput {
    fn from(endpoint: &str) -> Self {
        Self::Endpoint(endpoint.to_string())
    }
}

impl From<String> for SourceInput {
    fn from(endpoint: String) -> Self {
        Self::Endpoint(endpoint)
    }
}

impl From<Url> for SourceInput {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}

impl From<PageRequest> for SourceInput {
    fn from(request: PageRequest) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for SourceInput {
    fn from(response: Response) -> Self {
        Self::Response(Box::new(response))
    }
}

enum Resolved {
    Custom(Box<dyn Source>),
    Request(PageRequest),
}

/// The resolved source of a pagination run.
///
/// Holds the matching variant and memoizes the first response.
pub(crate) struct AnySource {
    resolved: Resolved,
    response: Option<Response>,
    sent: bool,
}

impl AnySource {
    /// Probe the input against the supported source kinds, in order.
    pub(crate) fn resolve(input: SourceInput) -> Result<Self> {
        match input {
            SourceInput::Custom(source) => Ok(Self::from_resolved(Resolved::Custom(source))),
            SourceInput::Endpoint(raw) => {
                let url = Url::parse(&raw).map_err(|_| Error::unsupported_source(raw.as_str()))?;
                Self::from_endpoint(url, &raw)
            }
            SourceInput::Url(url) => {
                let raw = url.to_string();
                Self::from_endpoint(url, &raw)
            }
            SourceInput::Request(request) => Ok(Self::from_resolved(Resolved::Request(request))),
            SourceInput::Response(response) => {
                // A synthetic response has no way back to its endpoint.
                let request = response.request().cloned().ok_or(Error::RequestNotSent)?;
                Ok(Self {
                    resolved: Resolved::Request(request),
                    response: Some(*response),
                    sent: false,
                })
            }
        }
    }

    fn from_endpoint(url: Url, raw: &str) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::unsupported_source(raw));
        }
        Ok(Self::from_resolved(Resolved::Request(PageRequest::get(url))))
    }

    fn from_resolved(resolved: Resolved) -> Self {
        Self {
            resolved,
            response: None,
            sent: false,
        }
    }

    /// The request fetching the first page.
    pub(crate) fn request(&self) -> Result<PageRequest> {
        match &self.resolved {
            Resolved::Custom(source) => source.request(),
            Resolved::Request(request) => Ok(request.clone()),
        }
    }

    /// Hand over the first response, fetching it if no memo exists.
    ///
    /// The flag reports whether an HTTP exchange happened during this run,
    /// so the caller can account it against rate-limit windows.
    pub(crate) async fn pull_response(&mut self, client: &HttpClient) -> Result<(Response, bool)> {
        if let Some(response) = self.response.take() {
            return Ok((response, self.sent));
        }

        let response = match &self.resolved {
            Resolved::Custom(source) => source.response(client).await?,
            Resolved::Request(request) => client.send(request.clone()).await?,
        };
        self.sent = true;
        Ok((response, true))
    }
}

impl fmt::Debug for AnySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.resolved {
            Resolved::Custom(_) => "custom",
            Resolved::Request(_) => "request",
        };
        f.debug_struct("AnySource")
            .field("kind", &kind)
            .field("memoized", &self.response.is_some())
            .finish()
    }
}
