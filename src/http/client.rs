//! HTTP client wrapper
//!
//! Sends one request at a time; the caller decides how many are in flight.
//! Non-2xx statuses are mapped to [`Error::HttpStatus`] so the scheduler can
//! classify them for retrying.

use crate::error::{Error, Result};
use crate::response::Response;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// An outbound page request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// The HTTP method.
    pub method: Method,
    /// The request URL.
    pub url: Url,
    /// Extra request headers.
    pub headers: HeaderMap,
}

impl PageRequest {
    /// Create a request with the given method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<reqwest::header::HeaderName>(),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// The same request aimed at a different URL.
    #[must_use]
    pub(crate) fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Default headers for all requests.
    pub default_headers: HeaderMap,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            default_headers: HeaderMap::new(),
            user_agent: format!("pagefeed/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

type RequestTap = Arc<dyn Fn(&PageRequest) + Send + Sync>;
type ResponseTap = Arc<dyn Fn(&Response) + Send + Sync>;
type ErrorTap = Arc<dyn Fn(&Error) + Send + Sync>;

/// Observability hooks fired around every HTTP transaction.
#[derive(Clone, Default)]
pub struct TapCallbacks {
    on_request: Vec<RequestTap>,
    on_response: Vec<ResponseTap>,
    on_error: Vec<ErrorTap>,
}

impl TapCallbacks {
    /// Register a hook fired before a request is sent.
    pub fn on_request(&mut self, tap: impl Fn(&PageRequest) + Send + Sync + 'static) {
        self.on_request.push(Arc::new(tap));
    }

    /// Register a hook fired after a successful response.
    pub fn on_response(&mut self, tap: impl Fn(&Response) + Send + Sync + 'static) {
        self.on_response.push(Arc::new(tap));
    }

    /// Register a hook fired when a transaction fails.
    pub fn on_error(&mut self, tap: impl Fn(&Error) + Send + Sync + 'static) {
        self.on_error.push(Arc::new(tap));
    }

    fn request_sent(&self, request: &PageRequest) {
        for tap in &self.on_request {
            tap(request);
        }
    }

    fn response_received(&self, response: &Response) {
        for tap in &self.on_response {
            tap(response);
        }
    }

    fn transaction_failed(&self, error: &Error) {
        for tap in &self.on_error {
            tap(error);
        }
    }
}

impl fmt::Debug for TapCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapCallbacks")
            .field("on_request", &self.on_request.len())
            .field("on_response", &self.on_response.len())
            .field("on_error", &self.on_error.len())
            .finish()
    }
}

/// HTTP client with timeouts and observability taps
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    config: ClientConfig,
    taps: TapCallbacks,
}

impl HttpClient {
    /// Create a client with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            config,
            taps: TapCallbacks::default(),
        }
    }

    /// Attach observability taps.
    #[must_use]
    pub fn with_taps(mut self, taps: TapCallbacks) -> Self {
        self.taps = taps;
        self
    }

    /// Send one request and read the full response.
    pub async fn send(&self, request: PageRequest) -> Result<Response> {
        self.taps.request_sent(&request);
        debug!(method = %request.method, url = %request.url, "sending request");

        let outcome = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(self.config.default_headers.clone())
            .headers(request.headers.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await;

        match outcome {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    let error = Error::HttpStatus {
                        status: status.as_u16(),
                        url: request.url.to_string(),
                    };
                    self.taps.transaction_failed(&error);
                    return Err(error);
                }

                let response = Response::from_reqwest(response, request).await?;
                self.taps.response_received(&response);
                Ok(response)
            }
            Err(e) => {
                let error = Error::Http(e);
                self.taps.transaction_failed(&error);
                Err(error)
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
