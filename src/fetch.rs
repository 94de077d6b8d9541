//! Network fetching seam.
//!
//! The controller routes through the `Fetcher` trait so hosts (and tests)
//! can supply their own transport; `HttpFetcher` is the real one.

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::http::{Method, Request, Response, ResponseKind};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One network fetch per call. No retries; the serving policy makes exactly
/// one attempt per request path and handles failure with cache fallback.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Network fetcher backed by `reqwest`.
///
/// Clone is cheap - `reqwest::Client` uses Arc internally for connection
/// pooling.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  /// Application origin, used to classify response visibility.
  scope: Url,
}

impl HttpFetcher {
  pub fn new(scope: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, scope })
  }

  /// Classify what the interceptor may see of a response.
  ///
  /// Same-origin responses are fully visible. Cross-origin responses are
  /// visible only when the server opts in with CORS; otherwise the response
  /// is opaque and its status and body are withheld.
  fn classify(&self, request: &Request, headers: &[(String, String)]) -> ResponseKind {
    if request.is_same_origin(&self.scope) {
      return ResponseKind::Basic;
    }

    let cors_allowed = headers
      .iter()
      .any(|(name, _)| name.eq_ignore_ascii_case("access-control-allow-origin"));

    if cors_allowed {
      ResponseKind::Cors
    } else {
      ResponseKind::Opaque
    }
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let response = self
      .client
      .request(into_reqwest_method(request.method), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Fetch failed for {}: {}", request.url, e))?;

    let status = response.status().as_u16();
    let headers: Vec<(String, String)> = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let kind = self.classify(request, &headers);
    if kind == ResponseKind::Opaque {
      // Body and status are not inspectable without CORS.
      return Ok(Response::opaque());
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body for {}: {}", request.url, e))?
      .to_vec();

    Ok(Response {
      status,
      headers,
      body,
      kind,
    })
  }
}

fn into_reqwest_method(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Head => reqwest::Method::HEAD,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Delete => reqwest::Method::DELETE,
    Method::Patch => reqwest::Method::PATCH,
    Method::Options => reqwest::Method::OPTIONS,
  }
}
