//! Request and response model for intercepted traffic.
//!
//! The controller never speaks HTTP itself; it routes these values between
//! the host, the cache store, and the network fetcher.

use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP method of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }
}

/// An intercepted request, reduced to what the routing policy needs.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
}

impl Request {
  /// Shorthand for the common case: a GET for the given URL.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
    }
  }

  /// Whether this request targets the given application origin.
  pub fn is_same_origin(&self, scope: &Url) -> bool {
    self.url.origin() == scope.origin()
  }

  /// Stable cache key for this request: method plus the URL with any
  /// fragment dropped (fragments never reach the server, so two URLs that
  /// differ only in fragment identify the same resource).
  pub fn cache_key(&self) -> String {
    let mut url = self.url.clone();
    url.set_fragment(None);
    format!("{} {}", self.method.as_str(), url)
  }
}

/// How much of a response the interceptor is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
  /// Same-origin response, fully inspectable.
  Basic,
  /// Cross-origin response exposed via CORS, inspectable.
  Cors,
  /// Cross-origin response without CORS: status and body are hidden.
  Opaque,
}

/// A response as seen by the routing policy, whether it came from the
/// network or from a cache generation.
#[derive(Debug, Clone)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl Response {
  /// An opaque response carries no inspectable state.
  pub fn opaque() -> Self {
    Self {
      status: 0,
      headers: Vec::new(),
      body: Vec::new(),
      kind: ResponseKind::Opaque,
    }
  }

  /// Whether this response may be persisted: only successful, inspectable
  /// responses are ever written to a cache generation.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind != ResponseKind::Opaque
  }
}
