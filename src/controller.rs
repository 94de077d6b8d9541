//! The offline cache controller: generation lifecycle plus the per-request
//! routing policy.
//!
//! Routing in one line: same-origin requests are cache-first with a detached
//! background refresh, cross-origin requests are network-first with cache
//! fallback, and only successful inspectable responses are ever persisted.

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::host::{HostEvent, HostSignals, Message};
use crate::http::{Request, Response};
use crate::store::{CacheEntry, CacheStore};

/// Offline cache controller for one application origin.
///
/// Owns exactly one cache generation (named from the configured cache name
/// and version) and answers every intercepted request with a response.
pub struct CacheController<S, F> {
  store: Arc<S>,
  fetcher: Arc<F>,
  signals: Arc<dyn HostSignals>,
  config: Config,
  /// Name of the generation this controller serves from.
  generation: String,
}

impl<S, F> CacheController<S, F>
where
  S: CacheStore + 'static,
  F: Fetcher + 'static,
{
  pub fn new(config: Config, store: Arc<S>, fetcher: Arc<F>, signals: Arc<dyn HostSignals>) -> Self {
    let generation = config.generation();
    Self {
      store,
      fetcher,
      signals,
      config,
      generation,
    }
  }

  pub fn version(&self) -> &str {
    &self.config.version
  }

  pub fn generation(&self) -> &str {
    &self.generation
  }

  /// Drive the controller from a host event stream.
  ///
  /// Install and activate are handled inline: their failures are logged and
  /// the loop keeps serving, leaving retry to the host. Each intercepted
  /// request is dispatched on its own task so requests interleave freely.
  pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<HostEvent>) {
    while let Some(event) = events.recv().await {
      match event {
        HostEvent::Install => {
          if let Err(e) = self.install().await {
            // The partial generation was discarded; the host may retry
            warn!(generation = %self.generation, error = %e, "install failed");
          }
        }
        HostEvent::Activate => {
          if let Err(e) = self.activate().await {
            warn!(generation = %self.generation, error = %e, "activate failed");
          }
        }
        HostEvent::Fetch { request, reply } => {
          let controller = Arc::clone(&self);
          tokio::spawn(async move {
            // Ignore send errors - the requester may have gone away
            let _ = reply.send(controller.serve(&request).await);
          });
        }
        HostEvent::Message(message) => self.handle_message(message),
      }
    }
  }

  /// Populate the cache generation from the precache manifest.
  ///
  /// All-or-nothing: every manifest URL is fetched before anything is
  /// written, so a failed fetch leaves no generation behind, and a failed
  /// write discards the generation before the error is returned. Only a
  /// fully populated generation ever becomes eligible for activation.
  pub async fn install(&self) -> Result<()> {
    info!(generation = %self.generation, "installing");

    let mut entries = Vec::with_capacity(self.config.precache.len());
    for url in &self.config.precache {
      let request = Request::get(self.config.resolve(url)?);
      let response = self
        .fetcher
        .fetch(&request)
        .await
        .map_err(|e| eyre!("Precache fetch for '{}' failed: {}", url, e))?;

      if response.status != 200 {
        return Err(eyre!(
          "Precache fetch for '{}' returned status {}",
          url,
          response.status
        ));
      }

      entries.push((request.cache_key(), CacheEntry::from_response(&response)));
    }

    for (key, entry) in entries {
      if let Err(e) = self.store.put(&self.generation, &key, entry).await {
        self.discard_generation().await;
        return Err(eyre!("Failed to populate generation: {}", e));
      }
    }

    self.signals.skip_waiting();
    Ok(())
  }

  /// Delete every generation that is not the current one, then claim all
  /// open clients.
  pub async fn activate(&self) -> Result<()> {
    info!(generation = %self.generation, "activating");

    for name in self.store.list_generations().await? {
      if name != self.generation {
        info!(generation = %name, "deleting old cache generation");
        self.store.delete_generation(&name).await?;
      }
    }

    self.signals.claim();
    Ok(())
  }

  /// Answer one intercepted request.
  pub async fn serve(&self, request: &Request) -> Result<Response> {
    if request.is_same_origin(&self.config.scope) {
      self.serve_same_origin(request).await
    } else {
      self.serve_cross_origin(request).await
    }
  }

  /// Cache-first. A hit is returned immediately and refreshed in the
  /// background; a miss waits for the network and caches the result when it
  /// is cacheable. A cache read error counts as a miss.
  async fn serve_same_origin(&self, request: &Request) -> Result<Response> {
    let key = request.cache_key();

    let cached = match self.store.get(&self.generation, &key).await {
      Ok(cached) => cached,
      Err(e) => {
        warn!(key = %key, error = %e, "cache read failed, treating as miss");
        None
      }
    };

    if let Some(entry) = cached {
      self.refresh_in_background(request.clone());
      return Ok(entry.into_response());
    }

    let response = self.fetcher.fetch(request).await?;
    if !response.is_cacheable() {
      // Non-200 or opaque: pass through, never persist
      return Ok(response);
    }

    self.store_in_background(key, &response);
    Ok(response)
  }

  /// Network-first. A successful cacheable response is copied to the cache
  /// in the background; a fetch failure falls back to the cached entry and
  /// propagates only when none exists.
  async fn serve_cross_origin(&self, request: &Request) -> Result<Response> {
    let key = request.cache_key();

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.is_cacheable() {
          self.store_in_background(key, &response);
        }
        Ok(response)
      }
      Err(fetch_err) => match self.lookup_fallback(&key).await {
        Ok(Some(entry)) => {
          debug!(key = %key, "network failed, serving cached fallback");
          Ok(entry.into_response())
        }
        Ok(None) => Err(fetch_err),
        Err(read_err) => {
          // No usable fallback; the fetch failure is the one that matters
          warn!(key = %key, error = %read_err, "cache fallback read failed");
          Err(fetch_err)
        }
      },
    }
  }

  /// Search every generation for a fallback entry, current first.
  ///
  /// Between a new version's install and its activate, a superseded
  /// generation may still hold the only copy of an entry.
  async fn lookup_fallback(&self, key: &str) -> Result<Option<CacheEntry>> {
    if let Some(entry) = self.store.get(&self.generation, key).await? {
      return Ok(Some(entry));
    }

    for name in self.store.list_generations().await? {
      if name == self.generation {
        continue;
      }
      if let Some(entry) = self.store.get(&name, key).await? {
        return Ok(Some(entry));
      }
    }

    Ok(None)
  }

  /// Handle an explicit message from a controlled page.
  ///
  /// `{"type": "SKIP_WAITING"}` raises the skip-waiting signal and
  /// `{"type": "GET_VERSION"}` replies with the version string; anything
  /// else is ignored.
  pub fn handle_message(&self, message: Message) {
    match message.payload.get("type").and_then(|t| t.as_str()) {
      Some("SKIP_WAITING") => self.signals.skip_waiting(),
      Some("GET_VERSION") => {
        if let Some(reply) = message.reply {
          let _ = reply.send(json!({ "version": self.config.version }));
        }
      }
      _ => {}
    }
  }

  /// Fire-and-forget cache write. The response was already returned, so a
  /// failure here is observed only for logging.
  fn store_in_background(&self, key: String, response: &Response) {
    let entry = CacheEntry::from_response(response);
    let store = Arc::clone(&self.store);
    let generation = self.generation.clone();

    tokio::spawn(async move {
      if let Err(e) = store.put(&generation, &key, entry).await {
        debug!(key = %key, error = %e, "background cache write failed");
      }
    });
  }

  /// Detached refresh after a cache hit: re-fetch and overwrite the entry
  /// when the fresh response is cacheable. All failures are swallowed since
  /// a response already went out.
  fn refresh_in_background(&self, request: Request) {
    let store = Arc::clone(&self.store);
    let fetcher = Arc::clone(&self.fetcher);
    let generation = self.generation.clone();

    tokio::spawn(async move {
      let key = request.cache_key();
      match fetcher.fetch(&request).await {
        Ok(response) if response.is_cacheable() => {
          let entry = CacheEntry::from_response(&response);
          if let Err(e) = store.put(&generation, &key, entry).await {
            debug!(key = %key, error = %e, "background refresh write failed");
          }
        }
        Ok(response) => {
          debug!(key = %key, status = response.status, "background refresh not cacheable");
        }
        Err(e) => {
          debug!(key = %key, error = %e, "background refresh fetch failed");
        }
      }
    });
  }

  async fn discard_generation(&self) {
    if let Err(e) = self.store.delete_generation(&self.generation).await {
      warn!(generation = %self.generation, error = %e, "failed to discard partial generation");
    }
  }
}
