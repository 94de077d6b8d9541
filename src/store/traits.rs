//! Cache store trait and the stored-entry type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::http::{Response, ResponseKind};

/// A response snapshot persisted in a cache generation.
///
/// Entries are immutable once written; a later `put` for the same key
/// replaces the prior entry wholesale.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
  /// When the snapshot was taken.
  pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
  /// Snapshot a response for storage.
  pub fn from_response(response: &Response) -> Self {
    Self {
      status: response.status,
      headers: response.headers.clone(),
      body: response.body.clone(),
      kind: response.kind,
      cached_at: Utc::now(),
    }
  }

  /// Reconstruct the response this entry was snapshotted from.
  pub fn into_response(self) -> Response {
    Response {
      status: self.status,
      headers: self.headers,
      body: self.body,
      kind: self.kind,
    }
  }
}

/// Storage backend for cache generations.
///
/// The store is a host-managed key-value resource: per-key reads and writes
/// are atomic, and concurrent writers for the same key resolve to last write
/// wins. Implementations never interpret keys beyond equality.
#[async_trait]
pub trait CacheStore: Send + Sync {
  /// Look up an entry in the given generation.
  async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>>;

  /// Write (or replace) an entry in the given generation, creating the
  /// generation if it does not exist yet.
  async fn put(&self, generation: &str, key: &str, entry: CacheEntry) -> Result<()>;

  /// Names of every generation currently present.
  async fn list_generations(&self) -> Result<Vec<String>>;

  /// Delete a generation and all of its entries.
  /// Returns whether the generation existed.
  async fn delete_generation(&self, generation: &str) -> Result<bool>;
}
