//! In-memory cache store.
//!
//! Backs tests and hosts that provide their own persistence. Generations are
//! a map of maps behind an async lock, which gives the atomic per-key
//! read/write the `CacheStore` contract asks for.

use std::collections::HashMap;

use async_trait::async_trait;
use color_eyre::Result;
use tokio::sync::RwLock;

use super::traits::{CacheEntry, CacheStore};

/// Cache store keeping every generation in process memory.
#[derive(Default)]
pub struct MemoryStore {
  generations: RwLock<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries in a generation, if it exists.
  /// Test/diagnostic helper; the controller never needs counts.
  pub async fn entry_count(&self, generation: &str) -> Option<usize> {
    let generations = self.generations.read().await;
    generations.get(generation).map(|g| g.len())
  }
}

#[async_trait]
impl CacheStore for MemoryStore {
  async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>> {
    let generations = self.generations.read().await;
    Ok(
      generations
        .get(generation)
        .and_then(|entries| entries.get(key))
        .cloned(),
    )
  }

  async fn put(&self, generation: &str, key: &str, entry: CacheEntry) -> Result<()> {
    let mut generations = self.generations.write().await;
    generations
      .entry(generation.to_string())
      .or_default()
      .insert(key.to_string(), entry);
    Ok(())
  }

  async fn list_generations(&self) -> Result<Vec<String>> {
    let generations = self.generations.read().await;
    Ok(generations.keys().cloned().collect())
  }

  async fn delete_generation(&self, generation: &str) -> Result<bool> {
    let mut generations = self.generations.write().await;
    Ok(generations.remove(generation).is_some())
  }
}
