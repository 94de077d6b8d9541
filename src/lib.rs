//! Offline app-shell cache controller.
//!
//! `shellcache` keeps a single-page application usable offline: it pre-caches
//! a fixed manifest of assets into a versioned cache generation, answers
//! intercepted requests cache-first for the application's own origin and
//! network-first for third-party origins, refreshes served entries in the
//! background, and prunes superseded generations when a new version
//! activates.
//!
//! The controller is driven by an interception host through [`HostEvent`]s
//! and raises [`host::HostSignals`] back; storage and network transport are
//! behind the [`store::CacheStore`] and [`fetch::Fetcher`] seams.

pub mod config;
pub mod controller;
pub mod fetch;
pub mod host;
pub mod http;
pub mod store;

pub use config::Config;
pub use controller::CacheController;
pub use fetch::{Fetcher, HttpFetcher};
pub use host::{HostEvent, HostSignals, Message, Signal};
pub use http::{Method, Request, Response, ResponseKind};
pub use store::{CacheEntry, CacheStore, MemoryStore, SqliteStore};
