//! # miqcache - Cache audio hors-ligne pour Miqat
//!
//! Cette crate stocke durablement les enregistrements d'adhan téléchargés,
//! pour permettre leur lecture sans réseau.
//!
//! ## Architecture
//!
//! ```text
//! miqcache
//!     ├── db.rs        - Index SQLite (url -> fichier, statistiques)
//!     ├── download.rs  - Trait Fetcher + client HTTP(S)/file://
//!     ├── cache.rs     - AudioCache : stockage sur disque par URL
//!     └── store.rs     - AudioStore : façade tolérant l'absence de cache
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use miqcache::{AudioCache, AudioStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = AudioStore::new(Arc::new(AudioCache::with_http("./cache_audio")?));
//!
//!     let url = "https://example.com/adhan.mp3";
//!     if !store.has(url).await {
//!         store.put(url).await?;
//!     }
//!     println!("offline copy: {:?}", store.cached_path(url).await);
//!     Ok(())
//! }
//! ```
//!
//! ## Structure des fichiers
//!
//! ```text
//! cache_audio/
//! ├── cache.db                                       # Index SQLite
//! └── 3f786850e387550fdab836ed7e6dc881de23001b.mp3   # SHA1(url).ext
//! ```

pub mod cache;
pub mod db;
pub mod download;
pub mod error;
pub mod store;

#[cfg(feature = "miqconfig")]
pub mod config_ext;

pub use cache::AudioCache;
pub use db::{AudioEntry, DB};
pub use download::{file_name_for_url, pk_from_url, Fetcher, HttpFetcher};
pub use error::{CacheError, Result};
pub use store::{AudioStore, DownloadReport, SecondaryOutcome};

#[cfg(feature = "miqconfig")]
pub use config_ext::AudioCacheConfigExt;
