//! Personal music catalog that learns from listening habits.
//!
//! Core modules:
//! - [`models`] - Artists, albums, songs, playlists and their typed ids
//! - [`store`] - The [`store::CatalogStore`] persistence trait and an in-memory store
//! - [`db`] - SQLite-backed store
//! - [`catalog`] - Validated mutations and cascade rules over any store
//! - [`preferences`] - Per-user genre, artist and play counters
//! - [`recommend`] - Suggestions built from preferences and the catalog
//!
//! ### Supporting Modules
//!
//! - [`config`] - Data directory and runtime settings
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`error`] - Error types
//!
//! ## Quick Start Example
//!
//! ```
//! use setlist::catalog::Catalog;
//! use setlist::preferences::PreferenceTracker;
//! use setlist::recommend::Recommender;
//! use setlist::store::MemoryStore;
//!
//! let mut catalog = Catalog::new(MemoryStore::new());
//! let artist = catalog.add_artist("Fela Kuti", Some("Afrobeat pioneer")).unwrap();
//! let song = catalog.add_song("Zombie", artist, 740, "Afrobeat").unwrap();
//!
//! let mut tracker = PreferenceTracker::new();
//! assert!(tracker.record_play("me", song, catalog.store()));
//!
//! let picks = Recommender::new(&tracker, catalog.store()).recommend_songs_by_genre("me", 5);
//! assert_eq!(picks[0].id, song);
//! ```
//!
//! ## Error Handling
//!
//! Every catalog operation comes in two forms. `try_*` returns
//! [`error::CatalogError`]; the plain form logs the error and returns `false`
//! or `None`. A failed operation never leaves a partial change behind.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod preferences;
pub mod recommend;
pub mod store;

pub use catalog::Catalog;
pub use db::SqliteStore;
pub use error::{CatalogError, StoreError};
pub use preferences::PreferenceTracker;
pub use recommend::{RecommendConfig, Recommender};
pub use store::{CatalogStore, MemoryStore};
