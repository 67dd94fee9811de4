//! # Gator
//!
//! A multi-user terminal RSS aggregator with a continuous ingestion engine.
//!
//! ## Architecture
//!
//! Each ingestion cycle runs one feed through a pipeline:
//!
//! ```text
//! Scheduler → Store (select + mark) → Fetcher → Normalizer → Store (posts)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a user and log in as them
//! gator register lane
//!
//! # Add and follow a feed
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//!
//! # Collect posts every 30 seconds until Ctrl-C
//! gator agg 30s
//!
//! # Read the newest posts
//! gator browse 5
//! ```

/// Application context, cancellation and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, store, fetcher, normalizer.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/gator/config.toml`, holding the current user,
/// the database path and the aggregator settings.
pub mod config;

/// Core domain models.
///
/// - [`User`](domain::User), [`Feed`](domain::Feed), [`FeedFollow`](domain::FeedFollow)
/// - [`Post`](domain::Post): stored feed entries with SHA256 IDs
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// A single ingestion cycle and its per-item error policy.
pub mod ingest;

/// RSS decoding, entity decoding and publish-date parsing.
pub mod normalizer;

/// Markup stripping for display.
pub mod sanitizer;

/// Interval parsing and the cancellable polling loop.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`FeedGateway`](store::FeedGateway): the three operations ingestion needs
/// - [`Store`](store::Store): everything else the CLI needs
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
pub mod store;
