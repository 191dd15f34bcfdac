//! feedscout: resilient feed discovery.
//!
//! Given an arbitrary website URL, determine whether it exposes a syndication
//! feed (RSS 2.0, Atom, or JSON Feed), retrieve the feed content despite
//! unreliable or blocked direct access by failing over to third-party proxy
//! relays, and return a best-effort [`feed::DiscoveryResult`] that is never
//! an error, even when every retrieval path fails.
//!
//! The moving parts:
//!
//! - [`net::HttpFetcher`] performs one GET with a timeout behind the
//!   [`net::ContentFetcher`] capability trait
//! - [`net::ProxyFailover`] walks the configured relay list in priority
//!   order, short-circuiting on first success
//! - [`feed::parse`] recognizes feed payloads tolerantly
//! - [`feed::FeedDiscovery`] orchestrates the whole direct → proxy →
//!   classify → sniff pipeline
//!
//! Diagnostics are emitted as `tracing` events; the host application decides
//! where they go by installing a subscriber.

pub mod config;
pub mod feed;
pub mod net;
pub mod util;

pub use config::Config;
pub use feed::{DiagnosticCode, DiscoveryRequest, DiscoveryResult, FeedDiscovery};
pub use net::{ContentFetcher, HttpFetcher, RelayEndpoint};
