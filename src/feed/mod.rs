//! Feed recognition and discovery.
//!
//! This module turns "a URL someone typed into the app" into "the feeds that
//! site publishes":
//!
//! - [`parser`] - recognize RSS 2.0 / Atom / JSON Feed payloads via `feed-rs`,
//!   with content-type precedence and root-structure sniffing
//! - [`sniff`] - extract candidate feed URLs from an HTML page (`<link
//!   rel="alternate">` plus conventional paths)
//! - [`discovery`] - the orchestrator: direct fetch, relay failover,
//!   classification, candidate probing; always returns a result, never fails
//!
//! # Example
//!
//! ```ignore
//! use feedscout::feed::FeedDiscovery;
//!
//! let discovery = FeedDiscovery::new(fetcher, relays);
//! let result = discovery.discover_from_website("https://example.com").await;
//! for feed in &result.feeds {
//!     println!("{} ({:?})", feed.title, feed.format);
//! }
//! ```

mod discovery;
mod parser;
mod sniff;

pub use discovery::{
    DiagnosticCode, DiscoveryRequest, DiscoveryResult, FeedDiscovery, Suggestion,
};
pub use parser::{parse, FeedFormat, FeedItem, ParseError, ParsedFeed};
