//! Network retrieval: the single-GET content fetcher and the relay failover
//! layer on top of it.
//!
//! - [`fetcher`] - one HTTP GET with timeout and size cap, behind the
//!   [`ContentFetcher`] capability trait
//! - [`proxy`] - ordered relay endpoints with first-success short-circuit and
//!   cause-preserving exhaustion

mod fetcher;
mod proxy;

pub use fetcher::{ContentFetcher, FetchError, FetchedPayload, HttpFetcher};
pub use proxy::{AggregateRelayError, ProxyFailover, RelayEndpoint, RelayFailure, RelaySuccess};
