use crate::net::fetcher::{ContentFetcher, FetchError, FetchedPayload};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A third-party relay used to retrieve a target URL when direct retrieval
/// is blocked (CORS, network policy, flaky origin).
///
/// `template` contains a `{url}` placeholder; the target is substituted
/// percent-encoded. Priority is positional: relays are attempted in the order
/// they appear in the configured list. The list is read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub name: String,
    pub template: String,
}

impl RelayEndpoint {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Builds the relay-wrapped URL for a target.
    ///
    /// The target is percent-encoded so that its own query string survives
    /// being embedded in the relay's query string.
    pub fn wrap(&self, target_url: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target_url.as_bytes()).collect();
        self.template.replace("{url}", &encoded)
    }
}

/// One relay's failure within an exhausted failover pass.
#[derive(Debug)]
pub struct RelayFailure {
    pub relay: String,
    pub cause: FetchError,
    pub elapsed: Duration,
}

impl fmt::Display for RelayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.relay, self.cause)
    }
}

/// Every configured relay failed for one target.
///
/// Carries each relay's individual cause in relay order, so callers can log
/// the full detail while surfacing only a summary to the user.
#[derive(Debug, Error)]
#[error("all {} relays failed for {target}", failures.len())]
pub struct AggregateRelayError {
    pub target: String,
    pub failures: Vec<RelayFailure>,
}

impl AggregateRelayError {
    /// Per-relay causes joined in relay order, for diagnostic logging.
    pub fn causes(&self) -> String {
        self.failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A successful relay fetch: the payload plus the identity of the relay that
/// produced it.
#[derive(Debug)]
pub struct RelaySuccess {
    pub relay: String,
    pub payload: FetchedPayload,
}

/// Attempts retrieval of a target URL through an ordered set of relays.
///
/// Short-circuits on the first relay that succeeds; a relay is never retried
/// within one call. Exhaustion fails with [`AggregateRelayError`].
pub struct ProxyFailover {
    fetcher: Arc<dyn ContentFetcher>,
    relays: Vec<RelayEndpoint>,
}

impl ProxyFailover {
    /// Relay list validity (nonempty, templates carry `{url}`) is enforced at
    /// configuration load, before this is constructed.
    pub fn new(fetcher: Arc<dyn ContentFetcher>, relays: Vec<RelayEndpoint>) -> Self {
        Self { fetcher, relays }
    }

    pub fn relays(&self) -> &[RelayEndpoint] {
        &self.relays
    }

    /// Tries each relay in configured order until one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateRelayError`] with every relay's cause, in relay
    /// order, when all are exhausted.
    pub async fn try_with_failover(
        &self,
        target_url: &str,
        timeout: Duration,
    ) -> Result<RelaySuccess, AggregateRelayError> {
        let mut failures = Vec::new();

        for relay in &self.relays {
            let wrapped = relay.wrap(target_url);
            tracing::debug!(relay = %relay.name, target = %target_url, "Attempting relay fetch");

            let started = std::time::Instant::now();
            match self.fetcher.fetch(&wrapped, timeout).await {
                Ok(payload) => {
                    tracing::info!(
                        relay = %relay.name,
                        target = %target_url,
                        bytes = payload.body.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Relay fetch succeeded"
                    );
                    return Ok(RelaySuccess {
                        relay: relay.name.clone(),
                        payload,
                    });
                }
                Err(cause) => {
                    tracing::warn!(
                        relay = %relay.name,
                        target = %target_url,
                        error = %cause,
                        "Relay fetch failed, advancing to next relay"
                    );
                    failures.push(RelayFailure {
                        relay: relay.name.clone(),
                        cause,
                        elapsed: started.elapsed(),
                    });
                }
            }
        }

        Err(AggregateRelayError {
            target: target_url.to_owned(),
            failures,
        })
    }
}
