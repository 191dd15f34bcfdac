use crate::feed::parser::{self, ParseError, ParsedFeed};
use crate::feed::sniff;
use crate::net::{ContentFetcher, FetchedPayload, ProxyFailover, RelayEndpoint};
use crate::util::validate_url;
use futures::StreamExt;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_DIRECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(8);

/// Candidate fetches hit unknown hosts and shared relays; keep the fan-out
/// small.
const CANDIDATE_CONCURRENCY: usize = 3;

/// Stable diagnostic codes for the consuming layer to localize.
/// The accompanying detail text is advisory, not a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    InvalidUrl,
    SiteUnreachable,
    AllRelaysFailed,
    NoFeedFound,
}

/// One human-readable diagnostic describing a partial failure or a
/// recommended next step.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub code: DiagnosticCode,
    pub detail: String,
}

/// The sole return value of a discovery call.
///
/// `feeds` is never absent: total failure yields an empty vector plus at
/// least one suggestion. Insertion order is discovery order; feeds found by
/// direct classification precede link-sniffed ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    pub feeds: Vec<ParsedFeed>,
    pub suggestions: Vec<Suggestion>,
}

/// Input to one discovery call.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub url: String,
    /// Overrides the configured per-attempt timeout (direct and relay alike).
    pub timeout_override: Option<Duration>,
}

impl DiscoveryRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_override: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }
}

/// Which endpoint a fetch attempt went through.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Direct,
    Relay(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Direct => f.write_str("direct"),
            Endpoint::Relay(name) => write!(f, "relay:{name}"),
        }
    }
}

/// Record of one fetch attempt within a discovery call.
#[derive(Debug)]
struct FetchAttempt {
    endpoint: Endpoint,
    target: String,
    cause: Option<String>,
    elapsed: Duration,
}

/// Per-call attempt log. Owned by one discovery call, emitted through
/// tracing, and dropped when the call returns.
#[derive(Debug, Default)]
struct AttemptLog {
    attempts: Vec<FetchAttempt>,
}

impl AttemptLog {
    fn record(
        &mut self,
        endpoint: Endpoint,
        target: &str,
        cause: Option<String>,
        elapsed: Duration,
    ) {
        match &cause {
            None => tracing::debug!(
                endpoint = %endpoint,
                target = %target,
                elapsed_ms = elapsed.as_millis() as u64,
                "Fetch attempt succeeded"
            ),
            Some(cause) => tracing::debug!(
                endpoint = %endpoint,
                target = %target,
                elapsed_ms = elapsed.as_millis() as u64,
                cause = %cause,
                "Fetch attempt failed"
            ),
        }
        self.attempts.push(FetchAttempt {
            endpoint,
            target: target.to_owned(),
            cause,
            elapsed,
        });
    }

    fn merge(&mut self, other: AttemptLog) {
        self.attempts.extend(other.attempts);
    }

    fn finish(&self, target: &str, feeds: usize) {
        let failed = self.attempts.iter().filter(|a| a.cause.is_some()).count();
        tracing::info!(
            target = %target,
            attempts = self.attempts.len(),
            failed = failed,
            feeds = feeds,
            "Discovery call finished"
        );
    }
}

/// The retrieval outcome for one URL after the direct and relay tiers.
enum Retrieval {
    Fetched(FetchedPayload),
    /// Both tiers exhausted; suggestions describing the failure, in tier
    /// order (direct cause first, relay summary second).
    Unreachable(Vec<Suggestion>),
}

/// Feed discovery entry point.
///
/// Sequences direct fetch, proxy relay failover, format classification, and
/// HTML feed-link sniffing. [`FeedDiscovery::discover`] never fails: every
/// error is folded into the returned [`DiscoveryResult`].
///
/// Holds no per-call state: concurrent discovery calls share only the
/// fetcher's connection pool and the read-only relay list, so no coordination
/// is needed. Dropping the returned future cancels in-flight requests and
/// timers without leaking.
pub struct FeedDiscovery {
    fetcher: Arc<dyn ContentFetcher>,
    proxy: ProxyFailover,
    direct_timeout: Duration,
    relay_timeout: Duration,
}

impl FeedDiscovery {
    /// The relay list is read-only from here on; emptiness and template
    /// validity are configuration-load concerns checked before this point.
    pub fn new(fetcher: Arc<dyn ContentFetcher>, relays: Vec<RelayEndpoint>) -> Self {
        Self {
            proxy: ProxyFailover::new(Arc::clone(&fetcher), relays),
            fetcher,
            direct_timeout: DEFAULT_DIRECT_TIMEOUT,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_direct_timeout(mut self, timeout: Duration) -> Self {
        self.direct_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout = timeout;
        self
    }

    /// Discovers feeds for a website URL with default options.
    pub async fn discover_from_website(&self, url: &str) -> DiscoveryResult {
        self.discover(&DiscoveryRequest::new(url)).await
    }

    /// Runs one discovery call. Always returns a populated
    /// [`DiscoveryResult`]; never an error.
    pub async fn discover(&self, request: &DiscoveryRequest) -> DiscoveryResult {
        let mut result = DiscoveryResult::default();

        // Fail fast on malformed input: no network call is attempted.
        let target = match validate_url(&request.url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!(input = %request.url, error = %e, "Rejected discovery input");
                result.suggestions.push(Suggestion {
                    code: DiagnosticCode::InvalidUrl,
                    detail: format!("'{}' is not a fetchable URL: {e}", request.url),
                });
                return result;
            }
        };

        let direct_timeout = request.timeout_override.unwrap_or(self.direct_timeout);
        let relay_timeout = request.timeout_override.unwrap_or(self.relay_timeout);

        let mut log = AttemptLog::default();

        let payload = match self
            .retrieve(&target, direct_timeout, relay_timeout, &mut log)
            .await
        {
            Retrieval::Fetched(payload) => payload,
            Retrieval::Unreachable(suggestions) => {
                result.suggestions.extend(suggestions);
                log.finish(&target, 0);
                return result;
            }
        };

        match parser::parse(&payload.body, payload.content_type.as_deref(), &target) {
            Ok(feed) => {
                tracing::info!(target = %target, title = %feed.title, "Target is itself a feed");
                result.feeds.push(feed);
            }
            Err(ParseError::Html) => {
                let candidates = sniff::extract_candidates(&payload.text(), &target);
                let total = candidates.len();
                let feeds = self
                    .classify_candidates(candidates, direct_timeout, relay_timeout, &mut log)
                    .await;

                if feeds.is_empty() {
                    result.suggestions.push(Suggestion {
                        code: DiagnosticCode::NoFeedFound,
                        detail: format!(
                            "the page has no feed links; probed {total} candidate locations without finding a feed"
                        ),
                    });
                } else {
                    result.feeds.extend(feeds);
                }
            }
            Err(ParseError::NotAFeed(reason)) => {
                tracing::debug!(target = %target, reason = %reason, "Payload matched no feed format");
                result.suggestions.push(Suggestion {
                    code: DiagnosticCode::NoFeedFound,
                    detail: "the site responded, but the content is not a recognizable RSS, Atom, or JSON feed".to_owned(),
                });
            }
        }

        log.finish(&target, result.feeds.len());
        result
    }

    /// Direct fetch first; on failure, relay failover. Exhaustion of both
    /// tiers yields suggestions instead of an error.
    async fn retrieve(
        &self,
        target: &str,
        direct_timeout: Duration,
        relay_timeout: Duration,
        log: &mut AttemptLog,
    ) -> Retrieval {
        let started = Instant::now();
        let direct_cause = match self.fetcher.fetch(target, direct_timeout).await {
            Ok(payload) => {
                log.record(Endpoint::Direct, target, None, started.elapsed());
                return Retrieval::Fetched(payload);
            }
            Err(cause) => {
                let display = cause.to_string();
                log.record(
                    Endpoint::Direct,
                    target,
                    Some(display.clone()),
                    started.elapsed(),
                );
                display
            }
        };

        match self.proxy.try_with_failover(target, relay_timeout).await {
            Ok(success) => {
                log.record(
                    Endpoint::Relay(success.relay.clone()),
                    target,
                    None,
                    started.elapsed(),
                );
                Retrieval::Fetched(success.payload)
            }
            Err(aggregate) => {
                for failure in &aggregate.failures {
                    log.record(
                        Endpoint::Relay(failure.relay.clone()),
                        target,
                        Some(failure.cause.to_string()),
                        failure.elapsed,
                    );
                }
                // Full per-relay detail goes to the log; the user-facing
                // suggestion summarizes.
                tracing::warn!(
                    target = %target,
                    direct_cause = %direct_cause,
                    relay_causes = %aggregate.causes(),
                    "Target unreachable through every tier"
                );
                Retrieval::Unreachable(vec![
                    Suggestion {
                        code: DiagnosticCode::SiteUnreachable,
                        detail: format!("could not reach the site directly: {direct_cause}"),
                    },
                    Suggestion {
                        code: DiagnosticCode::AllRelaysFailed,
                        detail: format!(
                            "all {} proxy relays failed to retrieve the site",
                            aggregate.failures.len()
                        ),
                    },
                ])
            }
        }
    }

    /// Fetches and classifies sniffed candidate URLs.
    ///
    /// Candidates are leaves: they are fetched (direct, then relays) and
    /// parsed, but an HTML candidate is never re-sniffed; recursion depth is
    /// capped at one level structurally. Fetches run concurrently under a
    /// small cap; `buffered` merges results in document order regardless of
    /// completion order.
    async fn classify_candidates(
        &self,
        candidates: Vec<String>,
        direct_timeout: Duration,
        relay_timeout: Duration,
        log: &mut AttemptLog,
    ) -> Vec<ParsedFeed> {
        let outcomes: Vec<(Option<ParsedFeed>, AttemptLog)> = futures::stream::iter(candidates)
            .map(|candidate| async move {
                let mut local_log = AttemptLog::default();
                let feed = match self
                    .retrieve(&candidate, direct_timeout, relay_timeout, &mut local_log)
                    .await
                {
                    Retrieval::Fetched(payload) => {
                        match parser::parse(&payload.body, payload.content_type.as_deref(), &candidate)
                        {
                            Ok(feed) => {
                                tracing::info!(
                                    candidate = %candidate,
                                    title = %feed.title,
                                    "Candidate classified as a feed"
                                );
                                Some(feed)
                            }
                            Err(e) => {
                                tracing::debug!(
                                    candidate = %candidate,
                                    error = %e,
                                    "Candidate is not a feed"
                                );
                                None
                            }
                        }
                    }
                    Retrieval::Unreachable(_) => None,
                };
                (feed, local_log)
            })
            .buffered(CANDIDATE_CONCURRENCY)
            .collect()
            .await;

        let mut feeds = Vec::new();
        for (feed, local_log) in outcomes {
            log.merge(local_log);
            feeds.extend(feed);
        }
        feeds
    }
}
