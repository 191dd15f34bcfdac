//! End-to-end discovery tests against a local mock HTTP server.
//!
//! Each test spins up its own wiremock server and points both the target
//! site and the relay endpoints at it, exercising the real fetcher, the
//! relay failover, the parser, and the orchestrator together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use feedscout::feed::{DiagnosticCode, DiscoveryRequest, FeedDiscovery};
use feedscout::net::{HttpFetcher, RelayEndpoint};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Fallback Feed</title>
    <link>https://example.com</link>
    <item>
      <guid>1</guid>
      <title>First Post</title>
      <link>https://example.com/post/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

const ATOM_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Side Feed</title>
  <entry><id>1</id><title>Entry</title><updated>2024-01-01T00:00:00Z</updated></entry>
</feed>"#;

const JSON_FEED: &str = r#"{
  "version": "https://jsonfeed.org/version/1.1",
  "title": "Json Feed",
  "items": [{"id": "1", "title": "Post", "url": "https://example.com/1"}]
}"#;

/// Two relays that tunnel through the same mock server.
fn relays_on(server: &MockServer) -> Vec<RelayEndpoint> {
    vec![
        RelayEndpoint::new("relay-a", format!("{}/relay-a?url={{url}}", server.uri())),
        RelayEndpoint::new("relay-b", format!("{}/relay-b?url={{url}}", server.uri())),
    ]
}

fn discovery_on(server: &MockServer) -> FeedDiscovery {
    FeedDiscovery::new(Arc::new(HttpFetcher::default()), relays_on(server))
        .with_direct_timeout(Duration::from_secs(5))
        .with_relay_timeout(Duration::from_secs(5))
}

// ============================================================================
// Direct classification
// ============================================================================

#[tokio::test]
async fn test_direct_rss_document_is_discovered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RSS_FEED)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&format!("{}/feed.xml", server.uri()))
        .await;

    assert!(result.feeds.len() >= 1);
    assert_eq!(result.feeds[0].title, "Fallback Feed");
    assert_eq!(result.feeds[0].items.len(), 1);
    assert!(result.suggestions.is_empty());
}

#[tokio::test]
async fn test_direct_json_feed_is_discovered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(JSON_FEED)
                .insert_header("Content-Type", "application/feed+json"),
        )
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&format!("{}/feed.json", server.uri()))
        .await;

    assert_eq!(result.feeds.len(), 1);
    assert_eq!(result.feeds[0].title, "Json Feed");
}

// ============================================================================
// Relay failover
// ============================================================================

#[tokio::test]
async fn test_direct_failure_falls_back_to_second_relay() {
    let server = MockServer::start().await;
    // Direct target 404s, first relay 500s, second relay delivers the feed
    Mock::given(method("GET"))
        .and(path("/site"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/relay-a"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/relay-b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RSS_FEED)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&format!("{}/site", server.uri()))
        .await;

    assert_eq!(result.feeds.len(), 1);
    assert_eq!(result.feeds[0].title, "Fallback Feed");
    assert!(result.suggestions.is_empty());
}

#[tokio::test]
async fn test_total_failure_returns_empty_feeds_with_suggestions() {
    let server = MockServer::start().await;
    // Target and both relays all answer 503
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&format!("{}/anything", server.uri()))
        .await;

    assert_eq!(result.feeds.len(), 0);
    assert!(result.suggestions.len() >= 1);
    let codes: Vec<DiagnosticCode> = result.suggestions.iter().map(|s| s.code).collect();
    assert!(codes.contains(&DiagnosticCode::AllRelaysFailed));
}

// ============================================================================
// HTML link sniffing
// ============================================================================

#[tokio::test]
async fn test_html_page_yields_both_advertised_feeds_in_document_order() {
    let server = MockServer::start().await;
    let html = r#"<html><head>
        <link rel="alternate" type="application/rss+xml" href="/main.xml">
        <link rel="alternate" type="application/atom+xml" href="/side.xml">
    </head><body><h1>Blog</h1></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/main.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RSS_FEED)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/side.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ATOM_FEED)
                .insert_header("Content-Type", "application/atom+xml"),
        )
        .mount(&server)
        .await;
    // Conventional paths and relay tunnels: nothing there
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&server.uri())
        .await;

    assert_eq!(result.feeds.len(), 2);
    assert_eq!(result.feeds[0].title, "Fallback Feed");
    assert_eq!(result.feeds[1].title, "Side Feed");
}

#[tokio::test]
async fn test_plain_page_without_feeds_suggests_no_feed_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Just a page</body></html>")
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = discovery_on(&server)
        .discover_from_website(&server.uri())
        .await;

    assert!(result.feeds.is_empty());
    assert_eq!(result.suggestions[0].code, DiagnosticCode::NoFeedFound);
}

// ============================================================================
// Input validation and totality
// ============================================================================

#[tokio::test]
async fn test_invalid_inputs_never_error() {
    let server = MockServer::start().await;
    let discovery = discovery_on(&server);

    for input in ["", "not a url", "ftp://example.com/feed", "http://"] {
        let result = discovery.discover_from_website(input).await;
        assert!(result.feeds.is_empty(), "input: {input:?}");
        assert_eq!(result.suggestions[0].code, DiagnosticCode::InvalidUrl);
    }
}

// ============================================================================
// Timeout enforcement
// ============================================================================

#[tokio::test]
async fn test_slow_server_times_out_and_call_stays_bounded() {
    let server = MockServer::start().await;
    // Every endpoint hangs far longer than the per-attempt timeout
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let discovery = discovery_on(&server);
    let request = DiscoveryRequest::new(format!("{}/slow", server.uri()))
        .with_timeout(Duration::from_millis(250));

    let started = Instant::now();
    let result = discovery.discover(&request).await;
    let elapsed = started.elapsed();

    // One direct attempt plus two relay attempts at 250ms each, with slack
    assert!(
        elapsed < Duration::from_secs(5),
        "call took {elapsed:?}, expected to be bounded by per-attempt timeouts"
    );
    assert!(result.feeds.is_empty());
    let unreachable = result
        .suggestions
        .iter()
        .find(|s| s.code == DiagnosticCode::SiteUnreachable)
        .expect("timeout should surface as SITE_UNREACHABLE");
    assert!(unreachable.detail.contains("timed out"));
}
