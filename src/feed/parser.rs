use chrono::{DateTime, Utc};
use feed_rs::model::FeedType;
use serde::Serialize;
use thiserror::Error;

/// Syndication format a payload was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    Rss,
    Atom,
    JsonFeed,
}

/// One entry of a parsed feed, in document order.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    /// Publish time normalized to UTC; `None` when the document's date was
    /// absent or unparsable (the item is kept either way).
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub image: Option<String>,
}

/// A successfully recognized feed.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    /// Non-empty after normalization: document title, else the source URL's
    /// host, else the source URL itself.
    pub title: String,
    pub source_url: String,
    pub items: Vec<FeedItem>,
}

/// Errors from attempting to recognize a payload as a feed.
///
/// `Html` is a distinct variant because the orchestrator branches on it:
/// an HTML page goes to link sniffing, an unrecognizable payload is terminal
/// for that URL.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The payload is an HTML page rather than a feed document.
    #[error("payload is an HTML page, not a feed")]
    Html,
    /// The payload matches no supported format or its markup is malformed.
    #[error("not a feed: {0}")]
    NotAFeed(String),
}

/// What the declared Content-Type (or, failing that, the document's root
/// structure) says the payload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatHint {
    Feed,
    Html,
    Unknown,
}

/// Attempts to parse a payload as RSS, Atom, or JSON Feed.
///
/// The declared content type takes precedence; when it is absent or
/// ambiguous the document's root structure is sniffed. Parsing is tolerant:
/// unknown elements are ignored and missing optional fields default.
///
/// # Errors
///
/// - [`ParseError::Html`] when the payload is an HTML page (declared or
///   sniffed); the caller should scan it for feed links instead.
/// - [`ParseError::NotAFeed`] when no supported root structure matches or
///   the markup is not well-formed.
pub fn parse(
    raw: &[u8],
    declared_content_type: Option<&str>,
    source_url: &str,
) -> Result<ParsedFeed, ParseError> {
    let hint = declared_content_type
        .map(classify_content_type)
        .unwrap_or(FormatHint::Unknown);

    let hint = match hint {
        FormatHint::Unknown => sniff_root_structure(raw),
        h => h,
    };

    if hint == FormatHint::Html {
        return Err(ParseError::Html);
    }

    // FormatHint::Feed and the residual Unknown both go to the real parser;
    // a truly ambiguous payload gets its one chance to be a feed here.
    parse_feed_bytes(raw, source_url)
}

/// Maps a declared Content-Type to a coarse format hint.
fn classify_content_type(content_type: &str) -> FormatHint {
    let ct = content_type.to_lowercase();

    if ct.contains("application/rss+xml")
        || ct.contains("application/atom+xml")
        || ct.contains("application/xml")
        || ct.contains("text/xml")
        || ct.contains("application/feed+json")
        || ct.contains("application/json")
    {
        return FormatHint::Feed;
    }

    if ct.contains("text/html") || ct.contains("application/xhtml") {
        return FormatHint::Html;
    }

    FormatHint::Unknown
}

/// Sniffs the document's root structure when the content type is missing or
/// ambiguous: `<rss>`/`<feed>`/`<rdf:RDF>` roots mean XML feed, a JSON object
/// with `version`/`feed_url`/`items` keys means JSON Feed, `<html>` or an
/// HTML doctype means page.
fn sniff_root_structure(raw: &[u8]) -> FormatHint {
    let text = String::from_utf8_lossy(raw);
    let head: String = text
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(512)
        .collect::<String>()
        .to_lowercase();

    if head.starts_with('{') {
        if head.contains("\"version\"") || head.contains("\"feed_url\"") || head.contains("\"items\"")
        {
            return FormatHint::Feed;
        }
        return FormatHint::Unknown;
    }

    if head.starts_with('<') {
        if head.contains("<!doctype html") || head.contains("<html") {
            return FormatHint::Html;
        }
        if head.contains("<rss") || head.contains("<feed") || head.contains("<rdf") {
            return FormatHint::Feed;
        }
    }

    FormatHint::Unknown
}

/// Runs feed-rs over the payload and maps its model to [`ParsedFeed`].
fn parse_feed_bytes(raw: &[u8], source_url: &str) -> Result<ParsedFeed, ParseError> {
    let feed = feed_rs::parser::parse(raw).map_err(|e| ParseError::NotAFeed(e.to_string()))?;

    let format = match feed.feed_type {
        FeedType::Atom => FeedFormat::Atom,
        FeedType::JSON => FeedFormat::JsonFeed,
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => FeedFormat::Rss,
    };

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| fallback_title(source_url));

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated);
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            let image = entry.media.iter().find_map(|m| {
                m.thumbnails
                    .first()
                    .map(|t| t.image.uri.clone())
                    .or_else(|| {
                        m.content
                            .iter()
                            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
                    })
            });
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_owned());

            FeedItem {
                title,
                link,
                published,
                summary,
                image,
            }
        })
        .collect();

    Ok(ParsedFeed {
        format,
        title,
        source_url: source_url.to_owned(),
        items,
    })
}

/// Title fallback when the document supplies none: the source host, then the
/// URL itself. The result is never empty.
fn fallback_title(source_url: &str) -> String {
    url::Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_owned()))
        .unwrap_or_else(|| source_url.to_owned())
}
