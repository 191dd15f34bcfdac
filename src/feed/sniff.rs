use crate::util::normalize_url;
use std::collections::HashSet;

/// Conventional feed locations probed when a page advertises nothing.
/// Tried after document `<link>` candidates, rooted at the site origin.
const CONVENTIONAL_PATHS: &[&str] = &["/feed", "/rss", "/rss.xml", "/atom.xml"];

/// Extracts candidate feed URLs from an HTML page.
///
/// Candidates, in order:
/// 1. `<link rel="alternate">` tags with an RSS/Atom/JSON Feed type, in
///    document order, resolved against `base_url`;
/// 2. the conventional paths (`/feed`, `/rss`, `/rss.xml`, `/atom.xml`)
///    rooted at the page's origin.
///
/// The list is deduplicated by normalized absolute URL, and never contains
/// the page URL itself (it was already fetched and classified).
pub fn extract_candidates(html: &str, base_url: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    if let Some(base_key) = normalize_url(base_url) {
        seen.insert(base_key);
    }

    let push = |candidate: String, seen: &mut HashSet<String>, out: &mut Vec<String>| {
        if let Some(key) = normalize_url(&candidate) {
            if seen.insert(key) {
                out.push(candidate);
            }
        }
    };

    for href in find_feed_links_in_html(html, base_url) {
        push(href, &mut seen, &mut candidates);
    }

    if let Ok(base) = url::Url::parse(base_url) {
        for path in CONVENTIONAL_PATHS {
            if let Ok(joined) = base.join(path) {
                push(joined.to_string(), &mut seen, &mut candidates);
            }
        }
    }

    candidates
}

/// Scans HTML for `<link rel="alternate">` tags with a feed type and returns
/// every matching href resolved to an absolute URL, in document order.
///
/// Uses simple string scanning (no HTML parser dependency). Handles attribute
/// ordering variations and both quote styles.
fn find_feed_links_in_html(html: &str, base_url: &str) -> Vec<String> {
    let html_lower = html.to_lowercase();
    let mut found = Vec::new();
    let mut search_from = 0;

    while let Some(link_start) = html_lower[search_from..].find("<link") {
        let abs_start = search_from + link_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = match remaining.find('>') {
            Some(pos) => pos,
            None => break,
        };

        let tag = &remaining[..=tag_end];

        if contains_attr(tag, "rel", "alternate") && is_feed_type(tag) {
            // Extract href from the original (non-lowered) HTML to preserve
            // URL case. Lowercasing can shift byte offsets for some non-ASCII
            // text; a range that no longer lands on a char boundary skips the tag.
            if let Some(original_tag) = html.get(abs_start..abs_start + tag_end + 1) {
                if let Some(href) = extract_attr_value(original_tag, "href") {
                    found.push(resolve_url(href, base_url));
                }
            }
        }

        search_from = abs_start + tag_end + 1;
    }

    found
}

/// Checks if a lowercased tag contains an attribute with the given value.
fn contains_attr(tag: &str, attr_name: &str, attr_value: &str) -> bool {
    // Match: attr_name="attr_value" or attr_name='attr_value'
    let pattern_double = format!("{attr_name}=\"{attr_value}\"");
    let pattern_single = format!("{attr_name}='{attr_value}'");
    tag.contains(&pattern_double) || tag.contains(&pattern_single)
}

/// Checks if a lowercased `<link>` tag advertises a syndication type.
fn is_feed_type(tag: &str) -> bool {
    tag.contains("application/rss+xml")
        || tag.contains("application/atom+xml")
        || tag.contains("application/feed+json")
        || tag.contains("application/json")
}

/// Extracts the value of an attribute from a tag string (case-preserving).
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_lowercase();
    let attr_prefix = format!("{attr_name}=");

    let attr_start = tag_lower.find(&attr_prefix)?;
    let value_start = attr_start + attr_prefix.len();

    let rest = tag.get(value_start..)?;
    let quote = rest.as_bytes().first()?;

    if *quote != b'"' && *quote != b'\'' {
        return None;
    }

    let quote_char = *quote as char;
    let inner = &rest[1..];
    let end = inner.find(quote_char)?;

    Some(&inner[..end])
}

/// Resolves a potentially relative URL against a base URL.
fn resolve_url(href: &str, base_url: &str) -> String {
    // Already absolute
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }

    // Protocol-relative: normalize through the URL parser
    if href.starts_with("//") {
        let with_scheme = format!("https:{}", href);
        if let Ok(parsed) = url::Url::parse(&with_scheme) {
            return parsed.to_string();
        }
    }

    // Relative URL: resolve against base
    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    // Fallback: return as-is
    href.to_owned()
}
