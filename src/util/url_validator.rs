use thiserror::Error;
use url::Url;

/// Errors that can occur during target URL validation.
///
/// Validation is purely syntactic: discovery talks to arbitrary public sites
/// through third-party relays, so the contract is "a well-formed absolute
/// http(s) URL with a host", nothing more. A failure here means no network
/// call is ever attempted for the input.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component (e.g., `http://`).
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a discovery target.
///
/// # Errors
///
/// Returns [`UrlValidationError`] if:
/// - The URL cannot be parsed ([`UrlValidationError::InvalidUrl`])
/// - The scheme is not `http` or `https` ([`UrlValidationError::UnsupportedScheme`])
/// - The URL lacks a host ([`UrlValidationError::MissingHost`])
///
/// # Examples
///
/// ```
/// use feedscout::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// // Rejects non-HTTP schemes
/// assert!(validate_url("file:///etc/passwd").is_err());
///
/// // Rejects relative references
/// assert!(validate_url("/feed.xml").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlValidationError::MissingHost),
    }

    Ok(url)
}

/// Normalizes a URL string for deduplication of candidate feed locations.
///
/// Two markup references to the same feed (`/feed` vs `https://example.com/feed`,
/// trailing-slash variants of the root path) must resolve to one network call.
/// Parsing through [`Url`] canonicalizes scheme/host case, default ports, and
/// path encoding; the result is the comparison key.
///
/// Returns `None` for strings that do not parse as absolute URLs.
pub fn normalize_url(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    Some(url.to_string())
}
