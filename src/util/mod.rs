//! Utility functions for common operations.
//!
//! Currently this is URL handling: syntactic validation of discovery targets
//! and normalization for candidate deduplication.

mod url_validator;

pub use url_validator::{normalize_url, validate_url, UrlValidationError};
