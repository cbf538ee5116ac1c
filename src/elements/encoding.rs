//! Route path and file path encodings.
//!
//! # Route paths
//! ```text
//! /          → R/_root
//! /_about    → R/__about
//! /blog/1    → R/blog/1
//! ```
//!
//! # File paths
//! ```text
//! ""         → _.txt
//! /about     → _/about.txt
//! /docs/     → _/docs/_.txt
//! R/v1_      → R/v1__.txt
//! ```
//!
//! # Design Decisions
//! - Both encodings are exact inverses of their decoders
//! - Decoding input without the prefix/extension is a protocol violation
//!   (400-class), never silently accepted

use thiserror::Error;

/// Marks a request key as "fetch this route's elements".
pub const ROUTE_PATH_PREFIX: &str = "R";

/// Extension used for persisted elements maps.
pub const ELEMENTS_FILE_EXTENSION: &str = ".txt";

/// Errors raised while decoding encoded paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Invalid encoded route path: {0}")]
    MissingPrefix(String),

    #[error("Invalid file path, expected extension {extension}: {path}")]
    MissingExtension { path: String, extension: String },

    #[error("Path must be absolute: {0}")]
    NotAbsolute(String),
}

impl EncodingError {
    /// HTTP status class these errors map to.
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// Encode an absolute route path as a request key.
pub fn encode_route_path(path: &str) -> Result<String, EncodingError> {
    if !path.starts_with('/') {
        return Err(EncodingError::NotAbsolute(path.to_string()));
    }
    if path == "/" {
        return Ok(format!("{}/_root", ROUTE_PATH_PREFIX));
    }
    if path.starts_with("/_") {
        return Ok(format!("{}/_{}", ROUTE_PATH_PREFIX, &path[1..]));
    }
    Ok(format!("{}{}", ROUTE_PATH_PREFIX, path))
}

/// Inverse of [`encode_route_path`].
pub fn decode_route_path(encoded: &str) -> Result<String, EncodingError> {
    let rest = encoded
        .strip_prefix(ROUTE_PATH_PREFIX)
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| EncodingError::MissingPrefix(encoded.to_string()))?;
    if rest == "/_root" {
        return Ok("/".to_string());
    }
    if let Some(stripped) = rest.strip_prefix("/_") {
        return Ok(format!("/{}", stripped));
    }
    Ok(rest.to_string())
}

/// Encode a route key as a relative file path ending in `extension`.
///
/// A key starting with `/` or `_` gains a leading `_`, one ending with `/`
/// or `_` gains a trailing `_`, so every key maps to a distinct file.
pub fn encode_file_path(path: &str, extension: &str) -> String {
    if path.is_empty() {
        return format!("_{}", extension);
    }
    let mut encoded = String::with_capacity(path.len() + extension.len() + 2);
    if path.starts_with(['/', '_']) {
        encoded.push('_');
    }
    encoded.push_str(path);
    if path.ends_with(['/', '_']) {
        encoded.push('_');
    }
    encoded.push_str(extension);
    encoded
}

/// Inverse of [`encode_file_path`].
pub fn decode_file_path(file_path: &str, extension: &str) -> Result<String, EncodingError> {
    let mut decoded = file_path
        .strip_suffix(extension)
        .ok_or_else(|| EncodingError::MissingExtension {
            path: file_path.to_string(),
            extension: extension.to_string(),
        })?;
    if let Some(rest) = decoded.strip_prefix('_') {
        decoded = rest;
    }
    if let Some(rest) = decoded.strip_suffix('_') {
        decoded = rest;
    }
    Ok(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_path_encoding() {
        assert_eq!(encode_route_path("/").unwrap(), "R/_root");
        assert_eq!(encode_route_path("/_about").unwrap(), "R/__about");
        assert_eq!(encode_route_path("/blog/1").unwrap(), "R/blog/1");
        assert!(encode_route_path("relative").is_err());
    }

    #[test]
    fn test_route_path_round_trip() {
        for path in ["/", "/about", "/_private", "/a/b/c"] {
            assert_eq!(decode_route_path(&encode_route_path(path).unwrap()).unwrap(), path);
        }
    }

    #[test]
    fn test_decode_without_prefix_fails() {
        assert_eq!(
            decode_route_path("/about"),
            Err(EncodingError::MissingPrefix("/about".into()))
        );
        assert!(decode_route_path("Rabout").is_err());
    }

    #[test]
    fn test_file_path_encoding() {
        assert_eq!(encode_file_path("", ".txt"), "_.txt");
        assert_eq!(encode_file_path("/about", ".txt"), "_/about.txt");
        assert_eq!(encode_file_path("/docs/", ".txt"), "_/docs/_.txt");
        assert_eq!(encode_file_path("R/_root", ".txt"), "R/_root.txt");
        assert_eq!(encode_file_path("R/v1_", ".txt"), "R/v1__.txt");
        assert_eq!(encode_file_path("_x", ".txt"), "__x.txt");
    }

    #[test]
    fn test_file_path_round_trip() {
        for path in ["", "_", "__", "/", "/about", "/docs/", "R/blog/1", "R/_root", "_x", "R/v1_", "_x_"] {
            let encoded = encode_file_path(path, ".txt");
            assert_eq!(decode_file_path(&encoded, ".txt").unwrap(), path);
        }
    }

    #[test]
    fn test_trailing_underscore_route_gets_its_own_file() {
        let key = encode_route_path("/v1_").unwrap();
        assert_eq!(key, "R/v1_");
        let file = encode_file_path(&key, ELEMENTS_FILE_EXTENSION);
        assert_ne!(file, encode_file_path(&encode_route_path("/v1").unwrap(), ELEMENTS_FILE_EXTENSION));
        let decoded = decode_file_path(&file, ELEMENTS_FILE_EXTENSION).unwrap();
        assert_eq!(decode_route_path(&decoded).unwrap(), "/v1_");
    }

    #[test]
    fn test_decode_file_path_requires_extension() {
        let err = decode_file_path("_/about.html", ".txt").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
