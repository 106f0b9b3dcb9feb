//! Error types for the Up2Pay integration.
//!
//! Only request construction, configuration loading and transport setup are
//! fallible. Checking a callback signature is a predicate and returns `bool`
//! instead of an error, see [`crate::crypto::verify_signature`].
//!
//! # Error Categories
//!
//! - **Validation Errors** ([`Up2PayError::InvalidParameter`]): caller input
//!   rejected before a request is built
//! - **Cryptographic Errors** ([`Up2PayError::CryptoError`]): key material
//!   that cannot be decoded
//! - **Network Errors** ([`Up2PayError::HttpError`]): HTTP client setup failures
//! - **Configuration Errors** ([`Up2PayError::ConfigError`]): malformed TOML or
//!   invalid URLs in configuration
//!
//! # Examples
//!
//! ```
//! use up2pay::error::{Result, Up2PayError};
//!
//! fn require_site(site: &str) -> Result<&str> {
//!     if site.is_empty() {
//!         return Err(Up2PayError::InvalidParameter("site cannot be empty".to_owned()));
//!     }
//!     Ok(site)
//! }
//!
//! assert!(require_site("").is_err());
//! ```

use thiserror::Error;

/// Result type alias for Up2Pay operations.
pub type Result<T> = std::result::Result<T, Up2PayError>;

/// Errors that can occur while preparing a payment or loading configuration.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum Up2PayError {
    /// A payment parameter was rejected.
    ///
    /// Raised when building an [`OutboundRequest`](crate::request::OutboundRequest)
    /// from parameters the gateway would refuse: missing or malformed merchant
    /// identifiers, an amount that is not a non-negative integer, an empty
    /// reference or callback URL.
    ///
    /// # Recovery
    ///
    /// Fix the input. Retrying with the same parameters fails the same way.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Key material could not be decoded.
    ///
    /// Common causes:
    /// - HMAC secret is not valid hexadecimal
    /// - Gateway public key PEM is malformed or not an RSA key
    #[error("Cryptographic operation failed: {0}")]
    CryptoError(String),

    /// HTTP client failure.
    ///
    /// Wraps [`reqwest::Error`]. The liveness probe itself never surfaces this
    /// error (it falls back to the secondary host); it is only returned when
    /// the HTTP client cannot be constructed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration could not be loaded.
    ///
    /// # Examples
    ///
    /// ```
    /// use up2pay::error::Up2PayError;
    ///
    /// let err = Up2PayError::ConfigError("missing field `site`".to_owned());
    /// assert!(err.to_string().contains("Invalid configuration"));
    /// ```
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Up2PayError::InvalidParameter("amount is not a number".into());
        assert_eq!(error.to_string(), "Invalid parameter: amount is not a number");
    }

    #[test]
    fn test_crypto_error() {
        let error = Up2PayError::CryptoError("bad hex".into());
        assert!(error.to_string().contains("Cryptographic operation failed"));
    }

    #[test]
    fn test_config_error() {
        let error = Up2PayError::ConfigError("expected table".to_owned());
        assert_eq!(error.to_string(), "Invalid configuration: expected table");
    }
}
