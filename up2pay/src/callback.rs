//! Inbound callback parsing and validation.
//!
//! After a payment the gateway redirects the browser (and calls the
//! notification URL) with the variables requested in `PBX_RETOUR` appended as
//! a query string. The last variable, `signature`, is a base64 SHA1withRSA
//! signature over the raw query text that precedes it.
//!
//! # Examples
//!
//! ```
//! use up2pay::callback::{CallbackValidator, parse_callback};
//!
//! let url = "https://shop.example.com/payment/success?amount=5000&paymentId=42\
//!            &authorizationId=XXXXXX&error=00000&signature=AAAA";
//!
//! let result = parse_callback(url);
//! assert_eq!(result.amount, "5000");
//! assert_eq!(result.error, "00000");
//! assert_eq!(result.card_type, "");
//!
//! let validator = CallbackValidator::with_default_key()?;
//! assert!(!validator.validate_callback(url));
//! assert!(!validator.is_payment_accepted(&result, 5000));
//! # Ok::<(), up2pay::Up2PayError>(())
//! ```

use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::{Url, form_urlencoded};

use crate::{
    codes::{self, lookup_error_text},
    config::{DEFAULT_PUBLIC_KEY_PEM, GatewayConfig},
    crypto::GatewayPublicKey,
    error::Result,
    format::parse_leading_int,
};

/// Separator in front of the signature parameter.
const SIGNATURE_MARKER: &str = "&signature";

/// Fields returned by the gateway on a callback.
///
/// Parameters absent from the query are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResult {
    /// Amount in minor units (`M`).
    pub amount: String,
    /// Merchant order reference (`R`).
    pub payment_id: String,
    /// Gateway call number (`T`).
    pub transaction_id: String,
    /// Authorization number, empty when the payment was not authorized (`A`).
    pub authorization_id: String,
    /// Card type (`C`).
    pub card_type: String,
    /// First six digits of the card number (`N`).
    pub card_number: String,
    /// Card expiry, `YYMM` (`D`).
    pub card_expiration: String,
    /// Response code, `00000` on success (`E`).
    pub error: String,
    /// Gateway transaction number (`S`).
    pub paybox_ref: String,
    /// Processing date, `DDMMYYYY` (`W`).
    pub date: String,
    /// Processing time, `HH:MM:SS` (`Q`).
    pub time: String,
    /// Base64 signature (`K`).
    pub signature: String,
    /// Raw query text covered by the signature.
    #[serde(skip)]
    pub signed_message: String,
}

impl CallbackResult {
    /// Human-readable text for [`error`](Self::error).
    #[must_use]
    pub fn error_text(&self) -> String {
        lookup_error_text(&self.error).into_owned()
    }
}

/// Returns the query part of an absolute URL, a path with query, or a bare
/// query string. A leading `?` and any fragment are removed.
///
/// Only URLs and paths are cut at their first `?`; a bare query is kept whole
/// since `paymentId` may carry a raw `?`.
fn query_of(input: &str) -> &str {
    let query = if let Some(bare) = input.strip_prefix('?') {
        bare
    } else if input.starts_with('/') || Url::parse(input).is_ok() {
        input.split_once('?').map_or("", |(_, query)| query)
    } else {
        input
    };
    query.split_once('#').map_or(query, |(query, _)| query)
}

/// Returns the raw query text before the last `&signature`.
fn signed_part(query: &str) -> &str {
    query.rfind(SIGNATURE_MARKER).map_or(query, |end| &query[..end])
}

/// Parses a callback URL into its fields.
///
/// Accepts an absolute URL, a path with a query, or a bare query string.
/// Values are percent-decoded; the first occurrence of a parameter wins.
/// Form decoding turns `+` into a space, which is reverted for the signature
/// since base64 never contains spaces.
#[must_use]
pub fn parse_callback(url: &str) -> CallbackResult {
    let query = query_of(url);
    let mut result = CallbackResult {
        signed_message: signed_part(query).to_owned(),
        ..CallbackResult::default()
    };
    let mut seen: Vec<String> = Vec::new();

    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        if seen.iter().any(|known| *known == name) {
            continue;
        }
        let slot = match &*name {
            "amount" => &mut result.amount,
            "paymentId" => &mut result.payment_id,
            "transactionId" => &mut result.transaction_id,
            "authorizationId" => &mut result.authorization_id,
            "cardType" => &mut result.card_type,
            "cardNumber" => &mut result.card_number,
            "cardExpiration" => &mut result.card_expiration,
            "error" => &mut result.error,
            "payboxRef" => &mut result.paybox_ref,
            "date" => &mut result.date,
            "time" => &mut result.time,
            "signature" => &mut result.signature,
            _ => continue,
        };
        *slot = value.into_owned();
        seen.push(name.into_owned());
    }

    result.signature = result.signature.replace(' ', "+");
    result
}

/// Checks a signature over a callback message.
///
/// Implemented by [`GatewayPublicKey`]. Tests substitute a stub.
pub trait SignatureCheck: Send + Sync {
    /// Returns `true` when `signature_b64` is a valid signature of `message`.
    fn verify(&self, message: &str, signature_b64: &str) -> bool;
}

impl SignatureCheck for GatewayPublicKey {
    fn verify(&self, message: &str, signature_b64: &str) -> bool {
        Self::verify(self, message, signature_b64)
    }
}

/// Validates callbacks against the gateway key.
#[derive(Debug, Clone)]
pub struct CallbackValidator<V: SignatureCheck = GatewayPublicKey> {
    verifier: V,
}

impl CallbackValidator {
    /// Creates a validator using the key from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::CryptoError`](crate::Up2PayError::CryptoError)
    /// if the configured PEM is not a usable RSA public key.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::new(config.public_key()?))
    }

    /// Creates a validator using the built-in gateway key.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::CryptoError`](crate::Up2PayError::CryptoError)
    /// if the built-in key cannot be parsed.
    pub fn with_default_key() -> Result<Self> {
        Ok(Self::new(GatewayPublicKey::from_pem(DEFAULT_PUBLIC_KEY_PEM)?))
    }
}

impl<V: SignatureCheck> CallbackValidator<V> {
    /// Creates a validator with a custom signature check.
    #[must_use]
    pub const fn new(verifier: V) -> Self {
        Self { verifier }
    }

    /// Verifies a signature over a message the caller extracted.
    #[must_use]
    pub fn message_is_valid(&self, message: &str, signature_b64: &str) -> bool {
        self.verifier.verify(message, signature_b64)
    }

    /// Verifies the signature of a parsed callback.
    #[must_use]
    pub fn signature_is_valid(&self, result: &CallbackResult) -> bool {
        self.message_is_valid(&result.signed_message, &result.signature)
    }

    /// Verifies the signature of a callback URL.
    ///
    /// The signed message is the raw query text before the last `&signature`.
    #[must_use]
    #[instrument(skip(self, url))]
    pub fn validate_callback(&self, url: &str) -> bool {
        let result = parse_callback(url);
        let valid = self.signature_is_valid(&result);
        if !valid {
            warn!(payment_id = %result.payment_id, "callback signature rejected");
        }
        valid
    }

    /// Decides whether a callback confirms a payment of `expected_amount`.
    ///
    /// Requires a non-empty authorization number, response code `00000`, the
    /// leading integer of `amount` equal to `expected_amount` and a valid
    /// signature. The signature is checked last.
    #[must_use]
    pub fn is_payment_accepted(&self, result: &CallbackResult, expected_amount: i64) -> bool {
        if result.authorization_id.is_empty() {
            debug!(payment_id = %result.payment_id, "no authorization number");
            return false;
        }

        if result.error != codes::ACCEPTED {
            debug!(payment_id = %result.payment_id, code = %result.error, "payment not accepted");
            return false;
        }

        if parse_leading_int(&result.amount) != Some(expected_amount) {
            debug!(
                payment_id = %result.payment_id,
                amount = %result.amount,
                expected_amount,
                "amount mismatch"
            );
            return false;
        }

        self.signature_is_valid(result)
    }
}
