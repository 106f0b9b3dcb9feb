//! Up2Pay: signed payment forms and callback verification for the
//! e-transactions (Paybox / Up2Pay) hosted payment page.
//!
//! The gateway works by redirection. The merchant site posts an HTML form of
//! `PBX_*` fields to a bank-hosted page; the fields are authenticated with an
//! HMAC-SHA512 digest keyed by a secret shared with the bank. Once the payer
//! is done, the gateway calls the merchant back with a query string signed
//! with the gateway's RSA key.
//!
//! # Architecture
//!
//! ```text
//!  PaymentParameters ──► OutboundRequest ──► Up2Pay::form ──► PaymentForm
//!                        (format, crypto)    (endpoint probe)  (url + hidden inputs)
//!
//!  callback URL ──► parse_callback ──► CallbackValidator ──► accepted?
//!                                      (RSA/SHA1, codes)
//! ```
//!
//! - [`format`]: amount, timestamp and XML field encodings
//! - [`crypto`]: HMAC digest and RSA signature verification
//! - [`request`]: ordered, signed field set
//! - [`endpoint`]: primary/fallback host selection
//! - [`callback`]: callback parsing and payment acceptance
//! - [`codes`]: response code messages
//! - [`config`]: TOML configuration
//! - [`gateway`]: the [`Up2Pay`] facade
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use up2pay::{Up2Pay, callback::CallbackValidator, config::Up2PayConfig, request::PaymentParameters};
//!
//! # async fn example(config_toml: &str, callback_url: &str) -> up2pay::Result<()> {
//! let config = Up2PayConfig::from_toml(config_toml)?;
//!
//! // Outbound: render the form that redirects the payer.
//! let params = PaymentParameters::new(config.merchant.clone(), 5000_u64, "order-42", "buyer@example.com");
//! let form = Up2Pay::create(params, &config.gateway)?.form().await;
//! println!("POST {} with {} fields", form.url, form.elements.len());
//!
//! // Inbound: check the notification before fulfilling the order.
//! let validator = CallbackValidator::from_config(&config.gateway)?;
//! let result = up2pay::callback::parse_callback(callback_url);
//! if validator.is_payment_accepted(&result, 5000) {
//!     println!("order {} paid", result.payment_id);
//! } else {
//!     println!("payment failed: {}", result.error_text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - The HMAC key is zeroized on drop and redacted from `Debug` output
//! - Callback signatures are checked with a key parsed once and shared
//! - A failed verification is `false`, never a panic or an error
//! - Only [`is_payment_accepted`](callback::CallbackValidator::is_payment_accepted)
//!   should gate order fulfilment; the browser return URLs can be forged

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod callback;
pub mod codes;
pub mod config;
pub mod crypto;
pub mod endpoint;
pub mod error;
pub mod format;
pub mod gateway;
pub mod request;

pub use callback::{CallbackResult, CallbackValidator, parse_callback};
pub use codes::lookup_error_text;
pub use config::{GatewayConfig, MerchantConfig, Up2PayConfig};
pub use error::{Result, Up2PayError};
pub use gateway::{PaymentForm, Up2Pay};
pub use request::{OutboundRequest, PaymentParameters};

#[cfg(test)]
mod tests;
