//! Merchant and gateway configuration.
//!
//! Both structures deserialize from TOML. A complete file looks like:
//!
//! ```toml
//! [merchant]
//! sandbox = true
//! site = "1999888"
//! rank = "32"
//! identifier = "1686319"
//! hmac_key = "0123456789abcdef..."
//!
//! [merchant.urls]
//! success = "https://shop.example.com/payment/success"
//! refused = "https://shop.example.com/payment/error"
//! cancelled = "https://shop.example.com/payment/cancelled"
//! waiting = "https://shop.example.com/payment/waiting"
//! notification = "https://shop.example.com/payment/process"
//!
//! [gateway]
//! probe_timeout_secs = 5
//!
//! [gateway.base_urls.sandbox]
//! main = "https://preprod-tpeweb.e-transactions.fr"
//! fallback = "https://preprod-tpeweb.e-transactions.fr"
//! ```
//!
//! The `[gateway]` table is optional; defaults point at the e-transactions
//! platform and embed its public key.

use std::{fmt, time::Duration};

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::{
    crypto::{GatewayPublicKey, decode_secret},
    endpoint::{BaseUrls, DEFAULT_PROBE_TIMEOUT, Environment},
    error::{Result, Up2PayError},
};

/// Public key the gateway signs callbacks with (1024-bit RSA, SPKI PEM).
pub const DEFAULT_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDe+hkicNP7ROHUssGNtHwiT2Ew
HFrSk/qwrcq8v5metRtTTFPE/nmzSkRnTs3GMpi57rBdxBBJW5W9cpNyGUh0jNXc
VrOSClpD5Ri2hER/GcNrxVRP7RlWOqB1C03q4QYmwjHZ+zlM4OUhCCAtSWflB4wC
Ka1g88CjFwRw/PB9kwIDAQAB
-----END PUBLIC KEY-----";

/// Hex-encoded HMAC key shared with the gateway.
///
/// Wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "String")]
pub struct HmacSecret(Zeroizing<String>);

impl HmacSecret {
    /// Wraps a hex-encoded key.
    #[must_use]
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(Zeroizing::new(hex_key.into()))
    }

    /// Returns the hex-encoded key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` when no key is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for HmacSecret {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for HmacSecret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("HmacSecret(<empty>)")
        } else {
            f.write_str("HmacSecret(<redacted>)")
        }
    }
}

/// Browser and server-to-server callback URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackUrls {
    /// Browser return after an accepted payment (`PBX_EFFECTUE`).
    pub success: String,
    /// Browser return after a refused payment (`PBX_REFUSE`).
    pub refused: String,
    /// Browser return after a cancelled payment (`PBX_ANNULE`).
    pub cancelled: String,
    /// Browser return while the payment is pending (`PBX_ATTENTE`).
    pub waiting: String,
    /// Server-to-server notification URL (`PBX_REPONDRE_A`).
    pub notification: String,
}

impl CallbackUrls {
    /// Checks that every callback is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::InvalidParameter`] naming the first bad URL.
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("success", &self.success),
            ("refused", &self.refused),
            ("cancelled", &self.cancelled),
            ("waiting", &self.waiting),
            ("notification", &self.notification),
        ];

        for (name, value) in urls {
            if value.is_empty() {
                return Err(Up2PayError::InvalidParameter(format!(
                    "{name} callback URL cannot be empty"
                )));
            }
            let url = Url::parse(value).map_err(|e| {
                Up2PayError::InvalidParameter(format!("invalid {name} callback URL '{value}': {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Up2PayError::InvalidParameter(format!(
                    "{name} callback URL must use http(s), got: {}",
                    url.scheme()
                )));
            }
        }

        Ok(())
    }
}

/// Merchant account settings issued by the bank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MerchantConfig {
    /// Use the sandbox ("recette") platform.
    #[serde(default)]
    pub sandbox: bool,

    /// Site number (`PBX_SITE`), 7 digits.
    pub site: String,

    /// Rank number (`PBX_RANG`), 2 digits.
    pub rank: String,

    /// Merchant identifier (`PBX_IDENTIFIANT`), 1 to 9 digits.
    pub identifier: String,

    /// HMAC key from the merchant back office. An empty key produces unsigned
    /// requests, which only make sense offline.
    #[serde(default)]
    pub hmac_key: HmacSecret,

    /// Callback URLs.
    pub urls: CallbackUrls,
}

impl MerchantConfig {
    /// Returns the environment selected by [`sandbox`](Self::sandbox).
    #[must_use]
    pub const fn environment(&self) -> Environment {
        Environment::from_sandbox(self.sandbox)
    }

    /// Validates identifiers, HMAC key and callback URLs.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::InvalidParameter`] for malformed identifiers,
    /// URLs or an HMAC key that is not hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use up2pay::config::MerchantConfig;
    ///
    /// let config = MerchantConfig { site: "12".to_owned(), ..MerchantConfig::default() };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        validate_digits("site", &self.site, 7, 7)?;
        validate_digits("rank", &self.rank, 2, 2)?;
        validate_digits("identifier", &self.identifier, 1, 9)?;

        if !self.hmac_key.is_empty() {
            decode_secret(self.hmac_key.expose())
                .map_err(|e| Up2PayError::InvalidParameter(format!("hmac_key: {e}")))?;
        }

        self.urls.validate()
    }
}

/// Checks that `value` is made of `min..=max` ASCII digits.
fn validate_digits(name: &str, value: &str, min: usize, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Up2PayError::InvalidParameter(format!("{name} cannot be empty")));
    }

    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Up2PayError::InvalidParameter(format!(
            "{name} must contain only digits: {value:?}"
        )));
    }

    if value.len() < min || value.len() > max {
        let expected = if min == max { format!("{min}") } else { format!("{min} to {max}") };
        return Err(Up2PayError::InvalidParameter(format!(
            "{name} must have {expected} digits, got {}",
            value.len()
        )));
    }

    Ok(())
}

/// Gateway-side settings: hosts, callback signing key and probe timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Hosts for both environments.
    pub base_urls: BaseUrls,

    /// PEM public key used to verify callback signatures.
    pub public_key_pem: String,

    /// Liveness probe timeout in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_urls: BaseUrls::default(),
            public_key_pem: DEFAULT_PUBLIC_KEY_PEM.to_owned(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl GatewayConfig {
    /// Parses a gateway configuration from TOML. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::ConfigError`] if the TOML is invalid or fails
    /// [`validate`](Self::validate).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| Up2PayError::ConfigError(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Liveness probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Parses the configured public key.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::CryptoError`] if the PEM cannot be parsed.
    pub fn public_key(&self) -> Result<GatewayPublicKey> {
        GatewayPublicKey::from_pem(&self.public_key_pem)
    }

    /// Validates hosts, timeout and public key.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::ConfigError`] for invalid hosts or a zero timeout,
    /// [`Up2PayError::CryptoError`] for an unusable key.
    pub fn validate(&self) -> Result<()> {
        self.base_urls.validate()?;
        if self.probe_timeout_secs == 0 {
            return Err(Up2PayError::ConfigError(
                "probe_timeout_secs must be greater than zero".to_owned(),
            ));
        }
        self.public_key().map(|_| ())
    }
}

/// Complete configuration file: merchant account plus optional gateway table.
#[derive(Debug, Clone, Deserialize)]
pub struct Up2PayConfig {
    /// Merchant account.
    pub merchant: MerchantConfig,

    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Up2PayConfig {
    /// Parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::ConfigError`] for invalid TOML, or the error of
    /// the first failing validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use up2pay::config::Up2PayConfig;
    ///
    /// let config = Up2PayConfig::from_toml(
    ///     r#"
    ///     [merchant]
    ///     site = "1999888"
    ///     rank = "32"
    ///     identifier = "1686319"
    ///
    ///     [merchant.urls]
    ///     success = "https://shop.example.com/ok"
    ///     refused = "https://shop.example.com/ko"
    ///     cancelled = "https://shop.example.com/cancel"
    ///     waiting = "https://shop.example.com/wait"
    ///     notification = "https://shop.example.com/ipn"
    /// "#,
    /// )?;
    /// assert!(!config.merchant.sandbox);
    /// assert_eq!(config.gateway.probe_timeout_secs, 5);
    /// # Ok::<(), up2pay::Up2PayError>(())
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| Up2PayError::ConfigError(format!("failed to parse TOML: {e}")))?;
        config.merchant.validate()?;
        config.gateway.validate()?;
        Ok(config)
    }
}
