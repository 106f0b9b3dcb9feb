//! Outbound payment request.
//!
//! An [`OutboundRequest`] is the ordered list of `PBX_*` fields posted to the
//! hosted payment page. The gateway recomputes `PBX_HMAC` over the other
//! fields in the order they were posted, so the order is fixed here and kept
//! in a `Vec` rather than a map.
//!
//! # Examples
//!
//! ```
//! use up2pay::{
//!     config::{CallbackUrls, MerchantConfig},
//!     request::{OutboundRequest, PaymentParameters},
//! };
//!
//! let merchant = MerchantConfig {
//!     sandbox: true,
//!     site: "1999888".to_owned(),
//!     rank: "32".to_owned(),
//!     identifier: "1686319".to_owned(),
//!     hmac_key: "0123456789abcdef".into(),
//!     urls: CallbackUrls {
//!         success: "https://shop.example.com/ok".to_owned(),
//!         refused: "https://shop.example.com/ko".to_owned(),
//!         cancelled: "https://shop.example.com/cancel".to_owned(),
//!         waiting: "https://shop.example.com/wait".to_owned(),
//!         notification: "https://shop.example.com/ipn".to_owned(),
//!     },
//! };
//!
//! let params = PaymentParameters::new(merchant, 5000_u64, "order-42", "buyer@example.com");
//! let request = OutboundRequest::build(&params)?;
//!
//! assert_eq!(request.get("PBX_TOTAL"), Some("0000005000"));
//! assert_eq!(request.digest().len(), 128);
//! # Ok::<(), up2pay::Up2PayError>(())
//! ```

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::MerchantConfig,
    crypto::{self, HASH_ALGORITHM},
    endpoint::{BaseUrls, Environment},
    error::{Result, Up2PayError},
    format::{self, Amount, Billing},
};

/// Name of the digest field, excluded from the signed chain.
pub const HMAC_FIELD: &str = "PBX_HMAC";

/// Payment page layout requested from the gateway.
pub const PAGE_SOURCE: &str = "RWD";

/// HTTP method the gateway uses for the server-to-server notification.
pub const NOTIFICATION_METHOD: &str = "POST";

/// Transaction currency (ISO 4217 numeric code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro, `978`.
    #[default]
    Eur,
    /// Pound sterling, `826`.
    Gbp,
    /// US dollar, `840`.
    Usd,
}

impl Currency {
    /// Returns the numeric code sent in `PBX_DEVISE`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "978",
            Self::Gbp => "826",
            Self::Usd => "840",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Up2PayError;

    /// Accepts the alphabetic or numeric ISO 4217 code, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" | "978" => Ok(Self::Eur),
            "GBP" | "826" => Ok(Self::Gbp),
            "USD" | "840" => Ok(Self::Usd),
            other => Err(Up2PayError::InvalidParameter(format!("unsupported currency: {other}"))),
        }
    }
}

/// Everything needed to build one payment request.
#[derive(Debug, Clone)]
pub struct PaymentParameters {
    /// Merchant account, HMAC key and callback URLs.
    pub merchant: MerchantConfig,
    /// Amount in minor units.
    pub amount: Amount,
    /// Transaction currency.
    pub currency: Currency,
    /// Merchant order reference (`PBX_CMD`), echoed back as `paymentId`.
    pub reference: String,
    /// Payer email (`PBX_PORTEUR`).
    pub email: String,
    /// Billing address for 3-D Secure v2.
    pub billing: Billing,
    /// Number of items in the cart, as text. Unparseable values count as 1.
    pub total_quantity: String,
    /// Host override for this payment. `None` uses the gateway configuration.
    pub base_urls: Option<BaseUrls>,
}

impl PaymentParameters {
    /// Creates parameters with default currency, empty billing and one item.
    #[must_use]
    pub fn new(
        merchant: MerchantConfig,
        amount: impl Into<Amount>,
        reference: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            merchant,
            amount: amount.into(),
            currency: Currency::default(),
            reference: reference.into(),
            email: email.into(),
            billing: Billing::default(),
            total_quantity: "1".to_owned(),
            base_urls: None,
        }
    }

    /// Sets the billing address.
    #[must_use]
    pub fn with_billing(mut self, billing: Billing) -> Self {
        self.billing = billing;
        self
    }

    /// Sets the cart item count.
    #[must_use]
    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.total_quantity = quantity.into();
        self
    }

    /// Sets the currency.
    #[must_use]
    pub const fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Overrides the gateway hosts for this payment.
    #[must_use]
    pub fn with_base_urls(mut self, base_urls: BaseUrls) -> Self {
        self.base_urls = Some(base_urls);
        self
    }

    /// Environment selected by the merchant sandbox flag.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.merchant.environment()
    }

    fn validate(&self) -> Result<()> {
        self.merchant.validate()?;

        if self.reference.trim().is_empty() {
            return Err(Up2PayError::InvalidParameter("reference cannot be empty".to_owned()));
        }

        if self.email.trim().is_empty() {
            return Err(Up2PayError::InvalidParameter("email cannot be empty".to_owned()));
        }

        Ok(())
    }
}

/// One hidden form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormElement {
    /// Wire name (`PBX_*`).
    pub name: String,
    /// Field value, unescaped.
    pub value: String,
}

/// Signed, ordered field set for the hosted payment page.
///
/// Only [`OutboundRequest::build`] creates one; fields cannot be changed
/// afterwards, so the stored digest always matches the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    fields: Vec<(&'static str, String)>,
}

impl OutboundRequest {
    /// Builds and signs a request stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::InvalidParameter`] for malformed merchant
    /// identifiers, callback URLs, HMAC key, amount, or an empty reference or
    /// email.
    pub fn build(params: &PaymentParameters) -> Result<Self> {
        Self::build_at(params, Utc::now())
    }

    /// Builds and signs a request stamped with `now`.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    #[instrument(skip(params), fields(reference = %params.reference))]
    pub fn build_at(params: &PaymentParameters, now: DateTime<Utc>) -> Result<Self> {
        params.validate()?;

        let merchant = &params.merchant;
        let urls = &merchant.urls;

        let fields = vec![
            ("PBX_SITE", merchant.site.clone()),
            ("PBX_RANG", merchant.rank.clone()),
            ("PBX_IDENTIFIANT", merchant.identifier.clone()),
            ("PBX_TOTAL", format::format_amount(&params.amount)?),
            ("PBX_DEVISE", params.currency.code().to_owned()),
            ("PBX_SOURCE", PAGE_SOURCE.to_owned()),
            ("PBX_CMD", params.reference.clone()),
            ("PBX_PORTEUR", params.email.clone()),
            ("PBX_RETOUR", format::return_variables_field()),
            ("PBX_RUF1", NOTIFICATION_METHOD.to_owned()),
            ("PBX_TIME", format::timestamp(now)),
            ("PBX_HASH", HASH_ALGORITHM.to_owned()),
            ("PBX_EFFECTUE", urls.success.clone()),
            ("PBX_REFUSE", urls.refused.clone()),
            ("PBX_ANNULE", urls.cancelled.clone()),
            ("PBX_ATTENTE", urls.waiting.clone()),
            ("PBX_REPONDRE_A", urls.notification.clone()),
            ("PBX_BILLING", format::billing_xml(&params.billing)?),
            ("PBX_SHOPPINGCART", format::shopping_cart_xml(&params.total_quantity)?),
            (HMAC_FIELD, String::new()),
        ];

        let mut request = Self { fields };

        if merchant.hmac_key.is_empty() {
            debug!("no HMAC key configured, request left unsigned");
        } else {
            let chain = request.signing_chain();
            let digest = crypto::compute_digest(&chain, merchant.hmac_key.expose())
                .map_err(|e| Up2PayError::InvalidParameter(format!("hmac_key: {e}")))?;
            request.set_digest(digest);
        }

        Ok(request)
    }

    fn set_digest(&mut self, digest: String) {
        if let Some((_, value)) = self.fields.iter_mut().find(|(name, _)| *name == HMAC_FIELD) {
            *value = digest;
        }
    }

    /// Returns the value of the field `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `PBX_HMAC`, empty when the request is unsigned.
    #[must_use]
    pub fn digest(&self) -> &str {
        self.get(HMAC_FIELD).unwrap_or_default()
    }

    /// Returns `name=value` pairs joined by `&`, `PBX_HMAC` excluded.
    ///
    /// Values are not URL-encoded: this is the exact message the digest covers.
    #[must_use]
    pub fn signing_chain(&self) -> String {
        self.fields
            .iter()
            .filter(|(name, _)| *name != HMAC_FIELD)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Iterates over `(name, value)` pairs in wire order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// Returns the fields as form elements, in wire order.
    #[must_use]
    pub fn elements(&self) -> Vec<FormElement> {
        self.fields()
            .map(|(name, value)| FormElement { name: name.to_owned(), value: value.to_owned() })
            .collect()
    }
}
