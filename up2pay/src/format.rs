//! Canonical wire formatting for outbound payment fields.
//!
//! Every function here produces the exact string the gateway expects for one
//! `PBX_*` field. The output feeds the HMAC digest, so any change in spacing or
//! ordering changes the signature.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Result, Up2PayError};

/// Width of the zero-padded `PBX_TOTAL` field.
pub const AMOUNT_WIDTH: usize = 10;

/// Largest amount (in minor units) that fits in [`AMOUNT_WIDTH`] digits.
pub const MAX_AMOUNT: u64 = 9_999_999_999;

/// Largest item count accepted in `PBX_SHOPPINGCART`.
pub const MAX_QUANTITY: u8 = 99;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Result variables requested from the gateway, as `(name, code)` pairs.
///
/// The gateway appends these to the callback URL in this order. The signature
/// (`K`) must stay last: it signs everything that precedes it.
pub const RETURN_VARIABLES: [(&str, char); 12] = [
    ("amount", 'M'),
    ("paymentId", 'R'),
    ("transactionId", 'T'),
    ("authorizationId", 'A'),
    ("cardType", 'C'),
    ("cardNumber", 'N'),
    ("cardExpiration", 'D'),
    ("error", 'E'),
    ("payboxRef", 'S'),
    ("date", 'W'),
    ("time", 'Q'),
    ("signature", 'K'),
];

/// Payment amount as supplied by the caller.
///
/// Either an integer count of minor currency units (cents) or a numeric string
/// such as `"1990"`. Strings follow leading-integer parsing: `"1990.50"` is
/// read as `1990`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amount {
    /// Integer minor units.
    Cents(u64),
    /// Numeric text, parsed on formatting.
    Text(String),
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::Cents(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self::Cents(u64::from(value))
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Amount {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cents(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Billing address sent in `PBX_BILLING`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Billing {
    /// Payer first name.
    pub first_name: String,
    /// Payer last name.
    pub last_name: String,
    /// First address line.
    pub address1: String,
    /// Optional second address line, omitted from the XML when empty.
    pub address2: Option<String>,
    /// Postal code.
    pub zip_code: String,
    /// City.
    pub city: String,
    /// ISO 3166-1 numeric country code (e.g. `"250"` for France).
    pub country_code: String,
}

#[derive(Serialize)]
#[serde(rename = "Billing")]
struct BillingDocument<'a> {
    #[serde(rename = "Address")]
    address: AddressElement<'a>,
}

#[derive(Serialize)]
struct AddressElement<'a> {
    #[serde(rename = "FirstName")]
    first_name: &'a str,
    #[serde(rename = "LastName")]
    last_name: &'a str,
    #[serde(rename = "Address1")]
    address1: &'a str,
    #[serde(rename = "Address2", skip_serializing_if = "Option::is_none")]
    address2: Option<&'a str>,
    #[serde(rename = "ZipCode")]
    zip_code: &'a str,
    #[serde(rename = "City")]
    city: &'a str,
    #[serde(rename = "CountryCode")]
    country_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename = "shoppingcart")]
struct ShoppingCartDocument {
    total: CartTotal,
}

#[derive(Serialize)]
struct CartTotal {
    #[serde(rename = "totalQuantity")]
    total_quantity: u8,
}

/// Parses the leading integer of `input`.
///
/// Leading whitespace and one sign character are accepted, parsing stops at
/// the first non-digit. Returns `None` when no digit is found or the value
/// overflows `i64`.
///
/// # Examples
///
/// ```
/// use up2pay::format::parse_leading_int;
///
/// assert_eq!(parse_leading_int("5000"), Some(5000));
/// assert_eq!(parse_leading_int(" 12.5€"), Some(12));
/// assert_eq!(parse_leading_int("-3"), Some(-3));
/// assert_eq!(parse_leading_int("abc"), None);
/// ```
#[must_use]
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len());
    if end == 0 {
        return None;
    }

    let value: i64 = unsigned[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Formats an amount as the 10-digit, zero-padded `PBX_TOTAL` value.
///
/// # Errors
///
/// Returns [`Up2PayError::InvalidParameter`] if the amount has no leading
/// integer, is negative, or needs more than 10 digits.
///
/// # Examples
///
/// ```
/// use up2pay::format::{Amount, format_amount};
///
/// assert_eq!(format_amount(&Amount::from(5000_u64)).unwrap(), "0000005000");
/// assert_eq!(format_amount(&Amount::from("19.90")).unwrap(), "0000000019");
/// assert!(format_amount(&Amount::from("n/a")).is_err());
/// ```
pub fn format_amount(amount: &Amount) -> Result<String> {
    let value = match amount {
        Amount::Cents(cents) => *cents,
        Amount::Text(text) => {
            let parsed = parse_leading_int(text).ok_or_else(|| amount_overflow_or_nan(text))?;
            u64::try_from(parsed).map_err(|_| {
                Up2PayError::InvalidParameter(format!("amount must not be negative: {parsed}"))
            })?
        }
    };

    if value > MAX_AMOUNT {
        return Err(Up2PayError::InvalidParameter(format!(
            "amount exceeds {AMOUNT_WIDTH} digits: {value}"
        )));
    }

    Ok(format!("{value:0width$}", width = AMOUNT_WIDTH))
}

/// Explains why a text amount has no `i64` leading integer: either it has no
/// digits at all or the digits overflow.
fn amount_overflow_or_nan(text: &str) -> Up2PayError {
    let trimmed = text.trim_start();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    match unsigned.as_bytes().first() {
        Some(b) if b.is_ascii_digit() && negative => {
            Up2PayError::InvalidParameter(format!("amount must not be negative: {text:?}"))
        }
        Some(b) if b.is_ascii_digit() => {
            Up2PayError::InvalidParameter(format!("amount exceeds {AMOUNT_WIDTH} digits: {text:?}"))
        }
        _ => Up2PayError::InvalidParameter(format!("amount is not a number: {text:?}")),
    }
}

/// Builds the `PBX_RETOUR` value listing the requested callback variables.
///
/// # Examples
///
/// ```
/// let field = up2pay::format::return_variables_field();
/// assert!(field.starts_with("amount:M;paymentId:R;"));
/// assert!(field.ends_with("signature:K;"));
/// ```
#[must_use]
pub fn return_variables_field() -> String {
    RETURN_VARIABLES
        .iter()
        .map(|(name, code)| format!("{name}:{code};"))
        .collect()
}

/// Renders the `PBX_BILLING` XML document.
///
/// Text content is XML-escaped. `Address2` is only emitted when present and
/// non-empty.
///
/// # Errors
///
/// Returns [`Up2PayError::InvalidParameter`] if XML serialization fails.
pub fn billing_xml(billing: &Billing) -> Result<String> {
    let document = BillingDocument {
        address: AddressElement {
            first_name: &billing.first_name,
            last_name: &billing.last_name,
            address1: &billing.address1,
            address2: billing.address2.as_deref().filter(|line| !line.is_empty()),
            zip_code: &billing.zip_code,
            city: &billing.city,
            country_code: &billing.country_code,
        },
    };

    let body = quick_xml::se::to_string(&document).map_err(|e| {
        Up2PayError::InvalidParameter(format!("billing XML serialization failed: {e}"))
    })?;

    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Normalizes a caller-supplied item count.
///
/// Unparseable input counts as one item; the result is clamped to
/// `1..=MAX_QUANTITY`.
#[must_use]
pub fn normalize_quantity(quantity: &str) -> u8 {
    let parsed = parse_leading_int(quantity).unwrap_or(1);
    let clamped = parsed.clamp(1, i64::from(MAX_QUANTITY));
    u8::try_from(clamped).unwrap_or(MAX_QUANTITY)
}

/// Renders the `PBX_SHOPPINGCART` XML document.
///
/// # Errors
///
/// Returns [`Up2PayError::InvalidParameter`] if XML serialization fails.
pub fn shopping_cart_xml(quantity: &str) -> Result<String> {
    let document = ShoppingCartDocument {
        total: CartTotal { total_quantity: normalize_quantity(quantity) },
    };

    let body = quick_xml::se::to_string(&document).map_err(|e| {
        Up2PayError::InvalidParameter(format!("shopping cart XML serialization failed: {e}"))
    })?;

    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Formats `now` as the `PBX_TIME` value (ISO 8601, UTC, milliseconds).
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2022, 12, 13, 14, 37, 8).unwrap();
/// assert_eq!(up2pay::format::timestamp(now), "2022-12-13T14:37:08.000Z");
/// ```
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_billing() -> Billing {
        Billing {
            first_name: "Ronan".to_owned(),
            last_name: "L.".to_owned(),
            address1: "18 route de Notre-Dame-de-la-Gorge".to_owned(),
            address2: None,
            zip_code: "74170".to_owned(),
            city: "Les Contamines-Montjoie".to_owned(),
            country_code: "250".to_owned(),
        }
    }

    #[test]
    fn test_format_amount_pads_to_ten_digits() {
        assert_eq!(format_amount(&Amount::Cents(5000)).unwrap(), "0000005000");
        assert_eq!(format_amount(&Amount::Cents(0)).unwrap(), "0000000000");
        assert_eq!(format_amount(&Amount::Cents(MAX_AMOUNT)).unwrap(), "9999999999");
    }

    #[test]
    fn test_format_amount_from_text_discards_trailing_content() {
        assert_eq!(format_amount(&Amount::from("1990")).unwrap(), "0000001990");
        assert_eq!(format_amount(&Amount::from("1990.75")).unwrap(), "0000001990");
        assert_eq!(format_amount(&Amount::from("  42 EUR")).unwrap(), "0000000042");
    }

    #[test]
    fn test_format_amount_rejects_unparseable() {
        let result = format_amount(&Amount::from("NaN"));
        assert!(matches!(result, Err(Up2PayError::InvalidParameter(_))));

        let result = format_amount(&Amount::from(""));
        assert!(matches!(result, Err(Up2PayError::InvalidParameter(_))));
    }

    #[test]
    fn test_format_amount_rejects_negative_and_oversized() {
        assert!(format_amount(&Amount::from("-100")).is_err());
        assert!(format_amount(&Amount::Cents(MAX_AMOUNT + 1)).is_err());
        assert!(format_amount(&Amount::from("12345678901")).is_err());
    }

    fn amount_error(text: &str) -> String {
        match format_amount(&Amount::from(text)) {
            Err(Up2PayError::InvalidParameter(message)) => message,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_format_amount_reports_overflowing_text_as_too_long() {
        assert!(amount_error("99999999999999999999").contains("exceeds 10 digits"));
        assert!(amount_error(" +99999999999999999999").contains("exceeds 10 digits"));
        assert!(amount_error("-99999999999999999999").contains("must not be negative"));
        assert!(amount_error("n/a").contains("not a number"));
    }

    #[test]
    fn test_parse_leading_int_edge_cases() {
        assert_eq!(parse_leading_int("+7"), Some(7));
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("0x10"), Some(0));
        assert_eq!(parse_leading_int("99999999999999999999"), None);
    }

    #[test]
    fn test_return_variables_field_order() {
        assert_eq!(
            return_variables_field(),
            "amount:M;paymentId:R;transactionId:T;authorizationId:A;cardType:C;cardNumber:N;\
             cardExpiration:D;error:E;payboxRef:S;date:W;time:Q;signature:K;"
        );
    }

    #[test]
    fn test_billing_xml_without_second_line() {
        let xml = billing_xml(&sample_billing()).unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains("<Billing><Address>"));
        assert!(xml.contains("<FirstName>Ronan</FirstName>"));
        assert!(xml.contains("<City>Les Contamines-Montjoie</City>"));
        assert!(xml.contains("<CountryCode>250</CountryCode>"));
        assert!(!xml.contains("Address2"));
        assert!(xml.ends_with("</Address></Billing>"));
    }

    #[test]
    fn test_billing_xml_with_second_line() {
        let mut billing = sample_billing();
        billing.address2 = Some("Chalet 4".to_owned());

        let xml = billing_xml(&billing).unwrap();
        let address1 = xml.find("<Address1>").unwrap();
        let address2 = xml.find("<Address2>Chalet 4</Address2>").unwrap();
        let zip = xml.find("<ZipCode>").unwrap();
        assert!(address1 < address2 && address2 < zip);
    }

    #[test]
    fn test_billing_xml_empty_second_line_is_omitted() {
        let mut billing = sample_billing();
        billing.address2 = Some(String::new());

        assert!(!billing_xml(&billing).unwrap().contains("Address2"));
    }

    #[test]
    fn test_billing_xml_escapes_markup() {
        let mut billing = sample_billing();
        billing.last_name = "R&D <Ltd>".to_owned();

        let xml = billing_xml(&billing).unwrap();
        assert!(xml.contains("R&amp;D &lt;Ltd"));
        assert!(!xml.contains("<Ltd>"));
    }

    #[test]
    fn test_shopping_cart_quantity_rules() {
        assert_eq!(normalize_quantity("12"), 12);
        assert_eq!(normalize_quantity("not a number"), 1);
        assert_eq!(normalize_quantity(""), 1);
        assert_eq!(normalize_quantity("150"), MAX_QUANTITY);
        assert_eq!(normalize_quantity("0"), 1);
        assert_eq!(normalize_quantity("-4"), 1);
    }

    #[test]
    fn test_shopping_cart_xml() {
        let xml = shopping_cart_xml("12").unwrap();
        assert_eq!(
            xml,
            format!(
                "{XML_DECLARATION}<shoppingcart><total><totalQuantity>12</totalQuantity></total></shoppingcart>"
            )
        );
    }

    #[test]
    fn test_timestamp_has_millisecond_precision() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap()
            + chrono::Duration::milliseconds(447);
        assert_eq!(timestamp(now), "2024-03-01T09:05:00.447Z");
    }
}
