//! End-to-end tests: configuration file to payment form, callback URL to
//! acceptance decision.

use up2pay::{
    CallbackValidator, Up2Pay, Up2PayConfig, Up2PayError, lookup_error_text, parse_callback,
    crypto::compute_digest,
    endpoint::Environment,
    request::{Currency, PaymentParameters},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const REAL_CALLBACK: &str = "https://localhost:8788/up2pay/_cancelled?amount=900\
    &paymentId=Paiement%20pour%20ronan@lesailesdumontblanc.cf%2014/12/2022%2013:13:45\
    &transactionId=71622616&cardType=3DSECURE&cardNumber=&error=00001&payboxRef=0\
    &signature=HxPfoUEfCY%2BPeji87VMoym50i9lNKsWj20oU3QiRQLiiqJaKlEMtJnltn4xfJWHjwUVFLC%2FBFLMdoNBnmEYjck5nJbIJdvtfzBzlFODHVZXfEVf94xrFsA4PGaTqT8VPmJSJx2eoi93LztSV7ihXJL5fYA6RXFLo4KwNUQvYwAI%3D";

fn config_toml(primary: &str) -> String {
    format!(
        r#"
        [merchant]
        sandbox = true
        site = "1999888"
        rank = "32"
        identifier = "1686319"
        hmac_key = "{key}"

        [merchant.urls]
        success = "https://www.exemple.com/payment/success"
        refused = "https://www.exemple.com/payment/error"
        cancelled = "https://www.exemple.com/payment/cancelled"
        waiting = "https://www.exemple.com/payment/waiting"
        notification = "https://www.exemple.com/payment/process"

        [gateway]
        probe_timeout_secs = 2

        [gateway.base_urls.prod]
        main = "https://tpeweb.e-transactions.fr"
        fallback = "https://tpeweb.e-transactions.fr"

        [gateway.base_urls.sandbox]
        main = "{primary}"
        fallback = "https://recette-tpeweb.e-transactions.fr"
        "#,
        key = "0123456789abcdef".repeat(8),
    )
}

#[tokio::test]
async fn test_config_to_signed_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/load.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(">OK<"))
        .mount(&server)
        .await;

    let config = Up2PayConfig::from_toml(&config_toml(&server.uri())).expect("valid config");
    let params =
        PaymentParameters::new(config.merchant.clone(), "5000", "123456", "tester@example.com")
            .with_currency(Currency::Eur)
            .with_quantity("150");

    let payment = Up2Pay::create(params, &config.gateway).expect("valid payment");
    let form = payment.form().await;

    assert_eq!(payment.environment(), Environment::Sandbox);
    assert_eq!(form.url, format!("{}/cgi/FramepagepaiementRWD.cgi", server.uri()));
    assert_eq!(form.method, "POST");

    let request = payment.request();
    assert_eq!(request.get("PBX_TOTAL"), Some("0000005000"));
    assert!(request.get("PBX_SHOPPINGCART").unwrap().contains("<totalQuantity>99</totalQuantity>"));
    assert_eq!(
        request.digest(),
        compute_digest(&request.signing_chain(), config.merchant.hmac_key.expose()).unwrap()
    );

    let last = form.elements.last().expect("elements");
    assert_eq!(last.name, "PBX_HMAC");
    assert_eq!(last.value, request.digest());
    assert!(form.html.contains(&format!("name=\"PBX_HMAC\" value=\"{}\"", request.digest())));
}

#[test]
fn test_invalid_config_is_rejected() {
    let toml = config_toml("https://recette-tpeweb.e-transactions.fr").replace("\"32\"", "\"3\"");

    let result = Up2PayConfig::from_toml(&toml);

    assert!(matches!(result, Err(Up2PayError::InvalidParameter(_))));
}

#[test]
fn test_real_callback_with_configured_key() {
    let config = Up2PayConfig::from_toml(&config_toml("https://recette-tpeweb.e-transactions.fr"))
        .expect("valid config");
    let validator = CallbackValidator::from_config(&config.gateway).expect("default key");

    assert!(validator.validate_callback(REAL_CALLBACK));

    let result = parse_callback(REAL_CALLBACK);
    assert!(validator.signature_is_valid(&result));
    assert!(!validator.is_payment_accepted(&result, 900));
    assert_eq!(lookup_error_text(&result.error), result.error_text());
}

#[test]
fn test_tampered_callback_is_rejected() {
    let validator = CallbackValidator::with_default_key().expect("default key");

    let tampered_amount = REAL_CALLBACK.replace("amount=900", "amount=1000");
    let tampered_reference = REAL_CALLBACK.replace("71622616", "71622617");

    assert!(!validator.validate_callback(&tampered_amount));
    assert!(!validator.validate_callback(&tampered_reference));
}
