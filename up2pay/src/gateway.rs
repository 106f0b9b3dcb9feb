//! Payment facade: signed request plus hosted-page endpoint.

use quick_xml::escape::escape;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    config::GatewayConfig,
    endpoint::{BaseUrls, Environment, HttpProbe, LivenessProbe, resolve_endpoint},
    error::Result,
    request::{FormElement, NOTIFICATION_METHOD, OutboundRequest, PaymentParameters},
};

/// Everything a page needs to redirect the payer to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentForm {
    /// Form action: the resolved payment page URL.
    pub url: String,
    /// Form method.
    pub method: String,
    /// Hidden `<input>` elements, values HTML-escaped.
    pub html: String,
    /// Raw form fields in wire order.
    pub elements: Vec<FormElement>,
}

/// One payment attempt.
///
/// Built once with [`Up2Pay::create`]; [`Up2Pay::form`] may be called
/// repeatedly and probes the gateway each time.
///
/// # Examples
///
/// ```no_run
/// use up2pay::{Up2Pay, config::Up2PayConfig, request::PaymentParameters};
///
/// # async fn example(toml: &str) -> up2pay::Result<()> {
/// let config = Up2PayConfig::from_toml(toml)?;
/// let params = PaymentParameters::new(config.merchant, 5000_u64, "order-42", "buyer@example.com");
///
/// let payment = Up2Pay::create(params, &config.gateway)?;
/// let form = payment.form().await;
/// println!("<form action=\"{}\" method=\"{}\">{}</form>", form.url, form.method, form.html);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Up2Pay<P: LivenessProbe = HttpProbe> {
    request: OutboundRequest,
    environment: Environment,
    base_urls: BaseUrls,
    probe: P,
}

impl Up2Pay {
    /// Builds and signs a payment, probing over HTTP with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::InvalidParameter`](crate::Up2PayError::InvalidParameter)
    /// for rejected parameters and
    /// [`Up2PayError::HttpError`](crate::Up2PayError::HttpError) if the HTTP
    /// client cannot be built.
    pub fn create(params: PaymentParameters, config: &GatewayConfig) -> Result<Self> {
        let probe = HttpProbe::with_timeout(config.probe_timeout())?;
        Self::with_probe(params, config, probe)
    }
}

impl<P: LivenessProbe> Up2Pay<P> {
    /// Builds and signs a payment using a custom liveness probe.
    ///
    /// Hosts come from `params.base_urls` when set, otherwise from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::InvalidParameter`](crate::Up2PayError::InvalidParameter)
    /// for rejected parameters.
    #[instrument(
        skip_all,
        fields(reference = %params.reference, sandbox = params.merchant.sandbox)
    )]
    pub fn with_probe(params: PaymentParameters, config: &GatewayConfig, probe: P) -> Result<Self> {
        let request = OutboundRequest::build(&params)?;
        let environment = params.environment();
        let base_urls = params.base_urls.unwrap_or_else(|| config.base_urls.clone());

        info!(signed = !request.digest().is_empty(), "payment request created");

        Ok(Self { request, environment, base_urls, probe })
    }

    /// Returns the signed request.
    #[must_use]
    pub const fn request(&self) -> &OutboundRequest {
        &self.request
    }

    /// Returns the target environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the hosts used for endpoint resolution.
    #[must_use]
    pub const fn base_urls(&self) -> &BaseUrls {
        &self.base_urls
    }

    /// Resolves the payment page and renders the form.
    pub async fn form(&self) -> PaymentForm {
        let url = resolve_endpoint(self.environment, &self.base_urls, &self.probe).await;
        let elements = self.request.elements();

        PaymentForm {
            url,
            method: self.request.get("PBX_RUF1").unwrap_or(NOTIFICATION_METHOD).to_owned(),
            html: render_hidden_inputs(&elements),
            elements,
        }
    }
}

/// Renders one hidden `<input>` per element, escaping names and values.
#[must_use]
pub fn render_hidden_inputs(elements: &[FormElement]) -> String {
    elements
        .iter()
        .map(|element| {
            format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\" />",
                escape(&element.name),
                escape(&element.value)
            )
        })
        .collect()
}
