//! Gateway endpoint resolution.
//!
//! The gateway publishes a liveness page (`/load.html`) on its primary host.
//! When the page answers with the `>OK<` marker the payment form is posted to
//! the primary host, otherwise to the fallback host. The probe is a single
//! best-effort request: any failure selects the fallback.

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{Result, Up2PayError};

/// Path of the liveness page on the primary host.
pub const LIVENESS_PATH: &str = "/load.html";

/// Marker that the liveness page contains when the host is up.
pub const LIVENESS_MARKER: &str = ">OK<";

/// Path of the hosted payment page, appended to the selected host.
pub const PAYMENT_PAGE_PATH: &str = "/cgi/FramepagepaiementRWD.cgi";

/// Default liveness probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway operating environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Test platform ("recette").
    Sandbox,
    /// Live platform.
    #[default]
    Production,
}

impl Environment {
    /// Maps the boolean sandbox flag used in merchant configuration.
    #[must_use]
    pub const fn from_sandbox(sandbox: bool) -> Self {
        if sandbox { Self::Sandbox } else { Self::Production }
    }
}

/// Primary and fallback hosts for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPair {
    /// Host probed first (scheme and authority; a trailing `/` is ignored).
    pub main: String,
    /// Host used when the primary is not confirmed alive.
    pub fallback: String,
}

impl HostPair {
    /// Creates a host pair.
    #[must_use]
    pub fn new(main: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self { main: main.into(), fallback: fallback.into() }
    }

    fn validate(&self, environment: &str) -> Result<()> {
        for (role, host) in [("main", &self.main), ("fallback", &self.fallback)] {
            let url = Url::parse(host).map_err(|e| {
                Up2PayError::ConfigError(format!("invalid {environment} {role} host '{host}': {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Up2PayError::ConfigError(format!(
                    "{environment} {role} host must use http(s), got: {}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

/// Gateway hosts for both environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUrls {
    /// Live platform hosts.
    #[serde(alias = "prod")]
    pub production: HostPair,
    /// Test platform hosts.
    pub sandbox: HostPair,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            production: HostPair::new(
                "https://tpeweb.e-transactions.fr",
                "https://tpeweb.e-transactions.fr",
            ),
            sandbox: HostPair::new(
                "https://recette-tpeweb.e-transactions.fr",
                "https://recette-tpeweb.e-transactions.fr",
            ),
        }
    }
}

impl BaseUrls {
    /// Returns the host pair for `environment`.
    #[must_use]
    pub const fn hosts(&self, environment: Environment) -> &HostPair {
        match environment {
            Environment::Sandbox => &self.sandbox,
            Environment::Production => &self.production,
        }
    }

    /// Checks that every host is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::ConfigError`] naming the first invalid host.
    pub fn validate(&self) -> Result<()> {
        self.production.validate("production")?;
        self.sandbox.validate("sandbox")
    }
}

/// Fetches the liveness page of a gateway host.
///
/// Implemented by [`HttpProbe`]; tests and callers with their own HTTP stack
/// can provide another implementation.
pub trait LivenessProbe: Send + Sync {
    /// Returns the body of the page at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure. [`resolve_endpoint`] turns
    /// errors into a fallback selection.
    fn fetch<'a>(&'a self, url: &'a str) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// Liveness probe over HTTP with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Creates a probe with [`DEFAULT_PROBE_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::HttpError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Creates a probe whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::HttpError`] if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(Up2PayError::HttpError)?;
        Ok(Self { client })
    }

    /// Wraps an existing client. Its timeout settings apply as configured.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl LivenessProbe for HttpProbe {
    fn fetch<'a>(&'a self, url: &'a str) -> impl Future<Output = Result<String>> + Send + 'a {
        async move {
            let response = self.client.get(url).send().await?;
            let body = response.text().await?;
            Ok(body)
        }
    }
}

/// Returns the payment page URL for `environment`.
///
/// Probes `{main}/load.html`: the primary host is used only when the body
/// contains `>OK<`. Non-matching bodies and probe errors select the fallback
/// host. Never fails.
///
/// # Examples
///
/// ```no_run
/// use up2pay::endpoint::{BaseUrls, Environment, HttpProbe, resolve_endpoint};
///
/// # async fn example() -> up2pay::Result<()> {
/// let probe = HttpProbe::new()?;
/// let url = resolve_endpoint(Environment::Sandbox, &BaseUrls::default(), &probe).await;
/// assert!(url.ends_with("/cgi/FramepagepaiementRWD.cgi"));
/// # Ok(())
/// # }
/// ```
#[instrument(skip(base_urls, probe))]
pub async fn resolve_endpoint<P: LivenessProbe>(
    environment: Environment,
    base_urls: &BaseUrls,
    probe: &P,
) -> String {
    let hosts = base_urls.hosts(environment);
    let main = hosts.main.trim_end_matches('/');
    let fallback = hosts.fallback.trim_end_matches('/');
    let liveness_url = format!("{main}{LIVENESS_PATH}");

    let host = match probe.fetch(&liveness_url).await {
        Ok(body) if body.contains(LIVENESS_MARKER) => {
            debug!(host = %main, "primary gateway host is alive");
            main
        }
        Ok(_) => {
            warn!(host = %main, "liveness marker missing, using fallback host");
            fallback
        }
        Err(e) => {
            warn!(host = %main, error = %e, "liveness probe failed, using fallback host");
            fallback
        }
    };

    format!("{host}{PAYMENT_PAGE_PATH}")
}
