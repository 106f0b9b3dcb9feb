use std::path::PathBuf;

/// Build Up2Pay payment forms and check gateway callbacks.
#[derive(clap::Parser, Debug)]
#[command(version, arg_required_else_help = true)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Command {
    /// Build a signed payment form and print it as JSON.
    Form(FormArgs),

    /// Check the signature of a callback URL and print its fields as JSON.
    Verify(VerifyArgs),

    /// Print the message for a gateway response code.
    ErrorText {
        /// Response code, e.g. `00021`.
        code: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct FormArgs {
    /// TOML configuration file with `[merchant]` and optional `[gateway]` tables.
    #[arg(short, long, value_name = "FILE")]
    pub(crate) config: PathBuf,

    /// Amount in minor units (cents).
    #[arg(short, long)]
    pub(crate) amount: String,

    /// Order reference.
    #[arg(short, long)]
    pub(crate) reference: String,

    /// Payer email.
    #[arg(short, long)]
    pub(crate) email: String,

    /// Currency, alphabetic or numeric ISO 4217 code.
    #[arg(long, default_value = "EUR")]
    pub(crate) currency: String,

    /// Number of items in the cart.
    #[arg(long, default_value = "1")]
    pub(crate) quantity: String,

    #[command(flatten)]
    pub(crate) billing: BillingArgs,
}

#[derive(clap::Args, Debug)]
pub(crate) struct BillingArgs {
    /// Payer first name.
    #[arg(long, default_value = "")]
    pub(crate) first_name: String,

    /// Payer last name.
    #[arg(long, default_value = "")]
    pub(crate) last_name: String,

    /// First address line.
    #[arg(long, default_value = "")]
    pub(crate) address1: String,

    /// Second address line.
    #[arg(long)]
    pub(crate) address2: Option<String>,

    /// Postal code.
    #[arg(long, default_value = "")]
    pub(crate) zip_code: String,

    /// City.
    #[arg(long, default_value = "")]
    pub(crate) city: String,

    /// ISO 3166-1 numeric country code.
    #[arg(long, default_value = "250")]
    pub(crate) country_code: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Callback URL or query string as received.
    pub(crate) url: String,

    /// Configuration file providing the gateway public key. The built-in key
    /// is used when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Amount the order expects, in minor units. Enables the acceptance check.
    #[arg(long)]
    pub(crate) expected_amount: Option<i64>,
}
