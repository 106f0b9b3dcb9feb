//! `up2pay-cli`: command-line front end for the `up2pay` library.
//!
//! ```text
//! up2pay-cli form --config merchant.toml --amount 5000 --reference order-42 --email buyer@example.com
//! up2pay-cli verify 'https://shop.example.com/payment/success?amount=5000&...&signature=...'
//! up2pay-cli error-text 00021
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod cli;
mod observability;

use std::{fs, io, path::Path, process::ExitCode};

use serde::Serialize;
use thiserror::Error;
use tracing::error;
use up2pay::{
    CallbackResult, CallbackValidator, GatewayConfig, Up2Pay, Up2PayConfig, Up2PayError,
    format::Billing,
    lookup_error_text, parse_callback,
    request::{Currency, PaymentParameters},
};

use crate::{
    cli::{Args, BillingArgs, Command, FormArgs, VerifyArgs},
    observability::{LogFormat, init_observability},
};

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error(transparent)]
    Up2Pay(#[from] Up2PayError),

    #[error("cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReport {
    #[serde(flatten)]
    result: CallbackResult,
    signed_message: String,
    signature_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted: Option<bool>,
    error_text: String,
}

#[derive(Debug, Serialize)]
struct ErrorTextReport {
    code: String,
    text: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = <Args as clap::Parser>::parse();
    init_observability(LogFormat::from_env());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Form(form) => build_form(form).await,
        Command::Verify(verify) => verify_callback(&verify),
        Command::ErrorText { code } => {
            let text = lookup_error_text(&code).into_owned();
            print_json(&ErrorTextReport { code, text })
        }
    }
}

async fn build_form(args: FormArgs) -> Result<(), CliError> {
    let config = Up2PayConfig::from_toml(&read_file(&args.config)?)?;
    let currency: Currency = args.currency.parse()?;

    let params = PaymentParameters::new(config.merchant, args.amount, args.reference, args.email)
        .with_currency(currency)
        .with_quantity(args.quantity)
        .with_billing(billing(args.billing));

    let form = Up2Pay::create(params, &config.gateway)?.form().await;
    print_json(&form)
}

fn verify_callback(args: &VerifyArgs) -> Result<(), CliError> {
    let gateway = match &args.config {
        Some(path) => Up2PayConfig::from_toml(&read_file(path)?)?.gateway,
        None => GatewayConfig::default(),
    };
    let validator = CallbackValidator::from_config(&gateway)?;

    let result = parse_callback(&args.url);
    let signature_valid = validator.signature_is_valid(&result);
    let accepted =
        args.expected_amount.map(|amount| validator.is_payment_accepted(&result, amount));

    print_json(&VerifyReport {
        signed_message: result.signed_message.clone(),
        error_text: result.error_text(),
        result,
        signature_valid,
        accepted,
    })
}

fn billing(args: BillingArgs) -> Billing {
    Billing {
        first_name: args.first_name,
        last_name: args.last_name,
        address1: args.address1,
        address2: args.address2,
        zip_code: args.zip_code,
        city: args.city,
        country_code: args.country_code,
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|source| CliError::Read { path: path.display().to_string(), source })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let stdout = io::stdout().lock();
    serde_json::to_writer_pretty(stdout, value)?;
    println!();
    Ok(())
}
