//! Submit one MIME message to an SMTP server under test.
//!
//! The [`Config`] decides what is sent and how the session is conducted;
//! [`run`] performs the submission and prints the outcome.

pub mod cli;
pub mod config;
pub mod output;

use std::io::Write;

pub use cli::Cli;
pub use config::Config;
use mailshot_smtp::client::Connector;

/// Sends the configured message through `connector`, writing progress to `out`.
///
/// Returns whether the message was accepted. A failed submission is not an
/// error: it is reported on `out` after the session has been closed.
///
/// # Errors
///
/// Returns an error if the message cannot be built or `out` cannot be
/// written to.
pub async fn run<C: Connector>(
    config: &Config,
    connector: &C,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let message = config.message.build()?;

    tracing::info!(
        to = message.to(),
        cc = message.cc().len(),
        bcc = message.bcc().len(),
        "Submitting message"
    );

    let report = config.submission().run(connector, &message).await;
    output::report(out, &report)?;
    out.flush()?;

    Ok(report.is_success())
}
