//! Command-line flags. Every flag overrides one field of the loaded
//! [`Config`](crate::config::Config).

use std::path::PathBuf;

use clap::Parser;

/// Submit a single test message to an SMTP server
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "mailshot")]
#[command(about = "Submit a single test message to an SMTP server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a RON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SMTP server host
    #[arg(long)]
    pub host: Option<String>,

    /// SMTP server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Name presented for TLS verification (defaults to the host)
    #[arg(long)]
    pub server_name: Option<String>,

    /// Envelope sender and `From` address
    #[arg(long)]
    pub from: Option<String>,

    /// Display name for the `From` header
    #[arg(long)]
    pub from_name: Option<String>,

    /// Primary recipient
    #[arg(long)]
    pub to: Option<String>,

    /// Cc recipient (repeatable, replaces the configured list)
    #[arg(long)]
    pub cc: Vec<String>,

    /// Bcc recipient (repeatable, replaces the configured list)
    #[arg(long)]
    pub bcc: Vec<String>,

    #[arg(short, long)]
    pub subject: Option<String>,

    #[arg(short, long)]
    pub body: Option<String>,

    /// Raw command sent before the greeting (repeatable, replaces the configured list)
    #[arg(long = "custom")]
    pub custom_commands: Vec<String>,

    /// Send no raw commands
    #[arg(long, conflicts_with = "custom_commands")]
    pub no_custom: bool,

    /// Upgrade the session with STARTTLS
    #[arg(long, conflicts_with = "no_starttls")]
    pub starttls: bool,

    /// Do not upgrade the session with STARTTLS
    #[arg(long)]
    pub no_starttls: bool,

    /// Greet with HELO instead of EHLO
    #[arg(long)]
    pub helo: bool,

    /// Domain announced in EHLO/HELO
    #[arg(long)]
    pub client_domain: Option<String>,

    /// ESMTP keyword appended to MAIL FROM (repeatable, e.g. VRFY)
    #[arg(long = "mail-option")]
    pub mail_options: Vec<String>,

    /// Also deliver to the Bcc addresses
    #[arg(long)]
    pub include_bcc: bool,

    /// Accept invalid TLS certificates (for servers with self-signed certificates)
    #[arg(long)]
    pub accept_invalid_certs: bool,

    /// Use this timeout, in seconds, for every protocol step
    #[arg(long)]
    pub timeout: Option<u64>,
}
