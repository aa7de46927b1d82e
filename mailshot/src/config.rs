//! Run configuration.
//!
//! Every field has a default, so a RON file only needs the fields it
//! changes:
//!
//! ```ron
//! (
//!     server: (host: "mail.example.com", port: 25),
//!     handshake: (starttls: false, custom_commands: []),
//!     delivery: (mail_options: ["VRFY"]),
//! )
//! ```

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use mailshot_common::config::{ClientTimeouts, TlsCertificatePolicy};
use mailshot_smtp::client::{
    Greeting, Message, MessageBuilder, RecipientPolicy, Result as ClientResult, Submission,
    TcpConnector,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Environment variable naming the configuration file.
pub const CONFIG_VAR: &str = "MAILSHOT_CONFIG";

/// Configuration file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "./mailshot.config.ron";

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name used for TLS verification, the host when unset.
    pub server_name: Option<String>,
    pub timeouts: ClientTimeouts,
    pub tls: TlsCertificatePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2525,
            server_name: None,
            timeouts: ClientTimeouts::default(),
            tls: TlsCertificatePolicy::default(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(&self.host)
    }
}

/// What happens between connecting and submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Raw lines sent, in order, before the greeting.
    pub custom_commands: Vec<String>,
    pub starttls: bool,
    pub greeting: Greeting,
    pub client_domain: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            custom_commands: vec![
                r#"CUSTOM: SERVER_NAME="Test Server" NEW SERVER_VERSION=5 VALIDATE=true TEST=BOSS"#
                    .to_string(),
            ],
            starttls: true,
            greeting: Greeting::Ehlo,
            client_domain: "localhost".to_string(),
        }
    }
}

/// The message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub from: String,
    pub from_name: Option<String>,
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            from: "your_email@example.com".to_string(),
            from_name: Some("John Doe".to_string()),
            to: "receiver_email@example.com".to_string(),
            cc: vec![
                "cc_email1@example.com".to_string(),
                "cc_email2@example.com".to_string(),
                "cc_email3@example.com".to_string(),
            ],
            bcc: vec![
                "bcc_email1@example.com".to_string(),
                "bcc_email2@example.com".to_string(),
                "bcc_email3@example.com".to_string(),
            ],
            subject: "Test Email from Python".to_string(),
            body: "This is a test email sent from Python.".to_string(),
        }
    }
}

impl MessageConfig {
    /// # Errors
    ///
    /// Returns `ClientError::Builder` if the sender or recipient is empty.
    pub fn build(&self) -> ClientResult<Message> {
        let mut builder = MessageBuilder::new()
            .from(&self.from)
            .to(&self.to)
            .cc_multiple(self.cc.as_slice())
            .bcc_multiple(self.bcc.as_slice())
            .subject(&self.subject)
            .body(&self.body);

        if let Some(name) = &self.from_name {
            builder = builder.from_name(name);
        }

        builder.build()
    }
}

/// Envelope options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// ESMTP keywords appended to `MAIL FROM`.
    pub mail_options: Vec<String>,
    pub recipient_policy: RecipientPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub handshake: HandshakeConfig,
    pub message: MessageConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Reads a RON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
        })?;

        ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config in {}: {}", path.display(), e))
    }

    /// Loads the configuration using the following precedence:
    /// 1. `explicit` (the `--config` flag)
    /// 2. `MAILSHOT_CONFIG` environment variable
    /// 3. ./mailshot.config.ron (current working directory)
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a named file does not exist or cannot be loaded.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match locate(explicit, std::env::var_os(CONFIG_VAR))? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::load(&path)
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Overrides fields with whatever was given on the command line.
    pub fn apply(&mut self, cli: &Cli) {
        let server = &mut self.server;
        override_with(&mut server.host, cli.host.as_ref());
        override_with(&mut server.port, cli.port.as_ref());
        if cli.server_name.is_some() {
            server.server_name.clone_from(&cli.server_name);
        }
        if let Some(secs) = cli.timeout {
            server.timeouts = ClientTimeouts::uniform(secs);
        }
        if cli.accept_invalid_certs {
            server.tls = TlsCertificatePolicy::insecure();
        }

        let handshake = &mut self.handshake;
        if cli.no_custom {
            handshake.custom_commands.clear();
        } else if !cli.custom_commands.is_empty() {
            handshake.custom_commands.clone_from(&cli.custom_commands);
        }
        if cli.starttls {
            handshake.starttls = true;
        } else if cli.no_starttls {
            handshake.starttls = false;
        }
        if cli.helo {
            handshake.greeting = Greeting::Helo;
        }
        override_with(&mut handshake.client_domain, cli.client_domain.as_ref());

        let message = &mut self.message;
        override_with(&mut message.from, cli.from.as_ref());
        if cli.from_name.is_some() {
            message.from_name.clone_from(&cli.from_name);
        }
        override_with(&mut message.to, cli.to.as_ref());
        if !cli.cc.is_empty() {
            message.cc.clone_from(&cli.cc);
        }
        if !cli.bcc.is_empty() {
            message.bcc.clone_from(&cli.bcc);
        }
        override_with(&mut message.subject, cli.subject.as_ref());
        override_with(&mut message.body, cli.body.as_ref());

        if !cli.mail_options.is_empty() {
            self.delivery.mail_options.clone_from(&cli.mail_options);
        }
        if cli.include_bcc {
            self.delivery.recipient_policy = RecipientPolicy::IncludeBcc;
        }
    }

    /// The session settings for [`Submission::run`].
    #[must_use]
    pub fn submission(&self) -> Submission {
        let mut submission = Submission::new(&self.handshake.client_domain)
            .greeting(self.handshake.greeting)
            .custom_commands(&self.handshake.custom_commands)
            .starttls(self.handshake.starttls)
            .recipient_policy(self.delivery.recipient_policy);

        for option in &self.delivery.mail_options {
            submission = submission.mail_option(option);
        }

        submission
    }

    #[must_use]
    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.server.address(), self.server.server_name())
            .with_timeouts(self.server.timeouts.clone())
            .with_tls(self.server.tls)
    }
}

fn override_with<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn locate(explicit: Option<&Path>, env_path: Option<OsString>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }

    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "{CONFIG_VAR} points to non-existent file: {}",
            path.display()
        );
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(default_path.exists().then_some(default_path))
}
