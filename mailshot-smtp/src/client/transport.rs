//! The seams between the submission sequence and the wire.
//!
//! [`Transport`] covers the structured operations every SMTP session
//! supports. [`RawCommand`] is the escape hatch for servers with
//! non-standard commands (such as `CUSTOM:`); transports that cannot send
//! arbitrary lines simply do not implement it.

use std::future::Future;

use mailshot_common::config::{ClientTimeouts, TlsCertificatePolicy};
use serde::{Deserialize, Serialize};

use super::{
    error::Result,
    message::Envelope,
    response::Response,
    smtp_client::SmtpClient,
};

/// Which greeting command opens the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Greeting {
    #[default]
    Ehlo,
    Helo,
}

impl Greeting {
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
        }
    }
}

/// Structured operations on an open SMTP session.
pub trait Transport: Send {
    /// Sends EHLO or HELO.
    fn greet(
        &mut self,
        greeting: Greeting,
        domain: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Issues STARTTLS and performs the TLS handshake.
    fn upgrade_tls(&mut self) -> impl Future<Output = Result<Response>> + Send;

    /// Transmits `message` to exactly the envelope's recipients.
    fn submit(
        &mut self,
        envelope: &Envelope,
        message: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Ends the session. Returns the reply to QUIT if the server sent one.
    fn close(&mut self) -> impl Future<Output = Result<Option<Response>>> + Send;
}

/// Sends an arbitrary protocol line and returns the server's reply verbatim.
pub trait RawCommand {
    fn send_raw_command(&mut self, command: &str)
    -> impl Future<Output = Result<Response>> + Send;
}

/// Opens sessions.
pub trait Connector {
    type Transport: Transport + RawCommand;

    fn connect(&self) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// Connects [`SmtpClient`]s over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    server_name: String,
    timeouts: ClientTimeouts,
    tls: TlsCertificatePolicy,
}

impl TcpConnector {
    /// # Arguments
    ///
    /// * `address` - The address to connect to (e.g., "localhost:2525")
    /// * `server_name` - The server's domain name (used for TLS SNI)
    #[must_use]
    pub fn new(address: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            server_name: server_name.into(),
            timeouts: ClientTimeouts::default(),
            tls: TlsCertificatePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub const fn with_tls(mut self, tls: TlsCertificatePolicy) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    type Transport = SmtpClient;

    async fn connect(&self) -> Result<SmtpClient> {
        Ok(
            SmtpClient::connect(&self.address, self.server_name.clone(), self.timeouts.clone())
                .await?
                .accept_invalid_certs(self.tls.accept_invalid_certs),
        )
    }
}
