//! Error types for the SMTP client.

use std::{fmt, io, time::Duration};

use thiserror::Error;

/// The part of a submission the server rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStage {
    MailFrom,
    RcptTo(String),
    Data,
    DataEnd,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MailFrom => f.write_str("MAIL FROM"),
            Self::RcptTo(recipient) => write!(f, "RCPT TO <{recipient}>"),
            Self::Data => f.write_str("DATA"),
            Self::DataEnd => f.write_str("end of data"),
        }
    }
}

/// Errors that can occur when using the SMTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server could not be reached or refused the connection.
    #[error("Failed to connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },

    /// IO error occurred on an established session.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server's reply could not be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered the greeting or EHLO/HELO with an error.
    #[error("Unexpected SMTP status code: {code} - {message}")]
    UnexpectedResponse { code: u16, message: String },

    /// The server rejected the sender, a recipient or the message body.
    #[error("Delivery rejected at {stage}: {code} - {message}")]
    Delivery {
        stage: DeliveryStage,
        code: u16,
        message: String,
    },

    /// STARTTLS was refused or the handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server did not answer in time.
    #[error("{operation} timed out after {} seconds", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Invalid message or builder configuration.
    #[error("Invalid builder configuration: {0}")]
    Builder(String),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,
}

impl ClientError {
    /// Returns `true` if the server was never reached.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if the STARTTLS upgrade failed.
    #[must_use]
    pub const fn is_tls_error(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Returns `true` if the server rejected part of the submission.
    #[must_use]
    pub const fn is_delivery_error(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }

    /// Returns `true` if the server's reply was malformed.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

impl From<std::str::Utf8Error> for ClientError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Protocol(format!("reply is not valid UTF-8: {err}"))
    }
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
