//! SMTP client implementation with support for STARTTLS.

use std::{future::Future, sync::Arc, time::Duration};

use mailshot_common::{config::ClientTimeouts, incoming, internal, outgoing, tracing};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use super::{
    error::{ClientError, DeliveryStage, Result},
    message::Envelope,
    response::Response,
    state::SessionState,
    transport::{Greeting, RawCommand, Transport},
};

/// Initial size of the read buffer for SMTP replies.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// A connection that can be either plain TCP or TLS-wrapped.
enum ClientConnection {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl ClientConnection {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.write_all(data).await?,
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(n)
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(stream) => stream.shutdown().await,
            Self::Tls(stream) => stream.shutdown().await,
        }
    }

    /// Upgrades a plain connection to TLS.
    async fn upgrade_to_tls(self, domain: &str, accept_invalid_certs: bool) -> Result<Self> {
        let Self::Plain(stream) = self else {
            return Err(ClientError::Tls("Connection is already TLS".to_string()));
        };

        let mut root_store = RootCertStore::empty();

        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            root_store
                .add(cert)
                .map_err(|e| ClientError::Tls(format!("Failed to add certificate: {e}")))?;
        }
        // Log errors but don't fail if some certs couldn't be loaded
        if !certs.errors.is_empty() {
            tracing::warn!(?certs.errors, "Some certificates could not be loaded");
        }

        let mut config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        if accept_invalid_certs {
            config
                .dangerous()
                .set_certificate_verifier(Arc::new(NoVerifier));
        }

        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|e| ClientError::Tls(format!("Invalid domain: {e}")))?;

        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| ClientError::Tls(format!("handshake failed: {e}")))?;

        Ok(Self::Tls(Box::new(tls_stream)))
    }
}

/// A certificate verifier that accepts all certificates (for testing only).
#[derive(Debug)]
struct NoVerifier;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[tokio_rustls::rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        vec![
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA256,
            tokio_rustls::rustls::SignatureScheme::RSA_PSS_SHA256,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            tokio_rustls::rustls::SignatureScheme::ED25519,
        ]
    }
}

/// Bounds `operation` by `after`.
async fn timed<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| ClientError::Timeout { operation, after })?
}

/// Applies SMTP dot-stuffing and terminates the payload with `<CRLF>.<CRLF>`.
fn encode_data(data: &str) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len() + 8);

    for line in data.split_inclusive('\n') {
        if line.starts_with('.') {
            encoded.push(b'.');
        }
        encoded.extend_from_slice(line.as_bytes());
    }

    // Ensure data ends with CRLF (handle both \n and \r\n cases)
    if data.ends_with("\r\n") {
        // Already has proper CRLF
    } else if data.ends_with('\n') {
        encoded.pop();
        encoded.extend_from_slice(b"\r\n");
    } else {
        encoded.extend_from_slice(b"\r\n");
    }

    encoded.extend_from_slice(b".\r\n");
    encoded
}

/// An SMTP client session.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    responses: Vec<Response>,
    server_domain: String,
    accept_invalid_certs: bool,
    timeouts: ClientTimeouts,
    state: SessionState,
}

impl SmtpClient {
    /// Connects to `addr` and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Connection` if the host is unreachable or refuses
    /// the connection, `ClientError::Timeout` if connecting or the greeting
    /// takes too long, and `ClientError::UnexpectedResponse` if the server
    /// greets with an error code.
    pub async fn connect(
        addr: &str,
        server_domain: String,
        timeouts: ClientTimeouts,
    ) -> Result<Self> {
        let stream = timed("connect", timeouts.connect(), async {
            TcpStream::connect(addr)
                .await
                .map_err(|source| ClientError::Connection {
                    address: addr.to_string(),
                    source,
                })
        })
        .await?;

        internal!(level = DEBUG, "Connected to {addr}");

        let mut client = Self {
            connection: Some(ClientConnection::Plain(stream)),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            responses: Vec::new(),
            server_domain,
            accept_invalid_certs: false,
            timeouts,
            state: SessionState::Connected,
        };

        let greeting = timed("greeting", client.timeouts.connect(), client.read_response()).await?;
        if !greeting.is_success() {
            return Err(ClientError::UnexpectedResponse {
                code: greeting.code,
                message: greeting.message(),
            });
        }

        Ok(client)
    }

    /// Sets whether to accept invalid TLS certificates.
    ///
    /// Default is `false`. Set to `true` for testing with self-signed
    /// certificates only.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Current position in the submission sequence.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        internal!(level = DEBUG, "Session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Sends a command line to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        outgoing!(level = DEBUG, "{command}");

        let data = format!("{command}\r\n");
        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(data.as_bytes())
            .await
    }

    /// Sends a command and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.send_command(command).await?;
        self.read_response().await
    }

    /// Sends EHLO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Sends HELO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn helo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("HELO {domain}")).await
    }

    /// Sends MAIL FROM, followed by any ESMTP keywords.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str, options: &[String]) -> Result<Response> {
        let cmd = if options.is_empty() {
            format!("MAIL FROM:<{from}>")
        } else {
            format!("MAIL FROM:<{from}> {}", options.join(" "))
        };
        self.command(&cmd).await
    }

    /// Sends RCPT TO.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA (without message content).
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Sends the dot-stuffed message followed by the end-of-data marker.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_data(&mut self, data: &str) -> Result<Response> {
        outgoing!(level = DEBUG, "<{} bytes of message data>", data.len());

        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(&encode_data(data))
            .await?;

        self.read_response().await
    }

    /// Sends RSET to abandon the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rset(&mut self) -> Result<Response> {
        self.command("RSET").await
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    /// Sends STARTTLS and upgrades the connection to TLS.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Tls` if the server refuses the upgrade, the
    /// connection is already encrypted, or the handshake fails.
    pub async fn starttls(&mut self) -> Result<Response> {
        if matches!(self.connection, Some(ClientConnection::Tls(_))) {
            return Err(ClientError::Tls("Connection is already TLS".to_string()));
        }

        let response = self.command("STARTTLS").await?;
        if !response.is_success() {
            return Err(ClientError::Tls(format!(
                "server does not support STARTTLS: {response}"
            )));
        }

        // Anything buffered before the handshake must not be trusted
        self.buffer_pos = 0;

        let old_connection = self
            .connection
            .take()
            .ok_or(ClientError::ConnectionClosed)?;
        self.connection = Some(
            old_connection
                .upgrade_to_tls(&self.server_domain, self.accept_invalid_certs)
                .await?,
        );

        self.transition(SessionState::TlsUpgraded);
        Ok(response)
    }

    /// Returns all replies received so far, including the greeting.
    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Returns the last reply received, if any.
    #[must_use]
    pub fn last_response(&self) -> Option<&Response> {
        self.responses.last()
    }

    /// Best-effort RSET after the server rejected part of a transaction.
    async fn reject(&mut self, stage: DeliveryStage, response: Response) -> ClientError {
        if let Err(err) = timed("RSET", self.timeouts.command(), self.rset()).await {
            tracing::debug!(%err, "RSET after rejection failed");
        }

        ClientError::Delivery {
            stage,
            code: response.code,
            message: response.message(),
        }
    }

    /// Reads a complete SMTP reply from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the reply is malformed.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                incoming!(level = DEBUG, "{response}");
                self.responses.push(response.clone());

                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                // Buffer is full but no complete reply - expand buffer
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::Protocol(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.buffer_pos..]).await?;
            self.buffer_pos += n;
        }
    }
}

impl Transport for SmtpClient {
    async fn greet(&mut self, greeting: Greeting, domain: &str) -> Result<Response> {
        let response = timed(greeting.verb(), self.timeouts.command(), async {
            match greeting {
                Greeting::Ehlo => self.ehlo(domain).await,
                Greeting::Helo => self.helo(domain).await,
            }
        })
        .await?;

        if !response.is_success() {
            return Err(ClientError::UnexpectedResponse {
                code: response.code,
                message: response.message(),
            });
        }

        self.transition(SessionState::Greeted);
        Ok(response)
    }

    async fn upgrade_tls(&mut self) -> Result<Response> {
        timed("STARTTLS", self.timeouts.starttls(), self.starttls()).await
    }

    async fn submit(&mut self, envelope: &Envelope, message: &str) -> Result<Response> {
        if envelope.recipients.is_empty() {
            return Err(ClientError::Builder(
                "envelope has no recipients".to_string(),
            ));
        }

        let response = timed(
            "MAIL FROM",
            self.timeouts.mail_from(),
            self.mail_from(&envelope.sender, &envelope.mail_options),
        )
        .await?;
        if !response.is_success() {
            return Err(self.reject(DeliveryStage::MailFrom, response).await);
        }

        for recipient in &envelope.recipients {
            let response =
                timed("RCPT TO", self.timeouts.rcpt_to(), self.rcpt_to(recipient)).await?;
            if !response.is_success() {
                return Err(self
                    .reject(DeliveryStage::RcptTo(recipient.clone()), response)
                    .await);
            }
        }

        let response = timed("DATA", self.timeouts.command(), self.data()).await?;
        if response.code != 354 {
            return Err(self.reject(DeliveryStage::Data, response).await);
        }

        let response = timed("DATA", self.timeouts.data(), self.send_data(message)).await?;
        if !response.is_success() {
            return Err(self.reject(DeliveryStage::DataEnd, response).await);
        }

        self.transition(SessionState::Submitted);
        Ok(response)
    }

    async fn close(&mut self) -> Result<Option<Response>> {
        if self.connection.is_none() {
            self.transition(SessionState::Closed);
            return Ok(None);
        }

        let quit = timed("QUIT", self.timeouts.quit(), self.quit()).await;

        if let Some(mut connection) = self.connection.take()
            && let Err(err) = connection.shutdown().await
        {
            tracing::debug!(%err, "Shutting down the connection failed");
        }

        self.transition(SessionState::Closed);
        quit.map(Some)
    }
}

impl RawCommand for SmtpClient {
    async fn send_raw_command(&mut self, command: &str) -> Result<Response> {
        let response = timed("command", self.timeouts.command(), self.command(command)).await?;
        self.transition(SessionState::CommandSent);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_encode_data_appends_terminator() {
        assert_eq!(encode_data("Hello"), b"Hello\r\n.\r\n");
        assert_eq!(encode_data("Hello\r\n"), b"Hello\r\n.\r\n");
        assert_eq!(encode_data("Hello\n"), b"Hello\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_dot_stuffing() {
        assert_eq!(
            encode_data("line one\r\n.hidden\r\n..two\r\nend"),
            b"line one\r\n..hidden\r\n...two\r\nend\r\n.\r\n"
        );
        assert_eq!(encode_data(".first"), b"..first\r\n.\r\n");
    }

    #[tokio::test]
    async fn test_timed_reports_operation() {
        let err = timed("EHLO", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { operation: "EHLO", .. }));
    }
}
