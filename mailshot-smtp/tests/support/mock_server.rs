//! Scripted SMTP server for exercising the client over a real socket.
//!
//! The server can:
//! - answer each command with a configured reply
//! - answer `CUSTOM:` lines the way the development test server does
//! - reject individual recipients
//! - accept STARTTLS and then drop the connection (to fail the handshake)
//! - record every command it receives, in order
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::MockSmtpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockSmtpServer::builder()
//!     .with_rcpt_rejection("cc_email2@example.com", 550, "User unknown")
//!     .build()
//!     .await?;
//!
//! // Connect to server.addr() and submit
//!
//! server.shutdown();
//! # Ok(())
//! # }
//! ```
#![allow(dead_code)]

use std::{
    collections::HashMap,
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// SMTP command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    /// EHLO command with hostname
    Ehlo(String),
    /// HELO command with hostname
    Helo(String),
    /// `CUSTOM:` line, stored in full
    Custom(String),
    /// MAIL FROM, everything after `MAIL `
    MailFrom(String),
    /// RCPT TO, everything after `RCPT `
    RcptTo(String),
    /// DATA command
    Data,
    /// Message content (after DATA), still dot-stuffed
    MessageContent(String),
    /// RSET command
    Rset,
    /// QUIT command
    Quit,
    /// STARTTLS command
    StartTls,
    /// Unknown/other command
    Other(String),
}

/// Response configuration for SMTP commands
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: u16,
    pub message: String,
}

impl SmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct EhloResponse {
    code: u16,
    capabilities: Vec<String>,
}

impl EhloResponse {
    fn to_bytes(&self) -> Vec<u8> {
        let mut response = String::new();
        let cap_count = self.capabilities.len();

        for (i, cap) in self.capabilities.iter().enumerate() {
            let separator = if i < cap_count - 1 { '-' } else { ' ' };
            let _ = write!(&mut response, "{}{separator}{cap}\r\n", self.code);
        }

        response.into_bytes()
    }
}

#[derive(Clone)]
struct MockServerConfig {
    greeting: SmtpResponse,
    ehlo_response: EhloResponse,
    helo_response: SmtpResponse,
    custom_response: SmtpResponse,
    mail_from_response: SmtpResponse,
    rcpt_to_response: SmtpResponse,
    rcpt_rejections: HashMap<String, SmtpResponse>,
    data_response: SmtpResponse,
    data_end_response: SmtpResponse,
    quit_response: SmtpResponse,
    starttls_response: Option<SmtpResponse>,
    raw_reply: Option<Vec<u8>>,
    drop_after_starttls: bool,
    response_delay: Option<Duration>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: SmtpResponse::new(220, "Mock SMTP Server"),
            ehlo_response: EhloResponse {
                code: 250,
                capabilities: vec![
                    "localhost".to_string(),
                    "SIZE 10000".to_string(),
                    "VRFY".to_string(),
                ],
            },
            helo_response: SmtpResponse::new(250, "Hello"),
            custom_response: SmtpResponse::new(250, "Custom command accepted"),
            mail_from_response: SmtpResponse::new(250, "OK"),
            rcpt_to_response: SmtpResponse::new(250, "OK"),
            rcpt_rejections: HashMap::new(),
            data_response: SmtpResponse::new(354, "Start mail input; end with <CRLF>.<CRLF>"),
            data_end_response: SmtpResponse::new(250, "OK: Message accepted"),
            quit_response: SmtpResponse::new(221, "Bye"),
            starttls_response: None,
            raw_reply: None,
            drop_after_starttls: false,
            response_delay: None,
        }
    }
}

/// Mock SMTP server for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<SmtpCommand>>>,
    shutdown: Arc<AtomicBool>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// All commands received so far, across every connection
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// Waits until the session has been ended by QUIT (or gives up after a second)
    pub async fn wait_for_quit(&self) -> Vec<SmtpCommand> {
        for _ in 0..100 {
            let commands = self.commands().await;
            if commands.contains(&SmtpCommand::Quit) {
                return commands;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.commands().await
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn respond(
        writer: &mut (impl AsyncWriteExt + Unpin),
        config: &MockServerConfig,
        response: &[u8],
    ) -> std::io::Result<()> {
        if let Some(delay) = config.response_delay {
            tokio::time::sleep(delay).await;
        }
        writer.write_all(response).await?;
        writer.flush().await
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        commands: Arc<RwLock<Vec<SmtpCommand>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();

            let read_result = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await;
            let Ok(bytes_read) = read_result else {
                return Ok(());
            };
            if bytes_read? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim_end_matches(['\r', '\n']);
            let (verb, rest) = cmd_line.split_once(' ').unwrap_or((cmd_line, ""));

            let (response, smtp_cmd) = match verb.to_uppercase().as_str() {
                "CUSTOM:" => (
                    config.custom_response.to_bytes(),
                    SmtpCommand::Custom(cmd_line.to_string()),
                ),
                "EHLO" => (
                    config.ehlo_response.to_bytes(),
                    SmtpCommand::Ehlo(rest.to_string()),
                ),
                "HELO" => (
                    config.helo_response.to_bytes(),
                    SmtpCommand::Helo(rest.to_string()),
                ),
                "MAIL" => (
                    config.mail_from_response.to_bytes(),
                    SmtpCommand::MailFrom(rest.to_string()),
                ),
                "RCPT" => {
                    let address = rest
                        .split_once('<')
                        .and_then(|(_, tail)| tail.split_once('>'))
                        .map_or("", |(address, _)| address);
                    let response = config
                        .rcpt_rejections
                        .get(address)
                        .unwrap_or(&config.rcpt_to_response);
                    (response.to_bytes(), SmtpCommand::RcptTo(rest.to_string()))
                }
                "DATA" => (config.data_response.to_bytes(), SmtpCommand::Data),
                "RSET" => (SmtpResponse::new(250, "OK").to_bytes(), SmtpCommand::Rset),
                "QUIT" => {
                    commands.write().await.push(SmtpCommand::Quit);
                    Self::respond(&mut writer, &config, &config.quit_response.to_bytes()).await?;
                    return Ok(());
                }
                "STARTTLS" => {
                    let response = config.starttls_response.as_ref().map_or_else(
                        || SmtpResponse::new(502, "Command not implemented").to_bytes(),
                        SmtpResponse::to_bytes,
                    );
                    (response, SmtpCommand::StartTls)
                }
                _ => (
                    SmtpResponse::new(500, "Unknown command").to_bytes(),
                    SmtpCommand::Other(cmd_line.to_string()),
                ),
            };

            commands.write().await.push(smtp_cmd.clone());

            if let Some(raw) = &config.raw_reply
                && matches!(smtp_cmd, SmtpCommand::Custom(_))
            {
                Self::respond(&mut writer, &config, raw).await?;
                continue;
            }

            Self::respond(&mut writer, &config, &response).await?;

            if matches!(smtp_cmd, SmtpCommand::StartTls)
                && config.drop_after_starttls
                && config.starttls_response.is_some()
            {
                return Ok(());
            }

            if matches!(smtp_cmd, SmtpCommand::Data) && config.data_response.code == 354 {
                let mut message_content = String::new();
                let mut data_line = String::new();

                loop {
                    data_line.clear();
                    if reader.read_line(&mut data_line).await? == 0 {
                        return Ok(());
                    }

                    if data_line == ".\r\n" || data_line == ".\n" {
                        commands
                            .write()
                            .await
                            .push(SmtpCommand::MessageContent(message_content));
                        Self::respond(&mut writer, &config, &config.data_end_response.to_bytes())
                            .await?;
                        break;
                    }

                    message_content.push_str(&data_line);
                }
            }
        }
    }
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_ehlo_response(mut self, code: u16, capabilities: Vec<String>) -> Self {
        self.config.ehlo_response = EhloResponse { code, capabilities };
        self
    }

    #[must_use]
    pub fn with_custom_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.custom_response = SmtpResponse::new(code, message);
        self
    }

    /// Answer `CUSTOM:` lines with these bytes instead of a well-formed reply
    #[must_use]
    pub fn with_raw_custom_reply(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.config.raw_reply = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = SmtpResponse::new(code, message);
        self
    }

    /// Reject one recipient address, accept the others
    #[must_use]
    pub fn with_rcpt_rejection(
        mut self,
        address: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rcpt_rejections
            .insert(address.into(), SmtpResponse::new(code, message));
        self
    }

    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the STARTTLS response (enables STARTTLS)
    #[must_use]
    pub fn with_starttls_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.starttls_response = Some(SmtpResponse::new(code, message));
        self
    }

    /// Close the socket right after answering STARTTLS
    #[must_use]
    pub const fn with_drop_after_starttls(mut self) -> Self {
        self.config.drop_after_starttls = true;
        self
    }

    #[must_use]
    pub const fn with_response_delay(mut self, delay: Duration) -> Self {
        self.config.response_delay = Some(delay);
        self
    }

    /// Build and start the mock SMTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let commands_clone = Arc::clone(&commands);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag is polled
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    let config = Arc::clone(&config);
                    let commands = Arc::clone(&commands_clone);

                    tokio::spawn(async move {
                        if let Err(e) = MockSmtpServer::handle_client(stream, config, commands).await
                        {
                            eprintln!("Mock server client error: {e}");
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands_received: commands,
            shutdown,
        })
    }
}
