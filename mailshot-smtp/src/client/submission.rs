//! One message, one session.
//!
//! A [`Submission`] drives a connected transport through the fixed sequence
//! connect, raw commands, greeting, optional STARTTLS (followed by a second
//! greeting), submit and close. The first failure ends the sequence, but the
//! session is always closed before [`Submission::run`] returns.

use mailshot_common::tracing;

use super::{
    error::Result,
    message::{Message, RecipientPolicy},
    response::Response,
    transport::{Connector, Greeting, RawCommand, Transport},
};

/// A completed step of the sequence, with the server's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A raw command and its uninterpreted reply.
    Command { command: String, response: Response },
    /// EHLO/HELO.
    Greeting {
        greeting: Greeting,
        response: Response,
    },
    /// STARTTLS and the completed handshake.
    StartTls(Response),
    /// The message was accepted for these envelope recipients.
    Submitted {
        recipients: Vec<String>,
        response: Response,
    },
    /// The session was closed; carries the reply to QUIT if there was one.
    Closed(Option<Response>),
}

/// Everything that happened during [`Submission::run`].
#[derive(Debug)]
pub struct SubmissionReport {
    /// Completed steps, in the order they ran.
    pub steps: Vec<Step>,
    /// The reply to the end of data on success, or the first error.
    pub outcome: Result<Response>,
}

impl SubmissionReport {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns `true` if a session was opened and then closed.
    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.steps.iter().any(|step| matches!(step, Step::Closed(_)))
    }

    /// The envelope recipients the message was accepted for, if it was.
    #[must_use]
    pub fn delivered_to(&self) -> Option<&[String]> {
        self.steps.iter().find_map(|step| match step {
            Step::Submitted { recipients, .. } => Some(recipients.as_slice()),
            _ => None,
        })
    }
}

/// How to conduct the session around the message.
///
/// # Examples
///
/// ```no_run
/// use mailshot_smtp::client::{MessageBuilder, Submission, TcpConnector};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Test")
///     .body("Hello World")
///     .build()?;
///
/// let report = Submission::new("client.example.com")
///     .custom_command("CUSTOM: SERVER_NAME=\"Test Server\"")
///     .starttls(true)
///     .run(&TcpConnector::new("localhost:2525", "localhost"), &message)
///     .await;
///
/// assert!(report.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Submission {
    client_domain: String,
    greeting: Greeting,
    custom_commands: Vec<String>,
    starttls: bool,
    mail_options: Vec<String>,
    recipient_policy: RecipientPolicy,
}

impl Submission {
    /// `client_domain` is announced in EHLO/HELO.
    #[must_use]
    pub fn new(client_domain: impl Into<String>) -> Self {
        Self {
            client_domain: client_domain.into(),
            greeting: Greeting::default(),
            custom_commands: Vec::new(),
            starttls: false,
            mail_options: Vec::new(),
            recipient_policy: RecipientPolicy::default(),
        }
    }

    #[must_use]
    pub const fn greeting(mut self, greeting: Greeting) -> Self {
        self.greeting = greeting;
        self
    }

    /// Sends `command` verbatim right after connecting, before the greeting.
    #[must_use]
    pub fn custom_command(mut self, command: impl Into<String>) -> Self {
        self.custom_commands.push(command.into());
        self
    }

    #[must_use]
    pub fn custom_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    /// Upgrades the session with STARTTLS after the greeting.
    #[must_use]
    pub const fn starttls(mut self, enabled: bool) -> Self {
        self.starttls = enabled;
        self
    }

    /// Appends an ESMTP keyword to `MAIL FROM`.
    #[must_use]
    pub fn mail_option(mut self, option: impl Into<String>) -> Self {
        self.mail_options.push(option.into());
        self
    }

    #[must_use]
    pub const fn recipient_policy(mut self, policy: RecipientPolicy) -> Self {
        self.recipient_policy = policy;
        self
    }

    /// Delivers `message` over a fresh session from `connector`.
    ///
    /// Never returns early with an open session: once connected, the
    /// transport is closed exactly once whatever the outcome.
    pub async fn run<C: Connector>(&self, connector: &C, message: &Message) -> SubmissionReport {
        let mut steps = Vec::new();

        let mut transport = match connector.connect().await {
            Ok(transport) => transport,
            Err(err) => {
                tracing::warn!(%err, "Unable to open a session");
                return SubmissionReport {
                    steps,
                    outcome: Err(err),
                };
            }
        };

        let outcome = self.converse(&mut transport, message, &mut steps).await;
        if let Err(err) = &outcome {
            tracing::warn!(%err, "Submission failed");
        }

        match transport.close().await {
            Ok(response) => steps.push(Step::Closed(response)),
            Err(err) => {
                tracing::debug!(%err, "Closing the session failed");
                steps.push(Step::Closed(None));
            }
        }

        SubmissionReport { steps, outcome }
    }

    async fn converse<T>(
        &self,
        transport: &mut T,
        message: &Message,
        steps: &mut Vec<Step>,
    ) -> Result<Response>
    where
        T: Transport + RawCommand,
    {
        for command in &self.custom_commands {
            let response = transport.send_raw_command(command).await?;
            tracing::info!(%command, %response, "Custom command answered");
            steps.push(Step::Command {
                command: command.clone(),
                response,
            });
        }

        self.greet(transport, steps).await?;

        if self.starttls {
            let response = transport.upgrade_tls().await?;
            tracing::info!(%response, "Connection upgraded to TLS");
            steps.push(Step::StartTls(response));

            // Capabilities must be re-read over the encrypted channel
            self.greet(transport, steps).await?;
        }

        let envelope = message.envelope(self.recipient_policy, &self.mail_options);
        let response = transport.submit(&envelope, &message.render()).await?;
        tracing::info!(recipients = envelope.recipients.len(), %response, "Message accepted");
        steps.push(Step::Submitted {
            recipients: envelope.recipients,
            response: response.clone(),
        });

        Ok(response)
    }

    async fn greet<T: Transport>(&self, transport: &mut T, steps: &mut Vec<Step>) -> Result<()> {
        let response = transport.greet(self.greeting, &self.client_domain).await?;
        steps.push(Step::Greeting {
            greeting: self.greeting,
            response,
        });
        Ok(())
    }
}
