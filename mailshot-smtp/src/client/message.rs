//! Email message builder and envelope resolution.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::error::{ClientError, Result};

/// Which header recipients end up on the SMTP envelope.
///
/// Cc addresses are always delivered. Bcc addresses are rendered into the
/// `Bcc` header either way; this policy only decides whether they also
/// receive a `RCPT TO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientPolicy {
    /// Envelope is the primary recipient followed by the Cc list.
    #[default]
    ExcludeBcc,
    /// Envelope is the primary recipient, the Cc list, then the Bcc list.
    IncludeBcc,
}

/// The SMTP envelope of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path used in `MAIL FROM`.
    pub sender: String,
    /// Forward paths, one `RCPT TO` each, in order.
    pub recipients: Vec<String>,
    /// ESMTP keywords appended to `MAIL FROM` (e.g. `VRFY`).
    pub mail_options: Vec<String>,
}

/// A single plain-text email.
///
/// Built through [`MessageBuilder`]; the sender and primary recipient are
/// guaranteed non-empty. Addresses are otherwise passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    from: String,
    from_name: Option<String>,
    to: String,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: String,
}

impl Message {
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    #[must_use]
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    #[must_use]
    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The value of the `From` header: `Name <address>` when a display name
    /// is set, the bare address otherwise.
    #[must_use]
    pub fn from_header(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{name} <{}>", self.from),
            None => self.from.clone(),
        }
    }

    /// Resolves the delivery addresses for this message.
    #[must_use]
    pub fn envelope_recipients(&self, policy: RecipientPolicy) -> Vec<String> {
        let mut recipients = Vec::with_capacity(1 + self.cc.len() + self.bcc.len());
        recipients.push(self.to.clone());
        recipients.extend(self.cc.iter().cloned());

        if policy == RecipientPolicy::IncludeBcc {
            recipients.extend(self.bcc.iter().cloned());
        }

        recipients
    }

    /// Builds the envelope for this message.
    #[must_use]
    pub fn envelope(&self, policy: RecipientPolicy, mail_options: &[String]) -> Envelope {
        Envelope {
            sender: self.from.clone(),
            recipients: self.envelope_recipients(policy),
            mail_options: mail_options.to_vec(),
        }
    }

    /// Serializes the message as a `multipart/mixed` document with one
    /// `text/plain` part, using CRLF line endings.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_with_boundary(&generate_boundary())
    }

    fn render_with_boundary(&self, boundary: &str) -> String {
        let mut message = String::with_capacity(512 + self.body.len());

        // Writing to a String cannot fail
        let _ = write!(message, "From: {}\r\n", self.from_header());
        let _ = write!(message, "To: {}\r\n", self.to);

        if !self.cc.is_empty() {
            let _ = write!(message, "Cc: {}\r\n", self.cc.join(", "));
        }

        if !self.bcc.is_empty() {
            let _ = write!(message, "Bcc: {}\r\n", self.bcc.join(", "));
        }

        let _ = write!(message, "Subject: {}\r\n", self.subject);
        message.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(
            message,
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n"
        );

        // Blank line between headers and body
        message.push_str("\r\n");

        let _ = write!(message, "--{boundary}\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");
        message.push_str(&normalize_line_endings(&self.body));
        message.push_str("\r\n");
        let _ = write!(message, "--{boundary}--\r\n");

        message
    }
}

/// Builder for [`Message`].
///
/// # Examples
///
/// ```
/// use mailshot_smtp::client::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .cc_multiple(&["cc1@example.com", "cc2@example.com"])
///     .subject("Hello")
///     .body("This is the message body")
///     .build()
///     .unwrap();
///
/// assert!(message.render().contains("Cc: cc1@example.com, cc2@example.com\r\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    from_name: Option<String>,
    to: Option<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: Option<String>,
    body: Option<String>,
}

impl MessageBuilder {
    /// Creates a new empty message builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address, used for both `MAIL FROM` and the From header.
    #[must_use]
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    /// Sets the display name shown in the From header.
    #[must_use]
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Sets the primary recipient.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to = Some(email.into());
        self
    }

    /// Adds a recipient to the Cc header.
    #[must_use]
    pub fn cc(mut self, email: impl Into<String>) -> Self {
        self.cc.push(email.into());
        self
    }

    /// Adds multiple recipients to the Cc header.
    #[must_use]
    pub fn cc_multiple(mut self, emails: &[impl AsRef<str>]) -> Self {
        for email in emails {
            self.cc.push(email.as_ref().to_string());
        }
        self
    }

    /// Adds a recipient to the Bcc header.
    #[must_use]
    pub fn bcc(mut self, email: impl Into<String>) -> Self {
        self.bcc.push(email.into());
        self
    }

    /// Adds multiple recipients to the Bcc header.
    #[must_use]
    pub fn bcc_multiple(mut self, emails: &[impl AsRef<str>]) -> Self {
        for email in emails {
            self.bcc.push(email.as_ref().to_string());
        }
        self
    }

    /// Sets the Subject header.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn body(mut self, content: impl Into<String>) -> Self {
        self.body = Some(content.into());
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Builder` if the sender or primary recipient is
    /// missing or empty.
    pub fn build(self) -> Result<Message> {
        let from = self
            .from
            .filter(|from| !from.trim().is_empty())
            .ok_or_else(|| ClientError::Builder("sender address is required".to_string()))?;
        let to = self
            .to
            .filter(|to| !to.trim().is_empty())
            .ok_or_else(|| ClientError::Builder("recipient address is required".to_string()))?;

        Ok(Message {
            from,
            from_name: self.from_name.filter(|name| !name.is_empty()),
            to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
        })
    }
}

/// Generates a unique MIME boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("===============mailshot_{timestamp}==")
}

/// Converts bare `\n` line endings in the body to CRLF.
fn normalize_line_endings(body: &str) -> String {
    let mut normalized = String::with_capacity(body.len());
    let mut lines = body.split('\n').peekable();

    while let Some(line) = lines.next() {
        normalized.push_str(line.strip_suffix('\r').unwrap_or(line));
        if lines.peek().is_some() {
            normalized.push_str("\r\n");
        }
    }

    normalized
}
