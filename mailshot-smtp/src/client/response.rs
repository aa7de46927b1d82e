//! SMTP reply parsing and representation.

use std::fmt;

use super::error::{ClientError, Result};

/// A single line of an SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// The SMTP status code (e.g., 220, 250, 550).
    pub code: u16,
    /// Whether this is the last line in a multi-line reply.
    pub is_last: bool,
    /// The text following the status code.
    pub message: String,
}

/// A complete SMTP reply, which may span several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The SMTP status code.
    pub code: u16,
    /// The text of every line in the reply.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns the complete message as a single string with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Returns `true` if this reply indicates success (2xx code).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// Returns `true` if this reply asks for more input (3xx code).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// Returns `true` if this reply indicates a temporary error (4xx code).
    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    /// Returns `true` if this reply indicates a permanent error (5xx code).
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Returns `true` if this reply indicates any error (4xx or 5xx code).
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_temporary_error() || self.is_permanent_error()
    }

    /// Parses a single reply line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Protocol` if the line doesn't match SMTP format.
    pub fn parse_line(line: &str) -> Result<ResponseLine> {
        let Some(code_str) = line.get(..3) else {
            return Err(ClientError::Protocol(format!(
                "Response line too short: '{line}'"
            )));
        };

        if !code_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClientError::Protocol(format!(
                "Invalid status code: '{code_str}'"
            )));
        }
        let code = code_str
            .parse::<u16>()
            .map_err(|_| ClientError::Protocol(format!("Invalid status code: '{code_str}'")))?;

        // A space (or nothing) ends the reply, a dash continues it
        let is_last = match line[3..].chars().next() {
            None | Some(' ') => true,
            Some('-') => false,
            Some(c) => {
                return Err(ClientError::Protocol(format!(
                    "Invalid separator character: '{c}'"
                )));
            }
        };

        let message = line.get(4..).unwrap_or_default().to_string();

        Ok(ResponseLine {
            code,
            is_last,
            message,
        })
    }

    /// Parses a complete, possibly multi-line, reply from the front of `buffer`.
    ///
    /// Returns the parsed `Response` and the number of bytes consumed, or
    /// `None` if the buffer does not yet hold a complete reply.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Protocol` if the reply is malformed.
    pub fn parse_response(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut first_code = None;

        while let Some(end) = buffer[consumed..].iter().position(|&b| b == b'\n') {
            let raw = &buffer[consumed..consumed + end];
            consumed += end + 1;

            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let parsed = Self::parse_line(std::str::from_utf8(raw)?)?;

            match first_code {
                Some(code) if code != parsed.code => {
                    return Err(ClientError::Protocol(format!(
                        "Status code mismatch in multi-line response: expected {code}, got {}",
                        parsed.code
                    )));
                }
                Some(_) => {}
                None => first_code = Some(parsed.code),
            }

            lines.push(parsed.message);

            if parsed.is_last {
                return Ok(Some((Self::new(parsed.code, lines), consumed)));
            }
        }

        // Need more data
        Ok(None)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.lines.join(" "))
    }
}
