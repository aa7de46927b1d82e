//! Timeout configuration for a single SMTP client session.
//!
//! Every network step of a submission waits at most the configured number of
//! seconds for the server. The values are deliberately shorter than the
//! RFC 5321 server-side recommendations so that a misbehaving server under
//! test is reported quickly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client-side SMTP timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTimeouts {
    /// Timeout for establishing the TCP connection and reading the greeting.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// Timeout for EHLO/HELO, RSET and raw commands.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// Timeout for the STARTTLS command and the TLS handshake.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::starttls_secs")]
    pub starttls_secs: u64,

    /// Timeout for MAIL FROM.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::mail_from_secs")]
    pub mail_from_secs: u64,

    /// Timeout for each RCPT TO.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::rcpt_to_secs")]
    pub rcpt_to_secs: u64,

    /// Timeout for DATA and the message transfer.
    ///
    /// Default: 120 seconds (2 minutes)
    #[serde(default = "defaults::data_secs")]
    pub data_secs: u64,

    /// Timeout for QUIT.
    ///
    /// Default: 10 seconds (a slow QUIT never fails a submission)
    #[serde(default = "defaults::quit_secs")]
    pub quit_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            command_secs: defaults::command_secs(),
            starttls_secs: defaults::starttls_secs(),
            mail_from_secs: defaults::mail_from_secs(),
            rcpt_to_secs: defaults::rcpt_to_secs(),
            data_secs: defaults::data_secs(),
            quit_secs: defaults::quit_secs(),
        }
    }
}

impl ClientTimeouts {
    /// Uses the same number of seconds for every operation.
    #[must_use]
    pub const fn uniform(secs: u64) -> Self {
        Self {
            connect_secs: secs,
            command_secs: secs,
            starttls_secs: secs,
            mail_from_secs: secs,
            rcpt_to_secs: secs,
            data_secs: secs,
            quit_secs: secs,
        }
    }

    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn starttls(&self) -> Duration {
        Duration::from_secs(self.starttls_secs)
    }

    #[must_use]
    pub const fn mail_from(&self) -> Duration {
        Duration::from_secs(self.mail_from_secs)
    }

    #[must_use]
    pub const fn rcpt_to(&self) -> Duration {
        Duration::from_secs(self.rcpt_to_secs)
    }

    #[must_use]
    pub const fn data(&self) -> Duration {
        Duration::from_secs(self.data_secs)
    }

    #[must_use]
    pub const fn quit(&self) -> Duration {
        Duration::from_secs(self.quit_secs)
    }
}

mod defaults {
    pub const fn connect_secs() -> u64 {
        30
    }
    pub const fn command_secs() -> u64 {
        30
    }
    pub const fn starttls_secs() -> u64 {
        30
    }
    pub const fn mail_from_secs() -> u64 {
        30
    }
    pub const fn rcpt_to_secs() -> u64 {
        30
    }
    pub const fn data_secs() -> u64 {
        120 // 2 minutes
    }
    pub const fn quit_secs() -> u64 {
        10
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_client_timeouts_defaults() {
        let timeouts = ClientTimeouts::default();
        assert_eq!(timeouts.connect_secs, 30);
        assert_eq!(timeouts.command_secs, 30);
        assert_eq!(timeouts.starttls_secs, 30);
        assert_eq!(timeouts.mail_from_secs, 30);
        assert_eq!(timeouts.rcpt_to_secs, 30);
        assert_eq!(timeouts.data_secs, 120);
        assert_eq!(timeouts.quit_secs, 10);
    }

    #[test]
    fn test_durations() {
        let timeouts = ClientTimeouts::default();
        assert_eq!(timeouts.connect(), Duration::from_secs(30));
        assert_eq!(timeouts.data(), Duration::from_secs(120));
        assert_eq!(timeouts.quit(), Duration::from_secs(10));
    }

    #[test]
    fn test_uniform() {
        let timeouts = ClientTimeouts::uniform(2);
        assert_eq!(timeouts.command(), Duration::from_secs(2));
        assert_eq!(timeouts.rcpt_to(), Duration::from_secs(2));
        assert_eq!(timeouts.starttls(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let timeouts: ClientTimeouts = ron::from_str("(data_secs: 5)").unwrap();
        assert_eq!(timeouts.data_secs, 5);
        assert_eq!(timeouts.connect_secs, 30);
        assert_eq!(timeouts.quit_secs, 10);
    }
}
