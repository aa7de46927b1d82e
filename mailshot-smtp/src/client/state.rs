use std::fmt;

/// Where a client session is in the submission sequence.
///
/// ```text
/// Unconnected -> Connected -> [CommandSent]* -> Greeted -> [TlsUpgraded -> Greeted] -> Submitted -> Closed
/// ```
///
/// Any failure moves straight to `Closed`; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unconnected,
    Connected,
    CommandSent,
    Greeted,
    TlsUpgraded,
    Submitted,
    Closed,
}

impl SessionState {
    /// Returns `true` once the session can no longer be used.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the connection is currently encrypted.
    ///
    /// A second EHLO after the upgrade moves back to `Greeted`, so this only
    /// reports the state immediately after STARTTLS.
    #[must_use]
    pub const fn is_upgraded(self) -> bool {
        matches!(self, Self::TlsUpgraded)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
            Self::CommandSent => "command-sent",
            Self::Greeted => "greeted",
            Self::TlsUpgraded => "tls-upgraded",
            Self::Submitted => "submitted",
            Self::Closed => "closed",
        })
    }
}
