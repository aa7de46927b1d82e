//! TLS settings for the STARTTLS upgrade.

use serde::{Deserialize, Serialize};

/// TLS certificate validation policy.
///
/// Controls whether to accept invalid or self-signed certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TlsCertificatePolicy {
    /// Whether to accept invalid TLS certificates (self-signed, expired, etc.).
    ///
    /// **SECURITY WARNING**: Setting this to `true` disables certificate validation
    /// and makes the connection vulnerable to man-in-the-middle attacks.
    ///
    /// Only set to `true` for testing with self-signed certificates.
    ///
    /// Default: `false` (validate certificates)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl TlsCertificatePolicy {
    /// Validate certificates against the system trust store.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            accept_invalid_certs: false,
        }
    }

    /// Accept any certificate the server presents.
    ///
    /// **WARNING**: Only use in test environments.
    #[must_use]
    pub const fn insecure() -> Self {
        Self {
            accept_invalid_certs: true,
        }
    }
}
