//! Configuration types shared by the SMTP client and the `mailshot` binary.
//!
//! - [`timeouts`]: per-operation deadlines for a client session
//! - [`tls`]: certificate validation settings used during STARTTLS

pub mod timeouts;
pub mod tls;

pub use timeouts::ClientTimeouts;
pub use tls::TlsCertificatePolicy;
