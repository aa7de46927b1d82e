//! SMTP submission client used by `mailshot`.
//!
//! The [`client`] module holds everything needed to deliver one message over
//! one session: the message builder, the transport client and the submission
//! sequence that ties them together.

pub mod client;
