//! SMTP client for submitting a single message.
//!
//! This module provides:
//!
//! - [`MessageBuilder`] for rendering a plain-text MIME message with
//!   To/Cc/Bcc headers and resolving its envelope
//! - [`SmtpClient`], a plain TCP session that can be upgraded with STARTTLS
//! - The [`Transport`] and [`RawCommand`] traits separating structured
//!   operations from the raw-line escape hatch
//! - [`Submission`], which runs connect, raw commands, greeting, STARTTLS,
//!   submit and close in order and always closes the session
//!
//! # Examples
//!
//! ## Sending through a test server
//!
//! ```no_run
//! use mailshot_smtp::client::{MessageBuilder, Submission, TcpConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let message = MessageBuilder::new()
//!     .from("your_email@example.com")
//!     .to("receiver_email@example.com")
//!     .cc_multiple(&["cc_email1@example.com", "cc_email2@example.com"])
//!     .subject("Test")
//!     .body("Hello World")
//!     .build()?;
//!
//! let report = Submission::new("localhost")
//!     .run(&TcpConnector::new("localhost:2525", "localhost"), &message)
//!     .await;
//!
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a session by hand
//!
//! ```no_run
//! use mailshot_common::config::ClientTimeouts;
//! use mailshot_smtp::client::{RawCommand, SmtpClient, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client =
//!     SmtpClient::connect("localhost:2525", "localhost".into(), ClientTimeouts::default()).await?;
//!
//! let reply = client.send_raw_command("VRFY user@example.com").await?;
//! println!("{reply}");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod response;
mod smtp_client;
mod state;
mod submission;
mod transport;

pub use error::{ClientError, DeliveryStage, Result};
pub use message::{Envelope, Message, MessageBuilder, RecipientPolicy};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
pub use state::SessionState;
pub use submission::{Step, Submission, SubmissionReport};
pub use transport::{Connector, Greeting, RawCommand, TcpConnector, Transport};
