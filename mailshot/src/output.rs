//! What the run prints on stdout.
//!
//! Replies to raw commands and STARTTLS are echoed as `(code, 'text')`,
//! followed by a single success or failure line.

use std::io::{self, Write};

use mailshot_smtp::client::{Response, Step, SubmissionReport};

pub const SUCCESS: &str = "Email sent successfully!";

fn reply(out: &mut impl Write, response: &Response) -> io::Result<()> {
    writeln!(out, "({}, '{}')", response.code, response.message())
}

/// Writes one completed step. Greetings, the submission itself and the
/// close are summarised by the final line instead.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn step(out: &mut impl Write, step: &Step) -> io::Result<()> {
    match step {
        Step::Command { response, .. } | Step::StartTls(response) => reply(out, response),
        Step::Greeting { .. } | Step::Submitted { .. } | Step::Closed(_) => Ok(()),
    }
}

/// Writes every step and the outcome of `report`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn report(out: &mut impl Write, report: &SubmissionReport) -> io::Result<()> {
    for completed in &report.steps {
        step(out, completed)?;
    }

    match &report.outcome {
        Ok(_) => writeln!(out, "{SUCCESS}"),
        Err(err) => writeln!(out, "Failed to send email. Error: {err}"),
    }
}
