//! Outbound mail seam. Delivery failures are logged and swallowed: an OTP
//! that fails to send must not fail the registration that triggered it.

use tracing::{info, warn};

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Development mailer: writes the message to the log instead of sending.
pub struct LogMailer {
    pub from: String,
}

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(from = %self.from, to = %to, subject = %subject, body = %body, "outbound mail");
        Ok(())
    }
}

/// Send without surfacing failures to the caller.
pub fn send_best_effort(mailer: &dyn Mailer, to: &str, subject: &str, body: &str) {
    if let Err(e) = mailer.send(to, subject, body) {
        warn!(error = %e, to = %to, "failed to send mail");
    }
}
