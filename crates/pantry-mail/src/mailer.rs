use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::MailError;
use crate::queue::MailJob;

/// A mail transport. `send` blocks; the queue worker calls it from a
/// blocking thread.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, job: &MailJob) -> Result<(), MailError>;
}

/// SMTP delivery via lettre.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, MailError> {
        let mut builder = SmtpTransport::relay(host)
            .map_err(|e| MailError::Delivery(format!("SMTP relay error: {e}")))?
            .port(port);

        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        info!("SMTP mailer configured for {}:{}", host, port);
        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, job: &MailJob) -> Result<(), MailError> {
        let message = build_message(job)?;
        self.transport
            .send(&message)
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(())
    }
}

fn build_message(job: &MailJob) -> Result<Message, MailError> {
    let from: Mailbox = job
        .from
        .parse()
        .map_err(|e| MailError::Address(format!("{}: {e}", job.from)))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(job.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &job.recipients {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| MailError::Address(format!("{recipient}: {e}")))?;
        builder = builder.to(to);
    }

    builder
        .body(job.body.clone())
        .map_err(|e| MailError::Delivery(format!("failed to build message: {e}")))
}

/// Logs mail instead of sending it. Used when no SMTP host is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, job: &MailJob) -> Result<(), MailError> {
        info!(
            to = ?job.recipients,
            from = %job.from,
            subject = %job.subject,
            body = %job.body,
            "Mail (console delivery)"
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingMailer;

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use std::sync::{Arc, Mutex};

    use super::Mailer;
    use crate::MailError;
    use crate::queue::MailJob;

    /// Keeps every job it is handed. Optionally fails every delivery.
    #[derive(Clone, Default)]
    pub struct RecordingMailer {
        sent: Arc<Mutex<Vec<MailJob>>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<MailJob> {
            self.sent.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }

    impl Mailer for RecordingMailer {
        fn send(&self, job: &MailJob) -> Result<(), MailError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(job.clone());
            }
            if self.fail {
                return Err(MailError::Delivery("recording mailer set to fail".into()));
            }
            Ok(())
        }
    }
}
