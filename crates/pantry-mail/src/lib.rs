pub mod cache;
pub mod dispatcher;
pub mod mailer;
pub mod queue;

use thiserror::Error;

pub use cache::CodeCache;
pub use dispatcher::{DispatcherConfig, VerificationDispatcher};
pub use mailer::{ConsoleMailer, Mailer, SmtpMailer};
pub use queue::{MailJob, MailQueue};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("verification cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("mail queue is closed")]
    QueueClosed,

    #[error("mail queue is full")]
    QueueFull,

    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}
