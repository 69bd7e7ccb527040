use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use pantry_types::events::AccountCreated;

use crate::MailError;
use crate::cache::CodeCache;
use crate::queue::{MailJob, MailQueue};

pub struct DispatcherConfig {
    /// How long a code stays valid.
    pub code_ttl: Duration,
    /// Link target; `code` and `user_id` are appended as query parameters.
    pub verify_base_url: String,
    pub from: String,
}

/// Sends the verification email for new accounts and checks returned codes.
#[derive(Clone)]
pub struct VerificationDispatcher {
    cache: CodeCache,
    queue: MailQueue,
    config: Arc<DispatcherConfig>,
}

impl VerificationDispatcher {
    pub fn new(cache: CodeCache, queue: MailQueue, config: DispatcherConfig) -> Self {
        Self {
            cache,
            queue,
            config: Arc::new(config),
        }
    }

    /// Generate and cache a code for the new account, then queue the email.
    ///
    /// Returns once the job is queued; delivery happens on the mail worker.
    /// A cache failure aborts before anything is queued.
    pub async fn dispatch(&self, account: &AccountCreated) -> Result<(), MailError> {
        let code = generate_code();

        self.cache
            .store(&cache_key(account.user_id), &code, self.config.code_ttl)
            .await?;

        let job = self.compose(account, &code);
        self.queue.enqueue(job)?;

        info!(user_id = %account.user_id, username = %account.username, "Verification email queued");
        Ok(())
    }

    /// Consume the cached code for `user_id` if `code` matches it.
    pub async fn verify(&self, user_id: Uuid, code: &str) -> Result<bool, MailError> {
        let consumed = self
            .cache
            .consume_if_matches(&cache_key(user_id), code.trim())
            .await?;
        if !consumed {
            warn!(%user_id, "Verification code rejected");
        }
        Ok(consumed)
    }

    /// Put a consumed code back, e.g. when the step after `verify` failed and
    /// the user must be able to retry. The code gets a fresh TTL.
    pub async fn restore(&self, user_id: Uuid, code: &str) -> Result<(), MailError> {
        self.cache
            .store(&cache_key(user_id), code.trim(), self.config.code_ttl)
            .await
    }

    fn compose(&self, account: &AccountCreated, code: &str) -> MailJob {
        let url = format!(
            "{}?code={}&user_id={}",
            self.config.verify_base_url, code, account.user_id
        );
        MailJob {
            subject: "Verify your email!".to_string(),
            body: format!("Verify code: {code}\nURL: {url}"),
            from: self.config.from.clone(),
            recipients: vec![account.email.clone()],
        }
    }
}

/// Six random digits from the thread-local CSPRNG.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

fn cache_key(user_id: Uuid) -> String {
    format!("verify:{user_id}")
}
