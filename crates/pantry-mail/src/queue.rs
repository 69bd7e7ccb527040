use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::MailError;
use crate::mailer::Mailer;

const QUEUE_CAPACITY: usize = 1024;

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailJob {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub recipients: Vec<String>,
}

/// Handle to the background mail worker. Cloning shares the same worker.
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<MailJob>,
}

impl MailQueue {
    /// Spawn the worker task. The worker exits once every handle is dropped
    /// and the backlog is drained.
    pub fn start(mailer: Arc<dyn Mailer>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(rx, mailer));
        (Self { tx }, handle)
    }

    /// Hand a job to the worker without waiting for delivery.
    pub fn enqueue(&self, job: MailJob) -> Result<(), MailError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MailError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => MailError::QueueClosed,
        })
    }
}

async fn run_worker(mut rx: mpsc::Receiver<MailJob>, mailer: Arc<dyn Mailer>) {
    while let Some(job) = rx.recv().await {
        let mailer = mailer.clone();
        let recipients = job.recipients.clone();

        // SMTP I/O is blocking
        match tokio::task::spawn_blocking(move || mailer.send(&job)).await {
            Ok(Ok(())) => debug!(?recipients, "Mail delivered"),
            Ok(Err(e)) => warn!(?recipients, "Mail delivery failed: {}", e),
            Err(e) => error!("Mail worker join error: {}", e),
        }
    }
    debug!("Mail worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::RecordingMailer;

    fn job(n: usize) -> MailJob {
        MailJob {
            subject: format!("subject {n}"),
            body: "body".into(),
            from: "noreply@pantry.local".into(),
            recipients: vec![format!("user{n}@example.com")],
        }
    }

    #[tokio::test]
    async fn worker_delivers_in_order() {
        let mailer = RecordingMailer::new();
        let (queue, handle) = MailQueue::start(Arc::new(mailer.clone()));

        for n in 0..3 {
            queue.enqueue(job(n)).unwrap();
        }
        drop(queue);
        handle.await.unwrap();

        let subjects: Vec<_> = mailer.sent().into_iter().map(|j| j.subject).collect();
        assert_eq!(subjects, vec!["subject 0", "subject 1", "subject 2"]);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_worker() {
        let mailer = RecordingMailer::failing();
        let (queue, handle) = MailQueue::start(Arc::new(mailer.clone()));

        queue.enqueue(job(0)).unwrap();
        queue.enqueue(job(1)).unwrap();
        drop(queue);
        handle.await.unwrap();

        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn enqueue_after_worker_stopped() {
        let (queue, handle) = MailQueue::start(Arc::new(RecordingMailer::new()));
        handle.abort();
        let _ = handle.await;

        assert!(matches!(queue.enqueue(job(0)), Err(MailError::QueueClosed)));
    }
}
