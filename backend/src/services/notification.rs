//! Background queue for alert notifications.
//!
//! Request handlers submit a job and return immediately. A worker drains
//! the queue and runs every job on its own task, fanning it out to its
//! recipients.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::services::sms::{broadcast, SmsSender};
use crate::types::SosId;

#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub sos_id: SosId,
    pub recipients: Vec<String>,
    pub body: String,
}

/// Handle used to enqueue notification jobs.
#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: mpsc::Sender<NotificationJob>,
}

impl NotificationDispatcher {
    /// Starts the worker and returns the submit handle together with the
    /// worker's join handle. The worker exits after every dispatcher clone
    /// is dropped, the queue is drained and every started job has finished.
    pub fn spawn(sender: Arc<dyn SmsSender>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(sender, receiver));
        (Self { queue }, worker)
    }

    /// Enqueues a job without waiting. Never fails the caller: a full or
    /// closed queue drops the job with a warning.
    pub fn submit(&self, job: NotificationJob) {
        if job.recipients.is_empty() {
            tracing::debug!(sos_id = %job.sos_id, "No contacts to notify");
            return;
        }

        match self.queue.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(
                    sos_id = %job.sos_id,
                    recipients = job.recipients.len(),
                    "Notification queue full; alert dropped"
                );
            }
            Err(TrySendError::Closed(job)) => {
                tracing::warn!(
                    sos_id = %job.sos_id,
                    recipients = job.recipients.len(),
                    "Notification worker stopped; alert dropped"
                );
            }
        }
    }
}

async fn run_worker(sender: Arc<dyn SmsSender>, mut receiver: mpsc::Receiver<NotificationJob>) {
    // One task per job: a stalled send only holds up its own session.
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            job = receiver.recv() => match job {
                Some(job) => {
                    in_flight.spawn(deliver(Arc::clone(&sender), job));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join_result(joined);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        log_join_result(joined);
    }
    tracing::debug!("Notification worker stopped");
}

async fn deliver(sender: Arc<dyn SmsSender>, job: NotificationJob) {
    let sos_id = job.sos_id;
    let reports = broadcast(sender, &job.recipients, &job.body).await;

    let mut delivered = 0usize;
    for report in &reports {
        match &report.result {
            Ok(()) => delivered += 1,
            Err(err) => tracing::error!(
                sos_id = %sos_id,
                recipient = %report.recipient,
                error = %err,
                "Failed to send SOS alert"
            ),
        }
    }

    tracing::info!(
        sos_id = %sos_id,
        delivered,
        failed = reports.len() - delivered,
        "SOS alert broadcast finished"
    );
}

fn log_join_result(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        tracing::warn!(error = %err, "SOS alert task did not complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sms::{MockSmsSender, SmsError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Never answers for `+hang`; records every other recipient.
    #[derive(Default)]
    struct StallingSender {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsSender for StallingSender {
        async fn send(&self, to: &str, _body: &str) -> Result<(), SmsError> {
            if to == "+hang" {
                std::future::pending::<()>().await;
            }
            self.delivered.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn job(recipients: &[&str]) -> NotificationJob {
        NotificationJob {
            sos_id: SosId::new(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            body: "help".into(),
        }
    }

    #[tokio::test]
    async fn worker_sends_every_recipient_even_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = MockSmsSender::new();
        mock.expect_send().times(3).returning(move |to, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if to == "+2" {
                Err(SmsError::EmptyRecipient)
            } else {
                Ok(())
            }
        });

        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(mock), 4);
        dispatcher.submit(job(&["+1", "+2", "+3"]));
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_not_queued() {
        let mut mock = MockSmsSender::new();
        mock.expect_send().never();

        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(mock), 1);
        dispatcher.submit(job(&[]));
        drop(dispatcher);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn submit_after_worker_stopped_does_not_panic() {
        let (queue, receiver) = mpsc::channel(1);
        drop(receiver);
        let dispatcher = NotificationDispatcher { queue };
        dispatcher.submit(job(&["+1"]));
    }

    #[tokio::test]
    async fn stalled_send_does_not_delay_other_sessions() {
        let sender = Arc::new(StallingSender::default());
        let (dispatcher, worker) = NotificationDispatcher::spawn(sender.clone(), 4);

        dispatcher.submit(job(&["+hang"]));
        dispatcher.submit(job(&["+2"]));

        let mut delivered = Vec::new();
        for _ in 0..100 {
            delivered = sender.delivered.lock().unwrap().clone();
            if !delivered.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered, vec!["+2".to_string()]);

        worker.abort();
    }

    #[tokio::test]
    async fn worker_finishes_started_jobs_before_stopping() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = MockSmsSender::new();
        mock.expect_send().times(4).returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(mock), 4);
        dispatcher.submit(job(&["+1", "+2"]));
        dispatcher.submit(job(&["+3", "+4"]));
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
