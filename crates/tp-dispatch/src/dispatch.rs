//! Dispatch loop - paced, sequential delivery of a message batch
//!
//! - Messages for one recipient go out strictly in batch order
//! - A random pause precedes every message except the first
//! - Bulk runs pause again between recipients and isolate failures per recipient

use tp_common::{DispatchJob, DispatchReport, MessageBatch, Recipient, RecipientEntry};
use tracing::{error, info};

use crate::delivery::DeliveryClient;
use crate::error::DeliveryError;
use crate::pacing::PacingPolicy;

/// A recipient's sequence stopped early.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based index of the message that failed
    pub failed_index: usize,
    pub error: DeliveryError,
}

impl BatchFailure {
    /// Messages delivered before the failure
    pub fn delivered(&self) -> usize {
        self.failed_index
    }
}

/// Send every message of `batch` to `recipient`, in order.
///
/// Stops at the first failure; nothing after it is attempted.
pub async fn send_batch(
    client: &dyn DeliveryClient,
    pacing: &PacingPolicy,
    recipient: &Recipient,
    batch: &MessageBatch,
) -> Result<usize, BatchFailure> {
    let total = batch.len();

    for (index, message) in batch.iter().enumerate() {
        if index > 0 {
            pacing.pause().await;
        }

        if let Err(error) = client.deliver(recipient, message).await {
            return Err(BatchFailure {
                failed_index: index,
                error,
            });
        }

        info!(
            recipient = %recipient,
            message_number = index + 1,
            total = total,
            "Sent message"
        );
    }

    Ok(total)
}

/// Run a single-recipient job. A delivery failure aborts the job and is
/// returned to the caller (the background task, which logs it).
pub async fn run_single(
    client: &dyn DeliveryClient,
    pacing: &PacingPolicy,
    job: &DispatchJob,
) -> Result<DispatchReport, BatchFailure> {
    let delivered = send_batch(client, pacing, &job.recipient, &job.batch).await?;

    Ok(DispatchReport {
        messages_delivered: delivered,
        recipients_completed: 1,
        ..Default::default()
    })
}

/// Run a bulk job over `recipients` in input order.
///
/// Rejected entries are logged and skipped without a pause. Between two
/// attempted recipients there is one extra pause, whether or not the earlier
/// one failed. Never fails: every problem ends up in the log and the report.
pub async fn run_bulk(
    client: &dyn DeliveryClient,
    pacing: &PacingPolicy,
    recipients: &[RecipientEntry],
    batch: &MessageBatch,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut attempted_any = false;

    for entry in recipients {
        let recipient = match entry {
            RecipientEntry::Valid(recipient) => recipient,
            RecipientEntry::Rejected { raw } => {
                error!(phone_number = %raw, "Invalid phone number format");
                report.recipients_skipped += 1;
                continue;
            }
        };

        if attempted_any {
            pacing.pause().await;
        }
        attempted_any = true;

        match send_batch(client, pacing, recipient, batch).await {
            Ok(delivered) => {
                report.messages_delivered += delivered;
                report.recipients_completed += 1;
            }
            Err(failure) => {
                error!(
                    recipient = %recipient,
                    message_number = failure.failed_index + 1,
                    error = %failure.error,
                    "Failed processing number"
                );
                report.messages_delivered += failure.delivered();
                report.recipients_failed += 1;
            }
        }
    }

    info!(
        messages_delivered = report.messages_delivered,
        recipients_completed = report.recipients_completed,
        recipients_failed = report.recipients_failed,
        recipients_skipped = report.recipients_skipped,
        "Bulk message processing completed"
    );

    report
}
