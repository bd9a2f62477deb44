//! Dispatcher - fire-and-forget background execution of dispatch requests
//!
//! Every accepted request gets its own tokio task, detached from the HTTP
//! request that created it. The task holds off its first delivery until the
//! caller releases the [`Submission`], so the HTTP acknowledgement is built
//! before anything is sent. An optional semaphore caps how many of those
//! tasks deliver at the same time; without it concurrency is unbounded.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tp_common::{DispatchReport, DispatchRequest};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::delivery::DeliveryClient;
use crate::dispatch::{run_bulk, run_single};
use crate::error::DispatchError;
use crate::pacing::PacingPolicy;

pub struct Dispatcher {
    client: Arc<dyn DeliveryClient>,
    pacing: PacingPolicy,
    limiter: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
    accepting: AtomicBool,
}

/// A spawned dispatch job waiting to be released.
///
/// The job does not deliver anything until [`release`](Self::release) is
/// called or the submission is dropped.
pub struct Submission {
    handle: JoinHandle<DispatchReport>,
    start: oneshot::Sender<()>,
}

impl Submission {
    /// Let the job start delivering. The returned handle may be dropped.
    pub fn release(self) -> JoinHandle<DispatchReport> {
        // Err only if the job task is already gone
        let _ = self.start.send(());
        self.handle
    }
}

/// Decrements the in-flight gauge when the background task ends, including
/// when it panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub fn new(client: Arc<dyn DeliveryClient>, pacing: PacingPolicy) -> Self {
        Self {
            client,
            pacing,
            limiter: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            accepting: AtomicBool::new(true),
        }
    }

    /// Allow at most `max_jobs` dispatch loops to deliver at once. Requests
    /// beyond the cap are still accepted and wait their turn.
    pub fn with_max_concurrent_jobs(mut self, max_jobs: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(max_jobs.max(1))));
        self
    }

    /// Background jobs running or waiting for a permit
    pub fn in_flight_jobs(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting new requests. Jobs already running are left alone.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Spawn the dispatch loop for `request` and return immediately.
    ///
    /// The loop waits for the returned [`Submission`] to be released, then
    /// keeps running until it completes or the process exits.
    pub fn submit(&self, request: DispatchRequest) -> Result<Submission, DispatchError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(DispatchError::ShutdownInProgress);
        }

        let job_id = Uuid::new_v4();
        let kind = request.kind();
        let client = Arc::clone(&self.client);
        let pacing = self.pacing;
        let limiter = self.limiter.clone();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        debug!(job_id = %job_id, kind = kind, in_flight = self.in_flight_jobs(), "Dispatch job accepted");

        let (start, started) = oneshot::channel::<()>();

        let span = info_span!("dispatch_job", job_id = %job_id, kind = kind);
        let handle = tokio::spawn(
            async move {
                let _guard = guard;

                // Released or dropped, either way the caller is done with the request.
                let _ = started.await;

                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            error!("Dispatch limiter closed, dropping job");
                            return DispatchReport::default();
                        }
                    },
                    None => None,
                };

                info!("Dispatch job started");
                execute(client.as_ref(), &pacing, request).await
            }
            .instrument(span),
        );

        Ok(Submission { handle, start })
    }
}

async fn execute(client: &dyn DeliveryClient, pacing: &PacingPolicy, request: DispatchRequest) -> DispatchReport {
    match request {
        DispatchRequest::Single(job) => match run_single(client, pacing, &job).await {
            Ok(report) => {
                info!(
                    recipient = %job.recipient,
                    messages_delivered = report.messages_delivered,
                    "Message processing completed"
                );
                report
            }
            Err(failure) => {
                error!(
                    recipient = %job.recipient,
                    message_number = failure.failed_index + 1,
                    error = %failure.error,
                    "Error sending messages"
                );
                DispatchReport {
                    messages_delivered: failure.delivered(),
                    recipients_failed: 1,
                    ..Default::default()
                }
            }
        },
        DispatchRequest::Bulk { recipients, batch } => run_bulk(client, pacing, &recipients, &batch).await,
    }
}
