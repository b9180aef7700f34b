//! Submit-and-poll execution for long-running REST statements.

use std::sync::Arc;
use std::time::{Duration, Instant};

use graphbridge_core::{BridgeError, BridgeResult, PgxConfig};
use tracing::{debug, info, warn};

use crate::session::SessionManager;
use crate::transport::{QueryRequest, QueryResponse, RestTransport};

/// Default spacing between completion checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Lifecycle of an async job. Only `Pending` has outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Complete,
    TimedOut,
    Failed,
}

/// A submitted batch. Awaiting it consumes the handle, so a job that
/// reached a terminal state cannot be polled again.
#[derive(Debug)]
pub struct AsyncJob {
    result_id: String,
    submitted_at: Instant,
    state: JobState,
}

impl AsyncJob {
    fn new(result_id: String) -> Self {
        Self {
            result_id,
            submitted_at: Instant::now(),
            state: JobState::Pending,
        }
    }

    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn finish(&mut self, state: JobState) {
        debug!(result_id = %self.result_id, from = ?self.state, to = ?state, "Async job transition");
        self.state = state;
    }
}

pub struct AsyncJobPoller {
    transport: Arc<dyn RestTransport>,
    session: Arc<SessionManager>,
    formatter: String,
    page_size: u64,
    poll_interval: Duration,
}

impl AsyncJobPoller {
    pub fn new(transport: Arc<dyn RestTransport>, session: Arc<SessionManager>, config: &PgxConfig) -> Self {
        Self {
            transport,
            session,
            formatter: config.formatter.clone(),
            page_size: config.page_size,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start an async batch.
    pub async fn submit(&self, statements: &[String], driver: &str) -> BridgeResult<AsyncJob> {
        let authorization = self.session.authorization_header().await?;
        let request = QueryRequest::new(statements.to_vec(), driver, &self.formatter, self.page_size);

        let result_id = self
            .transport
            .submit_async(&authorization, &request)
            .await
            .map_err(|e| match e {
                BridgeError::Submission(_) => e,
                other => BridgeError::Submission(other.to_string()),
            })?;

        info!(result_id = %result_id, statements = statements.len(), "Submitted async query");
        Ok(AsyncJob::new(result_id))
    }

    /// Poll until the job completes, `max_wait` elapses, or a poll fails.
    ///
    /// A single poll error is terminal; there is no retry.
    pub async fn await_completion(&self, mut job: AsyncJob, max_wait: Duration) -> BridgeResult<QueryResponse> {
        loop {
            let complete = match self.check(&job).await {
                Ok(complete) => complete,
                Err(e) => {
                    job.finish(JobState::Failed);
                    warn!(result_id = %job.result_id, error = %e, "Async poll failed");
                    return Err(BridgeError::Poll {
                        result_id: job.result_id,
                        message: e.to_string(),
                    });
                }
            };

            if complete {
                let response = self.fetch(&job).await;
                return match response {
                    Ok(response) => {
                        job.finish(JobState::Complete);
                        Ok(response)
                    }
                    Err(e) => {
                        job.finish(JobState::Failed);
                        Err(BridgeError::Poll {
                            result_id: job.result_id,
                            message: e.to_string(),
                        })
                    }
                };
            }

            let elapsed = job.submitted_at.elapsed();
            if elapsed >= max_wait {
                job.finish(JobState::TimedOut);
                return Err(BridgeError::Timeout {
                    result_id: job.result_id,
                    waited_ms: elapsed.as_millis() as u64,
                });
            }

            tokio::time::sleep(self.poll_interval.min(max_wait - elapsed)).await;
        }
    }

    /// Submit then await.
    pub async fn run(&self, statements: &[String], driver: &str, max_wait: Duration) -> BridgeResult<QueryResponse> {
        let job = self.submit(statements, driver).await?;
        self.await_completion(job, max_wait).await
    }

    async fn check(&self, job: &AsyncJob) -> BridgeResult<bool> {
        let authorization = self.session.authorization_header().await?;
        self.transport.poll_async(&authorization, &job.result_id).await
    }

    async fn fetch(&self, job: &AsyncJob) -> BridgeResult<QueryResponse> {
        let authorization = self.session.authorization_header().await?;
        self.transport.fetch_async_result(&authorization, &job.result_id).await
    }
}
