//! Job cancellation and deadline context

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline carrier handed to the handler with each job
///
/// The orchestrator never interprets the deadline and never interrupts a
/// running handler. Handlers that want to stop early observe the context:
///
/// ```ignore
/// tokio::select! {
///     result = do_work(&job) => result,
///     _ = job.context.done() => Err(JobError::Cancelled),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    /// Token owned by this job; cancelling it affects only this job
    token: CancellationToken,

    /// Token of the run that dispatched the job, attached at dispatch time
    run_token: Option<CancellationToken>,

    /// Optional deadline, for handlers to honor
    deadline: Option<Instant>,

    /// Time budget measured from dispatch, folded into `deadline` when a
    /// worker picks the job up
    timeout: Option<Duration>,
}

impl JobContext {
    /// Create a fresh context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Set a deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a time budget that starts when a worker picks the job up
    ///
    /// Time spent waiting in the queue does not count against it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Time budget, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get a token that cancels this job only
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check if the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Check if this job or its run was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
            || self
                .run_token
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    /// Resolves once this job or its run is cancelled
    pub async fn cancelled(&self) {
        match &self.run_token {
            Some(run) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = run.cancelled() => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Resolves once the job is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancelled().await,
        }
    }

    pub(crate) fn attach_run(&mut self, run: &CancellationToken) {
        self.run_token = Some(run.clone());
    }

    /// Turn the time budget into a deadline starting at `started`
    ///
    /// The earlier of an explicit deadline and `started + timeout` wins.
    pub(crate) fn start_timeout(&mut self, started: Instant) {
        if let Some(timeout) = self.timeout.take() {
            let budget = started + timeout;
            self.deadline = Some(self.deadline.map_or(budget, |d| d.min(budget)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = JobContext::new();
        assert!(!ctx.is_cancelled());
        assert!(!ctx.is_expired());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_own_token_cancels() {
        let ctx = JobContext::new();
        ctx.cancellation_token().cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_run_token_cancels() {
        let run = CancellationToken::new();
        let mut ctx = JobContext::new();
        ctx.attach_run(&run);

        assert!(!ctx.is_cancelled());
        run.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_resolves_at_deadline() {
        let deadline = Instant::now() + Duration::from_millis(250);
        let ctx = JobContext::new().with_deadline(deadline);

        ctx.done().await;

        assert!(ctx.is_expired());
        assert!(!ctx.is_cancelled());
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_starts_at_dispatch() {
        let mut ctx = JobContext::new().with_timeout(Duration::from_secs(2));
        assert!(ctx.deadline().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let started = Instant::now();
        ctx.start_timeout(started);

        assert_eq!(ctx.deadline(), Some(started + Duration::from_secs(2)));
        assert!(ctx.timeout().is_none());
        assert!(!ctx.is_expired());
    }

    #[test]
    fn test_earlier_deadline_wins_over_timeout() {
        let now = Instant::now();
        let mut ctx = JobContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_timeout(Duration::from_secs(10));

        ctx.start_timeout(now);

        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_from_run() {
        let run = CancellationToken::new();
        let mut ctx = JobContext::new();
        ctx.attach_run(&run);

        let waiter = tokio::spawn(async move { ctx.cancelled().await });
        run.cancel();

        waiter.await.unwrap();
    }
}
