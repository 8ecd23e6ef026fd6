// Built-in job handlers
//
// Every handler requires the `name` payload key, so a job without it fails
// with a payload-not-found error.

use std::time::Duration;

use clap::ValueEnum;
use patron::{HandlerResult, Job, JobError, WorkerPool, WorkerPoolConfig};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// GET the payload's `dest_url` and fail on a non-success status
    Http,
    /// Log the payload and succeed
    Echo,
    /// Wait, then log the payload `name`
    Sleep,
}

/// Build a worker pool running the chosen handler
pub fn build_pool(kind: HandlerKind, config: WorkerPoolConfig, sleep: Duration) -> WorkerPool {
    match kind {
        HandlerKind::Http => {
            let client = reqwest::Client::new();
            WorkerPool::with_config(
                move |job: Job| {
                    let client = client.clone();
                    async move { http_request(&client, &job).await }
                },
                config,
            )
        }
        HandlerKind::Echo => WorkerPool::with_config(|job: Job| async move { echo(&job) }, config),
        HandlerKind::Sleep => WorkerPool::with_config(
            move |job: Job| async move { sleep_then_log(&job, sleep).await },
            config,
        ),
    }
}

async fn http_request(client: &reqwest::Client, job: &Job) -> HandlerResult {
    let name = job.get_payload("name")?;
    let url: String = job.get_payload_as("dest_url")?;

    let response = tokio::select! {
        response = client.get(&url).send() => response.map_err(JobError::handler)?,
        _ = job.context.done() => return Err(interrupted(job)),
    };
    let status = response.status();
    response.error_for_status().map_err(JobError::handler)?;

    info!(job_id = %job.id, %name, %url, %status, "HTTP request completed");
    Ok(())
}

fn echo(job: &Job) -> HandlerResult {
    let name = job.get_payload("name")?;
    let payload = serde_json::to_string(&job.payload).map_err(JobError::handler)?;

    info!(job_id = %job.id, %name, %payload, "Job completed");
    Ok(())
}

async fn sleep_then_log(job: &Job, sleep: Duration) -> HandlerResult {
    tokio::select! {
        _ = tokio::time::sleep(sleep) => {}
        _ = job.context.done() => return Err(interrupted(job)),
    }
    let name = job.get_payload("name")?;

    info!(job_id = %job.id, %name, "Job completed");
    Ok(())
}

/// Error for a handler that stopped early
fn interrupted(job: &Job) -> JobError {
    if job.context.is_cancelled() {
        JobError::Cancelled
    } else {
        JobError::from(anyhow::anyhow!("job {} exceeded its deadline", job.id))
    }
}

#[cfg(test)]
mod tests {
    use patron::{CancellationToken, Orchestrator};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_handler_requires_name() {
        let pool = build_pool(
            HandlerKind::Sleep,
            WorkerPoolConfig::new(2),
            Duration::from_secs(1),
        );
        let orchestrator = Orchestrator::new(pool);
        orchestrator.add_job_to_queue(Job::new(10).with_payload("name", "HTTP Request"));
        orchestrator.add_job_to_queue(Job::new(11));

        let results = orchestrator.start(CancellationToken::new()).await.unwrap();

        assert!(results[0].is_success());
        assert!(results[1]
            .error
            .as_ref()
            .is_some_and(JobError::is_payload_not_found));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_handler_honors_deadline() {
        let pool = build_pool(
            HandlerKind::Sleep,
            WorkerPoolConfig::new(1),
            Duration::from_secs(10),
        );
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);

        let result = pool
            .run(Job::new(1).with_payload("name", "slow").with_deadline(deadline))
            .await;

        let message = result.error.map(|e| e.to_string());
        assert_eq!(message.as_deref(), Some("job 1 exceeded its deadline"));
    }

    #[tokio::test]
    async fn test_echo_handler() {
        let pool = build_pool(HandlerKind::Echo, WorkerPoolConfig::new(1), Duration::ZERO);

        let ok = pool.run(Job::new(1).with_payload("name", "echo")).await;
        let missing = pool.run(Job::new(2)).await;

        assert!(ok.is_success());
        assert!(missing.error.is_some());
    }

    #[tokio::test]
    async fn test_http_handler_requires_dest_url() {
        let pool = build_pool(HandlerKind::Http, WorkerPoolConfig::new(1), Duration::ZERO);

        let result = pool.run(Job::new(1).with_payload("name", "HTTP Request")).await;

        assert!(matches!(
            result.error,
            Some(JobError::PayloadNotFound { ref key }) if key == "dest_url"
        ));
    }
}
