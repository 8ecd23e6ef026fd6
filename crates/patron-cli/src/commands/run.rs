// Run a batch of jobs from a file

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use patron::{
    CancellationToken, Job, JobId, Orchestrator, OrchestratorConfig, RunSummary, WorkerResult,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::handlers::{build_pool, HandlerKind};
use crate::output::{print_table_header, print_table_row, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Wait for every job, print results in submission order
    Sync,
    /// Print each result as soon as its job finishes
    Stream,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSON file holding an array of jobs: [{"id": 1, "payload": {...}}]
    pub file: PathBuf,

    /// Number of concurrent workers (defaults to PATRON_WORKER_COUNT or 5)
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Execution mode
    #[arg(long, value_enum, default_value = "sync")]
    pub mode: RunMode,

    /// Handler applied to every job
    #[arg(long, value_enum, default_value = "http")]
    pub handler: HandlerKind,

    /// Simulated latency for the sleep handler, in milliseconds
    #[arg(long, default_value = "1000")]
    pub sleep_ms: u64,

    /// Per-job time limit in seconds, counted from when a worker starts the job
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// One row of output
#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub job_id: JobId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl From<&WorkerResult> for ResultRow {
    fn from(result: &WorkerResult) -> Self {
        let status = match &result.error {
            None => "ok",
            Some(err) if err.is_cancelled() => "cancelled",
            Some(_) => "failed",
        };
        Self {
            job_id: result.job_id,
            status,
            error: result.error.as_ref().map(ToString::to_string),
            elapsed_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

const COLUMNS: [(&str, usize); 4] = [("JOB", 10), ("STATUS", 10), ("ELAPSED", 10), ("ERROR", 48)];

/// Execute the run command; returns whether every job succeeded
pub async fn run(args: RunArgs, output: OutputFormat, quiet: bool) -> Result<bool> {
    let mut config = OrchestratorConfig::from_env();
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    config.validate()?;

    let jobs = load_jobs(&args.file, args.timeout.map(Duration::from_secs)).await?;
    if !quiet {
        tracing::info!(
            jobs = jobs.len(),
            workers = config.pool.size,
            handler = ?args.handler,
            mode = ?args.mode,
            "Loaded jobs"
        );
    }

    let pool = build_pool(
        args.handler,
        config.pool.clone(),
        Duration::from_millis(args.sleep_ms),
    );
    let orchestrator = Orchestrator::new(pool);
    for job in jobs {
        orchestrator.add_job_to_queue(job);
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let (rows, summary) = match args.mode {
        RunMode::Sync => {
            let started = Instant::now();
            let results = orchestrator.start(cancel).await?;
            let summary = RunSummary::from_results(&results, started.elapsed());
            let rows: Vec<ResultRow> = results.iter().map(ResultRow::from).collect();
            if output.is_text() {
                print_table_header(&COLUMNS);
                rows.iter().for_each(print_row);
            }
            (rows, summary)
        }
        RunMode::Stream => {
            let (tx, mut rx) = mpsc::channel(config.result_buffer);
            let handle = orchestrator.start_async(cancel, tx)?;
            if output.is_text() {
                print_table_header(&COLUMNS);
            }
            let mut rows = Vec::new();
            while let Some(result) = rx.recv().await {
                let row = ResultRow::from(&result);
                if output.is_text() {
                    print_row(&row);
                }
                rows.push(row);
            }
            let summary = handle.await.context("streaming run task failed")?;
            (rows, summary)
        }
    };

    if output.is_text() {
        if !quiet {
            println!();
            println!(
                "{} jobs: {} ok, {} failed, {} cancelled in {} ms",
                summary.total,
                summary.succeeded,
                summary.failed,
                summary.cancelled,
                summary.elapsed.as_millis()
            );
        }
    } else {
        output.print_value(&serde_json::json!({ "data": rows, "summary": summary }))?;
    }

    Ok(summary.failed == 0 && summary.cancelled == 0)
}

fn print_row(row: &ResultRow) {
    let job_id = row.job_id.to_string();
    let elapsed = format!("{}ms", row.elapsed_ms);
    print_table_row(&[
        (&job_id, 10),
        (row.status, 10),
        (&elapsed, 10),
        (row.error.as_deref().unwrap_or("-"), 48),
    ]);
}

/// Read jobs from a JSON array, applying an optional per-job time limit
pub async fn load_jobs(path: &Path, timeout: Option<Duration>) -> Result<Vec<Job>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut jobs: Vec<Job> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse jobs from {}", path.display()))?;

    if let Some(timeout) = timeout {
        jobs = jobs
            .into_iter()
            .map(|job| job.with_timeout(timeout))
            .collect();
    }

    Ok(jobs)
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining jobs");
            cancel.cancel();
        }
    });
}
