//! `memo-run generate` command implementation

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::job::{JobRequest, JobResult, JobSupervisor, ProgressUpdate};

#[derive(Args)]
pub struct GenerateArgs {
    /// Portrait image of the face to animate
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Driving audio clip
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Use the image as-is instead of padding it to a 1:1 aspect ratio
    #[arg(long)]
    pub allow_non_square: bool,

    /// Keep the working area when the run fails
    #[arg(long)]
    pub keep_work_dir: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Final outcome as printed by `--json`.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn new(result: &JobResult, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        match result {
            Ok(path) => Self {
                status: "success",
                output: Some(path.clone()),
                error: None,
                reason: None,
                started_at,
                finished_at,
            },
            Err(e) => Self {
                status: "failure",
                output: None,
                error: Some(e.kind().to_string()),
                reason: Some(e.to_string()),
                started_at,
                finished_at,
            },
        }
    }
}

pub async fn run(mut config: Config, args: GenerateArgs) -> Result<()> {
    if args.keep_work_dir {
        config.job.keep_work_dir = true;
    }

    let request = JobRequest {
        image: args.image,
        audio: args.audio,
        allow_non_square: args.allow_non_square,
    };
    let supervisor = JobSupervisor::new(config);
    let cancel = supervisor.cancel_token();
    let (tx, rx) = mpsc::channel::<ProgressUpdate>();

    let started_at = Utc::now();
    let mut job = tokio::task::spawn_blocking(move || supervisor.run(&request, Some(&tx)));
    let printer = tokio::task::spawn_blocking(move || {
        for update in rx {
            render(&update);
        }
    });

    let result = tokio::select! {
        res = &mut job => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Cancelling...");
            cancel.cancel();
            job.await
        }
    }
    .context("generation task failed")?;
    wait_for_renderer(printer).await;

    let report = JobReport::new(&result, started_at, Utc::now());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match result {
        Ok(path) => {
            if !args.json {
                println!("✓ Generated video: {}", path.display());
            }
            Ok(())
        }
        Err(e) => bail!("{}", e),
    }
}

/// The report is still printed if rendering failed.
async fn wait_for_renderer(printer: JoinHandle<()>) {
    if let Err(e) = printer.await {
        tracing::warn!("progress renderer failed: {}", e);
    }
}

fn render(update: &ProgressUpdate) {
    eprintln!(
        "[PROGRESS] {:5.1}% stage={} {}",
        update.fraction * 100.0,
        update.stage.unwrap_or("-"),
        update.description.as_deref().unwrap_or("")
    );
}
