//! Orchestrates one generation run from staged inputs to a finished video.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::Config;
use crate::media::{self, FfmpegTools, MediaTools};
use crate::process::{ProcessSpec, SupervisedProcess};

use super::aggregator::{ProgressAggregator, StageKind, StageTable};
use super::error::{JobError, JobResult};
use super::progress::{ProgressEvent, ProgressSnapshot, ProgressUpdate};
use super::pump;
use super::staging::{self, WorkArea};

/// Inputs for one run. Both media paths are required.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub image: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    pub allow_non_square: bool,
}

impl JobRequest {
    pub fn new(image: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self {
            image: Some(image.into()),
            audio: Some(audio.into()),
            allow_non_square: false,
        }
    }

    pub fn allow_non_square(mut self, allow: bool) -> Self {
        self.allow_non_square = allow;
        self
    }
}

/// Cloneable flag that stops a run. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct JobSupervisor {
    config: Config,
    tools: Box<dyn MediaTools>,
    cancel: CancelToken,
}

impl JobSupervisor {
    pub fn new(config: Config) -> Self {
        let tools = FfmpegTools::new(config.media.ffmpeg.clone(), config.media.ffprobe.clone());
        Self::with_tools(config, Box::new(tools))
    }

    pub fn with_tools(config: Config, tools: Box<dyn MediaTools>) -> Self {
        Self {
            config,
            tools,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops the run in progress (and any later run) when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one job to completion.
    ///
    /// A snapshot is sent on `progress` each time overall progress or its
    /// description changes. Send failures are ignored, so a caller that stops
    /// listening does not affect the run.
    pub fn run(
        &self,
        request: &JobRequest,
        progress: Option<&mpsc::Sender<ProgressUpdate>>,
    ) -> JobResult {
        let (image, audio) = match (&request.image, &request.audio) {
            (Some(image), Some(audio)) if image.is_file() && audio.is_file() => (image, audio),
            _ => return Err(JobError::MissingInput),
        };

        let mut tracker = Tracker::new(self.config.stages, progress);
        tracker.enter(StageKind::Starting, "Starting...");

        let area = WorkArea::create(&self.config.job.work_root())
            .map_err(|e| JobError::Staging(e.to_string()))?;
        tracing::info!("working area {}", area.root().display());

        let result = self.run_in(&area, image, audio, request.allow_non_square, &mut tracker);

        match &result {
            Ok(path) => tracing::info!("generated {}", path.display()),
            Err(e) => {
                tracing::warn!("job failed: {}", e);
                if !self.config.job.keep_work_dir {
                    if let Err(e) = area.remove() {
                        tracing::warn!("failed to remove working area: {}", e);
                    }
                }
            }
        }
        result
    }

    fn run_in(
        &self,
        area: &WorkArea,
        image: &Path,
        audio: &Path,
        allow_non_square: bool,
        tracker: &mut Tracker<'_>,
    ) -> JobResult {
        let mode = self.config.job.stage_mode;
        let mut image = area
            .stage_input(image, "input_image", mode)
            .map_err(|e| JobError::Staging(format!("{}: {}", image.display(), e)))?;
        let audio = area
            .stage_input(audio, "input_audio", mode)
            .map_err(|e| JobError::Staging(format!("{}: {}", audio.display(), e)))?;
        self.check_cancelled()?;

        if allow_non_square {
            tracker.enter(StageKind::Preprocessing, "Using image as-is...");
        } else {
            tracker.enter(StageKind::Preprocessing, "Checking image...");
            image = self.ensure_square(area, image, tracker)?;
        }
        self.check_cancelled()?;

        tracker.enter(StageKind::Generation, "Starting generation...");
        let spec = self.generator_spec(&image, &audio, area.output_dir());
        tracing::info!("running {}", spec.display());
        let mut process = SupervisedProcess::spawn(&spec).map_err(JobError::Spawn)?;
        let status = self.supervise(&mut process, tracker)?;

        tracker.enter(StageKind::Finalizing, "Finalizing...");
        if !status.success() {
            tracing::warn!("generator exited with {}", status);
            for line in tracker.aggregator.recent_messages() {
                tracing::warn!(target: "memo_runner::child", "{}", line);
            }
            return Err(JobError::Generation);
        }

        let output = match staging::find_output(area.output_dir(), &self.config.job.output_extensions) {
            Ok(found) => found,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("output directory is gone: {}", area.output_dir().display());
                None
            }
            Err(e) => return Err(e.into()),
        }
        .ok_or(JobError::NoOutput)?;
        tracker.complete("Complete!");
        Ok(output)
    }

    fn ensure_square(
        &self,
        area: &WorkArea,
        image: PathBuf,
        tracker: &mut Tracker<'_>,
    ) -> JobResult {
        let (width, height) = self
            .tools
            .dimensions(&image)
            .map_err(|e| JobError::Preprocessing(e.to_string()))?;
        if media::is_square(width, height, self.config.media.square_tolerance) {
            tracing::debug!("image is {}x{}, no squaring needed", width, height);
            return Ok(image);
        }

        tracker.describe("Processing image to square format...");
        let squared = area.root().join("square_input.png");
        self.tools
            .make_square(&image, &squared)
            .map_err(|e| JobError::Preprocessing(e.to_string()))?;
        Ok(squared)
    }

    fn generator_spec(&self, image: &Path, audio: &Path, output_dir: &Path) -> ProcessSpec {
        let generator = &self.config.generator;
        ProcessSpec::new(&generator.program)
            .args(&generator.args)
            .arg("--config")
            .arg(&generator.config_file)
            .arg("--input_image")
            .arg(image)
            .arg("--input_audio")
            .arg(audio)
            .arg("--output_dir")
            .arg(output_dir)
            .current_dir(generator.current_dir.clone())
    }

    /// Poll the child and the event channel until the child has exited and
    /// its output is drained.
    ///
    /// The loop never blocks on the channel, so process exit is noticed even
    /// when the child goes quiet. Once the child has exited, waiting for the
    /// pumps is bounded by the drain timeout; pumps still running then are
    /// detached and finish draining on their own.
    fn supervise(
        &self,
        process: &mut SupervisedProcess,
        tracker: &mut Tracker<'_>,
    ) -> Result<ExitStatus, JobError> {
        let job = &self.config.job;
        let (tx, rx) = mpsc::channel();
        let mut pumps: Vec<JoinHandle<()>> = Vec::new();
        for (name, stream) in process.take_output() {
            pumps.push(pump::spawn(name, stream, tx.clone())?);
        }
        drop(tx);

        let mut disconnected = false;
        let mut cancelled = false;
        let mut exited_at: Option<Instant> = None;

        let status = loop {
            while !disconnected {
                match rx.try_recv() {
                    Ok(event) => tracker.consume(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => disconnected = true,
                }
            }
            tracker.publish();

            if !cancelled && self.cancel.is_cancelled() {
                tracing::info!(pid = process.id(), "cancelling generator");
                cancelled = true;
                process.terminate(job.kill_grace())?;
            }

            if let Some(status) = process.try_wait()? {
                let exited = *exited_at.get_or_insert_with(Instant::now);
                if disconnected {
                    break status;
                }
                if exited.elapsed() >= job.drain_timeout() {
                    tracing::warn!(
                        "generator exited but its output is still open after {:?}, detaching readers",
                        job.drain_timeout()
                    );
                    break status;
                }
            }

            thread::sleep(job.poll_interval());
        };

        if disconnected {
            for handle in pumps {
                if handle.join().is_err() {
                    tracing::warn!("output reader panicked");
                }
            }
        }

        if cancelled {
            return Err(JobError::Cancelled);
        }
        tracing::debug!("generator exited with {}", status);
        Ok(status)
    }

    fn check_cancelled(&self) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        Ok(())
    }
}

/// Aggregator plus the caller's progress channel for one run.
struct Tracker<'a> {
    stages: StageTable,
    aggregator: ProgressAggregator,
    sink: Option<&'a mpsc::Sender<ProgressUpdate>>,
    last_sent: Option<ProgressSnapshot>,
}

impl<'a> Tracker<'a> {
    fn new(stages: StageTable, sink: Option<&'a mpsc::Sender<ProgressUpdate>>) -> Self {
        Self {
            stages,
            aggregator: ProgressAggregator::new(),
            sink,
            last_sent: None,
        }
    }

    fn enter(&mut self, kind: StageKind, description: &str) {
        tracing::info!(stage = kind.name(), "{}", description);
        let stage = self.stages.stage(kind);
        self.aggregator
            .advance_stage(&stage, Some(description.to_string()));
        self.publish();
    }

    fn describe(&mut self, description: &str) {
        tracing::info!("{}", description);
        self.aggregator.set_description(description);
        self.publish();
    }

    fn consume(&mut self, event: ProgressEvent) {
        self.aggregator.consume(event);
    }

    fn complete(&mut self, description: &str) {
        self.aggregator.complete(Some(description.to_string()));
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.aggregator.snapshot();
        if self.last_sent.as_ref() == Some(&snapshot) {
            return;
        }
        if let Some(sink) = self.sink {
            let _ = sink.send(snapshot.clone());
        }
        self.last_sent = Some(snapshot);
    }
}
