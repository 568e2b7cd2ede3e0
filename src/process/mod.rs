//! Child process supervision

#[cfg(unix)]
mod unix;

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// What to launch. Built by the job supervisor from config and staged paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.current_dir = dir;
        self
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Readable end of a child's output.
pub type OutputStream = Box<dyn Read + Send>;

/// A running child with piped output and a cached exit status.
pub struct SupervisedProcess {
    child: Child,
    merged: Option<OutputStream>,
    status: Option<ExitStatus>,
}

impl SupervisedProcess {
    /// Spawn with stdin closed and output piped. On unix stdout and stderr
    /// share one pipe and the child leads its own process group so
    /// termination reaches anything it forks.
    pub fn spawn(spec: &ProcessSpec) -> io::Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        let merged = attach_output(&mut cmd)?;
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;
        // Closes the parent's copies of the write end so the reader sees EOF
        // once the child and its descendants are gone.
        drop(cmd);
        tracing::debug!(pid = child.id(), "spawned {}", spec.display());
        Ok(Self {
            child,
            merged,
            status: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Take the named output streams. Empty after the first call.
    ///
    /// On unix this is a single `output` stream carrying stdout and stderr
    /// in write order; elsewhere the two pipes are returned separately.
    pub fn take_output(&mut self) -> Vec<(&'static str, OutputStream)> {
        if let Some(merged) = self.merged.take() {
            return vec![("output", merged)];
        }
        let mut streams: Vec<(&'static str, OutputStream)> = Vec::with_capacity(2);
        if let Some(stdout) = self.child.stdout.take() {
            streams.push(("stdout", Box::new(stdout)));
        }
        if let Some(stderr) = self.child.stderr.take() {
            streams.push(("stderr", Box::new(stderr)));
        }
        streams
    }

    /// Non-blocking liveness check. Once an exit status is seen it is kept.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    /// Ask the child to stop, escalating to a hard kill after `grace`.
    pub fn terminate(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.try_wait()? {
            return Ok(status);
        }

        request_stop(self.child.id(), false);

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            thread::sleep(Duration::from_millis(20));
        }

        tracing::warn!(pid = self.child.id(), "child ignored termination request, killing");
        request_stop(self.child.id(), true);
        if let Err(e) = self.child.kill() {
            // Already reaped between the last poll and now.
            if e.kind() != io::ErrorKind::InvalidInput {
                return Err(e);
            }
        }
        let status = self.child.wait()?;
        self.status = Some(status);
        Ok(status)
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn attach_output(cmd: &mut Command) -> io::Result<Option<OutputStream>> {
            let (read, write) = unix::output_pipe()?;
            cmd.stdout(Stdio::from(write.try_clone()?))
                .stderr(Stdio::from(write));
            Ok(Some(Box::new(std::fs::File::from(read))))
        }

        /// Signal the child's whole process group.
        fn request_stop(pid: u32, force: bool) {
            let signal = if force { unix::Signal::SIGKILL } else { unix::Signal::SIGTERM };
            if let Err(e) = unix::signal_group(pid, signal) {
                tracing::debug!(pid, "{:?} failed: {}", signal, e);
            }
        }
    } else {
        fn attach_output(cmd: &mut Command) -> io::Result<Option<OutputStream>> {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            Ok(None)
        }

        /// No polite stop outside unix; `Child::kill` does the work.
        fn request_stop(_pid: u32, _force: bool) {}
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        if self.status.is_none() {
            let _ = self.terminate(Duration::from_millis(200));
        }
    }
}
