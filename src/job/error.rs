use std::path::PathBuf;

use thiserror::Error;

/// Outcome of one run: the produced artifact, or why there is none.
pub type JobResult = std::result::Result<PathBuf, JobError>;

/// Terminal failures of a run. `Display` is the short reason shown to users.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("missing input")]
    MissingInput,

    #[error("could not prepare working area: {0}")]
    Staging(String),

    #[error("error processing image: {0}")]
    Preprocessing(String),

    #[error("could not start generator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("generation error")]
    Generation,

    #[error("no output produced")]
    NoOutput,

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Stable machine-readable name, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::MissingInput => "input",
            JobError::Staging(_) => "staging",
            JobError::Preprocessing(_) => "preprocessing",
            JobError::Spawn(_) => "spawn",
            JobError::Generation => "generation",
            JobError::NoOutput => "no_output",
            JobError::Cancelled => "cancelled",
            JobError::Io(_) => "io",
        }
    }
}
