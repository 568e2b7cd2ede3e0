//! Generation job pipeline: classify child output, aggregate stage-weighted
//! progress, and supervise the run.

pub mod aggregator;
pub mod error;
pub mod progress;
pub mod pump;
pub mod staging;
pub mod supervisor;

pub use aggregator::{ProgressAggregator, Stage, StageKind, StageTable};
pub use error::{JobError, JobResult};
pub use progress::{classify, ProgressEvent, ProgressSnapshot, ProgressUpdate};
pub use staging::StageMode;
pub use supervisor::{CancelToken, JobRequest, JobSupervisor};
