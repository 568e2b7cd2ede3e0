//! Supervises a talking-face video generator and turns its ad-hoc console
//! output into one continuous progress value.

pub mod cli;
pub mod config;
pub mod job;
pub mod media;
pub mod process;

pub use config::Config;
pub use job::{JobError, JobRequest, JobResult, JobSupervisor};
