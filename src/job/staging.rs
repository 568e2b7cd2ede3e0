//! Per-run working area: staged inputs and the generator's output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// How caller inputs are placed into the working area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// Leave the caller's files untouched.
    #[default]
    Copy,
    /// Rename into place, falling back to copy + remove across filesystems.
    Move,
}

pub struct WorkArea {
    root: PathBuf,
    output_dir: PathBuf,
}

impl WorkArea {
    /// Create `<parent>/memo-<uuid>` with an empty `output/` inside.
    pub fn create(parent: &Path) -> io::Result<Self> {
        let parent = if parent.is_absolute() {
            parent.to_path_buf()
        } else {
            std::env::current_dir()?.join(parent)
        };
        let root = parent.join(format!("memo-{}", uuid::Uuid::new_v4()));
        let output_dir = root.join("output");
        fs::create_dir_all(&output_dir)?;
        tracing::debug!("created working area {}", root.display());
        Ok(Self { root, output_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Place `source` into the working area as `<stem>.<original extension>`.
    pub fn stage_input(&self, source: &Path, stem: &str, mode: StageMode) -> io::Result<PathBuf> {
        let mut name = stem.to_string();
        if let Some(ext) = source.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        let dest = self.root.join(name);

        match mode {
            StageMode::Copy => {
                fs::copy(source, &dest)?;
            }
            StageMode::Move => {
                if let Err(e) = fs::rename(source, &dest) {
                    tracing::debug!(
                        "rename of {} failed ({}), copying instead",
                        source.display(),
                        e
                    );
                    fs::copy(source, &dest)?;
                    fs::remove_file(source)?;
                }
            }
        }
        Ok(dest)
    }

    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.root)
    }
}

/// Find the generated artifact in `dir`.
///
/// Only regular files whose extension matches one of `extensions`
/// (case-insensitive) count. With several candidates the most recently
/// modified wins; equal times fall back to the lexically last path.
pub fn find_output(dir: &Path, extensions: &[String]) -> io::Result<Option<PathBuf>> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                extensions.iter().any(|want| want.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let modified = path
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    if candidates.len() > 1 {
        tracing::warn!(
            "{} candidate outputs in {}, using the newest",
            candidates.len(),
            dir.display()
        );
    }

    Ok(candidates.into_iter().max().map(|(_, path)| path))
}
