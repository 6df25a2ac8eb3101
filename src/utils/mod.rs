use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use rand::Rng;

use crate::config::RunConfig;
use crate::error::{CaptionError, Result};

/// Reads a UTF-8 text file. Only an absent file counts as missing; anything
/// else (permissions, bad encoding) is a read failure.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        let path = path.to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            CaptionError::MissingFile { path, source }
        } else {
            CaptionError::ReadFile { path, source }
        }
    })
}

/// Example names may carry a path prefix; the key is the last segment.
pub fn example_key(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Uses the configured seed or draws one in `1..=10000`.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random_range(1..=10_000))
}

pub fn run_dir_name<Tz: TimeZone>(config: &RunConfig, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}",
        config.dataset_name,
        config.config_name,
        now.format("%Y_%m_%d_%H_%M_%S")
    )
}

/// Creates a fresh timestamped run directory under `output_root`, or checks
/// that the resume directory exists.
pub fn prepare_output_dir(
    config: &RunConfig,
    output_root: &Path,
    resume: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = resume {
        if !dir.is_dir() {
            return Err(CaptionError::ResumeDir(dir.to_path_buf()));
        }
        return Ok(dir.to_path_buf());
    }

    let dir = output_root.join(run_dir_name(config, &chrono::Local::now()));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
