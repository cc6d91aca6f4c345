use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    split_csv(s)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed {token:?}"))
        })
        .collect()
}

/// Per-run directory under `base` so repeated live runs never share a save slot.
pub fn run_storage_dir(base: &Path, label: &str) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S%3f");
    base.join(format!("{label}-{ts}"))
}
