//! Sample discovery and naming
use crate::shared::errors::ConfigurationError;
use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Sample identifier of a file: its name with `strip_str` removed from the end.
pub fn sample_name(path: &Path, strip_str: &str) -> String {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    if strip_str.is_empty() {
        return file_name;
    }
    match file_name.strip_suffix(strip_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => file_name,
    }
}

/// All the files of `directory` whose name ends with `suffix`, sorted by name.
pub fn discover_samples(directory: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory)
        .map_err(|e| anyhow!("Unable to list {}: {}", directory.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .map_or(false, |f| f.to_string_lossy().ends_with(suffix));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve explicitly requested file names inside `directory`, every one of
/// them must exist.
pub fn resolve_samples(
    directory: &Path,
    filenames: &[String],
) -> Result<Vec<PathBuf>, ConfigurationError> {
    filenames
        .iter()
        .map(|f| {
            let path = directory.join(f);
            if path.is_file() {
                Ok(path)
            } else {
                Err(ConfigurationError::MissingInput(path))
            }
        })
        .collect()
}

/// Split a comma separated list (`v_b_gene,cdr3_b_aa`), empty items dropped.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(String::from)
        .collect()
}
