//! Writing activity bundles to disk

pub mod json;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, WatchmapError};
use crate::pipeline::ActivityBundle;

pub use json::export_json;

/// What happened to one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    /// An output already existed and overwriting was not requested
    Skipped(PathBuf),
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Written(path) | ExportOutcome::Skipped(path) => path,
        }
    }
}

/// Writes `{stem}.json` bundles into an output directory
#[derive(Debug, Clone)]
pub struct BundleWriter {
    output_dir: PathBuf,
    force: bool,
}

impl BundleWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            force: false,
        }
    }

    /// Overwrite existing outputs instead of skipping them
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Output path for an input file: the input's stem with a `.json` extension
    pub fn output_path(&self, input: &Path) -> Result<PathBuf> {
        let stem = input.file_stem().ok_or_else(|| WatchmapError::Export {
            path: input.to_path_buf(),
            reason: "input has no file name".to_string(),
        })?;
        let mut name = stem.to_os_string();
        name.push(".json");
        Ok(self.output_dir.join(name))
    }

    /// True when writing `input`'s bundle would be skipped
    pub fn would_skip(&self, input: &Path) -> Result<bool> {
        Ok(!self.force && self.output_path(input)?.exists())
    }

    pub fn write(&self, input: &Path, bundle: &ActivityBundle) -> Result<ExportOutcome> {
        let path = self.output_path(input)?;
        if !self.force && path.exists() {
            warn!(path = %path.display(), "Output exists, skipping (use --force to overwrite)");
            return Ok(ExportOutcome::Skipped(path));
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| WatchmapError::Export {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        })?;
        export_json(bundle, &path)?;
        info!(path = %path.display(), "Wrote activity bundle");

        Ok(ExportOutcome::Written(path))
    }
}
