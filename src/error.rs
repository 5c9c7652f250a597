//! Unified error hierarchy for watchmap
//!
//! Every error carries the pipeline stage that produced it so a failed run
//! can be reported without guessing where it broke.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::Metric;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the activity file through the external decoder
    Decode,
    /// Raw records to Track / SessionSummary
    Normalization,
    /// Ranges and zone occupancy
    Analytics,
    /// Renderer-ready structures
    Encoding,
    /// Writing the output bundle
    Export,
    /// Loading or validating configuration
    Configuration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Normalization => "normalization",
            Stage::Analytics => "analytics",
            Stage::Encoding => "encoding",
            Stage::Export => "export",
            Stage::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Top-level error type for all watchmap operations
#[derive(Debug, Error)]
pub enum WatchmapError {
    /// Timestamp ordering violated, or a required field has the wrong type
    #[error("Malformed sample at record {index}: {reason}")]
    MalformedSample { index: usize, reason: String },

    /// The session stream did not hold exactly one record
    #[error("Expected exactly one session record, found {found}")]
    SessionShape { found: usize },

    /// A requested metric has no observations anywhere in the track
    #[error("No observations for metric {metric}")]
    EmptyMetric { metric: Metric },

    /// The external activity-file decoder rejected the input
    #[error("Decode error: {0}")]
    Decode(String),

    /// A calculation parameter is out of its valid domain
    #[error("Invalid parameter in {stage} stage: {parameter}={value}")]
    InvalidParameter {
        stage: Stage,
        parameter: String,
        value: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Output bundle could not be written
    #[error("Export failed to {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for watchmap operations
pub type Result<T> = std::result::Result<T, WatchmapError>;

impl WatchmapError {
    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            WatchmapError::MalformedSample { .. } | WatchmapError::SessionShape { .. } => {
                Stage::Normalization
            }
            WatchmapError::EmptyMetric { .. } => Stage::Analytics,
            WatchmapError::Decode(_) => Stage::Decode,
            WatchmapError::InvalidParameter { stage, .. } => *stage,
            WatchmapError::Configuration(_) => Stage::Configuration,
            WatchmapError::Export { .. } | WatchmapError::Io(_) => Stage::Export,
        }
    }

    /// Recoverable errors drop the affected metric or layer instead of the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WatchmapError::EmptyMetric { .. })
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WatchmapError::EmptyMetric { .. } => ErrorSeverity::Info,
            WatchmapError::SessionShape { .. } => ErrorSeverity::Warning,
            WatchmapError::Configuration(_) => ErrorSeverity::Error,
            WatchmapError::MalformedSample { .. } | WatchmapError::Decode(_) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            WatchmapError::SessionShape { found: 0 } => {
                "The activity file has no session summary.".to_string()
            }
            WatchmapError::SessionShape { found } => format!(
                "The activity file has {} sessions; only single-session activities are supported.",
                found
            ),
            WatchmapError::MalformedSample { index, reason } => format!(
                "The activity file looks corrupted near sample {}: {}",
                index, reason
            ),
            _ => format!("{} (during {})", self, self.stage()),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Aborts the run
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
