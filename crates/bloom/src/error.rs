//! Error types for the scan pipeline
//!
//! Only `UploadError` ever changes the course of a run (it routes the session to
//! the fallback generator). Analyzer and synthesis failures are recovered where
//! they happen and store failures are logged, so none of these reach the caller
//! of `ScanPipeline::run`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::interpretation::InterpretationKind;
use crate::session::SessionStatus;

/// Transport-level failure reported by a `ScanBackend`
#[derive(Error, Debug)]
pub enum BackendError {
  #[error("request returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("transport failure: {message}")]
  Transport { message: String },

  #[error("failed to decode response: {message}")]
  Decode { message: String },

  #[error("request timed out after {}s", .after.as_secs_f64())]
  Timeout { after: Duration },
}

impl BackendError {
  pub fn status(status: u16, body: impl Into<String>) -> Self {
    Self::Status { status, body: body.into() }
  }

  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport { message: message.into() }
  }

  pub fn decode(message: impl Into<String>) -> Self {
    Self::Decode { message: message.into() }
  }

  pub fn timeout(after: Duration) -> Self {
    Self::Timeout { after }
  }
}

impl From<reqwest::Error> for BackendError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::decode(err.to_string())
    } else {
      Self::transport(err.to_string())
    }
  }
}

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("video is {size} bytes, over the {limit} byte upload limit")]
  PayloadTooLarge { size: u64, limit: u64 },

  #[error("upload rejected with HTTP {status}: {body}")]
  Rejected { status: u16, body: String },

  #[error("upload failed: {message}")]
  Network { message: String },

  #[error("results for scan {scan_id} unavailable: {message}")]
  ResultsUnavailable { scan_id: String, message: String },

  #[error("upload response carried neither a scan id nor metrics")]
  MissingMetrics,

  #[error("failed to read video: {0}")]
  Io(#[from] std::io::Error),
}

impl UploadError {
  pub fn payload_too_large(size: u64, limit: u64) -> Self {
    Self::PayloadTooLarge { size, limit }
  }

  pub fn results_unavailable(scan_id: impl Into<String>, message: impl Into<String>) -> Self {
    Self::ResultsUnavailable { scan_id: scan_id.into(), message: message.into() }
  }

  /// A non-success status is a rejection; everything else is a network failure
  pub fn from_backend(err: BackendError) -> Self {
    match err {
      BackendError::Status { status, body } => Self::Rejected { status, body },
      other => Self::Network { message: other.to_string() },
    }
  }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
  #[error("{kind} analyzer unavailable: {reason}")]
  AnalyzerUnavailable { kind: InterpretationKind, reason: String },

  #[error("suggestion synthesis unavailable: {reason}")]
  SynthesisUnavailable { reason: String },
}

impl AnalysisError {
  pub fn analyzer_unavailable(kind: InterpretationKind, reason: impl Into<String>) -> Self {
    Self::AnalyzerUnavailable { kind, reason: reason.into() }
  }

  pub fn synthesis_unavailable(reason: impl Into<String>) -> Self {
    Self::SynthesisUnavailable { reason: reason.into() }
  }

  /// Why the remote result was unusable, without the component prefix
  pub fn reason(&self) -> &str {
    match self {
      Self::AnalyzerUnavailable { reason, .. } | Self::SynthesisUnavailable { reason } => reason,
    }
  }
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("state store I/O failed at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("state store holds malformed data for '{key}': {message}")]
  Corrupt { key: String, message: String },

  #[error("failed to serialize state: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("could not locate a data directory for the state store")]
  NoDataDir,
}

impl StoreError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Corrupt { key: key.into(), message: message.into() }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
  #[error("{field} must be {expected}, got {value}")]
  OutOfRange { field: &'static str, expected: &'static str, value: f64 },
}

impl MetricsError {
  pub fn out_of_range(field: &'static str, expected: &'static str, value: f64) -> Self {
    Self::OutOfRange { field, expected, value }
  }
}

/// An event was applied to a session in a status that does not accept it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot apply {event} while session is {status}")]
pub struct TransitionError {
  pub status: SessionStatus,
  pub event: &'static str,
}
