//! Runtime configuration
//!
//! Both configs have sensible defaults and can be overridden from the
//! environment, the same way the CLI picks them up.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::metrics::{is_valid_week, DEFAULT_PREGNANCY_WEEK};
use crate::upload::MAX_UPLOAD_BYTES;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Which backend the pipeline talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
  /// Upload and analyze against the remote services
  #[default]
  Live,
  /// Skip the network entirely and produce a synthetic result
  Mock,
}

impl FromStr for BackendMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "live" => Ok(BackendMode::Live),
      "mock" => Ok(BackendMode::Mock),
      other => Err(format!("unknown backend mode '{other}' (expected 'live' or 'mock')")),
    }
  }
}

/// Configuration for the HTTP backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the analysis service (e.g., "http://localhost:8000")
  pub base_url: String,
  /// Per-request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_BASE_URL.to_string(), timeout_secs: 60 }
  }
}

impl ClientConfig {
  /// Read `BLOOM_API_URL` and `BLOOM_TIMEOUT_SECS`, falling back to defaults
  pub fn from_env() -> Self {
    let defaults = Self::default();

    let base_url = std::env::var("BLOOM_API_URL").unwrap_or(defaults.base_url);
    let timeout_secs = std::env::var("BLOOM_TIMEOUT_SECS")
      .ok()
      .and_then(|value| value.parse().ok())
      .unwrap_or(defaults.timeout_secs);

    Self { base_url, timeout_secs }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Limits, delays and timeouts for one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub mode: BackendMode,
  /// Videos larger than this are rejected before any transfer
  pub max_upload_bytes: u64,
  /// Pause after an accepted upload before results are read back
  pub processing_delay: Duration,
  pub upload_timeout: Duration,
  /// Bound on each of the three analyzer calls
  pub analyzer_timeout: Duration,
  pub synthesis_timeout: Duration,
  /// Week sent to the services when the user context has none or an invalid one
  pub default_pregnancy_week: u8,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      mode: BackendMode::Live,
      max_upload_bytes: MAX_UPLOAD_BYTES,
      processing_delay: Duration::from_secs(2),
      upload_timeout: Duration::from_secs(120),
      analyzer_timeout: Duration::from_secs(30),
      synthesis_timeout: Duration::from_secs(45),
      default_pregnancy_week: DEFAULT_PREGNANCY_WEEK,
    }
  }
}

impl PipelineConfig {
  /// Defaults overridden by `BLOOM_BACKEND`, `BLOOM_DEFAULT_WEEK` and
  /// `BLOOM_ANALYZER_TIMEOUT_SECS` when they are set and parse
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Some(mode) = std::env::var("BLOOM_BACKEND").ok().and_then(|v| v.parse().ok()) {
      config.mode = mode;
    }
    if let Some(week) = std::env::var("BLOOM_DEFAULT_WEEK")
      .ok()
      .and_then(|v| v.parse().ok())
      .filter(|week| is_valid_week(*week))
    {
      config.default_pregnancy_week = week;
    }
    if let Some(secs) =
      std::env::var("BLOOM_ANALYZER_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok())
    {
      config.analyzer_timeout = Duration::from_secs(secs);
    }

    config
  }

  pub fn with_mode(mut self, mode: BackendMode) -> Self {
    self.mode = mode;
    self
  }
}

/// Root directory for persisted state: `BLOOM_HOME`, else `<data dir>/bloom`
pub fn bloom_home() -> Result<PathBuf, StoreError> {
  if let Ok(home) = std::env::var("BLOOM_HOME") {
    return Ok(PathBuf::from(home));
  }

  dirs::data_dir().map(|dir| dir.join("bloom")).ok_or(StoreError::NoDataDir)
}
