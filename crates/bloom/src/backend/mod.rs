//! Remote service seam
//!
//! The pipeline stages only ever talk to `ScanBackend`. `HttpBackend` is the
//! production implementation; tests inject their own.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::BackendError;
use crate::interpretation::InterpretationKind;
use crate::metrics::RawMetrics;
use crate::suggestion::SuggestionCategory;

pub mod http;

/// Body of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPayload {
  /// Base64-encoded video bytes
  pub video: String,
  pub content_type: String,
  pub file_name: String,
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReceipt {
  #[serde(default, alias = "id", deserialize_with = "scan_id_from_any")]
  pub scan_id: Option<String>,
  #[serde(default)]
  pub metrics: Option<RawMetrics>,
}

/// Body of `POST /overall-analyze/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
  pub metrics: RawMetrics,
  pub week: u8,
  pub history_summary: String,
}

/// Response of `POST /overall-analyze/`; any of the four fields may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResponse {
  #[serde(default)]
  pub stress_management: Option<String>,
  #[serde(default)]
  pub physical_activity: Option<String>,
  #[serde(default)]
  pub nutrition: Option<String>,
  #[serde(default)]
  pub sleep: Option<String>,
}

impl SynthesisResponse {
  /// Trimmed advice for a category, `None` if missing or blank
  pub fn advice(&self, category: SuggestionCategory) -> Option<&str> {
    let field = match category {
      SuggestionCategory::StressManagement => &self.stress_management,
      SuggestionCategory::PhysicalActivity => &self.physical_activity,
      SuggestionCategory::Nutrition => &self.nutrition,
      SuggestionCategory::Sleep => &self.sleep,
    };
    field.as_deref().map(str::trim).filter(|text| !text.is_empty())
  }
}

/// The analysis service as seen by the pipeline
#[async_trait]
pub trait ScanBackend: Send + Sync {
  /// Transfer an encoded video and register a scan
  async fn upload(&self, payload: &UploadPayload) -> Result<UploadReceipt, BackendError>;

  /// Read back the metrics computed for an uploaded scan
  async fn fetch_results(&self, scan_id: &str) -> Result<RawMetrics, BackendError>;

  /// Free-text interpretation from one of the remote analyzers
  async fn analyze(
    &self,
    kind: InterpretationKind,
    metrics: &RawMetrics,
  ) -> Result<String, BackendError>;

  /// Categorized advice combining all interpretations
  async fn synthesize(&self, request: &SynthesisRequest)
    -> Result<SynthesisResponse, BackendError>;
}

/// Run a backend call with an upper bound on its duration; running out of time
/// is reported as `BackendError::Timeout`
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, BackendError>
where
  F: Future<Output = Result<T, BackendError>>,
{
  match tokio::time::timeout(limit, call).await {
    Ok(result) => result,
    Err(_) => Err(BackendError::timeout(limit)),
  }
}

fn scan_id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(serde_json::Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
    Some(serde_json::Value::Number(id)) => Some(id.to_string()),
    _ => None,
  })
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_receipt_accepts_numeric_and_aliased_ids() {
    let receipt: UploadReceipt = serde_json::from_str(r#"{"id": 981}"#).unwrap();
    assert_eq!(receipt.scan_id.as_deref(), Some("981"));
    assert!(receipt.metrics.is_none());

    let receipt: UploadReceipt = serde_json::from_str(r#"{"scan_id": "  "}"#).unwrap();
    assert_eq!(receipt.scan_id, None);
  }

  #[test]
  fn test_receipt_with_embedded_metrics() {
    let receipt: UploadReceipt = serde_json::from_str(
      r#"{"metrics": {"heart_rate": 79, "sdnn": 45, "rmssd": 42, "pnn50": 30, "stress_score": 35}}"#,
    )
    .unwrap();
    assert_eq!(receipt.scan_id, None);
    assert_eq!(receipt.metrics.unwrap().heart_rate_bpm(), 79.0);
  }

  #[test]
  fn test_synthesis_advice_skips_blank_fields() {
    let response: SynthesisResponse =
      serde_json::from_str(r#"{"sleep": "  Nap after lunch ", "nutrition": "   "}"#).unwrap();

    assert_eq!(response.advice(SuggestionCategory::Sleep), Some("Nap after lunch"));
    assert_eq!(response.advice(SuggestionCategory::Nutrition), None);
    assert_eq!(response.advice(SuggestionCategory::StressManagement), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_bounded_times_out() {
    let result: Result<(), _> =
      bounded(Duration::from_secs(5), std::future::pending::<Result<(), BackendError>>()).await;

    assert!(matches!(result, Err(BackendError::Timeout { after }) if after == Duration::from_secs(5)));
  }
}
