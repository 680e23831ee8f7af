//! Suggestion synthesis: one remote call turning interpretations into advice

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backend::{bounded, ScanBackend, SynthesisRequest, SynthesisResponse};
use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::interpretation::Interpretations;
use crate::metrics::{resolve_week, RawMetrics};
use crate::suggestion::{fallback_suggestions, Suggestion, SuggestionCategory};

pub struct SuggestionSynthesizer {
  backend: Arc<dyn ScanBackend>,
  timeout: Duration,
  default_week: u8,
}

impl SuggestionSynthesizer {
  pub fn new(backend: Arc<dyn ScanBackend>, config: &PipelineConfig) -> Self {
    Self {
      backend,
      timeout: config.synthesis_timeout,
      default_week: config.default_pregnancy_week,
    }
  }

  /// Between one and four suggestions, at most one per category. Falls back to
  /// the canned set when the service fails or returns nothing usable.
  pub async fn synthesize(
    &self,
    metrics: &RawMetrics,
    interpretations: &Interpretations,
  ) -> Vec<Suggestion> {
    let week = resolve_week(metrics.pregnancy_week(), self.default_week);
    let request = SynthesisRequest {
      metrics: metrics.with_pregnancy_week(week),
      week,
      history_summary: interpretations.summary(),
    };
    let generated_at = Utc::now();

    match self.request(&request, generated_at).await {
      Ok(suggestions) => suggestions,
      Err(err) => {
        tracing::warn!(error = %err, "synthesis unavailable, using fallback suggestions");
        mabel::recovered("suggestion synthesis", err.reason());
        fallback_suggestions(generated_at)
      }
    }
  }

  async fn request(
    &self,
    request: &SynthesisRequest,
    generated_at: DateTime<Utc>,
  ) -> Result<Vec<Suggestion>, AnalysisError> {
    let response = bounded(self.timeout, self.backend.synthesize(request))
      .await
      .map_err(|e| AnalysisError::synthesis_unavailable(e.to_string()))?;

    let suggestions = suggestions_from(&response, generated_at);
    if suggestions.is_empty() {
      return Err(AnalysisError::synthesis_unavailable("empty response"));
    }

    Ok(suggestions)
  }
}

fn suggestions_from(response: &SynthesisResponse, generated_at: DateTime<Utc>) -> Vec<Suggestion> {
  SuggestionCategory::ALL
    .iter()
    .filter_map(|category| {
      response.advice(*category).map(|advice| Suggestion::new(*category, advice, generated_at))
    })
    .collect()
}
