//! Metric analysis: three remote analyzers in parallel, emotional state locally

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{bounded, ScanBackend};
use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::interpretation::{
  local_interpretation, Interpretation, InterpretationKind, Interpretations,
};
use crate::metrics::RawMetrics;

pub struct AnalysisOrchestrator {
  backend: Arc<dyn ScanBackend>,
  timeout: Duration,
}

impl AnalysisOrchestrator {
  pub fn new(backend: Arc<dyn ScanBackend>, config: &PipelineConfig) -> Self {
    Self { backend, timeout: config.analyzer_timeout }
  }

  /// Interpret a metric set. Never fails: each analyzer that errors, times out
  /// or answers with nothing is replaced by its local rule table.
  pub async fn analyze(&self, metrics: &RawMetrics) -> Interpretations {
    let (cardiac, variability, stress) = futures::join!(
      self.interpret(InterpretationKind::Cardiac, metrics),
      self.interpret(InterpretationKind::Variability, metrics),
      self.interpret(InterpretationKind::Stress, metrics),
    );
    let emotional = local_interpretation(InterpretationKind::Emotional, metrics);

    Interpretations::new(cardiac, variability, stress, emotional)
  }

  async fn interpret(&self, kind: InterpretationKind, metrics: &RawMetrics) -> Interpretation {
    match self.request(kind, metrics).await {
      Ok(text) => Interpretation::remote(kind, text),
      Err(err) => {
        tracing::warn!(%kind, error = %err, "analyzer unavailable, using local rules");
        mabel::recovered(&format!("{kind} analysis"), err.reason());
        local_interpretation(kind, metrics)
      }
    }
  }

  async fn request(
    &self,
    kind: InterpretationKind,
    metrics: &RawMetrics,
  ) -> Result<String, AnalysisError> {
    let text = bounded(self.timeout, self.backend.analyze(kind, metrics))
      .await
      .map_err(|e| AnalysisError::analyzer_unavailable(kind, e.to_string()))?;

    let text = text.trim();
    if text.is_empty() {
      return Err(AnalysisError::analyzer_unavailable(kind, "empty response"));
    }

    Ok(text.to_string())
  }
}
