//! Textual interpretations of a metric set, and the local rule tables used
//! whenever a remote analyzer cannot provide one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::RawMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretationKind {
  Cardiac,
  Variability,
  Stress,
  Emotional,
}

impl InterpretationKind {
  /// The kinds that have a remote analyzer
  pub const REMOTE: [InterpretationKind; 3] =
    [InterpretationKind::Cardiac, InterpretationKind::Variability, InterpretationKind::Stress];

  pub fn name(&self) -> &'static str {
    match self {
      InterpretationKind::Cardiac => "cardiac",
      InterpretationKind::Variability => "variability",
      InterpretationKind::Stress => "stress",
      InterpretationKind::Emotional => "emotional",
    }
  }

  /// Human-readable label used in summaries and CLI output
  pub fn label(&self) -> &'static str {
    match self {
      InterpretationKind::Cardiac => "Heart rate",
      InterpretationKind::Variability => "Heart rate variability",
      InterpretationKind::Stress => "Stress",
      InterpretationKind::Emotional => "Emotional state",
    }
  }

  /// Analyzer endpoint path; emotional state is always derived locally
  pub fn endpoint(&self) -> Option<&'static str> {
    match self {
      InterpretationKind::Cardiac => Some("/hb-analyze/"),
      InterpretationKind::Variability => Some("/hrv-analyze/"),
      InterpretationKind::Stress => Some("/stress-analyze/"),
      InterpretationKind::Emotional => None,
    }
  }
}

impl fmt::Display for InterpretationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Where an interpretation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Remote,
  Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
  kind: InterpretationKind,
  text: String,
  source: Source,
}

impl Interpretation {
  pub fn remote(kind: InterpretationKind, text: impl Into<String>) -> Self {
    Self { kind, text: text.into(), source: Source::Remote }
  }

  pub fn local(kind: InterpretationKind, text: impl Into<String>) -> Self {
    Self { kind, text: text.into(), source: Source::Local }
  }

  pub fn kind(&self) -> InterpretationKind {
    self.kind
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn source(&self) -> Source {
    self.source
  }

  pub fn is_remote(&self) -> bool {
    self.source == Source::Remote
  }
}

/// The four interpretations of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretations {
  cardiac: Interpretation,
  variability: Interpretation,
  stress: Interpretation,
  emotional: Interpretation,
}

impl Interpretations {
  pub fn new(
    cardiac: Interpretation,
    variability: Interpretation,
    stress: Interpretation,
    emotional: Interpretation,
  ) -> Self {
    Self { cardiac, variability, stress, emotional }
  }

  pub fn cardiac(&self) -> &Interpretation {
    &self.cardiac
  }

  pub fn variability(&self) -> &Interpretation {
    &self.variability
  }

  pub fn stress(&self) -> &Interpretation {
    &self.stress
  }

  pub fn emotional(&self) -> &Interpretation {
    &self.emotional
  }

  /// In cardiac, variability, stress, emotional order
  pub fn iter(&self) -> impl Iterator<Item = &Interpretation> {
    [&self.cardiac, &self.variability, &self.stress, &self.emotional].into_iter()
  }

  /// Labelled lines, one per interpretation, as sent to the synthesis service
  pub fn summary(&self) -> String {
    self
      .iter()
      .map(|i| format!("{}: {}", i.kind().label(), i.text()))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

// Local Rule Tables
// =================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
  Low,
  Typical,
  High,
}

/// Resting heart rate: below 60, 60 to 100, above 100
pub fn cardiac_band(bpm: f64) -> Band {
  if bpm < 60.0 {
    Band::Low
  } else if bpm <= 100.0 {
    Band::Typical
  } else {
    Band::High
  }
}

/// SDNN: below 20ms, 20 to 50ms, above 50ms
pub fn variability_band(sdnn_ms: f64) -> Band {
  if sdnn_ms < 20.0 {
    Band::Low
  } else if sdnn_ms <= 50.0 {
    Band::Typical
  } else {
    Band::High
  }
}

/// Stress score: below 30, 30 to 60, above 60
pub fn stress_band(score: f64) -> Band {
  if score < 30.0 {
    Band::Low
  } else if score <= 60.0 {
    Band::Typical
  } else {
    Band::High
  }
}

fn cardiac_text(band: Band) -> &'static str {
  match band {
    Band::Low => {
      "Your heart rate is below the typical resting range. This can be normal if you are very \
       fit, but mention it at your next prenatal visit if you feel dizzy or faint."
    }
    Band::Typical => {
      "Your heart rate is within the typical resting range for pregnancy. Your heart is \
       adapting well to the extra blood volume."
    }
    Band::High => {
      "Your heart rate is above the typical resting range. A faster pulse is common as \
       pregnancy progresses, but rest, hydrate and contact your provider if it stays high."
    }
  }
}

fn variability_text(band: Band) -> &'static str {
  match band {
    Band::Low => {
      "Your heart rate variability is low, which suggests your body is under strain. \
       Prioritising rest and recovery can help it bounce back."
    }
    Band::Typical => {
      "Your heart rate variability is in a moderate range, indicating a reasonable balance \
       between stress and recovery."
    }
    Band::High => {
      "Your heart rate variability is healthy, a sign that your nervous system is recovering \
       well."
    }
  }
}

fn stress_text(band: Band) -> &'static str {
  match band {
    Band::Low => "Your stress level is low. Keep up the routines that help you feel settled.",
    Band::Typical => {
      "Your stress level is moderate. Short breaks, gentle movement and slow breathing can \
       help keep it in check."
    }
    Band::High => {
      "Your stress level is elevated. Consider slowing down today and reaching out to someone \
       you trust or to your care team."
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionalState {
  Calm,
  Balanced,
  Strained,
}

impl EmotionalState {
  pub fn text(&self) -> &'static str {
    match self {
      EmotionalState::Calm => {
        "You appear calm and relaxed, with low stress and strong recovery signals."
      }
      EmotionalState::Balanced => {
        "Your emotional state appears balanced, with no strong signs of tension."
      }
      EmotionalState::Strained => {
        "You may be feeling tense or overwhelmed right now. Gentle rest and support from \
         loved ones can make a real difference."
      }
    }
  }
}

/// Emotional state from stress score and SDNN alone
pub fn emotional_state(stress_score: f64, sdnn_ms: f64) -> EmotionalState {
  if stress_score > 60.0 || sdnn_ms < 20.0 {
    EmotionalState::Strained
  } else if stress_score < 30.0 && sdnn_ms > 50.0 {
    EmotionalState::Calm
  } else {
    EmotionalState::Balanced
  }
}

/// Rule-based interpretation of one kind, used when the remote analyzer is unavailable
pub fn local_interpretation(kind: InterpretationKind, metrics: &RawMetrics) -> Interpretation {
  let text = match kind {
    InterpretationKind::Cardiac => cardiac_text(cardiac_band(metrics.heart_rate_bpm())),
    InterpretationKind::Variability => variability_text(variability_band(metrics.sdnn_ms())),
    InterpretationKind::Stress => stress_text(stress_band(metrics.stress_score())),
    InterpretationKind::Emotional => {
      emotional_state(metrics.stress_score(), metrics.sdnn_ms()).text()
    }
  };
  Interpretation::local(kind, text)
}

/// All four interpretations from the local rules
pub fn local_interpretations(metrics: &RawMetrics) -> Interpretations {
  Interpretations::new(
    local_interpretation(InterpretationKind::Cardiac, metrics),
    local_interpretation(InterpretationKind::Variability, metrics),
    local_interpretation(InterpretationKind::Stress, metrics),
    local_interpretation(InterpretationKind::Emotional, metrics),
  )
}
