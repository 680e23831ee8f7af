//! Physiological measurements returned by the analysis service

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MetricsError;

pub const MIN_PREGNANCY_WEEK: u8 = 1;
pub const MAX_PREGNANCY_WEEK: u8 = 42;
pub const DEFAULT_PREGNANCY_WEEK: u8 = 20;

/// Measurements produced for one scan.
///
/// Values are validated on construction and never change afterwards. The one
/// exception is the pregnancy week, which the pipeline may attach exactly once
/// before the metrics are sent anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMetrics {
  heart_rate_bpm: f64,
  sdnn_ms: f64,
  rmssd_ms: f64,
  pnn50_pct: f64,
  stress_score: f64,
  pregnancy_week: Option<u8>,
}

impl RawMetrics {
  pub fn new(
    heart_rate_bpm: f64,
    sdnn_ms: f64,
    rmssd_ms: f64,
    pnn50_pct: f64,
    stress_score: f64,
  ) -> Result<Self, MetricsError> {
    if !(heart_rate_bpm.is_finite() && heart_rate_bpm > 0.0) {
      return Err(MetricsError::out_of_range("heart_rate", "a positive number", heart_rate_bpm));
    }
    non_negative("sdnn", sdnn_ms)?;
    non_negative("rmssd", rmssd_ms)?;
    within("pnn50", pnn50_pct, 0.0, 100.0, "between 0 and 100")?;
    within("stress_score", stress_score, 0.0, 100.0, "between 0 and 100")?;

    Ok(Self { heart_rate_bpm, sdnn_ms, rmssd_ms, pnn50_pct, stress_score, pregnancy_week: None })
  }

  /// Constructor for compile-time constants that are known to be in range
  pub(crate) const fn fixed(
    heart_rate_bpm: f64,
    sdnn_ms: f64,
    rmssd_ms: f64,
    pnn50_pct: f64,
    stress_score: f64,
  ) -> Self {
    Self { heart_rate_bpm, sdnn_ms, rmssd_ms, pnn50_pct, stress_score, pregnancy_week: None }
  }

  /// Attach the pregnancy week. Has no effect if a week is already present or
  /// the week is outside 1..=42.
  pub fn with_pregnancy_week(mut self, week: u8) -> Self {
    if self.pregnancy_week.is_none() && is_valid_week(week) {
      self.pregnancy_week = Some(week);
    }
    self
  }

  /// Drop a week supplied by the service so the user's week can be attached
  pub(crate) fn without_pregnancy_week(mut self) -> Self {
    self.pregnancy_week = None;
    self
  }

  pub fn heart_rate_bpm(&self) -> f64 {
    self.heart_rate_bpm
  }

  pub fn sdnn_ms(&self) -> f64 {
    self.sdnn_ms
  }

  pub fn rmssd_ms(&self) -> f64 {
    self.rmssd_ms
  }

  pub fn pnn50_pct(&self) -> f64 {
    self.pnn50_pct
  }

  pub fn stress_score(&self) -> f64 {
    self.stress_score
  }

  pub fn pregnancy_week(&self) -> Option<u8> {
    self.pregnancy_week
  }
}

pub fn is_valid_week(week: u8) -> bool {
  (MIN_PREGNANCY_WEEK..=MAX_PREGNANCY_WEEK).contains(&week)
}

/// The week to use for a run: the user's if valid, else `default`
pub fn resolve_week(week: Option<u8>, default: u8) -> u8 {
  week.filter(|w| is_valid_week(*w)).unwrap_or(default)
}

fn non_negative(field: &'static str, value: f64) -> Result<(), MetricsError> {
  if value.is_finite() && value >= 0.0 {
    Ok(())
  } else {
    Err(MetricsError::out_of_range(field, "a non-negative number", value))
  }
}

fn within(
  field: &'static str,
  value: f64,
  min: f64,
  max: f64,
  expected: &'static str,
) -> Result<(), MetricsError> {
  if value.is_finite() && (min..=max).contains(&value) {
    Ok(())
  } else {
    Err(MetricsError::out_of_range(field, expected, value))
  }
}

// Wire Format
// ===========

/// Shape of the metrics object exchanged with the service
#[derive(Debug, Serialize, Deserialize)]
struct MetricsPayload {
  #[serde(alias = "heart_rate_bpm", alias = "bpm")]
  heart_rate: f64,
  #[serde(alias = "sdnn_ms")]
  sdnn: f64,
  #[serde(alias = "rmssd_ms")]
  rmssd: f64,
  #[serde(alias = "pnn50_pct")]
  pnn50: f64,
  #[serde(alias = "stress")]
  stress_score: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pregnancy_week: Option<u8>,
}

impl Serialize for RawMetrics {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    MetricsPayload {
      heart_rate: self.heart_rate_bpm,
      sdnn: self.sdnn_ms,
      rmssd: self.rmssd_ms,
      pnn50: self.pnn50_pct,
      stress_score: self.stress_score,
      pregnancy_week: self.pregnancy_week,
    }
    .serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for RawMetrics {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let payload = MetricsPayload::deserialize(deserializer)?;
    let metrics = RawMetrics::new(
      payload.heart_rate,
      payload.sdnn,
      payload.rmssd,
      payload.pnn50,
      payload.stress_score,
    )
    .map_err(serde::de::Error::custom)?;

    Ok(match payload.pregnancy_week {
      Some(week) => metrics.with_pregnancy_week(week),
      None => metrics,
    })
  }
}
