//! Synthetic results for runs that cannot reach the analysis service
//!
//! Everything here is local and deterministic apart from the scan id, which is
//! derived from the wall clock.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::interpretation::{local_interpretations, Interpretations};
use crate::metrics::RawMetrics;
use crate::suggestion::{fallback_suggestions, Suggestion};

pub const MOCK_SCAN_PREFIX: &str = "mock-scan-";

/// Plausible resting values used for every synthetic result
pub const FALLBACK_METRICS: RawMetrics = RawMetrics::fixed(78.0, 48.0, 42.0, 28.0, 35.0);

pub fn is_mock_scan_id(scan_id: &str) -> bool {
  scan_id
    .strip_prefix(MOCK_SCAN_PREFIX)
    .is_some_and(|millis| !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()))
}

/// Hands out `mock-scan-<unix millis>` ids that never repeat within a process,
/// even when two are requested in the same millisecond
#[derive(Debug, Default)]
pub struct ScanIdGenerator {
  last: AtomicI64,
}

impl ScanIdGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_id(&self) -> String {
    self.next_at(Utc::now())
  }

  fn next_at(&self, now: DateTime<Utc>) -> String {
    let now = now.timestamp_millis();
    let mut last = self.last.load(Ordering::SeqCst);
    loop {
      let candidate = if now > last { now } else { last + 1 };
      match self.last.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => return format!("{MOCK_SCAN_PREFIX}{candidate}"),
        Err(current) => last = current,
      }
    }
  }
}

/// A complete synthetic scan, shaped like a degraded real run
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResult {
  pub scan_id: String,
  pub metrics: RawMetrics,
  pub interpretations: Interpretations,
  pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Default)]
pub struct FallbackGenerator {
  ids: ScanIdGenerator,
}

impl FallbackGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_scan_id(&self) -> String {
    self.ids.next_id()
  }

  /// Fixed metrics tagged with `week`, plus the local interpretations and the
  /// canned suggestion set
  pub fn generate(&self, week: u8) -> FallbackResult {
    let metrics = FALLBACK_METRICS.with_pregnancy_week(week);

    FallbackResult {
      scan_id: self.next_scan_id(),
      metrics,
      interpretations: local_interpretations(&metrics),
      suggestions: fallback_suggestions(Utc::now()),
    }
  }
}
