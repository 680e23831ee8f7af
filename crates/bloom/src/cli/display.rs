//! Display formatting utilities for CLI output

use std::fmt::Write;

use colored::*;

use crate::interpretation::{Interpretations, Source};
use crate::metrics::RawMetrics;
use crate::pipeline::ScanOutcome;
use crate::session::SessionStatus;
use crate::store::PersistedResult;
use crate::suggestion::{Importance, Suggestion};

const WRAP_WIDTH: usize = 72;

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(std::mem::take(&mut current_line));
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

pub fn importance_badge(importance: Importance) -> ColoredString {
  let tag = format!("[{importance}]");
  match importance {
    Importance::High => tag.red().bold(),
    Importance::Medium => tag.yellow(),
    Importance::Low => tag.dimmed(),
  }
}

fn status_label(status: SessionStatus) -> ColoredString {
  match status {
    SessionStatus::Complete => status.name().green().bold(),
    SessionStatus::Fallback => status.name().yellow().bold(),
    other => other.name().normal(),
  }
}

fn write_metrics(out: &mut String, metrics: &RawMetrics) {
  let _ = writeln!(out, "{}", "Metrics".bold());
  let _ = writeln!(out, "  {:<16}{:.0} bpm", "Heart rate", metrics.heart_rate_bpm());
  let _ = writeln!(out, "  {:<16}{:.1} ms", "SDNN", metrics.sdnn_ms());
  let _ = writeln!(out, "  {:<16}{:.1} ms", "RMSSD", metrics.rmssd_ms());
  let _ = writeln!(out, "  {:<16}{:.1} %", "pNN50", metrics.pnn50_pct());
  let _ = writeln!(out, "  {:<16}{:.0} / 100", "Stress score", metrics.stress_score());
  if let Some(week) = metrics.pregnancy_week() {
    let _ = writeln!(out, "  {:<16}{}", "Pregnancy week", week);
  }
}

fn write_interpretations(out: &mut String, interpretations: &Interpretations) {
  let _ = writeln!(out, "{}", "Interpretations".bold());
  for interpretation in interpretations.iter() {
    let origin = match interpretation.source() {
      Source::Remote => String::new(),
      Source::Local => format!(" {}", "(local)".dimmed()),
    };
    let _ = writeln!(out, "  {}{}", interpretation.kind().label().cyan(), origin);
    for line in wrap_text(interpretation.text(), WRAP_WIDTH) {
      let _ = writeln!(out, "    {line}");
    }
  }
}

fn write_suggestions(out: &mut String, suggestions: &[Suggestion]) {
  let _ = writeln!(out, "{}", "Suggestions".bold());
  for suggestion in suggestions {
    let _ = writeln!(out, "  {} {}", importance_badge(suggestion.importance), suggestion.title);
    for line in wrap_text(&suggestion.description, WRAP_WIDTH) {
      let _ = writeln!(out, "    {line}");
    }
  }
}

/// Full report for a finished run
pub fn render_outcome(outcome: &ScanOutcome) -> String {
  let mut out = String::new();

  let _ = writeln!(out, "Scan {} ({})", outcome.scan_id.yellow(), status_label(outcome.status));
  if let Some(reason) = &outcome.fallback_reason {
    let _ = writeln!(out, "  {} {}", "synthetic result:".dimmed(), reason);
  }
  if outcome.superseded {
    let _ = writeln!(out, "  {}", "superseded by a newer scan, not saved".dimmed());
  }
  out.push('\n');

  write_metrics(&mut out, &outcome.metrics);
  out.push('\n');
  write_interpretations(&mut out, &outcome.interpretations);
  out.push('\n');
  write_suggestions(&mut out, &outcome.suggestions);

  out
}

/// The stored result, as shown after a restart
pub fn render_persisted(result: &PersistedResult) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Latest scan {}", result.scan_id.yellow());
  out.push('\n');
  write_metrics(&mut out, &result.metrics);
  out
}
