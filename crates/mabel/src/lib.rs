//! Mabel - console logging for the bloom scan pipeline
//!
//! ## Features
//!
//! - Leveled logging (info, warn, error, debug, success) with colored prefixes
//! - Multi-line messages keep their prefix on every line
//! - Stage events: timestamped lines that follow a scan session through the pipeline
//! - Recovery notices for failures absorbed at a component boundary
//! - Quiet mode for hosts that do not want anything on stderr
//!
//! ## Usage
//!
//! Leveled logging: `info()`, `warn()`, `error()`, `debug()`, `success()`, or the
//! matching macros which also accept format arguments.
//!
//! Pipeline events: `stage()`, `recovered()`.
//!
//! Everything is written to stderr so stdout stays free for command output.

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);

const PREFIX_WIDTH: usize = 8;

/// Silence (or restore) all console output
pub fn set_quiet(quiet: bool) {
  QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
  QUIET.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Warn,
  Error,
  Debug,
  Success,
}

impl Level {
  pub fn tag(&self) -> &'static str {
    match self {
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Error => "error",
      Level::Debug => "debug",
      Level::Success => "ok",
    }
  }

  fn color(&self) -> Color {
    match self {
      Level::Info => Color::Blue,
      Level::Warn => Color::Yellow,
      Level::Error => Color::Red,
      Level::Debug => Color::Magenta,
      Level::Success => Color::Green,
    }
  }
}

/// Prefix every line of `message` with the level tag, padded to a fixed column
pub fn render(level: Level, message: &str) -> Vec<String> {
  let tag = level.tag();
  let prefix = format!("[{}]", tag.color(level.color()).bold());
  let padding = " ".repeat(PREFIX_WIDTH.saturating_sub(tag.len() + 2));

  message.lines().map(|line| format!("{prefix}{padding}{line}")).collect()
}

/// Timestamped line announcing that a scan entered a new pipeline stage
pub fn render_stage(scan: &str, stage: &str) -> String {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  format!(
    "[{}] [{}] {} -> {}",
    "stage".cyan().bold(),
    timestamp.dimmed(),
    scan.bold(),
    stage.to_lowercase().green()
  )
}

/// Lines describing a failure that was handled locally instead of surfaced
pub fn render_recovered(component: &str, reason: &str) -> Vec<String> {
  render(Level::Warn, &format!("{component} recovered locally: {reason}"))
}

fn emit<I>(lines: I)
where
  I: IntoIterator<Item = String>,
{
  if is_quiet() {
    return;
  }
  for line in lines {
    eprintln!("{line}");
  }
}

pub fn log(level: Level, message: &str) {
  emit(render(level, message));
}

/// Info level logging - general progress
pub fn info(message: &str) {
  log(Level::Info, message);
}

/// Warning level logging - degraded but handled
pub fn warn(message: &str) {
  log(Level::Warn, message);
}

/// Error level logging - something could not be handled
pub fn error(message: &str) {
  log(Level::Error, message);
}

pub fn debug(message: &str) {
  log(Level::Debug, message);
}

pub fn success(message: &str) {
  log(Level::Success, message);
}

pub fn stage(scan: &str, stage: &str) {
  emit([render_stage(scan, stage)]);
}

pub fn recovered(component: &str, reason: &str) {
  emit(render_recovered(component, reason));
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}
