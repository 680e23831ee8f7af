//! Scan session state machine
//!
//! A session is a plain value moved forward by explicit events. Status only
//! ever advances; a retry is a new session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  Recording,
  Uploading,
  Analyzing,
  Synthesizing,
  Complete,
  Fallback,
}

impl SessionStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, SessionStatus::Complete | SessionStatus::Fallback)
  }

  pub fn name(&self) -> &'static str {
    match self {
      SessionStatus::Recording => "recording",
      SessionStatus::Uploading => "uploading",
      SessionStatus::Analyzing => "analyzing",
      SessionStatus::Synthesizing => "synthesizing",
      SessionStatus::Complete => "complete",
      SessionStatus::Fallback => "fallback",
    }
  }
}

impl fmt::Display for SessionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
  /// The video was handed to the upload service
  UploadStarted,
  /// Upload and results read succeeded
  Uploaded { scan_id: String },
  /// Upload was impossible or failed; a synthetic result takes over
  FellBack { scan_id: String },
  AnalysisFinished,
  /// The result has been written to the store
  Finished,
}

impl SessionEvent {
  pub fn name(&self) -> &'static str {
    match self {
      SessionEvent::UploadStarted => "upload-started",
      SessionEvent::Uploaded { .. } => "uploaded",
      SessionEvent::FellBack { .. } => "fell-back",
      SessionEvent::AnalysisFinished => "analysis-finished",
      SessionEvent::Finished => "finished",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
  scan_id: Option<String>,
  status: SessionStatus,
  fell_back: bool,
  generation: u64,
}

impl ScanSession {
  /// A fresh session in `Recording`, tagged with the controller generation
  pub fn new(generation: u64) -> Self {
    Self {
      scan_id: None,
      status: SessionStatus::Recording,
      fell_back: false,
      generation,
    }
  }

  /// Apply an event, returning the new status. On error the session is left
  /// untouched.
  pub fn apply(&mut self, event: SessionEvent) -> Result<SessionStatus, TransitionError> {
    use SessionEvent::*;
    use SessionStatus::*;

    let next = match (self.status, &event) {
      (Recording, UploadStarted) => Uploading,
      (Uploading, Uploaded { .. }) => Analyzing,
      (Recording | Uploading, FellBack { .. }) => Analyzing,
      (Analyzing, AnalysisFinished) => Synthesizing,
      (Synthesizing, Finished) if self.fell_back => Fallback,
      (Synthesizing, Finished) => Complete,
      (status, event) => return Err(TransitionError { status, event: event.name() }),
    };

    match event {
      Uploaded { scan_id } => self.scan_id = Some(scan_id),
      FellBack { scan_id } => {
        self.scan_id = Some(scan_id);
        self.fell_back = true;
      }
      _ => {}
    }

    self.status = next;
    Ok(next)
  }

  /// Abandon the session before anything was sent
  pub fn cancel(self) -> Result<(), TransitionError> {
    if self.status == SessionStatus::Recording {
      Ok(())
    } else {
      Err(TransitionError { status: self.status, event: "cancel" })
    }
  }

  pub fn scan_id(&self) -> Option<&str> {
    self.scan_id.as_deref()
  }

  pub fn status(&self) -> SessionStatus {
    self.status
  }

  pub fn fell_back(&self) -> bool {
    self.fell_back
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}
