//! Pipeline controller
//!
//! Owns the session state machine and runs upload, analysis, synthesis and
//! persistence in order. Any upload problem reroutes the run through the
//! fallback generator, so `run` always produces an outcome.
//!
//! Status changes go out on a `watch` channel. Starting a new recording bumps
//! the controller generation; an older run still finishes but no longer
//! writes to the store or publishes status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::analysis::AnalysisOrchestrator;
use crate::backend::ScanBackend;
use crate::config::{BackendMode, PipelineConfig};
use crate::error::{StoreError, TransitionError, UploadError};
use crate::fallback::FallbackGenerator;
use crate::interpretation::Interpretations;
use crate::metrics::{resolve_week, RawMetrics};
use crate::session::{ScanSession, SessionEvent, SessionStatus};
use crate::store::{KeyValueStore, PersistedResult, ResultStore};
use crate::suggestion::Suggestion;
use crate::synthesis::SuggestionSynthesizer;
use crate::upload::{UploadService, VideoHandle};

/// What the caller knows about the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserContext {
  pub pregnancy_week: Option<u8>,
}

impl UserContext {
  pub fn with_week(week: u8) -> Self {
    Self { pregnancy_week: Some(week) }
  }
}

/// Why a run produced a synthetic result
#[derive(Error, Debug)]
pub enum FallbackReason {
  #[error("backend is in mock mode")]
  MockBackend,

  #[error("no video was captured")]
  NoVideo,

  #[error(transparent)]
  Upload(#[from] UploadError),
}

#[derive(Debug)]
pub struct ScanOutcome {
  pub scan_id: String,
  pub status: SessionStatus,
  pub metrics: RawMetrics,
  pub interpretations: Interpretations,
  pub suggestions: Vec<Suggestion>,
  /// A newer session started while this one ran; nothing was persisted
  pub superseded: bool,
  pub fallback_reason: Option<FallbackReason>,
}

impl ScanOutcome {
  pub fn is_fallback(&self) -> bool {
    self.status == SessionStatus::Fallback
  }
}

pub struct ScanPipeline {
  config: PipelineConfig,
  uploader: UploadService,
  analyzer: AnalysisOrchestrator,
  synthesizer: SuggestionSynthesizer,
  fallback: FallbackGenerator,
  store: ResultStore,
  generation: AtomicU64,
  status: watch::Sender<Option<SessionStatus>>,
}

impl ScanPipeline {
  pub fn new(
    config: PipelineConfig,
    backend: Arc<dyn ScanBackend>,
    store: Arc<dyn KeyValueStore>,
  ) -> Self {
    let (status, _) = watch::channel(None);

    Self {
      uploader: UploadService::new(backend.clone(), &config),
      analyzer: AnalysisOrchestrator::new(backend.clone(), &config),
      synthesizer: SuggestionSynthesizer::new(backend, &config),
      fallback: FallbackGenerator::new(),
      store: ResultStore::new(store),
      generation: AtomicU64::new(0),
      status,
      config,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Status of the current session; `None` until the first recording starts
  pub fn subscribe(&self) -> watch::Receiver<Option<SessionStatus>> {
    self.status.subscribe()
  }

  /// Start a new session. Any session still running becomes stale.
  pub fn begin_recording(&self) -> ScanSession {
    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    self.status.send_replace(Some(SessionStatus::Recording));
    tracing::debug!(generation, "recording started");
    ScanSession::new(generation)
  }

  /// Drop a session that has not been handed to the upload service yet
  pub fn cancel(&self, session: ScanSession) -> Result<(), TransitionError> {
    let generation = session.generation();
    session.cancel()?;
    if self.is_current(generation) {
      self.status.send_replace(None);
    }
    Ok(())
  }

  /// Start a session and run it to completion
  pub async fn scan(&self, video: Option<VideoHandle>, context: &UserContext) -> ScanOutcome {
    let session = self.begin_recording();
    self.run(session, video, context).await
  }

  /// Drive a session from `Recording` to `Complete` or `Fallback`
  pub async fn run(
    &self,
    mut session: ScanSession,
    video: Option<VideoHandle>,
    context: &UserContext,
  ) -> ScanOutcome {
    let week = resolve_week(context.pregnancy_week, self.config.default_pregnancy_week);

    let uploaded = match (self.config.mode, video) {
      (BackendMode::Mock, _) => Err(FallbackReason::MockBackend),
      (BackendMode::Live, None) => Err(FallbackReason::NoVideo),
      (BackendMode::Live, Some(video)) => {
        self.advance(&mut session, SessionEvent::UploadStarted);
        self.uploader.upload(video).await.map_err(FallbackReason::from)
      }
    };

    let (scan_id, metrics, interpretations, suggestions, fallback_reason) = match uploaded {
      Ok(upload) => {
        let scan_id = upload.scan_id.unwrap_or_else(|| self.fallback.next_scan_id());
        // the user's week replaces any week the service echoed back
        let metrics = upload.metrics.without_pregnancy_week().with_pregnancy_week(week);
        self.advance(&mut session, SessionEvent::Uploaded { scan_id: scan_id.clone() });

        let (interpretations, suggestions) = self.interpret(&mut session, &metrics).await;
        (scan_id, metrics, interpretations, suggestions, None)
      }
      Err(reason) => {
        tracing::warn!(reason = %reason, "scan falling back to a synthetic result");
        mabel::warn!("Using a synthetic result: {reason}");

        let result = self.fallback.generate(week);
        self.advance(&mut session, SessionEvent::FellBack { scan_id: result.scan_id.clone() });

        let (interpretations, suggestions) = match self.config.mode {
          BackendMode::Mock => {
            self.advance(&mut session, SessionEvent::AnalysisFinished);
            (result.interpretations, result.suggestions)
          }
          BackendMode::Live => self.interpret(&mut session, &result.metrics).await,
        };
        (result.scan_id, result.metrics, interpretations, suggestions, Some(reason))
      }
    };

    let current = self.is_current(session.generation());
    if current {
      let result = PersistedResult { scan_id: scan_id.clone(), metrics };
      if let Err(e) = self.store.save(&result) {
        tracing::warn!(error = %e, scan_id = %scan_id, "failed to persist scan result");
        mabel::warn!("Could not save scan {scan_id}: {e}");
      }
    } else {
      tracing::info!(scan_id = %scan_id, "session superseded, result not persisted");
    }
    self.advance(&mut session, SessionEvent::Finished);

    ScanOutcome {
      scan_id,
      status: session.status(),
      metrics,
      interpretations,
      suggestions,
      superseded: !current,
      fallback_reason,
    }
  }

  /// The persisted result of the most recent run, if any
  pub fn latest(&self) -> Result<Option<PersistedResult>, StoreError> {
    self.store.load()
  }

  pub fn clear(&self) -> Result<(), StoreError> {
    self.store.clear()
  }

  /// Analysis then synthesis, moving the session from `Analyzing` to
  /// `Synthesizing` in between. Neither step fails; both recover locally.
  async fn interpret(
    &self,
    session: &mut ScanSession,
    metrics: &RawMetrics,
  ) -> (Interpretations, Vec<Suggestion>) {
    let interpretations = self.analyzer.analyze(metrics).await;
    self.advance(session, SessionEvent::AnalysisFinished);

    let suggestions = self.synthesizer.synthesize(metrics, &interpretations).await;
    (interpretations, suggestions)
  }

  fn is_current(&self, generation: u64) -> bool {
    self.generation.load(Ordering::SeqCst) == generation
  }

  fn advance(&self, session: &mut ScanSession, event: SessionEvent) {
    let status = match session.apply(event) {
      Ok(status) => status,
      Err(e) => {
        tracing::error!(error = %e, "session transition rejected");
        return;
      }
    };

    if !self.is_current(session.generation()) {
      return;
    }

    mabel::stage(session.scan_id().unwrap_or("new scan"), status.name());
    tracing::debug!(scan_id = ?session.scan_id(), %status, "session advanced");
    self.status.send_replace(Some(status));
  }
}
