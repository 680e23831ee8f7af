//! Bloom - scan-to-insight pipeline
//!
//! Takes a captured video, uploads it, fans out to the cardiac, variability and
//! stress analyzers, synthesizes a set of suggestions and keeps the latest result
//! on disk for offline display. Every stage degrades to a local, deterministic
//! result, so a run always ends with something the caller can show.
//!
//! ## Modules
//!
//! - **pipeline**: session controller wiring the stages together
//! - **upload / analysis / synthesis / fallback**: the individual stages
//! - **backend**: the remote service seam and its HTTP implementation
//! - **store**: single-slot persistence of the latest result

pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod fallback;
pub mod interpretation;
pub mod metrics;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod synthesis;
pub mod upload;

pub use analysis::AnalysisOrchestrator;
pub use backend::{http::HttpBackend, ScanBackend};
pub use config::{BackendMode, ClientConfig, PipelineConfig};
pub use error::{AnalysisError, BackendError, MetricsError, StoreError, TransitionError, UploadError};
pub use fallback::FallbackGenerator;
pub use interpretation::{Interpretation, InterpretationKind, Interpretations};
pub use metrics::RawMetrics;
pub use pipeline::{FallbackReason, ScanOutcome, ScanPipeline, UserContext};
pub use session::{ScanSession, SessionEvent, SessionStatus};
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistedResult, ResultStore};
pub use suggestion::{Importance, Suggestion, SuggestionCategory};
pub use synthesis::SuggestionSynthesizer;
pub use upload::{UploadService, VideoHandle};
