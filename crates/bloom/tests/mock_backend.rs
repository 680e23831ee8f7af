//! Scriptable analysis service shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bloom::backend::{
  ScanBackend, SynthesisRequest, SynthesisResponse, UploadPayload, UploadReceipt,
};
use bloom::{BackendError, InterpretationKind, RawMetrics};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// How a scripted endpoint answers
#[derive(Clone)]
pub enum Answer<T> {
  Ok(T),
  Status(u16),
  /// Never answers; only a timeout ends the call
  Hang,
}

/// In-process analysis service for pipeline tests
pub struct MockBackend {
  pub receipt: Answer<UploadReceipt>,
  pub results: HashMap<String, Answer<RawMetrics>>,
  pub analyzers: HashMap<InterpretationKind, Answer<String>>,
  pub synthesis: Answer<SynthesisResponse>,
  /// When set, uploads wait for a permit before answering
  pub upload_gate: Option<Arc<Notify>>,
  pub uploads: Mutex<Vec<UploadPayload>>,
  pub synthesis_requests: Mutex<Vec<SynthesisRequest>>,
  pub api_call_count: AtomicUsize,
}

impl MockBackend {
  pub fn new() -> Self {
    Self {
      receipt: Answer::Status(500),
      results: HashMap::new(),
      analyzers: HashMap::new(),
      synthesis: Answer::Ok(SynthesisResponse::default()),
      upload_gate: None,
      uploads: Mutex::new(Vec::new()),
      synthesis_requests: Mutex::new(Vec::new()),
      api_call_count: AtomicUsize::new(0),
    }
  }

  /// A service that accepts uploads as `scan_id` and answers every endpoint
  pub fn with_scan(scan_id: &str, metrics: RawMetrics) -> Self {
    let mut mock = Self::new();
    mock.receipt = Answer::Ok(UploadReceipt { scan_id: Some(scan_id.to_string()), metrics: None });
    mock.results.insert(scan_id.to_string(), Answer::Ok(metrics));
    for kind in InterpretationKind::REMOTE {
      mock.analyzers.insert(kind, Answer::Ok(format!("Remote {} analysis.", kind.name())));
    }
    mock.synthesis = Answer::Ok(SynthesisResponse {
      stress_management: Some("Take a short breathing break twice a day.".to_string()),
      physical_activity: Some("A 20 minute walk after lunch.".to_string()),
      nutrition: Some("Add an iron-rich snack.".to_string()),
      sleep: Some("Keep the bedroom cool and dark.".to_string()),
    });
    mock
  }

  pub fn calls(&self) -> usize {
    self.api_call_count.load(Ordering::SeqCst)
  }

  async fn answer<T: Clone>(&self, answer: Answer<T>) -> Result<T, BackendError> {
    self.api_call_count.fetch_add(1, Ordering::SeqCst);
    match answer {
      Answer::Ok(value) => Ok(value),
      Answer::Status(status) => Err(BackendError::status(status, "mock failure")),
      Answer::Hang => std::future::pending().await,
    }
  }
}

#[async_trait]
impl ScanBackend for MockBackend {
  async fn upload(&self, payload: &UploadPayload) -> Result<UploadReceipt, BackendError> {
    self.uploads.lock().unwrap().push(payload.clone());
    if let Some(gate) = &self.upload_gate {
      gate.notified().await;
    }
    self.answer(self.receipt.clone()).await
  }

  async fn fetch_results(&self, scan_id: &str) -> Result<RawMetrics, BackendError> {
    let answer = self.results.get(scan_id).cloned().unwrap_or(Answer::Status(404));
    self.answer(answer).await
  }

  async fn analyze(
    &self,
    kind: InterpretationKind,
    _metrics: &RawMetrics,
  ) -> Result<String, BackendError> {
    let answer = self.analyzers.get(&kind).cloned().unwrap_or(Answer::Status(404));
    self.answer(answer).await
  }

  async fn synthesize(
    &self,
    request: &SynthesisRequest,
  ) -> Result<SynthesisResponse, BackendError> {
    self.synthesis_requests.lock().unwrap().push(request.clone());
    self.answer(self.synthesis.clone()).await
  }
}
