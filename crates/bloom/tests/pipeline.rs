mod mock_backend;

use bloom::fallback::is_mock_scan_id;
use bloom::interpretation::{local_interpretation, local_interpretations};
use bloom::{
  BackendMode, FallbackReason, FileStore, Importance, InterpretationKind, MemoryStore,
  PipelineConfig, RawMetrics, ScanPipeline, SessionStatus, SuggestionCategory, UploadError,
  UserContext, VideoHandle,
};
use mock_backend::{Answer, MockBackend};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn scan_metrics() -> RawMetrics {
  RawMetrics::new(79.0, 45.0, 42.0, 30.0, 35.0).unwrap()
}

fn video() -> VideoHandle {
  VideoHandle::from_bytes("scan.mp4", vec![0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70])
}

fn fast_config() -> PipelineConfig {
  PipelineConfig { processing_delay: Duration::ZERO, ..PipelineConfig::default() }
}

fn pipeline_with(backend: MockBackend) -> (ScanPipeline, Arc<MockBackend>) {
  let backend = Arc::new(backend);
  let pipeline = ScanPipeline::new(fast_config(), backend.clone(), Arc::new(MemoryStore::new()));
  (pipeline, backend)
}

#[tokio::test]
async fn test_healthy_scan_completes_with_remote_results() {
  let (pipeline, backend) = pipeline_with(MockBackend::with_scan("srv-42", scan_metrics()));

  let outcome = pipeline.scan(Some(video()), &UserContext::with_week(26)).await;

  assert_eq!(outcome.status, SessionStatus::Complete);
  assert_eq!(outcome.scan_id, "srv-42");
  assert!(outcome.fallback_reason.is_none());
  assert!(!outcome.superseded);
  assert_eq!(outcome.metrics.pregnancy_week(), Some(26));
  assert_eq!(outcome.interpretations.cardiac().text(), "Remote cardiac analysis.");
  assert_eq!(outcome.suggestions.len(), 4);

  let persisted = pipeline.latest().unwrap().unwrap();
  assert_eq!(persisted.scan_id, "srv-42");
  assert_eq!(persisted.metrics, outcome.metrics);

  // upload, results, three analyzers, synthesis
  assert_eq!(backend.calls(), 6);
  assert_eq!(backend.synthesis_requests.lock().unwrap()[0].week, 26);
}

#[tokio::test]
async fn test_oversized_video_falls_back_without_uploading() {
  let temp = assert_fs::TempDir::new().unwrap();
  let path = temp.path().join("long-scan.mp4");
  std::fs::File::create(&path).unwrap().set_len(60 * 1024 * 1024).unwrap();

  let (pipeline, backend) = pipeline_with(MockBackend::with_scan("srv-1", scan_metrics()));
  let outcome = pipeline.scan(Some(VideoHandle::from_path(&path)), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert!(is_mock_scan_id(&outcome.scan_id), "unexpected id {}", outcome.scan_id);
  assert!(matches!(
    outcome.fallback_reason,
    Some(FallbackReason::Upload(UploadError::PayloadTooLarge { size, .. })) if size == 60 * 1024 * 1024
  ));
  assert_eq!(outcome.suggestions.len(), 4);
  // three analyzers and synthesis over the synthetic metrics, no upload
  assert_eq!(backend.calls(), 4);
  assert!(backend.uploads.lock().unwrap().is_empty());

  assert_eq!(pipeline.latest().unwrap().unwrap().scan_id, outcome.scan_id);
}

#[tokio::test(start_paused = true)]
async fn test_cardiac_timeout_is_recovered_locally() {
  let mut backend = MockBackend::with_scan("srv-7", scan_metrics());
  backend.analyzers.insert(InterpretationKind::Cardiac, Answer::Hang);
  let (pipeline, _) = pipeline_with(backend);

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Complete);
  let local_cardiac = local_interpretation(InterpretationKind::Cardiac, &outcome.metrics);
  assert_eq!(outcome.interpretations.cardiac(), &local_cardiac);
  assert_eq!(outcome.interpretations.variability().text(), "Remote variability analysis.");
  assert_eq!(outcome.interpretations.stress().text(), "Remote stress analysis.");
}

#[tokio::test]
async fn test_empty_synthesis_uses_fixed_suggestions() {
  let mut backend = MockBackend::with_scan("srv-8", scan_metrics());
  backend.synthesis = Answer::Ok(Default::default());
  let (pipeline, _) = pipeline_with(backend);

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Complete);
  let tiers: Vec<_> = outcome.suggestions.iter().map(|s| s.importance).collect();
  assert_eq!(tiers, vec![Importance::High, Importance::Medium, Importance::High, Importance::Medium]);
  let categories: Vec<_> = outcome.suggestions.iter().map(|s| s.category).collect();
  assert_eq!(categories, SuggestionCategory::ALL.to_vec());
}

#[tokio::test]
async fn test_suggestions_never_repeat_a_category() {
  let (pipeline, _) = pipeline_with(MockBackend::with_scan("srv-9", scan_metrics()));
  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  let unique: HashSet<_> = outcome.suggestions.iter().map(|s| s.category).collect();
  assert!((1..=4).contains(&outcome.suggestions.len()));
  assert_eq!(unique.len(), outcome.suggestions.len());
}

#[tokio::test]
async fn test_second_scan_overwrites_first() {
  let temp = assert_fs::TempDir::new().unwrap();
  let store = Arc::new(FileStore::open(temp.path()).unwrap());

  let first = ScanPipeline::new(
    fast_config(),
    Arc::new(MockBackend::with_scan("srv-first", scan_metrics())),
    store.clone(),
  );
  first.scan(Some(video()), &UserContext::default()).await;

  let second_metrics = RawMetrics::new(92.0, 28.0, 24.0, 9.0, 58.0).unwrap();
  let second = ScanPipeline::new(
    fast_config(),
    Arc::new(MockBackend::with_scan("srv-second", second_metrics)),
    store.clone(),
  );
  second.scan(Some(video()), &UserContext::default()).await;

  // a fresh store over the same directory sees only the second result
  let reopened = ScanPipeline::new(
    fast_config(),
    Arc::new(MockBackend::new()),
    Arc::new(FileStore::open(temp.path()).unwrap()),
  );
  let latest = reopened.latest().unwrap().unwrap();
  assert_eq!(latest.scan_id, "srv-second");
  assert_eq!(latest.metrics.heart_rate_bpm(), 92.0);
  assert_eq!(latest.metrics.stress_score(), 58.0);
}

#[tokio::test]
async fn test_rejected_upload_falls_back() {
  let mut backend = MockBackend::with_scan("srv-1", scan_metrics());
  backend.receipt = Answer::Status(503);
  let (pipeline, backend) = pipeline_with(backend);

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert!(matches!(
    outcome.fallback_reason,
    Some(FallbackReason::Upload(UploadError::Rejected { status: 503, .. }))
  ));
  assert!(is_mock_scan_id(&outcome.scan_id));
  assert_eq!(outcome.metrics.heart_rate_bpm(), 78.0);

  // the synthetic metrics still go through the analyzers and synthesis
  assert_eq!(backend.calls(), 5);
  assert!(outcome.interpretations.cardiac().is_remote());
  assert!(outcome.interpretations.stress().is_remote());
  assert_eq!(outcome.suggestions[0].description, "Take a short breathing break twice a day.");
  assert_eq!(backend.synthesis_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_service_falls_back_to_local_rules() {
  let (pipeline, backend) = pipeline_with(MockBackend::new());

  let outcome = pipeline.scan(Some(video()), &UserContext::with_week(12)).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert_eq!(outcome.metrics.pregnancy_week(), Some(12));
  assert_eq!(outcome.interpretations, local_interpretations(&outcome.metrics));
  let tiers: Vec<_> = outcome.suggestions.iter().map(|s| s.importance).collect();
  assert_eq!(tiers, vec![Importance::High, Importance::Medium, Importance::High, Importance::Medium]);
  assert_eq!(backend.calls(), 5);
}

#[tokio::test]
async fn test_user_week_replaces_week_from_results() {
  let (pipeline, backend) =
    pipeline_with(MockBackend::with_scan("srv-3", scan_metrics().with_pregnancy_week(30)));

  let outcome = pipeline.scan(Some(video()), &UserContext::with_week(26)).await;

  assert_eq!(outcome.status, SessionStatus::Complete);
  assert_eq!(outcome.metrics.pregnancy_week(), Some(26));
  assert_eq!(backend.synthesis_requests.lock().unwrap()[0].week, 26);
  assert_eq!(pipeline.latest().unwrap().unwrap().metrics.pregnancy_week(), Some(26));
}

#[tokio::test]
async fn test_failed_results_read_falls_back() {
  let mut backend = MockBackend::with_scan("srv-1", scan_metrics());
  backend.results.clear();
  let (pipeline, _) = pipeline_with(backend);

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert!(matches!(
    outcome.fallback_reason,
    Some(FallbackReason::Upload(UploadError::ResultsUnavailable { .. }))
  ));
}

#[tokio::test]
async fn test_missing_server_id_gets_local_id() {
  let mut backend = MockBackend::with_scan("unused", scan_metrics());
  backend.receipt = Answer::Ok(bloom::backend::UploadReceipt {
    scan_id: None,
    metrics: Some(scan_metrics()),
  });
  let (pipeline, _) = pipeline_with(backend);

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Complete);
  assert!(is_mock_scan_id(&outcome.scan_id));
  assert!(outcome.interpretations.stress().is_remote());
}

#[tokio::test]
async fn test_no_video_falls_back() {
  let (pipeline, backend) = pipeline_with(MockBackend::with_scan("srv-1", scan_metrics()));

  let outcome = pipeline.scan(None, &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert!(matches!(outcome.fallback_reason, Some(FallbackReason::NoVideo)));
  assert!(backend.uploads.lock().unwrap().is_empty());
  assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn test_mock_mode_never_touches_the_backend() {
  let backend = Arc::new(MockBackend::with_scan("srv-1", scan_metrics()));
  let pipeline = ScanPipeline::new(
    fast_config().with_mode(BackendMode::Mock),
    backend.clone(),
    Arc::new(MemoryStore::new()),
  );

  let outcome = pipeline.scan(Some(video()), &UserContext::default()).await;

  assert_eq!(outcome.status, SessionStatus::Fallback);
  assert!(matches!(outcome.fallback_reason, Some(FallbackReason::MockBackend)));
  assert_eq!(outcome.metrics.heart_rate_bpm(), 78.0);
  assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_status_sequence_is_published_in_order() {
  let (pipeline, _) = pipeline_with(MockBackend::with_scan("srv-5", scan_metrics()));
  let mut receiver = pipeline.subscribe();

  let session = pipeline.begin_recording();
  let watcher = tokio::spawn(async move {
    let mut seen = Vec::new();
    while receiver.changed().await.is_ok() {
      let status = *receiver.borrow_and_update();
      if let Some(status) = status {
        seen.push(status);
        if status.is_terminal() {
          break;
        }
      }
    }
    seen
  });

  let outcome = pipeline.run(session, Some(video()), &UserContext::default()).await;
  assert_eq!(outcome.status, SessionStatus::Complete);

  let seen = watcher.await.unwrap();
  // a watch receiver may skip intermediate values, never reorder them
  assert_eq!(seen.last(), Some(&SessionStatus::Complete));
  let order = [
    SessionStatus::Recording,
    SessionStatus::Uploading,
    SessionStatus::Analyzing,
    SessionStatus::Synthesizing,
    SessionStatus::Complete,
  ];
  let positions: Vec<_> =
    seen.iter().map(|s| order.iter().position(|o| o == s).unwrap()).collect();
  assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "out of order: {seen:?}");
}

#[tokio::test]
async fn test_superseded_run_is_not_persisted() {
  let gate = Arc::new(Notify::new());
  let mut backend = MockBackend::with_scan("srv-old", scan_metrics());
  backend.upload_gate = Some(gate.clone());
  let (pipeline, _) = pipeline_with(backend);
  let pipeline = Arc::new(pipeline);
  let receiver = pipeline.subscribe();

  let stale = pipeline.begin_recording();
  let runner = {
    let pipeline = pipeline.clone();
    tokio::spawn(async move { pipeline.run(stale, Some(video()), &UserContext::default()).await })
  };

  let _newer = pipeline.begin_recording();
  gate.notify_one();

  let outcome = runner.await.unwrap();
  assert!(outcome.superseded);
  assert_eq!(outcome.status, SessionStatus::Complete);
  assert_eq!(outcome.scan_id, "srv-old");

  assert_eq!(pipeline.latest().unwrap(), None);
  assert_eq!(*receiver.borrow(), Some(SessionStatus::Recording));
}

#[tokio::test]
async fn test_cancel_only_before_upload() {
  let (pipeline, backend) = pipeline_with(MockBackend::with_scan("srv-1", scan_metrics()));

  let session = pipeline.begin_recording();
  assert!(pipeline.cancel(session).is_ok());
  assert_eq!(backend.calls(), 0);
  assert_eq!(pipeline.latest().unwrap(), None);
}
