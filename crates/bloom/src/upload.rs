//! Upload service: turns a captured video into a server-side scan

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;

use crate::backend::{bounded, ScanBackend, UploadPayload};
use crate::config::PipelineConfig;
use crate::error::UploadError;
use crate::metrics::RawMetrics;

/// Largest video accepted for upload (50 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
enum VideoSource {
  File(PathBuf),
  Memory(Vec<u8>),
}

/// A captured video handed over by the capture layer
#[derive(Debug, Clone)]
pub struct VideoHandle {
  source: VideoSource,
  file_name: String,
  content_type: String,
}

impl VideoHandle {
  /// Video on disk; the content type is guessed from the extension
  pub fn from_path(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let file_name = path
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_else(|| "scan.mp4".to_string());
    let content_type = content_type_for(&path).to_string();

    Self { source: VideoSource::File(path), file_name, content_type }
  }

  /// Video already held in memory
  pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
    let file_name = file_name.into();
    let content_type = content_type_for(Path::new(&file_name)).to_string();

    Self { source: VideoSource::Memory(bytes), file_name, content_type }
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = content_type.into();
    self
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn content_type(&self) -> &str {
    &self.content_type
  }

  pub async fn size(&self) -> std::io::Result<u64> {
    match &self.source {
      VideoSource::File(path) => Ok(tokio::fs::metadata(path).await?.len()),
      VideoSource::Memory(bytes) => Ok(bytes.len() as u64),
    }
  }

  async fn into_bytes(self) -> std::io::Result<Vec<u8>> {
    match self.source {
      VideoSource::File(path) => tokio::fs::read(path).await,
      VideoSource::Memory(bytes) => Ok(bytes),
    }
  }
}

fn content_type_for(path: &Path) -> &'static str {
  let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
  match extension.as_deref() {
    Some("mp4") | Some("m4v") => "video/mp4",
    Some("mov") => "video/quicktime",
    Some("webm") => "video/webm",
    Some("3gp") => "video/3gpp",
    _ => "application/octet-stream",
  }
}

/// Result of a successful upload. The scan id is absent when the server did
/// not assign one; the caller decides what to do about that.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
  pub scan_id: Option<String>,
  pub metrics: RawMetrics,
}

pub struct UploadService {
  backend: Arc<dyn ScanBackend>,
  max_bytes: u64,
  processing_delay: Duration,
  request_timeout: Duration,
}

impl UploadService {
  pub fn new(backend: Arc<dyn ScanBackend>, config: &PipelineConfig) -> Self {
    Self {
      backend,
      max_bytes: config.max_upload_bytes,
      processing_delay: config.processing_delay,
      request_timeout: config.upload_timeout,
    }
  }

  /// Upload a video and read back its metrics.
  ///
  /// Oversized videos fail with `PayloadTooLarge` before anything is read or
  /// sent. When the server assigns a scan id, the service waits for the
  /// processing delay and then fetches the results for that id; if that read
  /// fails the whole upload fails.
  pub async fn upload(&self, video: VideoHandle) -> Result<UploadOutcome, UploadError> {
    let size = video.size().await?;
    if size > self.max_bytes {
      return Err(UploadError::payload_too_large(size, self.max_bytes));
    }

    let file_name = video.file_name().to_string();
    let content_type = video.content_type().to_string();
    let bytes = video.into_bytes().await?;
    let payload = UploadPayload { video: BASE64_STANDARD.encode(&bytes), content_type, file_name };
    drop(bytes);

    tracing::debug!(size, file = %payload.file_name, "sending upload");
    let receipt = bounded(self.request_timeout, self.backend.upload(&payload))
      .await
      .map_err(UploadError::from_backend)?;

    match receipt.scan_id {
      Some(scan_id) => {
        tokio::time::sleep(self.processing_delay).await;

        let metrics = bounded(self.request_timeout, self.backend.fetch_results(&scan_id))
          .await
          .map_err(|e| UploadError::results_unavailable(scan_id.as_str(), e.to_string()))?;

        Ok(UploadOutcome { scan_id: Some(scan_id), metrics })
      }
      None => {
        let metrics = receipt.metrics.ok_or(UploadError::MissingMetrics)?;
        Ok(UploadOutcome { scan_id: None, metrics })
      }
    }
  }
}
