use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::backend::http::HttpBackend;
use crate::cli::display::{render_outcome, render_persisted};
use crate::config::{BackendMode, ClientConfig, PipelineConfig};
use crate::pipeline::{ScanPipeline, UserContext};
use crate::store::{FileStore, KeyValueStore, MemoryStore, ResultStore};
use crate::upload::VideoHandle;

/// Options for `bloom scan`
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
  pub video: Option<PathBuf>,
  pub week: Option<u8>,
  /// Forces mock mode regardless of `BLOOM_BACKEND`
  pub mock: bool,
  pub api_url: Option<String>,
}

fn open_store() -> Result<Arc<dyn KeyValueStore>> {
  let store = FileStore::default_location().context("Failed to open the result store")?;
  Ok(Arc::new(store))
}

/// The on-disk store, or an in-memory one when it cannot be opened. A scan
/// still runs and prints; its result is just not kept.
fn open_store_for_scan() -> Arc<dyn KeyValueStore> {
  match FileStore::default_location() {
    Ok(store) => Arc::new(store),
    Err(e) => {
      tracing::warn!(error = %e, "result store unavailable, keeping this scan in memory");
      mabel::warn!("Could not open the result store, this scan will not be saved: {e}");
      Arc::new(MemoryStore::new())
    }
  }
}

/// Run one scan end to end and print the outcome
pub async fn scan(options: ScanOptions) -> Result<()> {
  let mut config = PipelineConfig::from_env();
  if options.mock {
    config = config.with_mode(BackendMode::Mock);
  }

  let mut client = ClientConfig::from_env();
  if let Some(url) = options.api_url {
    client.base_url = url;
  }

  let backend = HttpBackend::new(client).context("Failed to build the HTTP client")?;
  if config.mode == BackendMode::Live {
    mabel::info!("Analysis service: {}", backend.base_url());
  }

  let pipeline = ScanPipeline::new(config, Arc::new(backend), open_store_for_scan());
  let video = options.video.map(VideoHandle::from_path);
  let outcome = pipeline.scan(video, &UserContext { pregnancy_week: options.week }).await;

  print!("{}", render_outcome(&outcome));

  if outcome.is_fallback() {
    mabel::warn!("Scan {} finished with a synthetic result", outcome.scan_id);
  } else {
    mabel::success!("Scan {} complete", outcome.scan_id);
  }

  Ok(())
}

/// Print the persisted result of the most recent scan
pub fn latest() -> Result<()> {
  let store = ResultStore::new(open_store()?);

  match store.load().context("Failed to read the latest scan")? {
    Some(result) => print!("{}", render_persisted(&result)),
    None => println!("No scan result saved yet."),
  }

  Ok(())
}

/// Forget the persisted result
pub fn clear() -> Result<()> {
  ResultStore::new(open_store()?).clear().context("Failed to clear the latest scan")?;
  mabel::success!("Cleared the latest scan result");
  Ok(())
}
