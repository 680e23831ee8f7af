//! HTTP implementation of the scan backend
//!
//! Thin wrapper over `reqwest`: every call is JSON in, JSON out, bounded by the
//! configured timeout, and non-success statuses become `BackendError::Status`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{
  bounded, ScanBackend, SynthesisRequest, SynthesisResponse, UploadPayload, UploadReceipt,
};
use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::interpretation::InterpretationKind;
use crate::metrics::RawMetrics;

#[derive(Deserialize)]
struct AnalyzerResponse {
  #[serde(alias = "result", alias = "interpretation")]
  analysis: String,
}

/// `GET /results/{id}` answers either with the metrics object or wraps it
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsResponse {
  Wrapped { metrics: RawMetrics },
  Bare(RawMetrics),
}

impl ResultsResponse {
  fn into_metrics(self) -> RawMetrics {
    match self {
      ResultsResponse::Wrapped { metrics } | ResultsResponse::Bare(metrics) => metrics,
    }
  }
}

pub struct HttpBackend {
  client: Client,
  config: ClientConfig,
}

impl HttpBackend {
  pub fn new(config: ClientConfig) -> Result<Self, BackendError> {
    let client = Client::builder()
      .timeout(config.timeout())
      .user_agent(concat!("bloom/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { client, config })
  }

  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn results_url(&self, scan_id: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(&self.url("/results/"))
      .map_err(|e| BackendError::transport(format!("invalid base url: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|_| BackendError::transport("base url cannot carry a path"))?
      .pop_if_empty()
      .push(scan_id);
    Ok(url)
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
    let response =
      bounded(self.config.timeout(), async move { request.send().await.map_err(BackendError::from) })
        .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(BackendError::status(status.as_u16(), body));
    }

    Ok(response)
  }

  async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::decode(e.to_string()))
  }
}

#[async_trait]
impl ScanBackend for HttpBackend {
  async fn upload(&self, payload: &UploadPayload) -> Result<UploadReceipt, BackendError> {
    tracing::debug!(file = %payload.file_name, encoded_len = payload.video.len(), "uploading video");
    let response = self.send(self.client.post(self.url("/upload")).json(payload)).await?;
    Self::read_json(response).await
  }

  async fn fetch_results(&self, scan_id: &str) -> Result<RawMetrics, BackendError> {
    let url = self.results_url(scan_id)?;
    let response = self.send(self.client.get(url)).await?;
    let results: ResultsResponse = Self::read_json(response).await?;
    Ok(results.into_metrics())
  }

  async fn analyze(
    &self,
    kind: InterpretationKind,
    metrics: &RawMetrics,
  ) -> Result<String, BackendError> {
    let path = kind
      .endpoint()
      .ok_or_else(|| BackendError::transport(format!("no remote analyzer for {kind}")))?;

    let response = self.send(self.client.post(self.url(path)).json(metrics)).await?;
    let body: AnalyzerResponse = Self::read_json(response).await?;
    Ok(body.analysis)
  }

  async fn synthesize(
    &self,
    request: &SynthesisRequest,
  ) -> Result<SynthesisResponse, BackendError> {
    let response = self.send(self.client.post(self.url("/overall-analyze/")).json(request)).await?;
    Self::read_json(response).await
  }
}
