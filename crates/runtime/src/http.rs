//! HTTP probe - measures against real endpoints
//!
//! - network info: ip-api style JSON (`query`, `isp`, `city`, `regionName`, `country`)
//! - latency: timed HEAD requests, cache-busted
//! - download: streamed GET, progress from Content-Length when present
//! - upload: streamed POST of a zero-filled payload

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use termspeed_core::{
    NetworkInfo, NetworkProbe, ProbeConfig, ProbeError, ProgressReporter, TransferProgress,
    throughput_mbps,
};

const UPLOAD_CHUNK: usize = 64 * 1024;
const UPLOAD_TICK: Duration = Duration::from_millis(100);
const UNKNOWN_SIZE_WARNING: &str =
    "Content-Length header missing or invalid. Progress/Speed might be inaccurate.";

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, rename = "regionName")]
    region_name: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `city, region, country` without the gaps left by missing parts.
fn format_location(city: Option<String>, region: Option<String>, country: Option<String>) -> String {
    let parts: Vec<String> = [city, region, country]
        .into_iter()
        .filter_map(non_empty)
        .collect();
    if parts.is_empty() {
        return NetworkInfo::UNAVAILABLE_IP.to_string();
    }
    parts.join(", ")
}

pub(crate) fn parse_ip_info(body: &[u8]) -> Result<NetworkInfo, ProbeError> {
    let data: IpApiResponse =
        serde_json::from_slice(body).map_err(|e| ProbeError::Decode(e.to_string()))?;
    if data.status.as_deref() == Some("fail") {
        return Err(ProbeError::Decode(
            data.message
                .unwrap_or_else(|| "lookup failed".to_string()),
        ));
    }
    let na = || NetworkInfo::UNAVAILABLE_IP.to_string();
    Ok(NetworkInfo {
        ip_address: non_empty(data.query).unwrap_or_else(na),
        isp: non_empty(data.isp).unwrap_or_else(na),
        location: format_location(data.city, data.region_name, data.country),
    })
}

/// `raw` with a `_=<millis>` query pair so caches stay out of the way.
pub(crate) fn cache_busted(raw: &str) -> Result<Url, ProbeError> {
    let mut url =
        Url::parse(raw).map_err(|e| ProbeError::Other(format!("invalid URL {raw}: {e}")))?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    url.query_pairs_mut().append_pair("_", &stamp.to_string());
    Ok(url)
}

/// HTTP-backed [`NetworkProbe`].
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl HttpProbe {
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("termspeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Other(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn map_error(&self, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout(self.config.timeout * 1000)
        } else if let Some(status) = e.status() {
            ProbeError::Http {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            ProbeError::Decode(e.to_string())
        } else {
            ProbeError::Network(e.to_string())
        }
    }

    fn check_status(response: &reqwest::Response) -> Result<(), ProbeError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkProbe for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    fn ping_target(&self) -> Option<String> {
        let url = self.config.ping_url.as_str();
        Some(url.split_once('?').map_or(url, |(base, _)| base).to_string())
    }

    fn download_source(&self) -> Option<String> {
        Some(self.config.download_url.clone())
    }

    async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
        debug!(url = %self.config.ip_info_url, "fetching network info");
        let response = self
            .client
            .get(&self.config.ip_info_url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Self::check_status(&response)?;
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        parse_ip_info(&body)
    }

    async fn latency_sample(&self) -> Result<Duration, ProbeError> {
        let url = cache_busted(&self.config.ping_url)?;
        let start = Instant::now();
        // Any answer counts as a round-trip; only timing matters here.
        self.client
            .head(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Ok(start.elapsed())
    }

    async fn measure_download(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError> {
        let url = cache_busted(&self.config.download_url)?;
        debug!(%url, "download started");
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Self::check_status(&response)?;

        let total = response.content_length().filter(|n| *n > 0);
        if total.is_none() {
            warn!("Content-Length missing; download progress is estimated");
            progress.warn(UNKNOWN_SIZE_WARNING);
        }

        let mut received = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_error(e))?;
            received += chunk.len() as u64;
            progress.report(TransferProgress {
                bytes: received,
                total,
                elapsed: start.elapsed(),
            });
        }

        let elapsed = start.elapsed();
        debug!(bytes = received, ?elapsed, "download finished");
        throughput_mbps(received, elapsed)
            .ok_or_else(|| ProbeError::Other("download finished in zero time".to_string()))
    }

    async fn measure_upload(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError> {
        let url = cache_busted(&self.config.upload_url)?;
        let total = self.config.upload_bytes as u64;
        let sent = Arc::new(AtomicU64::new(0));

        let counter = sent.clone();
        let mut remaining = self.config.upload_bytes;
        let mut chunks = Vec::new();
        while remaining > 0 {
            let len = remaining.min(UPLOAD_CHUNK);
            chunks.push(len);
            remaining -= len;
        }
        let body = futures_util::stream::iter(chunks.into_iter().map(move |len| {
            counter.fetch_add(len as u64, Ordering::Relaxed);
            Ok::<_, std::io::Error>(vec![0u8; len])
        }));

        debug!(%url, bytes = total, "upload started");
        let start = Instant::now();
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(reqwest::Body::wrap_stream(body))
            .send();
        tokio::pin!(request);

        let mut ticker = tokio::time::interval(UPLOAD_TICK);
        let response = loop {
            tokio::select! {
                res = &mut request => break res.map_err(|e| self.map_error(e))?,
                _ = ticker.tick() => progress.report(TransferProgress {
                    bytes: sent.load(Ordering::Relaxed),
                    total: Some(total),
                    elapsed: start.elapsed(),
                }),
            }
        };
        Self::check_status(&response)?;

        let elapsed = start.elapsed();
        progress.report(TransferProgress {
            bytes: total,
            total: Some(total),
            elapsed,
        });
        debug!(bytes = total, ?elapsed, "upload finished");
        throughput_mbps(total, elapsed)
            .ok_or_else(|| ProbeError::Other("upload finished in zero time".to_string()))
    }
}
