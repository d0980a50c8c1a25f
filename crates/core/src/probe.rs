//! Network Probe - the measurement collaborator behind a speed test.
//!
//! The session only sequences phases and maps progress; how a round-trip or
//! a transfer is actually timed is up to the implementation. The runtime
//! crate ships an HTTP probe and a simulated one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Who and where the client appears to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub ip_address: String,
    pub isp: String,
    pub location: String,
}

impl NetworkInfo {
    pub const UNAVAILABLE_IP: &'static str = "N/A";
    pub const UNKNOWN: &'static str = "Unknown";

    /// Placeholders used when the lookup fails.
    pub fn unavailable() -> Self {
        Self {
            ip_address: Self::UNAVAILABLE_IP.to_string(),
            isp: Self::UNKNOWN.to_string(),
            location: Self::UNKNOWN.to_string(),
        }
    }
}

/// One progress tick from a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub bytes: u64,
    /// Total size when the far end announced one.
    pub total: Option<u64>,
    pub elapsed: Duration,
}

/// Receives transfer ticks while a throughput probe runs.
pub trait ProgressReporter: Send {
    fn report(&mut self, progress: TransferProgress);

    /// Something the user should know about the measurement, such as an
    /// unknown transfer size. Ignored unless overridden.
    fn warn(&mut self, _message: &str) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(TransferProgress) + Send,
{
    fn report(&mut self, progress: TransferProgress) {
        self(progress)
    }
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Short name shown in logs.
    fn name(&self) -> &str;

    /// What latency samples are timed against, announced before pinging.
    fn ping_target(&self) -> Option<String> {
        None
    }

    /// Where the download test file comes from, announced before the download.
    fn download_source(&self) -> Option<String> {
        None
    }

    async fn network_info(&self) -> Result<NetworkInfo, ProbeError>;

    /// Time a single round-trip.
    async fn latency_sample(&self) -> Result<Duration, ProbeError>;

    /// Jitter in milliseconds over `samples` round-trips, `interval` apart.
    ///
    /// The default takes the mean absolute difference between consecutive
    /// successful samples; at least two must succeed.
    async fn measure_jitter(
        &self,
        samples: usize,
        interval: Duration,
    ) -> Result<f64, ProbeError> {
        let mut rtts = Vec::with_capacity(samples);
        let mut last_error = None;
        for i in 0..samples {
            match self.latency_sample().await {
                Ok(rtt) => rtts.push(duration_ms(rtt)),
                Err(e) => last_error = Some(e),
            }
            if i + 1 < samples && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }
        mean_abs_delta(&rtts).ok_or_else(|| {
            last_error.unwrap_or_else(|| {
                ProbeError::Other("not enough samples to compute jitter".to_string())
            })
        })
    }

    /// Download throughput in megabits per second.
    async fn measure_download(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError>;

    /// Upload throughput in megabits per second.
    async fn measure_upload(&self, progress: &mut dyn ProgressReporter)
    -> Result<f64, ProbeError>;
}

pub type DynNetworkProbe = Arc<dyn NetworkProbe>;

pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Mean absolute difference between consecutive values.
pub fn mean_abs_delta(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    Some(total / (values.len() - 1) as f64)
}

/// Megabits per second for `bytes` moved in `elapsed` (1 Mb = 2^20 bits).
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some((bytes as f64 * 8.0) / secs / (1024.0 * 1024.0))
}
