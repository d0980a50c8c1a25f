//! Simulated probe - plausible numbers without touching the network
//!
//! Timings come from a seeded xorshift generator so two runs with the same
//! seed produce the same figures. Delays go through `tokio::time`, so tests
//! with a paused clock finish instantly.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use termspeed_core::{
    NetworkInfo, NetworkProbe, ProbeConfig, ProbeError, ProgressReporter, TransferProgress,
    throughput_mbps,
};

const TRANSFER_STEPS: u64 = 20;

/// xorshift64; good enough for jittering fake measurements.
#[derive(Debug, Clone)]
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[center - spread, center + spread)`.
    fn around(&mut self, center: f64, spread: f64) -> f64 {
        center + (self.next_f64() * 2.0 - 1.0) * spread
    }
}

/// Shape of the simulated link.
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    pub latency_ms: f64,
    pub latency_spread_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub transfer_bytes: u64,
    /// Report no transfer size, as a server without Content-Length would.
    pub hide_total: bool,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self {
            latency_ms: 24.0,
            latency_spread_ms: 6.0,
            download_mbps: 92.0,
            upload_mbps: 18.0,
            transfer_bytes: 8 * 1024 * 1024,
            hide_total: false,
        }
    }
}

pub struct SimulatedProbe {
    rng: Mutex<XorShift64>,
    link: SimulatedLink,
    offline: bool,
}

impl SimulatedProbe {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(XorShift64::new(seed)),
            link: SimulatedLink::default(),
            offline: false,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.seed).offline(config.simulate_offline)
    }

    pub fn with_link(mut self, link: SimulatedLink) -> Self {
        self.link = link;
        self
    }

    /// Every measurement fails with a network error.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn around(&self, center: f64, spread: f64) -> f64 {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.around(center, spread)
    }

    fn check_online(&self) -> Result<(), ProbeError> {
        if self.offline {
            return Err(ProbeError::Network("simulated link is offline".to_string()));
        }
        Ok(())
    }

    async fn transfer(
        &self,
        mbps: f64,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError> {
        self.check_online()?;
        let rate = self.around(mbps, mbps * 0.1).max(0.1);
        let total = self.link.transfer_bytes.max(TRANSFER_STEPS);
        let seconds = (total as f64 * 8.0) / (rate * 1024.0 * 1024.0);
        let step_delay = Duration::from_secs_f64(seconds / TRANSFER_STEPS as f64);
        let reported_total = (!self.link.hide_total).then_some(total);

        let start = Instant::now();
        for step in 1..=TRANSFER_STEPS {
            tokio::time::sleep(step_delay).await;
            progress.report(TransferProgress {
                bytes: total * step / TRANSFER_STEPS,
                total: reported_total,
                elapsed: start.elapsed(),
            });
        }
        throughput_mbps(total, start.elapsed())
            .ok_or_else(|| ProbeError::Other("transfer finished in zero time".to_string()))
    }
}

#[async_trait]
impl NetworkProbe for SimulatedProbe {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        self.check_online()?;
        Ok(NetworkInfo {
            ip_address: "203.0.113.42".to_string(),
            isp: "Simulated Broadband".to_string(),
            location: "Localhost, Loopback".to_string(),
        })
    }

    async fn latency_sample(&self) -> Result<Duration, ProbeError> {
        let ms = self
            .around(self.link.latency_ms, self.link.latency_spread_ms)
            .max(1.0);
        let rtt = Duration::from_micros((ms * 1000.0) as u64);
        tokio::time::sleep(rtt).await;
        self.check_online()?;
        debug!(rtt_ms = ms, "simulated ping");
        Ok(rtt)
    }

    async fn measure_download(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError> {
        self.transfer(self.link.download_mbps, progress).await
    }

    async fn measure_upload(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<f64, ProbeError> {
        self.transfer(self.link.upload_mbps, progress).await
    }
}
