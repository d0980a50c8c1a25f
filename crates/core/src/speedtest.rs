//! Speed Test Session - sequences the probe phases of one speed test.
//!
//! Phases run strictly one after another: network info, latency, jitter,
//! then the enabled throughput tests. A failing phase is recorded as an
//! unavailable metric and the session moves on, so every run ends with
//! exactly one [`SpeedTestResult`] and exactly one progress update of 100.
//!
//! The session never touches terminal state directly. Everything it has to
//! say goes out as [`SessionEvent`]s over a channel, in the order it happened.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::SpeedTestConfig;
use crate::error::ProbeError;
use crate::output::{OutputRecord, highlight};
use crate::probe::{DynNetworkProbe, NetworkInfo, ProgressReporter, TransferProgress, duration_ms};

/// Progress owned by network info, latency and jitter, in that order.
pub const NETWORK_INFO_RANGE: PhaseRange = PhaseRange::new(0.0, 10.0);
pub const LATENCY_RANGE: PhaseRange = PhaseRange::new(10.0, 20.0);
pub const JITTER_RANGE: PhaseRange = PhaseRange::new(20.0, 30.0);
/// Shared equally by whichever throughput tests are enabled.
pub const THROUGHPUT_RANGE: PhaseRange = PhaseRange::new(30.0, 95.0);
pub const COMPLETE_PCT: f64 = 100.0;

/// Which throughput phases a run includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedTestOptions {
    pub download: bool,
    pub upload: bool,
}

impl Default for SpeedTestOptions {
    fn default() -> Self {
        Self {
            download: true,
            upload: true,
        }
    }
}

impl SpeedTestOptions {
    /// `--download` and `--upload` select phases, `--full` or no flag selects
    /// both. Anything else is ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut download = false;
        let mut upload = false;
        let mut full = false;
        for arg in args {
            match arg.as_ref().to_ascii_lowercase().as_str() {
                "--download" => download = true,
                "--upload" => upload = true,
                "--full" => full = true,
                other => debug!(flag = other, "ignoring unknown speedtest flag"),
            }
        }
        if full || (!download && !upload) {
            return Self::default();
        }
        Self { download, upload }
    }
}

/// A measurement phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NetworkInfo,
    Latency,
    Jitter,
    Download,
    Upload,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::NetworkInfo => "network info",
            Self::Latency => "latency",
            Self::Jitter => "jitter",
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

/// Where the session state machine currently is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionPhase {
    Init,
    FetchingNetworkInfo,
    MeasuringLatency,
    MeasuringJitter,
    TestingDownload,
    TestingUpload,
    Complete,
    Failed { phase: Phase, reason: String },
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "initializing",
            Self::FetchingNetworkInfo => "fetching network info",
            Self::MeasuringLatency => "measuring latency",
            Self::MeasuringJitter => "measuring jitter",
            Self::TestingDownload => "testing download",
            Self::TestingUpload => "testing upload",
            Self::Complete => "complete",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A measured value or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    Value(f64),
    /// The probe failed.
    Unavailable,
    /// The phase was not selected.
    NotTested,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    fn from_probe(result: &Result<f64, ProbeError>) -> Self {
        match result {
            Ok(v) if v.is_finite() && *v >= 0.0 => Self::Value(*v),
            _ => Self::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestResult {
    pub download_mbps: Metric,
    pub upload_mbps: Metric,
    pub latency_ms: Metric,
    pub jitter_ms: Metric,
    pub ip_address: String,
    pub isp: String,
    pub location: String,
    pub timestamp: DateTime<Local>,
}

/// Everything a running session reports, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Phase(SessionPhase),
    Output(OutputRecord),
    Progress(f64),
    Finished(Box<SpeedTestResult>),
}

/// `[start, end)` slice of overall progress owned by one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseRange {
    pub start: f64,
    pub end: f64,
}

impl PhaseRange {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Position `fraction` (clamped to `[0, 1]`) of the way through the range.
    pub fn at(&self, fraction: f64) -> f64 {
        self.start + self.width() * fraction.clamp(0.0, 1.0)
    }

    /// Split into `parts` equal consecutive ranges.
    pub fn split(&self, parts: usize) -> Vec<PhaseRange> {
        let parts = parts.max(1);
        let step = self.width() / parts as f64;
        (0..parts)
            .map(|i| {
                let start = self.start + step * i as f64;
                let end = if i + 1 == parts { self.end } else { start + step };
                PhaseRange::new(start, end)
            })
            .collect()
    }
}

/// Keeps overall progress monotonic and publishes each increase.
#[derive(Debug)]
pub struct ProgressTracker {
    current: f64,
    events: UnboundedSender<SessionEvent>,
}

impl ProgressTracker {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            current: 0.0,
            events,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Move to `pct` if that is forward; backward requests are ignored.
    pub fn advance(&mut self, pct: f64) {
        if !pct.is_finite() {
            return;
        }
        let pct = pct.clamp(0.0, COMPLETE_PCT);
        if pct > self.current {
            self.current = pct;
            let _ = self.events.send(SessionEvent::Progress(pct));
        }
    }
}

/// Maps transfer ticks from a throughput probe into its phase's range.
struct PhaseProgress<'a> {
    tracker: &'a mut ProgressTracker,
    range: PhaseRange,
    unknown_size_rate: f64,
}

impl PhaseProgress<'_> {
    fn pct_for(&self, progress: &TransferProgress) -> f64 {
        match progress.total {
            Some(total) if total > 0 => self.range.at(progress.bytes as f64 / total as f64),
            _ => {
                let estimated =
                    self.range.start + progress.elapsed.as_secs_f64() * self.unknown_size_rate;
                estimated.min(self.range.end)
            }
        }
    }
}

impl ProgressReporter for PhaseProgress<'_> {
    fn report(&mut self, progress: TransferProgress) {
        let pct = self.pct_for(&progress);
        self.tracker.advance(pct);
    }

    fn warn(&mut self, message: &str) {
        let record = OutputRecord::plain(format!("Warning: {}", message));
        let _ = self.tracker.events.send(SessionEvent::Output(record));
    }
}

pub struct SpeedTestSession {
    probe: DynNetworkProbe,
    options: SpeedTestOptions,
    config: SpeedTestConfig,
    events: UnboundedSender<SessionEvent>,
    tracker: ProgressTracker,
    phase: SessionPhase,
    attempted: usize,
    last_failure: Option<(Phase, String)>,
    failures: usize,
}

impl SpeedTestSession {
    pub fn new(
        probe: DynNetworkProbe,
        options: SpeedTestOptions,
        config: SpeedTestConfig,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            probe,
            options,
            config,
            tracker: ProgressTracker::new(events.clone()),
            events,
            phase: SessionPhase::Init,
            attempted: 0,
            last_failure: None,
            failures: 0,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Run every phase to the end and return the result that was also sent
    /// as [`SessionEvent::Finished`].
    pub async fn run(mut self) -> SpeedTestResult {
        info!(
            probe = self.probe.name(),
            download = self.options.download,
            upload = self.options.upload,
            "speed test started"
        );
        self.emit(OutputRecord::plain("Initializing speed test..."));

        let info = self.fetch_network_info().await;
        let latency_ms = self.measure_latency().await;
        let jitter_ms = self.measure_jitter().await;

        let mut enabled = Vec::new();
        if self.options.download {
            enabled.push(Phase::Download);
        }
        if self.options.upload {
            enabled.push(Phase::Upload);
        }
        let ranges = THROUGHPUT_RANGE.split(enabled.len());
        let mut download_mbps = Metric::NotTested;
        let mut upload_mbps = Metric::NotTested;
        for (phase, range) in enabled.into_iter().zip(ranges) {
            let metric = self.measure_throughput(phase, range).await;
            match phase {
                Phase::Download => download_mbps = metric,
                _ => upload_mbps = metric,
            }
        }
        self.tracker.advance(THROUGHPUT_RANGE.end);

        let result = SpeedTestResult {
            download_mbps,
            upload_mbps,
            latency_ms,
            jitter_ms,
            ip_address: info.ip_address,
            isp: info.isp,
            location: info.location,
            timestamp: Local::now(),
        };

        let terminal = match self.last_failure.take() {
            Some((phase, reason)) if self.failures == self.attempted => {
                SessionPhase::Failed { phase, reason }
            }
            _ => SessionPhase::Complete,
        };
        info!(
            failures = self.failures,
            attempted = self.attempted,
            state = terminal.label(),
            "speed test finished"
        );
        self.enter(terminal);
        self.tracker.advance(COMPLETE_PCT);
        let _ = self
            .events
            .send(SessionEvent::Finished(Box::new(result.clone())));
        result
    }

    async fn fetch_network_info(&mut self) -> NetworkInfo {
        self.enter(SessionPhase::FetchingNetworkInfo);
        self.attempted += 1;
        self.emit(OutputRecord::plain("Fetching network information..."));
        let info = match self.probe.network_info().await {
            Ok(info) => info,
            Err(e) => {
                self.record_failure(Phase::NetworkInfo, &e);
                self.emit(OutputRecord::plain("Could not fetch IP information."));
                NetworkInfo::unavailable()
            }
        };
        self.emit(OutputRecord::plain(format!(
            "IP: {}, ISP: {}, Location: {}",
            info.ip_address, info.isp, info.location
        )));
        self.tracker.advance(NETWORK_INFO_RANGE.end);
        info
    }

    async fn measure_latency(&mut self) -> Metric {
        self.enter(SessionPhase::MeasuringLatency);
        self.attempted += 1;
        self.emit(OutputRecord::plain("Measuring latency..."));
        if let Some(target) = self.probe.ping_target() {
            self.emit(OutputRecord::plain(format!("Pinging {}...", target)));
        }

        let samples = self.config.latency_samples.max(1);
        let delay = Duration::from_millis(self.config.sample_delay_ms);
        let mut total_ms = 0.0;
        let mut successes = 0usize;
        let mut last_error = None;
        for i in 0..samples {
            match self.probe.latency_sample().await {
                Ok(rtt) => {
                    let ms = duration_ms(rtt);
                    total_ms += ms;
                    successes += 1;
                    self.emit(OutputRecord::plain(format!("Ping reply time={:.0} ms", ms)));
                }
                Err(e) => {
                    debug!(sample = i + 1, error = %e, "latency sample failed");
                    self.emit(OutputRecord::plain(format!("Ping sample {} failed.", i + 1)));
                    last_error = Some(e);
                }
            }
            self.tracker
                .advance(LATENCY_RANGE.at((i + 1) as f64 / samples as f64));
            if i + 1 < samples && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let metric = if successes > 0 {
            let avg = total_ms / successes as f64;
            self.emit(OutputRecord::markup(format!(
                "Latency: {}",
                highlight(format!("{:.0} ms", avg))
            )));
            Metric::Value(avg)
        } else {
            let e = last_error
                .unwrap_or_else(|| ProbeError::Other("no latency samples".to_string()));
            self.record_failure(Phase::Latency, &e);
            self.emit(OutputRecord::plain("Latency Test Failed."));
            Metric::Unavailable
        };
        self.tracker.advance(LATENCY_RANGE.end);
        metric
    }

    async fn measure_jitter(&mut self) -> Metric {
        self.enter(SessionPhase::MeasuringJitter);
        self.attempted += 1;
        self.emit(OutputRecord::plain("Measuring jitter..."));
        let interval = Duration::from_millis(self.config.sample_delay_ms);
        let result = self
            .probe
            .measure_jitter(self.config.jitter_samples, interval)
            .await;
        let metric = Metric::from_probe(&result);
        match (metric, result) {
            (Metric::Value(ms), _) => self.emit(OutputRecord::markup(format!(
                "Jitter: {}",
                highlight(format!("{:.1} ms", ms))
            ))),
            (_, Err(e)) => {
                self.record_failure(Phase::Jitter, &e);
                self.emit(OutputRecord::plain("Jitter Test Failed."));
            }
            (_, Ok(v)) => {
                self.record_failure(Phase::Jitter, &invalid_value(v));
                self.emit(OutputRecord::plain("Jitter Test Failed."));
            }
        }
        self.tracker.advance(JITTER_RANGE.end);
        metric
    }

    async fn measure_throughput(&mut self, phase: Phase, range: PhaseRange) -> Metric {
        let (state, heading, label) = match phase {
            Phase::Download => (
                SessionPhase::TestingDownload,
                "Testing download speed...",
                "Download",
            ),
            _ => (
                SessionPhase::TestingUpload,
                "Testing upload speed...",
                "Upload",
            ),
        };
        self.enter(state);
        self.attempted += 1;
        self.emit(OutputRecord::plain(heading));
        if phase == Phase::Download
            && let Some(source) = self.probe.download_source()
        {
            self.emit(OutputRecord::plain(format!(
                "Downloading test file from {}...",
                source
            )));
        }
        self.tracker.advance(range.start);

        let probe = self.probe.clone();
        let result = {
            let mut reporter = PhaseProgress {
                tracker: &mut self.tracker,
                range,
                unknown_size_rate: self.config.unknown_size_rate,
            };
            match phase {
                Phase::Download => probe.measure_download(&mut reporter).await,
                _ => probe.measure_upload(&mut reporter).await,
            }
        };

        let metric = Metric::from_probe(&result);
        match (metric, result) {
            (Metric::Value(mbps), _) => self.emit(OutputRecord::markup(format!(
                "{} speed: {}",
                label,
                highlight(format!("{:.2} Mbps", mbps))
            ))),
            (_, Err(e)) => {
                self.record_failure(phase, &e);
                self.emit(OutputRecord::plain(format!("{} test failed: {}", label, e)));
            }
            (_, Ok(v)) => {
                let e = invalid_value(v);
                self.record_failure(phase, &e);
                self.emit(OutputRecord::plain(format!("{} test failed: {}", label, e)));
            }
        }
        self.tracker.advance(range.end);
        metric
    }

    fn record_failure(&mut self, phase: Phase, error: &ProbeError) {
        warn!(phase = phase.label(), error = %error, "probe failed");
        self.failures += 1;
        self.last_failure = Some((phase, error.to_string()));
    }

    fn enter(&mut self, phase: SessionPhase) {
        debug!(from = self.phase.label(), to = phase.label(), "session phase");
        self.phase = phase.clone();
        let _ = self.events.send(SessionEvent::Phase(phase));
    }

    fn emit(&self, record: OutputRecord) {
        let _ = self.events.send(SessionEvent::Output(record));
    }
}

fn invalid_value(v: f64) -> ProbeError {
    ProbeError::Other(format!("probe returned an invalid value: {}", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::NetworkProbe;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Probe double whose every answer is scripted.
    #[derive(Default)]
    struct ScriptedProbe {
        fail_info: bool,
        fail_latency: bool,
        fail_jitter: bool,
        fail_download: bool,
        fail_upload: bool,
        unknown_size: bool,
        announce: bool,
        download_calls: AtomicUsize,
        upload_calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn failing_everything() -> Self {
            Self {
                fail_info: true,
                fail_latency: true,
                fail_jitter: true,
                fail_download: true,
                fail_upload: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl NetworkProbe for ScriptedProbe {
        fn name(&self) -> &str {
            "scripted"
        }

        fn ping_target(&self) -> Option<String> {
            self.announce.then(|| "https://ping.example/json".to_string())
        }

        fn download_source(&self) -> Option<String> {
            self.announce
                .then(|| "https://files.example/10MB.bin".to_string())
        }

        async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
            if self.fail_info {
                return Err(ProbeError::Network("dns failure".to_string()));
            }
            Ok(NetworkInfo {
                ip_address: "203.0.113.7".to_string(),
                isp: "Example ISP".to_string(),
                location: "Springfield".to_string(),
            })
        }

        async fn latency_sample(&self) -> Result<Duration, ProbeError> {
            if self.fail_latency {
                return Err(ProbeError::Timeout(1000));
            }
            Ok(Duration::from_millis(20))
        }

        async fn measure_jitter(
            &self,
            _samples: usize,
            _interval: Duration,
        ) -> Result<f64, ProbeError> {
            if self.fail_jitter {
                return Err(ProbeError::Timeout(1000));
            }
            Ok(2.5)
        }

        async fn measure_download(
            &self,
            progress: &mut dyn ProgressReporter,
        ) -> Result<f64, ProbeError> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_download {
                return Err(ProbeError::Http { status: 404 });
            }
            if self.unknown_size {
                progress.warn(UNKNOWN_SIZE_WARNING);
            }
            for step in 1..=4u64 {
                progress.report(TransferProgress {
                    bytes: step * 250,
                    total: (!self.unknown_size).then_some(1000),
                    elapsed: Duration::from_secs(step),
                });
            }
            Ok(93.4)
        }

        async fn measure_upload(
            &self,
            progress: &mut dyn ProgressReporter,
        ) -> Result<f64, ProbeError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload {
                return Err(ProbeError::Network("reset".to_string()));
            }
            progress.report(TransferProgress {
                bytes: 500,
                total: Some(1000),
                elapsed: Duration::from_millis(500),
            });
            Ok(11.0)
        }
    }

    const UNKNOWN_SIZE_WARNING: &str =
        "Content-Length header missing or invalid. Progress/Speed might be inaccurate.";

    async fn run_with(
        probe: Arc<ScriptedProbe>,
        options: SpeedTestOptions,
    ) -> (SpeedTestResult, Vec<SessionEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = SpeedTestConfig {
            latency_samples: 3,
            ..Default::default()
        };
        let result = SpeedTestSession::new(probe, options, config, tx).run().await;
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        (result, events)
    }

    fn progress_values(events: &[SessionEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn output_lines(events: &[SessionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Output(r) => Some(r.to_plain_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_options_from_args() {
        assert_eq!(
            SpeedTestOptions::from_args::<&str>(&[]),
            SpeedTestOptions::default()
        );
        assert_eq!(
            SpeedTestOptions::from_args(&["--download"]),
            SpeedTestOptions {
                download: true,
                upload: false
            }
        );
        assert_eq!(
            SpeedTestOptions::from_args(&["--UPLOAD", "--bogus"]),
            SpeedTestOptions {
                download: false,
                upload: true
            }
        );
        assert_eq!(
            SpeedTestOptions::from_args(&["--download", "--full"]),
            SpeedTestOptions::default()
        );
        assert_eq!(
            SpeedTestOptions::from_args(&["--verbose"]),
            SpeedTestOptions::default()
        );
    }

    #[test]
    fn test_phase_range_split() {
        let parts = THROUGHPUT_RANGE.split(2);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].start, 30.0);
        assert_eq!(parts[1].end, 95.0);
        assert_eq!(parts[0].end, parts[1].start);
        assert_eq!(THROUGHPUT_RANGE.split(1), vec![THROUGHPUT_RANGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_run_measures_everything() {
        let probe = Arc::new(ScriptedProbe::default());
        let (result, events) = run_with(probe, SpeedTestOptions::default()).await;

        assert_eq!(result.latency_ms, Metric::Value(20.0));
        assert_eq!(result.jitter_ms, Metric::Value(2.5));
        assert_eq!(result.download_mbps, Metric::Value(93.4));
        assert_eq!(result.upload_mbps, Metric::Value(11.0));
        assert_eq!(result.ip_address, "203.0.113.7");

        let lines = output_lines(&events);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Ping reply")).count(), 3);
        assert!(lines.contains(&"Download speed: 93.40 Mbps".to_string()));
        assert!(events.contains(&SessionEvent::Phase(SessionPhase::Complete)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_probe_failing_still_finishes() {
        let probe = Arc::new(ScriptedProbe::failing_everything());
        let (result, events) = run_with(probe, SpeedTestOptions::default()).await;

        assert_eq!(result.latency_ms, Metric::Unavailable);
        assert_eq!(result.jitter_ms, Metric::Unavailable);
        assert_eq!(result.download_mbps, Metric::Unavailable);
        assert_eq!(result.upload_mbps, Metric::Unavailable);

        let progress = progress_values(&events);
        assert_eq!(progress.last(), Some(&100.0));
        assert_eq!(progress.iter().filter(|p| **p == 100.0).count(), 1);

        let finished = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
        assert!(matches!(events.last(), Some(SessionEvent::Finished(_))));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Phase(SessionPhase::Failed {
                phase: Phase::Upload,
                ..
            })
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic() {
        for probe in [
            ScriptedProbe::default(),
            ScriptedProbe::failing_everything(),
            ScriptedProbe {
                unknown_size: true,
                ..Default::default()
            },
        ] {
            let (_, events) = run_with(Arc::new(probe), SpeedTestOptions::default()).await;
            let progress = progress_values(&events);
            assert!(!progress.is_empty());
            assert!(
                progress.windows(2).all(|w| w[0] <= w[1]),
                "non-monotonic progress: {:?}",
                progress
            );
            assert_eq!(progress.last(), Some(&100.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_only_skips_upload() {
        let probe = Arc::new(ScriptedProbe::default());
        let options = SpeedTestOptions::from_args(&["--download"]);
        let (result, _) = run_with(probe.clone(), options).await;

        assert_eq!(result.download_mbps, Metric::Value(93.4));
        assert_eq!(result.upload_mbps, Metric::NotTested);
        assert_eq!(probe.upload_calls.load(Ordering::SeqCst), 0);
        assert_eq!(probe.download_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_info_failure_uses_placeholders() {
        let probe = Arc::new(ScriptedProbe {
            fail_info: true,
            ..Default::default()
        });
        let (result, events) = run_with(probe.clone(), SpeedTestOptions::default()).await;

        assert_eq!(result.ip_address, "N/A");
        assert_eq!(result.isp, "Unknown");
        assert_eq!(result.location, "Unknown");
        assert_eq!(result.latency_ms, Metric::Value(20.0));
        assert_eq!(probe.download_calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe.upload_calls.load(Ordering::SeqCst), 1);
        assert!(output_lines(&events).contains(&"Could not fetch IP information.".to_string()));
        // One phase failing is not a failed session.
        assert!(events.contains(&SessionEvent::Phase(SessionPhase::Complete)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_byte_progress_maps_into_phase_range() {
        let probe = Arc::new(ScriptedProbe::default());
        let options = SpeedTestOptions::from_args(&["--download"]);
        let (_, events) = run_with(probe, options).await;
        let progress = progress_values(&events);
        // Download owns the whole throughput range: 250/1000 bytes -> 46.25.
        assert!(progress.contains(&46.25));
        assert!(progress.contains(&95.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_announces_ping_target_and_download_source() {
        let probe = Arc::new(ScriptedProbe {
            announce: true,
            ..Default::default()
        });
        let (_, events) = run_with(probe, SpeedTestOptions::default()).await;
        let lines = output_lines(&events);
        let at = |line: &str| lines.iter().position(|l| l == line);

        let measuring = at("Measuring latency...").unwrap();
        let pinging = at("Pinging https://ping.example/json...").unwrap();
        let first_reply = lines
            .iter()
            .position(|l| l.starts_with("Ping reply"))
            .unwrap();
        assert!(measuring < pinging && pinging < first_reply);

        let heading = at("Testing download speed...").unwrap();
        let source = at("Downloading test file from https://files.example/10MB.bin...").unwrap();
        assert_eq!(source, heading + 1);
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.starts_with("Downloading test file"))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_announcements_without_targets() {
        let (_, events) =
            run_with(Arc::new(ScriptedProbe::default()), SpeedTestOptions::default()).await;
        let lines = output_lines(&events);
        assert!(!lines.iter().any(|l| l.starts_with("Pinging")));
        assert!(!lines.iter().any(|l| l.starts_with("Downloading test file")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_warning_shown_to_user() {
        let probe = Arc::new(ScriptedProbe {
            unknown_size: true,
            ..Default::default()
        });
        let options = SpeedTestOptions::from_args(&["--download"]);
        let (_, events) = run_with(probe, options).await;
        let lines = output_lines(&events);
        let warning = format!("Warning: {}", UNKNOWN_SIZE_WARNING);
        let at = |line: &str| lines.iter().position(|l| l == line);
        let heading = at("Testing download speed...").unwrap();
        let warned = at(&warning).unwrap();
        let speed = at("Download speed: 93.40 Mbps").unwrap();
        assert!(heading < warned && warned < speed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_size_progress_stays_inside_range() {
        let probe = Arc::new(ScriptedProbe {
            unknown_size: true,
            ..Default::default()
        });
        let options = SpeedTestOptions::from_args(&["--download"]);
        let (_, events) = run_with(probe, options).await;
        let progress = progress_values(&events);
        // 1s at 5%/s from 30 -> 35; 4s -> 50.
        assert!(progress.contains(&35.0));
        assert!(progress.contains(&50.0));
        assert!(progress.iter().all(|p| *p <= 95.0 || *p == 100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_partial_failures_average_successes() {
        struct Flaky(AtomicUsize);

        #[async_trait]
        impl NetworkProbe for Flaky {
            fn name(&self) -> &str {
                "flaky"
            }
            async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
                Err(ProbeError::Unsupported)
            }
            async fn latency_sample(&self) -> Result<Duration, ProbeError> {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 1 {
                    Err(ProbeError::Timeout(5))
                } else {
                    Ok(Duration::from_millis(10 * (n as u64 + 1)))
                }
            }
            async fn measure_download(
                &self,
                _progress: &mut dyn ProgressReporter,
            ) -> Result<f64, ProbeError> {
                Err(ProbeError::Unsupported)
            }
            async fn measure_upload(
                &self,
                _progress: &mut dyn ProgressReporter,
            ) -> Result<f64, ProbeError> {
                Err(ProbeError::Unsupported)
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = SpeedTestConfig {
            latency_samples: 3,
            jitter_samples: 4,
            ..Default::default()
        };
        let probe = Arc::new(Flaky(AtomicUsize::new(0)));
        let result = SpeedTestSession::new(probe, SpeedTestOptions::default(), config, tx)
            .run()
            .await;
        // Samples 0 and 2 succeed with 10 ms and 30 ms.
        assert_eq!(result.latency_ms, Metric::Value(20.0));
        // Jitter via the default trait method: calls 4 and 6 succeed with 50 and 70 ms.
        assert_eq!(result.jitter_ms, Metric::Value(20.0));
        let mut lines = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let SessionEvent::Output(r) = ev {
                lines.push(r.to_plain_string());
            }
        }
        assert!(lines.contains(&"Ping sample 2 failed.".to_string()));
    }
}
