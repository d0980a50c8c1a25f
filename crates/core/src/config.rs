//! termspeed configuration
//!
//! Loaded from a YAML file, then overridden by `TERMSPEED_*` environment
//! variables. Every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_MAX_HISTORY: usize = 1000;
pub const DEFAULT_CONFIG_FILE: &str = "termspeed.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermspeedConfig {
    #[serde(default)]
    pub repl: ReplConfig,

    #[serde(default)]
    pub speedtest: SpeedTestConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    /// Where logs go while the full-screen UI owns the terminal
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("termspeed.log")
}

/// Terminal session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,

    #[serde(default = "default_max_history")]
    pub max_history: usize,

    #[serde(default = "default_banner")]
    pub banner: String,
}

fn default_prompt() -> String {
    "root@internet-speedtest:~$".to_string()
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_banner() -> String {
    "Terminal Speed Test v1.0.0".to_string()
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            max_history: default_max_history(),
            banner: default_banner(),
        }
    }
}

/// Speed test session tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestConfig {
    /// Round-trips averaged into the latency figure
    #[serde(default = "default_latency_samples")]
    pub latency_samples: usize,

    /// Pause between latency samples (ms)
    #[serde(default = "default_sample_delay_ms")]
    pub sample_delay_ms: u64,

    /// Round-trips used for the jitter figure
    #[serde(default = "default_jitter_samples")]
    pub jitter_samples: usize,

    /// Progress rate while a transfer size is unknown (percent per second)
    #[serde(default = "default_unknown_size_rate")]
    pub unknown_size_rate: f64,
}

fn default_latency_samples() -> usize {
    5
}

fn default_sample_delay_ms() -> u64 {
    100
}

fn default_jitter_samples() -> usize {
    5
}

fn default_unknown_size_rate() -> f64 {
    5.0
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            latency_samples: default_latency_samples(),
            sample_delay_ms: default_sample_delay_ms(),
            jitter_samples: default_jitter_samples(),
            unknown_size_rate: default_unknown_size_rate(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Http,
    Simulated,
}

impl ProbeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "real" => Some(Self::Http),
            "simulated" | "sim" | "mock" => Some(Self::Simulated),
            _ => None,
        }
    }
}

/// Network probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_kind")]
    pub kind: ProbeKind,

    /// JSON endpoint returning `query`, `isp`, `city`, `regionName`, `country`
    #[serde(default = "default_ip_info_url")]
    pub ip_info_url: String,

    /// Endpoint timed for latency round-trips
    #[serde(default = "default_ping_url")]
    pub ping_url: String,

    #[serde(default = "default_download_url")]
    pub download_url: String,

    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Payload size for the upload test
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: usize,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seed for the simulated probe
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Make the simulated probe fail every measurement
    #[serde(default)]
    pub simulate_offline: bool,
}

fn default_probe_kind() -> ProbeKind {
    ProbeKind::Simulated
}

fn default_ip_info_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_ping_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_download_url() -> String {
    "https://speed.cloudflare.com/__down?bytes=10000000".to_string()
}

fn default_upload_url() -> String {
    "https://speed.cloudflare.com/__up".to_string()
}

fn default_upload_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_timeout() -> u64 {
    30
}

fn default_seed() -> u64 {
    0x5eed
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            kind: default_probe_kind(),
            ip_info_url: default_ip_info_url(),
            ping_url: default_ping_url(),
            download_url: default_download_url(),
            upload_url: default_upload_url(),
            upload_bytes: default_upload_bytes(),
            timeout: default_timeout(),
            seed: default_seed(),
            simulate_offline: false,
        }
    }
}

impl TermspeedConfig {
    /// Load `path`, or `./termspeed.yaml` when present, or defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(kind) = std::env::var("TERMSPEED_PROBE")
            .ok()
            .and_then(|v| ProbeKind::parse(&v))
        {
            self.probe.kind = kind;
        }
        if let Ok(prompt) = std::env::var("TERMSPEED_PROMPT")
            && !prompt.trim().is_empty()
        {
            self.repl.prompt = prompt;
        }
        if let Some(n) = env_usize("TERMSPEED_MAX_HISTORY") {
            self.repl.max_history = n;
        }
        if let Some(n) = env_usize("TERMSPEED_LATENCY_SAMPLES") {
            self.speedtest.latency_samples = n;
        }
        if let Some(n) = env_usize("TERMSPEED_JITTER_SAMPLES") {
            self.speedtest.jitter_samples = n;
        }
        if let Some(ms) = env_usize("TERMSPEED_SAMPLE_DELAY_MS") {
            self.speedtest.sample_delay_ms = ms as u64;
        }
        if let Ok(url) = std::env::var("TERMSPEED_DOWNLOAD_URL") {
            self.probe.download_url = url;
        }
        if let Ok(url) = std::env::var("TERMSPEED_UPLOAD_URL") {
            self.probe.upload_url = url;
        }
        if let Some(offline) = env_bool("TERMSPEED_SIMULATE_OFFLINE") {
            self.probe.simulate_offline = offline;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speedtest.latency_samples == 0 {
            return Err(ConfigError::Invalid(
                "speedtest.latency_samples must be at least 1".to_string(),
            ));
        }
        if !self.speedtest.unknown_size_rate.is_finite() || self.speedtest.unknown_size_rate <= 0.0
        {
            return Err(ConfigError::Invalid(
                "speedtest.unknown_size_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?.to_lowercase();
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::with_env_overrides;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TermspeedConfig::default();
        assert_eq!(config.repl.prompt, "root@internet-speedtest:~$");
        assert_eq!(config.repl.max_history, 1000);
        assert_eq!(config.speedtest.latency_samples, 5);
        assert_eq!(config.speedtest.sample_delay_ms, 100);
        assert_eq!(config.probe.kind, ProbeKind::Simulated);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "speedtest:\n  latency_samples: 3\nprobe:\n  kind: http\n";
        let config = TermspeedConfig::from_yaml_str(yaml).expect("valid yaml");
        assert_eq!(config.speedtest.latency_samples, 3);
        assert_eq!(config.speedtest.jitter_samples, 5);
        assert_eq!(config.probe.kind, ProbeKind::Http);
        assert_eq!(config.repl.max_history, DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = TermspeedConfig::from_yaml_str("   \n").expect("empty is fine");
        assert_eq!(config.speedtest.latency_samples, 5);
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "repl:\n  prompt: \"tst$\"\nspeedtest:\n  latency_samples: 2").unwrap();
        with_env_overrides(
            &[
                ("TERMSPEED_PROBE", Some("http")),
                ("TERMSPEED_LATENCY_SAMPLES", Some("7")),
                ("TERMSPEED_PROMPT", None),
                ("TERMSPEED_MAX_HISTORY", None),
                ("TERMSPEED_JITTER_SAMPLES", None),
                ("TERMSPEED_SAMPLE_DELAY_MS", None),
                ("TERMSPEED_DOWNLOAD_URL", None),
                ("TERMSPEED_UPLOAD_URL", None),
                ("TERMSPEED_SIMULATE_OFFLINE", Some("yes")),
            ],
            || {
                let config = TermspeedConfig::load(Some(file.path())).expect("load");
                assert_eq!(config.repl.prompt, "tst$");
                assert_eq!(config.speedtest.latency_samples, 7);
                assert_eq!(config.probe.kind, ProbeKind::Http);
                assert!(config.probe.simulate_offline);
            },
        );
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = TermspeedConfig::load(Some(Path::new("/nonexistent/termspeed.yaml")))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "speedtest: [1, 2").unwrap();
        let err = TermspeedConfig::from_file(file.path()).expect_err("bad yaml");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_latency_samples_rejected() {
        let mut config = TermspeedConfig::default();
        config.speedtest.latency_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_bool_values() {
        with_env_overrides(&[("TERMSPEED_TEST_FLAG", Some("on"))], || {
            assert_eq!(env_bool("TERMSPEED_TEST_FLAG"), Some(true));
        });
        with_env_overrides(&[("TERMSPEED_TEST_FLAG", Some("maybe"))], || {
            assert_eq!(env_bool("TERMSPEED_TEST_FLAG"), None);
        });
    }

    #[test]
    fn test_probe_kind_parse() {
        assert_eq!(ProbeKind::parse("HTTP"), Some(ProbeKind::Http));
        assert_eq!(ProbeKind::parse("sim"), Some(ProbeKind::Simulated));
        assert_eq!(ProbeKind::parse("carrier-pigeon"), None);
    }
}
