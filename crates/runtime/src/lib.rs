//! termspeed Runtime - network probes
//!
//! - HttpProbe: real endpoints over reqwest
//! - SimulatedProbe: seeded fake link for demos and tests
//!
//! `build_probe` picks one from the probe config.

mod http;
mod simulated;

use std::sync::Arc;

use tracing::info;

use termspeed_core::{DynNetworkProbe, ProbeConfig, ProbeError, ProbeKind};

pub use http::HttpProbe;
pub use simulated::{SimulatedLink, SimulatedProbe};

pub fn build_probe(config: &ProbeConfig) -> Result<DynNetworkProbe, ProbeError> {
    let probe: DynNetworkProbe = match config.kind {
        ProbeKind::Http => Arc::new(HttpProbe::new(config.clone())?),
        ProbeKind::Simulated => Arc::new(SimulatedProbe::from_config(config)),
    };
    info!(probe = probe.name(), "network probe ready");
    Ok(probe)
}
