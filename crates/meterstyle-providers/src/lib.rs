//! # meterstyle-providers
//!
//! Hardware behind the portal:
//! - PZEM-004T v3.0 power meter over Modbus-RTU
//! - A simulated meter for hosts without one
//! - Heartbeat indicators (log only, or a sysfs LED)

pub mod heartbeat;
pub mod pzem;
pub mod simulated;

pub use heartbeat::{Heartbeat, LogHeartbeat, SysfsLed};
pub use pzem::{Pzem, PzemError, Readings};
pub use simulated::SimulatedMeter;

use meterstyle_core::{MeterDevice, MeterSettings, Metric};
use tracing::{info, warn};

/// Build the meter described by the settings.
pub fn build_meter(settings: &MeterSettings) -> std::io::Result<Box<dyn MeterDevice>> {
    match settings {
        MeterSettings::Simulated { unavailable } => {
            let metrics: Vec<Metric> = unavailable
                .iter()
                .filter_map(|key| {
                    let metric = Metric::from_key(key);
                    if metric.is_none() {
                        warn!("Ignoring unknown metric '{}' in meter settings", key);
                    }
                    metric
                })
                .collect();
            info!("Using simulated meter");
            Ok(Box::new(SimulatedMeter::new().with_unavailable(metrics)))
        }
        MeterSettings::Pzem { port, address } => {
            let pzem = Pzem::open(port, *address)?;
            info!("Using PZEM-004T at {} (address {:#04x})", port, pzem.address());
            Ok(Box::new(pzem))
        }
    }
}

/// Build the heartbeat indicator: a sysfs LED when one is named, log-only otherwise.
pub fn build_heartbeat(led: Option<&str>) -> Box<dyn Heartbeat> {
    match led {
        Some(name) => Box::new(SysfsLed::new(name)),
        None => Box::new(LogHeartbeat::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterstyle_core::TelemetryAssembler;

    #[test]
    fn test_build_simulated_meter() {
        let settings = MeterSettings::Simulated {
            unavailable: vec!["pf".to_string(), "bogus".to_string()],
        };
        let mut meter = build_meter(&settings).unwrap();
        let snapshot = TelemetryAssembler::snapshot(&mut *meter);
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.power_factor, None);
    }

    #[test]
    fn test_build_pzem_missing_port_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MeterSettings::Pzem {
            port: dir.path().join("ttyUSB9").display().to_string(),
            address: 0x01,
        };
        assert!(build_meter(&settings).is_err());
    }
}
