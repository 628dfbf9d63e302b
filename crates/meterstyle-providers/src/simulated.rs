//! Simulated power meter for hosts without hardware.
//!
//! Readings follow a fixed, repeating pattern so pages and tests see
//! plausible but predictable values. Energy is a running total that
//! advances on every energy read, the way a real meter integrates load.

use meterstyle_core::{MeterDevice, MeterError, Metric};

const NOMINAL_VOLTAGE: f64 = 230.0;
const NOMINAL_FREQUENCY: f64 = 50.0;
const LOAD_CURRENT: f64 = 0.5;
const POWER_FACTOR: f64 = 0.95;
/// Each energy read accounts for one second at the current load.
const SECONDS_PER_READ: f64 = 1.0;

pub struct SimulatedMeter {
    tick: u64,
    energy_kwh: f64,
    unavailable: Vec<Metric>,
}

impl SimulatedMeter {
    pub fn new() -> Self {
        Self {
            tick: 0,
            energy_kwh: 0.0,
            unavailable: Vec::new(),
        }
    }

    /// Metrics that never deliver a reading.
    pub fn with_unavailable(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.unavailable = metrics.into_iter().collect();
        self
    }

    fn voltage(&self) -> f64 {
        // Swings +/-0.5 V around nominal in 0.1 V steps.
        let offset = (self.tick % 11) as f64 - 5.0;
        round1(NOMINAL_VOLTAGE + offset / 10.0)
    }

    fn power(&self) -> f64 {
        round1(self.voltage() * LOAD_CURRENT * POWER_FACTOR)
    }
}

impl Default for SimulatedMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterDevice for SimulatedMeter {
    fn read(&mut self, metric: Metric) -> Option<f64> {
        if self.unavailable.contains(&metric) {
            return None;
        }
        let value = match metric {
            Metric::Voltage => {
                self.tick += 1;
                self.voltage()
            }
            Metric::Current => LOAD_CURRENT,
            Metric::Power => self.power(),
            Metric::Energy => {
                self.energy_kwh += self.power() * SECONDS_PER_READ / 3_600_000.0;
                self.energy_kwh
            }
            Metric::Frequency => NOMINAL_FREQUENCY,
            Metric::PowerFactor => POWER_FACTOR,
        };
        Some(value)
    }

    fn reset_energy(&mut self) -> Result<(), MeterError> {
        self.energy_kwh = 0.0;
        Ok(())
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
