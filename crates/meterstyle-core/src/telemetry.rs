//! Telemetry assembly.
//!
//! Each snapshot polls the meter once per metric, in a fixed order, and
//! keeps only the readings the meter could deliver. Nothing is retried,
//! averaged or remembered between snapshots.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

/// The metrics a power meter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Voltage,
    Current,
    Power,
    Energy,
    Frequency,
    PowerFactor,
}

impl Metric {
    /// Every metric, in evaluation order.
    pub const ALL: [Metric; 6] = [
        Metric::Voltage,
        Metric::Current,
        Metric::Power,
        Metric::Energy,
        Metric::Frequency,
        Metric::PowerFactor,
    ];

    /// Key used in the telemetry document.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Voltage => "voltage",
            Metric::Current => "current",
            Metric::Power => "power",
            Metric::Energy => "energy",
            Metric::Frequency => "frequency",
            Metric::PowerFactor => "pf",
        }
    }

    /// Unit of the raw reading, empty for the dimensionless power factor.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Voltage => "V",
            Metric::Current => "A",
            Metric::Power => "W",
            Metric::Energy => "kWh",
            Metric::Frequency => "Hz",
            Metric::PowerFactor => "",
        }
    }

    /// Look a metric up by its document key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A power meter that can be read one metric at a time.
///
/// A read blocks until the device answers. `None` means the reading is
/// unavailable for this poll (disconnected sensor, bad checksum, value out
/// of the device's range).
pub trait MeterDevice: Send {
    fn read(&mut self, metric: Metric) -> Option<f64>;

    /// Zero the device's cumulative energy counter.
    fn reset_energy(&mut self) -> Result<(), MeterError> {
        Err(MeterError::Unsupported)
    }
}

/// Errors from meter operations other than reads.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The device does not implement the operation.
    #[error("Operation not supported by this meter")]
    Unsupported,

    /// The device failed to carry out the operation.
    #[error("Meter device error: {0}")]
    Device(String),
}

/// Point-in-time readings. Absent metrics are left out of the serialized
/// document entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,

    #[serde(rename = "pf", skip_serializing_if = "Option::is_none")]
    pub power_factor: Option<f64>,
}

impl TelemetrySnapshot {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        *self.slot(metric)
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        *self.slot_mut(metric) = value;
    }

    /// Present readings in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|m| self.get(m).map(|v| (m, v)))
    }

    /// Number of present readings.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, metric: Metric) -> &Option<f64> {
        match metric {
            Metric::Voltage => &self.voltage,
            Metric::Current => &self.current,
            Metric::Power => &self.power,
            Metric::Energy => &self.energy,
            Metric::Frequency => &self.frequency,
            Metric::PowerFactor => &self.power_factor,
        }
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Voltage => &mut self.voltage,
            Metric::Current => &mut self.current,
            Metric::Power => &mut self.power,
            Metric::Energy => &mut self.energy,
            Metric::Frequency => &mut self.frequency,
            Metric::PowerFactor => &mut self.power_factor,
        }
    }
}

/// Builds telemetry snapshots from a meter device.
pub struct TelemetryAssembler;

impl TelemetryAssembler {
    /// Poll every metric once and keep the valid readings.
    ///
    /// A reading is valid when the device returned one and it is a finite
    /// number. Values are passed through without conversion or clamping.
    pub fn snapshot<M: MeterDevice + ?Sized>(device: &mut M) -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::default();
        for metric in Metric::ALL {
            let reading = device.read(metric).filter(|v| v.is_finite());
            match reading {
                Some(v) => trace!("Meter reading {} = {} {}", metric, v, metric.unit()),
                None => debug!("Meter reading for {} unavailable", metric),
            }
            snapshot.set(metric, reading);
        }
        snapshot
    }
}
