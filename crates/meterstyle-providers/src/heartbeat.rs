//! Heartbeat indicators toggled by the server between requests.

use std::fs;
use std::path::PathBuf;

use tracing::{trace, warn};

/// Something that visibly alternates while the request loop is alive.
pub trait Heartbeat: Send {
    /// Flip the indicator.
    fn toggle(&mut self);

    fn is_on(&self) -> bool;
}

/// Heartbeat that only logs, for hosts without an LED.
#[derive(Debug, Default)]
pub struct LogHeartbeat {
    on: bool,
}

impl LogHeartbeat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Heartbeat for LogHeartbeat {
    fn toggle(&mut self) {
        self.on = !self.on;
        trace!("Heartbeat {}", if self.on { "on" } else { "off" });
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// LED driven through the Linux LED class (`/sys/class/leds/<name>/brightness`).
#[derive(Debug)]
pub struct SysfsLed {
    brightness: PathBuf,
    on: bool,
    failed: bool,
}

impl SysfsLed {
    pub fn new(name: &str) -> Self {
        Self::with_path(PathBuf::from("/sys/class/leds").join(name).join("brightness"))
    }

    /// Drive an explicit brightness file.
    pub fn with_path(brightness: impl Into<PathBuf>) -> Self {
        Self {
            brightness: brightness.into(),
            on: false,
            failed: false,
        }
    }
}

impl Heartbeat for SysfsLed {
    fn toggle(&mut self) {
        self.on = !self.on;
        let level = if self.on { "1" } else { "0" };
        match fs::write(&self.brightness, level) {
            Ok(()) => self.failed = false,
            // Warn once per outage rather than on every tick.
            Err(e) if !self.failed => {
                warn!("Failed to drive LED {}: {}", self.brightness.display(), e);
                self.failed = true;
            }
            Err(_) => {}
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_heartbeat_alternates() {
        let mut heartbeat = LogHeartbeat::new();
        assert!(!heartbeat.is_on());
        heartbeat.toggle();
        assert!(heartbeat.is_on());
        heartbeat.toggle();
        assert!(!heartbeat.is_on());
    }

    #[test]
    fn test_sysfs_led_writes_brightness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brightness");
        let mut led = SysfsLed::with_path(&path);

        led.toggle();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1");
        led.toggle();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0");
    }

    #[test]
    fn test_sysfs_led_missing_device_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut led = SysfsLed::with_path(dir.path().join("absent").join("brightness"));
        led.toggle();
        led.toggle();
        assert!(!led.is_on());
    }
}
