//! PZEM-004T v3.0 power meter over Modbus-RTU.
//!
//! The meter answers a single "read input registers" request with all ten
//! measurement registers at once:
//!
//! | Register | Value                          |
//! |----------|--------------------------------|
//! | 0        | voltage, 0.1 V                 |
//! | 1-2      | current, 0.001 A (low word first) |
//! | 3-4      | power, 0.1 W (low word first)  |
//! | 5-6      | energy, 1 Wh (low word first)  |
//! | 7        | frequency, 0.1 Hz              |
//! | 8        | power factor, 0.01             |
//! | 9        | alarm status                   |
//!
//! The serial line (9600 baud, 8N1) must be configured before the port is
//! handed to the driver. Reads block until the meter answers.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use meterstyle_core::{MeterDevice, MeterError, Metric};
use thiserror::Error;
use tracing::{debug, warn};

/// Modbus general address, answered by whichever single meter is on the bus.
pub const GENERAL_ADDRESS: u8 = 0xF8;

/// Readings younger than this are served from cache.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(200);

const CMD_READ_INPUT_REGISTERS: u8 = 0x04;
const CMD_RESET_ENERGY: u8 = 0x42;
const EXCEPTION_FLAG: u8 = 0x80;
const REGISTER_COUNT: u16 = 10;
const DATA_LEN: usize = REGISTER_COUNT as usize * 2;

/// Errors talking to the meter.
#[derive(Debug, Error)]
pub enum PzemError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Reply ended early")]
    ShortFrame,

    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    Crc { expected: u16, actual: u16 },

    #[error("Meter returned exception code {0:#04x}")]
    Exception(u8),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// CRC-16/MODBUS: reflected polynomial 0xA001, initial value 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Append the CRC to a frame, low byte first.
fn push_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Check the trailing CRC of a complete frame.
fn check_crc(frame: &[u8]) -> Result<(), PzemError> {
    let (body, tail) = frame.split_at(frame.len() - 2);
    let expected = crc16(body);
    let actual = u16::from_le_bytes([tail[0], tail[1]]);
    if expected == actual {
        Ok(())
    } else {
        Err(PzemError::Crc { expected, actual })
    }
}

/// Build the request reading every measurement register.
pub fn read_request(address: u8) -> Vec<u8> {
    let mut frame = vec![address, CMD_READ_INPUT_REGISTERS];
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&REGISTER_COUNT.to_be_bytes());
    push_crc(&mut frame);
    frame
}

/// Build the energy counter reset request.
pub fn reset_request(address: u8) -> Vec<u8> {
    let mut frame = vec![address, CMD_RESET_ENERGY];
    push_crc(&mut frame);
    frame
}

/// One decoded register block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    /// Volts.
    pub voltage: f64,
    /// Amperes.
    pub current: f64,
    /// Watts.
    pub power: f64,
    /// Kilowatt-hours.
    pub energy: f64,
    /// Hertz.
    pub frequency: f64,
    pub power_factor: f64,
    /// Power alarm threshold exceeded.
    pub alarm: bool,
}

impl Readings {
    /// Decode the 20 data bytes of a register reply.
    pub fn from_registers(data: &[u8; DATA_LEN]) -> Self {
        let reg = |i: usize| u32::from(u16::from_be_bytes([data[i * 2], data[i * 2 + 1]]));
        let pair = |i: usize| reg(i) | (reg(i + 1) << 16);

        Self {
            voltage: f64::from(reg(0)) / 10.0,
            current: f64::from(pair(1)) / 1000.0,
            power: f64::from(pair(3)) / 10.0,
            energy: f64::from(pair(5)) / 1000.0,
            frequency: f64::from(reg(7)) / 10.0,
            power_factor: f64::from(reg(8)) / 100.0,
            alarm: reg(9) != 0,
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Voltage => self.voltage,
            Metric::Current => self.current,
            Metric::Power => self.power,
            Metric::Energy => self.energy,
            Metric::Frequency => self.frequency,
            Metric::PowerFactor => self.power_factor,
        }
    }
}

/// Driver for one PZEM-004T on a serial transport.
pub struct Pzem<T> {
    transport: T,
    address: u8,
    update_interval: Duration,
    last_poll: Option<(Instant, Option<Readings>)>,
}

impl Pzem<File> {
    /// Open a serial device node for reading and writing.
    pub fn open(path: impl AsRef<Path>, address: u8) -> io::Result<Self> {
        let port = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(port, address))
    }
}

impl<T: Read + Write> Pzem<T> {
    pub fn new(transport: T, address: u8) -> Self {
        Self {
            transport,
            address,
            update_interval: UPDATE_INTERVAL,
            last_poll: None,
        }
    }

    /// Change how long a poll outcome is reused.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one bus transaction and decode the register block.
    pub fn poll(&mut self) -> Result<Readings, PzemError> {
        self.transport.write_all(&read_request(self.address))?;
        self.transport.flush()?;

        let mut header = [0u8; 3];
        self.receive(&mut header)?;
        self.check_address(header[0])?;

        if header[1] == CMD_READ_INPUT_REGISTERS | EXCEPTION_FLAG {
            let mut crc = [0u8; 2];
            self.receive(&mut crc)?;
            check_crc(&[header[0], header[1], header[2], crc[0], crc[1]])?;
            return Err(PzemError::Exception(header[2]));
        }
        if header[1] != CMD_READ_INPUT_REGISTERS {
            return Err(PzemError::UnexpectedReply(format!(
                "function {:#04x}",
                header[1]
            )));
        }
        if usize::from(header[2]) != DATA_LEN {
            return Err(PzemError::UnexpectedReply(format!(
                "{} data bytes",
                header[2]
            )));
        }

        let mut rest = [0u8; DATA_LEN + 2];
        self.receive(&mut rest)?;
        let mut frame = header.to_vec();
        frame.extend_from_slice(&rest);
        check_crc(&frame)?;

        let mut data = [0u8; DATA_LEN];
        data.copy_from_slice(&rest[..DATA_LEN]);
        Ok(Readings::from_registers(&data))
    }

    /// Readings for the current update window.
    ///
    /// The outcome of a poll, success or failure, is reused until the
    /// window expires so one snapshot costs one bus transaction.
    pub fn readings(&mut self) -> Option<Readings> {
        if let Some((at, outcome)) = self.last_poll {
            if at.elapsed() < self.update_interval {
                return outcome;
            }
        }

        let outcome = match self.poll() {
            Ok(readings) => {
                debug!("PZEM {:#04x} polled: {:?}", self.address, readings);
                if readings.alarm {
                    warn!("PZEM {:#04x} power alarm active", self.address);
                }
                Some(readings)
            }
            Err(e) => {
                warn!("PZEM {:#04x} poll failed: {}", self.address, e);
                None
            }
        };
        self.last_poll = Some((Instant::now(), outcome));
        outcome
    }

    /// Zero the meter's energy counter.
    pub fn reset_energy(&mut self) -> Result<(), PzemError> {
        let request = reset_request(self.address);
        self.transport.write_all(&request)?;
        self.transport.flush()?;
        self.last_poll = None;

        let mut header = [0u8; 2];
        self.receive(&mut header)?;
        self.check_address(header[0])?;

        match header[1] {
            CMD_RESET_ENERGY => {
                let mut crc = [0u8; 2];
                self.receive(&mut crc)?;
                check_crc(&[header[0], header[1], crc[0], crc[1]])
            }
            code if code == CMD_RESET_ENERGY | EXCEPTION_FLAG => {
                let mut tail = [0u8; 3];
                self.receive(&mut tail)?;
                check_crc(&[header[0], header[1], tail[0], tail[1], tail[2]])?;
                Err(PzemError::Exception(tail[0]))
            }
            other => Err(PzemError::UnexpectedReply(format!("function {:#04x}", other))),
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(), PzemError> {
        self.transport.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PzemError::ShortFrame,
            _ => PzemError::Io(e),
        })
    }

    // A meter addressed through the general address replies with its own.
    fn check_address(&self, reply: u8) -> Result<(), PzemError> {
        if self.address == GENERAL_ADDRESS || reply == self.address {
            Ok(())
        } else {
            Err(PzemError::UnexpectedReply(format!(
                "address {:#04x}, expected {:#04x}",
                reply, self.address
            )))
        }
    }
}

impl<T: Read + Write + Send> MeterDevice for Pzem<T> {
    fn read(&mut self, metric: Metric) -> Option<f64> {
        self.readings().map(|r| r.get(metric))
    }

    fn reset_energy(&mut self) -> Result<(), MeterError> {
        Pzem::reset_energy(self).map_err(|e| MeterError::Device(e.to_string()))
    }
}
