/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::transport::Bus;
use crate::{Error, ReadFailure, Result};
use crc::{Crc, CRC_8_NRSC_5};
use log::{debug, info, warn};
use std::{thread, time::Duration};

pub const ADDRESS_DEFAULT: u16 = 0x44;
pub const ADDRESS_ALT: u16 = 0x45;
pub const ADDRESSES: [u16; 2] = [ADDRESS_DEFAULT, ADDRESS_ALT];

pub const RESPONSE_LEN: usize = 6;
const STATUS_LEN: usize = 3;
const DATA_REG: u8 = 0x00;

pub const MIN_TEMPERATURE: f64 = -45.0;
pub const MAX_TEMPERATURE: f64 = 130.0;
const TEMPERATURE_RANGE: f64 = MAX_TEMPERATURE - MIN_TEMPERATURE;
const RAW_MAX: f64 = 65535.0;

pub const CMD_SOFTRESET: u16 = 0x30A2;
pub const CMD_BREAK: u16 = 0x3093;
pub const CMD_HEATER_ON: u16 = 0x306D;
pub const CMD_HEATER_OFF: u16 = 0x3066;
pub const CMD_READSTATUS: u16 = 0xF32D;
pub const CMD_CLEARSTATUS: u16 = 0x3041;

const SETUP_WAIT: Duration = Duration::from_millis(500);
const BREAK_WAIT: Duration = Duration::from_millis(1);
const SOFTRESET_WAIT: Duration = Duration::from_micros(1500);

/// Measurement precision; higher repeatability takes longer to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeatability {
    High,
    Medium,
    Low,
}

const SINGLE_SHOT_COMMANDS: [(Repeatability, bool, u16); 6] = [
    (Repeatability::High, true, 0x2C06),
    (Repeatability::Medium, true, 0x2C0D),
    (Repeatability::Low, true, 0x2C10),
    (Repeatability::High, false, 0x2400),
    (Repeatability::Medium, false, 0x240B),
    (Repeatability::Low, false, 0x2416),
];

/// Looks up the single-shot measurement command for a repeatability and
/// clock stretching pair.
pub fn single_shot_command(repeatability: Repeatability, clock_stretching: bool) -> Option<u16> {
    SINGLE_SHOT_COMMANDS
        .iter()
        .find(|(rep, stretch, _)| *rep == repeatability && *stretch == clock_stretching)
        .map(|(_, _, cmd)| *cmd)
}

/// Undecoded measurement words as they came off the bus.
///
/// The CRC bytes are carried along but never checked; see [`crc8`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub temperature: u16,
    pub temperature_crc: u8,
    pub humidity: u16,
    pub humidity_crc: u8,
}

impl RawReading {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != RESPONSE_LEN {
            return Err(Error::Read(ReadFailure::UnexpectedLength(data.len())));
        }
        Ok(Self {
            temperature: u16::from_be_bytes([data[0], data[1]]),
            temperature_crc: data[2],
            humidity: u16::from_be_bytes([data[3], data[4]]),
            humidity_crc: data[5],
        })
    }
}

/// Temperature in °C and relative humidity in %. `None` means the sensor
/// could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<RawReading> for Reading {
    fn from(raw: RawReading) -> Self {
        Self {
            temperature: Some(convert_temperature(raw.temperature.into())),
            humidity: Some(convert_humidity(raw.humidity.into())),
        }
    }
}

fn clamp_raw(raw: i64) -> f64 {
    raw.clamp(0, 0xFFFF) as f64
}

/// T = -45 + 175 * raw / (2^16 - 1), out of range input saturates.
pub fn convert_temperature(raw: i64) -> f64 {
    MIN_TEMPERATURE + TEMPERATURE_RANGE * clamp_raw(raw) / RAW_MAX
}

/// RH = 100 * raw / (2^16 - 1), out of range input saturates.
pub fn convert_humidity(raw: i64) -> f64 {
    100.0 * clamp_raw(raw) / RAW_MAX
}

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

pub fn check_address(address: u16) -> Result<()> {
    if !ADDRESSES.contains(&address) {
        return Err(Error::InvalidAddress(address));
    }
    Ok(())
}

pub struct Device<'a> {
    bus: &'a mut dyn Bus,
    address: u16,
    repeatability: Repeatability,
    clock_stretching: bool,
    initialized: bool,
}

impl<'a> Device<'a> {
    pub fn new(address: u16, bus: Option<&'a mut dyn Bus>) -> Result<Self> {
        check_address(address)?;
        let bus = bus.ok_or(Error::MissingBus)?;

        Ok(Self {
            bus,
            address,
            repeatability: Repeatability::High,
            clock_stretching: true,
            initialized: false,
        })
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn command(&mut self, cmd: u16) -> Result<()> {
        let [reg, data] = cmd.to_be_bytes();
        debug!("{:#x}: command {cmd:#06x}", self.address);
        self.bus
            .write_block(self.address, reg, &[data])
            .map_err(Error::Io)
    }

    fn read_block(&mut self, len: usize) -> Result<Vec<u8>> {
        let data = self
            .bus
            .read_block(self.address, DATA_REG, len)
            .map_err(|e| Error::Read(ReadFailure::Io(e)))?;
        if data.len() != len {
            return Err(Error::Read(ReadFailure::UnexpectedLength(data.len())));
        }
        debug!("{:#x}: read {data:02x?}", self.address);
        Ok(data)
    }

    pub fn send_measurement_cmd(&mut self) -> Result<()> {
        match single_shot_command(self.repeatability, self.clock_stretching) {
            Some(cmd) => self.command(cmd),
            None => {
                debug!(
                    "no single-shot command for {:?}, stretching {}",
                    self.repeatability, self.clock_stretching
                );
                Ok(())
            }
        }
    }

    /// Issues the measurement command and waits for conversion, once.
    pub fn setup(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.send_measurement_cmd()?;
        thread::sleep(SETUP_WAIT);
        self.initialized = true;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        info!("Resetting sensor at {:#x}...", self.address);
        self.command(CMD_BREAK)?;
        thread::sleep(BREAK_WAIT);
        self.command(CMD_SOFTRESET)?;
        thread::sleep(SOFTRESET_WAIT);
        Ok(())
    }

    pub fn set_heater(&mut self, on: bool) -> Result<()> {
        info!("Turning heater {}", if on { "on" } else { "off" });
        self.command(if on { CMD_HEATER_ON } else { CMD_HEATER_OFF })
    }

    /// Reads the 16-bit status register. The trailing CRC byte is dropped.
    pub fn read_status(&mut self) -> Result<u16> {
        self.command(CMD_READSTATUS)?;
        let data = self.read_block(STATUS_LEN)?;
        Ok(u16::from_be_bytes([data[0], data[1]]))
    }

    pub fn clear_status(&mut self) -> Result<()> {
        self.command(CMD_CLEARSTATUS)
    }

    pub fn read_raw(&mut self) -> Result<RawReading> {
        let data = self.read_block(RESPONSE_LEN)?;
        RawReading::from_bytes(&data)
    }

    /// Reads temperature and humidity.
    ///
    /// Failing to read the measurement is not an error: both values come
    /// back as `None` so a polling caller can carry on. Only a failed setup
    /// command is returned as `Err`.
    pub fn get_temp_and_humidity(&mut self) -> Result<Reading> {
        self.setup()?;

        match self.read_raw() {
            Ok(raw) => Ok(raw.into()),
            Err(e) => {
                warn!("{:#x}: {e}", self.address);
                Ok(Reading::default())
            }
        }
    }
}
