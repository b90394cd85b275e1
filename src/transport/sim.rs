/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::sht31::{crc8, CMD_READSTATUS, RESPONSE_LEN};
use crate::transport::{check_block_len, Bus};
use log::info;
use std::io;

// Alert pending and reset detected, as the sensor reports after power-up.
const STATUS_AFTER_RESET: u16 = 0x8010;

pub struct SimBus {
    temperature: f64,
    humidity: f64,
    last_cmd: Option<u16>,
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            temperature: 21.5,
            humidity: 45.0,
            last_cmd: None,
        }
    }

    pub fn with_reading(mut self, temperature: f64, humidity: f64) -> Self {
        self.temperature = temperature;
        self.humidity = humidity;
        self
    }

    fn frame(&self) -> [u8; RESPONSE_LEN] {
        let t = scale(self.temperature + 45.0, 175.0).to_be_bytes();
        let h = scale(self.humidity, 100.0).to_be_bytes();
        [t[0], t[1], crc8(&t), h[0], h[1], crc8(&h)]
    }

    fn status(&self) -> Vec<u8> {
        let s = STATUS_AFTER_RESET.to_be_bytes();
        vec![s[0], s[1], crc8(&s)]
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

fn scale(value: f64, span: f64) -> u16 {
    (value / span * 65535.0).round().clamp(0.0, 65535.0) as u16
}

impl Bus for SimBus {
    fn write_block(&mut self, address: u16, register: u8, data: &[u8]) -> io::Result<()> {
        check_block_len(data.len())?;
        for d in data {
            info!("Writing {d:#x} to register {register:#x} at address {address:#x}");
        }
        self.last_cmd = match data {
            [lsb] => Some(u16::from_be_bytes([register, *lsb])),
            _ => None,
        };
        Ok(())
    }

    fn read_block(&mut self, _address: u16, _register: u8, len: usize) -> io::Result<Vec<u8>> {
        check_block_len(len)?;
        if self.last_cmd.take() == Some(CMD_READSTATUS) {
            return Ok(self.status().into_iter().take(len).collect());
        }
        Ok(self.frame().iter().copied().cycle().take(len).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sht31::{convert_humidity, convert_temperature};

    #[test]
    fn frame_round_trips_through_conversion() {
        let mut bus = SimBus::new().with_reading(25.0, 60.0);
        let data = bus.read_block(0x44, 0x00, RESPONSE_LEN).unwrap();

        let t = u16::from_be_bytes([data[0], data[1]]);
        let h = u16::from_be_bytes([data[3], data[4]]);
        assert!((convert_temperature(t.into()) - 25.0).abs() < 0.01);
        assert!((convert_humidity(h.into()) - 60.0).abs() < 0.01);
        assert_eq!(data[2], crc8(&data[0..2]));
        assert_eq!(data[5], crc8(&data[3..5]));
    }

    #[test]
    fn status_read_after_status_command() {
        let mut bus = SimBus::new();
        let [reg, lsb] = CMD_READSTATUS.to_be_bytes();
        bus.write_block(0x44, reg, &[lsb]).unwrap();
        let data = bus.read_block(0x44, 0x00, 3).unwrap();
        assert_eq!(&data[..2], &[0x80, 0x10]);
        assert_eq!(data[2], crc8(&data[..2]));

        // the status word is served once, then measurements resume
        let data = bus.read_block(0x44, 0x00, RESPONSE_LEN).unwrap();
        assert_eq!(data, bus.frame());
    }

    #[test]
    fn status_through_device() {
        let mut bus = SimBus::new();
        let mut dev = crate::sht31::Device::new(0x44, Some(&mut bus)).unwrap();
        assert_eq!(dev.read_status().unwrap(), STATUS_AFTER_RESET);
    }

    #[test]
    fn rejects_oversized_blocks() {
        let mut bus = SimBus::new();
        let err = bus.read_block(0x44, 0x00, 33).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(bus.write_block(0x44, 0x30, &[0u8; 32]).is_ok());
    }
}
