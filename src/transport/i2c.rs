/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::transport::{check_block_len, Bus};
use crate::{Error, Result};
use std::io;

#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cdev::{core::I2CDevice, linux::LinuxI2CDevice};

#[cfg(any(target_os = "linux", target_os = "android"))]
pub struct I2cBus {
    dev: LinuxI2CDevice,
    addr: u16,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn open_i2c(bus: &str, addr: u16) -> Result<LinuxI2CDevice> {
    if let Ok(dev) = LinuxI2CDevice::new(bus, addr) {
        return Ok(dev);
    }
    log::info!("Safely opening failed ==> Forcefully opening device...");
    unsafe { LinuxI2CDevice::force_new(bus, addr) }.map_err(|_| Error::I2C)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl I2cBus {
    pub fn new(bus: &str, addr: u16) -> Result<Self> {
        Ok(Self {
            dev: open_i2c(bus, addr)?,
            addr,
        })
    }

    fn select(&mut self, addr: u16) -> io::Result<()> {
        if addr != self.addr {
            self.dev.set_slave_address(addr).map_err(io::Error::other)?;
            self.addr = addr;
        }
        Ok(())
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl Bus for I2cBus {
    fn write_block(&mut self, address: u16, register: u8, data: &[u8]) -> io::Result<()> {
        check_block_len(data.len())?;
        self.select(address)?;
        self.dev
            .smbus_write_i2c_block_data(register, data)
            .map_err(io::Error::other)
    }

    fn read_block(&mut self, address: u16, register: u8, len: usize) -> io::Result<Vec<u8>> {
        check_block_len(len)?;
        self.select(address)?;
        self.dev
            .smbus_read_i2c_block_data(register, len as u8)
            .map_err(io::Error::other)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub struct I2cBus;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl I2cBus {
    pub fn new(_bus: &str, _addr: u16) -> Result<Self> {
        Err(Error::FeatureMissing)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl Bus for I2cBus {
    fn write_block(&mut self, _address: u16, _register: u8, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "i2c transport is linux-only"))
    }

    fn read_block(&mut self, _address: u16, _register: u8, _len: usize) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "i2c transport is linux-only"))
    }
}
