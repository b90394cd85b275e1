/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

#![cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code, unused_imports))]

pub mod sht31;
pub mod transport;

use std::{fmt, io, num::ParseIntError};

#[derive(Debug)]
pub enum ReadFailure {
    Io(io::Error),
    UnexpectedLength(usize),
}

#[derive(Debug)]
pub enum Error {
    InvalidAddress(u16),
    MissingBus,
    Read(ReadFailure),
    FeatureMissing,
    I2C,
    Io(io::Error),
    Parse(ParseIntError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidAddress(addr) => write!(f, "Invalid I2C address: {addr:#x}!"),
            Error::MissingBus => f.write_str("I2C bus not specified!"),
            Error::Read(ReadFailure::Io(e)) => write!(f, "Failed to read data from sensor: {e}"),
            Error::Read(ReadFailure::UnexpectedLength(n)) => {
                write!(f, "Unexpected data length: {n} bytes")
            }
            Error::FeatureMissing => f.write_str("i2c transport is linux-only"),
            Error::I2C => f.write_str("failed to open i2c device"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Parse(e) => write!(f, "invalid number: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read(ReadFailure::Io(e)) | Error::Io(e) => Some(e),
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_address_formats_as_hex() {
        assert_eq!(Error::InvalidAddress(0xAB).to_string(), "Invalid I2C address: 0xab!");
    }

    #[test]
    fn missing_bus_message() {
        assert_eq!(Error::MissingBus.to_string(), "I2C bus not specified!");
    }

    #[test]
    fn read_failure_exposes_io_source() {
        let err = Error::Read(ReadFailure::Io(io::Error::other("nack")));
        assert!(std::error::Error::source(&err).is_some());

        let err = Error::Read(ReadFailure::UnexpectedLength(5));
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(err.to_string(), "Unexpected data length: 5 bytes");
    }
}
