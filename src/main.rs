/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use env_logger::Env;
use log::{error, info, warn};
use sht31tool::sht31::{self, Device};
use sht31tool::transport::{i2c::I2cBus, sim::SimBus, Bus};
use sht31tool::{Error, Result};
use std::{num::ParseIntError, process::ExitCode, thread, time::Duration};

trait FromRadix: Sized {
    fn from_radix(s: &str, radix: u32) -> std::result::Result<Self, ParseIntError>;
}

macro_rules! from_radix {
    ($($t:ty),*) => {
        $(impl FromRadix for $t {
            fn from_radix(s: &str, radix: u32) -> std::result::Result<Self, ParseIntError> {
                <$t>::from_str_radix(s, radix)
            }
        })*
    };
}

from_radix!(u16, u64);

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_number<T: FromRadix>(s: &str) -> Result<T> {
    let parsed = match s.strip_prefix("0x") {
        Some(stripped) => T::from_radix(stripped, 16),
        None => T::from_radix(s, 10),
    };
    parsed.map_err(Error::Parse)
}

fn arg<'m>(matches: &'m clap::ArgMatches, id: &str) -> &'m str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

fn poll(device: &mut Device<'_>, interval: Duration, count: u64, reset_after: u64) -> Result<()> {
    let mut failures = 0;
    let mut n = 0;
    loop {
        let reading = device.get_temp_and_humidity()?;
        match (reading.temperature, reading.humidity) {
            (Some(temperature), Some(humidity)) => {
                failures = 0;
                println!("Temperature: {temperature:.2}°C");
                println!("Relative humidity: {humidity:.2}%");
            }
            _ => {
                failures += 1;
                println!("Failed to read SHT31! Check if sensor is connected.");
                if reset_after != 0 && failures >= reset_after {
                    warn!("{failures} consecutive failures");
                    if let Err(e) = device.reset() {
                        warn!("reset failed: {e}");
                    }
                    failures = 0;
                }
            }
        }

        n += 1;
        if count != 0 && n >= count {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

fn sht31tool() -> Result<()> {
    let matches = clap::command!()
        .arg(
            clap::arg!(-b --bus [BUS] "i2c bus the SHT31 is attached to.")
                .default_value("/dev/i2c-1"),
        )
        .arg(
            clap::arg!(-a --address [ADDRESS] "i2c slave address of the SHT31 (0x44 or 0x45).")
                .default_value("0x44"),
        )
        .arg(clap::arg!(-i --interval [SECONDS] "Seconds between readings.").default_value("1"))
        .arg(
            clap::arg!(-n --count [COUNT] "Number of readings to take, 0 for no limit.")
                .default_value("0"),
        )
        .arg(
            clap::arg!(--"reset-after" [FAILURES] "Reset the sensor after this many failed reads, 0 to never.")
                .default_value("3"),
        )
        .arg(clap::arg!(--simulate "Use a simulated bus instead of hardware."))
        .subcommand(clap::Command::new("read").about("poll temperature and humidity (default)"))
        .subcommand(clap::Command::new("reset").about("send break and soft reset"))
        .subcommand(
            clap::Command::new("heater")
                .about("switch the internal heater")
                .subcommand(clap::Command::new("on").about("enable the heater"))
                .subcommand(clap::Command::new("off").about("disable the heater"))
                .subcommand_required(true),
        )
        .subcommand(clap::Command::new("status").about("print the status register"))
        .subcommand(clap::Command::new("clear-status").about("clear the status register"))
        .get_matches();

    let addr: u16 = parse_number(arg(&matches, "address"))?;
    // I2cBus::new may force-claim the address.
    sht31::check_address(addr)?;
    let interval = Duration::from_secs(parse_number(arg(&matches, "interval"))?);
    let count: u64 = parse_number(arg(&matches, "count"))?;
    let reset_after: u64 = parse_number(arg(&matches, "reset-after"))?;

    let mut bus: Box<dyn Bus> = if matches.get_flag("simulate") {
        info!("Using simulated bus");
        Box::new(SimBus::new())
    } else {
        Box::new(I2cBus::new(arg(&matches, "bus"), addr)?)
    };
    let mut device = Device::new(addr, Some(&mut *bus))?;

    match matches.subcommand() {
        Some(("reset", _)) => device.reset()?,
        Some(("heater", args)) => match args.subcommand() {
            Some(("on", _)) => device.set_heater(true)?,
            Some(("off", _)) => device.set_heater(false)?,
            _ => {}
        },
        Some(("status", _)) => {
            let status = device.read_status()?;
            println!("Status: {status:#06x}");
        }
        Some(("clear-status", _)) => device.clear_status()?,
        _ => {
            info!(
                "Polling SHT31 at {:#x} every {}s",
                device.address(),
                interval.as_secs()
            );
            poll(&mut device, interval, count, reset_after)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match sht31tool() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("sht31tool: {e}");
            if let Error::InvalidAddress(_) = e {
                error!("valid addresses: {:#x?}", sht31::ADDRESSES);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_number::<u16>("0x44").unwrap(), 0x44);
        assert_eq!(parse_number::<u16>("69").unwrap(), 0x45);
        assert_eq!(parse_number::<u64>("0").unwrap(), 0);
        assert!(matches!(parse_number::<u16>("0x10000"), Err(Error::Parse(_))));
        assert!(matches!(parse_number::<u64>("soon"), Err(Error::Parse(_))));
    }

    #[test]
    fn bad_address_fails_before_bus_is_opened() {
        let addr: u16 = parse_number("0xAB").unwrap();
        assert!(matches!(
            sht31::check_address(addr),
            Err(Error::InvalidAddress(0xAB))
        ));
    }
}
