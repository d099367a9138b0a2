#![cfg_attr(test, allow(dead_code))]

use std::{
    ffi::OsString,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use clap::{Arg, Command, value_parser};
use eh1::delay::DelayNs;
use ftdi_tap::{
    DEFAULT_BAUD_RATE, FtdiBitbang, FtdiError,
    jtag::{self, Device, DeviceKind, IdcodeCheck, JtagPort, JtagTap},
};

const USAGE: &str = "USAGE: jtagex [NUMBER]\nWhere NUMBER is an FTDI interface number";

/// Interface number from the command line, `None` for anything but a single
/// optional non-negative integer.
fn parse_index<I, T>(args: I) -> Option<usize>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Command::new("jtagex")
        .about("Check the IDCODE of a CoolRunner-II and flash LEDs through EXTEST")
        .arg(
            Arg::new("number")
                .value_name("NUMBER")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .try_get_matches_from(args)
        .ok()?
        .get_one::<usize>("number")
        .copied()
}

/// Cycle the LEDs until `running` is cleared or a step fails. Returns the
/// number of pins exercised.
fn flash_leds<P: JtagPort, D: DelayNs>(
    tap: &mut JtagTap<P, D>,
    device: &Device,
    running: &AtomicBool,
) -> Result<usize, FtdiError> {
    let mut steps = 0;
    for step in jtag::exercise_pins(tap, device) {
        let pin = step?;
        log::debug!("Pin {pin} high");
        steps += 1;
        if !running.load(Ordering::SeqCst) {
            break;
        }
    }
    Ok(steps)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let Some(index) = parse_index(std::env::args_os()) else {
        println!("{USAGE}");
        return Ok(());
    };

    let port = match FtdiBitbang::open_by_index(index, DEFAULT_BAUD_RATE) {
        Ok(port) => port,
        Err(e) => {
            println!("ERROR: Can not open FTDI interface #{index}");
            log::error!("{e}");
            return Ok(());
        }
    };
    println!(
        "Using {:?} Interface::{:?} at {DEFAULT_BAUD_RATE} baud",
        port.chip_type(),
        port.interface()
    );

    let kind = DeviceKind::Xc2c64aVq44;
    let device = kind.descriptor();
    device.validate()?;
    let mut tap = JtagTap::new(port);

    match jtag::verify_idcode(&mut tap, device) {
        Ok(IdcodeCheck::Match(id)) => println!("IDCODE Match: 0x{id:08X} ({})", kind.name()),
        Ok(IdcodeCheck::Mismatch { expected, observed }) => {
            println!("ERROR: IDCODE Mismatch!");
            println!("  expected 0x{expected:08X}, read 0x{observed:08X}");
            if let Some(other) = DeviceKind::from_idcode(observed) {
                println!("  the connected part looks like {}", other.name());
            }
            return Ok(());
        }
        Err(e) => {
            println!("ERROR: {e}");
            return Ok(());
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    println!("Flashing LEDs...");
    println!("Press Ctrl-C to stop");
    if let Err(e) = flash_leds(&mut tap, device, &running) {
        println!("ERROR: {e}");
        return Ok(());
    }

    match tap.reset() {
        Ok(()) => println!("Stopped, TAP reset"),
        Err(e) => println!("ERROR: {e}"),
    }
    Ok(())
}
