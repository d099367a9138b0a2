use eh1::delay::DelayNs;

use super::{JtagPort, PinState};
use crate::FtdiError;
use crate::delay::{StdDelay, Timing, wait};

/// Any state to Test-Logic-Reset, then Run-Test/Idle.
pub const RESET: [bool; 6] = [true, true, true, true, true, false];
/// Run-Test/Idle to Shift-IR.
pub const IDLE_TO_SHIFT_IR: [bool; 4] = [true, true, false, false];
/// Run-Test/Idle to Shift-DR.
pub const IDLE_TO_SHIFT_DR: [bool; 3] = [true, false, false];
/// Exit1-IR through Update-IR and Select-DR-Scan into Shift-DR.
pub const IR_EXIT_TO_SHIFT_DR: [bool; 4] = [true, true, false, false];
/// Shift-DR through Exit1-DR and Update-DR back to Run-Test/Idle.
pub const SHIFT_DR_TO_IDLE: [bool; 3] = [true, true, false];
/// Exit1-IR through Update-IR back to Run-Test/Idle.
pub const EXIT1_IR_TO_IDLE: [bool; 2] = [true, false];

/// An exclusive JTAG session on one bit-banged port.
///
/// The session keeps a copy of the output lines so that changing one line
/// rewrites the others unchanged. Every operation blocks until the port has
/// accepted the write; there are no retries.
pub struct JtagTap<P, D = StdDelay> {
    port: P,
    delay: D,
    timing: Timing,
    pins: PinState,
}

impl<P: JtagPort> JtagTap<P, StdDelay> {
    /// Session with the default 1ms half-period, sleeping on the current thread.
    pub fn new(port: P) -> Self {
        Self::with_delay(port, StdDelay, Timing::default())
    }
}

impl<P: JtagPort, D: DelayNs> JtagTap<P, D> {
    pub fn with_delay(port: P, delay: D, timing: Timing) -> Self {
        Self {
            port,
            delay,
            timing,
            pins: PinState::new(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Output lines as last written.
    pub fn pins(&self) -> PinState {
        self.pins
    }

    #[cfg(test)]
    pub(crate) fn delay(&self) -> &D {
        &self.delay
    }

    fn set(&mut self, pins: PinState) -> Result<(), FtdiError> {
        let written = self.port.write_pins(pins)?;
        if written != 1 {
            return Err(FtdiError::ShortWrite {
                written,
                expected: 1,
            });
        }
        self.pins = pins;
        Ok(())
    }

    pub fn set_tdi(&mut self, level: bool) -> Result<(), FtdiError> {
        self.set(self.pins.with_tdi(level))
    }

    pub fn set_tms(&mut self, level: bool) -> Result<(), FtdiError> {
        self.set(self.pins.with_tms(level))
    }

    /// One TCK cycle: raise, hold, lower, hold.
    ///
    /// The TAP samples TMS and TDI on the rising edge.
    pub fn clock(&mut self) -> Result<(), FtdiError> {
        self.set(self.pins.with_tck(true))?;
        wait(&mut self.delay, self.timing.half_period);
        self.set(self.pins.with_tck(false))?;
        wait(&mut self.delay, self.timing.half_period);
        Ok(())
    }

    /// Set TMS and clock once, advancing the TAP by exactly one transition.
    pub fn pulse(&mut self, tms: bool) -> Result<(), FtdiError> {
        self.set_tms(tms)?;
        self.clock()
    }

    pub fn tms_sequence(&mut self, tms: &[bool]) -> Result<(), FtdiError> {
        log::trace!("TMS {:?}", tms.iter().map(|&b| b as u8).collect::<Vec<_>>());
        for &level in tms {
            self.pulse(level)?;
        }
        Ok(())
    }

    /// Force Test-Logic-Reset and settle in Run-Test/Idle.
    pub fn reset(&mut self) -> Result<(), FtdiError> {
        log::debug!("TAP reset");
        self.tms_sequence(&RESET)
    }

    /// Shift the low `width` bits of `value` into the current register, LSB
    /// first.
    ///
    /// Must be called in Shift-IR or Shift-DR. TMS is raised together with
    /// the last bit, so the TAP ends in Exit1-IR or Exit1-DR.
    pub fn shift_out(&mut self, value: u32, width: usize) -> Result<(), FtdiError> {
        debug_assert!((1..=32).contains(&width), "width {width} out of range");
        for i in 0..width {
            self.set_tdi((value >> i) & 1 == 1)?;
            self.pulse(i == width - 1)?;
        }
        Ok(())
    }

    /// Read `width` bits out of the current register, LSB first, shifting in
    /// zeros.
    ///
    /// TDO is sampled before each clock. With `exit_on_last` TMS is raised on
    /// the final clock (ending in Exit1), otherwise the TAP stays in Shift.
    pub fn shift_in(&mut self, width: usize, exit_on_last: bool) -> Result<u32, FtdiError> {
        debug_assert!((1..=32).contains(&width), "width {width} out of range");
        let mut value = 0u32;
        for i in 0..width {
            let bit = self.port.read_pins()?.tdo();
            log::trace!("TDO[{i}] = {}", bit as u8);
            value |= (bit as u32) << i;
            self.set_tdi(false)?;
            self.pulse(exit_on_last && i == width - 1)?;
        }
        Ok(value)
    }

    /// Fill a `length` bit data register with zeros except for position
    /// `pin`, which is held high for two clocks.
    ///
    /// TMS is left low throughout, so the TAP is still in Shift-DR afterwards
    /// and `length + 1` clocks have been issued when `pin < length`.
    pub fn shift_boundary_pattern(&mut self, length: usize, pin: usize) -> Result<(), FtdiError> {
        self.set_tdi(false)?;
        for i in 0..length {
            if i == pin {
                self.set_tdi(true)?;
                self.clock()?;
                self.clock()?;
                self.set_tdi(false)?;
            } else {
                self.clock()?;
            }
        }
        Ok(())
    }

    /// Hold the current state for the settle interval.
    pub fn settle(&mut self) {
        wait(&mut self.delay, self.timing.settle);
    }
}
