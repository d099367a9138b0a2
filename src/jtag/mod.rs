//! JTAG TAP access over four bit-banged lines.
//!
//! [`JtagTap`] owns a [`JtagPort`] and walks the TAP controller open-loop:
//! it never reads the state back, it only emits TMS sequences that are known
//! to be correct from Run-Test/Idle. [`JtagTap::reset`] makes that starting
//! point true regardless of history.
//!
//! The routines built on top of it are [`verify_idcode`] and
//! [`exercise_pins`], both parameterized by a [`Device`] descriptor.
mod device;
mod extest;
mod idcode;
#[cfg(test)]
pub(crate) mod mock;
mod tap;

pub use device::{Device, DeviceError, DeviceKind, XC2C32A_VQ44, XC2C64A_VQ44};
pub use extest::{PinCycle, exercise_pins};
pub use idcode::{IdcodeCheck, read_idcode, verify_idcode};
pub use tap::{
    EXIT1_IR_TO_IDLE, IDLE_TO_SHIFT_DR, IDLE_TO_SHIFT_IR, IR_EXIT_TO_SHIFT_DR, JtagTap, RESET,
    SHIFT_DR_TO_IDLE,
};

use crate::FtdiError;

/// Level of the four JTAG lines packed the way the adapter sees them.
///
/// TDO is the only input; the remaining bits are outputs.
#[bitfield_struct::bitfield(u8, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct PinState {
    /// Test clock.
    pub tck: bool,
    /// Test data out, driven by the device.
    pub tdo: bool,
    /// Test data in, driven by us.
    pub tdi: bool,
    /// Test mode select.
    pub tms: bool,
    #[bits(4)]
    __: u8,
}

/// The physical side of a JTAG session.
///
/// Implementations write every output line at once and sample every line at
/// once. Nothing is buffered: each call is expected to reach the pins before
/// it returns.
pub trait JtagPort {
    /// Drive the output lines, returning how many bytes the adapter accepted.
    fn write_pins(&mut self, pins: PinState) -> Result<usize, FtdiError>;
    /// Sample the current electrical level of every line.
    fn read_pins(&mut self) -> Result<PinState, FtdiError>;
}

impl<T: JtagPort + ?Sized> JtagPort for &mut T {
    fn write_pins(&mut self, pins: PinState) -> Result<usize, FtdiError> {
        (**self).write_pins(pins)
    }
    fn read_pins(&mut self) -> Result<PinState, FtdiError> {
        (**self).read_pins()
    }
}

impl<T: JtagPort + ?Sized> JtagPort for Box<T> {
    fn write_pins(&mut self, pins: PinState) -> Result<usize, FtdiError> {
        (**self).write_pins(pins)
    }
    fn read_pins(&mut self) -> Result<PinState, FtdiError> {
        (**self).read_pins()
    }
}

/// IEEE 1149.1 TAP controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapState {
    TestLogicReset,
    RunTestIdle,
    SelectDrScan,
    CaptureDr,
    ShiftDr,
    Exit1Dr,
    PauseDr,
    Exit2Dr,
    UpdateDr,
    SelectIrScan,
    CaptureIr,
    ShiftIr,
    Exit1Ir,
    PauseIr,
    Exit2Ir,
    UpdateIr,
}

impl TapState {
    pub const ALL: [TapState; 16] = [
        TapState::TestLogicReset,
        TapState::RunTestIdle,
        TapState::SelectDrScan,
        TapState::CaptureDr,
        TapState::ShiftDr,
        TapState::Exit1Dr,
        TapState::PauseDr,
        TapState::Exit2Dr,
        TapState::UpdateDr,
        TapState::SelectIrScan,
        TapState::CaptureIr,
        TapState::ShiftIr,
        TapState::Exit1Ir,
        TapState::PauseIr,
        TapState::Exit2Ir,
        TapState::UpdateIr,
    ];

    /// State reached on the next rising TCK edge with the given TMS level.
    pub const fn next(self, tms: bool) -> TapState {
        use TapState as S;
        match (self, tms) {
            (S::TestLogicReset, false) => S::RunTestIdle,
            (S::TestLogicReset, true) => S::TestLogicReset,
            (S::RunTestIdle, false) => S::RunTestIdle,
            (S::RunTestIdle, true) => S::SelectDrScan,

            (S::SelectDrScan, false) => S::CaptureDr,
            (S::SelectDrScan, true) => S::SelectIrScan,
            (S::CaptureDr, false) | (S::ShiftDr, false) | (S::Exit2Dr, false) => S::ShiftDr,
            (S::CaptureDr, true) | (S::ShiftDr, true) => S::Exit1Dr,
            (S::Exit1Dr, false) | (S::PauseDr, false) => S::PauseDr,
            (S::Exit1Dr, true) | (S::Exit2Dr, true) => S::UpdateDr,
            (S::PauseDr, true) => S::Exit2Dr,
            (S::UpdateDr, false) | (S::UpdateIr, false) => S::RunTestIdle,
            (S::UpdateDr, true) | (S::UpdateIr, true) => S::SelectDrScan,

            (S::SelectIrScan, false) => S::CaptureIr,
            (S::SelectIrScan, true) => S::TestLogicReset,
            (S::CaptureIr, false) | (S::ShiftIr, false) | (S::Exit2Ir, false) => S::ShiftIr,
            (S::CaptureIr, true) | (S::ShiftIr, true) => S::Exit1Ir,
            (S::Exit1Ir, false) | (S::PauseIr, false) => S::PauseIr,
            (S::Exit1Ir, true) | (S::Exit2Ir, true) => S::UpdateIr,
            (S::PauseIr, true) => S::Exit2Ir,
        }
    }

    /// Follow a TMS sequence, one transition per element.
    pub fn walk(self, tms: &[bool]) -> TapState {
        tms.iter().fold(self, |state, &tms| state.next(tms))
    }
}
