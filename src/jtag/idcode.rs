use eh1::delay::DelayNs;

use super::tap::{IDLE_TO_SHIFT_IR, IR_EXIT_TO_SHIFT_DR, SHIFT_DR_TO_IDLE};
use super::{Device, JtagPort, JtagTap};
use crate::FtdiError;

/// Result of comparing the IDCODE register with the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdcodeCheck {
    Match(u32),
    Mismatch { expected: u32, observed: u32 },
}

impl IdcodeCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, IdcodeCheck::Match(_))
    }
}

/// Load the IDCODE instruction and shift the register out.
///
/// Starts with a TAP reset and leaves the TAP in Run-Test/Idle.
pub fn read_idcode<P: JtagPort, D: DelayNs>(
    tap: &mut JtagTap<P, D>,
    device: &Device,
) -> Result<u32, FtdiError> {
    tap.reset()?;
    tap.tms_sequence(&IDLE_TO_SHIFT_IR)?;
    tap.shift_out(device.idcode_instruction, device.instruction_length)?;
    // Exit1-IR, Update-IR, Select-DR-Scan, Capture-DR, Shift-DR
    tap.tms_sequence(&IR_EXIT_TO_SHIFT_DR)?;
    let idcode = tap.shift_in(device.idcode_register_length, false)?;
    tap.tms_sequence(&SHIFT_DR_TO_IDLE)?;
    log::debug!("IDCODE read: {idcode:#010x}");
    Ok(idcode)
}

/// Read the IDCODE and compare it with [`Device::idcode_factory`].
///
/// A different value is not an error, it is reported as
/// [`IdcodeCheck::Mismatch`].
pub fn verify_idcode<P: JtagPort, D: DelayNs>(
    tap: &mut JtagTap<P, D>,
    device: &Device,
) -> Result<IdcodeCheck, FtdiError> {
    let observed = read_idcode(tap, device)?;
    if observed == device.idcode_factory {
        Ok(IdcodeCheck::Match(observed))
    } else {
        log::warn!(
            "IDCODE mismatch: expected {:#010x}, read {observed:#010x}",
            device.idcode_factory
        );
        Ok(IdcodeCheck::Mismatch {
            expected: device.idcode_factory,
            observed,
        })
    }
}
