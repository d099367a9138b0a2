//! Per-part JTAG parameters taken from the BSDL files.
use std::borrow::Cow;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Instruction register length {0} is outside 1..=32")]
    InstructionLength(usize),

    #[error("IDCODE register length {0} is outside 1..=32")]
    IdcodeLength(usize),

    #[error("{name} opcode {opcode:#x} does not fit in {length} bits")]
    /// An instruction wider than the instruction register.
    OpcodeTooWide {
        name: &'static str,
        opcode: u32,
        length: usize,
    },

    #[error("Pin {pin} is outside the {length} bit boundary register")]
    PinOutOfRange { pin: usize, length: usize },

    #[error("Expected IDCODE {0:#010x} does not fit in the IDCODE register")]
    IdcodeTooWide(u32),
}

/// Everything the TAP routines need to know about one part in one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Bits in the IDCODE register.
    pub idcode_register_length: usize,
    pub idcode_instruction: u32,
    /// Width of the instruction register.
    pub instruction_length: usize,
    /// IDCODE this exact part and package reports.
    pub idcode_factory: u32,
    pub extest_instruction: u32,
    /// Bits in the boundary-scan register.
    pub boundary_register_length: usize,
    /// Boundary register cells to toggle, in the order they are exercised.
    pub pins: Cow<'static, [usize]>,
}

/// Xilinx CoolRunner-II XC2C64A in VQ44.
pub static XC2C64A_VQ44: Device = Device {
    idcode_register_length: 32,
    idcode_instruction: 0b0000_0001,
    instruction_length: 8,
    idcode_factory: 0x06E5_E093,
    extest_instruction: 0b0000_0000,
    boundary_register_length: 192,
    pins: Cow::Borrowed(&[95, 191]),
};

/// Xilinx CoolRunner-II XC2C32A in VQ44.
pub static XC2C32A_VQ44: Device = Device {
    idcode_register_length: 32,
    idcode_instruction: 0b0000_0001,
    instruction_length: 8,
    idcode_factory: 0x06E1_C093,
    extest_instruction: 0b0000_0000,
    boundary_register_length: 97,
    pins: Cow::Borrowed(&[46, 94]),
};

fn fits(value: u32, bits: usize) -> bool {
    bits >= 32 || value >> bits == 0
}

impl Device {
    /// Check the widths and indices against each other.
    pub fn validate(&self) -> Result<(), DeviceError> {
        if !(1..=32).contains(&self.instruction_length) {
            return Err(DeviceError::InstructionLength(self.instruction_length));
        }
        if !(1..=32).contains(&self.idcode_register_length) {
            return Err(DeviceError::IdcodeLength(self.idcode_register_length));
        }
        for (name, opcode) in [
            ("IDCODE", self.idcode_instruction),
            ("EXTEST", self.extest_instruction),
        ] {
            if !fits(opcode, self.instruction_length) {
                return Err(DeviceError::OpcodeTooWide {
                    name,
                    opcode,
                    length: self.instruction_length,
                });
            }
        }
        if !fits(self.idcode_factory, self.idcode_register_length) {
            return Err(DeviceError::IdcodeTooWide(self.idcode_factory));
        }
        if let Some(&pin) = self
            .pins
            .iter()
            .find(|&&pin| pin >= self.boundary_register_length)
        {
            return Err(DeviceError::PinOutOfRange {
                pin,
                length: self.boundary_register_length,
            });
        }
        Ok(())
    }
}

/// Parts this crate has descriptors for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Xc2c64aVq44,
    Xc2c32aVq44,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Xc2c64aVq44, DeviceKind::Xc2c32aVq44];

    pub fn descriptor(self) -> &'static Device {
        match self {
            DeviceKind::Xc2c64aVq44 => &XC2C64A_VQ44,
            DeviceKind::Xc2c32aVq44 => &XC2C32A_VQ44,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Xc2c64aVq44 => "XC2C64A-VQ44",
            DeviceKind::Xc2c32aVq44 => "XC2C32A-VQ44",
        }
    }

    /// Which known part reports this IDCODE, if any.
    pub fn from_idcode(idcode: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.descriptor().idcode_factory == idcode)
    }
}
