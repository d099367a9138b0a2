//! JTAG TAP access by bit-banging an FTDI USB adapter
//!
//! The FTDI chip is put into asynchronous bit-bang mode and every JTAG line
//! (TCK, TDI, TMS, and TDO) is driven or sampled one byte at a time. On top of
//! that sits a small open-loop TAP engine that walks the state machine with
//! fixed TMS sequences and shifts registers LSB-first.
//!
//! Two things are implemented for a single device on the chain:
//!
//! * reading the IDCODE register and comparing it with the value expected
//!   for the part ([`jtag::verify_idcode`]),
//! * toggling boundary-scan cells through EXTEST so that LEDs on the
//!   selected pins flash ([`jtag::exercise_pins`]).
//!
//! # Quickstart
//!
//! * Linux users only: Add [udev rules].
//!
//! ```no_run
//! use ftdi_tap::{FtdiBitbang, jtag::{self, DeviceKind, IdcodeCheck, JtagTap}};
//!
//! let port = FtdiBitbang::open_by_index(1, ftdi_tap::DEFAULT_BAUD_RATE)?;
//! let mut tap = JtagTap::new(port);
//! let device = DeviceKind::Xc2c64aVq44.descriptor();
//! if let IdcodeCheck::Match(id) = jtag::verify_idcode(&mut tap, device)? {
//!     println!("IDCODE Match: 0x{id:08X}");
//! }
//! # Ok::<(), ftdi_tap::FtdiError>(())
//! ```
//!
//! # Limitations
//!
//! * One TAP on the chain, no BYPASS handling.
//! * Only the IDCODE and EXTEST instructions are used.
//!
//! [udev rules]: https://ftdichip.com/wp-content/uploads/2020/08/AN_220_FTDI_Drivers_Installation_Guide_for_Linux-1.pdf

#![forbid(unsafe_code)]

mod bitbang;
pub mod delay;
mod ftdaye;
pub mod jtag;
mod list;

pub use bitbang::{DEFAULT_BAUD_RATE, FtdiBitbang, JTAG_OUTPUT_MASK};
pub use ftdaye::BitMode;
pub use list::{FtdiDeviceInfo, FtdiInterfaceInfo, list_all_device, list_all_interface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipType {
    Am,
    Bm,
    FT2232C,
    R,
    FT2232H,
    FT4232H,
    FT232H,
    FT230X,
}
impl ChipType {
    pub(crate) const fn interface_list(self) -> &'static [Interface] {
        match self {
            ChipType::FT2232C | ChipType::FT2232H => &[Interface::A, Interface::B],
            ChipType::FT4232H => &[Interface::A, Interface::B, Interface::C, Interface::D],
            _ => &[Interface::A],
        }
    }
    /// High speed parts can run the baud generator from a 120MHz clock.
    pub(crate) const fn is_h_type(self) -> bool {
        matches!(
            self,
            ChipType::FT2232H | ChipType::FT4232H | ChipType::FT232H
        )
    }
    /// Multi-interface parts expect the interface number in the low byte of
    /// the baud rate index.
    pub(crate) const fn has_interface_index(self) -> bool {
        matches!(
            self,
            ChipType::FT2232C | ChipType::FT2232H | ChipType::FT4232H | ChipType::FT232H
        )
    }
}
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Interface {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

impl Interface {
    pub(crate) const fn write_ep(self) -> u8 {
        match self {
            Interface::A => 0x02,
            Interface::B => 0x04,
            Interface::C => 0x06,
            Interface::D => 0x08,
        }
    }

    pub(crate) const fn index(self) -> u16 {
        self as u16
    }

    pub(crate) const fn interface_number(self) -> u8 {
        (self as u8) - 1
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FtdiError {
    #[error("A USB transport error occurred.")]
    ///
    /// This variant is used for all errors reported by the operating system when performing a USB
    /// operation. It may indicate that the USB device was unplugged, that another application or an
    /// operating system driver is currently using it, or that the current user does not have
    /// permission to access it.
    Usb(#[from] std::io::Error),

    #[error("Open failed: {0}")]
    /// Error occurs when open.
    OpenFailed(String),

    #[error("Unsupported chip type: {0:?}")]
    /// The connected device is not supported by the driver.
    UnsupportedChip(ChipType),

    #[error("Invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    #[error("Adapter accepted {written} of {expected} bytes")]
    /// A pin write did not reach the adapter.
    ShortWrite { written: usize, expected: usize },
}
