use crate::ftdaye::{BaudDivisor, BitMode, FtdiContext};
use crate::jtag::{JtagPort, PinState};
use crate::list::{FtdiInterfaceInfo, detect_chip_type, list_all_interface};
use crate::{ChipType, FtdiError, Interface};

/// Baud rate the adapter is configured with unless told otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Every line but TDO (bit 1) is an output.
pub const JTAG_OUTPUT_MASK: u8 = 0b1111_1101;

/// One FTDI interface in asynchronous bit-bang mode.
///
/// Each byte written sets all eight pins of the interface at once; reading
/// samples them through a control request. Bits 0-3 carry TCK, TDO, TDI and
/// TMS as laid out in [`PinState`].
pub struct FtdiBitbang {
    ft: FtdiContext,
}

impl FtdiBitbang {
    /// Claim `interface` of `usb_device` and reset it, without entering
    /// bit-bang mode yet.
    pub fn open(usb_device: &nusb::DeviceInfo, interface: Interface) -> Result<Self, FtdiError> {
        let chip_type = detect_chip_type(usb_device).ok_or(FtdiError::OpenFailed(format!(
            "Unknown FTDI device {:04x}:{:04x}",
            usb_device.vendor_id(),
            usb_device.product_id()
        )))?;
        if chip_type == ChipType::Am {
            // No bit-bang mode on the first generation parts.
            return Err(FtdiError::UnsupportedChip(chip_type));
        }
        if !chip_type.interface_list().contains(&interface) {
            return Err(FtdiError::OpenFailed(format!(
                "{chip_type:?} do not support Interface::{interface:?}"
            )));
        }
        let handle = usb_device.open()?;
        let handle = handle.detach_and_claim_interface(interface.interface_number())?;

        let mut ft = FtdiContext::new(handle, interface, chip_type);
        ft.usb_reset()?;
        ft.usb_purge_buffers()?;
        ft.set_latency_timer(16)?;
        log::info!("Opened {chip_type:?} Interface::{interface:?}");
        Ok(Self { ft })
    }

    /// Open the `index`-th interface of [`list_all_interface`] and put it in
    /// bit-bang mode for JTAG at `baud`.
    pub fn open_by_index(index: usize, baud: u32) -> Result<Self, FtdiError> {
        let interfaces = list_all_interface();
        let FtdiInterfaceInfo {
            usb_device,
            interface,
            ..
        } = interfaces.get(index).ok_or_else(|| {
            FtdiError::OpenFailed(format!(
                "Interface #{index} not found, {} available",
                interfaces.len()
            ))
        })?;
        let mut port = Self::open(usb_device, *interface)?;
        port.configure(baud)?;
        port.set_pin_mode(JTAG_OUTPUT_MASK, BitMode::Bitbang)?;
        // Start from all lines low so the session's copy matches the pins.
        port.write_pins(PinState::new())?;
        Ok(port)
    }

    pub fn chip_type(&self) -> ChipType {
        self.ft.chip_type()
    }

    pub fn interface(&self) -> Interface {
        self.ft.interface()
    }

    /// Set the pin update rate. Returns the baud rate actually achieved.
    ///
    /// The chip clocks bit-bang writes at four times the programmed rate, so
    /// the divisor is always computed for bit-bang mode, whether or not
    /// [`set_pin_mode`](Self::set_pin_mode) has been called yet.
    pub fn configure(&mut self, baud: u32) -> Result<u32, FtdiError> {
        let divisor = bitbang_divisor(self.chip_type(), self.interface(), baud)?;
        self.ft.set_baud_divisor(divisor)?;
        log::info!("Baud rate set to {} (requested {baud})", divisor.actual);
        Ok(divisor.actual)
    }

    /// Select the pin mode; set bits of `output_mask` are driven.
    pub fn set_pin_mode(&mut self, output_mask: u8, mode: BitMode) -> Result<(), FtdiError> {
        log::debug!("Bit mode {mode:?}, outputs {output_mask:#010b}");
        self.ft.set_bitmode(output_mask, mode)
    }
}

fn bitbang_divisor(
    chip_type: ChipType,
    interface: Interface,
    baud: u32,
) -> Result<BaudDivisor, FtdiError> {
    BaudDivisor::new(chip_type, interface, baud, true)
}

impl JtagPort for FtdiBitbang {
    fn write_pins(&mut self, pins: PinState) -> Result<usize, FtdiError> {
        self.ft.write(&[pins.into_bits()])
    }

    fn read_pins(&mut self) -> Result<PinState, FtdiError> {
        Ok(PinState::from_bits(self.ft.read_pins()?))
    }
}

impl Drop for FtdiBitbang {
    fn drop(&mut self) {
        // Release the lines; nothing to report if the adapter is already gone.
        if let Err(e) = self.ft.set_bitmode(0, BitMode::Reset) {
            log::debug!("Leaving bit-bang mode failed: {e}");
        }
    }
}
