use crate::{ChipType, FtdiError, Interface};
use futures_lite::future::block_on;
use nusb::transfer::{Control, ControlType, Recipient};
use std::time::Duration;

const USB_TIMEOUT: Duration = Duration::from_secs(1);

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BitMode {
    Reset = 0,
    Bitbang = 1,
    Mpsse = 2,
    SyncBb = 4,
    Mcu = 8,
    Opto = 16,
    Cbus = 32,
    SyncFf = 64,
    Ft1284 = 128,
}

pub(crate) struct FtdiContext {
    /// USB device handle
    handle: nusb::Interface,
    /// FTDI device interface
    interface: Interface,
    chip_type: ChipType,
    write_ep: u8,
}

impl FtdiContext {
    pub(crate) fn new(handle: nusb::Interface, interface: Interface, chip_type: ChipType) -> Self {
        Self {
            handle,
            interface,
            chip_type,
            write_ep: interface.write_ep(),
        }
    }
    pub(crate) fn chip_type(&self) -> ChipType {
        self.chip_type
    }
    fn sio_write(&self, request: u8, value: u16, index: u16) -> Result<(), FtdiError> {
        self.handle
            .control_out_blocking(
                Control {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                },
                &[],
                USB_TIMEOUT,
            )
            .map_err(std::io::Error::from)?;

        Ok(())
    }

    pub(crate) fn usb_reset(&mut self) -> Result<(), FtdiError> {
        const SIO_RESET_REQUEST: u8 = 0;
        const SIO_RESET_SIO: u16 = 0;

        self.sio_write(SIO_RESET_REQUEST, SIO_RESET_SIO, self.interface.index())
    }

    pub(crate) fn usb_purge_buffers(&mut self) -> Result<(), FtdiError> {
        const SIO_RESET_REQUEST: u8 = 0;
        const SIO_RESET_PURGE_RX: u16 = 1;
        const SIO_RESET_PURGE_TX: u16 = 2;

        self.sio_write(SIO_RESET_REQUEST, SIO_RESET_PURGE_RX, self.interface.index())?;
        self.sio_write(SIO_RESET_REQUEST, SIO_RESET_PURGE_TX, self.interface.index())
    }

    pub(crate) fn set_latency_timer(&mut self, value: u8) -> Result<(), FtdiError> {
        const SIO_SET_LATENCY_TIMER_REQUEST: u8 = 0x09;

        self.sio_write(
            SIO_SET_LATENCY_TIMER_REQUEST,
            value as u16,
            self.interface.index(),
        )
    }

    pub(crate) fn interface(&self) -> Interface {
        self.interface
    }

    pub(crate) fn set_baud_divisor(&mut self, divisor: BaudDivisor) -> Result<(), FtdiError> {
        const SIO_SET_BAUDRATE_REQUEST: u8 = 0x03;

        self.sio_write(SIO_SET_BAUDRATE_REQUEST, divisor.value, divisor.index)
    }

    pub(crate) fn set_bitmode(&mut self, bitmask: u8, mode: BitMode) -> Result<(), FtdiError> {
        const SIO_SET_BITMODE_REQUEST: u8 = 0x0B;

        self.sio_write(
            SIO_SET_BITMODE_REQUEST,
            u16::from_le_bytes([bitmask, mode as u8]),
            self.interface.index(),
        )
    }

    /// Sample the current level of all pins of this interface.
    pub(crate) fn read_pins(&self) -> Result<u8, FtdiError> {
        const SIO_READ_PINS_REQUEST: u8 = 0x0C;

        let mut buf = [0u8; 1];
        let len = self
            .handle
            .control_in_blocking(
                Control {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: SIO_READ_PINS_REQUEST,
                    value: 0,
                    index: self.interface.index(),
                },
                &mut buf,
                USB_TIMEOUT,
            )
            .map_err(std::io::Error::from)?;
        if len != buf.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no pin state returned",
            )
            .into());
        }
        Ok(buf[0])
    }

    /// Queue `data` on the bulk out endpoint and wait for completion.
    pub(crate) fn write(&self, data: &[u8]) -> Result<usize, FtdiError> {
        let completion = block_on(self.handle.bulk_out(self.write_ep, Vec::from(data)));
        let response = completion.into_result().map_err(std::io::Error::from)?;
        Ok(response.actual_length())
    }
}

/// Encoded baud rate divisor for the SIO set-baudrate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BaudDivisor {
    pub(crate) value: u16,
    pub(crate) index: u16,
    /// Baud rate the chip will really run at.
    pub(crate) actual: u32,
}

impl BaudDivisor {
    // Fractional part of the divisor in eighths, as the chip encodes it.
    const FRAC_CODE: [u32; 8] = [0, 3, 2, 4, 1, 5, 6, 7];
    const C_CLK: u32 = 48_000_000;
    const H_CLK: u32 = 120_000_000;

    pub(crate) fn new(
        chip_type: ChipType,
        interface: Interface,
        baud: u32,
        bitbang: bool,
    ) -> Result<Self, FtdiError> {
        if baud == 0 {
            return Err(FtdiError::InvalidBaudRate(baud));
        }
        // In bit-bang mode the pins are updated at four times the baud rate.
        let baud = if bitbang { baud.saturating_mul(4) } else { baud };

        let (encoded, actual) =
            if chip_type.is_h_type() && baud.saturating_mul(10) > Self::H_CLK / 0x3fff {
                let (encoded, actual) = Self::to_clkbits(baud, Self::H_CLK, 10);
                (encoded | 0x20000, actual)
            } else {
                Self::to_clkbits(baud, Self::C_CLK, 16)
            };
        let actual = if bitbang { actual / 4 } else { actual };

        let value = (encoded & 0xffff) as u16;
        let mut index = (encoded >> 16) as u16;
        if chip_type.has_interface_index() {
            index = (index << 8) | interface.index();
        }
        log::debug!("baud divisor for {chip_type:?}: value={value:#06x} index={index:#06x}");
        Ok(Self {
            value,
            index,
            actual,
        })
    }

    fn to_clkbits(baud: u32, clk: u32, clk_div: u32) -> (u32, u32) {
        let clk = clk as u64;
        let clk_div = clk_div as u64;
        let baud_rate = baud as u64;
        let (encoded, best_baud) = if baud_rate >= clk / clk_div {
            (0, clk / clk_div)
        } else if baud_rate >= clk / (clk_div + clk_div / 2) {
            (1, clk / (clk_div + clk_div / 2))
        } else if baud_rate >= clk / (2 * clk_div) {
            (2, clk / (2 * clk_div))
        } else {
            let divisor = clk * 16 / clk_div / baud_rate;
            let mut best_divisor = if divisor & 1 == 1 {
                divisor / 2 + 1
            } else {
                divisor / 2
            };
            if best_divisor > 0x20000 {
                log::warn!("baud rate {baud} below the chip minimum, clamped");
                best_divisor = 0x1ffff;
            }
            let best_baud = clk * 16 / clk_div / best_divisor;
            let best_baud = if best_baud & 1 == 1 {
                best_baud / 2 + 1
            } else {
                best_baud / 2
            };
            let encoded = (best_divisor >> 3) as u32
                | (Self::FRAC_CODE[(best_divisor & 0x7) as usize] << 14);
            (encoded, best_baud)
        };
        (encoded, best_baud as u32)
    }
}

#[cfg(test)]
mod test {
    use super::BaudDivisor;
    use crate::{ChipType, FtdiError, Interface};

    #[test]
    fn baud_divisor_legacy_chip() {
        // 9600 baud in bit-bang mode clocks at 38400: 48MHz / 16 / 78.125
        let divisor = BaudDivisor::new(ChipType::FT2232C, Interface::B, 9600, true).unwrap();
        assert_eq!(divisor.value, 0xC04E);
        assert_eq!(divisor.index, 0x0002);
        assert_eq!(divisor.actual, 9600);
    }

    #[test]
    fn baud_divisor_single_interface_chip_has_no_index() {
        let divisor = BaudDivisor::new(ChipType::R, Interface::A, 9600, true).unwrap();
        assert_eq!(divisor.value, 0xC04E);
        assert_eq!(divisor.index, 0);
    }

    #[test]
    fn baud_divisor_h_type_uses_high_speed_clock() {
        let divisor = BaudDivisor::new(ChipType::FT232H, Interface::A, 9600, true).unwrap();
        assert_eq!(divisor.value, 0x4138);
        assert_eq!(divisor.index, 0x0201);
        assert_eq!(divisor.actual, 9600);
    }

    #[test]
    fn baud_divisor_top_speed() {
        let divisor = BaudDivisor::new(ChipType::R, Interface::A, 3_000_000, false).unwrap();
        assert_eq!(divisor.value, 0);
        assert_eq!(divisor.actual, 3_000_000);
    }

    #[test]
    fn baud_divisor_rejects_zero() {
        assert!(matches!(
            BaudDivisor::new(ChipType::R, Interface::A, 0, true),
            Err(FtdiError::InvalidBaudRate(0))
        ));
    }
}
