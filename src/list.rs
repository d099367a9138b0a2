use nusb::DeviceInfo;

use crate::{ChipType, Interface};

/// Known properties associated to particular FTDI chip types.
#[derive(Debug, Clone, Copy)]
struct FtdiDevice {
    /// The (VID, PID) pair of this device.
    id: (u16, u16),

    /// FTDI chip type to use if the device is not recognized.
    ///
    /// "FTDI compatible" devices may use the same VID/PID pair as an FTDI device, but
    /// they may be implemented by a completely third party solution. In this case,
    /// we still try the same `bcdDevice` based detection, but if it fails, we fall back
    /// to this chip type.
    fallback_chip_type: ChipType,
}

/// Known FTDI device variants.
static FTDI_COMPAT_DEVICES: &[FtdiDevice] = &[
    //
    // --- FTDI VID/PID pairs ---
    //
    // FTDI Ltd. FT232R/FT232BM USB UART
    FtdiDevice {
        id: (0x0403, 0x6001),
        fallback_chip_type: ChipType::R,
    },
    // FTDI Ltd. FT2232C/D/H Dual UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6010),
        fallback_chip_type: ChipType::FT2232H,
    },
    // FTDI Ltd. FT4232H Quad HS USB-UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6011),
        fallback_chip_type: ChipType::FT4232H,
    },
    // FTDI Ltd. FT232H Single HS USB-UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6014),
        fallback_chip_type: ChipType::FT232H,
    },
    // FTDI Ltd. FT230X/FT231X Basic UART
    FtdiDevice {
        id: (0x0403, 0x6015),
        fallback_chip_type: ChipType::FT230X,
    },
    //
    // --- Third-party VID/PID pairs ---
    //
    // Olimex Ltd. ARM-USB-OCD
    FtdiDevice {
        id: (0x15ba, 0x0003),
        fallback_chip_type: ChipType::FT2232C,
    },
    // Olimex Ltd. ARM-USB-TINY
    FtdiDevice {
        id: (0x15ba, 0x0004),
        fallback_chip_type: ChipType::FT2232C,
    },
    // Olimex Ltd. ARM-USB-TINY-H
    FtdiDevice {
        id: (0x15ba, 0x002a),
        fallback_chip_type: ChipType::FT2232H,
    },
    // Olimex Ltd. ARM-USB-OCD-H
    FtdiDevice {
        id: (0x15ba, 0x002b),
        fallback_chip_type: ChipType::FT2232H,
    },
];

/// Detect the chip from `bcdDevice`, falling back to the VID/PID table.
pub(crate) fn detect_chip_type(info: &DeviceInfo) -> Option<ChipType> {
    let detected = match (info.device_version(), info.serial_number().unwrap_or("")) {
        (0x400, _) | (0x200, "") => Some(ChipType::Bm),
        (0x200, _) => Some(ChipType::Am),
        (0x500, _) => Some(ChipType::FT2232C),
        (0x600, _) => Some(ChipType::R),
        (0x700, _) => Some(ChipType::FT2232H),
        (0x800, _) => Some(ChipType::FT4232H),
        (0x900, _) => Some(ChipType::FT232H),
        (0x1000, _) => Some(ChipType::FT230X),
        (version, _) => {
            log::debug!("Unknown bcdDevice 0x{version:x}, using fallback");
            None
        }
    };
    detected.or_else(|| {
        FTDI_COMPAT_DEVICES
            .iter()
            .find(|device| (info.vendor_id(), info.product_id()) == device.id)
            .map(|device| device.fallback_chip_type)
    })
}

pub struct FtdiDeviceInfo {
    pub usb_device: DeviceInfo,
    pub chip_type: ChipType,
    pub interface: &'static [Interface],
}

/// One bit-bang capable interface, addressed by its position in [`list_all_interface`].
pub struct FtdiInterfaceInfo {
    pub usb_device: DeviceInfo,
    pub chip_type: ChipType,
    pub interface: Interface,
}

pub fn list_all_device() -> Vec<FtdiDeviceInfo> {
    fn filter_map(info: DeviceInfo) -> Option<FtdiDeviceInfo> {
        let device = FTDI_COMPAT_DEVICES
            .iter()
            .find(|device| (info.vendor_id(), info.product_id()) == device.id)?;
        let chip_type = detect_chip_type(&info).unwrap_or(device.fallback_chip_type);
        log::info!(
            "Find {:?}:[{:#06x?},{:#06x?}]",
            chip_type,
            device.id.0,
            device.id.1
        );
        Some(FtdiDeviceInfo {
            usb_device: info,
            chip_type,
            interface: chip_type.interface_list(),
        })
    }
    match nusb::list_devices() {
        Ok(devices) => devices.filter_map(filter_map).collect(),
        Err(e) => {
            log::warn!("USB enumeration failed: {e}");
            Vec::new()
        }
    }
}

/// Every interface of every adapter, in enumeration order.
///
/// A dual-interface chip contributes two consecutive entries, so the position
/// in this list is the interface index accepted by
/// [`crate::FtdiBitbang::open_by_index`].
pub fn list_all_interface() -> Vec<FtdiInterfaceInfo> {
    list_all_device()
        .into_iter()
        .flat_map(|device| {
            let interfaces = device.interface;
            interfaces
                .iter()
                .map(move |&interface| FtdiInterfaceInfo {
                    usb_device: device.usb_device.clone(),
                    chip_type: device.chip_type,
                    interface,
                })
        })
        .collect()
}
