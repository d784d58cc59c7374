//! Fixed-layout response payloads
//!
//! Each builder returns the exact bytes to put on the wire.

use crate::codec;
use crate::device::BlockDeviceInfo;
use crate::error::{ScsiResult, ScsiTargetError};

/// Length of the standard INQUIRY response
pub const INQUIRY_RESPONSE_LEN: usize = 36;

/// Length of the MODE SENSE(6) response (header only, no block descriptors)
pub const MODE_SENSE6_RESPONSE_LEN: usize = 4;

/// Length of the READ CAPACITY(10) response
pub const READ_CAPACITY10_RESPONSE_LEN: usize = 8;

/// Device-specific parameter bit: medium is write protected
pub const MODE_SENSE_WP: u8 = 0x80;

const VENDOR_RANGE: std::ops::Range<usize> = 8..16;
const PRODUCT_RANGE: std::ops::Range<usize> = 16..32;
const REVISION_RANGE: std::ops::Range<usize> = 32..36;

/// Standard INQUIRY data
///
/// The target sends this payload verbatim, so it is built once when the
/// target is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryResponse {
    bytes: [u8; INQUIRY_RESPONSE_LEN],
}

impl InquiryResponse {
    /// Build a direct-access block device INQUIRY payload
    ///
    /// Identification strings are space-padded, and truncated to 8, 16
    /// and 4 characters.
    pub fn new(vendor: &str, product: &str, revision: &str, removable: bool) -> ScsiResult<Self> {
        let mut data = [0u8; INQUIRY_RESPONSE_LEN];

        // Peripheral device type: 0x00 = Direct access block device (disk)
        data[0] = 0x00;

        // RMB (Removable media bit)
        data[1] = if removable { 0x80 } else { 0x00 };

        // Version: 0x04 = SPC-2
        data[2] = 0x04;

        // Response data format: 0x02
        data[3] = 0x02;

        // Additional length
        data[4] = (INQUIRY_RESPONSE_LEN - 5) as u8;

        fill_ascii(&mut data[VENDOR_RANGE], vendor, "vendor")?;
        fill_ascii(&mut data[PRODUCT_RANGE], product, "product")?;
        fill_ascii(&mut data[REVISION_RANGE], revision, "revision")?;

        Ok(InquiryResponse { bytes: data })
    }

    /// Use a caller-supplied payload as is
    pub fn from_bytes(bytes: [u8; INQUIRY_RESPONSE_LEN]) -> Self {
        InquiryResponse { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; INQUIRY_RESPONSE_LEN] {
        &self.bytes
    }

    pub fn vendor(&self) -> &[u8] {
        &self.bytes[VENDOR_RANGE]
    }

    pub fn product(&self) -> &[u8] {
        &self.bytes[PRODUCT_RANGE]
    }

    pub fn revision(&self) -> &[u8] {
        &self.bytes[REVISION_RANGE]
    }

    pub fn is_removable(&self) -> bool {
        self.bytes[1] & 0x80 != 0
    }
}

fn fill_ascii(field: &mut [u8], value: &str, name: &str) -> ScsiResult<()> {
    if !value.is_ascii() {
        return Err(ScsiTargetError::Config(format!(
            "{} identification must be ASCII: {:?}",
            name, value
        )));
    }
    field.fill(b' ');
    for (dst, &b) in field.iter_mut().zip(value.as_bytes()) {
        *dst = b;
    }
    Ok(())
}

/// Build the MODE SENSE(6) parameter header
pub fn mode_sense6(info: &BlockDeviceInfo) -> [u8; MODE_SENSE6_RESPONSE_LEN] {
    let mut data = [0u8; MODE_SENSE6_RESPONSE_LEN];
    data[0] = (MODE_SENSE6_RESPONSE_LEN - 1) as u8; // Mode data length (excluding this byte)
    data[1] = 0; // Medium type
    data[2] = if info.write_protected { MODE_SENSE_WP } else { 0 };
    data[3] = 0; // Block descriptor length
    data
}

/// Build the READ CAPACITY(10) response
pub fn read_capacity10(info: &BlockDeviceInfo) -> [u8; READ_CAPACITY10_RESPONSE_LEN] {
    let mut data = [0u8; READ_CAPACITY10_RESPONSE_LEN];
    let last_lba = info.block_count.saturating_sub(1);
    codec::write_u32(&mut data, 0, last_lba);
    codec::write_u32(&mut data, 4, info.block_size);
    data
}
