//! Command descriptor block (CDB) decoding
//!
//! Only the opcodes this target understands are named here. Everything else
//! is routed to the unhandled stub by the dispatcher.

use crate::codec;

/// SCSI command opcodes (subset needed for USB mass storage)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiOpcode {
    TestUnitReady = 0x00,
    RequestSense = 0x03,
    Inquiry = 0x12,
    ModeSense6 = 0x1A,
    PreventAllowMediumRemoval = 0x1E,
    ReadCapacity10 = 0x25,
    Read10 = 0x28,
    Write10 = 0x2A,
}

impl ScsiOpcode {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x00 => Some(ScsiOpcode::TestUnitReady),
            0x03 => Some(ScsiOpcode::RequestSense),
            0x12 => Some(ScsiOpcode::Inquiry),
            0x1A => Some(ScsiOpcode::ModeSense6),
            0x1E => Some(ScsiOpcode::PreventAllowMediumRemoval),
            0x25 => Some(ScsiOpcode::ReadCapacity10),
            0x28 => Some(ScsiOpcode::Read10),
            0x2A => Some(ScsiOpcode::Write10),
            _ => None,
        }
    }

    /// Minimum CDB length this command needs to be decoded
    pub fn cdb_len(self) -> usize {
        match self {
            ScsiOpcode::ReadCapacity10 | ScsiOpcode::Read10 | ScsiOpcode::Write10 => 10,
            _ => 6,
        }
    }
}

/// Length of the READ(10)/WRITE(10) CDB
pub const RW10_CDB_LEN: usize = 10;

const RW10_LBA_OFFSET: usize = 2;
const RW10_LENGTH_OFFSET: usize = 7;

/// Block range requested by a READ(10) or WRITE(10) command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    /// First logical block address
    pub first_lba: u32,
    /// Number of blocks to transfer
    pub block_count: u16,
}

impl DataRequest {
    /// Decode LBA and transfer length from a READ/WRITE 10 CDB
    ///
    /// No range checking happens here; out-of-range requests are caught
    /// against the device geometry before any I/O.
    pub fn decode(cdb: &[u8]) -> Option<Self> {
        if cdb.len() < RW10_CDB_LEN {
            return None;
        }
        Some(DataRequest {
            first_lba: codec::read_u32(cdb, RW10_LBA_OFFSET),
            block_count: codec::read_u16(cdb, RW10_LENGTH_OFFSET),
        })
    }

    /// Encode into the LBA and length fields of a READ/WRITE 10 CDB
    pub fn encode_into(&self, cdb: &mut [u8; RW10_CDB_LEN]) {
        codec::write_u32(cdb, RW10_LBA_OFFSET, self.first_lba);
        codec::write_u16(cdb, RW10_LENGTH_OFFSET, self.block_count);
    }

    /// One past the last block touched, computed without overflow
    pub fn end_lba(&self) -> u64 {
        self.first_lba as u64 + self.block_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rw10() {
        let cdb = [0x28, 0, 0, 0, 0, 100, 0, 0, 10, 0]; // LBA=100, length=10
        let req = DataRequest::decode(&cdb).unwrap();
        assert_eq!(req.first_lba, 100);
        assert_eq!(req.block_count, 10);
    }

    #[test]
    fn test_decode_ignores_flag_bytes() {
        let cdb = [0x2A, 0xFF, 0x01, 0x02, 0x03, 0x04, 0xFF, 0x05, 0x06, 0xFF];
        let req = DataRequest::decode(&cdb).unwrap();
        assert_eq!(req.first_lba, 0x0102_0304);
        assert_eq!(req.block_count, 0x0506);
    }

    #[test]
    fn test_decode_short_cdb() {
        let cdb = [0x28, 0, 0, 0, 0, 0];
        assert!(DataRequest::decode(&cdb).is_none());
    }

    #[test]
    fn test_encode_decode_extremes() {
        for (lba, count) in [(0u32, 0u16), (u32::MAX, u16::MAX), (0x8000_0001, 0x8001)] {
            let req = DataRequest {
                first_lba: lba,
                block_count: count,
            };
            let mut cdb = [0u8; RW10_CDB_LEN];
            cdb[0] = ScsiOpcode::Read10 as u8;
            req.encode_into(&mut cdb);
            assert_eq!(DataRequest::decode(&cdb), Some(req));
        }
    }

    #[test]
    fn test_end_lba_does_not_overflow() {
        let req = DataRequest {
            first_lba: u32::MAX,
            block_count: u16::MAX,
        };
        assert_eq!(req.end_lba(), u32::MAX as u64 + u16::MAX as u64);
    }

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(ScsiOpcode::from_u8(0x12), Some(ScsiOpcode::Inquiry));
        assert_eq!(ScsiOpcode::from_u8(0x1E), Some(ScsiOpcode::PreventAllowMediumRemoval));
        assert_eq!(ScsiOpcode::from_u8(0x88), None); // READ(16) is not supported
        assert_eq!(ScsiOpcode::Read10.cdb_len(), 10);
        assert_eq!(ScsiOpcode::Inquiry.cdb_len(), 6);
    }
}
