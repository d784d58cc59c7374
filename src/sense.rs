//! SCSI sense data
//!
//! The target keeps exactly one sense condition: the outcome of the most
//! recently dispatched command. It is stored in its wire form (fixed format
//! sense data) because REQUEST SENSE returns it verbatim.

/// SCSI sense key codes
pub mod sense_key {
    pub const NO_SENSE: u8 = 0x00;
    pub const MEDIUM_ERROR: u8 = 0x03;
    pub const ILLEGAL_REQUEST: u8 = 0x05;
    pub const DATA_PROTECT: u8 = 0x07;
    pub const ABORTED_COMMAND: u8 = 0x0B;
}

/// Additional Sense Code (ASC) values
pub mod asc {
    pub const NO_ADDITIONAL_SENSE: u8 = 0x00;
    pub const WRITE_ERROR: u8 = 0x0C;
    pub const UNRECOVERED_READ_ERROR: u8 = 0x11;
    pub const INVALID_COMMAND_OPERATION_CODE: u8 = 0x20;
    pub const LBA_OUT_OF_RANGE: u8 = 0x21;
    pub const INVALID_FIELD_IN_CDB: u8 = 0x24;
    pub const WRITE_PROTECTED: u8 = 0x27;
    pub const DATA_PHASE_ERROR: u8 = 0x4B;
}

/// Additional Sense Code Qualifier (ASCQ) values
pub mod ascq {
    pub const NO_QUALIFIER: u8 = 0x00;
}

/// Size of the fixed format sense structure in bytes
pub const SENSE_DATA_LEN: usize = 18;

/// Response code: current error, fixed format
pub const RESPONSE_CODE_CURRENT: u8 = 0x70;

/// Value of the additional sense length field
pub const ADDITIONAL_SENSE_LEN: u8 = 8;

// Field offsets within the structure
const RESPONSE_CODE_OFFSET: usize = 0;
const SENSE_KEY_OFFSET: usize = 2;
const ADDITIONAL_LEN_OFFSET: usize = 7;
const ASC_OFFSET: usize = 12;
const ASCQ_OFFSET: usize = 13;

/// SCSI sense data (fixed format)
///
/// Every update replaces all fields; there is no way to change the key
/// without also setting the code and qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseData {
    bytes: [u8; SENSE_DATA_LEN],
}

impl Default for SenseData {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl SenseData {
    /// All-zero sense structure (the state of a freshly initialized target)
    pub fn zeroed() -> Self {
        SenseData {
            bytes: [0u8; SENSE_DATA_LEN],
        }
    }

    pub fn new(sense_key: u8, asc: u8, ascq: u8) -> Self {
        let mut sense = Self::zeroed();
        sense.set_error(sense_key, asc, ascq);
        sense
    }

    /// Overwrite the whole condition
    pub fn set_error(&mut self, sense_key: u8, asc: u8, ascq: u8) {
        self.bytes = [0u8; SENSE_DATA_LEN];
        self.bytes[RESPONSE_CODE_OFFSET] = RESPONSE_CODE_CURRENT;
        self.bytes[SENSE_KEY_OFFSET] = sense_key;
        self.bytes[ADDITIONAL_LEN_OFFSET] = ADDITIONAL_SENSE_LEN;
        self.bytes[ASC_OFFSET] = asc;
        self.bytes[ASCQ_OFFSET] = ascq;
    }

    /// Reset to the "no error" condition
    pub fn set_success(&mut self) {
        self.set_error(sense_key::NO_SENSE, asc::NO_ADDITIONAL_SENSE, ascq::NO_QUALIFIER);
    }

    pub fn replace(&mut self, other: SenseData) {
        self.bytes = other.bytes;
    }

    pub fn sense_key(&self) -> u8 {
        self.bytes[SENSE_KEY_OFFSET]
    }

    pub fn asc(&self) -> u8 {
        self.bytes[ASC_OFFSET]
    }

    pub fn ascq(&self) -> u8 {
        self.bytes[ASCQ_OFFSET]
    }

    /// True for the "no error" condition
    pub fn is_success(&self) -> bool {
        self.sense_key() == sense_key::NO_SENSE
            && self.asc() == asc::NO_ADDITIONAL_SENSE
            && self.ascq() == ascq::NO_QUALIFIER
    }

    /// Wire form, as returned by REQUEST SENSE
    pub fn as_bytes(&self) -> &[u8; SENSE_DATA_LEN] {
        &self.bytes
    }

    /// Create sense data for invalid/unsupported command opcode
    pub fn invalid_command() -> Self {
        SenseData::new(
            sense_key::ILLEGAL_REQUEST,
            asc::INVALID_COMMAND_OPERATION_CODE,
            ascq::NO_QUALIFIER,
        )
    }

    /// Create sense data for a malformed field in an otherwise known command
    pub fn invalid_field() -> Self {
        SenseData::new(sense_key::ILLEGAL_REQUEST, asc::INVALID_FIELD_IN_CDB, ascq::NO_QUALIFIER)
    }

    /// Create sense data for LBA out of range
    pub fn lba_out_of_range() -> Self {
        SenseData::new(sense_key::ILLEGAL_REQUEST, asc::LBA_OUT_OF_RANGE, ascq::NO_QUALIFIER)
    }

    /// Create sense data for write protected
    pub fn write_protected() -> Self {
        SenseData::new(sense_key::DATA_PROTECT, asc::WRITE_PROTECTED, ascq::NO_QUALIFIER)
    }

    /// Create sense data for a failed block read
    pub fn read_error() -> Self {
        SenseData::new(sense_key::MEDIUM_ERROR, asc::UNRECOVERED_READ_ERROR, ascq::NO_QUALIFIER)
    }

    /// Create sense data for a failed block write
    pub fn write_error() -> Self {
        SenseData::new(sense_key::MEDIUM_ERROR, asc::WRITE_ERROR, ascq::NO_QUALIFIER)
    }

    /// Create sense data for a transport that moved fewer bytes than asked
    pub fn data_phase_error() -> Self {
        SenseData::new(sense_key::ABORTED_COMMAND, asc::DATA_PHASE_ERROR, ascq::NO_QUALIFIER)
    }
}
