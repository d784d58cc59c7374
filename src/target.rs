//! SCSI target engine
//!
//! This module provides the target state machine, its configuration
//! builder, and the command dispatcher.

use crate::cdb::{DataRequest, ScsiOpcode};
use crate::device::BlockDevice;
use crate::error::{ScsiResult, ScsiTargetError};
use crate::response::{self, InquiryResponse};
use crate::sense::{SenseData, SENSE_DATA_LEN};
use crate::transfer::{self, DataPhase, Direction};
use crate::transport::Transport;

/// Lifecycle state of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetState {
    /// Initial state, and the state after `stop`
    #[default]
    Stopped,
    /// Configured and accepting commands
    Ready,
}

/// Outcome of a dispatched command
///
/// On `Failed` the sense data describes why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Passed,
    Failed,
}

impl CommandStatus {
    pub fn is_passed(self) -> bool {
        self == CommandStatus::Passed
    }
}

/// Handler selected for an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandler {
    Inquiry,
    RequestSense,
    ReadCapacity10,
    ModeSense6,
    ReadWrite10(Direction),
    /// Required by hosts but has nothing to do: always succeeds
    Ignored,
    /// Not supported: always fails with INVALID COMMAND OPERATION CODE
    Unhandled,
}

impl CommandHandler {
    pub fn for_opcode(opcode: u8) -> Self {
        match ScsiOpcode::from_u8(opcode) {
            Some(ScsiOpcode::Inquiry) => CommandHandler::Inquiry,
            Some(ScsiOpcode::RequestSense) => CommandHandler::RequestSense,
            Some(ScsiOpcode::ReadCapacity10) => CommandHandler::ReadCapacity10,
            Some(ScsiOpcode::ModeSense6) => CommandHandler::ModeSense6,
            Some(ScsiOpcode::Read10) => CommandHandler::ReadWrite10(Direction::Read),
            Some(ScsiOpcode::Write10) => CommandHandler::ReadWrite10(Direction::Write),
            Some(ScsiOpcode::TestUnitReady) | Some(ScsiOpcode::PreventAllowMediumRemoval) => {
                CommandHandler::Ignored
            }
            None => CommandHandler::Unhandled,
        }
    }
}

/// Everything the target needs while it is running
pub struct ScsiTargetConfig<D: BlockDevice, T: Transport> {
    /// Storage backend
    pub device: D,
    /// Data-phase channel to the initiator
    pub transport: T,
    /// Payload returned by INQUIRY
    pub inquiry: InquiryResponse,
    /// Working buffer for block transfers, reused block by block
    pub block_buffer: Vec<u8>,
}

impl<D: BlockDevice, T: Transport> ScsiTargetConfig<D, T> {
    /// Create a new builder for configuring the target
    pub fn builder() -> ScsiTargetConfigBuilder<D, T> {
        ScsiTargetConfigBuilder::new()
    }
}

/// Builder for a target configuration
pub struct ScsiTargetConfigBuilder<D: BlockDevice, T: Transport> {
    vendor_id: Option<String>,
    product_id: Option<String>,
    product_rev: Option<String>,
    removable: bool,
    inquiry: Option<InquiryResponse>,
    buffer_size: Option<usize>,
    _phantom: std::marker::PhantomData<(D, T)>,
}

impl<D: BlockDevice, T: Transport> ScsiTargetConfigBuilder<D, T> {
    fn new() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            product_rev: None,
            removable: true,
            inquiry: None,
            buffer_size: None,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Set the vendor identification (8 chars max, default: "SCSI")
    pub fn vendor_id(mut self, vendor: &str) -> Self {
        self.vendor_id = Some(vendor.to_string());
        self
    }

    /// Set the product identification (16 chars max, default: "Virtual Disk")
    pub fn product_id(mut self, product: &str) -> Self {
        self.product_id = Some(product.to_string());
        self
    }

    /// Set the product revision (4 chars max, default: "1.0")
    pub fn product_rev(mut self, rev: &str) -> Self {
        self.product_rev = Some(rev.to_string());
        self
    }

    /// Report removable medium in INQUIRY (default: true)
    pub fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    /// Use a prebuilt INQUIRY payload; overrides the identification setters
    pub fn inquiry(mut self, inquiry: InquiryResponse) -> Self {
        self.inquiry = Some(inquiry);
        self
    }

    /// Working buffer size in bytes (default: one device block)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    /// Build the configuration for the given device and transport
    pub fn build(self, device: D, transport: T) -> ScsiResult<ScsiTargetConfig<D, T>> {
        let info = device.info();
        if info.block_size == 0 {
            return Err(ScsiTargetError::Config(
                "device reports a block size of zero".to_string(),
            ));
        }

        let inquiry = match self.inquiry {
            Some(inquiry) => inquiry,
            None => InquiryResponse::new(
                self.vendor_id.as_deref().unwrap_or("SCSI"),
                self.product_id.as_deref().unwrap_or("Virtual Disk"),
                self.product_rev.as_deref().unwrap_or("1.0"),
                self.removable,
            )?,
        };

        let buffer_size = self
            .buffer_size
            .unwrap_or(0)
            .max(info.block_size as usize);

        Ok(ScsiTargetConfig {
            device,
            transport,
            inquiry,
            block_buffer: vec![0u8; buffer_size],
        })
    }
}

/// SCSI target engine
///
/// Holds the sense condition, the residue of the last data-bearing command
/// and, while started, the configuration. Commands run to completion on the
/// caller's thread.
pub struct ScsiTarget<D: BlockDevice, T: Transport> {
    state: TargetState,
    config: Option<ScsiTargetConfig<D, T>>,
    sense: SenseData,
    residue: u32,
}

impl<D: BlockDevice, T: Transport> Default for ScsiTarget<D, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: BlockDevice, T: Transport> ScsiTarget<D, T> {
    /// Create a stopped target with no configuration
    pub fn new() -> Self {
        ScsiTarget {
            state: TargetState::Stopped,
            config: None,
            sense: SenseData::zeroed(),
            residue: 0,
        }
    }

    /// Return the target to its freshly created state
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Bind a configuration and start accepting commands
    ///
    /// Returns the previously bound configuration, if the target was
    /// already started.
    pub fn start(&mut self, config: ScsiTargetConfig<D, T>) -> Option<ScsiTargetConfig<D, T>> {
        let info = config.device.info();
        log::info!(
            "SCSI target starting: {} blocks of {} bytes{}",
            info.block_count,
            info.block_size,
            if info.write_protected { ", write protected" } else { "" }
        );
        let previous = self.config.replace(config);
        self.state = TargetState::Ready;
        previous
    }

    /// Stop accepting commands and hand the configuration back
    pub fn stop(&mut self) -> Option<ScsiTargetConfig<D, T>> {
        log::info!("SCSI target stopped");
        self.state = TargetState::Stopped;
        self.config.take()
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Bytes the transport failed to move during the last command
    pub fn residue(&self) -> u32 {
        self.residue
    }

    /// Current sense condition
    pub fn sense(&self) -> &SenseData {
        &self.sense
    }

    pub fn config(&self) -> Option<&ScsiTargetConfig<D, T>> {
        self.config.as_ref()
    }

    pub fn config_mut(&mut self) -> Option<&mut ScsiTargetConfig<D, T>> {
        self.config.as_mut()
    }

    /// Execute one command descriptor block
    ///
    /// Returns `Err(NotReady)` if the target has not been started. Every
    /// other outcome is reported as a [`CommandStatus`], with the sense
    /// condition updated on failure.
    pub fn dispatch(&mut self, cdb: &[u8]) -> ScsiResult<CommandStatus> {
        let config = match (self.state, self.config.as_mut()) {
            (TargetState::Ready, Some(config)) => config,
            _ => {
                log::warn!("command rejected: target not started");
                return Err(ScsiTargetError::NotReady);
            }
        };

        // Overwritten below in case of error
        self.sense.set_success();
        self.residue = 0;

        let handler = match cdb.first() {
            Some(&opcode) => CommandHandler::for_opcode(opcode),
            None => CommandHandler::Unhandled,
        };
        log::debug!("CDB {} -> {:?}", hex::encode(cdb), handler);

        let min_len = cdb
            .first()
            .and_then(|&op| ScsiOpcode::from_u8(op))
            .map_or(0, ScsiOpcode::cdb_len);

        let result = if cdb.len() < min_len {
            Err(SenseData::invalid_field())
        } else {
            match handler {
                CommandHandler::Inquiry => inquiry(config, &mut self.residue, cdb),
                CommandHandler::RequestSense => {
                    request_sense(config, &self.sense, &mut self.residue, cdb)
                }
                CommandHandler::ReadCapacity10 => read_capacity10(config, &mut self.residue),
                CommandHandler::ModeSense6 => mode_sense6(config, &mut self.residue),
                CommandHandler::ReadWrite10(direction) => {
                    read_write10(config, &mut self.residue, direction, cdb)
                }
                CommandHandler::Ignored => Ok(()),
                CommandHandler::Unhandled => Err(SenseData::invalid_command()),
            }
        };

        match result {
            Ok(()) => Ok(CommandStatus::Passed),
            Err(sense) => {
                log::warn!(
                    "command {:#04x} failed: key={:#04x} asc={:#04x} ascq={:#04x}, residue {}",
                    cdb.first().copied().unwrap_or_default(),
                    sense.sense_key(),
                    sense.asc(),
                    sense.ascq(),
                    self.residue
                );
                self.sense.replace(sense);
                Ok(CommandStatus::Failed)
            }
        }
    }
}

/// Send a fixed reply, failing the command on a short transmit
fn send_reply<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    residue: &mut u32,
    data: &[u8],
) -> Result<(), SenseData> {
    let mut phase = DataPhase::new(&mut config.transport, residue);
    if phase.transmit(data) {
        Ok(())
    } else {
        Err(SenseData::data_phase_error())
    }
}

/// Handle INQUIRY (0x12)
fn inquiry<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    residue: &mut u32,
    cdb: &[u8],
) -> Result<(), SenseData> {
    // EVPD and the obsolete CMDDT bit, then the page code
    if cdb[1] & 0b11 != 0 || cdb[2] != 0 {
        return Err(SenseData::invalid_field());
    }
    let payload = *config.inquiry.as_bytes();
    send_reply(config, residue, &payload)
}

/// Handle REQUEST SENSE (0x03)
fn request_sense<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    sense: &SenseData,
    residue: &mut u32,
    cdb: &[u8],
) -> Result<(), SenseData> {
    if cdb[1..4].iter().any(|&b| b != 0) || cdb[4] as usize != SENSE_DATA_LEN {
        return Err(SenseData::invalid_field());
    }
    send_reply(config, residue, sense.as_bytes())
}

/// Handle READ CAPACITY (10) - 0x25
fn read_capacity10<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    residue: &mut u32,
) -> Result<(), SenseData> {
    let data = response::read_capacity10(&config.device.info());
    send_reply(config, residue, &data)
}

/// Handle MODE SENSE (6) - 0x1A
fn mode_sense6<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    residue: &mut u32,
) -> Result<(), SenseData> {
    let data = response::mode_sense6(&config.device.info());
    send_reply(config, residue, &data)
}

/// Handle READ (10) - 0x28 and WRITE (10) - 0x2A
fn read_write10<D: BlockDevice, T: Transport>(
    config: &mut ScsiTargetConfig<D, T>,
    residue: &mut u32,
    direction: Direction,
    cdb: &[u8],
) -> Result<(), SenseData> {
    let request = DataRequest::decode(cdb).ok_or_else(SenseData::invalid_field)?;
    let info = config.device.info();

    transfer::validate_request(&request, &info)?;
    if direction == Direction::Write {
        transfer::check_writable(&info)?;
    }

    let ScsiTargetConfig {
        device,
        transport,
        block_buffer,
        ..
    } = config;
    let mut phase = DataPhase::new(transport, residue);
    transfer::run_transfer(direction, &request, device, &mut phase, block_buffer)
}
