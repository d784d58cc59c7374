//! A small SCSI target command engine
//!
//! This library executes the handful of SCSI block commands a USB mass
//! storage host needs (INQUIRY, REQUEST SENSE, READ CAPACITY(10),
//! READ(10), WRITE(10), MODE SENSE(6), TEST UNIT READY and PREVENT ALLOW
//! MEDIUM REMOVAL). Users implement the `BlockDevice` trait for storage
//! and the `Transport` trait for the data channel to the initiator.
//!
//! # Example
//!
//! ```
//! use scsi_target::{
//!     CommandStatus, MemoryBlockDevice, MemoryTransport, ScsiTarget, ScsiTargetConfig,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScsiTargetConfig::builder()
//!     .vendor_id("ACME")
//!     .product_id("Flash Disk")
//!     .build(MemoryBlockDevice::new(2048, 512), MemoryTransport::new())?;
//!
//! let mut target = ScsiTarget::new();
//! target.start(config);
//!
//! // READ CAPACITY (10)
//! let status = target.dispatch(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0])?;
//! assert_eq!(status, CommandStatus::Passed);
//!
//! let reply = target.config_mut().unwrap().transport.take_sent();
//! assert_eq!(reply, [0, 0, 0x07, 0xFF, 0, 0, 0x02, 0x00]);
//! # Ok(())
//! # }
//! ```

pub mod cdb;
pub mod codec;
pub mod device;
pub mod error;
pub mod response;
pub mod sense;
pub mod target;
pub mod transfer;
pub mod transport;

pub use device::{BlockDevice, BlockDeviceInfo, FileBlockDevice, MemoryBlockDevice};
pub use error::{ScsiResult, ScsiTargetError};
pub use response::InquiryResponse;
pub use sense::SenseData;
pub use target::{CommandStatus, ScsiTarget, ScsiTargetConfig, ScsiTargetConfigBuilder, TargetState};
pub use transport::{MemoryTransport, Transport};

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
