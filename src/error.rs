//! Error types for SCSI target operations

use thiserror::Error;

/// SCSI target errors
///
/// Command failures are reported through sense data, not through this type.
/// These variants cover the engine's own contract violations and failures
/// reported by the block device or configuration.
#[derive(Debug, Error)]
pub enum ScsiTargetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Block device error: {0}")]
    Device(String),

    #[error("Target is not started")]
    NotReady,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for SCSI target operations
pub type ScsiResult<T> = Result<T, ScsiTargetError>;
