//! Data-phase handling for READ(10) and WRITE(10)
//!
//! A request is validated against the device geometry once, before any
//! I/O. The copy loop then moves one block at a time through the working
//! buffer, stopping at the first device error or short transport transfer.

use crate::cdb::DataRequest;
use crate::device::{BlockDevice, BlockDeviceInfo};
use crate::sense::SenseData;
use crate::transport::Transport;

/// Direction of a block transfer, seen from the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to initiator
    Read,
    /// Initiator to device
    Write,
}

/// Transport wrapper that turns short transfers into a residue
///
/// This is the only place where the residue is written.
pub struct DataPhase<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    residue: &'a mut u32,
}

impl<'a, T: Transport + ?Sized> DataPhase<'a, T> {
    pub fn new(transport: &'a mut T, residue: &'a mut u32) -> Self {
        Self { transport, residue }
    }

    /// Send `data`; on a short send record the shortfall and return false
    pub fn transmit(&mut self, data: &[u8]) -> bool {
        let sent = self.transport.transmit(data);
        self.record(data.len(), sent)
    }

    /// Fill `buf`; on a short receive record the shortfall and return false
    pub fn receive(&mut self, buf: &mut [u8]) -> bool {
        let received = self.transport.receive(buf);
        self.record(buf.len(), received)
    }

    /// Add bytes that were never attempted to the recorded residue
    pub fn add_residue(&mut self, bytes: u64) {
        *self.residue = (*self.residue as u64 + bytes).min(u32::MAX as u64) as u32;
    }

    fn record(&mut self, requested: usize, moved: usize) -> bool {
        let residue = requested.saturating_sub(moved);
        if residue > 0 {
            *self.residue = u32::try_from(residue).unwrap_or(u32::MAX);
            log::warn!("short transfer: {} of {} bytes moved", moved, requested);
            false
        } else {
            true
        }
    }
}

/// Check that the whole requested range lies on the device
pub fn validate_request(request: &DataRequest, info: &BlockDeviceInfo) -> Result<(), SenseData> {
    if request.end_lba() > info.block_count as u64 {
        log::warn!(
            "LBA range {}+{} exceeds device capacity of {} blocks",
            request.first_lba,
            request.block_count,
            info.block_count
        );
        return Err(SenseData::lba_out_of_range());
    }
    Ok(())
}

/// Check that the device accepts writes
pub fn check_writable(info: &BlockDeviceInfo) -> Result<(), SenseData> {
    if info.write_protected {
        log::warn!("write rejected: device is write protected");
        return Err(SenseData::write_protected());
    }
    Ok(())
}

/// Copy `request.block_count` blocks between the device and the transport
///
/// The request must already have passed [`validate_request`].
pub fn run_transfer<D, T>(
    direction: Direction,
    request: &DataRequest,
    device: &mut D,
    phase: &mut DataPhase<'_, T>,
    buffer: &mut Vec<u8>,
) -> Result<(), SenseData>
where
    D: BlockDevice + ?Sized,
    T: Transport + ?Sized,
{
    let block_size = device.info().block_size as usize;
    if buffer.len() < block_size {
        buffer.resize(block_size, 0);
    }
    let block = &mut buffer[..block_size];

    for i in 0..request.block_count as u32 {
        let lba = request.first_lba + i;
        let remaining = (request.block_count as u32 - i - 1) as u64 * block_size as u64;

        match direction {
            Direction::Read => {
                if let Err(e) = device.read_blocks(lba, block, 1) {
                    log::warn!("read of LBA {} failed: {}", lba, e);
                    return Err(SenseData::read_error());
                }
                if !phase.transmit(block) {
                    phase.add_residue(remaining);
                    return Err(SenseData::data_phase_error());
                }
            }
            Direction::Write => {
                if !phase.receive(block) {
                    phase.add_residue(remaining);
                    return Err(SenseData::data_phase_error());
                }
                if let Err(e) = device.write_blocks(lba, block, 1) {
                    log::warn!("write of LBA {} failed: {}", lba, e);
                    return Err(SenseData::write_error());
                }
            }
        }
    }

    log::trace!(
        "{:?} of {} blocks at LBA {} complete",
        direction,
        request.block_count,
        request.first_lba
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryBlockDevice;
    use crate::sense::{asc, sense_key};
    use crate::transport::MemoryTransport;

    fn request(first_lba: u32, block_count: u16) -> DataRequest {
        DataRequest {
            first_lba,
            block_count,
        }
    }

    fn patterned_device(block_count: u32, block_size: u32) -> MemoryBlockDevice {
        let mut dev = MemoryBlockDevice::new(block_count, block_size);
        for (i, b) in dev.data_mut().iter_mut().enumerate() {
            *b = (i / block_size as usize) as u8;
        }
        dev
    }

    #[test]
    fn test_validate_request_bounds() {
        let info = MemoryBlockDevice::new(100, 512).info();
        assert!(validate_request(&request(0, 100), &info).is_ok());
        assert!(validate_request(&request(99, 1), &info).is_ok());
        assert!(validate_request(&request(100, 0), &info).is_ok());

        let sense = validate_request(&request(99, 2), &info).unwrap_err();
        assert_eq!(sense.sense_key(), sense_key::ILLEGAL_REQUEST);
        assert_eq!(sense.asc(), asc::LBA_OUT_OF_RANGE);
    }

    #[test]
    fn test_validate_request_no_wraparound() {
        let info = MemoryBlockDevice::new(100, 512).info();
        assert!(validate_request(&request(u32::MAX, 2), &info).is_err());
    }

    #[test]
    fn test_phase_records_shortfall() {
        let mut tr = MemoryTransport::new();
        tr.limit_transmit(Some(10));
        let mut residue = 0;

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        assert!(!phase.transmit(&[0u8; 16]));
        assert_eq!(residue, 6);
    }

    #[test]
    fn test_phase_full_transfer_leaves_residue() {
        let mut tr = MemoryTransport::new();
        let mut residue = 42;

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        assert!(phase.transmit(&[0u8; 16]));
        assert_eq!(residue, 42);
    }

    #[test]
    fn test_read_transfer() {
        let mut dev = patterned_device(8, 16);
        let mut tr = MemoryTransport::new();
        let mut residue = 0;
        let mut buffer = vec![0u8; 16];

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        run_transfer(Direction::Read, &request(2, 3), &mut dev, &mut phase, &mut buffer).unwrap();

        let sent = tr.sent();
        assert_eq!(sent.len(), 48);
        assert!(sent[..16].iter().all(|&b| b == 2));
        assert!(sent[32..].iter().all(|&b| b == 4));
        assert_eq!(residue, 0);
    }

    #[test]
    fn test_write_transfer() {
        let mut dev = MemoryBlockDevice::new(8, 16);
        let mut tr = MemoryTransport::new();
        tr.push_incoming(&[0x11u8; 16]);
        tr.push_incoming(&[0x22u8; 16]);
        let mut residue = 0;
        let mut buffer = Vec::new();

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        run_transfer(Direction::Write, &request(6, 2), &mut dev, &mut phase, &mut buffer).unwrap();

        assert!(dev.data()[96..112].iter().all(|&b| b == 0x11));
        assert!(dev.data()[112..].iter().all(|&b| b == 0x22));
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn test_short_read_aborts_with_residue() {
        let mut dev = patterned_device(8, 16);
        let mut tr = MemoryTransport::new();
        tr.limit_transmit(Some(20)); // Block 0 complete, 4 bytes of block 1
        let mut residue = 0;
        let mut buffer = vec![0u8; 16];

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        let sense = run_transfer(Direction::Read, &request(0, 4), &mut dev, &mut phase, &mut buffer)
            .unwrap_err();

        assert_eq!(sense.sense_key(), sense_key::ABORTED_COMMAND);
        assert_eq!(sense.asc(), asc::DATA_PHASE_ERROR);
        // 12 bytes short in block 1, blocks 2 and 3 never sent
        assert_eq!(residue, 12 + 32);
    }

    #[test]
    fn test_short_write_does_not_touch_device() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        let mut tr = MemoryTransport::new();
        tr.push_incoming(&[0xEEu8; 8]);
        let mut residue = 0;
        let mut buffer = vec![0u8; 16];

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        assert!(run_transfer(Direction::Write, &request(0, 1), &mut dev, &mut phase, &mut buffer).is_err());
        assert_eq!(residue, 8);
        assert!(dev.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_device_write_error() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        dev.set_write_protected(true);
        let mut tr = MemoryTransport::new();
        tr.push_incoming(&[1u8; 32]);
        let mut residue = 0;
        let mut buffer = vec![0u8; 16];

        let mut phase = DataPhase::new(&mut tr, &mut residue);
        let sense = run_transfer(Direction::Write, &request(0, 2), &mut dev, &mut phase, &mut buffer)
            .unwrap_err();

        assert_eq!(sense, SenseData::write_error());
        // Second block was never received
        assert_eq!(tr.pending_incoming(), 16);
    }

    #[test]
    fn test_check_writable() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        assert!(check_writable(&dev.info()).is_ok());
        dev.set_write_protected(true);
        assert_eq!(check_writable(&dev.info()), Err(SenseData::write_protected()));
    }
}
