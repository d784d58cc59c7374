//! Block device trait and storage backends
//!
//! The target never owns storage logic. It drives whatever implements
//! [`BlockDevice`], one block at a time.

use crate::error::{ScsiResult, ScsiTargetError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Geometry reported by a block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDeviceInfo {
    /// Bytes per logical block
    pub block_size: u32,
    /// Total addressable blocks
    pub block_count: u32,
    /// Writes must be rejected
    pub write_protected: bool,
}

/// Block device trait
///
/// Implement this trait to provide the storage backend for the target.
pub trait BlockDevice {
    /// Read blocks from the device
    ///
    /// # Arguments
    /// * `lba` - Logical block address to start reading from
    /// * `buf` - Destination, at least `count * block_size` bytes
    /// * `count` - Number of blocks to read
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8], count: u32) -> ScsiResult<()>;

    /// Write blocks to the device
    ///
    /// # Arguments
    /// * `lba` - Logical block address to start writing to
    /// * `buf` - Source, at least `count * block_size` bytes
    /// * `count` - Number of blocks to write
    fn write_blocks(&mut self, lba: u32, buf: &[u8], count: u32) -> ScsiResult<()>;

    /// Current geometry. Queried on every command, never cached by the target.
    fn info(&self) -> BlockDeviceInfo;
}

impl<B: BlockDevice + ?Sized> BlockDevice for &mut B {
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8], count: u32) -> ScsiResult<()> {
        (**self).read_blocks(lba, buf, count)
    }

    fn write_blocks(&mut self, lba: u32, buf: &[u8], count: u32) -> ScsiResult<()> {
        (**self).write_blocks(lba, buf, count)
    }

    fn info(&self) -> BlockDeviceInfo {
        (**self).info()
    }
}

impl<B: BlockDevice + ?Sized> BlockDevice for Box<B> {
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8], count: u32) -> ScsiResult<()> {
        (**self).read_blocks(lba, buf, count)
    }

    fn write_blocks(&mut self, lba: u32, buf: &[u8], count: u32) -> ScsiResult<()> {
        (**self).write_blocks(lba, buf, count)
    }

    fn info(&self) -> BlockDeviceInfo {
        (**self).info()
    }
}

/// Byte range covered by `count` blocks at `lba`, checked against `len`
fn block_range(
    lba: u32,
    count: u32,
    block_size: u32,
    len: usize,
) -> ScsiResult<std::ops::Range<usize>> {
    let offset = lba as u64 * block_size as u64;
    let bytes = count as u64 * block_size as u64;
    if offset + bytes > len as u64 {
        return Err(ScsiTargetError::Device(format!(
            "access beyond device capacity: LBA {}, blocks {}",
            lba, count
        )));
    }
    Ok(offset as usize..(offset + bytes) as usize)
}

/// Simple in-memory storage backend
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    data: Vec<u8>,
    block_size: u32,
    write_protected: bool,
}

impl MemoryBlockDevice {
    /// Create a zero-filled device of `block_count` blocks
    pub fn new(block_count: u32, block_size: u32) -> Self {
        Self {
            data: vec![0u8; block_count as usize * block_size as usize],
            block_size,
            write_protected: false,
        }
    }

    pub fn set_write_protected(&mut self, write_protected: bool) {
        self.write_protected = write_protected;
    }

    /// Raw contents of the device
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8], count: u32) -> ScsiResult<()> {
        let range = block_range(lba, count, self.block_size, self.data.len())?;
        let len = range.len();
        if buf.len() < len {
            return Err(ScsiTargetError::Device(format!(
                "read buffer too small: got {}, need {}",
                buf.len(),
                len
            )));
        }
        buf[..len].copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_blocks(&mut self, lba: u32, buf: &[u8], count: u32) -> ScsiResult<()> {
        if self.write_protected {
            return Err(ScsiTargetError::Device("device is write protected".into()));
        }
        let range = block_range(lba, count, self.block_size, self.data.len())?;
        let len = range.len();
        if buf.len() < len {
            return Err(ScsiTargetError::Device(format!(
                "write data too short: got {}, need {}",
                buf.len(),
                len
            )));
        }
        self.data[range].copy_from_slice(&buf[..len]);
        Ok(())
    }

    fn info(&self) -> BlockDeviceInfo {
        BlockDeviceInfo {
            block_size: self.block_size,
            block_count: self
                .data
                .len()
                .checked_div(self.block_size as usize)
                .unwrap_or(0) as u32,
            write_protected: self.write_protected,
        }
    }
}

/// Block device backed by a disk image file
#[derive(Debug)]
pub struct FileBlockDevice {
    file: File,
    block_size: u32,
    block_count: u32,
    write_protected: bool,
}

impl FileBlockDevice {
    /// Open an image file. Trailing bytes that do not fill a whole block are ignored.
    pub fn open(file: File, block_size: u32, write_protected: bool) -> ScsiResult<Self> {
        if block_size == 0 {
            return Err(ScsiTargetError::Config("block size must be non-zero".into()));
        }
        let len = file.metadata()?.len();
        let block_count = u32::try_from(len / block_size as u64).map_err(|_| {
            ScsiTargetError::Config(format!("image of {} bytes has too many blocks", len))
        })?;

        Ok(Self {
            file,
            block_size,
            block_count,
            write_protected,
        })
    }

    fn seek_to(&mut self, lba: u32, count: u32) -> ScsiResult<usize> {
        if lba as u64 + count as u64 > self.block_count as u64 {
            return Err(ScsiTargetError::Device(format!(
                "access beyond device capacity: LBA {}, blocks {}",
                lba, count
            )));
        }
        self.file
            .seek(SeekFrom::Start(lba as u64 * self.block_size as u64))?;
        Ok(count as usize * self.block_size as usize)
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8], count: u32) -> ScsiResult<()> {
        let len = self.seek_to(lba, count)?;
        if buf.len() < len {
            return Err(ScsiTargetError::Device(format!(
                "read buffer too small: got {}, need {}",
                buf.len(),
                len
            )));
        }
        self.file.read_exact(&mut buf[..len])?;
        Ok(())
    }

    fn write_blocks(&mut self, lba: u32, buf: &[u8], count: u32) -> ScsiResult<()> {
        if self.write_protected {
            return Err(ScsiTargetError::Device("device is write protected".into()));
        }
        let len = self.seek_to(lba, count)?;
        if buf.len() < len {
            return Err(ScsiTargetError::Device(format!(
                "write data too short: got {}, need {}",
                buf.len(),
                len
            )));
        }
        self.file.write_all(&buf[..len])?;
        Ok(())
    }

    fn info(&self) -> BlockDeviceInfo {
        BlockDeviceInfo {
            block_size: self.block_size,
            block_count: self.block_count,
            write_protected: self.write_protected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_device_info() {
        let dev = MemoryBlockDevice::new(1000, 512);
        let info = dev.info();
        assert_eq!(info.block_size, 512);
        assert_eq!(info.block_count, 1000);
        assert!(!info.write_protected);
    }

    #[test]
    fn test_memory_device_read_write() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        let block = [0xA5u8; 16];
        dev.write_blocks(2, &block, 1).unwrap();

        let mut out = [0u8; 32];
        dev.read_blocks(1, &mut out, 2).unwrap();
        assert!(out[..16].iter().all(|&b| b == 0));
        assert!(out[16..].iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn test_memory_device_out_of_range() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        let mut out = [0u8; 32];
        assert!(dev.read_blocks(3, &mut out, 2).is_err());
        assert!(dev.write_blocks(4, &out, 1).is_err());
    }

    #[test]
    fn test_memory_device_write_protect() {
        let mut dev = MemoryBlockDevice::new(4, 16);
        dev.set_write_protected(true);
        assert!(dev.info().write_protected);
        assert!(dev.write_blocks(0, &[1u8; 16], 1).is_err());
        assert!(dev.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn fill_last<D: BlockDevice>(mut dev: D) {
            let info = dev.info();
            dev.write_blocks(info.block_count - 1, &[7u8; 8], 1).unwrap();
        }

        let mut dev = MemoryBlockDevice::new(2, 8);
        fill_last(&mut dev);
        assert_eq!(&dev.data()[8..], &[7u8; 8]);
    }

    #[test]
    fn test_file_device_read_write() {
        let path = std::env::temp_dir().join(format!("scsi-target-{}.img", std::process::id()));
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.set_len(4 * 512 + 100).unwrap();

        let mut dev = FileBlockDevice::open(file, 512, false).unwrap();
        assert_eq!(dev.info().block_count, 4);

        dev.write_blocks(3, &[0x5Au8; 512], 1).unwrap();
        let mut out = vec![0u8; 512];
        dev.read_blocks(3, &mut out, 1).unwrap();
        assert!(out.iter().all(|&b| b == 0x5A));
        assert!(dev.read_blocks(4, &mut out, 1).is_err());

        drop(dev);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_device_rejects_zero_block_size() {
        let path = std::env::temp_dir().join(format!("scsi-target-zero-{}.img", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        let result = FileBlockDevice::open(file, 0, false);
        assert!(matches!(result, Err(ScsiTargetError::Config(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
