//! Big-endian field access for command and response buffers
//!
//! SCSI puts every multi-byte field on the wire most significant byte
//! first. These helpers read and write such fields at fixed byte offsets.
//! Callers are responsible for making sure the buffer is long enough.

use byteorder::{BigEndian, ByteOrder};

/// Read a big-endian u16 starting at `offset`
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    BigEndian::read_u16(&buf[offset..offset + 2])
}

/// Read a big-endian u32 starting at `offset`
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    BigEndian::read_u32(&buf[offset..offset + 4])
}

/// Write `val` as a big-endian u16 starting at `offset`
pub fn write_u16(buf: &mut [u8], offset: usize, val: u16) {
    BigEndian::write_u16(&mut buf[offset..offset + 2], val);
}

/// Write `val` as a big-endian u32 starting at `offset`
pub fn write_u32(buf: &mut [u8], offset: usize, val: u32) {
    BigEndian::write_u32(&mut buf[offset..offset + 4], val);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_is_big_endian() {
        let buf = [0xAA, 0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_u32(&buf, 1), 0x1234_5678);
    }

    #[test]
    fn test_read_u16_is_big_endian() {
        let buf = [0x00, 0x00, 0x01, 0x02];
        assert_eq!(read_u16(&buf, 2), 0x0102);
    }

    #[test]
    fn test_write_then_read() {
        let mut buf = [0u8; 10];
        write_u32(&mut buf, 2, 0xDEAD_BEEF);
        write_u16(&mut buf, 7, 0x0203);

        assert_eq!(&buf[2..6], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&buf[7..9], &[0x02, 0x03]);
        assert_eq!(read_u32(&buf, 2), 0xDEAD_BEEF);
        assert_eq!(read_u16(&buf, 7), 0x0203);
        // Neighbouring bytes untouched
        assert_eq!(buf[0], 0);
        assert_eq!(buf[6], 0);
        assert_eq!(buf[9], 0);
    }
}
