//! Transport channel trait
//!
//! The transport moves data-phase bytes between the target and the
//! initiator (for USB mass storage, the bulk IN/OUT endpoints). Both
//! primitives block and report how many bytes they actually moved.

use std::collections::VecDeque;

/// Transport channel trait
pub trait Transport {
    /// Send `data` to the initiator, returning the number of bytes sent
    fn transmit(&mut self, data: &[u8]) -> usize;

    /// Fill `buf` with data from the initiator, returning the number of bytes received
    fn receive(&mut self, buf: &mut [u8]) -> usize;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, data: &[u8]) -> usize {
        (**self).transmit(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        (**self).receive(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&mut self, data: &[u8]) -> usize {
        (**self).transmit(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        (**self).receive(buf)
    }
}

/// In-memory transport
///
/// Everything transmitted is appended to an output buffer; received data
/// is drained from an input queue. Receiving from an empty queue returns
/// a short count, which is how a stalled host looks to the target.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    sent: Vec<u8>,
    incoming: VecDeque<u8>,
    transmit_limit: Option<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the target to receive
    pub fn push_incoming(&mut self, data: &[u8]) {
        self.incoming.extend(data.iter().copied());
    }

    /// Accept at most `limit` more bytes on transmit, then send nothing
    pub fn limit_transmit(&mut self, limit: Option<usize>) {
        self.transmit_limit = limit;
    }

    /// Bytes transmitted so far
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Take and clear the transmitted bytes
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }

    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for MemoryTransport {
    fn transmit(&mut self, data: &[u8]) -> usize {
        let len = match self.transmit_limit.as_mut() {
            Some(limit) => {
                let len = data.len().min(*limit);
                *limit -= len;
                len
            }
            None => data.len(),
        };
        self.sent.extend_from_slice(&data[..len]);
        len
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        let len = buf.len().min(self.incoming.len());
        for (dst, src) in buf.iter_mut().zip(self.incoming.drain(..len)) {
            *dst = src;
        }
        len
    }
}
