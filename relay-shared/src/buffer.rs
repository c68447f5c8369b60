#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;

use bytes::BytesMut;
use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

/// Largest datagram the relay copies into a packet buffer.
pub const MAX_PACKET_SIZE: usize = 1500;

/// PacketBuffer is a byte buffer with a hard capacity. Writes that would
/// exceed the capacity are rejected and leave the buffer untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_PACKET_SIZE)
    }
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PacketBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Copies `data` into a new buffer of `MAX_PACKET_SIZE` capacity.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut b = Self::new();
        b.extend_from_slice(data)?;
        Ok(b)
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.remaining() {
            return Err(Error::ErrPacketTooBig);
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }
}

impl Deref for PacketBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PacketBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}
