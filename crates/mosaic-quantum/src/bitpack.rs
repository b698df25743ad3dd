//! Bit-Packer / Unpacker
//!
//! Samples of arbitrary width (1 to 32 bits) packed most significant bit
//! first into a byte stream.  Each direction keeps its own cursor
//! (`byte_offset`, `bit_offset`) across calls; a depth of 0 resets the
//! cursor to the start of the buffer.
//!
//! The packers never fail.  Bits that would fall past the end of the buffer
//! are dropped on write and read back as zero; callers size buffers with
//! [`quantum_extent`](crate::quantum_extent) beforehand.

#[inline]
fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Writes samples into a byte buffer
#[derive(Debug)]
pub struct BitPacker<'a> {
    buffer: &'a mut [u8],
    byte_offset: usize,
    bit_offset: u32,
}

impl<'a> BitPacker<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Write the low `depth` bits of `value`.  Depth 0 resets the cursor.
    pub fn pack(&mut self, depth: u32, value: u32) {
        if depth == 0 {
            self.byte_offset = 0;
            self.bit_offset = 0;
            return;
        }
        let value = value as u64 & mask(depth);
        let mut remaining = depth;
        while remaining > 0 {
            let available = 8 - self.bit_offset;
            let take = remaining.min(available);
            remaining -= take;
            let bits = ((value >> remaining) & mask(take)) as u8;
            if let Some(byte) = self.buffer.get_mut(self.byte_offset) {
                if self.bit_offset == 0 {
                    *byte = 0;
                }
                *byte |= bits << (available - take);
            }
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
    }

    /// Bytes touched so far, counting a partially filled byte
    pub fn bytes_used(&self) -> usize {
        self.byte_offset + usize::from(self.bit_offset > 0)
    }
}

/// Reads samples from a byte buffer
#[derive(Debug, Clone)]
pub struct BitUnpacker<'a> {
    buffer: &'a [u8],
    byte_offset: usize,
    bit_offset: u32,
}

impl<'a> BitUnpacker<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Read the next `depth` bits.  Depth 0 resets the cursor and returns 0.
    pub fn unpack(&mut self, depth: u32) -> u32 {
        if depth == 0 {
            self.byte_offset = 0;
            self.bit_offset = 0;
            return 0;
        }
        let mut value = 0u64;
        let mut remaining = depth;
        while remaining > 0 {
            let available = 8 - self.bit_offset;
            let take = remaining.min(available);
            remaining -= take;
            let byte = self.buffer.get(self.byte_offset).copied().unwrap_or(0) as u64;
            value = (value << take) | ((byte >> (available - take)) & mask(take));
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        value as u32
    }

    /// Bytes consumed so far, counting a partially read byte
    pub fn bytes_used(&self) -> usize {
        self.byte_offset + usize::from(self.bit_offset > 0)
    }
}
