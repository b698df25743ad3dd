//! Sample layouts
//!
//! [`QuantumFormat::new`] is the dispatch table of the transfer engine: it
//! maps a `(QuantumType, depth)` pair to the channels moved per pixel and
//! the [`Layout`] their samples take in the byte stream.  Export writes
//! through a [`SampleWriter`] and import reads through a [`SampleReader`];
//! the two are kept as exact mirrors, layout by layout.
//!
//! Multi-byte samples are little-endian when the image endianness is
//! [`Endian::Lsb`] and big-endian otherwise.

use crate::bitpack::{BitPacker, BitUnpacker};
use crate::quantum_type::{Channel, QuantumType};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use mosaic_core::quantum::depth_max;
use mosaic_core::{Endian, Error, Result};

/// Depths the transfer engine supports
pub const SUPPORTED_DEPTHS: [u32; 8] = [1, 2, 4, 8, 10, 12, 16, 32];

const RGB_WORD_SHIFTS: [u32; 3] = [22, 12, 2];

/// How samples are laid out in the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Bit-packed, most significant bit first, no padding
    Bits(u32),
    /// One byte per sample
    Byte,
    /// 16 bits per sample
    Short,
    /// 32 bits per sample
    Long,
    /// Three 10-bit gray samples per 32-bit word, at bits 0, 10 and 20
    GrayWord10,
    /// One 32-bit word per pixel, red/green/blue at bits 22, 12 and 2
    RgbWord10,
    /// 12-bit samples left-justified in 16-bit words
    Justified12,
}

impl Layout {
    /// True if `pad` bytes follow each pixel (or each word)
    pub fn is_padded(self) -> bool {
        !matches!(self, Layout::Bits(_))
    }
}

/// Channels and layout of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantumFormat {
    pub quantum_type: QuantumType,
    pub depth: u32,
    pub channels: &'static [Channel],
    pub layout: Layout,
}

impl QuantumFormat {
    /// Look up the format for a quantum type at a depth.
    ///
    /// # Errors
    ///
    /// [`Error::ImageDepthNotSupported`] for depths outside
    /// [`SUPPORTED_DEPTHS`].
    pub fn new(quantum_type: QuantumType, depth: u32) -> Result<Self> {
        let layout = match (quantum_type, depth) {
            (QuantumType::GrayPad, 10) => Layout::GrayWord10,
            (QuantumType::RgbPad, 10) => Layout::RgbWord10,
            (QuantumType::GrayPad | QuantumType::RgbPad, 12) => Layout::Justified12,
            (_, 1 | 2 | 4 | 10 | 12) => Layout::Bits(depth),
            (_, 8) => Layout::Byte,
            (_, 16) => Layout::Short,
            (_, 32) => Layout::Long,
            _ => return Err(Error::ImageDepthNotSupported(depth)),
        };
        Ok(Self {
            quantum_type,
            depth,
            channels: quantum_type.channels(),
            layout,
        })
    }

    /// Largest sample value
    pub fn sample_max(&self) -> u64 {
        depth_max(self.depth)
    }

    /// Exact byte length of a transfer of `pixels` pixels
    pub fn extent(&self, pad: usize, pixels: usize) -> usize {
        let ch = self.channels.len();
        match self.layout {
            Layout::Bits(depth) => (pixels * ch * depth as usize).div_ceil(8),
            Layout::Byte => pixels * (ch + pad),
            Layout::Short | Layout::Justified12 => pixels * (2 * ch + pad),
            Layout::Long => pixels * (4 * ch + pad),
            Layout::GrayWord10 => pixels.div_ceil(3) * (4 + pad),
            Layout::RgbWord10 => pixels * (4 + pad),
        }
    }
}

/// Byte length of a quantum transfer.
///
/// ```
/// use mosaic_quantum::{QuantumType, quantum_extent};
///
/// assert_eq!(quantum_extent(QuantumType::Rgb, 8, 1, 10).unwrap(), 40);
/// assert_eq!(quantum_extent(QuantumType::Gray, 1, 0, 10).unwrap(), 2);
/// ```
pub fn quantum_extent(
    quantum_type: QuantumType,
    depth: u32,
    pad: usize,
    pixels: usize,
) -> Result<usize> {
    Ok(QuantumFormat::new(quantum_type, depth)?.extent(pad, pixels))
}

enum Sink<'a> {
    Bits(BitPacker<'a>),
    Bytes { buffer: &'a mut [u8], pos: usize },
}

/// Writes samples in a [`Layout`]
pub(crate) struct SampleWriter<'a> {
    layout: Layout,
    lsb: bool,
    pad: usize,
    sink: Sink<'a>,
    word: u32,
    slot: usize,
}

impl<'a> SampleWriter<'a> {
    pub fn new(format: &QuantumFormat, endian: Endian, pad: usize, buffer: &'a mut [u8]) -> Self {
        let sink = match format.layout {
            Layout::Bits(_) => {
                let mut packer = BitPacker::new(buffer);
                packer.pack(0, 0);
                Sink::Bits(packer)
            }
            _ => Sink::Bytes { buffer, pos: 0 },
        };
        Self {
            layout: format.layout,
            lsb: endian.is_lsb(),
            pad,
            sink,
            word: 0,
            slot: 0,
        }
    }

    fn bytes(&mut self, data: &[u8]) {
        if let Sink::Bytes { buffer, pos } = &mut self.sink {
            buffer[*pos..*pos + data.len()].copy_from_slice(data);
            *pos += data.len();
        }
    }

    fn short(&mut self, value: u16) {
        let mut b = [0u8; 2];
        if self.lsb {
            LittleEndian::write_u16(&mut b, value);
        } else {
            BigEndian::write_u16(&mut b, value);
        }
        self.bytes(&b);
    }

    fn long(&mut self, value: u32) {
        let mut b = [0u8; 4];
        if self.lsb {
            LittleEndian::write_u32(&mut b, value);
        } else {
            BigEndian::write_u32(&mut b, value);
        }
        self.bytes(&b);
    }

    fn padding(&mut self) {
        if let Sink::Bytes { buffer, pos } = &mut self.sink {
            buffer[*pos..*pos + self.pad].fill(0);
            *pos += self.pad;
        }
    }

    fn flush_word(&mut self) {
        let word = std::mem::take(&mut self.word);
        self.slot = 0;
        self.long(word);
        self.padding();
    }

    /// Write one sample
    pub fn put(&mut self, value: u32) {
        match self.layout {
            Layout::Bits(depth) => {
                if let Sink::Bits(packer) = &mut self.sink {
                    packer.pack(depth, value);
                }
            }
            Layout::Byte => self.bytes(&[value as u8]),
            Layout::Short => self.short(value as u16),
            Layout::Long => self.long(value),
            Layout::Justified12 => self.short(((value & 0xfff) << 4) as u16),
            Layout::GrayWord10 => {
                self.word |= (value & 0x3ff) << (10 * self.slot);
                self.slot += 1;
                if self.slot == 3 {
                    self.flush_word();
                }
            }
            Layout::RgbWord10 => {
                self.word |= (value & 0x3ff) << RGB_WORD_SHIFTS[self.slot.min(2)];
                self.slot += 1;
            }
        }
    }

    /// Close one pixel
    pub fn end_pixel(&mut self) {
        match self.layout {
            Layout::Bits(_) | Layout::GrayWord10 => {}
            Layout::RgbWord10 => self.flush_word(),
            Layout::Byte | Layout::Short | Layout::Long | Layout::Justified12 => self.padding(),
        }
    }

    /// Flush a partial word; returns the bytes written
    pub fn finish(mut self) -> usize {
        if self.layout == Layout::GrayWord10 && self.slot > 0 {
            self.flush_word();
        }
        match &self.sink {
            Sink::Bits(packer) => packer.bytes_used(),
            Sink::Bytes { pos, .. } => *pos,
        }
    }
}

enum Source<'a> {
    Bits(BitUnpacker<'a>),
    Bytes { buffer: &'a [u8], pos: usize },
}

/// Reads samples in a [`Layout`]
pub(crate) struct SampleReader<'a> {
    layout: Layout,
    lsb: bool,
    pad: usize,
    source: Source<'a>,
    word: u32,
    slot: usize,
}

impl<'a> SampleReader<'a> {
    pub fn new(format: &QuantumFormat, endian: Endian, pad: usize, buffer: &'a [u8]) -> Self {
        let source = match format.layout {
            Layout::Bits(_) => {
                let mut unpacker = BitUnpacker::new(buffer);
                unpacker.unpack(0);
                Source::Bits(unpacker)
            }
            _ => Source::Bytes { buffer, pos: 0 },
        };
        Self {
            layout: format.layout,
            lsb: endian.is_lsb(),
            pad,
            source,
            word: 0,
            slot: 0,
        }
    }

    fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Source::Bytes { buffer, pos } = &mut self.source {
            out.copy_from_slice(&buffer[*pos..*pos + N]);
            *pos += N;
        }
        out
    }

    fn short(&mut self) -> u16 {
        let b = self.bytes::<2>();
        if self.lsb {
            LittleEndian::read_u16(&b)
        } else {
            BigEndian::read_u16(&b)
        }
    }

    fn long(&mut self) -> u32 {
        let b = self.bytes::<4>();
        if self.lsb {
            LittleEndian::read_u32(&b)
        } else {
            BigEndian::read_u32(&b)
        }
    }

    fn skip_padding(&mut self) {
        if let Source::Bytes { pos, .. } = &mut self.source {
            *pos += self.pad;
        }
    }

    /// Read one sample
    pub fn get(&mut self) -> u32 {
        match self.layout {
            Layout::Bits(depth) => match &mut self.source {
                Source::Bits(unpacker) => unpacker.unpack(depth),
                Source::Bytes { .. } => 0,
            },
            Layout::Byte => self.bytes::<1>()[0] as u32,
            Layout::Short => self.short() as u32,
            Layout::Long => self.long(),
            Layout::Justified12 => (self.short() >> 4) as u32,
            Layout::GrayWord10 => {
                if self.slot == 0 {
                    self.word = self.long();
                }
                let value = (self.word >> (10 * self.slot)) & 0x3ff;
                self.slot += 1;
                if self.slot == 3 {
                    self.slot = 0;
                    self.skip_padding();
                }
                value
            }
            Layout::RgbWord10 => {
                if self.slot == 0 {
                    self.word = self.long();
                }
                let value = (self.word >> RGB_WORD_SHIFTS[self.slot.min(2)]) & 0x3ff;
                self.slot += 1;
                value
            }
        }
    }

    /// Close one pixel
    pub fn end_pixel(&mut self) {
        match self.layout {
            Layout::Bits(_) | Layout::GrayWord10 => {}
            Layout::RgbWord10 => {
                self.slot = 0;
                self.skip_padding();
            }
            Layout::Byte | Layout::Short | Layout::Long | Layout::Justified12 => {
                self.skip_padding()
            }
        }
    }

    /// Skip the rest of a partial word; returns the bytes consumed
    pub fn finish(mut self) -> usize {
        if self.layout == Layout::GrayWord10 && self.slot > 0 {
            self.skip_padding();
        }
        match &self.source {
            Source::Bits(unpacker) => unpacker.bytes_used(),
            Source::Bytes { pos, .. } => *pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        let f = QuantumFormat::new(QuantumType::GrayPad, 10).unwrap();
        assert_eq!(f.layout, Layout::GrayWord10);
        let f = QuantumFormat::new(QuantumType::Gray, 10).unwrap();
        assert_eq!(f.layout, Layout::Bits(10));
        let f = QuantumFormat::new(QuantumType::RgbPad, 8).unwrap();
        assert_eq!(f.layout, Layout::Byte);
        assert_eq!(f.sample_max(), 255);
        for depth in [0, 3, 24, 64] {
            let err = QuantumFormat::new(QuantumType::Rgb, depth).unwrap_err();
            assert_eq!(err.reason(), "ImageDepthNotSupported");
        }
    }

    #[test]
    fn test_extent() {
        let extent = |t, d, pad, n| quantum_extent(t, d, pad, n).unwrap();
        assert_eq!(extent(QuantumType::Rgb, 10, 0, 3), 12);
        assert_eq!(extent(QuantumType::RgbPad, 10, 2, 3), 18);
        assert_eq!(extent(QuantumType::GrayPad, 10, 0, 4), 8);
        assert_eq!(extent(QuantumType::RgbPad, 12, 0, 1), 6);
        assert_eq!(extent(QuantumType::Cmyka, 32, 0, 2), 40);
        assert_eq!(extent(QuantumType::Index, 4, 7, 3), 2);
    }

    #[test]
    fn test_rgb_word_bits() {
        let format = QuantumFormat::new(QuantumType::RgbPad, 10).unwrap();
        let mut buf = [0u8; 4];
        let mut writer = SampleWriter::new(&format, Endian::Msb, 0, &mut buf);
        writer.put(0x3ff);
        writer.put(0);
        writer.put(1);
        writer.end_pixel();
        assert_eq!(writer.finish(), 4);
        assert_eq!(u32::from_be_bytes(buf), (0x3ff << 22) | (1 << 2));
    }

    #[test]
    fn test_gray_word_partial() {
        let format = QuantumFormat::new(QuantumType::GrayPad, 10).unwrap();
        let mut buf = [0u8; 10];
        let mut writer = SampleWriter::new(&format, Endian::Lsb, 1, &mut buf);
        for v in [1, 2, 3, 4] {
            writer.put(v);
            writer.end_pixel();
        }
        assert_eq!(writer.finish(), 10);
        assert_eq!(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), 1 | 2 << 10 | 3 << 20);
        assert_eq!(buf[5], 4);

        let mut reader = SampleReader::new(&format, Endian::Lsb, 1, &buf);
        let got: Vec<u32> = (0..4)
            .map(|_| {
                let v = reader.get();
                reader.end_pixel();
                v
            })
            .collect();
        assert_eq!(got, vec![1, 2, 3, 4]);
        assert_eq!(reader.finish(), 10);
    }

    #[test]
    fn test_justified12_and_endianness() {
        let format = QuantumFormat::new(QuantumType::RgbPad, 12).unwrap();
        let mut buf = [0u8; 6];
        let mut writer = SampleWriter::new(&format, Endian::Lsb, 0, &mut buf);
        for v in [0xabc, 0x001, 0xfff] {
            writer.put(v);
        }
        writer.end_pixel();
        writer.finish();
        assert_eq!(buf, [0xc0, 0xab, 0x10, 0x00, 0xf0, 0xff]);
    }
}
