use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{NsoError, Result};
use crate::format::HEADER_SIZE;

/// Location of one segment inside the file and in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SegmentHeader {
    /// Absolute file position of the (possibly compressed) segment data.
    pub file_offset: u32,
    /// Load address. Not interpreted here.
    pub memory_offset: u32,
    pub decompressed_size: u32,
}

/// An offset+size pair relative to the decompressed content of a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RelativeHeader {
    pub offset: u32,
    pub size: u32,
}

/// Borrow `len` bytes at `offset`, or report what was being read.
pub(crate) fn field<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| {
            NsoError::truncated(what, offset, len, bytes.len().saturating_sub(offset))
        })
}

impl SegmentHeader {
    pub const SIZE: usize = 12;

    /// Position of the segment data once the file header has been stripped.
    ///
    /// Returns `None` when `file_offset` points inside the file header.
    pub fn post_header_offset(&self) -> Option<usize> {
        (self.file_offset as usize).checked_sub(HEADER_SIZE)
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0; Self::SIZE];
        LittleEndian::write_u32(&mut out[0..4], self.file_offset);
        LittleEndian::write_u32(&mut out[4..8], self.memory_offset);
        LittleEndian::write_u32(&mut out[8..12], self.decompressed_size);
        out
    }
}

impl RelativeHeader {
    pub const SIZE: usize = 8;

    /// Byte range inside the owning segment, `None` on overflow.
    pub fn range(&self) -> Option<Range<usize>> {
        let start = self.offset as usize;
        let end = start.checked_add(self.size as usize)?;
        Some(start..end)
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0; Self::SIZE];
        LittleEndian::write_u32(&mut out[0..4], self.offset);
        LittleEndian::write_u32(&mut out[4..8], self.size);
        out
    }
}

/// Read three little-endian u32 at `offset`: file offset, memory offset, decompressed size.
pub fn decode_segment_header(bytes: &[u8], offset: usize) -> Result<SegmentHeader> {
    let raw = field(bytes, offset, SegmentHeader::SIZE, "segment header")?;
    Ok(SegmentHeader {
        file_offset: LittleEndian::read_u32(&raw[0..4]),
        memory_offset: LittleEndian::read_u32(&raw[4..8]),
        decompressed_size: LittleEndian::read_u32(&raw[8..12]),
    })
}

/// Read two little-endian u32 at `offset`: offset and size.
pub fn decode_relative_header(bytes: &[u8], offset: usize) -> Result<RelativeHeader> {
    let raw = field(bytes, offset, RelativeHeader::SIZE, "relative header")?;
    Ok(RelativeHeader {
        offset: LittleEndian::read_u32(&raw[0..4]),
        size: LittleEndian::read_u32(&raw[4..8]),
    })
}
