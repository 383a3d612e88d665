use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use crate::error::{NsoError, Result};
use crate::format::{RelativeHeader, SegmentHeader, HEADER_SIZE};
use crate::lz4;

/// Named sub-regions of the read-only data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
    ApiInfo,
    DynStr,
    DynSym,
}

impl SectionName {
    pub const ALL: [SectionName; 3] = [
        SectionName::ApiInfo,
        SectionName::DynStr,
        SectionName::DynSym,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::ApiInfo => "api_info",
            SectionName::DynStr => "dynstr",
            SectionName::DynSym => "dynsym",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment after decompression.
///
/// Uncompressed segments borrow straight from the input buffer; decompressed
/// ones own their bytes. Sections are ranges into `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    memory_address: u32,
    content: Cow<'a, [u8]>,
    api_info: Option<Range<usize>>,
    dynstr: Option<Range<usize>>,
    dynsym: Option<Range<usize>>,
}

impl<'a> Segment<'a> {
    /// Build a segment from the bytes following the 256-byte file header.
    ///
    /// A compressed segment's stream is taken to run until the end of
    /// `post_header`; the decompressor decides how much of it is consumed.
    pub fn materialize(
        post_header: &'a [u8],
        header: SegmentHeader,
        compressed: bool,
    ) -> Result<Self> {
        Self::materialize_bounded(post_header, header, compressed, 0)
    }

    /// Like [`Segment::materialize`], but a compressed stream is cut to
    /// `file_size` bytes when that is non-zero and fits in the buffer.
    ///
    /// Only for callers that know their files store the compressed size in
    /// the header's `*_file_size` fields. A `file_size` shorter than the real
    /// stream makes decompression fail.
    pub fn materialize_bounded(
        post_header: &'a [u8],
        header: SegmentHeader,
        compressed: bool,
        file_size: u32,
    ) -> Result<Self> {
        // unused segments are all zero; nothing to read
        if header.decompressed_size == 0 {
            log::debug!("segment at {:#x} is empty", header.file_offset);
            return Ok(Segment::empty(header.memory_offset));
        }

        // a file offset below 0x100 points into the header itself
        let start = header.post_header_offset().ok_or_else(|| {
            let file_offset = header.file_offset as usize;
            NsoError::truncated("segment file offset", file_offset, HEADER_SIZE, file_offset)
        })?;
        let size = header.decompressed_size as usize;

        let content = if compressed {
            // no bytes left to decompress, whether start is at or past the end
            let stream = post_header
                .get(start..)
                .filter(|stream| !stream.is_empty())
                .ok_or_else(|| {
                    let available = post_header.len().saturating_sub(start);
                    NsoError::truncated("compressed segment", start, 1, available)
                })?;
            let stream = match stream.get(..file_size as usize) {
                Some(bounded) if file_size != 0 => bounded,
                _ => stream,
            };

            let bytes = lz4::decompress_block(stream, size).map_err(|source| {
                NsoError::CorruptSegment {
                    file_offset: header.file_offset,
                    expected: size,
                    source,
                }
            })?;
            Cow::Owned(bytes)
        } else {
            let bytes = start
                .checked_add(size)
                .and_then(|end| post_header.get(start..end))
                .ok_or_else(|| {
                    let available = post_header.len().saturating_sub(start);
                    NsoError::truncated("segment", start, size, available)
                })?;
            Cow::Borrowed(bytes)
        };

        log::debug!(
            "segment at {:#x}: {} bytes{}, loads at {:#x}",
            header.file_offset,
            content.len(),
            if compressed { " (lz4)" } else { "" },
            header.memory_offset
        );

        Ok(Segment {
            memory_address: header.memory_offset,
            content,
            api_info: None,
            dynstr: None,
            dynsym: None,
        })
    }

    fn empty(memory_address: u32) -> Self {
        Segment {
            memory_address,
            content: Cow::Borrowed(&[]),
            api_info: None,
            dynstr: None,
            dynsym: None,
        }
    }

    /// Record `name` as the sub-slice described by `header`.
    ///
    /// The segment is left untouched on error.
    pub fn add_section(&mut self, name: SectionName, header: RelativeHeader) -> Result<()> {
        let len = self.content.len();
        let range = header
            .range()
            .filter(|range| range.end <= len)
            .ok_or(NsoError::OutOfBounds {
                section: name,
                offset: header.offset,
                size: header.size,
                len,
            })?;

        log::trace!("section {} at {:?}", name, range);
        *self.slot(name) = Some(range);
        Ok(())
    }

    fn slot(&mut self, name: SectionName) -> &mut Option<Range<usize>> {
        match name {
            SectionName::ApiInfo => &mut self.api_info,
            SectionName::DynStr => &mut self.dynstr,
            SectionName::DynSym => &mut self.dynsym,
        }
    }

    pub fn section(&self, name: SectionName) -> Option<&[u8]> {
        let range = match name {
            SectionName::ApiInfo => &self.api_info,
            SectionName::DynStr => &self.dynstr,
            SectionName::DynSym => &self.dynsym,
        };
        range.clone().map(|range| &self.content[range])
    }

    #[inline]
    pub fn api_info(&self) -> Option<&[u8]> {
        self.section(SectionName::ApiInfo)
    }

    #[inline]
    pub fn dynstr(&self) -> Option<&[u8]> {
        self.section(SectionName::DynStr)
    }

    #[inline]
    pub fn dynsym(&self) -> Option<&[u8]> {
        self.section(SectionName::DynSym)
    }

    /// Populated sections, in `SectionName::ALL` order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionName, &[u8])> + '_ {
        SectionName::ALL
            .into_iter()
            .filter_map(move |name| self.section(name).map(|bytes| (name, bytes)))
    }

    #[inline]
    pub fn memory_address(&self) -> u32 {
        self.memory_address
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether the content is borrowed from the input buffer.
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        matches!(self.content, Cow::Borrowed(_))
    }

    /// Copy any borrowed content so the segment outlives the input buffer.
    pub fn into_owned(self) -> Segment<'static> {
        Segment {
            memory_address: self.memory_address,
            content: Cow::Owned(self.content.into_owned()),
            api_info: self.api_info,
            dynstr: self.dynstr,
            dynsym: self.dynsym,
        }
    }
}

/// Free-function form of [`Segment::materialize`].
pub fn materialize_segment(
    post_header: &[u8],
    header: SegmentHeader,
    compressed: bool,
) -> Result<Segment<'_>> {
    Segment::materialize(post_header, header, compressed)
}
