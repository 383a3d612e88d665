//! On-disk records of the NSO container.

pub mod header;
pub mod segment_header;

use std::fmt;

pub use header::{decode_file_header, FileHeader, SegmentFlags};
pub use segment_header::{
    decode_relative_header, decode_segment_header, RelativeHeader, SegmentHeader,
};

/// Size of the fixed file header. Segment file offsets count from the start
/// of the file, so everything after this point is shifted by it.
pub const HEADER_SIZE: usize = 0x100;

pub const NSO_MAGIC: [u8; 4] = *b"NSO0";

/// The three top-level segments, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Ro,
    Data,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 3] = [SegmentKind::Text, SegmentKind::Ro, SegmentKind::Data];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Ro => "rodata",
            SegmentKind::Data => "data",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
