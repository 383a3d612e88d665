use thiserror::Error;

use crate::lz4::Lz4Error;
use crate::segment::SectionName;

#[derive(Debug, Error)]
pub enum NsoError {
    /// The buffer ends before a field or region that has to be read.
    #[error("truncated {what}: need {needed} bytes at {offset:#x}, {available} available")]
    TruncatedInput {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("corrupt segment at {file_offset:#x}: cannot decompress to {expected} bytes")]
    CorruptSegment {
        file_offset: u32,
        expected: usize,
        #[source]
        source: Lz4Error,
    },

    /// A section range does not fit inside the decompressed segment.
    #[error("section {section} ({offset:#x}+{size:#x}) exceeds segment length {len:#x}")]
    OutOfBounds {
        section: SectionName,
        offset: u32,
        size: u32,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, NsoError>;

impl NsoError {
    pub(crate) fn truncated(
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    ) -> Self {
        NsoError::TruncatedInput {
            what,
            offset,
            needed,
            available,
        }
    }
}
