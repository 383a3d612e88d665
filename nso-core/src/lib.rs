//! Reader for NSO executable containers.
//!
//! An NSO is a 256-byte header followed by three segments (text, rodata,
//! data), each optionally LZ4-compressed. [`parse_nso`] decodes the header,
//! decompresses the segments and exposes the `api_info`, `dynstr` and
//! `dynsym` regions of rodata.
//!
//! This is a reader for trusted input only. The magic, version and segment
//! hashes are exposed but never verified, and the file must already be in
//! memory.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("main")?;
//! let nso = nso_core::parse_nso(&bytes)?;
//! if let Some(dynstr) = nso.rodata.dynstr() {
//!     println!("dynstr: {} bytes at {:#x}", dynstr.len(), nso.rodata.memory_address());
//! }
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod format;
pub mod lz4;
pub mod nso;
pub mod segment;

pub use error::{NsoError, Result};
pub use format::{
    decode_file_header, decode_relative_header, decode_segment_header, FileHeader, RelativeHeader,
    SegmentFlags, SegmentHeader, SegmentKind, HEADER_SIZE, NSO_MAGIC,
};
pub use nso::{parse_nso, NsoFile};
pub use segment::{materialize_segment, SectionName, Segment};
