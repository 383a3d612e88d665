//! The 256-byte NSO file header.
//!
//! | offset | field                      | width |
//! |--------|----------------------------|-------|
//! | 0x00   | magic (`NSO0`)             | 4     |
//! | 0x04   | version                    | 4     |
//! | 0x08   | reserved                   | 4     |
//! | 0x0C   | flags                      | 4     |
//! | 0x10   | text segment header        | 12    |
//! | 0x1C   | module name offset         | 4     |
//! | 0x20   | ro segment header          | 12    |
//! | 0x2C   | module name size           | 4     |
//! | 0x30   | data segment header        | 12    |
//! | 0x3C   | bss size                   | 4     |
//! | 0x40   | module id                  | 32    |
//! | 0x60   | text / ro / data file size | 3 × 4 |
//! | 0x6C   | reserved                   | 28    |
//! | 0x88   | api_info / dynstr / dynsym | 3 × 8 |
//! | 0xA0   | text / ro / data hash      | 3 × 32|

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use super::segment_header::{decode_relative_header, decode_segment_header, field};
use super::{RelativeHeader, SegmentHeader, SegmentKind, HEADER_SIZE, NSO_MAGIC};
use crate::error::Result;

const MAGIC: usize = 0x00;
const VERSION: usize = 0x04;
const FLAGS: usize = 0x0C;
const TEXT_HEADER: usize = 0x10;
const MODULE_NAME_OFFSET: usize = 0x1C;
const RO_HEADER: usize = 0x20;
const MODULE_NAME_SIZE: usize = 0x2C;
const DATA_HEADER: usize = 0x30;
const BSS_SIZE: usize = 0x3C;
const MODULE_ID: usize = 0x40;
const TEXT_FILE_SIZE: usize = 0x60;
const RO_FILE_SIZE: usize = 0x64;
const DATA_FILE_SIZE: usize = 0x68;
const API_INFO: usize = 0x88;
const DYNSTR: usize = 0x90;
const DYNSYM: usize = 0x98;
const TEXT_HASH: usize = 0xA0;
const RO_HASH: usize = 0xC0;
const DATA_HASH: usize = 0xE0;

bitflags! {
    /// Per-segment compression and hash flags stored at 0x0C.
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct SegmentFlags: u32 {
        const TEXT_COMPRESS = 1 << 0;
        const RO_COMPRESS = 1 << 1;
        const DATA_COMPRESS = 1 << 2;
        const TEXT_HASH = 1 << 3;
        const RO_HASH = 1 << 4;
        const DATA_HASH = 1 << 5;
    }
}

impl SegmentFlags {
    pub fn compress_flag(kind: SegmentKind) -> Self {
        match kind {
            SegmentKind::Text => SegmentFlags::TEXT_COMPRESS,
            SegmentKind::Ro => SegmentFlags::RO_COMPRESS,
            SegmentKind::Data => SegmentFlags::DATA_COMPRESS,
        }
    }

    pub fn hash_flag(kind: SegmentKind) -> Self {
        match kind {
            SegmentKind::Text => SegmentFlags::TEXT_HASH,
            SegmentKind::Ro => SegmentFlags::RO_HASH,
            SegmentKind::Data => SegmentFlags::DATA_HASH,
        }
    }
}

/// Decoded NSO file header.
///
/// Nothing here is validated: the magic, version and hashes are exposed as
/// stored. See [`FileHeader::has_valid_magic`] for the one check offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub flags: SegmentFlags,
    pub text: SegmentHeader,
    pub module_name_offset: u32,
    pub ro: SegmentHeader,
    pub module_name_size: u32,
    pub data: SegmentHeader,
    pub bss_size: u32,
    pub module_id: [u8; 32],
    /// Size of the segment as stored in the file (compressed size when compressed).
    pub text_file_size: u32,
    pub ro_file_size: u32,
    pub data_file_size: u32,
    pub api_info: RelativeHeader,
    pub dynstr: RelativeHeader,
    pub dynsym: RelativeHeader,
    pub text_hash: [u8; 32],
    pub ro_hash: [u8; 32],
    pub data_hash: [u8; 32],
}

impl FileHeader {
    #[inline]
    pub fn has_valid_magic(&self) -> bool {
        self.magic == NSO_MAGIC
    }

    #[inline]
    pub fn is_compressed(&self, kind: SegmentKind) -> bool {
        self.flags.contains(SegmentFlags::compress_flag(kind))
    }

    #[inline]
    pub fn has_hash(&self, kind: SegmentKind) -> bool {
        self.flags.contains(SegmentFlags::hash_flag(kind))
    }

    pub fn segment_header(&self, kind: SegmentKind) -> SegmentHeader {
        match kind {
            SegmentKind::Text => self.text,
            SegmentKind::Ro => self.ro,
            SegmentKind::Data => self.data,
        }
    }

    pub fn file_size(&self, kind: SegmentKind) -> u32 {
        match kind {
            SegmentKind::Text => self.text_file_size,
            SegmentKind::Ro => self.ro_file_size,
            SegmentKind::Data => self.data_file_size,
        }
    }

    pub fn hash(&self, kind: SegmentKind) -> &[u8; 32] {
        match kind {
            SegmentKind::Text => &self.text_hash,
            SegmentKind::Ro => &self.ro_hash,
            SegmentKind::Data => &self.data_hash,
        }
    }

    /// Serialize back into the 256-byte on-disk layout. Reserved bytes are zero.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0; HEADER_SIZE];

        out[MAGIC..MAGIC + 4].copy_from_slice(&self.magic);
        LittleEndian::write_u32(&mut out[VERSION..], self.version);
        LittleEndian::write_u32(&mut out[FLAGS..], self.flags.bits());

        out[TEXT_HEADER..TEXT_HEADER + SegmentHeader::SIZE].copy_from_slice(&self.text.encode());
        LittleEndian::write_u32(&mut out[MODULE_NAME_OFFSET..], self.module_name_offset);
        out[RO_HEADER..RO_HEADER + SegmentHeader::SIZE].copy_from_slice(&self.ro.encode());
        LittleEndian::write_u32(&mut out[MODULE_NAME_SIZE..], self.module_name_size);
        out[DATA_HEADER..DATA_HEADER + SegmentHeader::SIZE].copy_from_slice(&self.data.encode());
        LittleEndian::write_u32(&mut out[BSS_SIZE..], self.bss_size);

        out[MODULE_ID..MODULE_ID + 32].copy_from_slice(&self.module_id);
        LittleEndian::write_u32(&mut out[TEXT_FILE_SIZE..], self.text_file_size);
        LittleEndian::write_u32(&mut out[RO_FILE_SIZE..], self.ro_file_size);
        LittleEndian::write_u32(&mut out[DATA_FILE_SIZE..], self.data_file_size);

        out[API_INFO..API_INFO + RelativeHeader::SIZE].copy_from_slice(&self.api_info.encode());
        out[DYNSTR..DYNSTR + RelativeHeader::SIZE].copy_from_slice(&self.dynstr.encode());
        out[DYNSYM..DYNSYM + RelativeHeader::SIZE].copy_from_slice(&self.dynsym.encode());

        out[TEXT_HASH..TEXT_HASH + 32].copy_from_slice(&self.text_hash);
        out[RO_HASH..RO_HASH + 32].copy_from_slice(&self.ro_hash);
        out[DATA_HASH..DATA_HASH + 32].copy_from_slice(&self.data_hash);
        out
    }
}

fn read_u32(raw: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&raw[offset..offset + 4])
}

fn read_array<const N: usize>(raw: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&raw[offset..offset + N]);
    out
}

/// Decode the header from the first 256 bytes of `bytes`.
///
/// Fails with [`NsoError::TruncatedInput`](crate::NsoError::TruncatedInput)
/// before reading anything when fewer than 256 bytes are available.
pub fn decode_file_header(bytes: &[u8]) -> Result<FileHeader> {
    let raw = field(bytes, 0, HEADER_SIZE, "file header")?;

    let header = FileHeader {
        magic: read_array(raw, MAGIC),
        version: read_u32(raw, VERSION),
        flags: SegmentFlags::from_bits_retain(read_u32(raw, FLAGS)),
        text: decode_segment_header(raw, TEXT_HEADER)?,
        module_name_offset: read_u32(raw, MODULE_NAME_OFFSET),
        ro: decode_segment_header(raw, RO_HEADER)?,
        module_name_size: read_u32(raw, MODULE_NAME_SIZE),
        data: decode_segment_header(raw, DATA_HEADER)?,
        bss_size: read_u32(raw, BSS_SIZE),
        module_id: read_array(raw, MODULE_ID),
        text_file_size: read_u32(raw, TEXT_FILE_SIZE),
        ro_file_size: read_u32(raw, RO_FILE_SIZE),
        data_file_size: read_u32(raw, DATA_FILE_SIZE),
        api_info: decode_relative_header(raw, API_INFO)?,
        dynstr: decode_relative_header(raw, DYNSTR)?,
        dynsym: decode_relative_header(raw, DYNSYM)?,
        text_hash: read_array(raw, TEXT_HASH),
        ro_hash: read_array(raw, RO_HASH),
        data_hash: read_array(raw, DATA_HASH),
    };

    if !header.has_valid_magic() {
        log::warn!("unexpected NSO magic: {:02x?}", header.magic);
    }
    log::debug!(
        "NSO header: version {}, flags {:#x}, text {:?}, ro {:?}, data {:?}",
        header.version,
        header.flags.bits(),
        header.text,
        header.ro,
        header.data
    );

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NsoError;
    use pretty_assertions::assert_eq;

    fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// A header with every field set to a distinct value.
    fn sample_header_bytes() -> Vec<u8> {
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(b"NSO0");
        put_u32(&mut raw, 0x04, 1);
        put_u32(&mut raw, 0x0C, 0x3F);
        // text
        put_u32(&mut raw, 0x10, 0x100);
        put_u32(&mut raw, 0x14, 0x0);
        put_u32(&mut raw, 0x18, 0x1000);
        put_u32(&mut raw, 0x1C, 0x100);
        // ro
        put_u32(&mut raw, 0x20, 0x800);
        put_u32(&mut raw, 0x24, 0x1000);
        put_u32(&mut raw, 0x28, 0x400);
        put_u32(&mut raw, 0x2C, 0x1);
        // data
        put_u32(&mut raw, 0x30, 0xA00);
        put_u32(&mut raw, 0x34, 0x2000);
        put_u32(&mut raw, 0x38, 0x200);
        put_u32(&mut raw, 0x3C, 0x3000);
        for (i, b) in raw[0x40..0x60].iter_mut().enumerate() {
            *b = 0xC0 | i as u8;
        }
        put_u32(&mut raw, 0x60, 0x700);
        put_u32(&mut raw, 0x64, 0x200);
        put_u32(&mut raw, 0x68, 0x100);
        // api_info, dynstr, dynsym
        put_u32(&mut raw, 0x88, 0x00);
        put_u32(&mut raw, 0x8C, 0x10);
        put_u32(&mut raw, 0x90, 0x10);
        put_u32(&mut raw, 0x94, 0x20);
        put_u32(&mut raw, 0x98, 0x30);
        put_u32(&mut raw, 0x9C, 0x48);
        for (i, b) in raw[0xA0..0x100].iter_mut().enumerate() {
            *b = i as u8;
        }
        raw
    }

    #[test]
    fn decode_all_fields() {
        let raw = sample_header_bytes();
        let header = decode_file_header(&raw).unwrap();

        assert!(header.has_valid_magic());
        assert_eq!(header.version, 1);
        assert_eq!(header.flags, SegmentFlags::all());
        assert_eq!(
            header.ro,
            SegmentHeader {
                file_offset: 0x800,
                memory_offset: 0x1000,
                decompressed_size: 0x400,
            }
        );
        assert_eq!(header.data.memory_offset, 0x2000);
        assert_eq!(header.module_name_offset, 0x100);
        assert_eq!(header.module_name_size, 1);
        assert_eq!(header.bss_size, 0x3000);
        assert_eq!(header.module_id[0], 0xC0);
        assert_eq!(header.module_id[31], 0xDF);
        assert_eq!(header.file_size(SegmentKind::Text), 0x700);
        assert_eq!(header.file_size(SegmentKind::Ro), 0x200);
        assert_eq!(header.file_size(SegmentKind::Data), 0x100);
        assert_eq!(header.api_info, RelativeHeader { offset: 0, size: 0x10 });
        assert_eq!(header.dynstr, RelativeHeader { offset: 0x10, size: 0x20 });
        assert_eq!(header.dynsym, RelativeHeader { offset: 0x30, size: 0x48 });
        assert_eq!(header.text_hash[0], 0x00);
        assert_eq!(header.ro_hash[0], 0x20);
        assert_eq!(header.data_hash[31], 0x5F);
    }

    #[test]
    fn encode_round_trips() {
        let raw = sample_header_bytes();
        let header = decode_file_header(&raw).unwrap();

        assert_eq!(&header.encode()[..], &raw[..]);
    }

    #[test]
    fn passthrough_fields_survive_reencoding() {
        let mut raw = sample_header_bytes();
        raw[0x40..0x60].copy_from_slice(&[0x5A; 32]);
        raw[0xC0..0xE0].copy_from_slice(&[0xA5; 32]);

        let encoded = decode_file_header(&raw).unwrap().encode();
        assert_eq!(&encoded[0x40..0x60], &raw[0x40..0x60]);
        assert_eq!(&encoded[0xA0..0x100], &raw[0xA0..0x100]);
    }

    #[test]
    fn single_flag_membership() {
        for bit in 0..6 {
            let mut raw = sample_header_bytes();
            put_u32(&mut raw, 0x0C, 1 << bit);
            let header = decode_file_header(&raw).unwrap();

            let set = SegmentFlags::all()
                .iter()
                .filter(|flag| header.flags.contains(*flag))
                .collect::<Vec<_>>();
            assert_eq!(set, vec![SegmentFlags::from_bits_retain(1 << bit)]);
        }
    }

    #[test]
    fn flag_accessors_by_segment() {
        let mut raw = sample_header_bytes();
        put_u32(&mut raw, 0x0C, (SegmentFlags::RO_COMPRESS | SegmentFlags::DATA_HASH).bits());
        let header = decode_file_header(&raw).unwrap();

        assert!(!header.is_compressed(SegmentKind::Text));
        assert!(header.is_compressed(SegmentKind::Ro));
        assert!(!header.is_compressed(SegmentKind::Data));
        assert!(!header.has_hash(SegmentKind::Ro));
        assert!(header.has_hash(SegmentKind::Data));
    }

    #[test]
    fn unknown_flag_bits_are_kept() {
        let mut raw = sample_header_bytes();
        put_u32(&mut raw, 0x0C, 0x8000_0001);
        let header = decode_file_header(&raw).unwrap();

        assert!(header.is_compressed(SegmentKind::Text));
        assert_eq!(header.flags.bits(), 0x8000_0001);
        assert_eq!(&header.encode()[0x0C..0x10], &raw[0x0C..0x10]);
    }

    #[test]
    fn magic_is_not_enforced() {
        let mut raw = sample_header_bytes();
        raw[0..4].copy_from_slice(b"NRO0");
        let header = decode_file_header(&raw).unwrap();

        assert!(!header.has_valid_magic());
        assert_eq!(&header.magic, b"NRO0");
    }

    #[test]
    fn short_header_is_truncated() {
        let raw = sample_header_bytes();
        for len in [0, 1, 0x10, 0xFF] {
            let err = decode_file_header(&raw[..len]).unwrap_err();
            let truncated = matches!(
                err,
                NsoError::TruncatedInput {
                    needed: HEADER_SIZE,
                    available,
                    ..
                } if available == len
            );
            assert!(truncated, "len {len}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut raw = sample_header_bytes();
        let expected = decode_file_header(&raw).unwrap();
        raw.extend_from_slice(&[0xEE; 64]);

        assert_eq!(decode_file_header(&raw).unwrap(), expected);
    }
}
