use crate::error::Result;
use crate::format::{decode_file_header, FileHeader, SegmentKind, HEADER_SIZE};
use crate::segment::{SectionName, Segment};

/// A parsed NSO: the header and its three segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsoFile<'a> {
    pub header: FileHeader,
    pub text: Segment<'a>,
    pub rodata: Segment<'a>,
    pub data: Segment<'a>,
}

impl<'a> NsoFile<'a> {
    pub fn segment(&self, kind: SegmentKind) -> &Segment<'a> {
        match kind {
            SegmentKind::Text => &self.text,
            SegmentKind::Ro => &self.rodata,
            SegmentKind::Data => &self.data,
        }
    }

    pub fn into_owned(self) -> NsoFile<'static> {
        NsoFile {
            header: self.header,
            text: self.text.into_owned(),
            rodata: self.rodata.into_owned(),
            data: self.data.into_owned(),
        }
    }
}

fn load_segment<'a>(
    header: &FileHeader,
    post_header: &'a [u8],
    kind: SegmentKind,
) -> Result<Segment<'a>> {
    // compressed streams run to the end of the buffer; `*_file_size` is not consulted
    Segment::materialize(post_header, header.segment_header(kind), header.is_compressed(kind))
        .map_err(|e| {
            log::error!("failed to load {} segment: {}", kind, e);
            e
        })
}

/// Parse a whole NSO image that has already been read into memory.
///
/// Uncompressed segments borrow from `bytes`. The input is trusted: hashes are
/// never checked and the magic is only logged when it looks wrong.
pub fn parse_nso(bytes: &[u8]) -> Result<NsoFile<'_>> {
    let header = decode_file_header(bytes)?;
    // the header decoded, so at least HEADER_SIZE bytes are present
    let post_header = &bytes[HEADER_SIZE..];

    let text = load_segment(&header, post_header, SegmentKind::Text)?;
    let mut rodata = load_segment(&header, post_header, SegmentKind::Ro)?;
    let data = load_segment(&header, post_header, SegmentKind::Data)?;

    rodata.add_section(SectionName::ApiInfo, header.api_info)?;
    rodata.add_section(SectionName::DynStr, header.dynstr)?;
    rodata.add_section(SectionName::DynSym, header.dynsym)?;

    Ok(NsoFile {
        header,
        text,
        rodata,
        data,
    })
}
