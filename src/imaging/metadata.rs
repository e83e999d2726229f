//! JPEG metadata carry-over.
//!
//! Pixel re-encoding drops every APPn segment. To keep camera metadata, the
//! source's EXIF (APP1 `Exif\0\0`) and ICC profile (APP2 `ICC_PROFILE\0`)
//! segments are captured verbatim before decoding and spliced back into the
//! encoded output right after SOI (and any JFIF APP0).
//!
//! Segment layout: `FF <marker> <len_hi> <len_lo> <payload...>` where the
//! length counts itself plus the payload. SOI, EOI, TEM and RST0-7 carry no
//! length. Scanning stops at SOS, where entropy-coded data begins.

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";

/// Raw metadata segments lifted from a JPEG, marker bytes included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedMetadata {
    pub segments: Vec<Vec<u8>>,
}

impl PreservedMetadata {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// TIFF-structured EXIF payload (after `Exif\0\0`), if present.
    pub fn exif_payload(&self) -> Option<&[u8]> {
        self.segments.iter().find_map(|seg| {
            let payload = seg.get(4..)?;
            (seg[1] == APP1 && payload.starts_with(EXIF_HEADER))
                .then(|| &payload[EXIF_HEADER.len()..])
        })
    }
}

/// One marker segment found while walking the header.
struct Segment<'a> {
    marker: u8,
    /// Full segment bytes, `FF marker` included.
    raw: &'a [u8],
}

impl Segment<'_> {
    fn payload(&self) -> &[u8] {
        self.raw.get(4..).unwrap_or(&[])
    }

    fn is_preserved(&self) -> bool {
        (self.marker == APP1 && self.payload().starts_with(EXIF_HEADER))
            || (self.marker == APP2 && self.payload().starts_with(ICC_HEADER))
    }
}

fn has_length(marker: u8) -> bool {
    !matches!(marker, SOI | EOI | 0x01 | 0xD0..=0xD7)
}

/// Walk header segments up to (not including) SOS. Returns `None` when the
/// data does not start with SOI. Truncated segments end the walk.
fn header_segments(data: &[u8]) -> Option<Vec<Segment<'_>>> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
        return None;
    }
    let mut segments = Vec::new();
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }
        // Fill bytes before a marker
        if data[pos + 1] == 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        if marker == SOS || marker == EOI {
            break;
        }
        if !has_length(marker) {
            pos += 2;
            continue;
        }
        if pos + 4 > data.len() {
            break;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > data.len() {
            break;
        }
        segments.push(Segment {
            marker,
            raw: &data[pos..end],
        });
        pos = end;
    }

    Some(segments)
}

/// Capture EXIF and ICC segments from JPEG bytes, in file order.
/// Non-JPEG or segment-free input yields an empty result.
pub fn extract_jpeg_metadata(data: &[u8]) -> PreservedMetadata {
    let segments = header_segments(data)
        .unwrap_or_default()
        .into_iter()
        .filter(Segment::is_preserved)
        .map(|s| s.raw.to_vec())
        .collect();
    PreservedMetadata { segments }
}

/// Splice `metadata` into freshly encoded JPEG bytes, after SOI and any
/// leading APP0. Existing EXIF/ICC segments in `encoded` are dropped so
/// the source's copies win. Input that is not a JPEG is returned as-is.
pub fn insert_jpeg_segments(encoded: &[u8], metadata: &PreservedMetadata) -> Vec<u8> {
    if metadata.is_empty() {
        return encoded.to_vec();
    }
    let Some(segments) = header_segments(encoded) else {
        return encoded.to_vec();
    };

    let extra: usize = metadata.segments.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(encoded.len() + extra);
    out.extend_from_slice(&encoded[..2]);

    let mut pos = 2;
    let mut iter = segments.iter().peekable();
    while let Some(seg) = iter.next_if(|s| s.marker == APP0) {
        out.extend_from_slice(seg.raw);
        pos = offset_of(encoded, seg.raw) + seg.raw.len();
    }

    for seg in &metadata.segments {
        out.extend_from_slice(seg);
    }

    for seg in iter {
        let start = offset_of(encoded, seg.raw);
        // Copy any fill or standalone markers between segments
        out.extend_from_slice(&encoded[pos..start]);
        if !seg.is_preserved() {
            out.extend_from_slice(seg.raw);
        }
        pos = start + seg.raw.len();
    }

    out.extend_from_slice(&encoded[pos..]);
    out
}

fn offset_of(data: &[u8], sub: &[u8]) -> usize {
    sub.as_ptr() as usize - data.as_ptr() as usize
}
