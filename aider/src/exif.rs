//! Minimal EXIF orientation extraction for JPEG streams.
//!
//! Only the orientation tag is needed here, so this walks the APP1 segment
//! and the TIFF IFD0 directly instead of pulling in a full EXIF decoder.

/// Reads the EXIF orientation code (1..=8) from a JPEG byte stream.
/// Returns `None` for non-JPEG data or when no valid tag is present.
pub fn jpeg_orientation(bytes: &[u8]) -> Option<u16> {
    tiff_orientation(find_app1(bytes)?)
}

/// Scans JPEG segments up to start-of-scan for an `Exif` APP1 payload.
fn find_app1(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        // Standalone markers carry no length word.
        if (0xD0..=0xD9).contains(&marker) {
            i += 2;
            continue;
        }
        // Start of scan: no EXIF past here.
        if marker == 0xDA {
            return None;
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        if len < 2 || i + 2 + len > bytes.len() {
            return None;
        }
        let payload = &bytes[i + 4..i + 2 + len];
        if marker == 0xE1 && payload.starts_with(b"Exif\0\0") {
            return Some(&payload[6..]);
        }
        i += 2 + len;
    }
    None
}

/// Walks IFD0 of a TIFF header for tag 0x0112 (orientation).
fn tiff_orientation(tiff: &[u8]) -> Option<u16> {
    let big_endian = match tiff.get(0..2)? {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let read_u16 = |at: usize| -> Option<u16> {
        let b = tiff.get(at..at + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let read_u32 = |at: usize| -> Option<u32> {
        let b = tiff.get(at..at + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    if read_u16(2)? != 42 {
        return None;
    }
    let ifd = read_u32(4)? as usize;
    let count = read_u16(ifd)? as usize;
    for n in 0..count {
        let entry = ifd + 2 + n * 12;
        if read_u16(entry)? == 0x0112 {
            // SHORT value, stored inline in the first two value bytes.
            return read_u16(entry + 8).filter(|code| (1..=8).contains(code));
        }
    }
    None
}
