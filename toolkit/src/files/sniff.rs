//! Content-type detection from leading bytes.
//!
//! Implements the WHATWG MIME sniffing table used for HTTP content-type
//! detection: at most [`SNIFF_LEN`] bytes are inspected and the first matching
//! signature wins. Unrecognised binary data is `application/octet-stream`.

pub const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

enum Signature {
    /// Case-insensitive tag after leading whitespace, terminated by space or `>`.
    Html(&'static [u8]),
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_whitespace: bool,
        content_type: &'static str,
    },
    Exact {
        prefix: &'static [u8],
        content_type: &'static str,
    },
    Mp4,
    Text,
}

const fn masked(mask: &'static [u8], pattern: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Masked {
        mask,
        pattern,
        skip_whitespace: false,
        content_type,
    }
}

const fn exact(prefix: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Exact {
        prefix,
        content_type,
    }
}

// 34 arbitrary bytes followed by "LP".
const EOT_MASK: [u8; 36] = {
    let mut mask = [0u8; 36];
    mask[34] = 0xFF;
    mask[35] = 0xFF;
    mask
};
const EOT_PATTERN: [u8; 36] = {
    let mut pattern = [0u8; 36];
    pattern[34] = b'L';
    pattern[35] = b'P';
    pattern
};

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_whitespace: true,
        content_type: "text/xml; charset=utf-8",
    },
    exact(b"%PDF-", "application/pdf"),
    exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    masked(b"\xFF\xFF\x00\x00", b"\xFE\xFF\x00\x00", "text/plain; charset=utf-16be"),
    masked(b"\xFF\xFF\x00\x00", b"\xFF\xFE\x00\x00", "text/plain; charset=utf-16le"),
    masked(b"\xFF\xFF\xFF\x00", b"\xEF\xBB\xBF\x00", TEXT_PLAIN),
    // Images
    exact(b"\x00\x00\x01\x00", "image/x-icon"),
    exact(b"\x00\x00\x02\x00", "image/x-icon"),
    exact(b"BM", "image/bmp"),
    exact(b"GIF87a", "image/gif"),
    exact(b"GIF89a", "image/gif"),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"FORM\x00\x00\x00\x00AIFF",
        "audio/aiff",
    ),
    masked(b"\xFF\xFF\xFF", b"ID3", "audio/mpeg"),
    masked(b"\xFF\xFF\xFF\xFF\xFF", b"OggS\x00", "application/ogg"),
    masked(
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"MThd\x00\x00\x00\x06",
        "audio/midi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00AVI ",
        "video/avi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WAVE",
        "audio/wave",
    ),
    Signature::Mp4,
    exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts
    masked(&EOT_MASK, &EOT_PATTERN, "application/vnd.ms-fontobject"),
    exact(b"\x00\x01\x00\x00", "font/ttf"),
    exact(b"OTTO", "font/otf"),
    exact(b"ttcf", "font/collection"),
    exact(b"wOFF", "font/woff"),
    exact(b"wOF2", "font/woff2"),
    // Archives
    exact(b"\x1F\x8B\x08", "application/x-gzip"),
    exact(b"PK\x03\x04", "application/zip"),
    exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    exact(b"\x00\x61\x73\x6D", "application/wasm"),
    // Must stay last: anything without binary bytes is text.
    Signature::Text,
];

pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|signature| signature.matches(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let tag_matches = tag.iter().zip(data).all(|(&expected, &actual)| {
                    if expected.is_ascii_uppercase() {
                        expected == actual & 0xDF
                    } else {
                        expected == actual
                    }
                });
                (tag_matches && is_tag_terminator(data[tag.len()])).then_some(TEXT_HTML)
            }
            Signature::Masked {
                mask,
                pattern,
                skip_whitespace,
                content_type,
            } => {
                let data = if *skip_whitespace {
                    &data[first_non_ws..]
                } else {
                    data
                };
                if mask.len() != pattern.len() || data.len() < pattern.len() {
                    return None;
                }
                let pattern_matches = pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((&p, &m), &d)| d & m == p);
                pattern_matches.then_some(*content_type)
            }
            Signature::Exact {
                prefix,
                content_type,
            } => data.starts_with(prefix).then_some(*content_type),
            Signature::Mp4 => is_mp4(data).then_some("video/mp4"),
            Signature::Text => {
                let binary = data[first_non_ws..].iter().any(|&b| is_binary(b));
                (!binary).then_some(TEXT_PLAIN)
            }
        }
    }
}

/// ISO base media file with an `ftyp` box naming an `mp4` brand.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Offset 12 holds the minor version, not a brand.
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| &data[offset..offset + 3] == b"mp4")
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn is_tag_terminator(b: u8) -> bool {
    b == b' ' || b == b'>'
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
