//! Minimal EXIF-bearing image files for tests
//!
//! Builds a little-endian TIFF block by hand and wraps it in a bare JPEG
//! container (SOI, APP1 "Exif", EOI). Enough for EXIF parsers, not for
//! pixel decoders. [`png_with_exif`] gives a fully decodable image instead.

use std::path::{Path, PathBuf};

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Self {
            tag,
            kind: TYPE_ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn undefined(tag: u16, data: Vec<u8>) -> Self {
        Self {
            tag,
            kind: TYPE_UNDEFINED,
            count: data.len() as u32,
            data,
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            kind: TYPE_LONG,
            count: 1,
            data: value.to_le_bytes().to_vec(),
        }
    }
}

/// Fields to embed; `None` leaves the tag out entirely.
#[derive(Default)]
pub struct ExifSpec {
    pub image_description: Option<String>,
    /// Raw UserComment bytes, including the 8-byte charset marker
    pub user_comment: Option<Vec<u8>>,
}

impl ExifSpec {
    pub fn description(text: &str) -> Self {
        Self {
            image_description: Some(text.to_string()),
            user_comment: None,
        }
    }

    pub fn with_user_comment(mut self, text: &str) -> Self {
        self.user_comment = Some(user_comment_bytes(text));
        self
    }

    pub fn user_comment(text: &str) -> Self {
        Self::default().with_user_comment(text)
    }
}

/// "ASCII\0\0\0" marker followed by the text
pub fn user_comment_bytes(text: &str) -> Vec<u8> {
    let mut bytes = b"ASCII\0\0\0".to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

fn ifd_size(entries: usize) -> usize {
    2 + 12 * entries + 4
}

fn write_ifd(out: &mut Vec<u8>, entries: &[Entry], data: &mut Vec<u8>, data_base: usize) {
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.kind.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = entry.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&((data_base + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(&entry.data);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// Little-endian TIFF block holding the requested fields
pub fn tiff_block(spec: &ExifSpec) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    let mut exif_ifd = Vec::new();

    if let Some(description) = &spec.image_description {
        ifd0.push(Entry::ascii(TAG_IMAGE_DESCRIPTION, description));
    }
    if let Some(comment) = &spec.user_comment {
        exif_ifd.push(Entry::undefined(TAG_USER_COMMENT, comment.clone()));
    }

    let ifd0_len = ifd0.len() + usize::from(!exif_ifd.is_empty());
    let exif_offset = 8 + ifd_size(ifd0_len);
    if !exif_ifd.is_empty() {
        ifd0.push(Entry::long(TAG_EXIF_IFD_POINTER, exif_offset as u32));
    }
    ifd0.sort_by_key(|e| e.tag);

    let exif_len = if exif_ifd.is_empty() {
        0
    } else {
        ifd_size(exif_ifd.len())
    };
    let data_base = exif_offset + exif_len;

    let mut out = b"II\x2a\x00".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());

    let mut data = Vec::new();
    write_ifd(&mut out, &ifd0, &mut data, data_base);
    if !exif_ifd.is_empty() {
        write_ifd(&mut out, &exif_ifd, &mut data, data_base);
    }
    debug_assert_eq!(out.len(), data_base);
    out.extend_from_slice(&data);
    out
}

/// Bare JPEG container: SOI, optional APP1 Exif segment, EOI
pub fn jpeg_bytes(spec: Option<&ExifSpec>) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    if let Some(spec) = spec {
        let tiff = tiff_block(spec);
        let len = (2 + 6 + tiff.len()) as u16;
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
    }
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Write a JPEG fixture into `dir` and return its path
pub fn write_jpeg(dir: &Path, name: &str, spec: Option<&ExifSpec>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, jpeg_bytes(spec)).expect("failed to write fixture");
    path
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Decodable 2x2 PNG with an `eXIf` chunk placed right after IHDR
pub fn png_with_exif(spec: &ExifSpec) -> Vec<u8> {
    let mut png = Vec::new();
    image::RgbImage::new(2, 2)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("failed to encode PNG fixture");

    // signature (8) + IHDR chunk (4 length + 4 type + 13 data + 4 crc)
    let after_ihdr = 8 + 25;
    let tiff = tiff_block(spec);

    let mut chunk = Vec::with_capacity(tiff.len() + 12);
    chunk.extend_from_slice(&(tiff.len() as u32).to_be_bytes());
    let mut typed = b"eXIf".to_vec();
    typed.extend_from_slice(&tiff);
    chunk.extend_from_slice(&typed);
    chunk.extend_from_slice(&crc32(&typed).to_be_bytes());

    png.splice(after_ihdr..after_ihdr, chunk);
    png
}
