//! Caption extraction from embedded image metadata
//!
//! Sources are tried in a fixed order and the first non-empty caption wins:
//!
//! 1. [`ExifFieldsSource`] parses the EXIF container directly and prefers
//!    `UserComment` over `ImageDescription`.
//! 2. [`DecoderExifSource`] opens the file through the generic image
//!    decoder, takes its raw EXIF block and reads tag 270.
//!
//! A failing source logs a warning and yields `None`; nothing here is fatal.

use exif::{Context, Exif, In, Tag, Value};
use image::{ImageDecoder, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Captions are cut to this many characters. Not a Photos API requirement.
pub const MAX_CAPTION_CHARS: usize = 1000;

/// Charset marker ("ASCII\0\0\0", "UNICODE\0", ...) in front of UserComment
const USER_COMMENT_PREFIX_LEN: usize = 8;

/// TIFF ImageDescription
const IMAGE_DESCRIPTION_TAG: u16 = 270;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// One way of reading a caption out of an image file.
pub trait CaptionSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// A trimmed, non-empty caption, or None. Must not panic or propagate errors.
    fn read(&self, path: &Path) -> Option<String>;
}

/// Ordered list of caption sources
pub struct CaptionExtractor {
    sources: Vec<Box<dyn CaptionSource>>,
}

impl Default for CaptionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionExtractor {
    /// Structured EXIF fields first, decoder fallback second
    pub fn new() -> Self {
        Self::with_sources(vec![Box::new(ExifFieldsSource), Box::new(DecoderExifSource)])
    }

    pub fn with_sources(sources: Vec<Box<dyn CaptionSource>>) -> Self {
        Self { sources }
    }

    /// Caption for `path`, truncated to [`MAX_CAPTION_CHARS`]
    pub fn extract(&self, path: &Path) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let caption = source.read(path).and_then(|c| clean(&c))?;
            debug!("Caption for {} from {}", path.display(), source.name());
            Some(truncate_caption(&caption))
        })
    }
}

/// First [`MAX_CAPTION_CHARS`] characters of `caption`
pub fn truncate_caption(caption: &str) -> String {
    caption.chars().take(MAX_CAPTION_CHARS).collect()
}

/// Trim whitespace and NUL padding; empty means absent
fn clean(text: &str) -> Option<String> {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().and_then(clean)
}

/// Textual value of an ASCII/BYTE/UNDEFINED field
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts.first().and_then(|p| decode_utf8(p)),
        Value::Byte(bytes) | Value::Undefined(bytes, _) => decode_utf8(bytes),
        _ => None,
    }
}

// ============================================================================
// Structured EXIF fields
// ============================================================================

/// Reads `UserComment`, then `ImageDescription`, from the EXIF container.
pub struct ExifFieldsSource;

impl ExifFieldsSource {
    fn read_container(path: &Path) -> Result<Exif, exif::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        exif::Reader::new().read_from_container(&mut reader)
    }

    fn user_comment(exif: &Exif) -> Option<String> {
        let field = exif.get_field(Tag::UserComment, In::PRIMARY)?;
        match &field.value {
            Value::Undefined(bytes, _) => decode_utf8(bytes.get(USER_COMMENT_PREFIX_LEN..)?),
            _ => None,
        }
    }

    fn image_description(exif: &Exif) -> Option<String> {
        let field = exif.get_field(Tag::ImageDescription, In::PRIMARY)?;
        text_value(&field.value)
    }
}

impl CaptionSource for ExifFieldsSource {
    fn name(&self) -> &'static str {
        "exif-fields"
    }

    fn read(&self, path: &Path) -> Option<String> {
        let exif = match Self::read_container(path) {
            Ok(exif) => exif,
            // A file without EXIF is normal; only a broken read is worth a warning
            Err(exif::Error::NotFound(_)) => {
                debug!("No EXIF block in {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Could not read EXIF from {}: {}", path.display(), e);
                return None;
            }
        };

        Self::user_comment(&exif).or_else(|| Self::image_description(&exif))
    }
}

// ============================================================================
// Decoder fallback
// ============================================================================

/// Reads tag 270 from the raw EXIF block exposed by the image decoder.
pub struct DecoderExifSource;

impl DecoderExifSource {
    fn raw_exif(path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        Ok(decoder.exif_metadata()?)
    }
}

/// ImageDescription (tag 270) from a raw TIFF block, with or without the "Exif\0\0" header
pub fn description_from_raw_exif(mut raw: Vec<u8>) -> Option<String> {
    if raw.starts_with(EXIF_HEADER) {
        raw.drain(..EXIF_HEADER.len());
    }

    let exif = match exif::Reader::new().read_raw(raw) {
        Ok(exif) => exif,
        Err(e) => {
            warn!("Could not parse decoder EXIF block: {}", e);
            return None;
        }
    };

    let field = exif.get_field(Tag(Context::Tiff, IMAGE_DESCRIPTION_TAG), In::PRIMARY)?;
    text_value(&field.value)
}

impl CaptionSource for DecoderExifSource {
    fn name(&self) -> &'static str {
        "decoder-exif"
    }

    fn read(&self, path: &Path) -> Option<String> {
        match Self::raw_exif(path) {
            Ok(Some(raw)) => description_from_raw_exif(raw),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read decoder EXIF from {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ExifSpec, jpeg_bytes, png_with_exif, tiff_block, write_jpeg};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct Fixed(Option<&'static str>, Arc<AtomicUsize>);

    impl CaptionSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn read(&self, _path: &Path) -> Option<String> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn user_comment_wins_over_description() {
        let dir = tempdir().unwrap();
        let spec = ExifSpec::description("From the description").with_user_comment("From the comment");
        let path = write_jpeg(dir.path(), "both.jpg", Some(&spec));

        let caption = CaptionExtractor::new().extract(&path);
        assert_eq!(caption.as_deref(), Some("From the comment"));
    }

    #[test]
    fn description_used_when_no_user_comment() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(dir.path(), "desc.jpg", Some(&ExifSpec::description("  Harbour at dawn \n")));

        let caption = CaptionExtractor::new().extract(&path);
        assert_eq!(caption.as_deref(), Some("Harbour at dawn"));
    }

    #[test]
    fn blank_user_comment_falls_back_to_description() {
        let dir = tempdir().unwrap();
        let spec = ExifSpec::description("Fallback text").with_user_comment("   ");
        let path = write_jpeg(dir.path(), "blank.jpg", Some(&spec));

        assert_eq!(
            CaptionExtractor::new().extract(&path).as_deref(),
            Some("Fallback text")
        );
    }

    #[test]
    fn undecodable_user_comment_is_skipped() {
        let dir = tempdir().unwrap();
        let mut spec = ExifSpec::description("Valid description");
        let mut comment = b"UNICODE\0".to_vec();
        comment.extend_from_slice(&[0xFF, 0xFE, 0xC3, 0x28]);
        spec.user_comment = Some(comment);
        let path = write_jpeg(dir.path(), "bad.jpg", Some(&spec));

        assert_eq!(
            CaptionExtractor::new().extract(&path).as_deref(),
            Some("Valid description")
        );
    }

    #[test]
    fn short_user_comment_without_payload_is_absent() {
        let dir = tempdir().unwrap();
        let spec = ExifSpec {
            image_description: None,
            user_comment: Some(b"ASCII".to_vec()),
        };
        let path = write_jpeg(dir.path(), "short.jpg", Some(&spec));

        assert_eq!(CaptionExtractor::new().extract(&path), None);
    }

    #[test]
    fn no_metadata_yields_none() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(dir.path(), "plain.jpg", None);
        assert_eq!(CaptionExtractor::new().extract(&path), None);
    }

    #[test]
    fn corrupt_file_yields_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert_eq!(CaptionExtractor::new().extract(&path), None);
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = tempdir().unwrap();
        assert_eq!(CaptionExtractor::new().extract(&dir.path().join("gone.jpg")), None);
    }

    #[test]
    fn long_caption_truncated_to_limit() {
        let dir = tempdir().unwrap();
        let long = "x".repeat(1500);
        let path = write_jpeg(dir.path(), "long.jpg", Some(&ExifSpec::user_comment(&long)));

        let caption = CaptionExtractor::new().extract(&path).unwrap();
        assert_eq!(caption.chars().count(), 1000);
        assert_eq!(caption, "x".repeat(1000));
    }

    #[test]
    fn long_description_truncated_too() {
        let dir = tempdir().unwrap();
        let long = "y".repeat(1500);
        let path = write_jpeg(dir.path(), "long-desc.jpg", Some(&ExifSpec::description(&long)));

        assert_eq!(CaptionExtractor::new().extract(&path).unwrap().len(), 1000);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let caption = "é".repeat(1200);
        let truncated = truncate_caption(&caption);
        assert_eq!(truncated.chars().count(), 1000);
        assert_eq!(truncated.len(), 2000);
    }

    #[test]
    fn first_successful_source_wins_and_later_ones_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later_calls = Arc::new(AtomicUsize::new(0));
        let extractor = CaptionExtractor::with_sources(vec![
            Box::new(Fixed(None, calls.clone())),
            Box::new(Fixed(Some("second"), calls.clone())),
            Box::new(Fixed(Some("third"), later_calls.clone())),
        ]);

        assert_eq!(extractor.extract(Path::new("any.jpg")).as_deref(), Some("second"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn whitespace_only_source_result_falls_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = CaptionExtractor::with_sources(vec![
            Box::new(Fixed(Some(" \t\n"), calls.clone())),
            Box::new(Fixed(Some("real caption"), calls.clone())),
        ]);

        assert_eq!(
            extractor.extract(Path::new("any.jpg")).as_deref(),
            Some("real caption")
        );
    }

    #[test]
    fn raw_exif_description_by_tag_id() {
        let tiff = tiff_block(&ExifSpec::description("Tagged 270"));
        assert_eq!(description_from_raw_exif(tiff).as_deref(), Some("Tagged 270"));
    }

    #[test]
    fn raw_exif_accepts_app1_header() {
        let mut raw = b"Exif\0\0".to_vec();
        raw.extend(tiff_block(&ExifSpec::description("With header")));
        assert_eq!(description_from_raw_exif(raw).as_deref(), Some("With header"));
    }

    #[test]
    fn raw_exif_ignores_user_comment() {
        let tiff = tiff_block(&ExifSpec::user_comment("comment only"));
        assert_eq!(description_from_raw_exif(tiff), None);
    }

    #[test]
    fn raw_exif_garbage_is_none() {
        assert_eq!(description_from_raw_exif(b"nonsense".to_vec()), None);
    }

    #[test]
    fn decoder_source_handles_image_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pixels.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();

        assert_eq!(DecoderExifSource.read(&path), None);
        assert_eq!(CaptionExtractor::new().extract(&path), None);
    }

    #[test]
    fn decoder_source_reads_png_exif_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("described.png");
        std::fs::write(&path, png_with_exif(&ExifSpec::description("png desc"))).unwrap();

        assert_eq!(DecoderExifSource.read(&path).as_deref(), Some("png desc"));
        assert_eq!(CaptionExtractor::new().extract(&path).as_deref(), Some("png desc"));
    }

    #[test]
    fn decoder_source_alone_supplies_caption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("decoder-only.png");
        std::fs::write(&path, png_with_exif(&ExifSpec::description("from decoder"))).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = CaptionExtractor::with_sources(vec![
            Box::new(Fixed(None, calls.clone())),
            Box::new(DecoderExifSource),
        ]);

        assert_eq!(extractor.extract(&path).as_deref(), Some("from decoder"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exif_fields_source_reads_fixture_container() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("direct.jpg");
        std::fs::write(&path, jpeg_bytes(Some(&ExifSpec::description("direct")))).unwrap();
        assert_eq!(ExifFieldsSource.read(&path).as_deref(), Some("direct"));
    }
}
