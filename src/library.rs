//! Image library keyed by asset key
//!
//! The bytes themselves are produced by external collaborators (upload, archive
//! import). The library only records which keys have finished loading and their
//! pixel dimensions, which is all reference resolution needs.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use thiserror::Error;

/// Errors from reading image data
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("image data is empty")]
    Empty,
    #[error("failed to decode PNG: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("image has zero width or height")]
    ZeroSize,
}

/// Read-only view of loaded image dimensions used during resolution
pub trait ImageSource {
    /// Pixel dimensions of the image for `key`, or `None` while it is not loaded
    fn dimensions(&self, key: &str) -> Option<(u32, u32)>;
}

/// A loaded image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub width: u32,
    pub height: u32,
    /// Encoded PNG bytes, when known
    pub bytes: Option<Vec<u8>>,
}

impl ImageEntry {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Loaded images plus the keys still waiting on a decode
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    images: HashMap<String, ImageEntry>,
    pending: HashSet<String>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a load for `key` has started
    pub fn mark_pending(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.images.remove(&key);
        self.pending.insert(key);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    /// Record a finished load with known dimensions
    pub fn complete(&mut self, key: impl Into<String>, width: u32, height: u32) {
        let key = key.into();
        self.pending.remove(&key);
        self.images.insert(
            key,
            ImageEntry {
                width,
                height,
                bytes: None,
            },
        );
    }

    /// Store PNG bytes for `key`, reading the dimensions from the header
    pub fn insert_png(&mut self, key: impl Into<String>, bytes: Vec<u8>) -> Result<(), LibraryError> {
        let entry = decode_png(bytes)?;
        let key = key.into();
        self.pending.remove(&key);
        self.images.insert(key, entry);
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: ImageEntry) {
        let key = key.into();
        self.pending.remove(&key);
        self.images.insert(key, entry);
    }

    pub fn get(&self, key: &str) -> Option<&ImageEntry> {
        self.images.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ImageEntry> {
        self.pending.remove(key);
        self.images.remove(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for AssetLibrary {
    fn dimensions(&self, key: &str) -> Option<(u32, u32)> {
        if key.is_empty() {
            return None;
        }
        self.images.get(key).map(|e| (e.width, e.height))
    }
}

/// Decode the PNG header and keep the bytes alongside the dimensions
pub fn decode_png(bytes: Vec<u8>) -> Result<ImageEntry, LibraryError> {
    if bytes.is_empty() {
        return Err(LibraryError::Empty);
    }
    let (width, height) = {
        let decoder = png::Decoder::new(Cursor::new(bytes.as_slice()));
        let reader = decoder.read_info()?;
        let info = reader.info();
        (info.width, info.height)
    };
    if width == 0 || height == 0 {
        return Err(LibraryError::ZeroSize);
    }
    Ok(ImageEntry {
        width,
        height,
        bytes: Some(bytes),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a blank RGBA image
    pub(crate) fn blank_png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&vec![0u8; (width * height * 4) as usize])
                .unwrap();
        }
        buf
    }

    #[test]
    fn test_pending_key_has_no_dimensions() {
        let mut library = AssetLibrary::new();
        library.mark_pending("logo");
        assert!(library.is_pending("logo"));
        assert_eq!(library.dimensions("logo"), None);

        library.complete("logo", 200, 100);
        assert!(!library.is_pending("logo"));
        assert_eq!(library.dimensions("logo"), Some((200, 100)));
    }

    #[test]
    fn test_empty_key_never_resolves() {
        let mut library = AssetLibrary::new();
        library.complete("", 10, 10);
        assert_eq!(library.dimensions(""), None);
    }

    #[test]
    fn test_insert_png_reads_header() {
        let mut library = AssetLibrary::new();
        library.insert_png("hero", blank_png(8, 4)).unwrap();
        let entry = library.get("hero").unwrap();
        assert_eq!((entry.width, entry.height), (8, 4));
        assert_eq!(entry.aspect_ratio(), 2.0);
        assert!(entry.bytes.is_some());
    }

    #[test]
    fn test_insert_garbage_fails() {
        let mut library = AssetLibrary::new();
        assert!(library.insert_png("bad", b"not a png".to_vec()).is_err());
        assert!(matches!(
            library.insert_png("empty", Vec::new()),
            Err(LibraryError::Empty)
        ));
        assert!(library.is_empty());
    }
}
