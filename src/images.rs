/// Image boundary for the studio
///
/// Everything the app and the generation provider exchange is an
/// `ImageHandle`: the encoded bytes of a PNG/JPEG/WebP plus its mime type,
/// behind an `Arc` so layers and caches can share one copy freely.
/// Decoding to pixels only ever happens inside the UI toolkit.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use image::ImageFormat;

/// A shared, immutable, already-encoded image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle {
    data: Arc<ImageData>,
}

#[derive(PartialEq, Eq)]
struct ImageData {
    bytes: Vec<u8>,
    mime: String,
}

/// Errors crossing the file/image boundary
#[derive(Debug, thiserror::Error)]
pub enum ImageFileError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("not a recognized image format (PNG, JPEG or WebP expected)")]
    Unrecognized,
}

impl ImageHandle {
    /// Wrap already-encoded bytes, sniffing the container format.
    ///
    /// Rejects anything the `image` crate does not recognize, so a stray
    /// text file picked in the dialog never reaches the provider.
    pub fn from_encoded_bytes(bytes: Vec<u8>) -> Result<Self, ImageFileError> {
        let format = image::guess_format(&bytes).map_err(|_| ImageFileError::Unrecognized)?;
        let mime = match format {
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => {
                format.to_mime_type().to_string()
            }
            _ => return Err(ImageFileError::Unrecognized),
        };
        Ok(Self {
            data: Arc::new(ImageData { bytes, mime }),
        })
    }

    /// Read and validate an image file chosen by the user.
    pub fn load_from_path(path: &Path) -> Result<Self, ImageFileError> {
        let bytes = std::fs::read(path).map_err(|source| ImageFileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_encoded_bytes(bytes)
    }

    /// Rebuild a handle from a base64 payload (the provider's wire format).
    pub fn from_base64(data: &str) -> Result<Self, ImageFileError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|_| ImageFileError::Unrecognized)?;
        Self::from_encoded_bytes(bytes)
    }

    /// Encoded bytes, as stored.
    pub fn bytes(&self) -> &[u8] {
        &self.data.bytes
    }

    /// Mime type matching `bytes()` (e.g. `image/png`).
    pub fn mime(&self) -> &str {
        &self.data.mime
    }

    /// Base64 of the encoded bytes, for inline transport to the provider.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data.bytes)
    }

    /// Write the encoded bytes out unchanged (the download path).
    pub fn save_to_path(&self, path: &Path) -> Result<(), ImageFileError> {
        std::fs::write(path, &self.data.bytes).map_err(|source| ImageFileError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

// Byte dumps make Debug output useless; show shape instead.
impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("mime", &self.data.mime)
            .field("len", &self.data.bytes.len())
            .finish()
    }
}

/// Suggested file name for a download, e.g. `fit-studio-20260807-141502.png`.
pub fn suggested_download_name() -> String {
    format!("fit-studio-{}.png", Utc::now().format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest encodable image: a 1x1 PNG. Distinct shades give distinct
    /// handles, which the state-machine tests rely on to tell results apart.
    pub(crate) fn tiny_png(shade: u8) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(1, 1, image::Rgba([shade, shade, shade, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// A ready-made handle for tests elsewhere in the crate.
    pub(crate) fn test_handle(shade: u8) -> ImageHandle {
        ImageHandle::from_encoded_bytes(tiny_png(shade)).unwrap()
    }

    #[test]
    fn sniffs_png_mime() {
        let handle = ImageHandle::from_encoded_bytes(tiny_png(255)).unwrap();
        assert_eq!(handle.mime(), "image/png");
    }

    #[test]
    fn rejects_non_image_bytes() {
        let result = ImageHandle::from_encoded_bytes(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(ImageFileError::Unrecognized)));
    }

    #[test]
    fn base64_round_trips_the_exact_bytes() {
        let original = ImageHandle::from_encoded_bytes(tiny_png(7)).unwrap();
        let rebuilt = ImageHandle::from_base64(&original.to_base64()).unwrap();
        assert_eq!(original, rebuilt);
    }
}
