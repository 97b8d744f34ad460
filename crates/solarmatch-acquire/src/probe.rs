//! Image probing: format detection and natural dimensions

use std::io::Cursor;

use crate::error::{AcquireError, Result};

/// Fetched image bytes together with their decoded natural size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// MIME type of the detected format
    pub mime_type: &'static str,
}

/// Detect the format of `bytes` and read its dimensions from the header
///
/// Only the header is decoded here; full pixel decoding happens when the
/// image is placed in a report.
pub fn probe_image(bytes: Vec<u8>) -> Result<ImageAsset> {
    if bytes.is_empty() {
        return Err(AcquireError::Decode {
            reason: "image payload is empty".to_string(),
        });
    }

    let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| AcquireError::Decode {
            reason: format!("failed to read image header: {}", e),
        })?;

    let format = reader.format().ok_or_else(|| AcquireError::Decode {
        reason: "unrecognised image format".to_string(),
    })?;

    let (width, height) = reader.into_dimensions().map_err(|e| AcquireError::Decode {
        reason: format!("failed to read image dimensions: {}", e),
    })?;

    if width == 0 || height == 0 {
        return Err(AcquireError::Decode {
            reason: format!("image has degenerate size {}x{}", width, height),
        });
    }

    Ok(ImageAsset {
        bytes,
        width,
        height,
        mime_type: format.to_mime_type(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 20]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_probe_png_dimensions() {
        let asset = probe_image(png(40, 25)).unwrap();
        assert_eq!((asset.width, asset.height), (40, 25));
        assert_eq!(asset.mime_type, "image/png");
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(probe_image(b"definitely not an image".to_vec()).is_err());
        assert!(probe_image(Vec::new()).is_err());
    }
}
