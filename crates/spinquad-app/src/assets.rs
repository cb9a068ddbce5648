//! Texture loading.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use spinquad_gpu::GpuError;

/// Tightly packed RGBA8 pixels, row-major, top row first.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl From<ImageBuffer<Rgba<u8>, Vec<u8>>> for DecodedImage {
    fn from(image: ImageBuffer<Rgba<u8>, Vec<u8>>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// Read an image file and convert it to RGBA8.
pub fn load_rgba8(path: impl AsRef<Path>) -> spinquad_gpu::Result<DecodedImage> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| GpuError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_rgba8(&bytes).map_err(|e| GpuError::ImageDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    tracing::debug!(
        "Loaded texture {}: {}x{}",
        path.display(),
        decoded.width,
        decoded.height
    );
    Ok(decoded)
}

/// Decode an in-memory PNG or JPEG to RGBA8.
pub fn decode_rgba8(bytes: &[u8]) -> image::ImageResult<DecodedImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8().into())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use image::ImageFormat;

    use super::*;

    fn encode_png(image: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn png_decodes_to_packed_rgba() {
        let mut source = ImageBuffer::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        source.put_pixel(2, 1, Rgba([200, 100, 50, 128]));

        let decoded = decode_rgba8(&encode_png(&source)).unwrap();

        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels.len(), 3 * 2 * 4);
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
        assert_eq!(&decoded.pixels[20..], &[200, 100, 50, 128]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_rgba8(b"definitely not a png").is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_rgba8("textures/does-not-exist.png").unwrap_err();
        assert!(matches!(err, GpuError::FileRead { .. }));
    }

    #[test]
    fn shipped_texture_decodes() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../textures/texture.png");
        let texture = load_rgba8(path).unwrap();
        assert!(texture.width > 0 && texture.height > 0);
        assert_eq!(
            texture.pixels.len(),
            texture.width as usize * texture.height as usize * 4
        );
    }
}
