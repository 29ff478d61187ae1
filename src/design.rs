//! The generated design image: decoding the backend's base64 JPEG payload,
//! scaling it for the terminal preview, and exporting it to disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbImage;

/// A decoded design image.
///
/// Keeps the original base64 payload alongside the decoded pixels: the
/// payload goes verbatim into the `data:` URI of the HTML export, the pixels
/// feed the terminal preview.
pub struct GeneratedImage {
    base64: String,
    jpeg: Vec<u8>,
    pixels: RgbImage,
}

impl GeneratedImage {
    /// Decode the base64 JPEG string returned by `/image_generate`.
    pub fn from_base64(base64_str: &str) -> Result<Self> {
        let trimmed = base64_str.trim();
        let jpeg = BASE64
            .decode(trimmed)
            .context("image payload is not valid base64")?;
        let pixels = image::load_from_memory(&jpeg)
            .context("image payload did not decode as an image")?
            .to_rgb8();

        Ok(Self {
            base64: trimmed.to_string(),
            jpeg,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The image as a `data:image/jpeg;base64,...` URI, the same source a
    /// browser `<img>` tag would be given.
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.base64)
    }

    /// Scale the image down to fit a terminal cell grid. Each cell renders
    /// two vertically stacked pixels (the upper-half-block glyph), so the
    /// pixel budget is `cols` wide by `rows * 2` tall. Aspect ratio is
    /// preserved and the image is never upscaled.
    pub fn preview(&self, cols: u16, rows: u16) -> RgbImage {
        let width = self.pixels.width().max(1);
        let height = self.pixels.height().max(1);
        let max_width = cols.max(1) as u32;
        let max_height = rows.max(1) as u32 * 2;

        let scale = f64::min(
            max_width as f64 / width as f64,
            max_height as f64 / height as f64,
        )
        .min(1.0);
        let out_width = ((width as f64 * scale) as u32).max(1);
        let out_height = ((height as f64 * scale) as u32).max(1);

        image::imageops::thumbnail(&self.pixels, out_width, out_height)
    }

    /// Write the JPEG bytes to a timestamped file under `dir`.
    pub fn save_jpeg(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create image directory {}", dir.display()))?;
        let name = format!("design-{}.jpg", chrono::Local::now().format("%Y%m%d-%H%M%S"));
        let path = dir.join(name);
        fs::write(&path, &self.jpeg)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write a standalone HTML page that shows the image through its data
    /// URI. Used by the open-in-browser action.
    pub fn export_html(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        let path = dir.join("design.html");
        let html = format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head><meta charset=\"utf-8\"><title>Atelier design</title></head>\n\
             <body style=\"margin:0;background:#111\">\n\
             <img src=\"{}\" alt=\"Generated design\" style=\"display:block;margin:2em auto;max-width:90%\">\n\
             </body>\n\
             </html>\n",
            self.data_uri()
        );
        fs::write(&path, html)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;

    fn jpeg_base64(width: u32, height: u32) -> String {
        let pixels = RgbImage::from_pixel(width, height, image::Rgb([180, 40, 90]));
        let mut jpeg = Vec::new();
        pixels
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 90))
            .unwrap();
        BASE64.encode(&jpeg)
    }

    #[test]
    fn test_decodes_base64_jpeg() {
        let image = GeneratedImage::from_base64(&jpeg_base64(6, 4)).unwrap();
        assert_eq!(image.width(), 6);
        assert_eq!(image.height(), 4);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(GeneratedImage::from_base64("not base64!!!").is_err());
    }

    #[test]
    fn test_rejects_non_image_payload() {
        let encoded = BASE64.encode(b"just some text");
        assert!(GeneratedImage::from_base64(&encoded).is_err());
    }

    #[test]
    fn test_data_uri_embeds_payload() {
        let encoded = jpeg_base64(2, 2);
        let image = GeneratedImage::from_base64(&encoded).unwrap();
        let uri = image.data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert!(uri.ends_with(&encoded));
    }

    #[test]
    fn test_preview_fits_cell_grid() {
        let image = GeneratedImage::from_base64(&jpeg_base64(100, 50)).unwrap();
        let preview = image.preview(20, 20);
        // 20 cells wide, 40 pixel rows tall; width is the binding constraint.
        assert_eq!(preview.width(), 20);
        assert_eq!(preview.height(), 10);
    }

    #[test]
    fn test_preview_never_upscales() {
        let image = GeneratedImage::from_base64(&jpeg_base64(6, 4)).unwrap();
        let preview = image.preview(40, 40);
        assert_eq!(preview.width(), 6);
        assert_eq!(preview.height(), 4);
    }

    #[test]
    fn test_save_jpeg_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage::from_base64(&jpeg_base64(4, 4)).unwrap();
        let path = image.save_jpeg(dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(fs::read(&path).unwrap(), image.jpeg);
    }

    #[test]
    fn test_export_html_contains_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage::from_base64(&jpeg_base64(4, 4)).unwrap();
        let path = image.export_html(dir.path()).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains(&image.data_uri()));
    }
}
