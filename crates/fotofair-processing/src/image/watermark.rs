//! Tiled watermarking for preview images.
//!
//! The watermark is scaled so its height equals 1/16 of the source image
//! height (floor, clamped to at least 1 px), then tiled across the whole
//! image in a regular grid starting flush at the top-left corner, each tile
//! composited with a standard "over" alpha blend.

use image::{imageops, DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// The watermark height is the source image height divided by this.
pub const WATERMARK_HEIGHT_DIVISOR: u32 = 16;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("failed to decode source image: {0}")]
    Decode(String),

    #[error("failed to encode preview: {0}")]
    Encode(String),

    #[error("invalid watermark asset: {0}")]
    Asset(String),
}

/// The fixed watermark image, decoded once at startup and shared across jobs.
#[derive(Clone)]
pub struct WatermarkAsset {
    image: RgbaImage,
}

impl WatermarkAsset {
    pub fn from_bytes(data: &[u8]) -> Result<Self, WatermarkError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| WatermarkError::Asset(e.to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| WatermarkError::Asset(e.to_string()))?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(WatermarkError::Asset("watermark has zero size".to_string()));
        }
        Ok(Self { image })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let data = std::fs::read(path.as_ref()).map_err(|e| {
            WatermarkError::Asset(format!(
                "cannot read watermark {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(&data)
    }
}

/// Scaled watermark height for a source image of the given height.
/// Integer floor division, clamped so a tiny source never yields a
/// zero-sized asset.
pub fn scaled_watermark_height(source_height: u32) -> u32 {
    (source_height / WATERMARK_HEIGHT_DIVISOR).max(1)
}

/// Top-left corners of every tile needed to cover an `img_w` x `img_h` image
/// with `tile_w` x `tile_h` tiles, starting flush at (0, 0).
///
/// Produces exactly `ceil(img_w / tile_w) * ceil(img_h / tile_h)` positions.
pub fn tile_origins(img_w: u32, img_h: u32, tile_w: u32, tile_h: u32) -> Vec<(i64, i64)> {
    let mut origins = Vec::new();
    let mut y = 0u32;
    while y < img_h {
        let mut x = 0u32;
        while x < img_w {
            origins.push((x as i64, y as i64));
            x += tile_w;
        }
        y += tile_h;
    }
    origins
}

pub struct Watermark;

impl Watermark {
    /// Produce the watermarked preview for `source`, re-encoded in the source
    /// format (JPEG stays JPEG, everything else becomes PNG).
    pub fn apply_tiled(source: &[u8], asset: &WatermarkAsset) -> Result<Vec<u8>, WatermarkError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| WatermarkError::Decode(e.to_string()))?;
        let format = reader.format();
        let img = reader
            .decode()
            .map_err(|e| WatermarkError::Decode(e.to_string()))?;

        let (img_width, img_height) = (img.width(), img.height());
        let (wm_width, wm_height) = (asset.image.width(), asset.image.height());

        // Scale to 1/16 of the source height, preserving aspect ratio.
        let target_h = scaled_watermark_height(img_height);
        let target_w =
            ((wm_width as u64 * target_h as u64) / wm_height as u64).max(1) as u32;

        let tile = if (target_w, target_h) != (wm_width, wm_height) {
            DynamicImage::ImageRgba8(asset.image.clone())
                .resize_exact(target_w, target_h, imageops::FilterType::Triangle)
                .to_rgba8()
        } else {
            asset.image.clone()
        };

        let mut composited = img.to_rgba8();
        for (x, y) in tile_origins(img_width, img_height, target_w, target_h) {
            imageops::overlay(&mut composited, &tile, x, y);
        }

        encode_preview(composited, format)
    }
}

fn encode_preview(
    composited: RgbaImage,
    format: Option<ImageFormat>,
) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    match format {
        // JPEG has no alpha channel.
        Some(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(composited).to_rgb8())
            .write_to(&mut cursor, ImageFormat::Jpeg)
            .map_err(|e| WatermarkError::Encode(e.to_string()))?,
        _ => DynamicImage::ImageRgba8(composited)
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| WatermarkError::Encode(e.to_string()))?,
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn white_image(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        ))
    }

    fn black_watermark() -> WatermarkAsset {
        let img = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]));
        WatermarkAsset::from_bytes(&encode_png(&img)).unwrap()
    }

    #[test]
    fn preview_keeps_source_dimensions() {
        let source = white_image(800, 600);
        let preview = Watermark::apply_tiled(&source, &black_watermark()).unwrap();

        let decoded = image::load_from_memory(&preview).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[test]
    fn tiling_starts_flush_at_origin() {
        let source = white_image(800, 600);
        let preview = Watermark::apply_tiled(&source, &black_watermark()).unwrap();

        // Opaque black watermark over white: pixel (0,0) must be covered.
        let decoded = image::load_from_memory(&preview).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn tile_count_matches_grid_formula() {
        // 800x600 image, watermark scaled to 50px height (and some width w):
        // count must equal ceil(800/w) * ceil(600/50).
        let (img_w, img_h) = (800u32, 600u32);
        let tile_h = scaled_watermark_height(img_h);
        assert_eq!(tile_h, 37); // 600 / 16

        let tile_w = 74; // 2:1 watermark scaled to tile_h
        let origins = tile_origins(img_w, img_h, tile_w, tile_h);
        let expected = (img_w as usize).div_ceil(tile_w as usize)
            * (img_h as usize).div_ceil(tile_h as usize);
        assert_eq!(origins.len(), expected);
        assert_eq!(origins[0], (0, 0));
    }

    #[test]
    fn tile_count_for_50px_watermark() {
        let origins = tile_origins(800, 600, 80, 50);
        assert_eq!(origins.len(), (800usize.div_ceil(80)) * (600usize.div_ceil(50)));
    }

    #[test]
    fn tiny_source_clamps_watermark_to_one_pixel() {
        assert_eq!(scaled_watermark_height(10), 1);
        assert_eq!(scaled_watermark_height(15), 1);
        assert_eq!(scaled_watermark_height(16), 1);
        assert_eq!(scaled_watermark_height(32), 2);

        // Must not panic on an image smaller than the watermark.
        let source = white_image(8, 8);
        let preview = Watermark::apply_tiled(&source, &black_watermark()).unwrap();
        let decoded = image::load_from_memory(&preview).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn corrupt_source_is_a_decode_error() {
        let err = Watermark::apply_tiled(b"this is not an image", &black_watermark()).unwrap_err();
        assert!(matches!(err, WatermarkError::Decode(_)));
    }

    #[test]
    fn jpeg_source_reencodes_as_jpeg() {
        let img =
            DynamicImage::ImageRgb8(image::RgbImage::from_pixel(64, 64, image::Rgb([200, 10, 10])));
        let mut source = Vec::new();
        img.write_to(&mut Cursor::new(&mut source), ImageFormat::Jpeg)
            .unwrap();

        let preview = Watermark::apply_tiled(&source, &black_watermark()).unwrap();
        assert_eq!(
            image::guess_format(&preview).unwrap(),
            ImageFormat::Jpeg
        );
    }
}
