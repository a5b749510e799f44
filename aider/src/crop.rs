//! Content-aware crop and resize.
//!
//! The crop window keeps the target aspect ratio and is placed over the
//! region with the highest local-contrast energy, which tends to follow the
//! subject rather than flat background.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use imageproc::distance_transform::Norm;
use thiserror::Error;

use crate::exif;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(String),
    #[error("webp encoding failed: {0}")]
    WebpEncode(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Largest window of the target aspect ratio that fits inside an
/// `img_w` x `img_h` image.
pub fn ratio_window(img_w: u32, img_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let target_ratio = f64::from(target_w) / f64::from(target_h);
    let img_ratio = f64::from(img_w) / f64::from(img_h);
    if img_ratio > target_ratio {
        ((f64::from(img_h) * target_ratio) as u32, img_h)
    } else {
        (img_w, (f64::from(img_w) / target_ratio) as u32)
    }
}

/// Applies a JPEG EXIF orientation code (2..=8) to a decoded image.
/// Code 1 and unknown codes leave the image untouched.
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate90().flipv(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Content-aware crop to the target aspect ratio, then resize to exactly
/// `width` x `height`.
pub fn smart_crop(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (img_w, img_h) = img.dimensions();
    let (crop_w, crop_h) = ratio_window(img_w, img_h, width, height);
    let (x, y) = best_window_offset(img, crop_w, crop_h);
    img.crop_imm(x, y, crop_w, crop_h)
        .resize_exact(width, height, FilterType::Lanczos3)
}

/// Offset of the `crop_w` x `crop_h` window with the highest local-contrast
/// energy (morphological gradient: dilation minus erosion). The search runs
/// on a grayscale thumbnail so cost is independent of the input resolution.
fn best_window_offset(img: &DynamicImage, crop_w: u32, crop_h: u32) -> (u32, u32) {
    let (img_w, img_h) = img.dimensions();
    if crop_w >= img_w && crop_h >= img_h {
        return (0, 0);
    }

    const ANALYSIS_SIDE: u32 = 256;
    let scale = (f64::from(ANALYSIS_SIDE) / f64::from(img_w.max(img_h))).min(1.0);
    let thumb_w = ((f64::from(img_w) * scale) as u32).max(1);
    let thumb_h = ((f64::from(img_h) * scale) as u32).max(1);
    let gray = img
        .resize_exact(thumb_w, thumb_h, FilterType::Triangle)
        .into_luma8();
    let dilated = imageproc::morphology::dilate(&gray, Norm::L1, 1);
    let eroded = imageproc::morphology::erode(&gray, Norm::L1, 1);

    // Summed-area table over the per-pixel contrast, one row/column of zero
    // padding at the top-left.
    let stride = (thumb_w + 1) as usize;
    let mut integral = vec![0u64; stride * (thumb_h + 1) as usize];
    for y in 0..thumb_h as usize {
        for x in 0..thumb_w as usize {
            let high = dilated.get_pixel(x as u32, y as u32).0[0];
            let low = eroded.get_pixel(x as u32, y as u32).0[0];
            let value = u64::from(high.saturating_sub(low));
            integral[(y + 1) * stride + (x + 1)] = value
                + integral[y * stride + (x + 1)]
                + integral[(y + 1) * stride + x]
                - integral[y * stride + x];
        }
    }
    let window_sum = |x0: usize, y0: usize, x1: usize, y1: usize| -> u64 {
        integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0]
    };

    let win_w = ((f64::from(crop_w) * scale) as u32).clamp(1, thumb_w) as usize;
    let win_h = ((f64::from(crop_h) * scale) as u32).clamp(1, thumb_h) as usize;
    let step = (thumb_w.max(thumb_h) as usize / 32).max(1);

    let mut best = (0usize, 0usize);
    let mut best_energy = 0u64;
    let mut y = 0;
    while y + win_h <= thumb_h as usize {
        let mut x = 0;
        while x + win_w <= thumb_w as usize {
            let sum = window_sum(x, y, x + win_w, y + win_h);
            if sum > best_energy {
                best_energy = sum;
                best = (x, y);
            }
            x += step;
        }
        y += step;
    }

    // Map back to full resolution, clamped so the window stays in bounds.
    let max_x = img_w.saturating_sub(crop_w);
    let max_y = img_h.saturating_sub(crop_h);
    (
        ((best.0 as f64 / scale) as u32).min(max_x),
        ((best.1 as f64 / scale) as u32).min(max_y),
    )
}

/// Writes `img` to `path`, picking the codec from the extension: JPEG at
/// quality 95, PNG at default compression, or lossy WebP.
pub fn save(img: &DynamicImage, path: &Path) -> Result<(), CropError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => {
            let file = std::fs::File::create(path)?;
            let mut writer = std::io::BufWriter::new(file);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, 95);
            img.write_with_encoder(encoder)?;
            Ok(())
        }
        "png" => {
            img.save(path)?;
            Ok(())
        }
        "webp" => {
            // The image crate only writes lossless webp; the webp crate
            // binds the reference encoder for lossy output.
            let encoder = webp::Encoder::from_image(img)
                .map_err(|msg| CropError::WebpEncode(msg.to_string()))?;
            let bytes = encoder.encode(90.0);
            std::fs::write(path, &bytes[..])?;
            Ok(())
        }
        other => Err(CropError::UnsupportedFormat(other.to_string())),
    }
}

/// Full per-file pipeline: decode, honor EXIF orientation, crop, resize,
/// save to `output` in the format its extension names.
pub fn process_file(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
) -> Result<(), CropError> {
    let bytes = std::fs::read(input)?;
    let mut img = image::load_from_memory(&bytes)?;
    // Cameras usually record rotation in EXIF instead of rotating pixels;
    // the scan is a no-op for non-JPEG inputs.
    if let Some(orientation) = exif::jpeg_orientation(&bytes) {
        img = apply_orientation(img, orientation);
    }
    save(&smart_crop(&img, width, height), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn ratio_window_trims_the_long_axis() {
        // Wider than square target: height survives.
        assert_eq!(ratio_window(4000, 3000, 1024, 1024), (3000, 3000));
        // Taller than a 2:1 landscape target: width survives.
        assert_eq!(ratio_window(1000, 1000, 200, 100), (1000, 500));
        // Image already at the target ratio.
        assert_eq!(ratio_window(2048, 1024, 200, 100), (2048, 1024));
    }

    #[test]
    fn orientation_codes_change_dimensions_as_expected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(3, 2));
        assert_eq!(apply_orientation(img.clone(), 1).dimensions(), (3, 2));
        assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (3, 2));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (2, 3));
        assert_eq!(apply_orientation(img.clone(), 8).dimensions(), (2, 3));
        assert_eq!(apply_orientation(img, 5).dimensions(), (2, 3));
    }

    #[test]
    fn horizontal_flip_moves_the_marked_pixel() {
        let mut pixels = RgbImage::new(3, 2);
        pixels.put_pixel(0, 0, Rgb([255, 0, 0]));
        let flipped = apply_orientation(DynamicImage::ImageRgb8(pixels), 2);
        assert_eq!(flipped.get_pixel(2, 0).0[0], 255);
        assert_eq!(flipped.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn smart_crop_returns_exact_target_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([128, 128, 128])));
        let out = smart_crop(&img, 16, 16);
        assert_eq!(out.dimensions(), (16, 16));
    }

    #[test]
    fn crop_window_gravitates_toward_detail() {
        // Left half flat, right half checkerboard: the window should land
        // clearly right of the origin.
        let mut pixels = RgbImage::new(64, 32);
        for y in 0..32 {
            for x in 32..64 {
                if (x + y) % 2 == 0 {
                    pixels.put_pixel(x, y, Rgb([255, 255, 255]));
                }
            }
        }
        let img = DynamicImage::ImageRgb8(pixels);
        let (x, _) = best_window_offset(&img, 32, 32);
        assert!(x >= 16, "expected the window on the textured half, got x={x}");
    }

    #[test]
    fn save_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let err = save(&img, &dir.path().join("out.gif")).unwrap_err();
        assert!(matches!(err, CropError::UnsupportedFormat(_)));
    }

    #[test]
    fn save_round_trips_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        save(&img, &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!(back.dimensions(), (8, 8));
    }
}
