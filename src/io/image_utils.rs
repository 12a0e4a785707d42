// Copyright @yucwang 2026

use crate::core::error::RenderError;
use crate::io::exr_utils::write_exr_rgba;
use crate::math::constants::{Float, Vector2u, Vector4f};

use std::fs;
use std::path::Path;

/// Writes `pixels` to `path`, picking the encoding from the extension.
/// Existing files are overwritten.
pub fn save_image(path: &Path, pixels: &[Vector4f], resolution: Vector2u) -> Result<(), RenderError> {
    let width = resolution.x as usize;
    let height = resolution.y as usize;
    check_len(pixels, width, height)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "exr" => write_exr_rgba(pixels, width, height, path),
        "png" | "jpg" | "jpeg" | "bmp" | "tga" => write_ldr(pixels, width, height, path),
        other => Err(RenderError::Image(format!("unsupported image format: '{}'", other))),
    }
}

pub fn write_ldr(pixels: &[Vector4f], width: usize, height: usize, path: &Path) -> Result<(), RenderError> {
    check_len(pixels, width, height)?;
    let bytes = to_srgb8(pixels);
    let extension = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
    if matches!(extension.as_deref(), Some("jpg") | Some("jpeg")) {
        let rgb: Vec<u8> = bytes.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
        image::save_buffer(path, &rgb, width as u32, height as u32, image::ColorType::Rgb8)?;
    } else {
        image::save_buffer(path, &bytes, width as u32, height as u32, image::ColorType::Rgba8)?;
    }
    log::info!("Image written to: {}.", path.display());
    Ok(())
}

fn check_len(pixels: &[Vector4f], width: usize, height: usize) -> Result<(), RenderError> {
    if pixels.len() != width * height {
        return Err(RenderError::Image(format!(
            "pixel buffer holds {} pixels, expected {}x{}",
            pixels.len(),
            width,
            height
        )));
    }
    Ok(())
}

pub fn to_srgb8(pixels: &[Vector4f]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixels.len() * 4);
    for p in pixels {
        bytes.push(quantize(linear_to_srgb(p.x)));
        bytes.push(quantize(linear_to_srgb(p.y)));
        bytes.push(quantize(linear_to_srgb(p.z)));
        bytes.push(quantize(p.w));
    }
    bytes
}

fn linear_to_srgb(x: Float) -> Float {
    let x = if x.is_finite() { x.max(0.0).min(1.0) } else { 0.0 };
    if x <= 0.0031308 {
        12.92 * x
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

fn quantize(x: Float) -> u8 {
    let x = if x.is_finite() { x.max(0.0).min(1.0) } else { 0.0 };
    (x * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::exr_utils::read_exr_rgba;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("macaron-image-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_srgb_endpoints() {
        let bytes = to_srgb8(&[Vector4f::new(0.0, 1.0, 2.0, 1.0), Vector4f::new(Float::NAN, -1.0, 0.5, 0.0)]);
        assert_eq!(&bytes[..4], &[0, 255, 255, 255]);
        assert_eq!(bytes[4], 0);
        assert_eq!(bytes[6], 188);
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn test_exr_round_trip_keeps_layout() {
        let path = temp_path("layout.exr");
        let resolution = Vector2u::new(3, 2);
        let pixels: Vec<Vector4f> = (0..6).map(|i| Vector4f::new(i as Float, 0.0, 0.0, 1.0)).collect();
        save_image(&path, &pixels, resolution).unwrap();

        let loaded = read_exr_rgba(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (3, 2));
        assert_eq!(loaded.data[4].x, 4.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_rejects_mismatched_buffer_and_unknown_format() {
        let resolution = Vector2u::new(2, 2);
        let pixels = vec![Vector4f::zeros(); 3];
        assert!(save_image(&temp_path("short.exr"), &pixels, resolution).is_err());

        let pixels = vec![Vector4f::zeros(); 4];
        assert!(save_image(&temp_path("image.xyz"), &pixels, resolution).is_err());

        let short = vec![Vector4f::zeros(); 2];
        assert!(write_ldr(&short, 2, 2, &temp_path("short.png")).is_err());
    }
}
