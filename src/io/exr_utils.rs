/* Copyright 2020 @TwoCookingMice */

use crate::core::error::RenderError;
use crate::math::constants::Vector4f;

use exr::prelude::*;

use std::path::Path;

#[derive(Debug)]
pub struct RgbaPixels {
    pub width: usize,
    pub height: usize,
    pub data: Vec<Vector4f>,
}

// Read EXR Image from file
pub fn read_exr_rgba<P: AsRef<Path>>(file_path: P) -> std::result::Result<RgbaPixels, RenderError> {
    log::info!("Starting reading OpenEXR image from: {}.", file_path.as_ref().display());

    let image = read()
        .no_deep_data()
        .largest_resolution_level()
        .rgba_channels(
            |resolution, _| RgbaPixels {
                width: resolution.width(),
                height: resolution.height(),
                data: vec![Vector4f::zeros(); resolution.width() * resolution.height()],
            },
            |image: &mut RgbaPixels, position, (r, g, b, a): (f32, f32, f32, f32)| {
                let idx = position.y() * image.width + position.x();
                image.data[idx] = Vector4f::new(r, g, b, a);
            },
        )
        .first_valid_layer()
        .all_attributes()
        .from_file(file_path.as_ref())?;

    let pixels = image.layer_data.channel_data.pixels;
    log::info!("OpenEXR loaded, width = {}, height = {}.", pixels.width, pixels.height);
    Ok(pixels)
}

// Write EXR Image to file
pub fn write_exr_rgba<P: AsRef<Path>>(
    image: &[Vector4f],
    width: usize,
    height: usize,
    file_path: P,
) -> std::result::Result<(), RenderError> {
    if image.len() != width * height {
        return Err(RenderError::Image(format!(
            "pixel buffer holds {} pixels, expected {}x{}",
            image.len(),
            width,
            height
        )));
    }
    log::info!("Starting writing openexr images: {}.", file_path.as_ref().display());

    write_rgba_file(file_path.as_ref(), width, height, |x, y| {
        let p = image[y * width + x];
        (p.x, p.y, p.z, p.w)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rejects_short_buffer() {
        let path = std::env::temp_dir().join(format!("macaron-exr-short-{}.exr", std::process::id()));
        let pixels = vec![Vector4f::zeros(); 5];
        match write_exr_rgba(&pixels, 3, 2, &path) {
            Err(RenderError::Image(msg)) => assert!(msg.contains("5 pixels")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!path.exists());
    }
}
