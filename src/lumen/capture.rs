use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use nalgebra::Vector4;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to write frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Nothing has been rendered yet")]
    EmptyBuffer,
    #[error("Cannot average over zero passes")]
    ZeroPasses,
}

pub fn frame_path(directory: &Path, frame: u32) -> PathBuf {
    directory.join(format!("{frame}.png"))
}

// 누적 합을 패스 수로 나눠서 8비트로
pub fn tone_map(sum: &Vector4<f32>, divisor: u32) -> [u8; 3] {
    let channel = |value: f32| ((value / divisor as f32).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(sum.x), channel(sum.y), channel(sum.z)]
}

pub fn save_png(buffer: &[Vector4<f32>], width: u32, height: u32, divisor: u32, path: &Path) -> Result<(), CaptureError> {
    if buffer.is_empty() || buffer.len() != (width * height) as usize {
        return Err(CaptureError::EmptyBuffer);
    }
    if divisor == 0 {
        return Err(CaptureError::ZeroPasses);
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let image = RgbImage::from_fn(width, height, |x, y| Rgb(tone_map(&buffer[(y * width + x) as usize], divisor)));
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
