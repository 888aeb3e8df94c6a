use std::f32::consts::PI;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Unsupported skybox format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode skybox: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Skybox image is empty")]
    Empty,
}

// 등장방형(equirectangular) 하늘 이미지. 값은 선형 float 그대로 들고 있음
#[derive(Debug, Clone)]
pub struct Skybox {
    width: u32,
    height: u32,
    pixels: Vec<Vector3<f32>>,
    pub name: String,
}

impl Skybox {
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Vector3<f32>>, name: &str) -> Result<Self, ResourceError> {
        if width == 0 || height == 0 || pixels.len() != (width * height) as usize {
            return Err(ResourceError::Empty);
        }

        Ok(Self {
            width,
            height,
            pixels,
            name: name.to_owned(),
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let format = match path.extension() {
            Some(extension) if extension.eq(OsStr::new("hdr")) => ImageFormat::Hdr,
            Some(extension) if extension.eq(OsStr::new("jpg")) | extension.eq(OsStr::new("jpeg")) => ImageFormat::Jpeg,
            Some(extension) if extension.eq(OsStr::new("png")) => ImageFormat::Png,
            _ => return Err(ResourceError::UnsupportedFormat(path.to_path_buf())),
        };

        let file = File::open(path).map_err(|source| ResourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = image::load(BufReader::new(file), format)?.into_rgb32f();

        let (width, height) = loaded.dimensions();
        let pixels = loaded.pixels().map(|pixel| Vector3::new(pixel[0], pixel[1], pixel[2])).collect();
        let name = path.file_stem().and_then(OsStr::to_str).unwrap_or("skybox");

        Self::from_pixels(width, height, pixels, name)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    // 방향 -> (u, v). -z가 이미지 가운데, 위쪽이 이미지 맨 윗줄
    pub fn sample(&self, direction: &Vector3<f32>) -> Vector3<f32> {
        let direction = direction.normalize();
        let u = 0.5 + direction.x.atan2(-direction.z) / (2.0 * PI);
        let v = direction.y.clamp(-1.0, 1.0).acos() / PI;

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }
}
