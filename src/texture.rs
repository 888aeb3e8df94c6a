use log::warn;
use wgpu::{
    Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Texture, TextureAspect, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};

// CPU에서 그린 RGBA8 이미지를 egui가 그릴 수 있도록 GPU에 올려두는 텍스쳐
pub struct Image {
    pub gpu_texture: Texture,
    pub view: TextureView,
    pub name: String,
}

impl Image {
    pub fn new(device: &Device, width: u32, height: u32, label: &str) -> Image {
        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1, // 이미지의 레이어 갯수. 단순한 2차원 이미지니 1개로
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,

            // Texture Binding: egui 쉐이더에서 쓸 예정
            // Copy destination: 매 프레임 CPU에서 GPU로 복사됨
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default()
        });

        Self {
            gpu_texture,
            view,
            name: label.to_string(),
        }
    }

    pub fn load_image(&self, queue: &Queue, rgba: &[u8]) {
        let (width, height) = self.size();
        if (width * height * 4) as usize != rgba.len() {
            warn!("{}: expected {}x{} pixels, got {} bytes", self.name, width, height, rgba.len());
            return;
        }

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            self.gpu_texture.size(),
        )
    }

    // 크기가 바뀌어서 새로 만들었으면 true
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> bool {
        if self.size() == (width, height) || width == 0 || height == 0 {
            return false;
        }

        *self = Self::new(device, width, height, &self.name);
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu_texture.width(), self.gpu_texture.height())
    }
}
