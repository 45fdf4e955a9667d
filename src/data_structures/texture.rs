//! GPU textures and texture creation utilities.
//!
//! [`Texture`] wraps a wgpu texture with its view and sampler. Three kinds are
//! created here: mipmapped 2D material textures, cube maps for the skybox and
//! depth textures (the screen depth buffer and the shadow map).

use anyhow::*;
use image::{DynamicImage, GenericImageView, RgbaImage, imageops::FilterType};

/// Cube faces in layer order.
pub const CUBE_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

/// Maximum anisotropic filtering level for material textures.
pub const MAX_ANISOTROPY: u16 = 16;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// CPU generated mip chain. Level 0 is the image itself.
pub fn mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let (width, height) = image.dimensions();
    let mut levels = vec![image.clone()];
    for level in 1..mip_level_count(width, height) {
        let w = (width >> level).max(1);
        let h = (height >> level).max(1);
        let previous = &levels[level as usize - 1];
        levels.push(image::imageops::resize(previous, w, h, FilterType::Triangle));
    }
    levels
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth buffer matching the surface size, used by the colour pass.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let (texture, view) = depth_target(device, size, label);
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Square depth target rendered by the shadow pass and sampled with a
    /// comparison sampler by the colour pass.
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let (texture, view) = depth_target(device, [size, size], "shadow map");
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow map sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload an image as an sRGB texture. The image is flipped vertically
    /// first because texture coordinates start at the bottom row.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        label: &str,
    ) -> Result<Self> {
        let (width, height) = img.dimensions();
        ensure!(width > 0 && height > 0, "texture {label:?} is empty");
        let rgba = img.flipv().to_rgba8();
        let levels = mip_chain(&rgba);

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, image) in levels.iter().enumerate() {
            write_layer(queue, &texture, image, level as u32, 0);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            anisotropy_clamp: MAX_ANISOTROPY,
            ..Default::default()
        }));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// Build a cube map from six decoded faces in [`CUBE_FACES`] order. All
    /// faces must be square and share one size. Faces are not flipped.
    pub fn create_cube_map(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[DynamicImage],
        label: &str,
    ) -> Result<Self> {
        ensure!(
            faces.len() == CUBE_FACES.len(),
            "cube map {label:?} needs {} faces, got {}",
            CUBE_FACES.len(),
            faces.len()
        );
        let (width, height) = faces[0].dimensions();
        ensure!(
            width == height && width > 0,
            "cube map {label:?} faces must be square, got {width}x{height}"
        );
        for (face, name) in faces.iter().zip(CUBE_FACES) {
            ensure!(
                face.dimensions() == (width, height),
                "cube map {label:?} face {name} is {:?}, expected {width}x{height}",
                face.dimensions()
            );
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, &face.to_rgba8(), 0, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        }));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

fn depth_target(
    device: &wgpu::Device,
    size: [u32; 2],
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: Texture::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    image: &RgbaImage,
    mip_level: u32,
    layer: u32,
) {
    let (width, height) = image.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
