use std::path::Path;

use anyhow::*;
use futures::future::try_join_all;

use crate::{
    data_structures::texture::{CUBE_FACES, Texture},
    resources::{
        load_binary,
        ledger::{ResourceKind, ResourceLedger, TrackedMap},
    },
};

/// Where a named texture comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureSource {
    /// A single image file, relative to the asset root.
    Image(String),
    /// A directory holding `right.png` .. `back.png`.
    CubeMap(String),
    /// An empty square depth texture of the given size.
    ShadowMap(u32),
}

pub fn cube_face_paths(dir: &str) -> Vec<String> {
    CUBE_FACES
        .iter()
        .map(|face| format!("{}/{face}.png", dir.trim_end_matches('/')))
        .collect()
}

enum Decoded {
    Image(image::DynamicImage),
    CubeMap(Vec<image::DynamicImage>),
    ShadowMap(u32),
}

async fn decode(root: &Path, name: &str, source: &TextureSource) -> Result<Decoded> {
    let decode_file = |bytes: Vec<u8>, file: &str| {
        image::load_from_memory(&bytes)
            .with_context(|| format!("could not decode {file} for texture {name:?}"))
    };
    Ok(match source {
        TextureSource::Image(file) => {
            let bytes = load_binary(root, file).await?;
            Decoded::Image(decode_file(bytes, file.as_str())?)
        }
        TextureSource::CubeMap(dir) => {
            let files = cube_face_paths(dir);
            let bytes = try_join_all(files.iter().map(|file| load_binary(root, file))).await?;
            let faces = bytes
                .into_iter()
                .zip(&files)
                .map(|(bytes, file)| decode_file(bytes, file.as_str()))
                .collect::<Result<Vec<_>>>()?;
            Decoded::CubeMap(faces)
        }
        TextureSource::ShadowMap(size) => Decoded::ShadowMap(*size),
    })
}

/// Named GPU textures. Files are read and decoded concurrently, then uploaded
/// in request order.
pub struct TextureStore {
    textures: TrackedMap<Texture>,
}

impl TextureStore {
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        root: &Path,
        requests: &[(&str, TextureSource)],
        ledger: &mut ResourceLedger,
    ) -> Result<Self> {
        let decoded =
            try_join_all(requests.iter().map(|(name, source)| decode(root, name, source))).await?;

        let mut textures = TrackedMap::new(ResourceKind::Texture);
        for ((name, _), decoded) in requests.iter().zip(decoded) {
            let texture = match decoded {
                Decoded::Image(img) => Texture::from_image(device, queue, &img, name)?,
                Decoded::CubeMap(faces) => Texture::create_cube_map(device, queue, &faces, name)?,
                Decoded::ShadowMap(size) => Texture::create_shadow_map(device, size),
            };
            log::debug!("loaded texture {name:?}");
            textures.insert(ledger, name, texture)?;
        }
        log::info!("loaded {} textures", textures.len());
        Ok(Self { textures })
    }

    pub fn get(&self, name: &str) -> Result<&Texture> {
        self.textures
            .get(name)
            .with_context(|| format!("texture {name:?} is not loaded"))
    }

    pub fn release(&mut self, ledger: &mut ResourceLedger) -> Result<()> {
        self.textures.release_all(ledger, Texture::destroy)
    }
}
