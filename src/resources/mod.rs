/**
 * This module contains all logic for loading textures, geometry and shaders
 * from the asset directory, and the ledger that tracks what was acquired.
 */
use std::path::{Path, PathBuf};

use anyhow::Context;

pub mod ledger;
pub mod mesh;
pub mod shader;
pub mod texture;

pub fn asset_path(root: &Path, file_name: &str) -> PathBuf {
    root.join(file_name)
}

pub async fn load_string(root: &Path, file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(root, file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

pub async fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(root, file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}
