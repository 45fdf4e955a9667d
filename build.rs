use anyhow::*;
use fs_extra::dir::{CopyOptions, copy};
use std::env;
use std::path::PathBuf;

/// Mirrors `assets/` into `OUT_DIR/assets`, the fallback asset root of the binary.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        println!("cargo:warning=no assets directory at {}", assets.display());
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy(&assets, &out_dir, &options)
        .with_context(|| format!("copying {} to {}", assets.display(), out_dir.display()))?;
    Ok(())
}
