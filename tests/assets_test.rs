use std::path::{Path, PathBuf};

use shadowbox::{
    link::Technique,
    resources::{
        asset_path, load_binary,
        mesh::load_obj,
        shader::shader_paths,
        texture::{TextureSource, cube_face_paths},
    },
    scene::{GeometrySource, SCENE_GEOMETRY, scene_textures},
};

fn assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

#[test]
fn every_technique_has_a_shader_pair() {
    for technique in Technique::ALL {
        for file in shader_paths(technique) {
            let path = asset_path(&assets(), &file);
            let source = std::fs::read_to_string(&path).unwrap();
            assert!(source.contains("@group(0)") || source.contains("@fragment"), "{file}");
        }
    }
}

#[test]
fn scene_textures_decode() {
    for (name, source) in scene_textures(1024) {
        let files = match source {
            TextureSource::Image(file) => vec![file],
            TextureSource::CubeMap(dir) => cube_face_paths(&dir),
            TextureSource::ShadowMap(_) => continue,
        };
        let mut sizes = Vec::new();
        for file in files {
            let size = image::image_dimensions(asset_path(&assets(), &file)).unwrap();
            sizes.push(size);
        }
        if name == "skybox" {
            assert_eq!(sizes.len(), 6);
            assert!(sizes.iter().all(|&s| s == sizes[0] && s.0 == s.1));
        }
    }
}

#[tokio::test]
async fn scene_meshes_load() {
    for (name, source) in SCENE_GEOMETRY {
        let GeometrySource::Obj(file) = source else {
            continue;
        };
        let data = load_obj(&assets(), file).await.unwrap();
        assert_eq!(data.layout, source.layout(), "{name}");
        assert!(data.vertex_count() > 0);
        assert_eq!(data.vertex_count() % 3, 0);
    }
}

#[tokio::test]
async fn missing_asset_names_the_path() {
    let err = load_binary(&assets(), "textures/nope.png").await.unwrap_err();
    assert!(format!("{err:#}").contains("nope.png"));
}
