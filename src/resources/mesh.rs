use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::geometry::{self, GeometryData, VertexLayout},
    resources::{
        ledger::{ResourceKind, ResourceLedger, TrackedMap},
        load_string,
    },
};

/// A vertex buffer on the GPU and the layout it was written with.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub layout: VertexLayout,
}

/// Parses an OBJ file into flattened `2f 3f 3f` geometry. Materials referenced
/// by the file are read from the same root but not used; the scene assigns
/// textures itself.
pub async fn load_obj(root: &Path, file_name: &str) -> anyhow::Result<GeometryData> {
    let obj_text = load_string(root, file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let root: PathBuf = root.to_path_buf();
    let (models, materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let root = root.clone();
            async move {
                match load_string(&root, &p).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::warn!("{e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("could not parse {file_name}"))?;

    if let Err(e) = materials {
        log::debug!("{file_name} has no usable materials: {e}");
    }
    geometry::from_obj_models(&models, file_name)
}

/// Named vertex buffers. Procedural shapes are added directly, OBJ meshes are
/// loaded from the asset root.
pub struct GeometryStore {
    meshes: TrackedMap<Mesh>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self {
            meshes: TrackedMap::new(ResourceKind::Buffer),
        }
    }

    pub fn add(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        data: GeometryData,
        ledger: &mut ResourceLedger,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.meshes.contains(name),
            "geometry {name:?} is already registered"
        );
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} vertex buffer")),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        log::debug!(
            "geometry {name:?}: {} vertices, layout {:?}",
            data.vertex_count(),
            data.layout.format()
        );
        self.meshes.insert(
            ledger,
            name,
            Mesh {
                vertex_buffer,
                vertex_count: data.vertex_count(),
                layout: data.layout,
            },
        )
    }

    pub async fn load_obj(
        &mut self,
        device: &wgpu::Device,
        root: &Path,
        name: &str,
        file_name: &str,
        ledger: &mut ResourceLedger,
    ) -> anyhow::Result<()> {
        let data = load_obj(root, file_name).await?;
        self.add(device, name, data, ledger)
    }

    pub fn get(&self, name: &str) -> anyhow::Result<&Mesh> {
        self.meshes
            .get(name)
            .with_context(|| format!("geometry {name:?} is not registered"))
    }

    pub fn layout(&self, name: &str) -> anyhow::Result<&VertexLayout> {
        self.get(name).map(|mesh| &mesh.layout)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn release(&mut self, ledger: &mut ResourceLedger) -> anyhow::Result<()> {
        self.meshes
            .release_all(ledger, |mesh| mesh.vertex_buffer.destroy())
    }
}

impl Default for GeometryStore {
    fn default() -> Self {
        Self::new()
    }
}
