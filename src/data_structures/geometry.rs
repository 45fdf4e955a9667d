//! CPU-side vertex data and its layout.
//!
//! Every vertex stream is a flat, non-indexed list of `f32`s described by a
//! [`VertexLayout`]: a format string of component counts (`"2f 3f 3f"`) and a
//! parallel list of attribute names. Attribute names decide which shader
//! location an attribute is bound to, so a pipeline can be built for any
//! stream whose attributes cover what the shader reads.

use anyhow::{Context, bail, ensure};
use cgmath::{InnerSpace, Vector3};

pub const IN_POSITION: &str = "in_position";
pub const IN_NORMAL: &str = "in_normal";
pub const IN_TEXCOORD: &str = "in_texcoord_0";

/// Shader location each known attribute name is bound to.
pub fn shader_location(name: &str) -> Option<u32> {
    match name {
        IN_POSITION => Some(0),
        IN_NORMAL => Some(1),
        IN_TEXCOORD => Some(2),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub name: String,
    pub components: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Builds a layout from a format string such as `"2f 3f 3f"` and one
    /// attribute name per format token.
    pub fn parse(format: &str, names: &[&str]) -> anyhow::Result<Self> {
        let tokens: Vec<&str> = format.split_whitespace().collect();
        ensure!(!tokens.is_empty(), "empty vertex format");
        ensure!(
            tokens.len() == names.len(),
            "vertex format {format:?} has {} attributes but {} names were given",
            tokens.len(),
            names.len()
        );
        let mut attributes = Vec::with_capacity(tokens.len());
        for (token, name) in tokens.into_iter().zip(names) {
            let Some(count) = token.strip_suffix('f') else {
                bail!("unsupported vertex format token {token:?} in {format:?}");
            };
            let components: u32 = count
                .parse()
                .with_context(|| format!("bad component count in {token:?}"))?;
            ensure!(
                (1..=4).contains(&components),
                "attribute {name} has {components} components, expected 1 to 4"
            );
            ensure!(
                shader_location(name).is_some(),
                "unknown vertex attribute {name:?}"
            );
            ensure!(
                !attributes.iter().any(|a: &VertexAttribute| a.name == *name),
                "vertex attribute {name:?} listed twice"
            );
            attributes.push(VertexAttribute {
                name: name.to_string(),
                components,
            });
        }
        Ok(Self { attributes })
    }

    /// `2f 3f 3f` with texture coordinates, normals and positions.
    pub fn textured() -> Self {
        Self {
            attributes: vec![
                attribute(IN_TEXCOORD, 2),
                attribute(IN_NORMAL, 3),
                attribute(IN_POSITION, 3),
            ],
        }
    }

    /// `3f` positions only.
    pub fn positions() -> Self {
        Self {
            attributes: vec![attribute(IN_POSITION, 3)],
        }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn format(&self) -> String {
        self.attributes
            .iter()
            .map(|a| format!("{}f", a.components))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        (self.floats_per_vertex() * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }

    /// Attribute descriptions for a vertex buffer laid out like `self`.
    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        let mut offset = 0;
        self.attributes
            .iter()
            .map(|a| {
                let format = match a.components {
                    1 => wgpu::VertexFormat::Float32,
                    2 => wgpu::VertexFormat::Float32x2,
                    3 => wgpu::VertexFormat::Float32x3,
                    _ => wgpu::VertexFormat::Float32x4,
                };
                let attribute = wgpu::VertexAttribute {
                    format,
                    offset,
                    // parse() only accepts names with a location
                    shader_location: shader_location(&a.name).unwrap_or_default(),
                };
                offset += format.size();
                attribute
            })
            .collect()
    }
}

fn attribute(name: &str, components: u32) -> VertexAttribute {
    VertexAttribute {
        name: name.to_string(),
        components,
    }
}

/// A flat interleaved vertex stream.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<f32>,
    pub layout: VertexLayout,
}

impl GeometryData {
    pub fn new(vertices: Vec<f32>, layout: VertexLayout) -> anyhow::Result<Self> {
        let per_vertex = layout.floats_per_vertex();
        ensure!(
            !vertices.is_empty() && vertices.len() % per_vertex == 0,
            "{} floats do not form whole {} vertices",
            vertices.len(),
            layout.format()
        );
        Ok(Self { vertices, layout })
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / self.layout.floats_per_vertex()) as u32
    }

    /// Values of one attribute for vertex `index`.
    pub fn attribute(&self, index: usize, name: &str) -> Option<&[f32]> {
        let mut offset = 0;
        for a in self.layout.attributes() {
            if a.name == name {
                let start = index * self.layout.floats_per_vertex() + offset;
                return self.vertices.get(start..start + a.components as usize);
            }
            offset += a.components as usize;
        }
        None
    }
}

pub const CUBE_VERTICES: [[f32; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
];

/// Counter-clockwise seen from outside: front, right, back, left, top, bottom.
pub const CUBE_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 3],
    [0, 1, 2],
    [1, 7, 2],
    [1, 6, 7],
    [6, 5, 4],
    [4, 7, 6],
    [3, 4, 5],
    [3, 5, 0],
    [3, 7, 4],
    [3, 2, 7],
    [0, 6, 1],
    [0, 5, 6],
];

const CUBE_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

const CUBE_UV_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 3],
    [0, 1, 2],
    [0, 2, 3],
    [0, 1, 2],
    [0, 1, 2],
    [2, 3, 0],
    [2, 3, 0],
    [2, 0, 1],
    [0, 2, 3],
    [0, 1, 2],
    [3, 1, 2],
    [3, 0, 1],
];

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let a = Vector3::from(a);
    (Vector3::from(b) - a).cross(Vector3::from(c) - a).normalize().into()
}

/// Textured, lit cube spanning -1..1 on every axis.
pub fn cube() -> GeometryData {
    let mut vertices = Vec::with_capacity(36 * 8);
    for (triangle, uvs) in CUBE_TRIANGLES.into_iter().zip(CUBE_UV_TRIANGLES) {
        let [a, b, c] = triangle.map(|i| CUBE_VERTICES[i]);
        let normal = face_normal(a, b, c);
        for (position, uv) in [a, b, c].into_iter().zip(uvs) {
            vertices.extend_from_slice(&CUBE_UV[uv]);
            vertices.extend_from_slice(&normal);
            vertices.extend_from_slice(&position);
        }
    }
    GeometryData {
        vertices,
        layout: VertexLayout::textured(),
    }
}

/// The cube seen from inside. Swapping x and z mirrors every triangle, which
/// reverses its winding so the inner faces survive back-face culling.
pub fn skybox() -> GeometryData {
    let vertices = CUBE_TRIANGLES
        .iter()
        .flatten()
        .flat_map(|&i| {
            let [x, y, z] = CUBE_VERTICES[i];
            [z, y, x]
        })
        .collect();
    GeometryData {
        vertices,
        layout: VertexLayout::positions(),
    }
}

/// How many times the water texture repeats across the plane.
pub const WATER_TILING: f32 = 8.0;

/// A unit square in the XZ plane facing +Y.
pub fn water_plane() -> GeometryData {
    let corners = [
        [-1.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 0.0, -1.0],
        [-1.0, 0.0, 1.0],
        [1.0, 0.0, -1.0],
        [-1.0, 0.0, -1.0],
    ];
    let mut vertices = Vec::with_capacity(6 * 8);
    for [x, y, z] in corners {
        vertices.extend_from_slice(&[
            (x + 1.0) * 0.5 * WATER_TILING,
            (1.0 - z) * 0.5 * WATER_TILING,
        ]);
        vertices.extend_from_slice(&[0.0, 1.0, 0.0]);
        vertices.extend_from_slice(&[x, y, z]);
    }
    GeometryData {
        vertices,
        layout: VertexLayout::textured(),
    }
}

/// Flattens triangulated, single-index OBJ models into one `2f 3f 3f` stream.
pub fn from_obj_models(models: &[tobj::Model], name: &str) -> anyhow::Result<GeometryData> {
    let mut vertices = Vec::new();
    let mut missing_normals = false;
    let mut missing_texcoords = false;
    for model in models {
        let mesh = &model.mesh;
        ensure!(
            mesh.indices.len() % 3 == 0,
            "mesh {:?} in {name} is not triangulated",
            model.name
        );
        for &index in &mesh.indices {
            let i = index as usize;
            let Some(position) = mesh.positions.get(i * 3..i * 3 + 3) else {
                bail!("mesh {:?} in {name} indexes past its positions", model.name);
            };
            match mesh.texcoords.get(i * 2..i * 2 + 2) {
                Some(uv) => vertices.extend_from_slice(uv),
                None => {
                    missing_texcoords = true;
                    vertices.extend_from_slice(&[0.0; 2]);
                }
            }
            match mesh.normals.get(i * 3..i * 3 + 3) {
                Some(normal) => vertices.extend_from_slice(normal),
                None => {
                    missing_normals = true;
                    vertices.extend_from_slice(&[0.0; 3]);
                }
            }
            vertices.extend_from_slice(position);
        }
    }
    if missing_texcoords {
        log::warn!("{name} has vertices without texture coordinates, using (0, 0)");
    }
    if missing_normals {
        log::warn!("{name} has vertices without normals, lighting will be flat black there");
    }
    GeometryData::new(vertices, VertexLayout::textured())
        .with_context(|| format!("{name} contains no triangles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangles(data: &GeometryData) -> Vec<[Vector3<f32>; 3]> {
        (0..data.vertex_count() as usize)
            .step_by(3)
            .map(|v| {
                [v, v + 1, v + 2].map(|i| {
                    let p = data.attribute(i, IN_POSITION).unwrap();
                    Vector3::new(p[0], p[1], p[2])
                })
            })
            .collect()
    }

    #[test]
    fn parses_layouts() {
        let layout = VertexLayout::textured();
        assert_eq!(layout.format(), "2f 3f 3f");
        assert_eq!(layout.floats_per_vertex(), 8);
        assert_eq!(layout.stride(), 32);
        let attributes = layout.wgpu_attributes();
        assert_eq!(attributes[0].shader_location, 2);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(attributes[2].offset, 20);
        assert_eq!(attributes[2].shader_location, 0);
    }

    #[test]
    fn rejects_malformed_layouts() {
        assert!(VertexLayout::parse("", &[]).is_err());
        assert!(VertexLayout::parse("3f", &[IN_POSITION, IN_NORMAL]).is_err());
        assert!(VertexLayout::parse("3i", &[IN_POSITION]).is_err());
        assert!(VertexLayout::parse("5f", &[IN_POSITION]).is_err());
        assert!(VertexLayout::parse("3f", &["in_colour"]).is_err());
        assert!(VertexLayout::parse("3f 3f", &[IN_POSITION, IN_POSITION]).is_err());
    }

    #[test]
    fn cube_has_twelve_outward_triangles() {
        let cube = cube();
        assert_eq!(cube.vertex_count(), 36);
        for (t, [a, b, c]) in triangles(&cube).into_iter().enumerate() {
            let winding = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(winding.dot(centre) > 0.0);
            let n = cube.attribute(t * 3, IN_NORMAL).unwrap();
            let normal = Vector3::new(n[0], n[1], n[2]);
            assert!((normal.magnitude() - 1.0).abs() < 1e-6);
            assert!((normal.dot(winding.normalize()) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn skybox_faces_point_inward() {
        let sky = skybox();
        assert_eq!(sky.vertex_count(), 36);
        assert_eq!(sky.layout, VertexLayout::positions());
        for [a, b, c] in triangles(&sky) {
            let centre = (a + b + c) / 3.0;
            assert!((b - a).cross(c - a).dot(centre) < 0.0);
        }
    }

    #[test]
    fn water_plane_faces_up() {
        let water = water_plane();
        assert_eq!(water.vertex_count(), 6);
        for [a, b, c] in triangles(&water) {
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn rejects_partial_vertices() {
        assert!(GeometryData::new(vec![0.0; 7], VertexLayout::textured()).is_err());
        assert!(GeometryData::new(vec![], VertexLayout::positions()).is_err());
    }
}
