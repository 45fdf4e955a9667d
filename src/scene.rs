//! The scene: what is drawn, where, and with which texture.
//!
//! [`Scene::load`] is a fixed, declarative list of objects. Everything the
//! scene refers to (geometry, textures, drawables) is declared here too, so
//! startup can load and link exactly what the objects need.

use cgmath::Vector3;

use crate::{
    data_structures::{
        geometry::{self, GeometryData, VertexLayout},
        instance::{Instance, ModelUniform},
    },
    link::{LinkageRegistry, Technique},
    resources::texture::TextureSource,
};

/// Grid of crates: `x, z` over `range(-GRID_EXTENT, GRID_EXTENT, GRID_SPACING)`.
pub const GRID_EXTENT: i32 = 30;
pub const GRID_SPACING: usize = 2;
pub const GRID_HEIGHT: f32 = -2.0;

pub const SKYBOX: &str = "skybox";
pub const SHADOW_MAP: &str = "depth_texture";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometrySource {
    Cube,
    Skybox,
    WaterPlane,
    Obj(&'static str),
}

impl GeometrySource {
    /// Procedurally built geometry, `None` for files.
    pub fn procedural(self) -> Option<GeometryData> {
        match self {
            GeometrySource::Cube => Some(geometry::cube()),
            GeometrySource::Skybox => Some(geometry::skybox()),
            GeometrySource::WaterPlane => Some(geometry::water_plane()),
            GeometrySource::Obj(_) => None,
        }
    }

    /// OBJ files are always flattened to the textured layout.
    pub fn layout(self) -> VertexLayout {
        match self {
            GeometrySource::Skybox => VertexLayout::positions(),
            _ => VertexLayout::textured(),
        }
    }
}

pub const SCENE_GEOMETRY: [(&str, GeometrySource); 4] = [
    ("cube", GeometrySource::Cube),
    ("obelisk", GeometrySource::Obj("meshes/obelisk.obj")),
    ("water", GeometrySource::WaterPlane),
    (SKYBOX, GeometrySource::Skybox),
];

/// (drawable, geometry, technique)
pub const SCENE_LINKS: [(&str, &str, Technique); 4] = [
    ("cube", "cube", Technique::Default),
    ("obelisk", "obelisk", Technique::Default),
    ("water", "water", Technique::Water),
    (SKYBOX, SKYBOX, Technique::Skybox),
];

pub fn scene_textures(shadow_map_size: u32) -> Vec<(&'static str, TextureSource)> {
    vec![
        ("crate", TextureSource::Image("textures/wooden_crate.png".into())),
        ("obelisk", TextureSource::Image("textures/obelisk.png".into())),
        ("water", TextureSource::Image("textures/water.png".into())),
        (SKYBOX, TextureSource::CubeMap("textures/skybox".into())),
        (SHADOW_MAP, TextureSource::ShadowMap(shadow_map_size)),
    ]
}

/// Registers every drawable the scene uses. `layout_of` reports the vertex
/// layout of already loaded geometry.
pub fn link_scene(
    registry: &mut LinkageRegistry,
    layout_of: impl Fn(&str) -> anyhow::Result<VertexLayout>,
) -> anyhow::Result<()> {
    for (drawable, geometry, technique) in SCENE_LINKS {
        let layout = layout_of(geometry)?;
        registry.add(drawable, geometry, &layout, technique)?;
    }
    Ok(())
}

/// How an object changes over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Static,
    /// Turns about its own y axis.
    Spin { degrees_per_second: f32 },
    /// Drifts about the y axis; the vertex shader adds waves on top.
    Water { degrees_per_second: f32 },
}

impl Motion {
    fn yaw_rate(self) -> Option<f32> {
        match self {
            Motion::Static => None,
            Motion::Spin { degrees_per_second } | Motion::Water { degrees_per_second } => {
                Some(degrees_per_second)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub drawable: String,
    pub texture: String,
    pub motion: Motion,
    transform: Instance,
    dirty: bool,
}

impl SceneObject {
    pub fn new(drawable: &str, texture: &str, transform: Instance, motion: Motion) -> Self {
        Self {
            drawable: drawable.to_string(),
            texture: texture.to_string(),
            motion,
            transform,
            dirty: true,
        }
    }

    pub fn transform(&self) -> &Instance {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Instance) {
        if transform != self.transform {
            self.transform = transform;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The model uniform if it changed since the last call.
    pub fn take_model_uniform(&mut self) -> Option<ModelUniform> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.transform.to_raw())
    }

    fn advance(&mut self, dt: f32) {
        if let Some(rate) = self.motion.yaw_rate() {
            let mut transform = self.transform;
            transform.rotation.y = (transform.rotation.y + rate * dt) % 360.0;
            self.set_transform(transform);
        }
    }
}

pub struct Scene {
    objects: Vec<SceneObject>,
    skybox: SceneObject,
    water: Option<usize>,
}

impl Scene {
    pub fn load() -> Self {
        let mut scene = Scene {
            objects: Vec::new(),
            skybox: SceneObject::new(SKYBOX, SKYBOX, Instance::new(), Motion::Static),
            water: None,
        };

        for x in (-GRID_EXTENT..GRID_EXTENT).step_by(GRID_SPACING) {
            for z in (-GRID_EXTENT..GRID_EXTENT).step_by(GRID_SPACING) {
                scene.add(SceneObject::new(
                    "cube",
                    "crate",
                    Instance::at([x as f32, GRID_HEIGHT, z as f32]),
                    Motion::Static,
                ));
            }
        }

        scene.add(SceneObject::new(
            "obelisk",
            "obelisk",
            Instance::at([0.0, -2.0, -10.0]),
            Motion::Spin {
                degrees_per_second: 15.0,
            },
        ));

        let cover = GRID_EXTENT as f32 + 2.0;
        scene.add(SceneObject::new(
            "water",
            "water",
            Instance::at([0.0, -0.5, 0.0]).with_scale(Vector3::new(cover, 1.0, cover)),
            Motion::Water {
                degrees_per_second: 1.5,
            },
        ));

        log::info!("scene loaded with {} objects", scene.objects.len());
        scene
    }

    /// Appends an object. Water objects become the scene's water.
    pub fn add(&mut self, object: SceneObject) {
        if matches!(object.motion, Motion::Water { .. }) {
            self.water = Some(self.objects.len());
        }
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    pub fn skybox(&self) -> &SceneObject {
        &self.skybox
    }

    pub fn water(&self) -> Option<&SceneObject> {
        self.water.map(|i| &self.objects[i])
    }

    /// Advances animated objects by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for object in &mut self.objects {
            object.advance(dt);
        }
    }
}
