//! Drawables: geometry bound to a shader technique.
//!
//! [`LinkageRegistry::add`] is the only place drawables are created. Adding a
//! drawable with a technique that casts shadows also adds its depth-only
//! companion under `shadow_<name>`, so every lit object can be drawn into the
//! shadow map.

use std::collections::HashMap;

use anyhow::*;

use crate::data_structures::geometry::{IN_NORMAL, IN_POSITION, IN_TEXCOORD, VertexLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technique {
    /// Lit, textured and shadowed.
    Default,
    Skybox,
    /// Depth only, from the light.
    Shadow,
    /// Lit and shadowed, alpha blended and animated in the vertex shader.
    Water,
}

impl Technique {
    pub const ALL: [Technique; 4] = [
        Technique::Default,
        Technique::Skybox,
        Technique::Shadow,
        Technique::Water,
    ];

    /// Base name of the `.vert`/`.frag` pair under `shaders/`.
    pub fn shader_file(self) -> &'static str {
        match self {
            Technique::Default => "default",
            Technique::Skybox => "skybox",
            Technique::Shadow => "shadow_map",
            Technique::Water => "water",
        }
    }

    /// Techniques whose drawables get a `shadow_` companion.
    pub fn casts_shadow(self) -> bool {
        matches!(self, Technique::Default | Technique::Water)
    }

    pub fn required_attributes(self) -> &'static [&'static str] {
        match self {
            Technique::Default | Technique::Water => &[IN_POSITION, IN_NORMAL, IN_TEXCOORD],
            Technique::Skybox | Technique::Shadow => &[IN_POSITION],
        }
    }
}

/// One pipeline is built per distinct key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub technique: Technique,
    pub layout: VertexLayout,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    pub name: String,
    pub geometry: String,
    pub technique: Technique,
    pub layout: VertexLayout,
}

impl Drawable {
    pub fn pipeline_key(&self) -> PipelineKey {
        PipelineKey {
            technique: self.technique,
            layout: self.layout.clone(),
        }
    }
}

pub fn shadow_name(name: &str) -> String {
    format!("shadow_{name}")
}

#[derive(Debug, Default)]
pub struct LinkageRegistry {
    drawables: Vec<Drawable>,
    index: HashMap<String, usize>,
}

impl LinkageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: &str,
        geometry: &str,
        layout: &VertexLayout,
        technique: Technique,
    ) -> Result<()> {
        let mut names = vec![(name.to_string(), technique)];
        if technique.casts_shadow() {
            names.push((shadow_name(name), Technique::Shadow));
        }
        // validate both before registering either
        for (name, technique) in &names {
            ensure!(
                !self.index.contains_key(name),
                "drawable {name:?} is already registered"
            );
            for attribute in technique.required_attributes() {
                ensure!(
                    layout.has(attribute),
                    "drawable {name:?}: geometry {geometry:?} with layout {:?} lacks {attribute} needed by {technique:?}",
                    layout.format()
                );
            }
        }
        for (name, technique) in names {
            log::debug!("linked {name:?}: {geometry:?} with {technique:?}");
            self.index.insert(name.clone(), self.drawables.len());
            self.drawables.push(Drawable {
                name,
                geometry: geometry.to_string(),
                technique,
                layout: layout.clone(),
            });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Drawable> {
        self.index.get(name).map(|&i| &self.drawables[i])
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<&Drawable> {
        self.get(name)
            .with_context(|| format!("drawable {name:?} was never linked"))
    }

    pub fn shadow_of(&self, name: &str) -> Option<&Drawable> {
        self.get(&shadow_name(name))
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}
