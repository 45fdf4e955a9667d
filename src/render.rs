//! Frame composition and the two pass renderer.
//!
//! A [`FramePlan`] is worked out once at startup from the scene and the
//! linkage registry. It lists, per pass, which drawable draws which object
//! with which pipeline, and it is where unresolved drawables and missing
//! shadow companions are caught. The [`Renderer`] owns the GPU side
//! (pipelines, uniforms, bind groups) and replays the plan every frame:
//!
//! 1. [`Pass::Shadow`]: depth only, from the light, into the shadow map.
//!    Only opaque objects are drawn; water keeps its companion but casts none.
//! 2. [`Pass::Color`]: lit objects sampling the shadow map, then water, then
//!    the skybox.

use std::collections::HashMap;

use anyhow::*;
use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    data_structures::instance::ModelUniform,
    light::Light,
    link::{Drawable, LinkageRegistry, PipelineKey, Technique},
    pipelines::{Layouts, mk_pipeline},
    resources::{
        ledger::{ResourceHandle, ResourceKind, ResourceLedger},
        mesh::GeometryStore,
        shader::ShaderStore,
        texture::TextureStore,
    },
    scene::{SHADOW_MAP, Scene},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Shadow,
    Color,
}

/// What a draw call draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Index into [`Scene::objects`].
    Object(usize),
    Skybox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub target: Target,
    pub drawable: String,
    pub geometry: String,
    pub technique: Technique,
    /// Index into [`FramePlan::pipelines`].
    pub pipeline: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramePlan {
    pub pipelines: Vec<PipelineKey>,
    pub shadow: Vec<DrawCommand>,
    pub color: Vec<DrawCommand>,
}

impl FramePlan {
    pub fn build(scene: &Scene, linkage: &LinkageRegistry) -> Result<Self> {
        let mut plan = FramePlan::default();
        let mut water = Vec::new();

        for (index, object) in scene.objects().iter().enumerate() {
            let drawable = linkage
                .resolve(&object.drawable)
                .with_context(|| format!("scene object {index}"))?;
            ensure!(
                matches!(drawable.technique, Technique::Default | Technique::Water),
                "scene object {index} uses {:?} drawable {:?}; only the skybox may use non lit techniques",
                drawable.technique,
                drawable.name
            );
            let target = Target::Object(index);

            let shadow = linkage.shadow_of(&drawable.name).with_context(|| {
                format!("drawable {:?} has no shadow companion", drawable.name)
            })?;
            // only opaque objects cast shadows
            if drawable.technique == Technique::Default {
                let command = plan.command(target, shadow);
                plan.shadow.push(command);
            }

            let command = plan.command(target, drawable);
            match drawable.technique {
                Technique::Water => water.push(command),
                _ => plan.color.push(command),
            }
        }
        // blended surfaces go after everything opaque
        plan.color.append(&mut water);

        let skybox = linkage
            .resolve(&scene.skybox().drawable)
            .context("skybox")?;
        ensure!(
            skybox.technique == Technique::Skybox,
            "skybox drawable {:?} uses {:?}",
            skybox.name,
            skybox.technique
        );
        let command = plan.command(Target::Skybox, skybox);
        plan.color.push(command);

        Ok(plan)
    }

    fn command(&mut self, target: Target, drawable: &Drawable) -> DrawCommand {
        let key = drawable.pipeline_key();
        let pipeline = match self.pipelines.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                self.pipelines.push(key);
                self.pipelines.len() - 1
            }
        };
        DrawCommand {
            target,
            drawable: drawable.name.clone(),
            geometry: drawable.geometry.clone(),
            technique: drawable.technique,
            pipeline,
        }
    }

    /// Passes in execution order.
    pub fn passes(&self) -> [(Pass, &[DrawCommand]); 2] {
        [
            (Pass::Shadow, self.shadow.as_slice()),
            (Pass::Color, self.color.as_slice()),
        ]
    }

    /// Number of `set_pipeline` calls a pass needs.
    pub fn pipeline_switches(commands: &[DrawCommand]) -> usize {
        let mut switches = 0;
        let mut current = None;
        for command in commands {
            if current != Some(command.pipeline) {
                switches += 1;
                current = Some(command.pipeline);
            }
        }
        switches
    }
}

/// Everything the shaders need once per frame. Vectors are padded to vec4.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub sky_view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_position: [f32; 4],
    pub light_ambient: [f32; 4],
    pub light_diffuse: [f32; 4],
    pub light_specular: [f32; 4],
    /// x: seconds since start
    pub time: [f32; 4],
}

impl FrameUniform {
    pub fn new(camera: &Camera, light: &Light, elapsed: f32) -> Self {
        let point = |p: cgmath::Point3<f32>| [p.x, p.y, p.z, 1.0];
        let vector = |v: cgmath::Vector3<f32>| [v.x, v.y, v.z, 0.0];
        Self {
            view_proj: camera.view_proj().into(),
            sky_view_proj: camera.sky_view_proj().into(),
            light_view_proj: light.view_proj().into(),
            camera_position: point(camera.position),
            light_position: point(light.position),
            light_ambient: vector(light.ambient),
            light_diffuse: vector(light.diffuse),
            light_specular: vector(light.specular),
            time: [elapsed, 0.0, 0.0, 0.0],
        }
    }
}

/// Where a frame is drawn to.
pub struct FrameTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

pub struct Renderer {
    plan: FramePlan,
    clear_colour: wgpu::Color,
    pipelines: Vec<wgpu::RenderPipeline>,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_buffers: Vec<wgpu::Buffer>,
    object_bind_groups: Vec<wgpu::BindGroup>,
    materials: HashMap<String, wgpu::BindGroup>,
    sky_bind_group: wgpu::BindGroup,
    shadow_bind_group: wgpu::BindGroup,
    shadow_view: wgpu::TextureView,
    handles: Vec<ResourceHandle>,
}

/// GPU resources the renderer reads but does not own.
pub struct Stores<'a> {
    pub textures: &'a TextureStore,
    pub geometry: &'a GeometryStore,
    pub shaders: &'a ShaderStore,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        clear_colour: [f64; 3],
        plan: FramePlan,
        scene: &Scene,
        stores: Stores,
        ledger: &mut ResourceLedger,
    ) -> Result<Self> {
        let layouts = Layouts::new(device);
        let mut handles = Vec::new();
        let mut track = |ledger: &mut ResourceLedger, kind, label: &str| {
            handles.push(ledger.acquire(kind, label));
        };

        let mut pipelines = Vec::with_capacity(plan.pipelines.len());
        for key in &plan.pipelines {
            let program = stores.shaders.get(key.technique)?;
            pipelines.push(mk_pipeline(device, key, program, &layouts, color_format));
            track(ledger, ResourceKind::Pipeline, &format!("{:?} pipeline", key.technique));
        }
        log::info!("built {} render pipelines", pipelines.len());

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniform"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        track(ledger, ResourceKind::Buffer, "frame uniform");
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &layouts.frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        track(ledger, ResourceKind::BindGroup, "frame bind group");

        let mut object_buffers = Vec::with_capacity(scene.objects().len());
        let mut object_bind_groups = Vec::with_capacity(scene.objects().len());
        for (index, object) in scene.objects().iter().enumerate() {
            let label = format!("object {index} ({})", object.drawable);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents: bytemuck::cast_slice(&[object.transform().to_raw()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            track(ledger, ResourceKind::Buffer, &label);
            object_bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: &layouts.object,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            }));
            track(ledger, ResourceKind::BindGroup, &label);
            object_buffers.push(buffer);
        }

        let mut materials = HashMap::new();
        for object in scene.objects() {
            if materials.contains_key(&object.texture) {
                continue;
            }
            let group = texture_bind_group(
                device,
                &layouts.material,
                stores.textures,
                &object.texture,
            )?;
            track(ledger, ResourceKind::BindGroup, &object.texture);
            materials.insert(object.texture.clone(), group);
        }

        let sky_bind_group = texture_bind_group(
            device,
            &layouts.cube,
            stores.textures,
            &scene.skybox().texture,
        )?;
        track(ledger, ResourceKind::BindGroup, "skybox");
        let shadow_bind_group =
            texture_bind_group(device, &layouts.shadow, stores.textures, SHADOW_MAP)?;
        track(ledger, ResourceKind::BindGroup, SHADOW_MAP);
        let shadow_view = stores.textures.get(SHADOW_MAP)?.view.clone();

        // every draw must find its vertex buffer
        for (_, commands) in plan.passes() {
            for command in commands {
                stores.geometry.get(&command.geometry)?;
            }
        }

        let [r, g, b] = clear_colour;
        Ok(Self {
            plan,
            clear_colour: wgpu::Color { r, g, b, a: 1.0 },
            pipelines,
            frame_buffer,
            frame_bind_group,
            object_buffers,
            object_bind_groups,
            materials,
            sky_bind_group,
            shadow_bind_group,
            shadow_view,
            handles,
        })
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    /// Uploads the frame uniform and every changed model matrix.
    pub fn update(&self, queue: &wgpu::Queue, frame: &FrameUniform, scene: &mut Scene) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[*frame]));
        for (object, buffer) in scene.objects_mut().iter_mut().zip(&self.object_buffers) {
            if let Some(model) = object.take_model_uniform() {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice::<ModelUniform, u8>(&[model]));
            }
        }
    }

    /// Records the shadow pass then the colour pass.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: FrameTarget,
        scene: &Scene,
        geometry: &GeometryStore,
    ) -> Result<()> {
        for (pass, commands) in self.plan.passes() {
            let mut render_pass = match pass {
                Pass::Shadow => encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("shadow pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(depth_attachment(&self.shadow_view)),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                }),
                Pass::Color => encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("colour pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target.color,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(depth_attachment(target.depth)),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                }),
            };

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            let mut current = None;
            for command in commands {
                if current != Some(command.pipeline) {
                    render_pass.set_pipeline(&self.pipelines[command.pipeline]);
                    current = Some(command.pipeline);
                }
                self.bind(&mut render_pass, command, scene)?;
                let mesh = geometry.get(&command.geometry)?;
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.draw(0..mesh.vertex_count, 0..1);
            }
        }
        Ok(())
    }

    fn bind(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        command: &DrawCommand,
        scene: &Scene,
    ) -> Result<()> {
        match command.target {
            Target::Skybox => render_pass.set_bind_group(1, &self.sky_bind_group, &[]),
            Target::Object(index) => {
                render_pass.set_bind_group(1, &self.object_bind_groups[index], &[]);
                if command.technique != Technique::Shadow {
                    let texture = &scene.objects()[index].texture;
                    let material = self
                        .materials
                        .get(texture)
                        .with_context(|| format!("no material for texture {texture:?}"))?;
                    render_pass.set_bind_group(2, material, &[]);
                    render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);
                }
            }
        }
        Ok(())
    }

    /// Destroys buffers and drops everything else, newest first.
    pub fn release(&mut self, ledger: &mut ResourceLedger) -> Result<()> {
        for buffer in self.object_buffers.drain(..) {
            buffer.destroy();
        }
        self.frame_buffer.destroy();
        self.object_bind_groups.clear();
        self.materials.clear();
        self.pipelines.clear();
        while let Some(handle) = self.handles.pop() {
            ledger.release(handle)?;
        }
        Ok(())
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &TextureStore,
    name: &str,
) -> Result<wgpu::BindGroup> {
    let texture = textures.get(name)?;
    let sampler = texture
        .sampler
        .as_ref()
        .with_context(|| format!("texture {name:?} has no sampler"))?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(name),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        data_structures::{geometry::VertexLayout, instance::Instance},
        scene::{Motion, SCENE_GEOMETRY, SKYBOX, SceneObject, link_scene},
    };

    fn linked() -> LinkageRegistry {
        let mut registry = LinkageRegistry::new();
        link_scene(&mut registry, |name| {
            SCENE_GEOMETRY
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, source)| source.layout())
                .context("unknown geometry")
        })
        .unwrap();
        registry
    }

    #[test]
    fn shadow_pass_covers_opaque_objects_before_colour() {
        let scene = Scene::load();
        let plan = FramePlan::build(&scene, &linked()).unwrap();
        let passes: Vec<Pass> = plan.passes().iter().map(|(pass, _)| *pass).collect();
        assert_eq!(passes, [Pass::Shadow, Pass::Color]);
        // everything but the water
        assert_eq!(plan.shadow.len(), scene.objects().len() - 1);
        assert!(plan.shadow.iter().all(|c| c.drawable != "shadow_water"));
        assert!(plan.shadow.iter().all(|c| c.technique == Technique::Shadow));
        assert!(plan.shadow.iter().all(|c| c.drawable.starts_with("shadow_")));
    }

    #[test]
    fn skybox_is_drawn_last_and_water_after_opaque() {
        let scene = Scene::load();
        let plan = FramePlan::build(&scene, &linked()).unwrap();
        let last = plan.color.last().unwrap();
        assert_eq!(last.target, Target::Skybox);
        assert_eq!(last.technique, Technique::Skybox);
        let water = plan
            .color
            .iter()
            .position(|c| c.technique == Technique::Water)
            .unwrap();
        assert_eq!(water, plan.color.len() - 2);
        assert!(plan.color[..water].iter().all(|c| c.technique == Technique::Default));
    }

    #[test]
    fn draws_sharing_a_pipeline_are_grouped() {
        let plan = FramePlan::build(&Scene::load(), &linked()).unwrap();
        // one lit layout shared by crates, obelisk and its shadow
        assert_eq!(plan.pipelines.len(), 4);
        assert_eq!(FramePlan::pipeline_switches(&plan.shadow), 1);
        assert_eq!(FramePlan::pipeline_switches(&plan.color), 3);
    }

    #[test]
    fn water_is_linked_with_a_companion_but_casts_no_shadow() {
        let scene = Scene::load();
        let linkage = linked();
        let companion = linkage.shadow_of("water").unwrap();
        assert_eq!(companion.technique, Technique::Shadow);

        let plan = FramePlan::build(&scene, &linkage).unwrap();
        let water = scene
            .objects()
            .iter()
            .position(|o| o.drawable == "water")
            .map(Target::Object)
            .unwrap();
        assert!(plan.shadow.iter().all(|c| c.target != water));
        assert!(plan.color.iter().any(|c| c.target == water));
    }

    #[test]
    fn unresolved_drawable_fails_the_build() {
        let mut scene = Scene::load();
        scene.add(SceneObject::new("teapot", "crate", Instance::new(), Motion::Static));
        let err = FramePlan::build(&scene, &linked()).unwrap_err();
        assert!(format!("{err:#}").contains("teapot"));
    }

    #[test]
    fn scene_objects_must_use_lit_drawables() {
        let mut registry = linked();
        registry
            .add("bare", "cube", &VertexLayout::textured(), Technique::Shadow)
            .unwrap();
        let mut scene = Scene::load();
        scene.add(SceneObject::new(SKYBOX, "crate", Instance::new(), Motion::Static));
        assert!(FramePlan::build(&scene, &registry).is_err());

        let mut scene = Scene::load();
        scene.add(SceneObject::new("bare", "crate", Instance::new(), Motion::Static));
        let err = FramePlan::build(&scene, &registry).unwrap_err();
        assert!(err.to_string().contains("bare"));
    }

    #[test]
    fn sky_view_proj_ignores_camera_position() {
        let config = Config::default();
        let light = Light::from_config(&config.light);
        let mut camera = Camera::from_config(&config.camera, config.window_size);
        let before = FrameUniform::new(&camera, &light, 0.0);
        camera.set_position(camera.position + cgmath::Vector3::new(10.0, 0.0, 0.0));
        let after = FrameUniform::new(&camera, &light, 1.0);
        assert_eq!(before.sky_view_proj, after.sky_view_proj);
        assert_ne!(before.view_proj, after.view_proj);
        assert_eq!(after.time[0], 1.0);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 288);
    }
}
