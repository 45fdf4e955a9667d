//! Window, startup, frame loop and teardown.
//!
//! Startup loads textures, geometry and shaders in that order, links the
//! scene's drawables and builds the frame plan. Any failure there ends the
//! program. Each frame then polls input, moves the camera, advances the scene
//! and renders both passes, paced by a [`FrameClock`]. Escape or closing the
//! window releases every GPU resource in reverse order and exits.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::{
    camera::{Camera, CameraController},
    config::Config,
    context::Context,
    light::Light,
    link::{LinkageRegistry, Technique},
    render::{FramePlan, FrameTarget, FrameUniform, Renderer, Stores},
    resources::{
        ledger::ResourceLedger, mesh::GeometryStore, shader::ShaderStore, texture::TextureStore,
    },
    scene::{GeometrySource, SCENE_GEOMETRY, Scene, link_scene, scene_textures},
    time::FrameClock,
};

/// Everything that exists between startup and shutdown.
struct Engine {
    ctx: Context,
    ledger: ResourceLedger,
    textures: TextureStore,
    geometry: GeometryStore,
    shaders: ShaderStore,
    scene: Scene,
    renderer: Renderer,
    camera: Camera,
    controller: CameraController,
    light: Light,
    clock: FrameClock,
}

impl Engine {
    async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let ctx = Context::new(window).await?;
        let root = config.asset_root.as_path();
        log::info!("loading assets from {}", root.display());
        let mut ledger = ResourceLedger::new();

        let textures = TextureStore::load(
            &ctx.device,
            &ctx.queue,
            root,
            &scene_textures(config.light.shadow_map_size),
            &mut ledger,
        )
        .await?;

        let mut geometry = GeometryStore::new();
        for (name, source) in SCENE_GEOMETRY {
            match source {
                GeometrySource::Obj(file) => {
                    geometry
                        .load_obj(&ctx.device, root, name, file, &mut ledger)
                        .await?
                }
                _ => {
                    let data = source
                        .procedural()
                        .with_context(|| format!("no generator for geometry {name:?}"))?;
                    geometry.add(&ctx.device, name, data, &mut ledger)?
                }
            }
        }
        log::info!("loaded {} geometry buffers", geometry.len());

        let shaders = ShaderStore::load(&ctx.device, root, &Technique::ALL, &mut ledger).await?;

        let mut linkage = LinkageRegistry::new();
        link_scene(&mut linkage, |name| geometry.layout(name).cloned())?;

        let scene = Scene::load();
        let plan = FramePlan::build(&scene, &linkage).context("scene does not link")?;

        let renderer = Renderer::new(
            &ctx.device,
            ctx.config.format,
            config.clear_colour,
            plan,
            &scene,
            Stores {
                textures: &textures,
                geometry: &geometry,
                shaders: &shaders,
            },
            &mut ledger,
        )?;
        let plan = renderer.plan();
        log::info!(
            "frame plan: {} shadow draws, {} colour draws, {} pipelines",
            plan.shadow.len(),
            plan.color.len(),
            plan.pipelines.len()
        );

        Ok(Self {
            camera: Camera::from_config(&config.camera, [ctx.config.width, ctx.config.height]),
            controller: CameraController::from_config(&config.camera),
            light: Light::from_config(&config.light),
            clock: FrameClock::new(config.target_fps),
            ctx,
            ledger,
            textures,
            geometry,
            shaders,
            scene,
            renderer,
        })
    }

    fn frame(&mut self) -> Result<()> {
        let time = self.clock.tick();
        self.camera
            .update(&mut self.controller, Duration::from_secs_f32(time.dt));
        self.scene.update(time.dt);
        let uniform = FrameUniform::new(&self.camera, &self.light, time.elapsed);
        self.renderer
            .update(&self.ctx.queue, &uniform, &mut self.scene);

        let output = match self.ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.ctx.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e).context("could not acquire the next frame"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.renderer.render(
            &mut encoder,
            FrameTarget {
                color: &view,
                depth: &self.ctx.depth_texture.view,
            },
            &self.scene,
            &self.geometry,
        )?;
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.ctx.window().pre_present_notify();
        output.present();
        Ok(())
    }

    /// Releases renderer resources, shaders, geometry and textures, the
    /// reverse of how they were acquired.
    fn shutdown(mut self) -> Result<()> {
        log::info!("shutting down");
        self.renderer.release(&mut self.ledger)?;
        self.shaders.release(&mut self.ledger)?;
        self.geometry.release(&mut self.ledger)?;
        self.textures.release(&mut self.ledger)?;
        self.ctx.depth_texture.destroy();
        self.ledger.ensure_drained()?;
        log::info!(
            "released {} GPU resources",
            self.ledger.release_order().len()
        );
        Ok(())
    }
}

pub struct App {
    config: Config,
    async_runtime: tokio::runtime::Runtime,
    engine: Option<Engine>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new().context("could not start tokio")?;
        Ok(Self {
            config,
            async_runtime,
            engine: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error.get_or_insert(error);
        self.stop(event_loop);
    }

    /// Tears down the engine, if any, and leaves the event loop.
    fn stop(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.take() {
            if let Err(e) = engine.shutdown() {
                log::error!("teardown failed: {e:#}");
                self.error.get_or_insert(e);
            }
        }
        event_loop.exit();
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let [width, height] = self.config.window_size;
        let attributes = Window::default_attributes()
            .with_title(self.config.title.as_str())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("could not create window")?,
        );
        grab_cursor(&window);
        Ok(window)
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(e) = grabbed {
        log::warn!("could not grab the cursor: {e}");
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        let started = Instant::now();
        let engine = self.create_window(event_loop).and_then(|window| {
            self.async_runtime
                .block_on(Engine::new(window, &self.config))
        });
        match engine {
            Ok(engine) => {
                log::info!("ready after {:.2?}", started.elapsed());
                engine.ctx.window().request_redraw();
                self.engine = Some(engine);
            }
            Err(e) => self.fail(event_loop, e.context("startup failed")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(engine) = &mut self.engine else {
            return;
        };
        engine.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.stop(event_loop),
            WindowEvent::Resized(size) => engine.ctx.resize(size.width, size.height),
            WindowEvent::Focused(true) => {
                grab_cursor(engine.ctx.window());
                engine.clock.reset();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = engine.frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let (Some(engine), DeviceEvent::MouseMotion { delta: (dx, dy) }) = (&mut self.engine, event)
        {
            engine.controller.handle_mouse(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = &self.engine else {
            return;
        };
        if engine.clock.is_due(Instant::now()) {
            engine.ctx.window().request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(engine.clock.next_frame()));
    }
}

/// Opens the window and runs until Escape or close. Errors from startup,
/// rendering or teardown are returned after the window is gone.
pub fn run(config: Config) -> Result<()> {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
