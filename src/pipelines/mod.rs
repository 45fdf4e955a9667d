//! Bind group layouts and render pipelines.
//!
//! Bind groups by technique:
//!
//! | technique        | 0     | 1      | 2        | 3          |
//! |------------------|-------|--------|----------|------------|
//! | default, water   | frame | object | material | shadow map |
//! | shadow           | frame | object |          |            |
//! | skybox           | frame | cube   |          |            |

use std::num::NonZeroU64;

use crate::{
    data_structures::{instance::ModelUniform, texture::Texture},
    link::{PipelineKey, Technique},
    render::FrameUniform,
    resources::shader::{FRAGMENT_ENTRY, ShaderProgram, VERTEX_ENTRY},
};

pub mod basic;
pub mod transparent;

/// Constant depth bias of the shadow pass, in depth buffer units.
pub const SHADOW_DEPTH_BIAS: i32 = 2;
pub const SHADOW_SLOPE_BIAS: f32 = 2.0;

fn uniform_entry(size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_entries(
    view_dimension: wgpu::TextureViewDimension,
    sample_type: wgpu::TextureSampleType,
    sampler: wgpu::SamplerBindingType,
) -> [wgpu::BindGroupLayoutEntry; 2] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension,
                sample_type,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(sampler),
            count: None,
        },
    ]
}

pub struct Layouts {
    pub frame: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub cube: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let float = wgpu::TextureSampleType::Float { filterable: true };
        Self {
            frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame uniform layout"),
                entries: &[uniform_entry(std::mem::size_of::<FrameUniform>())],
            }),
            object: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("object uniform layout"),
                entries: &[uniform_entry(std::mem::size_of::<ModelUniform>())],
            }),
            material: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("material layout"),
                entries: &texture_entries(
                    wgpu::TextureViewDimension::D2,
                    float,
                    wgpu::SamplerBindingType::Filtering,
                ),
            }),
            cube: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("cube map layout"),
                entries: &texture_entries(
                    wgpu::TextureViewDimension::Cube,
                    float,
                    wgpu::SamplerBindingType::Filtering,
                ),
            }),
            shadow: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow map layout"),
                entries: &texture_entries(
                    wgpu::TextureViewDimension::D2,
                    wgpu::TextureSampleType::Depth,
                    wgpu::SamplerBindingType::Comparison,
                ),
            }),
        }
    }

    pub fn for_technique(&self, technique: Technique) -> Vec<&wgpu::BindGroupLayout> {
        match technique {
            Technique::Default | Technique::Water => {
                vec![&self.frame, &self.object, &self.material, &self.shadow]
            }
            Technique::Shadow => vec![&self.frame, &self.object],
            Technique::Skybox => vec![&self.frame, &self.cube],
        }
    }
}

/// Fixed state that differs between techniques.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineState {
    /// `None` renders depth only.
    pub blend: Option<Option<wgpu::BlendState>>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    pub cull_mode: Option<wgpu::Face>,
    pub bias: wgpu::DepthBiasState,
}

impl PipelineState {
    pub fn of(technique: Technique) -> Self {
        match technique {
            Technique::Default => basic::state(),
            Technique::Water => transparent::state(),
            Technique::Skybox => Self {
                blend: Some(Some(wgpu::BlendState::REPLACE)),
                // the sky sits on the far plane
                depth_compare: wgpu::CompareFunction::LessEqual,
                depth_write: false,
                cull_mode: Some(wgpu::Face::Back),
                bias: wgpu::DepthBiasState::default(),
            },
            Technique::Shadow => Self {
                blend: None,
                depth_compare: wgpu::CompareFunction::Less,
                depth_write: true,
                cull_mode: Some(wgpu::Face::Back),
                bias: wgpu::DepthBiasState {
                    constant: SHADOW_DEPTH_BIAS,
                    slope_scale: SHADOW_SLOPE_BIAS,
                    clamp: 0.0,
                },
            },
        }
    }
}

pub fn mk_pipeline(
    device: &wgpu::Device,
    key: &PipelineKey,
    program: &ShaderProgram,
    layouts: &Layouts,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let label = format!("{:?} {} pipeline", key.technique, key.layout.format());
    let bind_group_layouts = layouts.for_technique(key.technique);
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&label),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });
    let attributes = key.layout.wgpu_attributes();
    let vertex_layouts = [wgpu::VertexBufferLayout {
        array_stride: key.layout.stride(),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    }];
    mk_render_pipeline(
        device,
        &label,
        &layout,
        program,
        color_format,
        PipelineState::of(key.technique),
        &vertex_layouts,
    )
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    program: &ShaderProgram,
    color_format: wgpu::TextureFormat,
    state: PipelineState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
) -> wgpu::RenderPipeline {
    let color_targets: Vec<Option<wgpu::ColorTargetState>> = match state.blend {
        Some(blend) => vec![Some(wgpu::ColorTargetState {
            format: color_format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        })],
        None => Vec::new(),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some(VERTEX_ENTRY),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &color_targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: state.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: state.depth_write,
            depth_compare: state.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: state.bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
