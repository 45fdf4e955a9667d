use crate::pipelines::PipelineState;

/// Opaque, lit geometry: no blending, depth tested and written, back faces culled.
pub fn state() -> PipelineState {
    PipelineState {
        blend: Some(Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        })),
        depth_compare: wgpu::CompareFunction::Less,
        depth_write: true,
        cull_mode: Some(wgpu::Face::Back),
        bias: wgpu::DepthBiasState::default(),
    }
}
