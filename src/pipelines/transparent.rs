use crate::pipelines::PipelineState;

/**
 * Pipeline state for the water surface. Alpha is blended over whatever was
 * drawn before it, so water goes after the opaque objects. Depth is still
 * written so the skybox does not paint over it.
 *
 * Both faces are drawn so the surface stays visible from below.
 */
pub fn state() -> PipelineState {
    PipelineState {
        blend: Some(Some(wgpu::BlendState::ALPHA_BLENDING)),
        depth_compare: wgpu::CompareFunction::Less,
        depth_write: true,
        cull_mode: None,
        bias: wgpu::DepthBiasState::default(),
    }
}
