//! The geometry pass program.
//!
//! Writes two colour targets: the lit colour and its bright part, which feeds
//! the bloom blur. Drawables of a level start from the [`Pipeline`] template
//! returned by [`register`].

use crate::{
    data_structures::{mesh::Vertex, scene::Pipeline, scene::TEXTURE_COUNT, texture::Texture},
    pipelines::{mk_render_pipeline, program::ProgramError},
    resources::{LoadedAssets, ProgramId, TextureSource},
};

pub const SOURCE: &str = include_str!("firstpass.wgsl");
pub const LABEL: &str = "firstpass";
pub const WHITE_TEXTURE: &str = "white";

/// Format of both first-pass colour targets.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Registers the program and a 1x1 white texture bound to slot 0 by default.
pub fn register(assets: &mut LoadedAssets) -> Result<(ProgramId, Pipeline), ProgramError> {
    let program = assets.add_program(LABEL, SOURCE)?;
    let white = assets.add_texture(WHITE_TEXTURE, TextureSource::Solid([0xff; 4]));
    let mut pipeline = Pipeline {
        program: Some(program),
        ..Default::default()
    };
    pipeline.textures[0] = Some(white);
    Ok((program, pipeline))
}

pub struct FirstpassLayouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl FirstpassLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniforms = super::uniform_layout(device, "firstpass uniforms layout");
        let textures = super::texture_layout(device, TEXTURE_COUNT as u32, "firstpass textures layout");
        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("firstpass pipeline layout"),
            bind_group_layouts: &[&uniforms, &textures],
            push_constant_ranges: &[],
        });
        Self {
            uniforms,
            textures,
            pipeline,
        }
    }
}

pub fn mk_firstpass_pipeline(
    device: &wgpu::Device,
    layouts: &FirstpassLayouts,
    shader: &wgpu::ShaderModule,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let target = Some(wgpu::ColorTargetState {
        format: COLOR_FORMAT,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    });
    mk_render_pipeline(
        device,
        "firstpass pipeline",
        &layouts.pipeline,
        &[target.clone(), target],
        Some(Texture::DEPTH_FORMAT),
        &[Vertex::desc()],
        topology,
        shader,
    )
}
