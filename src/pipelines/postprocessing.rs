//! The shared post-processing program.
//!
//! One program implements every post-process pass. The integer `TASK` uniform
//! selects the behaviour, see [`Task`]. Each pass draws the same six-vertex
//! full-screen quad.

use crate::pipelines::{
    mk_render_pipeline,
    program::{ProgramError, ProgramInterface},
};

pub const SOURCE: &str = include_str!("postprocessing.wgsl");
pub const LABEL: &str = "postprocessing";

/// Names the program must declare; a mismatch is a build error, not a content one.
pub const REQUIRED: &[&str] = &["TASK", "TEX_OFFSET", "IMG", "FRAME", "HIGHLIGHT"];

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    BlurVertical = 0,
    BlurHorizontal = 1,
    Combine = 2,
    Copy = 3,
}

impl Task {
    pub const ALL: [Task; 4] = [
        Task::BlurVertical,
        Task::BlurHorizontal,
        Task::Combine,
        Task::Copy,
    ];

    pub fn blur(horizontal: bool) -> Self {
        if horizontal {
            Task::BlurHorizontal
        } else {
            Task::BlurVertical
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Reflects the program and checks every [`REQUIRED`] name.
pub fn interface() -> Result<ProgramInterface, ProgramError> {
    let interface = ProgramInterface::reflect(LABEL, SOURCE)?;
    interface.require(REQUIRED)?;
    Ok(interface)
}

/// Two triangles covering clip space.
pub const FULLSCREEN_QUAD: [[f32; 3]; 6] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
];

pub fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

pub struct PostLayouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub inputs: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl PostLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniforms = super::uniform_layout(device, "postprocessing uniforms layout");
        // IMG, FRAME, HIGHLIGHT
        let inputs = super::texture_layout(device, 3, "postprocessing inputs layout");
        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("postprocessing pipeline layout"),
            bind_group_layouts: &[&uniforms, &inputs],
            push_constant_ranges: &[],
        });
        Self {
            uniforms,
            inputs,
            pipeline,
        }
    }
}

/// The post-process program compiled for one output format.
pub fn mk_postprocessing_pipeline(
    device: &wgpu::Device,
    layouts: &PostLayouts,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        "postprocessing pipeline",
        &layouts.pipeline,
        &[Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })],
        None,
        &[quad_layout()],
        wgpu::PrimitiveTopology::TriangleList,
        shader,
    )
}
