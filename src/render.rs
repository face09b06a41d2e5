//! Frame composition: the geometry pass and the post-processing chain.
//!
//! A frame always has the same shape. The geometry pass draws every renderable
//! drawable into two reduced-resolution colour targets (`main` and `bright`)
//! sharing one depth buffer. The post-processing chain given by [`post_passes`]
//! then runs on full-screen quads. With post-processing on, the bright target
//! is blurred back and forth between two ping-pong targets and the last blur
//! is combined with `main` into the output. With it off, `main` is copied to
//! the output unchanged.
//!
//! # Key types
//!
//! - [`PostPass`] is one step of the chain: which task, which input, which target
//! - [`RenderTargets`] are the intermediate targets, sized from the output
//! - [`Renderer`] owns every GPU object the frame needs and records the passes

use std::{collections::HashMap, iter};

use cgmath::Vector2;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    config::RenderConfig,
    context::Context,
    data_structures::{
        mesh::Topology,
        scene::{DrawMatrices, Scene, TEXTURE_COUNT},
        texture::{self, Texture},
    },
    pipelines::{
        firstpass::{self, FirstpassLayouts},
        postprocessing::{self, PostLayouts, Task},
        program::{ProgramInterface, UniformBlock},
    },
    resources::{LoadedAssets, ProgramId, TextureSource, VertexArray},
};

/// A texture a post-process pass reads as its `IMG` input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Main,
    Bright,
    PingPong(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    PingPong(usize),
    Output,
}

/// One full-screen pass. `FRAME` and `HIGHLIGHT` are always `main` and
/// `bright`, only `IMG` changes between passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostPass {
    pub task: Task,
    pub image: Source,
    pub target: Target,
}

/// The post-processing chain of one frame.
///
/// Blur passes alternate direction starting horizontally. Pass `i` writes the
/// ping-pong buffer indexed by its direction and reads the other one, except
/// the first pass, which reads `bright`. The combine pass reads whatever the
/// last blur pass wrote.
pub fn post_passes(use_postprocessing: bool, blur_passes: usize) -> Vec<PostPass> {
    if !use_postprocessing {
        return vec![PostPass {
            task: Task::Copy,
            image: Source::Main,
            target: Target::Output,
        }];
    }
    let mut passes = Vec::with_capacity(blur_passes + 1);
    let mut horizontal = true;
    let mut image = Source::Bright;
    for _ in 0..blur_passes {
        let target = horizontal as usize;
        passes.push(PostPass {
            task: Task::blur(horizontal),
            image,
            target: Target::PingPong(target),
        });
        image = Source::PingPong(target);
        horizontal = !horizontal;
    }
    passes.push(PostPass {
        task: Task::Combine,
        image,
        target: Target::Output,
    });
    passes
}

/// Intermediate targets of a frame, all the same reduced size.
#[derive(Debug)]
pub struct RenderTargets {
    pub main: Texture,
    pub bright: Texture,
    pub depth: Texture,
    pub ping_pong: [Texture; 2],
    size: [u32; 2],
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let colour = |label| {
            Texture::create_render_target(device, size, firstpass::COLOR_FORMAT, label)
        };
        Self {
            main: colour("main target"),
            bright: colour("bright target"),
            depth: Texture::create_depth_texture(device, size, "first pass depth"),
            ping_pong: [colour("ping-pong target 0"), colour("ping-pong target 1")],
            size,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn source(&self, source: Source) -> &Texture {
        match source {
            Source::Main => &self.main,
            Source::Bright => &self.bright,
            Source::PingPong(i) => &self.ping_pong[i],
        }
    }
}

/// GPU objects of one drawable.
struct DrawSlot {
    uniforms: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    textures: wgpu::BindGroup,
}

/// Objects of the post-processing program.
struct PostResources {
    interface: ProgramInterface,
    layouts: PostLayouts,
    to_ping_pong: wgpu::RenderPipeline,
    to_output: wgpu::RenderPipeline,
    quad: wgpu::Buffer,
    tasks: HashMap<Task, (wgpu::Buffer, wgpu::BindGroup)>,
    inputs: HashMap<Source, wgpu::BindGroup>,
}

/// Executes frames of a [`Scene`] built against one [`LoadedAssets`] table.
pub struct Renderer {
    config: RenderConfig,
    interfaces: Vec<ProgramInterface>,
    shaders: Vec<wgpu::ShaderModule>,
    layouts: FirstpassLayouts,
    pipelines: HashMap<(ProgramId, Topology), wgpu::RenderPipeline>,
    vertex_buffers: Vec<wgpu::Buffer>,
    vertex_arrays: Vec<VertexArray>,
    textures: Vec<Texture>,
    white: Texture,
    sampler: wgpu::Sampler,
    texel_sampler: wgpu::Sampler,
    draws: Vec<DrawSlot>,
    targets: RenderTargets,
    post: PostResources,
}

impl Renderer {
    pub fn new(ctx: &Context, assets: &LoadedAssets, config: RenderConfig) -> anyhow::Result<Self> {
        let device = &ctx.device;

        let mut interfaces = Vec::new();
        let mut shaders = Vec::new();
        for (_, program) in assets.programs() {
            interfaces.push(program.interface.clone());
            shaders.push(device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&program.label),
                source: wgpu::ShaderSource::Wgsl(program.source.as_str().into()),
            }));
        }

        let vertex_buffers = assets
            .mesh_buffers()
            .map(|(_, buffer)| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertex Buffer"),
                    contents: bytemuck::cast_slice(&buffer.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            })
            .collect();
        let vertex_arrays = assets.vertex_arrays().map(|(_, va)| va).collect();

        let mut textures = Vec::new();
        for (_, name, source) in assets.textures() {
            textures.push(match source {
                TextureSource::Solid(rgba) => Texture::solid(device, &ctx.queue, *rgba, name),
                TextureSource::Encoded(bytes) => {
                    Texture::from_bytes(device, &ctx.queue, bytes, name)?
                }
            });
        }
        let white = Texture::solid(device, &ctx.queue, [0xff; 4], "default white");

        let texel_sampler = texture::create_texel_sampler(device);
        let targets = RenderTargets::new(device, config.first_pass_size(ctx.size()));
        let post = PostResources::new(ctx, &targets, &texel_sampler)?;
        log::info!(
            "Renderer ready: {} programs, {} textures, first pass at {:?}.",
            interfaces.len(),
            textures.len(),
            targets.size()
        );

        Ok(Self {
            config,
            interfaces,
            shaders,
            layouts: FirstpassLayouts::new(device),
            pipelines: HashMap::new(),
            vertex_buffers,
            vertex_arrays,
            textures,
            white,
            sampler: texture::create_default_sampler(device),
            texel_sampler,
            draws: Vec::new(),
            targets,
            post,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Creates per-drawable uniform buffers and bind groups, and the pipelines
    /// the drawables need. Called again automatically when the drawable count
    /// changes.
    pub fn prepare(&mut self, ctx: &Context, scene: &Scene) {
        let device = &ctx.device;
        self.draws.clear();
        for drawable in &scene.drawables {
            let pipeline = &drawable.pipeline;
            let size = pipeline
                .program
                .and_then(|p| self.interfaces[p.0].block_size(0, 0))
                .unwrap_or(0)
                .max(16);
            let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Drawable Uniform Buffer"),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.layouts.uniforms,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }],
                label: Some("drawable_uniform_bind_group"),
            });
            let views: Vec<&wgpu::TextureView> = pipeline
                .textures
                .iter()
                .map(|t| match t {
                    Some(id) => &self.textures[id.0].view,
                    None => &self.white.view,
                })
                .collect();
            let mut entries: Vec<_> = views
                .iter()
                .enumerate()
                .map(|(i, view)| wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: wgpu::BindingResource::TextureView(view),
                })
                .collect();
            entries.push(wgpu::BindGroupEntry {
                binding: TEXTURE_COUNT as u32,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
            let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.layouts.textures,
                entries: &entries,
                label: Some("drawable_texture_bind_group"),
            });
            self.draws.push(DrawSlot {
                uniforms,
                uniform_group,
                textures,
            });

            if let Some(program) = pipeline.program {
                let key = (program, pipeline.topology);
                if !self.pipelines.contains_key(&key) {
                    let render_pipeline = firstpass::mk_firstpass_pipeline(
                        device,
                        &self.layouts,
                        &self.shaders[program.0],
                        pipeline.topology.into(),
                    );
                    self.pipelines.insert(key, render_pipeline);
                }
            }
        }
        log::debug!("Prepared {} drawables.", self.draws.len());
    }

    /// Recreates the intermediate targets for a new output size.
    pub fn resize(&mut self, ctx: &Context, output: [u32; 2]) {
        self.targets = RenderTargets::new(&ctx.device, self.config.first_pass_size(output));
        self.post.rebind(ctx, &self.targets, &self.texel_sampler);
    }

    /// Renders `scene` as seen from camera `camera` into `view`.
    pub fn draw(&mut self, ctx: &Context, scene: &Scene, camera: usize, view: &wgpu::TextureView) {
        if self.draws.len() != scene.drawables.len() {
            self.prepare(ctx, scene);
        }
        let [width, height] = ctx.size();
        let Some(camera) = scene.cameras.get(camera) else {
            log::error!("Scene has no camera {}; nothing drawn.", camera);
            return;
        };
        let mut camera = camera.clone();
        camera.aspect = width as f32 / height.max(1) as f32;
        let world_to_clip = camera.world_to_clip(&scene.transforms);

        for (drawable, slot) in scene.drawables.iter().zip(&self.draws) {
            let Some(program) = drawable.pipeline.program else {
                continue;
            };
            if !drawable.is_renderable() {
                continue;
            }
            let mut block = UniformBlock::new(&self.interfaces[program.0], 0, 0);
            let matrices = DrawMatrices::new(&scene.transforms, drawable.transform, world_to_clip);
            block.set_mat4("OBJECT_TO_CLIP", matrices.object_to_clip);
            block.set_mat4("OBJECT_TO_LIGHT", matrices.object_to_light);
            block.set_mat3("NORMAL_TO_LIGHT", matrices.normal_to_light);
            if let Some(set_uniforms) = &drawable.pipeline.set_uniforms {
                set_uniforms(scene, &mut block);
            }
            if !block.bytes().is_empty() {
                ctx.queue.write_buffer(&slot.uniforms, 0, block.bytes());
            }
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("First Pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.targets.main.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.targets.bright.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (drawable, slot) in scene.drawables.iter().zip(&self.draws) {
                let pipeline = &drawable.pipeline;
                let (Some(program), Some(vertex_array)) = (pipeline.program, pipeline.vertex_array)
                else {
                    continue;
                };
                if pipeline.count == 0 {
                    continue;
                }
                let Some(render_pipeline) = self.pipelines.get(&(program, pipeline.topology)) else {
                    continue;
                };
                let buffer = &self.vertex_buffers[self.vertex_arrays[vertex_array.0].buffer.0];
                render_pass.set_pipeline(render_pipeline);
                render_pass.set_bind_group(0, &slot.uniform_group, &[]);
                render_pass.set_bind_group(1, &slot.textures, &[]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(pipeline.start..pipeline.start + pipeline.count, 0..1);
            }
        }

        let passes = post_passes(self.config.use_postprocessing, self.config.blur_passes);
        for pass in &passes {
            let (view, pipeline, clear) = match pass.target {
                Target::PingPong(i) => (
                    &self.targets.ping_pong[i].view,
                    &self.post.to_ping_pong,
                    wgpu::Color::BLACK,
                ),
                Target::Output => (view, &self.post.to_output, ctx.clear_colour),
            };
            let (_, task_group) = &self.post.tasks[&pass.task];
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Post Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, task_group, &[]);
            render_pass.set_bind_group(1, &self.post.inputs[&pass.image], &[]);
            render_pass.set_vertex_buffer(0, self.post.quad.slice(..));
            render_pass.draw(0..postprocessing::FULLSCREEN_QUAD.len() as u32, 0..1);
        }

        ctx.queue.submit(iter::once(encoder.finish()));
    }
}

impl PostResources {
    fn new(
        ctx: &Context,
        targets: &RenderTargets,
        texel_sampler: &wgpu::Sampler,
    ) -> anyhow::Result<Self> {
        let device = &ctx.device;
        let interface = postprocessing::interface()?;
        let layouts = PostLayouts::new(device);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(postprocessing::LABEL),
            source: wgpu::ShaderSource::Wgsl(postprocessing::SOURCE.into()),
        });
        let to_ping_pong = postprocessing::mk_postprocessing_pipeline(
            device,
            &layouts,
            &shader,
            firstpass::COLOR_FORMAT,
        );
        let to_output =
            postprocessing::mk_postprocessing_pipeline(device, &layouts, &shader, ctx.config.format);
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad Buffer"),
            contents: bytemuck::cast_slice(&postprocessing::FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let size = interface.block_size(0, 0).unwrap_or(0).max(16);
        let tasks = Task::ALL
            .iter()
            .map(|&task| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Post Task Buffer"),
                    size: size as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &layouts.uniforms,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some("post_task_bind_group"),
                });
                (task, (buffer, group))
            })
            .collect();

        let mut post = Self {
            interface,
            layouts,
            to_ping_pong,
            to_output,
            quad,
            tasks,
            inputs: HashMap::new(),
        };
        post.rebind(ctx, targets, texel_sampler);
        Ok(post)
    }

    /// Points the input bind groups at `targets` and refreshes `TEX_OFFSET`.
    fn rebind(&mut self, ctx: &Context, targets: &RenderTargets, texel_sampler: &wgpu::Sampler) {
        let [width, height] = targets.size();
        let texel = Vector2::new(1.0 / width as f32, 1.0 / height as f32);
        for (task, (buffer, _)) in &self.tasks {
            let mut block = UniformBlock::new(&self.interface, 0, 0);
            block.set_i32("TASK", task.code());
            block.set_vec2("TEX_OFFSET", texel);
            ctx.queue.write_buffer(buffer, 0, block.bytes());
        }

        self.inputs.clear();
        let sources = [
            Source::Main,
            Source::Bright,
            Source::PingPong(0),
            Source::PingPong(1),
        ];
        for source in sources {
            let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.layouts.inputs,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&targets.source(source).view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&targets.main.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&targets.bright.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(texel_sampler),
                    },
                ],
                label: Some("post_input_bind_group"),
            });
            self.inputs.insert(source, group);
        }
    }
}

/// Copies an `Rgba8Unorm` texture back to the CPU.
pub async fn read_rgba8(
    ctx: &Context,
    texture: &wgpu::Texture,
) -> anyhow::Result<image::RgbaImage> {
    let width = texture.width();
    let height = texture.height();
    let unpadded = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Readback Buffer"),
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    ctx.queue.submit(iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // the receiver only goes away if the caller stopped waiting
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(Duration::from_secs(3)),
    })?;
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("Readback was cancelled"))??;

    let data = buffer_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in data.chunks(padded as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(data);
    output_buffer.unmap();
    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow::anyhow!("Readback size mismatch"))
}
