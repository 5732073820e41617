//! [`GraphicsApi`] on top of wgpu.
//!
//! The stateful, bind-then-draw calls of the trait are recorded into plain
//! Rust state. `draw_indexed` snapshots everything a draw needs (pipeline key,
//! buffers, uniform block, texture) into a queue, and `finish_frame` encodes the
//! whole queue into one render pass and presents it.
//!
//! Uniforms are staged per program on the CPU and copied into a per-frame
//! uniform buffer, one 256-byte aligned slice per draw, addressed with a
//! dynamic offset.

use std::{collections::HashMap, num::NonZeroU64, sync::Arc};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    error::ContextError,
    gpu::{
        BufferId, BufferTarget, Capabilities, DepthFunc, GraphicsApi, ProgramId, Sampling,
        ShaderId, ShaderStage, TexelData, TextureId, UniformLocation, UniformValue,
        VertexArrayId, VertexAttribute, flip_rows,
        pipeline::{self, PipelineStages, ProgramLayouts, SlotLayout, VertexLayoutKey},
        reflect::{self, ProgramInterface, StageInterface},
        texture::{DepthTexture, GpuTexture, create_sampler},
    },
};

struct Stage {
    module: wgpu::ShaderModule,
    interface: StageInterface,
}

struct Program {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    interface: ProgramInterface,
    layouts: ProgramLayouts,
    staging: Vec<u8>,
    pipelines: HashMap<VertexLayoutKey, wgpu::RenderPipeline>,
}

#[derive(Default)]
struct VertexArray {
    attributes: HashMap<u32, (VertexAttribute, BufferId)>,
    elements: Option<BufferId>,
}

struct TextureSlot {
    gpu: Option<GpuTexture>,
    sampling: Sampling,
}

struct QueuedDraw {
    program: ProgramId,
    key: VertexLayoutKey,
    vertex_buffers: Vec<BufferId>,
    index_buffer: BufferId,
    index_count: u32,
    uniforms: Vec<u8>,
    texture: Option<TextureId>,
}

pub struct WgpuApi {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    capabilities: Capabilities,
    drawable: (u32, u32),
    viewport: (u32, u32),
    depth: Option<DepthFunc>,
    clear_colour: wgpu::Color,
    next_id: u32,
    shaders: HashMap<ShaderId, Stage>,
    programs: HashMap<ProgramId, Program>,
    current_program: Option<ProgramId>,
    vertex_arrays: HashMap<VertexArrayId, VertexArray>,
    bound_vertex_array: Option<VertexArrayId>,
    buffers: HashMap<BufferId, Option<wgpu::Buffer>>,
    bound_array_buffer: Option<BufferId>,
    textures: HashMap<TextureId, TextureSlot>,
    active_unit: u32,
    units: Vec<Option<TextureId>>,
    queued: Vec<QueuedDraw>,
    lost: bool,
}

impl WgpuApi {
    pub async fn new(window: Arc<Window>) -> Result<Self, ContextError> {
        let size = window.inner_size();

        log::info!("Acquiring wgpu context");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| ContextError::Surface(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ContextError::Adapter(e.to_string()))?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scene-ngin device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| ContextError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&fallback_format) = surface_caps.formats.first() else {
            return Err(ContextError::Surface("surface reports no formats".to_owned()));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(fallback_format);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_texture = DepthTexture::new(&device, [config.width, config.height], "depth_texture");

        let limits = device.limits();
        let capabilities = Capabilities {
            max_texture_units: limits.max_sampled_textures_per_shader_stage,
            max_vertex_attributes: limits.max_vertex_attributes,
            max_texture_dimension: limits.max_texture_dimension_2d,
        };

        Ok(Self {
            window,
            surface,
            device,
            queue,
            drawable: (config.width, config.height),
            viewport: (config.width, config.height),
            config,
            depth_texture,
            capabilities,
            depth: None,
            clear_colour: wgpu::Color::BLACK,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            vertex_arrays: HashMap::new(),
            bound_vertex_array: None,
            buffers: HashMap::new(),
            bound_array_buffer: None,
            textures: HashMap::new(),
            active_unit: 0,
            units: vec![None; capabilities.max_texture_units as usize],
            queued: Vec::new(),
            lost: false,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Matches the swapchain to the window, which may be larger than the drawable.
    fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthTexture::new(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.bound_array_buffer,
            BufferTarget::ElementArray => self
                .bound_vertex_array
                .and_then(|vao| self.vertex_arrays.get(&vao))
                .and_then(|vao| vao.elements),
        }
    }

    /// Resolves the vertex layout the current program needs from the bound vertex array.
    fn layout_for_draw(&self, program: &Program, vao: &VertexArray) -> Option<(VertexLayoutKey, Vec<BufferId>)> {
        let mut slots: Vec<(BufferId, SlotLayout)> = Vec::new();
        for (name, location) in &program.interface.attributes {
            let Some((attribute, buffer)) = vao.attributes.get(location) else {
                log::warn!("attribute '{name}' (location {location}) is not enabled; draw skipped");
                return None;
            };
            let Some(format) = pipeline::vertex_format(attribute) else {
                log::warn!("unsupported vertex format for '{name}'; draw skipped");
                return None;
            };
            let entry = (*location, format, attribute.offset);
            match slots
                .iter_mut()
                .find(|(b, slot)| b == buffer && slot.stride == attribute.stride)
            {
                Some((_, slot)) => slot.attributes.push(entry),
                None => slots.push((
                    *buffer,
                    SlotLayout {
                        stride: attribute.stride,
                        attributes: vec![entry],
                    },
                )),
            }
        }
        let buffers = slots.iter().map(|(b, _)| *b).collect();
        let key = VertexLayoutKey {
            slots: slots.into_iter().map(|(_, slot)| slot).collect(),
            depth: self.depth,
        };
        Some((key, buffers))
    }

    fn ensure_pipeline(&mut self, program: ProgramId, key: &VertexLayoutKey) {
        let format = self.config.format;
        let Some(program) = self.programs.get_mut(&program) else {
            return;
        };
        if program.pipelines.contains_key(key) {
            return;
        }
        let pipeline = pipeline::mk_program_pipeline(
            &self.device,
            &program.layouts.pipeline,
            PipelineStages {
                vertex: &program.vertex,
                fragment: &program.fragment,
                interface: &program.interface,
            },
            format,
            key,
        );
        program.pipelines.insert(key.clone(), pipeline);
    }

    fn centred_viewport(&self) -> (f32, f32, f32, f32) {
        let (sw, sh) = (self.config.width, self.config.height);
        let w = self.viewport.0.clamp(1, sw);
        let h = self.viewport.1.clamp(1, sh);
        let x = (sw - w) / 2;
        let y = (sh - h) / 2;
        (x as f32, y as f32, w as f32, h as f32)
    }
}

impl GraphicsApi for WgpuApi {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn configure_depth(&mut self, enabled: bool, func: DepthFunc) {
        self.depth = enabled.then_some(func);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, colour: wgpu::Color) {
        self.clear_colour = colour;
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.drawable = (width.max(1), height.max(1));
        if !self.lost {
            self.reconfigure();
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.drawable
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        let interface = reflect::reflect_stage(stage, source)?;
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{stage} shader")),
            source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
        });
        let id = ShaderId(self.next());
        self.shaders.insert(id, Stage { module, interface });
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_none() && !self.lost {
            log::warn!("delete_shader: unknown shader {}", shader.0);
        }
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err("attached shader does not exist".to_owned());
        };
        let interface = reflect::link(&vs.interface, &fs.interface)?;
        let layouts = pipeline::program_layouts(&self.device, &interface);
        let program = Program {
            vertex: vs.module.clone(),
            fragment: fs.module.clone(),
            staging: vec![0; interface.uniform_block_size as usize],
            interface,
            layouts,
            pipelines: HashMap::new(),
        };
        let id = ProgramId(self.next());
        self.programs.insert(id, program);
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() && !self.lost {
            log::warn!("delete_program: unknown program {}", program.0);
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if program.is_some_and(|p| !self.programs.contains_key(&p)) {
            log::warn!("use_program: unknown program");
            return;
        }
        self.current_program = program;
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.interface.attributes.get(name).copied()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let field = self.programs.get(&program)?.interface.uniforms.get(name)?;
        Some(UniformLocation {
            program,
            offset: field.offset,
            kind: field.kind,
        })
    }

    fn set_uniform(&mut self, location: &UniformLocation, value: UniformValue) {
        if location.kind != value.kind() {
            log::warn!("set_uniform: {:?} written to {:?} uniform", value.kind(), location.kind);
            return;
        }
        let Some(program) = self.programs.get_mut(&location.program) else {
            return;
        };
        let bytes = value.to_bytes();
        let start = location.offset as usize;
        if let Some(slot) = program.staging.get_mut(start..start + bytes.len()) {
            slot.copy_from_slice(&bytes);
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, VertexArray::default());
        id
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array.filter(|v| self.vertex_arrays.contains_key(v));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next());
        self.buffers.insert(id, None);
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        let buffer = buffer.filter(|b| self.buffers.contains_key(b));
        match target {
            BufferTarget::Array => self.bound_array_buffer = buffer,
            BufferTarget::ElementArray => {
                if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
                    vao.elements = buffer;
                }
            }
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        if self.lost {
            return;
        }
        let Some(id) = self.bound_buffer(target) else {
            log::warn!("buffer_data: no buffer bound to {target:?}");
            return;
        };
        let usage = match target {
            BufferTarget::Array => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{target:?} Buffer {}", id.0)),
            contents: data,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        self.buffers.insert(id, Some(buffer));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        if self.bound_array_buffer == Some(buffer) {
            self.bound_array_buffer = None;
        }
    }

    fn vertex_attribute(&mut self, attribute: VertexAttribute) {
        let Some(buffer) = self.bound_array_buffer else {
            log::warn!("vertex_attribute: no array buffer bound");
            return;
        };
        if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
            vao.attributes.insert(attribute.location, (attribute, buffer));
        }
    }

    fn disable_vertex_attribute(&mut self, location: u32) {
        if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
            vao.attributes.remove(&location);
        }
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            TextureSlot {
                gpu: None,
                sampling: Sampling::default(),
            },
        );
        id
    }

    fn active_texture(&mut self, unit: u32) {
        if (unit as usize) < self.units.len() {
            self.active_unit = unit;
        }
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        let texture = texture.filter(|t| self.textures.contains_key(t));
        if let Some(slot) = self.units.get_mut(self.active_unit as usize) {
            *slot = texture;
        }
    }

    fn tex_sampling(&mut self, sampling: Sampling) {
        let Some(id) = self.units.get(self.active_unit as usize).copied().flatten() else {
            return;
        };
        if let Some(slot) = self.textures.get_mut(&id) {
            slot.sampling = sampling;
            if let Some(gpu) = &mut slot.gpu {
                gpu.sampler = create_sampler(&self.device, sampling);
            }
        }
    }

    fn tex_image_2d(&mut self, data: TexelData<'_>, flip_y: bool) {
        if self.lost {
            return;
        }
        if !data.is_well_sized() {
            log::warn!("tex_image_2d: {} bytes for a {}x{} image", data.rgba.len(), data.width, data.height);
            return;
        }
        let max = self.capabilities.max_texture_dimension;
        if data.width > max || data.height > max {
            log::warn!("tex_image_2d: {}x{} exceeds the {max}px limit", data.width, data.height);
            return;
        }
        let Some(id) = self.units.get(self.active_unit as usize).copied().flatten() else {
            log::warn!("tex_image_2d: no texture bound");
            return;
        };
        let Some(slot) = self.textures.get_mut(&id) else {
            return;
        };
        let resized = slot
            .gpu
            .as_ref()
            .is_none_or(|gpu| gpu.size != (data.width, data.height));
        if resized {
            slot.gpu = Some(GpuTexture::new(
                &self.device,
                data.width,
                data.height,
                slot.sampling,
                &format!("Texture {}", id.0),
            ));
        }
        if let Some(gpu) = &slot.gpu {
            if flip_y {
                gpu.write(&self.queue, &flip_rows(data.width, data.height, data.rgba));
            } else {
                gpu.write(&self.queue, data.rgba);
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        for unit in self.units.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.lost {
            return;
        }
        let (Some(program_id), Some(vao_id)) = (self.current_program, self.bound_vertex_array) else {
            log::warn!("draw_indexed: program or vertex array missing");
            return;
        };
        let (Some(program), Some(vao)) = (self.programs.get(&program_id), self.vertex_arrays.get(&vao_id)) else {
            return;
        };
        let Some(index_buffer) = vao.elements else {
            log::warn!("draw_indexed: vertex array has no element buffer");
            return;
        };
        let Some((key, vertex_buffers)) = self.layout_for_draw(program, vao) else {
            return;
        };
        let texture = if program.interface.samples_texture {
            let Some(texture) = self.units.first().copied().flatten() else {
                log::warn!("draw_indexed: program samples a texture but unit 0 is empty");
                return;
            };
            Some(texture)
        } else {
            None
        };
        let uniforms = program.staging.clone();
        self.queued.push(QueuedDraw {
            program: program_id,
            key,
            vertex_buffers,
            index_buffer,
            index_count,
            uniforms,
            texture,
        });
    }

    fn finish_frame(&mut self) -> Result<(), String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        let draws = std::mem::take(&mut self.queued);
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e.to_string()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        for draw in &draws {
            self.ensure_pipeline(draw.program, &draw.key);
        }

        let align = self.device.limits().min_uniform_buffer_offset_alignment as usize;
        let mut uniform_bytes: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(draws.len());
        for draw in &draws {
            let start = uniform_bytes.len();
            offsets.push(start as u32);
            uniform_bytes.extend_from_slice(&draw.uniforms);
            let padded = (uniform_bytes.len() + align - 1) / align * align;
            uniform_bytes.resize(padded.max(start + align), 0);
        }
        let uniform_buffer = (!uniform_bytes.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Frame Uniform Buffer"),
                contents: &uniform_bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        struct Resolved<'a> {
            pipeline: &'a wgpu::RenderPipeline,
            uniforms: wgpu::BindGroup,
            dynamic_offset: Option<u32>,
            texture: Option<wgpu::BindGroup>,
            vertex_buffers: Vec<&'a wgpu::Buffer>,
            index_buffer: &'a wgpu::Buffer,
            index_count: u32,
        }
        let mut resolved = Vec::with_capacity(draws.len());
        for (draw, offset) in draws.iter().zip(offsets) {
            let Some(program) = self.programs.get(&draw.program) else {
                continue;
            };
            let Some(pipeline) = program.pipelines.get(&draw.key) else {
                continue;
            };
            let block = NonZeroU64::new(program.interface.uniform_block_size as u64);
            let (uniforms, dynamic_offset) = match (block, &uniform_buffer) {
                (Some(size), Some(buffer)) => (
                    self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout: &program.layouts.uniforms,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: 0,
                                size: Some(size),
                            }),
                        }],
                        label: Some("program_uniform_bind_group"),
                    }),
                    Some(offset),
                ),
                _ => (
                    self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout: &program.layouts.uniforms,
                        entries: &[],
                        label: Some("empty_uniform_bind_group"),
                    }),
                    None,
                ),
            };
            let texture = match (&program.layouts.texture, draw.texture) {
                (Some(layout), Some(id)) => {
                    let Some(gpu) = self.textures.get(&id).and_then(|slot| slot.gpu.as_ref()) else {
                        continue;
                    };
                    Some(gpu.bind_group(&self.device, layout))
                }
                _ => None,
            };
            let vertex_buffers: Option<Vec<&wgpu::Buffer>> = draw
                .vertex_buffers
                .iter()
                .map(|id| self.buffers.get(id).and_then(Option::as_ref))
                .collect();
            let (Some(vertex_buffers), Some(Some(index_buffer))) =
                (vertex_buffers, self.buffers.get(&draw.index_buffer))
            else {
                continue;
            };
            resolved.push(Resolved {
                pipeline,
                uniforms,
                dynamic_offset,
                texture,
                vertex_buffers,
                index_buffer,
                index_count: draw.index_count,
            });
        }

        let (x, y, w, h) = self.centred_viewport();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
            for draw in &resolved {
                render_pass.set_pipeline(draw.pipeline);
                match draw.dynamic_offset {
                    Some(offset) => render_pass.set_bind_group(0, &draw.uniforms, &[offset]),
                    None => render_pass.set_bind_group(0, &draw.uniforms, &[]),
                }
                if let Some(texture) = &draw.texture {
                    render_pass.set_bind_group(1, texture, &[]);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                render_pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn lose_context(&mut self) {
        log::info!("Releasing wgpu context objects");
        self.lost = true;
        self.queued.clear();
        self.shaders.clear();
        self.programs.clear();
        self.vertex_arrays.clear();
        self.buffers.clear();
        self.textures.clear();
        self.units.iter_mut().for_each(|u| *u = None);
        self.current_program = None;
        self.bound_vertex_array = None;
        self.bound_array_buffer = None;
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }
}
