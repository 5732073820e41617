//! An in-memory [`GraphicsApi`].
//!
//! `HeadlessApi` keeps every object the engine creates in plain maps, stores
//! texels so they can be sampled back, and records draws plus an ordered log
//! of lifecycle calls. Misuse is recorded in [`HeadlessApi::errors`] instead of
//! panicking, mirroring how a real driver queues errors.

use std::collections::{BTreeMap, HashMap};

use crate::gpu::{
    BufferId, BufferTarget, Capabilities, DepthFunc, GraphicsApi, ProgramId, Sampling, ShaderId,
    ShaderStage, TexelData, TextureId, UniformLocation, UniformValue, VertexArrayId,
    VertexAttribute,
    reflect::{self, ProgramInterface, StageInterface},
};

/// A fault a real driver would have reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuFault {
    UnknownHandle(&'static str, u32),
    NothingBound(&'static str),
    InvalidValue(String),
    TypeMismatch(String),
}

/// Calls that matter for resource lifetime, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    DeleteTexture(TextureId),
    DeleteBuffer(BufferId),
    DeleteVertexArray(VertexArrayId),
    DeleteProgram(ProgramId),
    DisableAttribute(u32),
    UnbindTextureUnit(u32),
    LoseContext,
    ResizeSurface(u32, u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub frame: u64,
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_count: u32,
    /// Texture bound to unit 0 and its centre texel at draw time.
    pub texture: Option<TextureId>,
    pub sampled: Option<[u8; 4]>,
    /// Snapshot of every named uniform as floats.
    pub uniforms: BTreeMap<String, Vec<f32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub programs: usize,
    pub shaders: usize,
    pub vertex_arrays: usize,
    pub buffers: usize,
    pub textures: usize,
}

struct Program {
    interface: ProgramInterface,
    staging: Vec<u8>,
}

#[derive(Default)]
struct VertexArray {
    attributes: BTreeMap<u32, (VertexAttribute, BufferId)>,
    elements: Option<BufferId>,
}

#[derive(Default)]
struct Texels {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    sampling: Sampling,
}

pub struct HeadlessApi {
    capabilities: Capabilities,
    surface: (u32, u32),
    viewport: (u32, u32),
    depth: Option<DepthFunc>,
    clear_colour: wgpu::Color,
    next_id: u32,
    shaders: HashMap<ShaderId, StageInterface>,
    programs: HashMap<ProgramId, Program>,
    current_program: Option<ProgramId>,
    vertex_arrays: HashMap<VertexArrayId, VertexArray>,
    bound_vertex_array: Option<VertexArrayId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    bound_array_buffer: Option<BufferId>,
    textures: HashMap<TextureId, Texels>,
    active_unit: u32,
    units: Vec<Option<TextureId>>,
    frame: u64,
    draws: Vec<DrawRecord>,
    calls: Vec<Call>,
    errors: Vec<GpuFault>,
    lost: bool,
}

impl HeadlessApi {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = Capabilities {
            max_texture_units: 16,
            max_vertex_attributes: 16,
            max_texture_dimension: 8192,
        };
        Self {
            capabilities,
            surface: (width, height),
            viewport: (width, height),
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
            frame: 0,
            draws: Vec::new(),
            calls: Vec::new(),
            errors: Vec::new(),
            lost: false,
        }
    }

    /// Lowers the largest texture edge the backend accepts.
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.capabilities.max_texture_dimension = max;
        self
    }

    pub fn errors(&self) -> &[GpuFault] {
        &self.errors
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn frames_presented(&self) -> u64 {
        self.frame
    }

    pub fn depth_func(&self) -> Option<DepthFunc> {
        self.depth
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        self.clear_colour
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(unit as usize).copied().flatten()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn texture_sampling(&self, texture: TextureId) -> Option<Sampling> {
        self.textures.get(&texture).map(|t| t.sampling)
    }

    /// Reads one texel as stored after upload (row 0 first).
    pub fn texel(&self, texture: TextureId, x: u32, y: u32) -> Option<[u8; 4]> {
        let texels = self.textures.get(&texture)?;
        if x >= texels.width || y >= texels.height {
            return None;
        }
        let i = ((y * texels.width + x) * 4) as usize;
        texels.rgba.get(i..i + 4).and_then(|p| p.try_into().ok())
    }

    /// Nearest-texel lookup at normalized coordinates, clamped to the edge.
    pub fn sample(&self, texture: TextureId, u: f32, v: f32) -> Option<[u8; 4]> {
        let texels = self.textures.get(&texture)?;
        if texels.width == 0 || texels.height == 0 {
            return None;
        }
        let x = ((u.clamp(0.0, 1.0) * texels.width as f32) as u32).min(texels.width - 1);
        let y = ((v.clamp(0.0, 1.0) * texels.height as f32) as u32).min(texels.height - 1);
        self.texel(texture, x, y)
    }

    pub fn live_objects(&self) -> LiveObjects {
        LiveObjects {
            programs: self.programs.len(),
            shaders: self.shaders.len(),
            vertex_arrays: self.vertex_arrays.len(),
            buffers: self.buffers.len(),
            textures: self.textures.len(),
        }
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn enabled_attributes(&self, vertex_array: VertexArrayId) -> Vec<VertexAttribute> {
        self.vertex_arrays
            .get(&vertex_array)
            .map(|vao| vao.attributes.values().map(|(a, _)| *a).collect())
            .unwrap_or_default()
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn fault(&mut self, fault: GpuFault) {
        log::debug!("headless gpu fault: {fault:?}");
        self.errors.push(fault);
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

    fn snapshot_uniforms(program: &Program) -> BTreeMap<String, Vec<f32>> {
        program
            .interface
            .uniforms
            .iter()
            .filter_map(|(name, field)| {
                let start = field.offset as usize;
                let bytes = program.staging.get(start..start + field.size as usize)?;
                let floats = bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                Some((name.clone(), floats))
            })
            .collect()
    }
}

impl GraphicsApi for HeadlessApi {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn configure_depth(&mut self, enabled: bool, func: DepthFunc) {
        if self.lost {
            return;
        }
        self.depth = enabled.then_some(func);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if self.lost {
            return;
        }
        self.viewport = (width, height);
    }

    fn clear(&mut self, colour: wgpu::Color) {
        if self.lost {
            return;
        }
        self.clear_colour = colour;
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.calls.push(Call::ResizeSurface(width, height));
        self.surface = (width, height);
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        let interface = reflect::reflect_stage(stage, source)?;
        let id = ShaderId(self.next());
        self.shaders.insert(id, interface);
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.lost {
            return;
        }
        if self.shaders.remove(&shader).is_none() {
            self.fault(GpuFault::UnknownHandle("shader", shader.0));
        }
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err("attached shader does not exist".to_owned());
        };
        let interface = reflect::link(vs, fs)?;
        let staging = vec![0; interface.uniform_block_size as usize];
        let id = ProgramId(self.next());
        self.programs.insert(id, Program { interface, staging });
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.lost {
            return;
        }
        if self.programs.remove(&program).is_none() {
            self.fault(GpuFault::UnknownHandle("program", program.0));
            return;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(Call::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if self.lost {
            return;
        }
        if let Some(p) = program {
            if !self.programs.contains_key(&p) {
                self.fault(GpuFault::UnknownHandle("program", p.0));
                return;
            }
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
        if self.lost {
            return;
        }
        if self.current_program != Some(location.program) {
            self.fault(GpuFault::InvalidValue(
                "uniform location does not belong to the current program".to_owned(),
            ));
            return;
        }
        if location.kind != value.kind() {
            self.fault(GpuFault::TypeMismatch(format!(
                "{:?} written to {:?} uniform",
                value.kind(),
                location.kind
            )));
            return;
        }
        let bytes = value.to_bytes();
        let Some(program) = self.programs.get_mut(&location.program) else {
            self.fault(GpuFault::UnknownHandle("program", location.program.0));
            return;
        };
        let start = location.offset as usize;
        match program.staging.get_mut(start..start + bytes.len()) {
            Some(slot) => slot.copy_from_slice(&bytes),
            None => self.fault(GpuFault::InvalidValue("uniform outside block".to_owned())),
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        if !self.lost {
            self.vertex_arrays.insert(id, VertexArray::default());
        }
        id
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        if self.lost {
            return;
        }
        if let Some(v) = vertex_array {
            if !self.vertex_arrays.contains_key(&v) {
                self.fault(GpuFault::UnknownHandle("vertex array", v.0));
                return;
            }
        }
        self.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.lost {
            return;
        }
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            self.fault(GpuFault::UnknownHandle("vertex array", vertex_array.0));
            return;
        }
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        self.calls.push(Call::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next());
        if !self.lost {
            self.buffers.insert(id, Vec::new());
        }
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if self.lost {
            return;
        }
        if let Some(b) = buffer {
            if !self.buffers.contains_key(&b) {
                self.fault(GpuFault::UnknownHandle("buffer", b.0));
                return;
            }
        }
        match target {
            BufferTarget::Array => self.bound_array_buffer = buffer,
            BufferTarget::ElementArray => {
                let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v))
                else {
                    self.fault(GpuFault::NothingBound("vertex array for element buffer"));
                    return;
                };
                vao.elements = buffer;
            }
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        if self.lost {
            return;
        }
        let Some(buffer) = self.bound_buffer(target) else {
            self.fault(GpuFault::NothingBound("buffer"));
            return;
        };
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            *contents = data.to_vec();
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.lost {
            return;
        }
        if self.buffers.remove(&buffer).is_none() {
            self.fault(GpuFault::UnknownHandle("buffer", buffer.0));
            return;
        }
        if self.bound_array_buffer == Some(buffer) {
            self.bound_array_buffer = None;
        }
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn vertex_attribute(&mut self, attribute: VertexAttribute) {
        if self.lost {
            return;
        }
        if attribute.location >= self.capabilities.max_vertex_attributes {
            self.fault(GpuFault::InvalidValue(format!(
                "attribute location {} out of range",
                attribute.location
            )));
            return;
        }
        let Some(buffer) = self.bound_array_buffer else {
            self.fault(GpuFault::NothingBound("array buffer"));
            return;
        };
        let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) else {
            self.fault(GpuFault::NothingBound("vertex array"));
            return;
        };
        vao.attributes.insert(attribute.location, (attribute, buffer));
    }

    fn disable_vertex_attribute(&mut self, location: u32) {
        if self.lost {
            return;
        }
        if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
            vao.attributes.remove(&location);
        }
        self.calls.push(Call::DisableAttribute(location));
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.next());
        if !self.lost {
            self.textures.insert(id, Texels::default());
        }
        id
    }

    fn active_texture(&mut self, unit: u32) {
        if self.lost {
            return;
        }
        if unit >= self.capabilities.max_texture_units {
            self.fault(GpuFault::InvalidValue(format!("texture unit {unit} out of range")));
            return;
        }
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        if self.lost {
            return;
        }
        if let Some(t) = texture {
            if !self.textures.contains_key(&t) {
                self.fault(GpuFault::UnknownHandle("texture", t.0));
                return;
            }
        }
        if texture.is_none() {
            self.calls.push(Call::UnbindTextureUnit(self.active_unit));
        }
        self.units[self.active_unit as usize] = texture;
    }

    fn tex_sampling(&mut self, sampling: Sampling) {
        if self.lost {
            return;
        }
        let Some(texture) = self.bound_texture(self.active_unit) else {
            self.fault(GpuFault::NothingBound("texture"));
            return;
        };
        if let Some(texels) = self.textures.get_mut(&texture) {
            texels.sampling = sampling;
        }
    }

    fn tex_image_2d(&mut self, data: TexelData<'_>, flip_y: bool) {
        if self.lost {
            return;
        }
        if !data.is_well_sized() {
            self.fault(GpuFault::InvalidValue(format!(
                "{} bytes for a {}x{} image",
                data.rgba.len(),
                data.width,
                data.height
            )));
            return;
        }
        if data.width > self.capabilities.max_texture_dimension
            || data.height > self.capabilities.max_texture_dimension
        {
            self.fault(GpuFault::InvalidValue("texture too large".to_owned()));
            return;
        }
        let Some(texture) = self.bound_texture(self.active_unit) else {
            self.fault(GpuFault::NothingBound("texture"));
            return;
        };
        let rgba = if flip_y {
            super::flip_rows(data.width, data.height, data.rgba)
        } else {
            data.rgba.to_vec()
        };
        if let Some(texels) = self.textures.get_mut(&texture) {
            texels.width = data.width;
            texels.height = data.height;
            texels.rgba = rgba;
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.lost {
            return;
        }
        if self.textures.remove(&texture).is_none() {
            self.fault(GpuFault::UnknownHandle("texture", texture.0));
            return;
        }
        for unit in self.units.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.lost {
            return;
        }
        let Some(program_id) = self.current_program else {
            self.fault(GpuFault::NothingBound("program"));
            return;
        };
        let Some(vao_id) = self.bound_vertex_array else {
            self.fault(GpuFault::NothingBound("vertex array"));
            return;
        };
        let elements = self
            .vertex_arrays
            .get(&vao_id)
            .and_then(|vao| vao.elements)
            .and_then(|buffer| self.buffers.get(&buffer))
            .map(Vec::len);
        match elements {
            None => {
                self.fault(GpuFault::NothingBound("element buffer"));
                return;
            }
            Some(len) if (index_count as usize) * 2 > len => {
                self.fault(GpuFault::InvalidValue(format!(
                    "{index_count} indices requested, buffer holds {}",
                    len / 2
                )));
                return;
            }
            Some(_) => {}
        }
        let texture = self.bound_texture(0);
        let sampled = texture.and_then(|t| self.sample(t, 0.5, 0.5));
        let uniforms = self
            .programs
            .get(&program_id)
            .map(Self::snapshot_uniforms)
            .unwrap_or_default();
        self.draws.push(DrawRecord {
            frame: self.frame,
            program: program_id,
            vertex_array: vao_id,
            index_count,
            texture,
            sampled,
            uniforms,
        });
    }

    fn finish_frame(&mut self) -> Result<(), String> {
        if self.lost {
            return Err("context lost".to_owned());
        }
        self.frame += 1;
        Ok(())
    }

    fn lose_context(&mut self) {
        self.calls.push(Call::LoseContext);
        self.lost = true;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_twice_records_a_fault() {
        let mut api = HeadlessApi::new(4, 4);
        let texture = api.create_texture();
        api.delete_texture(texture);
        assert!(api.errors().is_empty());
        api.delete_texture(texture);
        assert_eq!(api.errors(), &[GpuFault::UnknownHandle("texture", texture.raw())]);
    }

    #[test]
    fn huge_upload_is_an_invalid_value() {
        let mut api = HeadlessApi::new(4, 4);
        let texture = api.create_texture();
        api.active_texture(0);
        api.bind_texture(Some(texture));
        api.tex_image_2d(
            TexelData {
                width: 70_000,
                height: 70_000,
                rgba: &[0; 4],
            },
            false,
        );
        assert!(matches!(api.errors(), [GpuFault::InvalidValue(_)]));
        assert_eq!(api.texture_size(texture), Some((0, 0)));
    }

    #[test]
    fn flipped_upload_stores_last_row_first() {
        let mut api = HeadlessApi::new(4, 4);
        let texture = api.create_texture();
        api.active_texture(0);
        api.bind_texture(Some(texture));
        let rgba = [255, 0, 0, 255, 0, 0, 255, 255];
        api.tex_image_2d(
            TexelData {
                width: 1,
                height: 2,
                rgba: &rgba,
            },
            true,
        );
        assert_eq!(api.texel(texture, 0, 0), Some([0, 0, 255, 255]));
        assert_eq!(api.texel(texture, 0, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn draw_without_element_buffer_is_a_fault() {
        let mut api = HeadlessApi::new(4, 4);
        let vs = api
            .compile_shader(
                ShaderStage::Vertex,
                "@vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }",
            )
            .unwrap();
        let fs = api
            .compile_shader(
                ShaderStage::Fragment,
                "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
            )
            .unwrap();
        let program = api.link_program(vs, fs).unwrap();
        api.use_program(Some(program));
        let vao = api.create_vertex_array();
        api.bind_vertex_array(Some(vao));
        api.draw_indexed(6);
        assert_eq!(api.errors(), &[GpuFault::NothingBound("element buffer")]);
        assert!(api.draws().is_empty());
    }

    #[test]
    fn lost_context_ignores_further_calls() {
        let mut api = HeadlessApi::new(4, 4);
        let texture = api.create_texture();
        api.lose_context();
        api.delete_texture(texture);
        assert!(api.errors().is_empty());
        assert!(api.is_context_lost());
        assert_eq!(api.live_objects(), LiveObjects::default());
    }
}
