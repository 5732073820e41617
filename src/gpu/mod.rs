//! The GPU capability the engine drives.
//!
//! [`GraphicsApi`] is a small, stateful, handle-based surface in the spirit of
//! classic immediate-mode graphics APIs: objects are created up front, bound,
//! configured and then consumed by draw calls. The engine core never talks to
//! wgpu directly; it only goes through this trait. That keeps the lifecycle
//! logic testable against [`HeadlessApi`] and lets [`WgpuApi`] do the real work
//! on a window.
//!
//! Calls with stale or unknown handles never panic. Implementations record the
//! fault (see [`HeadlessApi::errors`]) or log it, like a GL error queue.

use std::fmt;

pub mod headless;
pub mod pipeline;
pub mod reflect;
pub mod texture;
pub mod wgpu_backend;

pub use headless::HeadlessApi;
pub use wgpu_backend::WgpuApi;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

gpu_handle!(
    /// A compiled, not yet linked, shader stage.
    ShaderId
);
gpu_handle!(
    /// A linked program (vertex + fragment stage).
    ProgramId
);
gpu_handle!(VertexArrayId);
gpu_handle!(BufferId);
gpu_handle!(TextureId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Array,
    /// `u16` indices, captured by the bound vertex array.
    ElementArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    UnsignedByte,
    UnsignedShort,
}

impl ComponentType {
    pub fn byte_size(self) -> u32 {
        match self {
            ComponentType::Float => 4,
            ComponentType::UnsignedByte => 1,
            ComponentType::UnsignedShort => 2,
        }
    }
}

/// Layout of one vertex attribute inside the currently bound array buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Distance in bytes between two consecutive vertices.
    pub stride: u32,
    /// Offset in bytes of the first component.
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    Less,
    LessEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampling {
    pub wrap: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            wrap: TextureWrap::ClampToEdge,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

/// The shape of a uniform as declared by the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Mat4,
    Vec3,
    Int,
    Float,
    /// Anything else; only raw byte size is known.
    Other(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4([[f32; 4]; 4]),
    Vec3([f32; 3]),
    Int(i32),
    Float(f32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
        }
    }

    /// Little-endian bytes in shader memory layout (column-major matrices).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Mat4(m) => bytemuck::cast_slice(m).to_vec(),
            UniformValue::Vec3(v) => bytemuck::cast_slice(v).to_vec(),
            UniformValue::Int(i) => i.to_le_bytes().to_vec(),
            UniformValue::Float(f) => f.to_le_bytes().to_vec(),
        }
    }
}

/// Where a named uniform lives inside a program's uniform block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub(crate) program: ProgramId,
    pub(crate) offset: u32,
    pub(crate) kind: UniformKind,
}

impl UniformLocation {
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn kind(&self) -> UniformKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
    pub max_texture_dimension: u32,
}

/// Tightly packed RGBA8 pixels, row 0 first.
#[derive(Clone, Copy, Debug)]
pub struct TexelData<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl TexelData<'_> {
    /// True when `rgba` holds exactly `width * height` pixels.
    pub fn is_well_sized(&self) -> bool {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            == Some(self.rgba.len())
    }
}

/// A stateful GPU context.
///
/// # Lifecycle
///
/// 1. Objects are created (`create_*`, `compile_shader`, `link_program`).
/// 2. They are bound (`use_program`, `bind_vertex_array`, `bind_texture`) and
///    configured (`buffer_data`, `vertex_attribute`, `tex_image_2d`, `set_uniform`).
/// 3. `draw_indexed` consumes whatever is bound; `finish_frame` presents.
/// 4. `delete_*` releases objects; `lose_context` invalidates the context.
///    After that every call is a no-op.
pub trait GraphicsApi {
    fn capabilities(&self) -> Capabilities;

    fn configure_depth(&mut self, enabled: bool, func: DepthFunc);
    fn set_viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, colour: wgpu::Color);
    fn resize_surface(&mut self, width: u32, height: u32);
    fn surface_size(&self) -> (u32, u32);

    /// Returns the compiler diagnostic on failure.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    fn delete_shader(&mut self, shader: ShaderId);
    /// Returns the linker diagnostic on failure.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Writes into the staging block of the program the location belongs to.
    fn set_uniform(&mut self, location: &UniformLocation, value: UniformValue);

    fn create_vertex_array(&mut self) -> VertexArrayId;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn create_buffer(&mut self) -> BufferId;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&mut self, buffer: BufferId);
    /// Enables `attribute` on the bound vertex array, sourcing the bound array buffer.
    fn vertex_attribute(&mut self, attribute: VertexAttribute);
    fn disable_vertex_attribute(&mut self, location: u32);

    fn create_texture(&mut self) -> TextureId;
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, texture: Option<TextureId>);
    fn tex_sampling(&mut self, sampling: Sampling);
    fn tex_image_2d(&mut self, data: TexelData<'_>, flip_y: bool);
    fn delete_texture(&mut self, texture: TextureId);

    fn draw_indexed(&mut self, index_count: u32);
    fn finish_frame(&mut self) -> Result<(), String>;

    fn lose_context(&mut self);
    fn is_context_lost(&self) -> bool;
}

/// Flips RGBA rows so the last row comes first.
pub(crate) fn flip_rows(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let row = width as usize * 4;
    let mut flipped = Vec::with_capacity(rgba.len());
    for y in (0..height as usize).rev() {
        flipped.extend_from_slice(&rgba[y * row..(y + 1) * row]);
    }
    flipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_rows_reverses_row_order() {
        let rgba = [1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
        let flipped = flip_rows(2, 2, &rgba);
        assert_eq!(flipped, vec![3, 3, 3, 3, 4, 4, 4, 4, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn texel_size_check_does_not_overflow() {
        let rgba = [0u8; 8];
        assert!(TexelData { width: 1, height: 2, rgba: &rgba }.is_well_sized());
        assert!(!TexelData { width: 2, height: 2, rgba: &rgba }.is_well_sized());
        assert!(!TexelData { width: u32::MAX, height: u32::MAX, rgba: &rgba }.is_well_sized());
    }

    #[test]
    fn matrix_uniform_is_column_major_bytes() {
        let mut m = [[0.0f32; 4]; 4];
        m[3][0] = 7.0;
        let bytes = UniformValue::Mat4(m).to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[48..52], &7.0f32.to_le_bytes());
    }
}
