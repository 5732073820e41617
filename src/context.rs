//! The GPU context a scene renders into.
//!
//! [`GraphicsContext`] wraps one [`GraphicsApi`] backend for the lifetime of a
//! single [`SceneController`](crate::flow::SceneController). It configures the
//! context once on creation, tracks the drawable surface size and knows how to
//! leave the context in a clean state before it is disposed of.

use crate::{
    camera::SurfaceSize,
    error::FrameError,
    gpu::{BufferTarget, Capabilities, DepthFunc, GraphicsApi},
};

#[derive(Debug)]
pub struct GraphicsContext<A: GraphicsApi> {
    api: A,
    capabilities: Capabilities,
    surface: SurfaceSize,
}

impl<A: GraphicsApi> GraphicsContext<A> {
    /// Takes ownership of `api` and enables depth testing (nearer wins).
    pub fn new(mut api: A) -> Self {
        let capabilities = api.capabilities();
        log::info!(
            "GPU context: {} texture units, {} vertex attributes, textures up to {}px",
            capabilities.max_texture_units,
            capabilities.max_vertex_attributes,
            capabilities.max_texture_dimension
        );
        api.configure_depth(true, DepthFunc::Less);
        let (width, height) = api.surface_size();
        Self {
            api,
            capabilities,
            surface: SurfaceSize::new(width, height),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn resize_surface(&mut self, size: SurfaceSize) {
        if size == self.surface {
            return;
        }
        log::debug!("Surface resized to {}x{}", size.width, size.height);
        self.surface = size;
        self.api.resize_surface(size.width, size.height);
    }

    /// Applies the surface as viewport and clears it.
    pub fn begin_frame(&mut self, clear_colour: wgpu::Color) {
        self.api.set_viewport(self.surface.width, self.surface.height);
        self.api.clear(clear_colour);
    }

    pub fn present(&mut self) -> Result<(), FrameError> {
        self.api.finish_frame().map_err(FrameError::Present)
    }

    /// Unbinds every texture unit, vertex attribute, buffer and program.
    pub fn unbind_all(&mut self) {
        for unit in 0..self.capabilities.max_texture_units {
            self.api.active_texture(unit);
            self.api.bind_texture(None);
        }
        self.api.active_texture(0);
        for location in 0..self.capabilities.max_vertex_attributes {
            self.api.disable_vertex_attribute(location);
        }
        self.api.bind_vertex_array(None);
        self.api.bind_buffer(BufferTarget::Array, None);
        self.api.use_program(None);
    }

    /// Explicitly loses the context. Every later call is a no-op.
    pub fn invalidate(&mut self) {
        if !self.api.is_context_lost() {
            self.api.lose_context();
        }
    }

    pub fn shrink_surface(&mut self) {
        self.resize_surface(SurfaceSize::MINIMAL);
    }

    pub fn into_api(self) -> A {
        self.api
    }
}
