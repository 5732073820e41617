//! Per-frame draw dispatch.
//!
//! A [`Frame`] is handed to [`Scene::draw_frame`](crate::flow::Scene::draw_frame)
//! once per frame. The scene decides the transform of each draw; the frame
//! resolves the names of a [`DrawInstruction`] against the registries, uploads
//! the projection, model and (for lit draws) normal matrices and issues one
//! indexed draw.
//!
//! Draws are issued in the order the scene asks for them. Nothing is sorted or
//! batched.

use cgmath::Matrix4;

use crate::{
    data_structures::{
        draw_plan::{DrawInstruction, DrawPlan},
        transform::Transform,
    },
    error::{ContractViolation, FrameError},
    gpu::GraphicsApi,
    resources::{mesh::MeshRegistry, shader::ShaderRegistry, texture::TextureRegistry},
};

pub const PROJECTION_UNIFORM: &str = "projection";
pub const MODEL_UNIFORM: &str = "model";
pub const NORMAL_UNIFORM: &str = "normal";

pub struct Frame<'a> {
    api: &'a mut dyn GraphicsApi,
    shaders: &'a ShaderRegistry,
    meshes: &'a MeshRegistry,
    textures: &'a TextureRegistry,
    plan: &'a DrawPlan,
    projection: Matrix4<f32>,
    issued: usize,
}

impl<'a> Frame<'a> {
    pub fn new(
        api: &'a mut dyn GraphicsApi,
        shaders: &'a ShaderRegistry,
        meshes: &'a MeshRegistry,
        textures: &'a TextureRegistry,
        plan: &'a DrawPlan,
        projection: Matrix4<f32>,
    ) -> Self {
        Self {
            api,
            shaders,
            meshes,
            textures,
            plan,
            projection,
            issued: 0,
        }
    }

    pub fn plan(&self) -> &'a DrawPlan {
        self.plan
    }

    /// Projection for the current surface aspect.
    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    /// Number of draw calls issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Draws the instruction with id `id`.
    pub fn draw(&mut self, id: &str, transform: &Transform) -> Result<(), FrameError> {
        let plan = self.plan;
        let instruction = plan.get(id).ok_or_else(|| ContractViolation::UnknownEntry {
            kind: "draw",
            name: id.to_owned(),
        })?;
        self.draw_instruction(instruction, transform)
    }

    /// Draws every instruction in declaration order, asking `transform_for` for
    /// each transform.
    pub fn draw_all(
        &mut self,
        mut transform_for: impl FnMut(&DrawInstruction) -> Transform,
    ) -> Result<(), FrameError> {
        let plan = self.plan;
        for instruction in plan {
            let transform = transform_for(instruction);
            self.draw_instruction(instruction, &transform)?;
        }
        Ok(())
    }

    pub fn draw_instruction(
        &mut self,
        instruction: &DrawInstruction,
        transform: &Transform,
    ) -> Result<(), FrameError> {
        let shader = self
            .shaders
            .get(&instruction.shader)
            .ok_or_else(|| ContractViolation::UnknownEntry {
                kind: "shader",
                name: instruction.shader.clone(),
            })?;
        let program = shader.program().ok_or_else(|| ContractViolation::MissingProgram {
            operation: "draw",
            name: instruction.shader.clone(),
        })?;
        let mesh = self
            .meshes
            .get(&instruction.mesh)
            .ok_or_else(|| ContractViolation::UnknownEntry {
                kind: "mesh",
                name: instruction.mesh.clone(),
            })?;
        let vertex_array = mesh
            .vertex_array()
            .ok_or_else(|| ContractViolation::MissingVertexArray(instruction.mesh.clone()))?;

        self.api.use_program(Some(program));
        self.api.bind_vertex_array(Some(vertex_array));

        ShaderRegistry::set_matrix4(self.api, Some(program), PROJECTION_UNIFORM, &self.projection)?;
        ShaderRegistry::set_matrix4(self.api, Some(program), MODEL_UNIFORM, &transform.model)?;
        if transform.lit {
            ShaderRegistry::set_matrix4(self.api, Some(program), NORMAL_UNIFORM, &transform.normal_matrix())?;
        }
        if let Some(texture) = &instruction.texture {
            self.textures.update_gpu_texture(self.api, texture)?;
        }

        self.api.draw_indexed(mesh.index_count());
        self.issued += 1;
        Ok(())
    }
}
