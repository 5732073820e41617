//! Named meshes and their GPU buffers.

use std::{collections::HashMap, sync::Arc};

use crate::{
    data_structures::geometry::Geometry,
    error::ContractViolation,
    gpu::{BufferId, BufferTarget, ComponentType, GraphicsApi, ProgramId, VertexArrayId},
    resources::shader::ShaderRegistry,
};

#[derive(Clone, Debug)]
pub struct MeshDescriptor {
    pub name: String,
    pub geometry: Arc<dyn Geometry>,
    pub scale: f32,
}

impl MeshDescriptor {
    pub fn new(name: &str, geometry: impl Geometry + 'static, scale: f32) -> Self {
        Self {
            name: name.to_owned(),
            geometry: Arc::new(geometry),
            scale,
        }
    }
}

#[derive(Debug)]
pub struct MeshEntry {
    pub name: String,
    pub scale: f32,
    geometry: Option<Arc<dyn Geometry>>,
    vertex_array: Option<VertexArrayId>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,
}

impl MeshEntry {
    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        self.vertex_array
    }

    pub fn array_buffer(&self) -> Option<BufferId> {
        self.array_buffer
    }

    pub fn element_buffer(&self) -> Option<BufferId> {
        self.element_buffer
    }

    pub fn geometry(&self) -> Option<&Arc<dyn Geometry>> {
        self.geometry.as_ref()
    }

    pub fn index_count(&self) -> u32 {
        self.geometry.as_ref().map_or(0, |g| g.index_count())
    }

    pub fn is_materialized(&self) -> bool {
        self.vertex_array.is_some()
    }
}

#[derive(Debug, Default)]
pub struct MeshRegistry {
    meshes: HashMap<String, MeshEntry>,
    order: Vec<String>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers entries without touching the GPU.
    pub fn declare(&mut self, entries: Vec<MeshDescriptor>) {
        for entry in entries {
            if self.meshes.contains_key(&entry.name) {
                log::warn!("Mesh '{}' declared twice; keeping the last one", entry.name);
            } else {
                self.order.push(entry.name.clone());
            }
            self.meshes.insert(
                entry.name.clone(),
                MeshEntry {
                    name: entry.name,
                    scale: entry.scale,
                    geometry: Some(entry.geometry),
                    vertex_array: None,
                    array_buffer: None,
                    element_buffer: None,
                },
            );
        }
    }

    /// Creates and fills the vertex array, array buffer and element buffer of
    /// every declared mesh that has none yet.
    pub fn materialize_buffers(&mut self, api: &mut dyn GraphicsApi) {
        for name in &self.order {
            let Some(entry) = self.meshes.get_mut(name) else {
                continue;
            };
            if entry.is_materialized() {
                continue;
            }
            let Some(geometry) = entry.geometry.clone() else {
                continue;
            };
            let attributes = geometry.attributes(entry.scale);

            let vertex_array = api.create_vertex_array();
            api.bind_vertex_array(Some(vertex_array));
            let array_buffer = api.create_buffer();
            api.bind_buffer(BufferTarget::Array, Some(array_buffer));
            api.buffer_data(BufferTarget::Array, bytemuck::cast_slice(&attributes));
            let element_buffer = api.create_buffer();
            api.bind_buffer(BufferTarget::ElementArray, Some(element_buffer));
            api.buffer_data(BufferTarget::ElementArray, bytemuck::cast_slice(geometry.indices()));
            api.bind_vertex_array(None);

            log::debug!(
                "Mesh '{name}': {} vertices, {} indices",
                geometry.vertex_count(),
                geometry.index_count()
            );
            entry.vertex_array = Some(vertex_array);
            entry.array_buffer = Some(array_buffer);
            entry.element_buffer = Some(element_buffer);
        }
    }

    /// Points every attribute of the mesh layout that `program` declares at the
    /// mesh's array buffer. Returns how many attributes were bound.
    pub fn bind_layout(
        &self,
        api: &mut dyn GraphicsApi,
        mesh: &str,
        program: Option<ProgramId>,
    ) -> Result<usize, ContractViolation> {
        let entry = self.meshes.get(mesh).ok_or_else(|| ContractViolation::UnknownEntry {
            kind: "mesh",
            name: mesh.to_owned(),
        })?;
        let (Some(vertex_array), Some(geometry)) = (entry.vertex_array, &entry.geometry) else {
            return Err(ContractViolation::MissingVertexArray(mesh.to_owned()));
        };
        let layout = geometry.layout();
        api.use_program(program);
        api.bind_vertex_array(Some(vertex_array));
        api.bind_buffer(BufferTarget::Array, entry.array_buffer);
        let mut bound = 0;
        for attribute in &layout.attributes {
            let found = ShaderRegistry::bind_vertex_attribute(
                api,
                program,
                attribute.name,
                attribute.components,
                ComponentType::Float,
                false,
                layout.stride_bytes(),
                attribute.offset * 4,
            );
            match found {
                Ok(true) => bound += 1,
                Ok(false) => log::debug!("Program ignores attribute '{}' of mesh '{mesh}'", attribute.name),
                Err(violation) => {
                    api.bind_vertex_array(None);
                    return Err(violation);
                }
            }
        }
        api.bind_vertex_array(None);
        Ok(bound)
    }

    pub fn get(&self, name: &str) -> Option<&MeshEntry> {
        self.meshes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Deletes every vertex array and buffer and forgets all entries.
    pub fn release(&mut self, api: &mut dyn GraphicsApi) {
        for name in self.order.drain(..) {
            let Some(mut entry) = self.meshes.remove(&name) else {
                continue;
            };
            if let Some(vertex_array) = entry.vertex_array.take() {
                api.delete_vertex_array(vertex_array);
            }
            for buffer in [entry.array_buffer.take(), entry.element_buffer.take()]
                .into_iter()
                .flatten()
            {
                api.delete_buffer(buffer);
            }
            entry.geometry = None;
        }
        self.meshes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{cube::Cube, plane::Plane},
        gpu::HeadlessApi,
    };

    #[test]
    fn materialized_buffers_hold_geometry() {
        let mut api = HeadlessApi::new(8, 8);
        let mut meshes = MeshRegistry::new();
        meshes.declare(vec![
            MeshDescriptor::new("cube", Cube, 2.0),
            MeshDescriptor::new("plane", Plane, 1.0),
        ]);
        assert!(!meshes.get("cube").unwrap().is_materialized());
        meshes.materialize_buffers(&mut api);

        let cube = meshes.get("cube").unwrap();
        assert_eq!(cube.index_count(), 36);
        let vertices = api.buffer_contents(cube.array_buffer().unwrap()).unwrap();
        assert_eq!(vertices.len(), 24 * 11 * 4);
        let indices = api.buffer_contents(cube.element_buffer().unwrap()).unwrap();
        assert_eq!(indices.len(), 36 * 2);
        assert!(api.errors().is_empty());
    }

    #[test]
    fn release_deletes_everything_once() {
        let mut api = HeadlessApi::new(8, 8);
        let mut meshes = MeshRegistry::new();
        meshes.declare(vec![MeshDescriptor::new("plane", Plane, 1.0)]);
        meshes.materialize_buffers(&mut api);
        meshes.release(&mut api);
        meshes.release(&mut api);
        assert!(meshes.is_empty());
        assert_eq!(api.live_objects().buffers, 0);
        assert_eq!(api.live_objects().vertex_arrays, 0);
        assert!(api.errors().is_empty());
    }

    #[test]
    fn binding_without_buffers_is_a_contract_violation() {
        let mut api = HeadlessApi::new(8, 8);
        let mut meshes = MeshRegistry::new();
        meshes.declare(vec![MeshDescriptor::new("plane", Plane, 1.0)]);
        assert!(matches!(
            meshes.bind_layout(&mut api, "plane", None),
            Err(ContractViolation::MissingVertexArray(_))
        ));
    }
}
