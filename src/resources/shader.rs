//! Named shader programs.
//!
//! Source fetches run concurrently as tokio tasks and report back over a
//! channel. Compilation and linking need the GPU context and therefore happen
//! when the owner drains that channel ([`ShaderRegistry::poll_completions`] or
//! [`ShaderRegistry::next_completion`]). An entry is published into the
//! name-keyed map only after it linked, so [`ShaderRegistry::is_all_ready`]
//! never sees a partially built program.

use std::{collections::HashMap, sync::Arc};

use cgmath::Matrix4;
use futures::{StreamExt, channel::mpsc};
use tokio::runtime::Handle;

use crate::{
    error::{ContractViolation, ShaderError},
    gpu::{ComponentType, GraphicsApi, ProgramId, ShaderStage, UniformValue, VertexAttribute},
    resources::{AssetSource, LoadGate},
};

/// What a scene declares for one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderDescriptor {
    pub fn new(name: &str, vertex: &str, fragment: &str) -> Self {
        Self {
            name: name.to_owned(),
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct ShaderEntry {
    pub name: String,
    pub vertex_locator: String,
    pub fragment_locator: String,
    program: Option<ProgramId>,
    ready: bool,
}

impl ShaderEntry {
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Sources fetched for one descriptor.
struct Completion {
    descriptor: ShaderDescriptor,
    sources: Result<(String, String), ShaderError>,
}

#[derive(Default)]
pub struct ShaderRegistry {
    shaders: HashMap<String, ShaderEntry>,
    pending: HashMap<String, ShaderDescriptor>,
    completions: Option<mpsc::UnboundedReceiver<Completion>>,
    sender: Option<mpsc::UnboundedSender<Completion>>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts fetching the sources of every entry. Returns immediately.
    ///
    /// When a name repeats, its last descriptor is the one loaded. Results are
    /// only sent while `gate` is open.
    pub fn request_load(
        &mut self,
        entries: Vec<ShaderDescriptor>,
        assets: Arc<dyn AssetSource>,
        runtime: &Handle,
        gate: &LoadGate,
    ) {
        let sender = match &self.sender {
            Some(sender) => sender.clone(),
            None => {
                let (tx, rx) = mpsc::unbounded();
                self.completions = Some(rx);
                self.sender = Some(tx.clone());
                tx
            }
        };
        let mut latest: Vec<ShaderDescriptor> = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(index) = latest.iter().position(|e| e.name == entry.name) {
                log::warn!("Shader '{}' declared twice, loading the later sources", entry.name);
                latest.remove(index);
            }
            latest.push(entry);
        }
        for entry in latest {
            log::debug!("Requesting shader '{}'", entry.name);
            let vertex = assets.load_string(&entry.vertex);
            let fragment = assets.load_string(&entry.fragment);
            let descriptor = entry.clone();
            let sender = sender.clone();
            let gate = gate.clone();
            self.pending.insert(entry.name.clone(), entry);
            runtime.spawn(async move {
                let sources = futures::future::try_join(vertex, fragment)
                    .await
                    .map_err(|source| ShaderError::Fetch {
                        name: descriptor.name.clone(),
                        source,
                    });
                if gate.is_open() {
                    let _ = sender.unbounded_send(Completion { descriptor, sources });
                }
            });
        }
    }

    /// Compiles and publishes every completion that already arrived.
    ///
    /// Returns how many programs were published.
    pub fn poll_completions(&mut self, api: &mut dyn GraphicsApi) -> Result<usize, ShaderError> {
        let mut published = 0;
        loop {
            let next = match self.completions.as_mut() {
                Some(rx) => rx.try_recv(),
                None => return Ok(published),
            };
            match next {
                Ok(completion) => published += usize::from(self.finish(api, completion)?),
                // Empty right now, or closed.
                Err(_) => return Ok(published),
            }
        }
    }

    /// Waits for the next completion and publishes it.
    ///
    /// Returns `Ok(false)` when nothing is pending.
    pub async fn next_completion(&mut self, api: &mut dyn GraphicsApi) -> Result<bool, ShaderError> {
        if self.pending.is_empty() {
            return Ok(false);
        }
        let Some(rx) = self.completions.as_mut() else {
            return Ok(false);
        };
        let next = rx.next().await;
        match next {
            Some(completion) => {
                self.finish(api, completion)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns whether a program was published. Sources of released or
    /// superseded descriptors are dropped.
    fn finish(&mut self, api: &mut dyn GraphicsApi, completion: Completion) -> Result<bool, ShaderError> {
        let Completion { descriptor, sources } = completion;
        if self.pending.get(&descriptor.name) != Some(&descriptor) {
            log::debug!("Dropping stale sources of shader '{}'", descriptor.name);
            return Ok(false);
        }
        self.pending.remove(&descriptor.name);
        let (vertex, fragment) = sources?;
        let program = Self::compile(api, &descriptor.name, &vertex, &fragment)?;
        log::debug!("Shader '{}' linked", descriptor.name);
        let replaced = self.shaders.insert(
            descriptor.name.clone(),
            ShaderEntry {
                name: descriptor.name,
                vertex_locator: descriptor.vertex,
                fragment_locator: descriptor.fragment,
                program: Some(program),
                ready: true,
            },
        );
        if let Some(program) = replaced.and_then(|entry| entry.program) {
            api.delete_program(program);
        }
        Ok(true)
    }

    /// Compiles both stages and links them. Stage objects are freed either way.
    pub fn compile(
        api: &mut dyn GraphicsApi,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        let compile_error = |stage, diagnostic| ShaderError::Compile {
            name: name.to_owned(),
            stage,
            diagnostic,
        };
        let vertex = api
            .compile_shader(ShaderStage::Vertex, vertex_source)
            .map_err(|d| compile_error(ShaderStage::Vertex, d))?;
        let fragment = match api.compile_shader(ShaderStage::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(diagnostic) => {
                api.delete_shader(vertex);
                return Err(compile_error(ShaderStage::Fragment, diagnostic));
            }
        };
        let linked = api.link_program(vertex, fragment);
        api.delete_shader(vertex);
        api.delete_shader(fragment);
        linked.map_err(|diagnostic| ShaderError::Link {
            name: name.to_owned(),
            diagnostic,
        })
    }

    /// True iff exactly `expected` programs have been published.
    pub fn is_all_ready(&self, expected: usize) -> bool {
        self.shaders.len() == expected
    }

    pub fn get(&self, name: &str) -> Option<&ShaderEntry> {
        self.shaders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Names still waiting for their sources.
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pending.keys().cloned().collect();
        names.sort();
        names
    }

    /// Configures `attribute_name` of `program` on the bound vertex array and array buffer.
    ///
    /// Returns `Ok(false)` when the program has no such attribute.
    #[allow(clippy::too_many_arguments)]
    pub fn bind_vertex_attribute(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        attribute_name: &str,
        components: u32,
        component_type: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) -> Result<bool, ContractViolation> {
        let program = program.ok_or_else(|| ContractViolation::MissingProgram {
            operation: "bind_vertex_attribute",
            name: attribute_name.to_owned(),
        })?;
        let Some(location) = api.attribute_location(program, attribute_name) else {
            return Ok(false);
        };
        api.vertex_attribute(VertexAttribute {
            location,
            components,
            component_type,
            normalized,
            stride,
            offset,
        });
        Ok(true)
    }

    fn set_uniform(
        api: &mut dyn GraphicsApi,
        operation: &'static str,
        program: Option<ProgramId>,
        name: &str,
        value: UniformValue,
    ) -> Result<(), ContractViolation> {
        let program = program.ok_or_else(|| ContractViolation::MissingProgram {
            operation,
            name: name.to_owned(),
        })?;
        match api.uniform_location(program, name) {
            Some(location) => api.set_uniform(&location, value),
            None => log::trace!("{operation}: program has no uniform '{name}'"),
        }
        Ok(())
    }

    pub fn set_matrix4(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        name: &str,
        value: &Matrix4<f32>,
    ) -> Result<(), ContractViolation> {
        Self::set_uniform(api, "set_matrix4", program, name, UniformValue::Mat4((*value).into()))
    }

    pub fn set_vector3(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        name: &str,
        value: [f32; 3],
    ) -> Result<(), ContractViolation> {
        Self::set_uniform(api, "set_vector3", program, name, UniformValue::Vec3(value))
    }

    pub fn set_int(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        name: &str,
        value: i32,
    ) -> Result<(), ContractViolation> {
        Self::set_uniform(api, "set_int", program, name, UniformValue::Int(value))
    }

    pub fn set_float(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        name: &str,
        value: f32,
    ) -> Result<(), ContractViolation> {
        Self::set_uniform(api, "set_float", program, name, UniformValue::Float(value))
    }

    /// Booleans are stored as `f32` 0.0 / 1.0; WGSL uniforms cannot hold `bool`.
    pub fn set_bool(
        api: &mut dyn GraphicsApi,
        program: Option<ProgramId>,
        name: &str,
        value: bool,
    ) -> Result<(), ContractViolation> {
        let value = if value { 1.0 } else { 0.0 };
        Self::set_uniform(api, "set_bool", program, name, UniformValue::Float(value))
    }

    /// Frees every published program and forgets pending loads.
    pub fn release_all(&mut self, api: &mut dyn GraphicsApi) {
        for (name, entry) in self.shaders.drain() {
            if let Some(program) = entry.program {
                log::debug!("Deleting program of shader '{name}'");
                api.delete_program(program);
            }
        }
        self.pending.clear();
        self.completions = None;
        self.sender = None;
    }
}
