//! WGSL reflection with naga.
//!
//! Programs follow a small binding convention:
//!
//! - `@group(0) @binding(0) var<uniform>` holds a struct whose members are the
//!   named uniforms (`projection`, `model`, ...).
//! - `@group(1) @binding(0)` is the sampled 2D texture, `@group(1) @binding(1)`
//!   its sampler.
//! - Vertex inputs are struct members (or arguments) with `@location`; their
//!   names are the attribute names.

use std::collections::BTreeMap;

use crate::gpu::{ShaderStage, UniformKind};

pub const UNIFORM_GROUP: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub offset: u32,
    pub size: u32,
    pub kind: UniformKind,
}

/// What a single compiled stage exposes.
#[derive(Clone, Debug)]
pub struct StageInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    /// Named inputs and their locations.
    pub inputs: BTreeMap<String, u32>,
    /// Locations written by the stage (vertex outputs).
    pub outputs: Vec<u32>,
    pub uniforms: BTreeMap<String, UniformField>,
    pub uniform_block_size: u32,
    pub samples_texture: bool,
}

/// The merged interface of a linked program.
#[derive(Clone, Debug)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub attributes: BTreeMap<String, u32>,
    pub uniforms: BTreeMap<String, UniformField>,
    pub uniform_block_size: u32,
    pub samples_texture: bool,
}

/// Parses and validates `source`, then extracts the stage interface.
pub fn reflect_stage(stage: ShaderStage, source: &str) -> Result<StageInterface, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| format!("no @{stage} entry point in module"))?;

    let mut inputs = BTreeMap::new();
    for argument in &entry.function.arguments {
        collect_locations(&module, argument.name.as_deref(), argument.ty, argument.binding.as_ref(), &mut inputs);
    }
    let mut outputs = BTreeMap::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, Some("out"), result.ty, result.binding.as_ref(), &mut outputs);
    }

    let mut uniforms = BTreeMap::new();
    let mut uniform_block_size = 0;
    let mut samples_texture = false;
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        match (&var.space, &module.types[var.ty].inner) {
            (naga::AddressSpace::Uniform, naga::TypeInner::Struct { members, span })
                if binding.group == UNIFORM_GROUP && binding.binding == 0 =>
            {
                uniform_block_size = *span;
                for member in members {
                    let Some(name) = &member.name else { continue };
                    let inner = &module.types[member.ty].inner;
                    uniforms.insert(
                        name.clone(),
                        UniformField {
                            offset: member.offset,
                            size: inner.size(module.to_ctx()),
                            kind: uniform_kind(inner, &module),
                        },
                    );
                }
            }
            (_, naga::TypeInner::Image { .. }) if binding.group == TEXTURE_GROUP => {
                samples_texture = true;
            }
            _ => {}
        }
    }

    Ok(StageInterface {
        stage,
        entry_point: entry.name.clone(),
        inputs,
        outputs: outputs.into_values().collect(),
        uniforms,
        uniform_block_size,
        samples_texture,
    })
}

fn collect_locations(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    into: &mut BTreeMap<String, u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            let name = name.map(str::to_owned).unwrap_or_else(|| format!("location{location}"));
            into.insert(name, *location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.name.as_deref(), member.ty, member.binding.as_ref(), into);
                }
            }
        }
    }
}

fn uniform_kind(inner: &naga::TypeInner, module: &naga::Module) -> UniformKind {
    match inner {
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            ..
        } => UniformKind::Mat4,
        naga::TypeInner::Vector {
            size: naga::VectorSize::Tri,
            scalar,
        } if scalar.kind == naga::ScalarKind::Float => UniformKind::Vec3,
        naga::TypeInner::Scalar(scalar) => match scalar.kind {
            naga::ScalarKind::Float => UniformKind::Float,
            naga::ScalarKind::Sint => UniformKind::Int,
            _ => UniformKind::Other(inner.size(module.to_ctx())),
        },
        other => UniformKind::Other(other.size(module.to_ctx())),
    }
}

/// Checks that two stages fit together and merges their interfaces.
pub fn link(vertex: &StageInterface, fragment: &StageInterface) -> Result<ProgramInterface, String> {
    if vertex.stage != ShaderStage::Vertex {
        return Err("first attachment is not a vertex stage".to_owned());
    }
    if fragment.stage != ShaderStage::Fragment {
        return Err("second attachment is not a fragment stage".to_owned());
    }
    for (name, location) in &fragment.inputs {
        if !vertex.outputs.contains(location) {
            return Err(format!(
                "fragment input '{name}' at location {location} is not written by the vertex stage"
            ));
        }
    }
    let mut uniforms = vertex.uniforms.clone();
    for (name, field) in &fragment.uniforms {
        match uniforms.get(name) {
            Some(existing) if existing != field => {
                return Err(format!("uniform '{name}' is declared differently in both stages"));
            }
            Some(_) => {}
            None => {
                uniforms.insert(name.clone(), field.clone());
            }
        }
    }
    Ok(ProgramInterface {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        attributes: vertex.inputs.clone(),
        uniforms,
        uniform_block_size: vertex.uniform_block_size.max(fragment.uniform_block_size),
        samples_texture: vertex.samples_texture || fragment.samples_texture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    tint: vec3<f32>,
    frame: i32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) a_position: vec3<f32>,
    @location(3) a_color: vec3<f32>,
}
struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = u.projection * u.model * vec4<f32>(in.a_position, 1.0);
    out.color = in.a_color * u.tint;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

    #[test]
    fn reflects_inputs_and_uniform_block() {
        let vs = reflect_stage(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(vs.entry_point, "vs_main");
        assert_eq!(vs.inputs.get("a_position"), Some(&0));
        assert_eq!(vs.inputs.get("a_color"), Some(&3));
        assert_eq!(vs.outputs, vec![0]);
        let model = &vs.uniforms["model"];
        assert_eq!((model.offset, model.size, model.kind), (64, 64, UniformKind::Mat4));
        assert_eq!(vs.uniforms["tint"].kind, UniformKind::Vec3);
        assert_eq!(vs.uniforms["frame"].kind, UniformKind::Int);
        assert!(!vs.samples_texture);
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let err = reflect_stage(ShaderStage::Vertex, "fn broken( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let err = reflect_stage(ShaderStage::Vertex, FS).unwrap_err();
        assert!(err.contains("vertex"));
    }

    #[test]
    fn link_rejects_unwritten_fragment_input() {
        let vs = reflect_stage(ShaderStage::Vertex, VS).unwrap();
        let fs_src = "@fragment fn fs_main(@location(4) uv: vec2<f32>) -> @location(0) vec4<f32> { return vec4<f32>(uv, 0.0, 1.0); }";
        let fs = reflect_stage(ShaderStage::Fragment, fs_src).unwrap();
        assert!(link(&vs, &fs).is_err());
    }

    #[test]
    fn link_merges_interfaces() {
        let vs = reflect_stage(ShaderStage::Vertex, VS).unwrap();
        let fs = reflect_stage(ShaderStage::Fragment, FS).unwrap();
        let program = link(&vs, &fs).unwrap();
        assert_eq!(program.attributes.len(), 2);
        assert!(program.uniforms.contains_key("projection"));
        assert!(program.uniform_block_size >= 144);
    }
}
