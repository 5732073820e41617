//! Render pipelines for linked programs.
//!
//! A program alone does not determine a wgpu pipeline: the vertex buffer layout
//! comes from whichever vertex array is bound at draw time. Pipelines are
//! therefore built lazily per [`VertexLayoutKey`] and cached on the program.

use std::num::NonZeroU64;

use crate::gpu::{
    ComponentType, DepthFunc, VertexAttribute,
    reflect::ProgramInterface,
    texture::{DepthTexture, sampled_texture_layout},
};

/// One vertex buffer slot: its stride and the attributes it feeds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotLayout {
    pub stride: u32,
    pub attributes: Vec<(u32, wgpu::VertexFormat, u32)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexLayoutKey {
    pub slots: Vec<SlotLayout>,
    pub depth: Option<DepthFunc>,
}

pub struct ProgramLayouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub texture: Option<wgpu::BindGroupLayout>,
    pub pipeline: wgpu::PipelineLayout,
}

pub fn vertex_format(attribute: &VertexAttribute) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    let format = match (attribute.component_type, attribute.components, attribute.normalized) {
        (ComponentType::Float, 1, _) => F::Float32,
        (ComponentType::Float, 2, _) => F::Float32x2,
        (ComponentType::Float, 3, _) => F::Float32x3,
        (ComponentType::Float, 4, _) => F::Float32x4,
        (ComponentType::UnsignedByte, 4, true) => F::Unorm8x4,
        (ComponentType::UnsignedByte, 4, false) => F::Uint8x4,
        (ComponentType::UnsignedShort, 2, true) => F::Unorm16x2,
        (ComponentType::UnsignedShort, 4, true) => F::Unorm16x4,
        (ComponentType::UnsignedShort, 2, false) => F::Uint16x2,
        (ComponentType::UnsignedShort, 4, false) => F::Uint16x4,
        _ => return None,
    };
    Some(format)
}

/// Group 0 holds the program's uniform block behind a dynamic offset.
pub fn uniform_layout(device: &wgpu::Device, block_size: u32) -> wgpu::BindGroupLayout {
    let entries = match NonZeroU64::new(block_size as u64) {
        Some(size) => vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: Some(size),
            },
            count: None,
        }],
        None => Vec::new(),
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("program_uniform_bind_group_layout"),
    })
}

pub fn program_layouts(device: &wgpu::Device, interface: &ProgramInterface) -> ProgramLayouts {
    let uniforms = uniform_layout(device, interface.uniform_block_size);
    let texture = interface.samples_texture.then(|| sampled_texture_layout(device));
    let pipeline = {
        let mut groups = vec![&uniforms];
        if let Some(texture) = &texture {
            groups.push(texture);
        }
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &groups,
            push_constant_ranges: &[],
        })
    };
    ProgramLayouts {
        uniforms,
        texture,
        pipeline,
    }
}

pub struct PipelineStages<'a> {
    pub vertex: &'a wgpu::ShaderModule,
    pub fragment: &'a wgpu::ShaderModule,
    pub interface: &'a ProgramInterface,
}

pub fn mk_program_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    stages: PipelineStages<'_>,
    color_format: wgpu::TextureFormat,
    key: &VertexLayoutKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<Vec<wgpu::VertexAttribute>> = key
        .slots
        .iter()
        .map(|slot| {
            slot.attributes
                .iter()
                .map(|&(shader_location, format, offset)| wgpu::VertexAttribute {
                    format,
                    offset: offset as wgpu::BufferAddress,
                    shader_location,
                })
                .collect()
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout> = key
        .slots
        .iter()
        .zip(&attributes)
        .map(|(slot, attributes)| wgpu::VertexBufferLayout {
            array_stride: slot.stride as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();
    let (depth_write_enabled, depth_compare) = match key.depth {
        Some(DepthFunc::Less) => (true, wgpu::CompareFunction::Less),
        Some(DepthFunc::LessEqual) => (true, wgpu::CompareFunction::LessEqual),
        Some(DepthFunc::Always) => (true, wgpu::CompareFunction::Always),
        None => (false, wgpu::CompareFunction::Always),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Program Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: stages.vertex,
            entry_point: Some(&stages.interface.vertex_entry),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: stages.fragment,
            entry_point: Some(&stages.interface.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            // Scenes are authored without face culling.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthTexture::FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_attributes_map_to_float_formats() {
        let attribute = VertexAttribute {
            location: 0,
            components: 3,
            component_type: ComponentType::Float,
            normalized: false,
            stride: 44,
            offset: 0,
        };
        assert_eq!(vertex_format(&attribute), Some(wgpu::VertexFormat::Float32x3));
        let odd = VertexAttribute {
            components: 5,
            ..attribute
        };
        assert_eq!(vertex_format(&odd), None);
    }

    #[test]
    fn layout_keys_differ_by_depth_function() {
        let slot = SlotLayout {
            stride: 20,
            attributes: vec![(0, wgpu::VertexFormat::Float32x2, 0)],
        };
        let key = |depth| VertexLayoutKey {
            slots: vec![slot.clone()],
            depth,
        };
        let keys: std::collections::HashSet<_> =
            [key(Some(DepthFunc::Less)), key(Some(DepthFunc::Less)), key(None)].into_iter().collect();
        assert_eq!(keys.len(), 2);
    }
}
