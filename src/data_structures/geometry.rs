//! Mesh geometry generators.
//!
//! A [`Geometry`] produces the CPU-side data of a mesh: raw attribute streams,
//! an interleaved attribute buffer for a given scale and a `u16` index list.
//! [`MeshRegistry`](crate::resources::mesh::MeshRegistry) uploads whatever a
//! generator returns, so new shapes only need a new implementation of this trait.

use std::fmt::Debug;

pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
pub const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
pub const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
pub const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
pub const PURPLE: [f32; 3] = [1.0, 0.0, 1.0];

/// One float attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutAttribute {
    /// Shader input name the attribute feeds.
    pub name: &'static str,
    pub components: u32,
    /// Offset in floats from the start of the vertex.
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    /// Floats per vertex.
    pub stride: u32,
    pub attributes: Vec<LayoutAttribute>,
}

impl VertexLayout {
    pub fn stride_bytes(&self) -> u32 {
        self.stride * 4
    }
}

pub trait Geometry: Debug + Send + Sync {
    /// Interleaved attributes scaled by `scale`. Pure: equal inputs give equal output.
    fn attributes(&self, scale: f32) -> Vec<f32>;
    fn positions(&self, scale: f32) -> Vec<f32>;
    fn normals(&self) -> Vec<f32> {
        Vec::new()
    }
    fn texcoords(&self) -> Vec<f32> {
        Vec::new()
    }
    fn colours(&self) -> Vec<f32>;
    fn indices(&self) -> &[u16];
    fn vertex_count(&self) -> u32;
    fn index_count(&self) -> u32 {
        self.indices().len() as u32
    }
    fn layout(&self) -> VertexLayout;
}

/// Zips per-vertex streams into one interleaved buffer following `layout`.
pub(crate) fn interleave(layout: &VertexLayout, vertex_count: u32, streams: &[&[f32]]) -> Vec<f32> {
    let mut out = Vec::with_capacity((layout.stride * vertex_count) as usize);
    for v in 0..vertex_count as usize {
        for (attribute, stream) in layout.attributes.iter().zip(streams) {
            let n = attribute.components as usize;
            out.extend_from_slice(&stream[v * n..(v + 1) * n]);
        }
    }
    out
}
