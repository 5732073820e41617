//! The scenes shipped with the viewer.
//!
//! Each one is a thin [`Scene`] implementation: it names its assets and
//! animates transforms, the controller does everything else.

use crate::{flow::Scene, resources::shader::ShaderDescriptor};

pub mod blank;
pub mod cube;
pub mod gallery;
pub mod plane;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SceneKind {
    Blank,
    Plane,
    SpinningPlane,
    ColourCube,
    TexturedCube,
    Gallery,
}

impl SceneKind {
    pub fn build(self) -> Box<dyn Scene> {
        match self {
            SceneKind::Blank => Box::new(blank::BlankScene),
            SceneKind::Plane => Box::new(plane::PlaneScene::still()),
            SceneKind::SpinningPlane => Box::new(plane::PlaneScene::spinning()),
            SceneKind::ColourCube => Box::new(cube::CubeScene::coloured()),
            SceneKind::TexturedCube => Box::new(cube::CubeScene::textured()),
            SceneKind::Gallery => Box::new(gallery::GalleryScene::default()),
        }
    }
}

/// `shaders/<stem>.vert.wgsl` + `shaders/<stem>.frag.wgsl`, registered as `stem`.
pub(crate) fn wgsl_pair(stem: &str) -> ShaderDescriptor {
    ShaderDescriptor::new(
        stem,
        &format!("shaders/{stem}.vert.wgsl"),
        &format!("shaders/{stem}.frag.wgsl"),
    )
}
