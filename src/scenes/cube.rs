use instant::Duration;

use crate::{
    data_structures::{cube::Cube, draw_plan::DrawInstruction, transform::Transform},
    error::FrameError,
    flow::Scene,
    render::Frame,
    resources::{mesh::MeshDescriptor, shader::ShaderDescriptor, texture::TextureDescriptor},
    scenes::wgsl_pair,
};

/// A tumbling cube, either vertex-coloured or lit and textured.
#[derive(Debug)]
pub struct CubeScene {
    textured: bool,
    angle: f32,
}

impl CubeScene {
    pub fn coloured() -> Self {
        Self {
            textured: false,
            angle: 0.0,
        }
    }

    pub fn textured() -> Self {
        Self {
            textured: true,
            angle: 0.0,
        }
    }

    fn shader(&self) -> &'static str {
        if self.textured { "lit" } else { "colour" }
    }
}

/// The rotation all cube scenes share, for angle `a`.
pub(crate) fn tumble(position: [f32; 3], a: f32) -> Transform {
    Transform::at(position)
        .rotate_z(a)
        .rotate_y(a * 0.7)
        .rotate_x(a * 0.3)
}

impl Scene for CubeScene {
    fn title(&self) -> &str {
        if self.textured { "Textured cube" } else { "Colour cube" }
    }

    fn declare_shaders(&self) -> Vec<ShaderDescriptor> {
        vec![wgsl_pair(self.shader())]
    }

    fn declare_meshes(&self) -> Vec<MeshDescriptor> {
        vec![MeshDescriptor::new("cube", Cube, 2.0)]
    }

    fn declare_textures(&self) -> Vec<TextureDescriptor> {
        if self.textured {
            vec![TextureDescriptor::image("crate", "textures/crate.png")]
        } else {
            Vec::new()
        }
    }

    fn declare_draw_plan(&self) -> Vec<DrawInstruction> {
        let texture = if self.textured { "crate" } else { "" };
        vec![DrawInstruction::new("cube", "cube", self.shader(), texture)]
    }

    fn draw_frame(&mut self, frame: &mut Frame<'_>, dt: Duration) -> Result<(), FrameError> {
        self.angle += dt.as_secs_f32();
        let mut transform = tumble([0.0, 0.0, -5.0], self.angle);
        if self.textured {
            transform = transform.lit();
        }
        frame.draw("cube", &transform)
    }
}
