use instant::Duration;

use crate::{
    data_structures::{cube::Cube, draw_plan::DrawInstruction, plane::Plane, transform::Transform},
    error::FrameError,
    flow::Scene,
    render::Frame,
    resources::{mesh::MeshDescriptor, shader::ShaderDescriptor, texture::TextureDescriptor},
    scenes::{cube::tumble, wgsl_pair},
};

/// Two video cubes, two image cubes and a backdrop plane.
#[derive(Debug, Default)]
pub struct GalleryScene {
    angle: f32,
}

impl Scene for GalleryScene {
    fn title(&self) -> &str {
        "Gallery"
    }

    fn declare_shaders(&self) -> Vec<ShaderDescriptor> {
        vec![wgsl_pair("textured"), wgsl_pair("lit"), wgsl_pair("flat")]
    }

    fn declare_meshes(&self) -> Vec<MeshDescriptor> {
        vec![
            MeshDescriptor::new("cube", Cube, 1.0),
            MeshDescriptor::new("backdrop", Plane, 4.0),
        ]
    }

    fn declare_textures(&self) -> Vec<TextureDescriptor> {
        vec![
            TextureDescriptor::video("stripes", "textures/stripes.gif"),
            TextureDescriptor::video("pulse", "textures/pulse.gif"),
            TextureDescriptor::image("crate", "textures/crate.png"),
            TextureDescriptor::image("gradient", "textures/gradient.png"),
        ]
    }

    fn declare_draw_plan(&self) -> Vec<DrawInstruction> {
        vec![
            DrawInstruction::new("video-top", "cube", "textured", "stripes"),
            DrawInstruction::new("video-bottom", "cube", "textured", "pulse"),
            DrawInstruction::new("image-lit", "cube", "lit", "crate"),
            DrawInstruction::new("image-flat", "cube", "textured", "gradient"),
            DrawInstruction::new("backdrop", "backdrop", "flat", ""),
        ]
    }

    fn clear_colour(&self) -> wgpu::Color {
        wgpu::Color {
            r: 0.8,
            g: 0.5,
            b: 0.8,
            a: 1.0,
        }
    }

    fn draw_frame(&mut self, frame: &mut Frame<'_>, dt: Duration) -> Result<(), FrameError> {
        self.angle += dt.as_secs_f32();
        let a = self.angle;
        frame.draw("video-top", &tumble([0.0, 1.5, -7.0], a))?;
        frame.draw("video-bottom", &tumble([0.0, -1.5, -7.0], -a))?;
        frame.draw("image-lit", &tumble([1.5, 0.0, -7.0], a).lit())?;
        frame.draw("image-flat", &tumble([-1.5, 0.0, -7.0], -a))?;
        frame.draw("backdrop", &Transform::at([0.0, 0.0, -15.0]))
    }
}
