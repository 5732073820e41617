use instant::Duration;

use crate::{
    data_structures::{draw_plan::DrawInstruction, plane::Plane, transform::Transform},
    error::FrameError,
    flow::Scene,
    render::Frame,
    resources::{mesh::MeshDescriptor, shader::ShaderDescriptor},
    scenes::wgsl_pair,
};

/// A vertex-coloured quad seven units in front of the camera.
#[derive(Debug)]
pub struct PlaneScene {
    spinning: bool,
    angle: f32,
}

impl PlaneScene {
    pub fn still() -> Self {
        Self {
            spinning: false,
            angle: 0.0,
        }
    }

    /// Rotates about Z at one radian per second.
    pub fn spinning() -> Self {
        Self {
            spinning: true,
            angle: 0.0,
        }
    }
}

impl Scene for PlaneScene {
    fn title(&self) -> &str {
        if self.spinning { "Spinning plane" } else { "Plane" }
    }

    fn declare_shaders(&self) -> Vec<ShaderDescriptor> {
        vec![wgsl_pair("flat")]
    }

    fn declare_meshes(&self) -> Vec<MeshDescriptor> {
        vec![MeshDescriptor::new("plane", Plane, 1.0)]
    }

    fn declare_draw_plan(&self) -> Vec<DrawInstruction> {
        vec![DrawInstruction::new("plane", "plane", "flat", "")]
    }

    fn draw_frame(&mut self, frame: &mut Frame<'_>, dt: Duration) -> Result<(), FrameError> {
        if self.spinning {
            self.angle += dt.as_secs_f32();
        }
        frame.draw("plane", &Transform::at([0.0, 0.0, -7.0]).rotate_z(self.angle))
    }
}
