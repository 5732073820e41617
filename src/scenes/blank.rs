use instant::Duration;

use crate::{
    data_structures::draw_plan::DrawInstruction,
    error::FrameError,
    flow::Scene,
    render::Frame,
    resources::{mesh::MeshDescriptor, shader::ShaderDescriptor},
};

/// Declares nothing and clears to black.
#[derive(Debug, Default)]
pub struct BlankScene;

impl Scene for BlankScene {
    fn title(&self) -> &str {
        "Blank"
    }

    fn declare_shaders(&self) -> Vec<ShaderDescriptor> {
        Vec::new()
    }

    fn declare_meshes(&self) -> Vec<MeshDescriptor> {
        Vec::new()
    }

    fn declare_draw_plan(&self) -> Vec<DrawInstruction> {
        Vec::new()
    }

    fn draw_frame(&mut self, _frame: &mut Frame<'_>, _dt: Duration) -> Result<(), FrameError> {
        Ok(())
    }
}
