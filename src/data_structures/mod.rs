//! Plain data the engine works on: mesh geometry, draw plans and transforms.

pub mod cube;
pub mod draw_plan;
pub mod geometry;
pub mod plane;
pub mod transform;
