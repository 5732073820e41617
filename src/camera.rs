//! Projection and drawable-surface sizing.

use cgmath::{Deg, Matrix4, Rad, perspective};

/// Maps OpenGL clip depth (-1..1) onto wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Fixed vertical field of view and clip planes; the aspect ratio is supplied per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self, surface: SurfaceSize) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, surface.aspect(), self.znear, self.zfar)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(Deg(45.0), 0.5, 100.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Size a drawable is shrunk to before it is disposed.
    pub const MINIMAL: SurfaceSize = SurfaceSize {
        width: 1,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square drawable whose side is the narrower viewport side times `scale`.
    pub fn fit(viewport_width: u32, viewport_height: u32, scale: f32) -> Self {
        let narrow = viewport_width.min(viewport_height) as f32;
        let side = ((narrow * scale).round() as u32).max(1);
        Self::new(side, side)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}
