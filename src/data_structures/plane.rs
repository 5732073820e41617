use crate::data_structures::geometry::{
    BLUE, GREEN, Geometry, LayoutAttribute, RED, VertexLayout, WHITE, interleave,
};

const INDICES: [u16; 6] = [3, 1, 0, 0, 2, 3];

/// A flat quad in the XY plane with 2D positions and a colour per corner.
///
/// Corners span `-scale..scale` on both axes.
#[derive(Clone, Debug, Default)]
pub struct Plane;

impl Geometry for Plane {
    fn attributes(&self, scale: f32) -> Vec<f32> {
        let positions = self.positions(scale);
        let colours = self.colours();
        interleave(&self.layout(), self.vertex_count(), &[&positions, &colours])
    }

    fn positions(&self, scale: f32) -> Vec<f32> {
        let s = scale;
        vec![s, s, -s, s, s, -s, -s, -s]
    }

    fn colours(&self) -> Vec<f32> {
        [WHITE, RED, GREEN, BLUE].concat()
    }

    fn indices(&self) -> &[u16] {
        &INDICES
    }

    fn vertex_count(&self) -> u32 {
        4
    }

    fn layout(&self) -> VertexLayout {
        VertexLayout {
            stride: 5,
            attributes: vec![
                LayoutAttribute {
                    name: "a_position",
                    components: 2,
                    offset: 0,
                },
                LayoutAttribute {
                    name: "a_color",
                    components: 3,
                    offset: 2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_position_then_colour() {
        let data = Plane.attributes(1.0);
        assert_eq!(data.len(), 4 * 5);
        assert_eq!(&data[..5], &[1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(&data[5..10], &[-1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn indices_stay_within_vertices() {
        assert_eq!(Plane.index_count(), 6);
        assert!(Plane.indices().iter().all(|&i| (i as u32) < Plane.vertex_count()));
    }
}
