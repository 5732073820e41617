use crate::data_structures::geometry::{
    BLUE, GREEN, Geometry, LayoutAttribute, PURPLE, RED, VertexLayout, WHITE, YELLOW, interleave,
};

/// Corner positions for an edge length of 2, face by face:
/// front, back, top, bottom, right, left.
#[rustfmt::skip]
const UNIT_POSITIONS: [[f32; 3]; 24] = [
    [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0],
    [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0],
    [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],
    [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0],
    [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],
];

const FACE_NORMALS: [[f32; 3]; 6] = [
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
];

const FACE_COLOURS: [[f32; 3]; 6] = [WHITE, RED, GREEN, BLUE, YELLOW, PURPLE];

const FACE_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

const INDICES: [u16; 36] = {
    let mut indices = [0u16; 36];
    let quad = [0u16, 1, 2, 0, 2, 3];
    let mut face = 0;
    while face < 6 {
        let mut i = 0;
        while i < 6 {
            indices[face * 6 + i] = quad[i] + 4 * face as u16;
            i += 1;
        }
        face += 1;
    }
    indices
};

/// An axis-aligned cube centred on the origin; `scale` is the edge length.
///
/// Every face has its own four vertices so normals, texture coordinates and
/// colours can differ per face.
#[derive(Clone, Debug, Default)]
pub struct Cube;

impl Geometry for Cube {
    fn attributes(&self, scale: f32) -> Vec<f32> {
        let positions = self.positions(scale);
        let normals = self.normals();
        let texcoords = self.texcoords();
        let colours = self.colours();
        interleave(
            &self.layout(),
            self.vertex_count(),
            &[&positions, &normals, &texcoords, &colours],
        )
    }

    fn positions(&self, scale: f32) -> Vec<f32> {
        let half = scale / 2.0;
        UNIT_POSITIONS
            .iter()
            .flat_map(|p| p.map(|c| c * half))
            .collect()
    }

    fn normals(&self) -> Vec<f32> {
        FACE_NORMALS.iter().flat_map(|n| [*n; 4]).flatten().collect()
    }

    fn texcoords(&self) -> Vec<f32> {
        FACE_TEXCOORDS.concat().repeat(6)
    }

    fn colours(&self) -> Vec<f32> {
        FACE_COLOURS.iter().flat_map(|c| [*c; 4]).flatten().collect()
    }

    fn indices(&self) -> &[u16] {
        &INDICES
    }

    fn vertex_count(&self) -> u32 {
        24
    }

    fn layout(&self) -> VertexLayout {
        VertexLayout {
            stride: 11,
            attributes: vec![
                LayoutAttribute {
                    name: "a_position",
                    components: 3,
                    offset: 0,
                },
                LayoutAttribute {
                    name: "a_normal",
                    components: 3,
                    offset: 3,
                },
                LayoutAttribute {
                    name: "a_texcoord",
                    components: 2,
                    offset: 6,
                },
                LayoutAttribute {
                    name: "a_color",
                    components: 3,
                    offset: 8,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_two_spans_unit_bounds() {
        let positions = Cube.positions(2.0);
        assert_eq!(positions.len() / 3, 24);
        assert_eq!(Cube.index_count(), 36);
        for axis in 0..3 {
            let values: Vec<f32> = positions.iter().skip(axis).step_by(3).copied().collect();
            let min = values.iter().copied().fold(f32::INFINITY, f32::min);
            let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            assert_eq!((min, max), (-1.0, 1.0), "axis {axis}");
        }
    }

    #[test]
    fn repeated_generation_is_identical() {
        let first = Cube.attributes(1.5);
        let second = Cube.attributes(1.5);
        assert_eq!(first, second);
        assert_eq!(first.len(), 24 * 11);
        assert_eq!(Cube.index_count(), Cube.indices().len() as u32);
    }

    #[test]
    fn second_face_starts_at_vertex_four() {
        assert_eq!(&Cube.indices()[6..12], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(*Cube.indices().iter().max().unwrap(), 23);
    }

    #[test]
    fn front_face_vertex_is_interleaved() {
        let data = Cube.attributes(2.0);
        // position, normal (+z), texcoord (0,0), white
        assert_eq!(&data[..11], &[-1.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        // first vertex of the back face is red and faces -z
        assert_eq!(&data[44 + 3..44 + 6], &[0.0, 0.0, -1.0]);
        assert_eq!(&data[44 + 8..44 + 11], &RED);
    }
}
