//! Fan triangulation of map chunks.
//!
//! Each cell becomes a six-triangle fan around its center. The fan stops at
//! the solid radius; the center vertex carries the cell's own terrain color
//! while the outer vertices blend toward the neighbors, so terrain types
//! fade into each other across the margin instead of ending in hard seams.
//! Triangles are emitted facing up regardless of corner-table handedness.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use crate::coords::HexDirection;
use crate::math;
use crate::metrics::terrain_color;

use super::grid::HexMap;

/// Vertices per cell: six fan triangles, no vertex sharing because the
/// blend colors differ per corner.
const VERTICES_PER_CELL: usize = 18;

/// Accumulated vertex data for one chunk mesh.
#[derive(Debug, Default)]
pub struct MeshData {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl MeshData {
    /// Triangulates the given cells of a map into one mesh.
    pub fn triangulate(map: &HexMap, cells: &[usize]) -> Self {
        let mut data = Self {
            positions: Vec::with_capacity(cells.len() * VERTICES_PER_CELL),
            normals: Vec::with_capacity(cells.len() * VERTICES_PER_CELL),
            colors: Vec::with_capacity(cells.len() * VERTICES_PER_CELL),
            indices: Vec::with_capacity(cells.len() * VERTICES_PER_CELL),
        };
        for &index in cells {
            for direction in HexDirection::ALL {
                data.triangulate_direction(map, index, direction);
            }
        }
        data
    }

    fn triangulate_direction(&mut self, map: &HexMap, index: usize, direction: HexDirection) {
        let cell = map.cell(index);
        let metrics = map.metrics();
        let center = cell.position();
        let first = center + metrics.first_solid_corner(direction);
        let second = center + metrics.second_solid_corner(direction);

        let own = terrain_color(cell.terrain_type_index());
        let color_of = |d: HexDirection| {
            map.neighbor(index, d)
                .map_or(own, |n| terrain_color(map.cell(n).terrain_type_index()))
        };
        let across = color_of(direction);
        // The first corner is shared with the previous edge, the second
        // with the next, so each blends its own trio of cells.
        let first_blend = math::average_color(own, color_of(direction.previous()), across);
        let second_blend = math::average_color(own, color_of(direction.next()), across);

        self.add_triangle([center, first, second], [own, first_blend, second_blend]);
    }

    fn add_triangle(&mut self, vertices: [Vec3; 3], colors: [[f32; 4]; 3]) {
        let base = self.positions.len() as u32;
        let mut normal = math::compute_normal(vertices[0], vertices[1], vertices[2]);
        // Corner tables may hand us either winding; normalize to face up.
        let order = if normal.y < 0.0 {
            normal = -normal;
            [base, base + 2, base + 1]
        } else {
            [base, base + 1, base + 2]
        };
        for (vertex, color) in vertices.iter().zip(colors) {
            self.positions.push(vertex.to_array());
            self.normals.push(normal.to_array());
            self.colors.push(color);
        }
        self.indices.extend_from_slice(&order);
    }

    /// Converts the accumulated data into a renderable mesh. Kept in main
    /// world memory too, so the CPU-side copy stays available for picking.
    pub fn into_mesh(self) -> Mesh {
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, self.colors)
        .with_inserted_indices(Indices::U32(self.indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TERRAIN_COLORS;

    fn close(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn every_cell_contributes_a_full_fan() {
        let map = HexMap::new(4, 4, 3);
        let cells: Vec<usize> = (0..map.len()).collect();
        let data = MeshData::triangulate(&map, &cells);
        assert_eq!(data.positions.len(), map.len() * VERTICES_PER_CELL);
        assert_eq!(data.indices.len(), map.len() * VERTICES_PER_CELL);
        assert_eq!(data.normals.len(), data.positions.len());
        assert_eq!(data.colors.len(), data.positions.len());
    }

    #[test]
    fn all_triangles_face_up() {
        let mut map = HexMap::new(4, 4, 3);
        map.set_elevation(5, 4);
        map.set_elevation(6, 2);
        let cells: Vec<usize> = (0..map.len()).collect();
        let data = MeshData::triangulate(&map, &cells);
        for normal in &data.normals {
            assert!(normal[1] > 0.0, "downward normal {normal:?}");
        }
        for triangle in data.indices.chunks(3) {
            let v = |i: usize| Vec3::from_array(data.positions[triangle[i] as usize]);
            let winding = math::compute_normal(v(0), v(1), v(2));
            assert!(winding.y > 0.0, "clockwise-from-above triangle");
        }
    }

    #[test]
    fn uniform_terrain_yields_uniform_color() {
        let map = HexMap::new(1, 1, 3);
        let data = MeshData::triangulate(&map, &[0]);
        for vertex in 0..data.positions.len() {
            assert!(close(data.colors[vertex], TERRAIN_COLORS[0]));
        }
    }

    #[test]
    fn borders_blend_toward_the_neighbor() {
        let mut map = HexMap::new(2, 1, 3);
        map.set_terrain_type_index(1, 3);
        let data = MeshData::triangulate(&map, &[0]);

        let own = TERRAIN_COLORS[0];
        let other = TERRAIN_COLORS[3];
        // Cell 1 flanks exactly one edge of cell 0, so two outer corners
        // blend two parts own color with one part neighbor color.
        let expected: [f32; 4] = std::array::from_fn(|i| (2.0 * own[i] + other[i]) / 3.0);
        let blended = (0..data.positions.len())
            .filter(|&v| close(data.colors[v], expected))
            .count();
        assert_eq!(blended, 4, "two edges share each blended corner");

        // Fan centers always keep the cell's own color.
        assert!(close(data.colors[0], own));
    }

    #[test]
    fn triangulation_is_deterministic() {
        let mut a = HexMap::new(3, 3, 11);
        let mut b = HexMap::new(3, 3, 11);
        for m in [&mut a, &mut b] {
            m.set_elevation(4, 2);
            m.set_terrain_type_index(4, 2);
        }
        let cells: Vec<usize> = (0..a.len()).collect();
        let da = MeshData::triangulate(&a, &cells);
        let db = MeshData::triangulate(&b, &cells);
        assert_eq!(da.positions, db.positions);
        assert_eq!(da.colors, db.colors);
        assert_eq!(da.indices, db.indices);
    }
}
