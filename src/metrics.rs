//! Shared geometry constants, noise sampling, and the terrain palette.
//!
//! Everything here is a deterministic function of its inputs plus the seed
//! given at construction, so positions and meshes are bit-reproducible
//! between runs and across save/load.

use bevy::prelude::*;
use hexx::HexLayout;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::coords::{HexCoordinates, HexDirection};

/// Distance from a cell center to each of its corners, in world units.
pub const OUTER_RADIUS: f32 = 10.0;

/// Fraction of the corner offset kept solid; the rest is the blend margin.
pub const SOLID_FACTOR: f32 = 0.8;

/// World-space height of one elevation level.
pub const ELEVATION_STEP: f32 = 3.0;

/// Amplitude of the per-cell vertical noise perturbation.
pub const ELEVATION_PERTURB_STRENGTH: f32 = 1.5;

/// Water surfaces sit slightly below the level line.
pub const WATER_SURFACE_OFFSET: f32 = -0.5;

/// Spatial divisor applied to planar positions before noise sampling.
const NOISE_SAMPLE_SCALE: f64 = 40.0;

/// Cells per chunk along the offset column axis.
pub const CHUNK_SIZE_X: i32 = 5;

/// Cells per chunk along the offset row axis.
pub const CHUNK_SIZE_Z: i32 = 5;

/// Flat vertex colors, indexed by a cell's terrain type.
/// Sand, grass, mud, stone, snow.
pub const TERRAIN_COLORS: [[f32; 4]; 5] = [
    [0.84, 0.74, 0.52, 1.0],
    [0.33, 0.62, 0.25, 1.0],
    [0.47, 0.35, 0.24, 1.0],
    [0.52, 0.52, 0.53, 1.0],
    [0.95, 0.95, 0.97, 1.0],
];

/// Color for a terrain type index, clamped to the palette.
pub fn terrain_color(index: u8) -> [f32; 4] {
    TERRAIN_COLORS[(index as usize).min(TERRAIN_COLORS.len() - 1)]
}

/// Flat/Slope/Cliff classification of the join between two elevations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HexEdgeType {
    /// No elevation difference.
    Flat,
    /// Exactly one level of difference; traversable.
    Slope,
    /// Two or more levels of difference.
    Cliff,
}

/// Classifies the edge between two elevations.
pub fn edge_type(elevation_a: i32, elevation_b: i32) -> HexEdgeType {
    match (elevation_a - elevation_b).abs() {
        0 => HexEdgeType::Flat,
        1 => HexEdgeType::Slope,
        _ => HexEdgeType::Cliff,
    }
}

/// Deterministic geometry oracle for one map: planar cell centers, the
/// per-direction solid corner table, and the perturbation noise source.
pub struct HexMetrics {
    layout: HexLayout,
    solid_corners: [[Vec3; 2]; 6],
    noise: Fbm<Perlin>,
}

impl HexMetrics {
    /// Builds the metrics table for the given noise seed.
    pub fn new(seed: u32) -> Self {
        let layout = HexLayout {
            scale: Vec2::splat(OUTER_RADIUS),
            ..default()
        };
        let unit_layout = HexLayout {
            scale: Vec2::splat(1.0),
            ..default()
        };
        let unit_corners = unit_layout.center_aligned_hex_corners();

        // Corner ids flanking each edge, from hexx's own edge/vertex tables.
        let corner_ids: [[usize; 2]; 6] = std::array::from_fn(|d| {
            let dirs = HexDirection::ALL[d].edge().vertex_directions();
            [dirs[0].index() as usize, dirs[1].index() as usize]
        });

        // The first solid corner of edge d is the corner it shares with
        // edge d.previous(), so adjacent fan segments meet at the same
        // outer vertex.
        let solid_corners: [[Vec3; 2]; 6] = std::array::from_fn(|d| {
            let prev = corner_ids[(d + 5) % 6];
            let cur = corner_ids[d];
            let first = if prev.contains(&cur[0]) { cur[0] } else { cur[1] };
            let second = if first == cur[0] { cur[1] } else { cur[0] };
            [
                corner_to_world(unit_corners[first]),
                corner_to_world(unit_corners[second]),
            ]
        });

        let noise = Fbm::new(seed).set_octaves(4);

        Self {
            layout,
            solid_corners,
            noise,
        }
    }

    /// Planar world position of a cell center.
    pub fn cell_center(&self, coordinates: HexCoordinates) -> Vec2 {
        self.layout.hex_to_world_pos(coordinates.to_hex())
    }

    /// Offset from a cell center to the first solid corner of an edge.
    pub fn first_solid_corner(&self, direction: HexDirection) -> Vec3 {
        self.solid_corners[direction.index()][0]
    }

    /// Offset from a cell center to the second solid corner of an edge.
    pub fn second_solid_corner(&self, direction: HexDirection) -> Vec3 {
        self.solid_corners[direction.index()][1]
    }

    /// Noise sample in `[-1, 1]` for a planar position.
    pub fn sample_noise(&self, position: Vec2) -> f32 {
        self.noise.get([
            f64::from(position.x) / NOISE_SAMPLE_SCALE,
            f64::from(position.y) / NOISE_SAMPLE_SCALE,
        ]) as f32
    }

    /// Vertical position of a cell: stepped elevation plus noise perturbation.
    pub fn perturbed_height(&self, elevation: i32, planar: Vec2) -> f32 {
        elevation as f32 * ELEVATION_STEP
            + self.sample_noise(planar) * ELEVATION_PERTURB_STRENGTH
    }
}

fn corner_to_world(corner: Vec2) -> Vec3 {
    Vec3::new(corner.x, 0.0, corner.y) * OUTER_RADIUS * SOLID_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_classification() {
        assert_eq!(edge_type(3, 3), HexEdgeType::Flat);
        assert_eq!(edge_type(3, 2), HexEdgeType::Slope);
        assert_eq!(edge_type(2, 3), HexEdgeType::Slope);
        assert_eq!(edge_type(4, 1), HexEdgeType::Cliff);
        assert_eq!(edge_type(0, 5), HexEdgeType::Cliff);
    }

    #[test]
    fn solid_corners_have_solid_radius() {
        let m = HexMetrics::new(7);
        for d in HexDirection::ALL {
            for corner in [m.first_solid_corner(d), m.second_solid_corner(d)] {
                assert!(
                    (corner.length() - OUTER_RADIUS * SOLID_FACTOR).abs() < 1e-4,
                    "corner of {d:?} has length {}",
                    corner.length()
                );
                assert_eq!(corner.y, 0.0);
            }
        }
    }

    #[test]
    fn fan_segments_share_outer_vertices() {
        let m = HexMetrics::new(7);
        for d in HexDirection::ALL {
            let shared = m.first_solid_corner(d);
            let prev_second = m.second_solid_corner(d.previous());
            assert!(
                (shared - prev_second).length() < 1e-5,
                "edge {d:?} does not meet its previous edge"
            );
        }
    }

    #[test]
    fn six_distinct_corner_pairs() {
        let m = HexMetrics::new(7);
        for a in HexDirection::ALL {
            for b in HexDirection::ALL {
                if a != b {
                    assert_ne!(m.second_solid_corner(a), m.second_solid_corner(b));
                }
            }
        }
    }

    #[test]
    fn adjacent_centers_are_evenly_spaced() {
        let m = HexMetrics::new(7);
        let origin = HexCoordinates::new(0, 0);
        let base = m.cell_center(origin);
        let spacing = (m.cell_center(origin.neighbor(HexDirection::E)) - base).length();
        for d in HexDirection::ALL {
            let dist = (m.cell_center(origin.neighbor(d)) - base).length();
            assert!((dist - spacing).abs() < 1e-3, "uneven spacing toward {d:?}");
        }
    }

    #[test]
    fn noise_is_deterministic_and_bounded() {
        let a = HexMetrics::new(42);
        let b = HexMetrics::new(42);
        for i in 0..20 {
            let pos = Vec2::new(i as f32 * 13.7, i as f32 * -7.3);
            let sample = a.sample_noise(pos);
            assert_eq!(sample, b.sample_noise(pos));
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn perturbed_height_steps_with_elevation() {
        let m = HexMetrics::new(42);
        let planar = Vec2::new(31.0, 17.0);
        let low = m.perturbed_height(1, planar);
        let high = m.perturbed_height(2, planar);
        assert!((high - low - ELEVATION_STEP).abs() < 1e-5);
    }
}
