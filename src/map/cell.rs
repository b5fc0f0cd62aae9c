//! One hexagonal map cell: identity, attributes, and pure queries.
//!
//! Cells live in the flat arena owned by [`HexMap`](super::grid::HexMap);
//! neighbor links are optional arena indices, never references. Every
//! mutation that has to uphold a cross-cell invariant is a `HexMap` method,
//! so this module stays read-only beyond construction.

use bevy::prelude::Vec3;

use crate::coords::{HexCoordinates, HexDirection};
use crate::metrics::{ELEVATION_STEP, HexEdgeType, WATER_SURFACE_OFFSET, edge_type};

/// Sentinel for "elevation never assigned", distinct from every valid value
/// so the first real assignment always runs the full setter cascade.
pub const ELEVATION_UNSET: i32 = i32::MIN;

/// Scratch fields owned by an external pathfinder.
///
/// The map only stores the slots; chain integrity of
/// `next_with_same_priority` belongs to whoever runs the search.
#[cfg_attr(
    not(test),
    expect(dead_code, reason = "slots reserved for the pathfinding layer")
)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Travel cost from the search origin.
    pub distance: i32,
    /// Remaining-cost estimate toward the search target.
    pub heuristic: i32,
    /// Which search wave last visited this cell.
    pub phase: i32,
    /// Arena index of the cell this one was reached from.
    pub path_from: Option<usize>,
    /// Link slot for the searcher's priority-bucket chain.
    pub next_with_same_priority: Option<usize>,
}

#[cfg_attr(not(test), expect(dead_code, reason = "used by the pathfinding layer"))]
impl SearchState {
    /// Queue priority: distance plus heuristic.
    pub fn priority(&self) -> i32 {
        self.distance + self.heuristic
    }
}

/// A node in the grid graph.
#[derive(Clone, Debug)]
pub struct HexCell {
    coordinates: HexCoordinates,
    index: usize,
    chunk: usize,
    pub(super) position: Vec3,
    pub(super) neighbors: [Option<usize>; 6],
    pub(super) terrain_type_index: u8,
    pub(super) elevation: i32,
    pub(super) water_level: i32,
    pub(super) urban_level: u8,
    pub(super) farm_level: u8,
    pub(super) plant_level: u8,
    pub(super) special_index: u8,
    pub(super) walled: bool,
    pub(super) has_incoming_river: bool,
    pub(super) incoming_river: HexDirection,
    pub(super) has_outgoing_river: bool,
    pub(super) outgoing_river: HexDirection,
    pub(super) roads: [bool; 6],
    pub(super) unit: Option<u64>,
    /// Pathfinder scratch space; not persisted.
    #[cfg_attr(
        not(test),
        expect(dead_code, reason = "slots reserved for the pathfinding layer")
    )]
    pub search: SearchState,
}

impl HexCell {
    pub(super) fn new(coordinates: HexCoordinates, index: usize, chunk: usize) -> Self {
        Self {
            coordinates,
            index,
            chunk,
            position: Vec3::ZERO,
            neighbors: [None; 6],
            terrain_type_index: 0,
            elevation: ELEVATION_UNSET,
            water_level: 0,
            urban_level: 0,
            farm_level: 0,
            plant_level: 0,
            special_index: 0,
            walled: false,
            has_incoming_river: false,
            incoming_river: HexDirection::NE,
            has_outgoing_river: false,
            outgoing_river: HexDirection::NE,
            roads: [false; 6],
            unit: None,
            search: SearchState::default(),
        }
    }

    // ── Identity ───────────────────────────────────────────────────

    /// Cube coordinates, immutable after creation.
    pub fn coordinates(&self) -> HexCoordinates {
        self.coordinates
    }

    /// Dense arena position, set once at grid build time.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rendering chunk this cell belongs to.
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// World position; vertical part is derived from elevation plus noise.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    // ── Topology ───────────────────────────────────────────────────

    /// Arena index of the neighbor across the given edge, if any.
    pub fn neighbor(&self, direction: HexDirection) -> Option<usize> {
        self.neighbors[direction.index()]
    }

    // ── Terrain attributes ─────────────────────────────────────────

    /// Index into the terrain color palette.
    pub fn terrain_type_index(&self) -> u8 {
        self.terrain_type_index
    }

    /// Elevation level; [`ELEVATION_UNSET`] before the first assignment.
    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    /// Water level; the cell is flooded when it exceeds elevation.
    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    /// Whether the water level exceeds the elevation.
    pub fn is_underwater(&self) -> bool {
        self.water_level > self.elevation
    }

    /// World-space height of the water surface over this cell.
    pub fn water_surface_y(&self) -> f32 {
        (self.water_level as f32 + WATER_SURFACE_OFFSET) * ELEVATION_STEP
    }

    /// Urban density level.
    pub fn urban_level(&self) -> u8 {
        self.urban_level
    }

    /// Farm density level.
    pub fn farm_level(&self) -> u8 {
        self.farm_level
    }

    /// Plant density level.
    pub fn plant_level(&self) -> u8 {
        self.plant_level
    }

    /// Special feature index; zero means none.
    pub fn special_index(&self) -> u8 {
        self.special_index
    }

    /// Whether a special feature occupies this cell.
    pub fn is_special(&self) -> bool {
        self.special_index > 0
    }

    /// Whether the cell is walled.
    pub fn walled(&self) -> bool {
        self.walled
    }

    // ── Rivers ─────────────────────────────────────────────────────

    /// Whether a river flows into this cell.
    pub fn has_incoming_river(&self) -> bool {
        self.has_incoming_river
    }

    /// Direction of the incoming river; meaningless unless one exists.
    pub fn incoming_river(&self) -> HexDirection {
        self.incoming_river
    }

    /// Whether a river flows out of this cell.
    pub fn has_outgoing_river(&self) -> bool {
        self.has_outgoing_river
    }

    /// Direction of the outgoing river; meaningless unless one exists.
    pub fn outgoing_river(&self) -> HexDirection {
        self.outgoing_river
    }

    /// Whether any river touches this cell.
    pub fn has_river(&self) -> bool {
        self.has_incoming_river || self.has_outgoing_river
    }

    /// Whether a river crosses the given edge, in either direction.
    pub fn has_river_through_edge(&self, direction: HexDirection) -> bool {
        (self.has_incoming_river && self.incoming_river == direction)
            || (self.has_outgoing_river && self.outgoing_river == direction)
    }

    // ── Roads ──────────────────────────────────────────────────────

    /// Whether a road crosses the given edge.
    pub fn has_road_through_edge(&self, direction: HexDirection) -> bool {
        self.roads[direction.index()]
    }

    /// Whether any edge of this cell carries a road.
    pub fn has_roads(&self) -> bool {
        self.roads.iter().any(|&road| road)
    }

    // ── Occupant ───────────────────────────────────────────────────

    /// Id of the unit occupying this cell, if any. Weak reference; the
    /// unit layer owns the actual entity.
    pub fn unit(&self) -> Option<u64> {
        self.unit
    }

    // ── Edges ──────────────────────────────────────────────────────

    /// Edge classification toward another cell.
    pub fn edge_type_to(&self, other: &HexCell) -> HexEdgeType {
        edge_type(self.elevation, other.elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> HexCell {
        HexCell::new(HexCoordinates::from_offset(2, 3), 17, 1)
    }

    #[test]
    fn new_cell_starts_unset_and_dry() {
        let c = cell();
        assert_eq!(c.elevation(), ELEVATION_UNSET);
        assert_eq!(c.water_level(), 0);
        assert!(!c.has_river());
        assert!(!c.has_roads());
        assert!(!c.is_special());
        assert!(!c.walled());
        assert_eq!(c.unit(), None);
        assert!(c.neighbors.iter().all(Option::is_none));
    }

    #[test]
    fn underwater_tracks_both_levels() {
        let mut c = cell();
        c.elevation = 1;
        c.water_level = 1;
        assert!(!c.is_underwater());
        c.water_level = 2;
        assert!(c.is_underwater());
    }

    #[test]
    fn river_through_edge_checks_both_directions() {
        let mut c = cell();
        c.has_incoming_river = true;
        c.incoming_river = HexDirection::W;
        c.has_outgoing_river = true;
        c.outgoing_river = HexDirection::E;
        assert!(c.has_river_through_edge(HexDirection::W));
        assert!(c.has_river_through_edge(HexDirection::E));
        assert!(!c.has_river_through_edge(HexDirection::NE));
    }

    #[test]
    fn edge_type_uses_elevation_delta() {
        let mut a = cell();
        let mut b = cell();
        a.elevation = 3;
        b.elevation = 1;
        assert_eq!(a.edge_type_to(&b), HexEdgeType::Cliff);
        b.elevation = 2;
        assert_eq!(a.edge_type_to(&b), HexEdgeType::Slope);
        b.elevation = 3;
        assert_eq!(a.edge_type_to(&b), HexEdgeType::Flat);
    }

    #[test]
    fn search_priority_sums_distance_and_heuristic() {
        let mut c = cell();
        c.search.distance = 7;
        c.search.heuristic = 5;
        assert_eq!(c.search.priority(), 12);
    }

    #[test]
    fn water_surface_sits_below_the_level_line() {
        let mut c = cell();
        c.water_level = 2;
        assert!(c.water_surface_y() < 2.0 * ELEVATION_STEP);
        assert!(c.water_surface_y() > ELEVATION_STEP);
    }
}
