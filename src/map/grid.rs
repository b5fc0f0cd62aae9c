//! The map arena and its edit rules.
//!
//! [`HexMap`] owns every cell in a flat `Vec` and is the only place allowed
//! to mutate them. Each setter upholds the cross-cell invariants: rivers
//! only flow downhill or out of a lake, roads never coexist with a river on
//! the same edge or cross a cliff, special features exclude both. Edits
//! that would break an invariant are silently ignored; edits that succeed
//! record repaint work in the [`DirtyTracker`] instead of touching any
//! rendering state themselves.

use bevy::prelude::Vec3;

use crate::coords::{HexCoordinates, HexDirection};
use crate::metrics::{CHUNK_SIZE_X, CHUNK_SIZE_Z, HexEdgeType, HexMetrics, edge_type};

use super::cell::HexCell;
use super::dirty::{DirtyBatch, DirtyTracker};
use super::serial::{CellRecord, MapFile};

/// A rectangular hexagonal grid with invariant-preserving setters.
pub struct HexMap {
    width: i32,
    height: i32,
    chunks_x: i32,
    chunks_z: i32,
    cells: Vec<HexCell>,
    metrics: HexMetrics,
    dirty: DirtyTracker,
}

impl HexMap {
    /// Builds a flat, dry map of the given offset dimensions. All cells
    /// start at elevation zero with positions already computed; the dirty
    /// tracker starts empty.
    pub fn new(width: i32, height: i32, seed: u32) -> Self {
        let mut map = Self::bare(width, height, seed);
        for i in 0..map.cells.len() {
            map.set_elevation(i, 0);
        }
        let _ = map.dirty.take();
        map
    }

    /// Rebuilds a map from decoded file contents. Records are applied as
    /// raw state, not through the setters: a well-formed file already
    /// satisfies every invariant and must round-trip exactly.
    pub fn from_map_file(file: &MapFile, seed: u32) -> Self {
        let mut map = Self::bare(file.width, file.height, seed);
        for (i, record) in file.records.iter().enumerate() {
            map.apply_record(i, record);
        }
        let _ = map.dirty.take();
        map
    }

    fn bare(width: i32, height: i32, seed: u32) -> Self {
        // Non-positive dimensions collapse to an empty map.
        let width = width.max(0);
        let height = height.max(0);
        let chunks_x = (width + CHUNK_SIZE_X - 1) / CHUNK_SIZE_X;
        let chunks_z = (height + CHUNK_SIZE_Z - 1) / CHUNK_SIZE_Z;
        let mut cells = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            for col in 0..width {
                let index = (row * width + col) as usize;
                let chunk = ((row / CHUNK_SIZE_Z) * chunks_x + col / CHUNK_SIZE_X) as usize;
                cells.push(HexCell::new(
                    HexCoordinates::from_offset(col, row),
                    index,
                    chunk,
                ));
            }
        }
        let mut map = Self {
            width,
            height,
            chunks_x,
            chunks_z,
            cells,
            metrics: HexMetrics::new(seed),
            dirty: DirtyTracker::default(),
        };
        for i in 0..map.cells.len() {
            for d in HexDirection::ALL {
                let coords = map.cells[i].coordinates().neighbor(d);
                // Each edge is wired once; the mirror write covers the rest.
                if let Some(n) = map.cell_at(coords)
                    && n > i
                {
                    map.set_neighbor(i, d, n);
                }
            }
        }
        map
    }

    /// Links two cells across an edge, in both directions.
    fn set_neighbor(&mut self, index: usize, direction: HexDirection, neighbor: usize) {
        self.cells[index].neighbors[direction.index()] = Some(neighbor);
        self.cells[neighbor].neighbors[direction.opposite().index()] = Some(index);
    }

    // ── Lookup ─────────────────────────────────────────────────────

    /// Cell count.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True for a zero-area map.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Offset width of the map.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Offset height of the map.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Read access to a cell by arena index.
    pub fn cell(&self, index: usize) -> &HexCell {
        &self.cells[index]
    }

    /// Arena index for cube coordinates, `None` when outside the map.
    pub fn cell_at(&self, coordinates: HexCoordinates) -> Option<usize> {
        let (col, row) = coordinates.to_offset();
        if col < 0 || col >= self.width || row < 0 || row >= self.height {
            return None;
        }
        Some((row * self.width + col) as usize)
    }

    /// Arena index of a cell's neighbor across an edge.
    pub fn neighbor(&self, index: usize, direction: HexDirection) -> Option<usize> {
        self.cells[index].neighbor(direction)
    }

    /// Edge classification toward a neighbor, `None` at the map border.
    pub fn edge_type(&self, index: usize, direction: HexDirection) -> Option<HexEdgeType> {
        self.neighbor(index, direction)
            .map(|n| edge_type(self.cells[index].elevation, self.cells[n].elevation))
    }

    /// Shared geometry oracle.
    pub fn metrics(&self) -> &HexMetrics {
        &self.metrics
    }

    /// Number of rendering chunks.
    pub fn chunk_count(&self) -> usize {
        (self.chunks_x * self.chunks_z) as usize
    }

    /// Arena indices of every cell in a chunk, in arena order.
    pub fn chunk_cells(&self, chunk: usize) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|c| c.chunk() == chunk)
            .map(HexCell::index)
            .collect()
    }

    // ── Dirty batching ─────────────────────────────────────────────

    /// True when edits are waiting to be repainted.
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drains all pending repaint work.
    pub fn take_dirty(&mut self) -> DirtyBatch {
        self.dirty.take()
    }

    // ── Setters ────────────────────────────────────────────────────

    /// Sets a cell's elevation, revalidating rivers and dropping any road
    /// whose edge becomes a cliff.
    pub fn set_elevation(&mut self, index: usize, elevation: i32) {
        if self.cells[index].elevation == elevation {
            return;
        }
        self.cells[index].elevation = elevation;
        self.refresh_position(index);
        self.validate_rivers(index);
        for d in HexDirection::ALL {
            if self.cells[index].has_road_through_edge(d)
                && let Some(n) = self.cells[index].neighbor(d)
                && (self.cells[index].elevation - self.cells[n].elevation).abs() > 1
            {
                self.set_road(index, d, false);
            }
        }
        self.refresh(index);
    }

    /// Sets a cell's water level, revalidating rivers against the new
    /// lake surface.
    pub fn set_water_level(&mut self, index: usize, water_level: i32) {
        if self.cells[index].water_level == water_level {
            return;
        }
        self.cells[index].water_level = water_level;
        self.validate_rivers(index);
        self.refresh(index);
    }

    /// Recolors a cell. Geometry is unaffected, so only the color blend
    /// has to be redone.
    pub fn set_terrain_type_index(&mut self, index: usize, terrain_type_index: u8) {
        if self.cells[index].terrain_type_index == terrain_type_index {
            return;
        }
        self.cells[index].terrain_type_index = terrain_type_index;
        self.dirty.mark_recolored(index);
    }

    /// Sets the urban feature level.
    pub fn set_urban_level(&mut self, index: usize, level: u8) {
        if self.cells[index].urban_level == level {
            return;
        }
        self.cells[index].urban_level = level;
        self.refresh_self_only(index);
    }

    /// Sets the farm feature level.
    pub fn set_farm_level(&mut self, index: usize, level: u8) {
        if self.cells[index].farm_level == level {
            return;
        }
        self.cells[index].farm_level = level;
        self.refresh_self_only(index);
    }

    /// Sets the plant feature level.
    pub fn set_plant_level(&mut self, index: usize, level: u8) {
        if self.cells[index].plant_level == level {
            return;
        }
        self.cells[index].plant_level = level;
        self.refresh_self_only(index);
    }

    /// Places a special feature. Rejected while a river runs through the
    /// cell; placing one removes all roads from the cell.
    pub fn set_special_index(&mut self, index: usize, special_index: u8) {
        if self.cells[index].special_index == special_index || self.cells[index].has_river() {
            return;
        }
        self.cells[index].special_index = special_index;
        self.remove_roads(index);
        self.refresh_self_only(index);
    }

    /// Toggles the wall around a cell. Walls sit on edges, so neighbors
    /// repaint too.
    pub fn set_walled(&mut self, index: usize, walled: bool) {
        if self.cells[index].walled == walled {
            return;
        }
        self.cells[index].walled = walled;
        self.refresh(index);
    }

    // ── Rivers ─────────────────────────────────────────────────────

    /// Starts (or redirects) a river flowing out of a cell.
    ///
    /// Ignored when no neighbor exists across the edge or the destination
    /// is not downhill (a lake surface level with the destination also
    /// counts as reachable). Success clears any special feature on both
    /// endpoints and removes a road on the edge.
    pub fn set_outgoing_river(&mut self, index: usize, direction: HexDirection) {
        if self.cells[index].has_outgoing_river && self.cells[index].outgoing_river == direction {
            return;
        }
        let Some(neighbor) = self.cells[index].neighbor(direction) else {
            return;
        };
        if !self.is_valid_river_destination(index, neighbor) {
            return;
        }

        self.remove_outgoing_river(index);
        if self.cells[index].has_incoming_river && self.cells[index].incoming_river == direction {
            self.remove_incoming_river(index);
        }
        self.cells[index].has_outgoing_river = true;
        self.cells[index].outgoing_river = direction;
        self.cells[index].special_index = 0;

        self.remove_incoming_river(neighbor);
        self.cells[neighbor].has_incoming_river = true;
        self.cells[neighbor].incoming_river = direction.opposite();
        self.cells[neighbor].special_index = 0;

        self.set_road(index, direction, false);
    }

    /// Removes the river flowing out of a cell, clearing the matching
    /// incoming flag on the far side.
    pub fn remove_outgoing_river(&mut self, index: usize) {
        if !self.cells[index].has_outgoing_river {
            return;
        }
        self.cells[index].has_outgoing_river = false;
        self.refresh_self_only(index);
        if let Some(n) = self.cells[index].neighbor(self.cells[index].outgoing_river) {
            self.cells[n].has_incoming_river = false;
            self.refresh_self_only(n);
        }
    }

    /// Removes the river flowing into a cell, clearing the matching
    /// outgoing flag on the far side.
    pub fn remove_incoming_river(&mut self, index: usize) {
        if !self.cells[index].has_incoming_river {
            return;
        }
        self.cells[index].has_incoming_river = false;
        self.refresh_self_only(index);
        if let Some(n) = self.cells[index].neighbor(self.cells[index].incoming_river) {
            self.cells[n].has_outgoing_river = false;
            self.refresh_self_only(n);
        }
    }

    /// Removes both river halves from a cell.
    pub fn remove_river(&mut self, index: usize) {
        self.remove_outgoing_river(index);
        self.remove_incoming_river(index);
    }

    fn is_valid_river_destination(&self, from: usize, to: usize) -> bool {
        let src = &self.cells[from];
        let dst = &self.cells[to];
        src.elevation() >= dst.elevation() || src.water_level() == dst.elevation()
    }

    /// Drops river halves that the current elevations and water levels no
    /// longer support.
    fn validate_rivers(&mut self, index: usize) {
        if self.cells[index].has_outgoing_river {
            let ok = self.cells[index]
                .neighbor(self.cells[index].outgoing_river)
                .is_some_and(|n| self.is_valid_river_destination(index, n));
            if !ok {
                self.remove_outgoing_river(index);
            }
        }
        if self.cells[index].has_incoming_river {
            let ok = self.cells[index]
                .neighbor(self.cells[index].incoming_river)
                .is_some_and(|n| self.is_valid_river_destination(n, index));
            if !ok {
                self.remove_incoming_river(index);
            }
        }
    }

    // ── Roads ──────────────────────────────────────────────────────

    /// Lays a road across an edge. Ignored when the edge already carries
    /// one, a river crosses it, either endpoint is special, the neighbor
    /// is missing, or the edge is a cliff.
    pub fn add_road(&mut self, index: usize, direction: HexDirection) {
        if self.cells[index].has_road_through_edge(direction)
            || self.cells[index].has_river_through_edge(direction)
            || self.cells[index].is_special()
        {
            return;
        }
        let Some(neighbor) = self.cells[index].neighbor(direction) else {
            return;
        };
        if self.cells[neighbor].is_special()
            || (self.cells[index].elevation() - self.cells[neighbor].elevation()).abs() > 1
        {
            return;
        }
        self.set_road(index, direction, true);
    }

    /// Removes every road touching a cell.
    pub fn remove_roads(&mut self, index: usize) {
        for d in HexDirection::ALL {
            if self.cells[index].has_road_through_edge(d) {
                self.set_road(index, d, false);
            }
        }
    }

    fn set_road(&mut self, index: usize, direction: HexDirection, state: bool) {
        self.cells[index].roads[direction.index()] = state;
        if let Some(n) = self.cells[index].neighbor(direction) {
            self.cells[n].roads[direction.opposite().index()] = state;
            self.refresh_self_only(n);
        }
        self.refresh_self_only(index);
    }

    // ── Occupants ──────────────────────────────────────────────────

    /// Records which unit stands on a cell. A weak id only; the unit
    /// layer owns spawning and placement.
    pub fn set_unit(&mut self, index: usize, unit: Option<u64>) {
        self.cells[index].unit = unit;
    }

    // ── Repaint plumbing ───────────────────────────────────────────

    /// Full repaint: the cell's own chunk plus every neighbor chunk that
    /// shares the affected border.
    fn refresh(&mut self, index: usize) {
        let chunk = self.cells[index].chunk();
        self.dirty.mark_chunk(chunk);
        for d in HexDirection::ALL {
            if let Some(n) = self.cells[index].neighbor(d) {
                let neighbor_chunk = self.cells[n].chunk();
                if neighbor_chunk != chunk {
                    self.dirty.mark_chunk(neighbor_chunk);
                }
            }
        }
        if self.cells[index].unit().is_some() {
            self.dirty.mark_unit_stale(index);
        }
    }

    /// Repaint confined to the cell's own chunk.
    fn refresh_self_only(&mut self, index: usize) {
        self.dirty.mark_chunk(self.cells[index].chunk());
        if self.cells[index].unit().is_some() {
            self.dirty.mark_unit_stale(index);
        }
    }

    /// Recomputes the cell's world position from its elevation.
    fn refresh_position(&mut self, index: usize) {
        let planar = self.metrics.cell_center(self.cells[index].coordinates());
        let y = self.metrics.perturbed_height(self.cells[index].elevation(), planar);
        self.cells[index].position = Vec3::new(planar.x, y, planar.y);
    }

    // ── Persistence glue ───────────────────────────────────────────

    fn apply_record(&mut self, index: usize, record: &CellRecord) {
        let cell = &mut self.cells[index];
        cell.terrain_type_index = record.terrain_type_index;
        cell.elevation = i32::from(record.elevation);
        cell.water_level = i32::from(record.water_level);
        cell.urban_level = record.urban_level;
        cell.farm_level = record.farm_level;
        cell.plant_level = record.plant_level;
        cell.special_index = record.special_index;
        cell.walled = record.walled;
        if let Some(d) = record.incoming_river {
            cell.has_incoming_river = true;
            cell.incoming_river = d;
        }
        if let Some(d) = record.outgoing_river {
            cell.has_outgoing_river = true;
            cell.outgoing_river = d;
        }
        for d in HexDirection::ALL {
            cell.roads[d.index()] = record.roads & (1 << d.index()) != 0;
        }
        self.refresh_position(index);
        self.dirty.mark_recolored(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HexMap {
        HexMap::new(10, 10, 42)
    }

    fn dir_to(map: &HexMap, from: usize, to: usize) -> HexDirection {
        HexDirection::ALL
            .into_iter()
            .find(|&d| map.neighbor(from, d) == Some(to))
            .expect("cells are not adjacent")
    }

    fn idx(map: &HexMap, col: i32, row: i32) -> usize {
        map.cell_at(HexCoordinates::from_offset(col, row))
            .expect("offset out of range")
    }

    #[test]
    fn neighbors_are_symmetric() {
        let m = map();
        for i in 0..m.len() {
            for d in HexDirection::ALL {
                if let Some(n) = m.neighbor(i, d) {
                    assert_eq!(m.neighbor(n, d.opposite()), Some(i));
                }
            }
        }
    }

    #[test]
    fn cell_at_rejects_out_of_range() {
        let m = map();
        assert_eq!(m.cell_at(HexCoordinates::from_offset(0, 0)), Some(0));
        assert_eq!(m.cell_at(HexCoordinates::from_offset(9, 9)), Some(99));
        assert_eq!(m.cell_at(HexCoordinates::from_offset(-1, 0)), None);
        assert_eq!(m.cell_at(HexCoordinates::from_offset(10, 0)), None);
        assert_eq!(m.cell_at(HexCoordinates::from_offset(0, 10)), None);
    }

    #[test]
    fn construction_leaves_no_pending_work() {
        let m = map();
        assert!(!m.has_dirty());
        for i in 0..m.len() {
            assert_eq!(m.cell(i).elevation(), 0);
        }
    }

    #[test]
    fn noop_edits_stay_silent() {
        let mut m = map();
        m.set_elevation(7, 0);
        m.set_water_level(7, 0);
        m.set_terrain_type_index(7, 0);
        m.set_urban_level(7, 0);
        m.set_walled(7, false);
        assert!(!m.has_dirty());
    }

    #[test]
    fn elevation_change_repaints_bordering_chunks() {
        let mut m = map();
        // Column 4 row 0 sits on the border between chunks 0 and 1.
        let border = idx(&m, 4, 0);
        m.set_elevation(border, 2);
        let batch = m.take_dirty();
        assert!(batch.chunks.contains(&0));
        assert!(batch.chunks.contains(&1));

        // An interior cell repaints its own chunk only.
        let interior = idx(&m, 1, 1);
        m.set_elevation(interior, 2);
        let batch = m.take_dirty();
        assert_eq!(batch.chunks.len(), 1);
        assert!(batch.chunks.contains(&0));
    }

    #[test]
    fn recoloring_skips_geometry_rebuild() {
        let mut m = map();
        m.set_terrain_type_index(13, 3);
        let batch = m.take_dirty();
        assert!(batch.chunks.is_empty());
        assert_eq!(batch.recolored.len(), 1);
        assert!(batch.recolored.contains(&13));
    }

    #[test]
    fn feature_levels_repaint_own_chunk_only() {
        let mut m = map();
        let border = idx(&m, 4, 0);
        m.set_urban_level(border, 2);
        m.set_farm_level(border, 1);
        m.set_plant_level(border, 3);
        let batch = m.take_dirty();
        assert_eq!(batch.chunks.len(), 1);
        assert!(batch.chunks.contains(&m.cell(border).chunk()));
    }

    #[test]
    fn river_needs_a_downhill_destination() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        m.set_elevation(b, 2);
        let _ = m.take_dirty();

        m.set_outgoing_river(a, dir_to(&m, a, b));
        assert!(!m.cell(a).has_river());
        assert!(!m.cell(b).has_river());
        assert!(!m.has_dirty());
    }

    #[test]
    fn river_links_both_endpoints() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        m.set_elevation(a, 2);
        let d = dir_to(&m, a, b);
        m.set_outgoing_river(a, d);

        assert!(m.cell(a).has_outgoing_river());
        assert_eq!(m.cell(a).outgoing_river(), d);
        assert!(m.cell(b).has_incoming_river());
        assert_eq!(m.cell(b).incoming_river(), d.opposite());
    }

    #[test]
    fn lake_surface_reaches_a_level_destination() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        m.set_elevation(b, 2);
        m.set_water_level(a, 2);
        m.set_outgoing_river(a, dir_to(&m, a, b));
        assert!(m.cell(a).has_outgoing_river());
        assert!(m.cell(b).has_incoming_river());
    }

    #[test]
    fn lowering_the_source_removes_the_river() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        m.set_elevation(a, 3);
        m.set_elevation(b, 1);
        m.set_outgoing_river(a, dir_to(&m, a, b));
        assert!(m.cell(a).has_outgoing_river());

        m.set_elevation(a, 0);
        assert!(!m.cell(a).has_outgoing_river());
        assert!(!m.cell(b).has_incoming_river());
    }

    #[test]
    fn new_outgoing_river_replaces_the_old_one() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let c = m.neighbor(a, HexDirection::W).unwrap();
        m.set_elevation(a, 2);
        m.set_outgoing_river(a, dir_to(&m, a, b));
        m.set_outgoing_river(a, dir_to(&m, a, c));

        assert_eq!(m.cell(a).outgoing_river(), dir_to(&m, a, c));
        assert!(!m.cell(b).has_incoming_river());
        assert!(m.cell(c).has_incoming_river());
    }

    #[test]
    fn reversing_flow_through_the_source_drops_the_incoming_half() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let d = dir_to(&m, a, b);
        m.set_outgoing_river(a, d);
        assert!(m.cell(b).has_incoming_river());

        // Flat ground, so b may flow back toward a; its incoming half from
        // a must vanish rather than form a two-way edge.
        m.set_outgoing_river(b, d.opposite());
        assert!(m.cell(b).has_outgoing_river());
        assert!(!m.cell(b).has_incoming_river());
        assert!(m.cell(a).has_incoming_river());
        assert!(!m.cell(a).has_outgoing_river());
    }

    #[test]
    fn river_evicts_the_road_on_its_edge() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let d = dir_to(&m, a, b);
        m.add_road(a, d);
        assert!(m.cell(a).has_road_through_edge(d));

        m.set_outgoing_river(a, d);
        assert!(!m.cell(a).has_road_through_edge(d));
        assert!(!m.cell(b).has_road_through_edge(d.opposite()));
    }

    #[test]
    fn road_refuses_river_edges_and_cliffs() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let d = dir_to(&m, a, b);
        m.set_outgoing_river(a, d);
        m.add_road(a, d);
        assert!(!m.cell(a).has_road_through_edge(d));

        let c = m.neighbor(a, HexDirection::W).unwrap();
        let dc = dir_to(&m, a, c);
        m.set_elevation(c, 2);
        m.add_road(a, dc);
        assert!(!m.cell(a).has_road_through_edge(dc));

        // A slope is fine.
        m.set_elevation(c, 1);
        m.add_road(a, dc);
        assert!(m.cell(a).has_road_through_edge(dc));
        assert!(m.cell(c).has_road_through_edge(dc.opposite()));
    }

    #[test]
    fn special_feature_excludes_rivers_and_roads() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let d = dir_to(&m, a, b);

        // A riverside cell rejects the feature outright.
        m.set_outgoing_river(a, d);
        m.set_special_index(a, 2);
        assert!(!m.cell(a).is_special());

        // Without the river it lands and strips the roads.
        m.remove_river(a);
        m.add_road(a, d);
        m.set_special_index(a, 2);
        assert!(m.cell(a).is_special());
        assert!(!m.cell(a).has_roads());
        assert!(!m.cell(b).has_road_through_edge(d.opposite()));

        // And a new river clears the feature from both endpoints.
        m.set_outgoing_river(a, d);
        assert!(!m.cell(a).is_special());
    }

    #[test]
    fn elevation_cascade_drops_only_the_offending_road() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let c = m.neighbor(a, HexDirection::W).unwrap();
        let db = dir_to(&m, a, b);
        let dc = dir_to(&m, a, c);
        m.add_road(a, db);
        m.add_road(a, dc);

        m.set_elevation(b, 2);
        assert!(!m.cell(a).has_road_through_edge(db));
        assert!(m.cell(a).has_road_through_edge(dc));
    }

    #[test]
    fn occupied_cells_report_stale_units_on_height_change() {
        let mut m = map();
        let a = idx(&m, 2, 2);
        m.set_unit(a, Some(7));
        assert_eq!(m.cell(a).unit(), Some(7));

        m.set_elevation(a, 3);
        let batch = m.take_dirty();
        assert!(batch.stale_units.contains(&a));

        m.set_unit(a, None);
        m.set_elevation(a, 1);
        let batch = m.take_dirty();
        assert!(batch.stale_units.is_empty());
    }

    #[test]
    fn repeated_edits_are_idempotent() {
        let mut m = map();
        let a = idx(&m, 3, 3);
        let b = m.neighbor(a, HexDirection::E).unwrap();
        let d = dir_to(&m, a, b);

        m.add_road(a, d);
        let _ = m.take_dirty();
        m.add_road(a, d);
        assert!(!m.has_dirty());
        assert!(m.cell(a).has_road_through_edge(d));

        m.set_outgoing_river(a, d);
        let _ = m.take_dirty();
        m.set_outgoing_river(a, d);
        assert!(!m.has_dirty());

        m.remove_river(a);
        assert!(!m.cell(a).has_river());
        assert!(!m.cell(b).has_river());
        let _ = m.take_dirty();
        m.remove_river(a);
        assert!(!m.has_dirty());
    }

    #[test]
    fn chunks_partition_the_arena() {
        let m = HexMap::new(12, 7, 1);
        // 12x7 cells at 5x5 per chunk is a 3x2 chunk grid.
        assert_eq!(m.chunk_count(), 6);
        let mut total = 0;
        for chunk in 0..m.chunk_count() {
            let cells = m.chunk_cells(chunk);
            assert!(!cells.is_empty());
            for &i in &cells {
                assert_eq!(m.cell(i).chunk(), chunk);
            }
            total += cells.len();
        }
        assert_eq!(total, m.len());
    }

    #[test]
    fn degenerate_dimensions_yield_an_empty_map() {
        for (w, h) in [(-5, 10), (0, 4), (3, -1), (0, 0)] {
            let m = HexMap::new(w, h, 1);
            assert!(m.is_empty(), "{w}x{h} should hold no cells");
            assert_eq!(m.chunk_count(), 0);
            assert_eq!(m.cell_at(HexCoordinates::from_offset(0, 0)), None);
        }
    }

    #[test]
    fn same_seed_reproduces_positions() {
        let a = HexMap::new(8, 8, 99);
        let b = HexMap::new(8, 8, 99);
        for i in 0..a.len() {
            assert_eq!(a.cell(i).position(), b.cell(i).position());
        }
    }

    #[test]
    fn elevation_changes_the_vertical_position_only() {
        let mut m = map();
        let before = m.cell(5).position();
        m.set_elevation(5, 4);
        let after = m.cell(5).position();
        assert_eq!(before.x, after.x);
        assert_eq!(before.z, after.z);
        assert!(after.y > before.y);
    }
}
