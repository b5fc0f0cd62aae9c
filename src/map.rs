//! Hex map: cell arena, edit rules, chunked meshes, and persistence.
//!
//! The map itself is plain data behind invariant-preserving setters
//! ([`grid::HexMap`]); this plugin owns the ECS side of it — generation at
//! startup, batched chunk repaints, edit and save/load hotkeys, and the
//! debug coordinate overlay.

mod cell;
mod dirty;
mod entities;
mod grid;
mod mesh;
mod serial;
mod systems;

use bevy::prelude::*;

use crate::GameState;
use entities::WorldMap;

/// Nested configuration for the map subsystem.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct MapConfig {
    /// Map width in cells (offset columns).
    pub width: i32,
    /// Map height in cells (offset rows).
    pub height: i32,
    /// Seed shared by the height noise and the vertex perturbation.
    pub seed: u32,
    /// Path used by the save (F5) and load (F9) hotkeys.
    pub save_path: String,
    /// Terrain generation settings.
    pub generation: GenSettings,
    /// Background clear color.
    pub clear_color: Color,
}

/// Noise-driven generation parameters.
#[derive(Clone, Debug, Reflect)]
pub struct GenSettings {
    /// Number of octaves for the elevation noise.
    pub octaves: usize,
    /// Spatial scale divisor for elevation noise sampling.
    pub noise_scale: f64,
    /// Highest elevation level the generator produces.
    pub max_elevation: i32,
    /// Global water level applied to every cell.
    pub water_level: i32,
    /// Number of rivers sprung from the highest cells.
    pub river_count: usize,
    /// Number of units placed on the fresh map.
    pub unit_count: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 15,
            seed: 1234,
            save_path: "map.hexmap".into(),
            generation: GenSettings {
                octaves: 4,
                noise_scale: 60.0,
                max_elevation: 6,
                water_level: 2,
                river_count: 3,
                unit_count: 3,
            },
            clear_color: Color::srgb(0.12, 0.16, 0.22),
        }
    }
}

/// Map plugin: generation at startup, repaints and hotkeys at runtime.
pub struct MapPlugin(pub MapConfig);

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<MapConfig>()
            .register_type::<entities::MapChunk>()
            .register_type::<entities::MapUnit>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color))
            .add_systems(Startup, systems::generate_map)
            .add_systems(
                Update,
                (
                    systems::edit_hotkeys,
                    systems::save_load_hotkeys,
                    systems::flush_dirty_chunks
                        .after(systems::edit_hotkeys)
                        .after(systems::save_load_hotkeys),
                )
                    .run_if(resource_exists::<WorldMap>),
            )
            .add_systems(
                Update,
                systems::draw_cell_labels
                    .run_if(in_state(GameState::Debugging))
                    .run_if(resource_exists::<WorldMap>),
            );
    }
}
