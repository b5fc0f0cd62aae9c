use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::MapConfig;
use super::grid::HexMap;

/// The live map, wrapped as a resource so systems can edit it.
///
/// All terrain state lives in the [`HexMap`] arena; ECS entities only
/// mirror it for rendering.
#[derive(Resource)]
pub struct WorldMap {
    /// The cell arena and its edit rules.
    pub map: HexMap,
}

/// Marker on a spawned chunk mesh entity.
#[derive(Component, Reflect)]
pub struct MapChunk {
    /// Which chunk of the map this entity renders.
    pub index: usize,
}

/// Mesh handles per chunk, indexed by chunk number, so repaints can
/// replace asset contents in place instead of respawning entities.
#[derive(Resource, Default)]
pub struct ChunkEntities {
    /// One mesh handle per chunk.
    pub meshes: Vec<Handle<Mesh>>,
}

/// Shared material for every chunk mesh; vertex colors carry the terrain.
#[derive(Resource)]
pub struct TerrainMaterial(pub Handle<StandardMaterial>);

/// A unit standing on the map.
#[derive(Component, Reflect)]
pub struct MapUnit {
    /// Stable id mirrored into the occupied cell.
    pub id: u64,
    /// Arena index of the occupied cell.
    pub cell: usize,
}

/// Bundled parameters for the save/load system.
#[derive(SystemParam)]
pub struct MapIoRes<'w, 's> {
    /// Map configuration (save path, seed).
    pub cfg: Res<'w, MapConfig>,
    /// Shared chunk material.
    pub material: Res<'w, TerrainMaterial>,
    /// Spawned chunk entities, despawned on a successful load.
    pub chunks: Query<'w, 's, Entity, With<MapChunk>>,
    /// Spawned unit entities, despawned on a successful load.
    pub units: Query<'w, 's, Entity, With<MapUnit>>,
}
