use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use bevy_egui::egui;

use super::MapConfig;
use super::entities::{ChunkEntities, MapChunk, MapIoRes, MapUnit, TerrainMaterial, WorldMap};
use super::grid::HexMap;
use super::mesh::MeshData;
use super::serial;
use crate::coords::{HexCoordinates, HexDirection};
use crate::math;
use crate::metrics::HexEdgeType;

/// Unit marker height; anchors lift by half of it.
const UNIT_SIZE: f32 = 6.0;

// ── Startup: generation ────────────────────────────────────────────

/// Builds the initial map from noise, spawns its chunk meshes, and places
/// a few units. Everything goes through the public setters, so the result
/// satisfies the same invariants as hand-edited terrain.
pub fn generate_map(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<MapConfig>,
) {
    let mut map = HexMap::new(cfg.width, cfg.height, cfg.seed);
    debug_assert!(!map.is_empty());

    shape_terrain(&mut map, &cfg);
    carve_rivers(&mut map, cfg.generation.river_count);
    lay_roads(&mut map);
    place_features(&mut map);

    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });
    let chunk_meshes = spawn_chunks(&mut commands, &mut meshes, &map, &material);

    spawn_units(
        &mut commands,
        &mut meshes,
        &mut materials,
        &mut map,
        cfg.generation.unit_count,
    );

    // Generation dirtied every chunk; the spawn above already painted them.
    let _ = map.take_dirty();
    debug_assert!(!map.has_dirty());

    info!(
        "generated {}x{} map, {} chunks",
        cfg.width,
        cfg.height,
        map.chunk_count()
    );

    commands.insert_resource(WorldMap { map });
    commands.insert_resource(ChunkEntities {
        meshes: chunk_meshes,
    });
    commands.insert_resource(TerrainMaterial(material));
}

fn shape_terrain(map: &mut HexMap, cfg: &MapConfig) {
    let fbm: Fbm<Perlin> = Fbm::new(cfg.seed).set_octaves(cfg.generation.octaves);
    let scale = cfg.generation.noise_scale;
    for i in 0..map.len() {
        let pos = map.cell(i).position();
        let sample = [f64::from(pos.x) / scale, f64::from(pos.z) / scale];
        let height = fbm.get(sample);
        let elevation =
            math::map_noise_to_range(height, 0.0, cfg.generation.max_elevation as f32) as i32;
        map.set_elevation(i, elevation);
        map.set_water_level(i, cfg.generation.water_level);

        let terrain = if map.cell(i).is_underwater() {
            2 // mud under the water line
        } else {
            match elevation - cfg.generation.water_level {
                ..=0 => 0,
                1 | 2 => 1,
                3 => 3,
                _ => 4,
            }
        };
        map.set_terrain_type_index(i, terrain);

        // Vegetation and settlement from offset noise bands, dry land only.
        if !map.cell(i).is_underwater() && terrain == 1 {
            let detail = fbm.get([sample[0] + 100.0, sample[1] - 100.0]);
            map.set_plant_level(i, math::map_noise_to_range(detail, 0.0, 3.9) as u8);
            let farms = fbm.get([sample[0] - 50.0, sample[1] + 50.0]);
            map.set_farm_level(i, math::map_noise_to_range(farms, 0.0, 2.9) as u8);
        }
    }
}

/// Springs rivers from the highest cells and walks them downhill until
/// they reach water, merge into an existing river, or peter out on flat
/// ground.
fn carve_rivers(map: &mut HexMap, count: usize) {
    let mut springs: Vec<usize> = (0..map.len()).collect();
    springs.sort_by_key(|&i| std::cmp::Reverse(map.cell(i).elevation()));
    springs.truncate(count);

    for spring in springs {
        let mut current = spring;
        for _ in 0..map.len() {
            if map.cell(current).is_underwater() {
                break;
            }
            let Some(direction) = downhill_direction(map, current) else {
                break;
            };
            map.set_outgoing_river(current, direction);
            if !map.cell(current).has_outgoing_river() {
                break;
            }
            let Some(next) = map.neighbor(current, direction) else {
                break;
            };
            if map.cell(next).has_outgoing_river() {
                // Joined an existing river.
                break;
            }
            current = next;
        }
    }
}

fn downhill_direction(map: &HexMap, index: usize) -> Option<HexDirection> {
    let cell = map.cell(index);
    let (direction, lowest) = HexDirection::ALL
        .into_iter()
        .filter(|&d| !(cell.has_incoming_river() && cell.incoming_river() == d))
        .filter_map(|d| cell.neighbor(d).map(|n| (d, n)))
        .min_by_key(|&(_, n)| map.cell(n).elevation())?;
    let target = map.cell(lowest);
    if target.elevation() > cell.elevation() && cell.water_level() != target.elevation() {
        return None;
    }
    // A river that cannot drop and has no water to reach dries up here.
    if cell.edge_type_to(target) == HexEdgeType::Flat && !target.is_underwater() {
        return None;
    }
    Some(direction)
}

/// Runs a road along the middle row, skipping cliffs and river edges.
fn lay_roads(map: &mut HexMap) {
    let row = map.height() / 2;
    for col in 0..map.width() - 1 {
        let Some(i) = map.cell_at(HexCoordinates::from_offset(col, row)) else {
            continue;
        };
        let Some(j) = map.cell_at(HexCoordinates::from_offset(col + 1, row)) else {
            continue;
        };
        let Some(direction) = HexDirection::ALL
            .into_iter()
            .find(|&d| map.neighbor(i, d) == Some(j))
        else {
            continue;
        };
        if map.edge_type(i, direction) != Some(HexEdgeType::Cliff) {
            map.add_road(i, direction);
        }
    }
}

/// Scatters walled special features over dry, riverless cells and raises
/// the urban level where roads already run.
fn place_features(map: &mut HexMap) {
    for i in (0..map.len()).step_by(23) {
        let cell = map.cell(i);
        if cell.is_underwater() || cell.has_river() {
            continue;
        }
        if cell.has_roads() {
            map.set_urban_level(i, 2);
            continue;
        }
        map.set_special_index(i, 1 + (i % 3) as u8);
        map.set_walled(i, i % 2 == 0);
    }
}

fn spawn_units(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    map: &mut HexMap,
    count: usize,
) {
    let unit_mesh = meshes.add(Cuboid::new(UNIT_SIZE / 2.0, UNIT_SIZE, UNIT_SIZE / 2.0));
    let unit_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.85, 0.2, 0.25),
        ..default()
    });

    let stride = (map.len() / (count + 1)).max(1);
    let mut id = 0u64;
    for i in (stride..map.len()).step_by(stride) {
        if id as usize >= count {
            break;
        }
        if map.cell(i).is_special() || map.cell(i).unit().is_some() {
            continue;
        }
        id += 1;
        map.set_unit(i, Some(id));
        commands.spawn((
            MapUnit { id, cell: i },
            Name::new(format!("Unit{id}")),
            Mesh3d(unit_mesh.clone()),
            MeshMaterial3d(unit_material.clone()),
            Transform::from_translation(unit_anchor(map, i)),
        ));
    }
}

/// World anchor for a unit on a cell: terrain height, or the water
/// surface when the cell is flooded.
fn unit_anchor(map: &HexMap, index: usize) -> Vec3 {
    let cell = map.cell(index);
    let mut pos = cell.position();
    if cell.is_underwater() {
        pos.y = cell.water_surface_y();
    }
    pos + Vec3::Y * (UNIT_SIZE / 2.0)
}

fn spawn_chunks(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    map: &HexMap,
    material: &Handle<StandardMaterial>,
) -> Vec<Handle<Mesh>> {
    let mut handles = Vec::with_capacity(map.chunk_count());
    for chunk in 0..map.chunk_count() {
        let cells = map.chunk_cells(chunk);
        let handle = meshes.add(MeshData::triangulate(map, &cells).into_mesh());
        commands.spawn((
            MapChunk { index: chunk },
            Name::new(format!("MapChunk{chunk}")),
            Mesh3d(handle.clone()),
            MeshMaterial3d(material.clone()),
        ));
        handles.push(handle);
    }
    handles
}

// ── Update: repaint ────────────────────────────────────────────────

/// Drains the map's dirty batch once per frame: rebuilds stale chunk
/// meshes in place and re-anchors units whose ground moved. Recolored
/// cells pull in their neighbor chunks too, since the corner blend reads
/// colors across chunk borders.
pub fn flush_dirty_chunks(
    mut world_map: ResMut<WorldMap>,
    chunk_entities: Res<ChunkEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut units: Query<(&MapUnit, &mut Transform)>,
) {
    let batch = world_map.map.take_dirty();
    if batch.is_empty() {
        return;
    }

    let map = &world_map.map;
    let mut chunks = batch.chunks;
    for &cell in &batch.recolored {
        chunks.insert(map.cell(cell).chunk());
        for d in HexDirection::ALL {
            if let Some(n) = map.neighbor(cell, d) {
                chunks.insert(map.cell(n).chunk());
            }
        }
    }

    for chunk in chunks {
        if let Some(handle) = chunk_entities.meshes.get(chunk) {
            let cells = map.chunk_cells(chunk);
            let mesh = MeshData::triangulate(map, &cells).into_mesh();
            if let Err(err) = meshes.insert(handle.id(), mesh) {
                error!("failed to repaint chunk {chunk}: {err}");
            }
        }
    }

    for (unit, mut transform) in &mut units {
        if batch.stale_units.contains(&unit.cell) {
            transform.translation = unit_anchor(map, unit.cell);
        }
    }
}

// ── Update: editing ────────────────────────────────────────────────

/// Keyboard terrain edits: E erodes the highest cell, F floods the map
/// center one level, G drains it again, R removes the center river.
pub fn edit_hotkeys(
    keys: Res<ButtonInput<KeyCode>>,
    mut world_map: ResMut<WorldMap>,
    cfg: Res<MapConfig>,
) {
    let map = &mut world_map.map;
    if keys.just_pressed(KeyCode::KeyE)
        && let Some(peak) = (0..map.len()).max_by_key(|&i| map.cell(i).elevation())
    {
        map.set_elevation(peak, map.cell(peak).elevation() - 1);
    }

    let center = HexCoordinates::from_offset(cfg.width / 2, cfg.height / 2);
    let Some(center) = map.cell_at(center) else {
        return;
    };
    if keys.just_pressed(KeyCode::KeyF) {
        map.set_water_level(center, map.cell(center).water_level() + 1);
    }
    if keys.just_pressed(KeyCode::KeyG) {
        map.set_water_level(center, (map.cell(center).water_level() - 1).max(0));
    }
    if keys.just_pressed(KeyCode::KeyR) {
        map.remove_river(center);
    }
}

// ── Update: persistence ────────────────────────────────────────────

/// F5 saves the map to the configured path; F9 loads it back. A failed
/// load logs the error and leaves the current map untouched, since the
/// file is fully decoded before anything is replaced.
pub fn save_load_hotkeys(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    mut world_map: ResMut<WorldMap>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut chunk_entities: ResMut<ChunkEntities>,
    io: MapIoRes,
) {
    if keys.just_pressed(KeyCode::F5) {
        match save_map(&world_map.map, &io.cfg.save_path) {
            Ok(()) => info!("saved map to {}", io.cfg.save_path),
            Err(err) => error!("failed to save map to {}: {err}", io.cfg.save_path),
        }
    }

    if keys.just_pressed(KeyCode::F9) {
        let file = match load_map(&io.cfg.save_path) {
            Ok(file) => file,
            Err(err) => {
                error!("failed to load map from {}: {err}", io.cfg.save_path);
                return;
            }
        };

        let mut map = HexMap::from_map_file(&file, io.cfg.seed);
        let _ = map.take_dirty();

        for entity in io.chunks.iter().chain(io.units.iter()) {
            commands.entity(entity).despawn();
        }
        chunk_entities.meshes = spawn_chunks(&mut commands, &mut meshes, &map, &io.material.0);
        world_map.map = map;
        info!(
            "loaded {}x{} map (format v{}) from {}",
            file.width, file.height, file.version, io.cfg.save_path
        );
    }
}

fn save_map(map: &HexMap, path: &str) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serial::write_map(map, &mut writer)?;
    writer.flush()
}

fn load_map(path: &str) -> Result<serial::MapFile, serial::MapLoadError> {
    let file = File::open(path)?;
    serial::read_map(&mut BufReader::new(file))
}

// ── Update: debug overlay ──────────────────────────────────────────

/// Draws each nearby cell's cube coordinates as a screen-projected egui
/// label while the inspector is open.
pub fn draw_cell_labels(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<crate::ViewCamera>>,
    world_map: Res<WorldMap>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let cam_pos = cam_gt.translation();

    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());

    let map = &world_map.map;
    for i in 0..map.len() {
        let world_pos = map.cell(i).position();
        if cam_pos.distance(world_pos) > 260.0 {
            continue;
        }
        if let Ok(viewport) = camera.world_to_viewport(cam_gt, world_pos) {
            painter.text(
                egui::pos2(viewport.x, viewport.y),
                egui::Align2::CENTER_CENTER,
                map.cell(i).coordinates().to_string(),
                egui::FontId::proportional(11.0),
                egui::Color32::WHITE,
            );
        }
    }
}
