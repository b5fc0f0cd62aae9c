#![warn(missing_docs)]
//! Hexagonal terrain map editor core.
//!
//! Generates a chunked hex map with elevations, water, rivers, roads, and
//! features, renders it with per-vertex terrain blending, and saves or
//! loads it as a versioned binary file.

mod coords;
mod map;
pub mod math;
mod metrics;

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use coords::HexCoordinates;
use metrics::HexMetrics;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Normal operation — terrain editing and viewing.
    #[default]
    Running,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}

/// Marker on the map view camera; the label overlay projects through it.
#[derive(Component, Reflect)]
pub struct ViewCamera;

/// Command line options, native builds only.
#[cfg(feature = "native")]
#[derive(clap::Parser)]
#[command(about = "Hexagonal terrain map editor core")]
struct Args {
    /// Map width in cells.
    #[arg(long)]
    width: Option<i32>,
    /// Map height in cells.
    #[arg(long)]
    height: Option<i32>,
    /// Noise seed for generation and vertex perturbation.
    #[arg(long)]
    seed: Option<u32>,
    /// Save/load file path.
    #[arg(long)]
    path: Option<String>,
}

#[cfg(feature = "native")]
fn map_config() -> map::MapConfig {
    use clap::Parser;
    let args = Args::parse();
    let mut cfg = map::MapConfig::default();
    if let Some(width) = args.width {
        cfg.width = width;
    }
    if let Some(height) = args.height {
        cfg.height = height;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(path) = args.path {
        cfg.save_path = path;
    }
    cfg
}

#[cfg(not(feature = "native"))]
fn map_config() -> map::MapConfig {
    map::MapConfig::default()
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Map".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .register_type::<ViewCamera>()
    .init_state::<GameState>()
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(map::MapPlugin(map_config()))
    .add_systems(Startup, setup_view)
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    app.run();
}

/// Spawns the overview camera above the map center and a sun light.
fn setup_view(mut commands: Commands, cfg: Res<map::MapConfig>) {
    let metrics = HexMetrics::new(cfg.seed);
    let center = metrics.cell_center(HexCoordinates::from_offset(cfg.width / 2, cfg.height / 2));
    let target = Vec3::new(center.x, 0.0, center.y);

    commands.spawn((
        ViewCamera,
        Name::new("ViewCamera"),
        Camera3d::default(),
        Transform::from_translation(target + Vec3::new(0.0, 220.0, 170.0))
            .looking_at(target, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 12_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.5, 0.0)),
    ));
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
