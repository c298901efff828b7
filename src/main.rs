//! Application entry point: composes the Bevy runtime, core plugins, and window configuration,
//! then defers to the `SketchWorldPlugin` defined in `app.rs`.

mod app;
mod audio;
mod bridge;
mod camera;
mod collision;
mod config;
mod deeplink;
mod input;
mod minimap;
mod movement;
mod parallax;
mod player;
mod state;
mod world;
mod zones;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod wasm;

use app::SketchWorldPlugin;
use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::render::texture::ImagePlugin;
use bevy::window::{Window, WindowResizeConstraints, WindowResolution};

fn main() {
    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    wasm::set_panic_hook();

    // 1280×720 logical pixels matches the backdrop art; resizing is allowed down to a phone-sized
    // landscape view so the touch controls still fit.
    let primary_window = Window {
        title: "Sketch World".to_string(),
        resolution: WindowResolution::new(1280.0, 720.0),
        resizable: true,
        resize_constraints: WindowResizeConstraints {
            min_width: 480.0,
            min_height: 270.0,
            max_width: f32::INFINITY,
            max_height: f32::INFINITY,
        },
        canvas: cfg!(all(target_arch = "wasm32", feature = "web"))
            .then(|| "#sketch-world-canvas".to_owned()),
        fit_canvas_to_parent: true,
        prevent_default_event_handling: false,
        ..default()
    };

    let mut default_plugins = DefaultPlugins
        .set(WindowPlugin {
            primary_window: Some(primary_window),
            ..default()
        })
        .set(ImagePlugin::default_nearest());

    #[cfg(not(target_arch = "wasm32"))]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(true),
            ..default()
        });
    }

    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(false),
            meta_check: bevy::asset::AssetMetaCheck::Never,
            ..default()
        });
    }

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.93, 0.9, 0.84)))
        .add_plugins(default_plugins)
        .add_plugins(SketchWorldPlugin)
        .run();
}
