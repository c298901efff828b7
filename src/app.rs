//! High-level plugin composition.
//!
//! The `SketchWorldPlugin` glues together all domain-specific plugins (world, character, zones,
//! bridge, HUD) and sets up system ordering. Each subsystem owns its own state; this orchestrator
//! merely registers them with the Bevy application.

use bevy::prelude::*;

use crate::audio::GameAudioPlugin;
use crate::bridge::BridgePlugin;
use crate::camera::{CameraPlugin, FollowCamera};
use crate::config::TuningPlugin;
use crate::deeplink::DeepLinkPlugin;
use crate::input::InputPlugin;
use crate::minimap::MinimapPlugin;
use crate::movement::MovementPlugin;
use crate::parallax::ParallaxPlugin;
use crate::player::PlayerPlugin;
use crate::state::{monitor_asset_loading, GameSet, GameState};
use crate::world::WorldPlugin;
use crate::zones::ZonesPlugin;

/// Bundles every scene plugin into a single unit that can be added to the Bevy `App`.
pub struct SketchWorldPlugin;

impl Plugin for SketchWorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            // Tuning first: later plugins read it while building.
            .add_plugins(TuningPlugin)
            .add_plugins((
                WorldPlugin,     // Ground segments, ramp, collision bodies.
                PlayerPlugin,    // Character spawn + animation.
                InputPlugin,     // Keyboard + touch → InputIntent.
                MovementPlugin,  // Jumps, gravity, collision response.
                ZonesPlugin,     // Kiosk proximity + confirm.
                BridgePlugin,    // Scene events out, page commands in, modal pause.
                DeepLinkPlugin,  // ?npc= auto-open.
                ParallaxPlugin,  // Backdrop layers.
                CameraPlugin,    // Camera follow behaviour.
                MinimapPlugin,   // HUD map.
                GameAudioPlugin, // Music lifecycle + mute.
            ))
            // Systems inside these sets execute sequentially while the scene is playing.
            // `chain()` enforces Input → Movement → Effects so every frame reads a consistent
            // intent and position.
            .configure_sets(
                Update,
                (GameSet::Input, GameSet::Movement, GameSet::Effects)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                monitor_asset_loading.run_if(in_state(GameState::Loading)),
            );
    }
}

/// Spawns the 2D camera tagged with `FollowCamera` so the follow system can locate it.
fn setup_camera(mut commands: Commands, layout: Res<crate::world::WorldLayout>) {
    let mut camera = Camera2dBundle::default();
    camera.transform.translation.x = layout.spawn_point.x;
    camera.transform.translation.y = layout.size.y * 0.5;

    commands.spawn((Name::new("MainCamera"), camera, FollowCamera));
}
