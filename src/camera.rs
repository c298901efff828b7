//! Camera follow system. Keeps the main 2D camera centered on the character while respecting the
//! world bounds.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::player::Player;
use crate::state::{GameSet, GameState};
use crate::world::WorldLayout;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            follow_player_camera
                .after(GameSet::Movement) // run after movement so camera sees latest transform
                .run_if(in_state(GameState::Playing))
                .run_if(has_player_and_camera),
        );
    }
}

/// Marker component so the follow system can locate the camera entity without relying on names.
#[derive(Component)]
pub struct FollowCamera;

/// Run condition that only schedules the follow system when both a player and camera exist.
fn has_player_and_camera(
    player_query: Query<Entity, With<Player>>,
    camera_query: Query<Entity, With<FollowCamera>>,
) -> bool {
    !player_query.is_empty() && !camera_query.is_empty()
}

/// Clamps a desired camera center so a view of `half_view` never shows past `[0, world]`.
/// Worlds smaller than the view are centered instead.
pub fn clamp_to_world(desired: Vec2, half_view: Vec2, world: Vec2) -> Vec2 {
    let axis = |value: f32, half: f32, extent: f32| {
        if extent > half * 2.0 {
            value.clamp(half, extent - half)
        } else {
            extent * 0.5
        }
    };
    Vec2::new(
        axis(desired.x, half_view.x, world.x),
        axis(desired.y, half_view.y, world.y),
    )
}

/// Exponentially eases the camera toward the character, clamped to the world.
pub fn follow_player_camera(
    mut camera_query: Query<(&mut Transform, &OrthographicProjection), With<FollowCamera>>,
    player_query: Query<&Transform, (With<Player>, Without<FollowCamera>)>,
    layout: Res<WorldLayout>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
) {
    let Ok(player_transform) = player_query.get_single() else {
        return;
    };

    let Ok((mut camera_transform, projection)) = camera_query.get_single_mut() else {
        return;
    };

    let mut desired = player_transform.translation.truncate();

    if let Ok(window) = window_query.get_single() {
        let half_view = Vec2::new(window.width(), window.height()) * 0.5 * projection.scale;
        desired = clamp_to_world(desired, half_view, layout.size);
    }

    let target = desired.extend(camera_transform.translation.z);
    let follow_speed = 6.0;
    let lerp_t = 1.0 - f32::exp(-follow_speed * time.delta_seconds());
    camera_transform.translation = camera_transform.translation.lerp(target, lerp_t);
}
