//! Parallax backdrop. Each layer scrolls by a fraction of the character's horizontal movement;
//! farther layers use smaller fractions.
//!
//! Offsets are wrapped by the layer's tile width and each layer is drawn as three side-by-side
//! tiles, so the backdrop never runs out at the world edges.

use bevy::prelude::*;

use crate::camera::{follow_player_camera, FollowCamera};
use crate::config::GameTuning;
use crate::player::Player;
use crate::state::{GameSet, GameState};

pub struct ParallaxPlugin;

impl Plugin for ParallaxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ParallaxAnchor>()
            .add_systems(OnEnter(GameState::Loading), spawn_background_layers)
            .add_systems(
                Update,
                (
                    scroll_background_layers.in_set(GameSet::Effects),
                    position_background_layers.after(follow_player_camera),
                )
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

const LAYER_TEXTURES: [&str; 3] = [
    "backgrounds/sky.png",
    "backgrounds/hills.png",
    "backgrounds/trees.png",
];
const LAYER_HEIGHT: f32 = 720.0;

#[derive(Component, Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub speed: f32,
    pub tile_width: f32,
    pub offset: f32,
}

impl BackgroundLayer {
    pub fn new(speed: f32, tile_width: f32) -> Self {
        Self {
            speed,
            tile_width,
            offset: 0.0,
        }
    }

    /// Shifts the layer against the character's displacement `dx`.
    pub fn advance(&mut self, dx: f32) {
        self.offset -= dx * self.speed;
        // Keep the stored value bounded; only its position within a tile is ever drawn.
        self.offset = self.wrapped_offset();
    }

    /// Offset folded into `[0, tile_width)`.
    pub fn wrapped_offset(&self) -> f32 {
        self.offset.rem_euclid(self.tile_width)
    }
}

/// Character x from the previous frame.
#[derive(Resource, Default, Debug)]
pub struct ParallaxAnchor {
    pub last_x: Option<f32>,
}

fn spawn_background_layers(
    mut commands: Commands,
    tuning: Res<GameTuning>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, With<BackgroundLayer>>,
) {
    for entity in &existing {
        commands.entity(entity).despawn_recursive();
    }

    let tile_width = tuning.parallax.tile_width;
    for (depth, speed) in tuning.parallax.speeds.iter().copied().enumerate() {
        let Some(path) = LAYER_TEXTURES.get(depth) else {
            warn!("No backdrop art for parallax layer {}; skipping it.", depth);
            continue;
        };
        let texture: Handle<Image> = asset_server.load(*path);
        let z = -10.0 + depth as f32;

        commands
            .spawn((
                Name::new(format!("Backdrop{depth}")),
                BackgroundLayer::new(speed, tile_width),
                SpatialBundle::from_transform(Transform::from_xyz(0.0, LAYER_HEIGHT * 0.5, z)),
            ))
            .with_children(|layer| {
                for slot in -1..=1 {
                    layer.spawn(SpriteBundle {
                        texture: texture.clone(),
                        sprite: Sprite {
                            custom_size: Some(Vec2::new(tile_width, LAYER_HEIGHT)),
                            ..default()
                        },
                        transform: Transform::from_xyz(slot as f32 * tile_width, 0.0, 0.0),
                        ..default()
                    });
                }
            });
    }
}

fn scroll_background_layers(
    player: Query<&Transform, With<Player>>,
    mut anchor: ResMut<ParallaxAnchor>,
    mut layers: Query<&mut BackgroundLayer>,
) {
    let Ok(transform) = player.get_single() else {
        return;
    };
    let x = transform.translation.x;
    let dx = anchor.last_x.map_or(0.0, |last| x - last);
    anchor.last_x = Some(x);

    if dx == 0.0 {
        return;
    }
    for mut layer in &mut layers {
        layer.advance(dx);
    }
}

fn position_background_layers(
    camera: Query<&Transform, (With<FollowCamera>, Without<BackgroundLayer>)>,
    mut layers: Query<(&BackgroundLayer, &mut Transform)>,
) {
    let Ok(camera) = camera.get_single() else {
        return;
    };

    for (layer, mut transform) in &mut layers {
        // Centered on the camera, shifted left by up to one tile; the neighbours cover the rest.
        transform.translation.x = camera.translation.x + layer.wrapped_offset() - layer.tile_width * 0.5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_moves_against_displacement_scaled_by_speed() {
        let mut layer = BackgroundLayer::new(0.5, 1000.0);
        layer.advance(100.0);
        assert_eq!(layer.wrapped_offset(), 950.0);

        layer.advance(-100.0);
        assert_eq!(layer.wrapped_offset(), 0.0);
    }

    #[test]
    fn farther_layers_scroll_less() {
        let mut far = BackgroundLayer::new(0.1, 1000.0);
        let mut near = BackgroundLayer::new(0.6, 1000.0);
        far.advance(-50.0);
        near.advance(-50.0);
        assert!(far.wrapped_offset() < near.wrapped_offset());
    }

    #[test]
    fn offset_wraps_by_tile_width() {
        let mut layer = BackgroundLayer::new(1.0, 1280.0);
        for _ in 0..100 {
            layer.advance(-200.0);
        }
        let wrapped = layer.wrapped_offset();
        assert!((0.0..1280.0).contains(&wrapped));
        assert!((wrapped - (20_000.0f32).rem_euclid(1280.0)).abs() < 0.01);
    }

    #[test]
    fn scroll_uses_previous_frame_position() {
        let mut app = App::new();
        app.init_resource::<ParallaxAnchor>()
            .add_systems(Update, scroll_background_layers);
        let player = app
            .world_mut()
            .spawn((Player, Transform::from_xyz(100.0, 0.0, 0.0)))
            .id();
        let layer = app
            .world_mut()
            .spawn(BackgroundLayer::new(0.5, 1000.0))
            .id();

        app.update();
        assert_eq!(app.world().get::<BackgroundLayer>(layer).unwrap().offset, 0.0);

        app.world_mut()
            .get_mut::<Transform>(player)
            .unwrap()
            .translation
            .x = 140.0;
        app.update();

        let offset = app.world().get::<BackgroundLayer>(layer).unwrap().wrapped_offset();
        assert_eq!(offset, 980.0);
    }
}
