//! Character entity lifecycle and animation. Spawns the artist avatar with its sprite sheet and
//! picks the clip to play from the movement state every frame.
//!
//! Components live in Bevy's ECS tables; this module only issues spawn commands and mutates the
//! sprite's atlas index.

use bevy::prelude::*;

use crate::movement::{Character, Collider, Facing, JumpState};
use crate::state::{GameSet, GameState};
use crate::world::WorldLayout;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_character_sheet)
            .add_systems(OnExit(GameState::Loading), spawn_player)
            .add_systems(
                Update,
                (select_character_animation, advance_animation_frames)
                    .chain()
                    .in_set(GameSet::Effects)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

/// Marker used by the camera, zones, parallax and minimap to find the playable character.
#[derive(Component)]
pub struct Player;

const FRAME_SIZE: UVec2 = UVec2::splat(32);
const SHEET_COLUMNS: u32 = 6;
const SHEET_ROWS: u32 = 3;
const SPRITE_SIZE: Vec2 = Vec2::splat(48.0);

#[derive(Resource)]
pub struct CharacterSheet {
    pub texture: Handle<Image>,
    pub layout: Handle<TextureAtlasLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKey {
    Idle,
    Walk,
    Jump,
}

impl AnimationKey {
    /// First atlas index and frame count. One clip per sheet row.
    pub fn frames(self) -> (usize, usize) {
        let columns = SHEET_COLUMNS as usize;
        match self {
            AnimationKey::Idle => (0, 4),
            AnimationKey::Walk => (columns, 6),
            AnimationKey::Jump => (columns * 2, 2),
        }
    }

    pub fn frames_per_second(self) -> f32 {
        match self {
            AnimationKey::Idle => 4.0,
            AnimationKey::Walk => 10.0,
            AnimationKey::Jump => 6.0,
        }
    }
}

/// Clip selection depends only on movement state.
pub fn select_animation(jump: JumpState, horizontal_velocity: f32) -> AnimationKey {
    if jump.is_airborne() {
        AnimationKey::Jump
    } else if horizontal_velocity.abs() > 0.0 {
        AnimationKey::Walk
    } else {
        AnimationKey::Idle
    }
}

#[derive(Component, Debug, Clone)]
pub struct CharacterAnimation {
    pub current: AnimationKey,
    pub frame: usize,
    pub timer: Timer,
}

impl Default for CharacterAnimation {
    fn default() -> Self {
        Self::new(AnimationKey::Idle)
    }
}

impl CharacterAnimation {
    pub fn new(key: AnimationKey) -> Self {
        Self {
            current: key,
            frame: 0,
            timer: Timer::from_seconds(1.0 / key.frames_per_second(), TimerMode::Repeating),
        }
    }

    /// Switches to `key`. Returns `false` without touching the running clip if it is already playing.
    pub fn play(&mut self, key: AnimationKey) -> bool {
        if self.current == key {
            return false;
        }
        *self = Self::new(key);
        true
    }

    pub fn atlas_index(&self) -> usize {
        let (first, _) = self.current.frames();
        first + self.frame
    }

    pub fn tick(&mut self, delta: std::time::Duration) {
        self.timer.tick(delta);
        let (_, count) = self.current.frames();
        let advanced = self.timer.times_finished_this_tick() as usize;
        self.frame = (self.frame + advanced) % count.max(1);
    }
}

fn load_character_sheet(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
) {
    let texture = asset_server.load("textures/artist.png");
    let layout = layouts.add(TextureAtlasLayout::from_grid(
        FRAME_SIZE,
        SHEET_COLUMNS,
        SHEET_ROWS,
        None,
        None,
    ));
    commands.insert_resource(CharacterSheet { texture, layout });
}

fn spawn_player(
    mut commands: Commands,
    sheet: Res<CharacterSheet>,
    layout: Res<WorldLayout>,
    existing: Query<Entity, With<Player>>,
) {
    if !existing.is_empty() {
        return;
    }

    let animation = CharacterAnimation::default();
    let spawn = layout.spawn_point.extend(1.0);

    commands.spawn((
        Name::new("Player"),
        Player,
        SpriteBundle {
            texture: sheet.texture.clone(),
            sprite: Sprite {
                custom_size: Some(SPRITE_SIZE),
                ..default()
            },
            transform: Transform::from_translation(spawn),
            ..default()
        },
        TextureAtlas {
            layout: sheet.layout.clone(),
            index: animation.atlas_index(),
        },
        Character::default(),
        Collider::from_size(Vec2::new(28.0, SPRITE_SIZE.y)),
        animation,
    ));
}

fn select_character_animation(
    mut query: Query<(&Character, &mut CharacterAnimation, &mut Sprite), With<Player>>,
) {
    for (character, mut animation, mut sprite) in &mut query {
        let key = select_animation(character.jump, character.velocity.x);
        if animation.current != key {
            animation.play(key);
        }

        let flip = character.facing == Facing::Left;
        if sprite.flip_x != flip {
            sprite.flip_x = flip;
        }
    }
}

fn advance_animation_frames(
    time: Res<Time>,
    mut query: Query<(&mut CharacterAnimation, &mut TextureAtlas), With<Player>>,
) {
    for (mut animation, mut atlas) in &mut query {
        animation.tick(time.delta());
        let index = animation.atlas_index();
        if atlas.index != index {
            atlas.index = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn animation_follows_movement_state() {
        assert_eq!(select_animation(JumpState::RisingSingle, 0.0), AnimationKey::Jump);
        assert_eq!(select_animation(JumpState::RisingDouble, 250.0), AnimationKey::Jump);
        assert_eq!(select_animation(JumpState::Grounded, -200.0), AnimationKey::Walk);
        assert_eq!(select_animation(JumpState::Grounded, 0.0), AnimationKey::Idle);
    }

    #[test]
    fn replaying_current_clip_keeps_its_progress() {
        let mut animation = CharacterAnimation::new(AnimationKey::Walk);
        animation.tick(Duration::from_millis(250));
        let frame = animation.frame;
        assert!(frame > 0);

        assert!(!animation.play(AnimationKey::Walk));
        assert_eq!(animation.frame, frame);

        assert!(animation.play(AnimationKey::Idle));
        assert_eq!(animation.frame, 0);
        assert_eq!(animation.atlas_index(), 0);
    }

    #[test]
    fn frames_wrap_within_clip() {
        let mut animation = CharacterAnimation::new(AnimationKey::Jump);
        for _ in 0..5 {
            animation.tick(Duration::from_secs_f32(1.0 / 6.0 + 0.001));
        }
        let (first, count) = AnimationKey::Jump.frames();
        assert!(animation.atlas_index() >= first);
        assert!(animation.atlas_index() < first + count);
    }

    #[test]
    fn facing_left_mirrors_sprite() {
        let mut app = App::new();
        app.add_systems(Update, select_character_animation);
        let entity = app
            .world_mut()
            .spawn((
                Player,
                Character {
                    velocity: Vec2::new(-200.0, 0.0),
                    facing: Facing::Left,
                    ..default()
                },
                CharacterAnimation::default(),
                Sprite::default(),
            ))
            .id();

        app.update();

        let world = app.world();
        assert!(world.get::<Sprite>(entity).unwrap().flip_x);
        assert_eq!(
            world.get::<CharacterAnimation>(entity).unwrap().current,
            AnimationKey::Walk
        );
    }
}
