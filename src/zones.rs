//! Kiosks and their interaction zones. Walking within range of a kiosk shows its prompt; pressing
//! E/Enter (or tapping the kiosk) while the prompt is up raises `KioskActivated`, which the bridge
//! turns into an external modal request.
//!
//! Prompts are spawned once per kiosk and only toggled between hidden and visible afterwards.

use bevy::input::touch::Touches;
use bevy::prelude::*;

use crate::camera::FollowCamera;
use crate::config::GameTuning;
use crate::input::{TouchControls, TouchTarget};
use crate::player::Player;
use crate::state::{GameSet, GameState};
use crate::world::WorldLayout;

pub struct ZonesPlugin;

impl Plugin for ZonesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<KioskActivated>()
            .add_systems(OnEnter(GameState::Loading), spawn_kiosks)
            .add_systems(
                Update,
                (update_zone_proximity, confirm_zone_interaction)
                    .chain()
                    .in_set(GameSet::Effects)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KioskKind {
    Sketch,
    Photo,
    ArTrace,
    Video,
}

impl KioskKind {
    pub fn label(self) -> &'static str {
        match self {
            KioskKind::Sketch => "Sketch Booth",
            KioskKind::Photo => "Photo Booth",
            KioskKind::ArTrace => "AR Trace",
            KioskKind::Video => "Video Booth",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            KioskKind::Sketch => "Press E to sketch",
            KioskKind::Photo => "Press E to take a photo",
            KioskKind::ArTrace => "Press E to trace in AR",
            KioskKind::Video => "Press E to make a video",
        }
    }

    fn texture_path(self) -> &'static str {
        match self {
            KioskKind::Sketch => "kiosks/sketch.png",
            KioskKind::Photo => "kiosks/photo.png",
            KioskKind::ArTrace => "kiosks/ar_trace.png",
            KioskKind::Video => "kiosks/video.png",
        }
    }

    /// Parses the short names used by deep links and DOM requests. Case-insensitive.
    pub fn from_query_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sketch" => Some(KioskKind::Sketch),
            "photo" => Some(KioskKind::Photo),
            "ar" => Some(KioskKind::ArTrace),
            "video" => Some(KioskKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZonePhase {
    #[default]
    Far,
    Near,
}

impl ZonePhase {
    pub fn evaluate(distance: f32, threshold: f32) -> Self {
        if distance <= threshold {
            ZonePhase::Near
        } else {
            ZonePhase::Far
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct InteractionZone {
    pub kiosk: KioskKind,
    pub center: Vec2,
    pub threshold: f32,
    /// Tap target around the kiosk sprite.
    pub half_size: Vec2,
    pub phase: ZonePhase,
    pub prompt: Entity,
}

impl InteractionZone {
    pub fn contains_point(&self, point: Vec2) -> bool {
        let delta = (point - self.center).abs();
        delta.x <= self.half_size.x && delta.y <= self.half_size.y
    }
}

#[derive(Component)]
pub struct ZonePrompt;

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KioskActivated(pub KioskKind);

const KIOSK_SIZE: Vec2 = Vec2::new(96.0, 128.0);

fn spawn_kiosks(
    mut commands: Commands,
    layout: Res<WorldLayout>,
    tuning: Res<GameTuning>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, Or<(With<InteractionZone>, With<ZonePrompt>)>>,
) {
    for entity in &existing {
        commands.entity(entity).despawn_recursive();
    }

    for placement in &layout.kiosks {
        let surface = layout.surface_height_at(placement.x);
        let center = Vec2::new(placement.x, surface + KIOSK_SIZE.y * 0.5);

        let prompt = commands
            .spawn((
                ZonePrompt,
                Name::new(format!("{} Prompt", placement.kind.label())),
                Text2dBundle {
                    text: Text::from_section(
                        placement.kind.prompt(),
                        TextStyle {
                            font_size: 20.0,
                            color: Color::srgb(0.98, 0.96, 0.9),
                            ..default()
                        },
                    )
                    .with_justify(JustifyText::Center),
                    transform: Transform::from_xyz(
                        center.x,
                        center.y + tuning.zones.prompt_height,
                        5.0,
                    ),
                    visibility: Visibility::Hidden,
                    ..default()
                },
            ))
            .id();

        commands.spawn((
            Name::new(placement.kind.label()),
            SpriteBundle {
                texture: asset_server.load(placement.kind.texture_path()),
                sprite: Sprite {
                    custom_size: Some(KIOSK_SIZE),
                    ..default()
                },
                transform: Transform::from_translation(center.extend(0.5)),
                ..default()
            },
            InteractionZone {
                kiosk: placement.kind,
                center,
                threshold: tuning.zones.threshold,
                half_size: KIOSK_SIZE * 0.5,
                phase: ZonePhase::Far,
                prompt,
            },
        ));
    }
}

fn update_zone_proximity(
    player: Query<&Transform, With<Player>>,
    mut zones: Query<&mut InteractionZone>,
    mut prompts: Query<&mut Visibility, With<ZonePrompt>>,
) {
    let Ok(transform) = player.get_single() else {
        return;
    };
    let position = transform.translation.truncate();

    for mut zone in &mut zones {
        let phase = ZonePhase::evaluate(position.distance(zone.center), zone.threshold);
        if phase == zone.phase {
            continue;
        }
        zone.phase = phase;

        if let Ok(mut visibility) = prompts.get_mut(zone.prompt) {
            *visibility = match phase {
                ZonePhase::Near => Visibility::Visible,
                ZonePhase::Far => Visibility::Hidden,
            };
        }
        debug!("{} zone is now {:?}.", zone.kiosk.label(), phase);
    }
}

fn confirm_zone_interaction(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    touches: Option<Res<Touches>>,
    controls: Option<Res<TouchControls>>,
    camera: Query<(&Camera, &GlobalTransform), With<FollowCamera>>,
    zones: Query<&InteractionZone>,
    mut activated: EventWriter<KioskActivated>,
) {
    let key_confirm = keyboard
        .map(|keyboard| keyboard.any_just_pressed([KeyCode::KeyE, KeyCode::Enter]))
        .unwrap_or(false);

    let mut taps: Vec<Vec2> = Vec::new();
    if let (Some(touches), Ok((camera, camera_transform))) = (touches, camera.get_single()) {
        for touch in touches.iter_just_pressed() {
            let on_controls = controls
                .as_ref()
                .map(|controls| controls.route(touch.position()) != TouchTarget::Scene)
                .unwrap_or(false);
            if on_controls {
                continue;
            }
            if let Some(point) = camera.viewport_to_world_2d(camera_transform, touch.position()) {
                taps.push(point);
            }
        }
    }

    if !key_confirm && taps.is_empty() {
        return;
    }

    for zone in &zones {
        if zone.phase != ZonePhase::Near {
            continue;
        }
        if key_confirm || taps.iter().any(|point| zone.contains_point(*point)) {
            info!("Opening {}.", zone.kiosk.label());
            activated.send(KioskActivated(zone.kiosk));
        }
    }
}
