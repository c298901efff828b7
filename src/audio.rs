//! Background music and sound effects.
//!
//! Browsers refuse to start audio before the page has seen a user gesture, so the looping track is
//! only spawned after the first key press, click or touch. If the track fails to load it is retried
//! once after a fixed delay and then left off; the scene never waits on audio. Music also pauses
//! while an external modal holds the scene and picks up again when play resumes.

use std::time::Duration;

use bevy::asset::{AssetLoadFailedEvent, LoadState};
use bevy::audio::{AudioSinkPlayback, Volume};
use bevy::input::mouse::MouseButton;
use bevy::input::touch::Touches;
use bevy::prelude::*;

use crate::bridge::SceneEvent;
use crate::config::GameTuning;
use crate::movement::{CharacterJumped, JumpKind};
use crate::state::GameState;

const MUSIC_PATH: &str = "audio/theme.ogg";
const JUMP_PATH: &str = "audio/jump.ogg";

pub struct GameAudioPlugin;

impl Plugin for GameAudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioHandles>()
            .init_resource::<MusicLifecycle>()
            .add_event::<SceneEvent>()
            .add_systems(Startup, (load_audio_handles, spawn_mute_button))
            .add_systems(OnEnter(GameState::Playing), release_music_hold)
            .add_systems(
                Update,
                (
                    start_music_on_first_gesture,
                    monitor_music_loading,
                    toggle_mute,
                    play_jump_sound,
                    (hold_music_for_modals, sync_music_playback).chain(),
                ),
            );
    }
}

/// Keeps audio handles alive so the decoded buffers stay cached.
#[derive(Resource, Default)]
pub struct AudioHandles {
    pub music: Option<Handle<AudioSource>>,
    pub jump: Option<Handle<AudioSource>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MusicPhase {
    AwaitingGesture,
    Starting,
    Playing,
    RetryScheduled(Timer),
    Abandoned,
}

#[derive(Resource, Debug, Clone)]
pub struct MusicLifecycle {
    pub phase: MusicPhase,
    pub retried: bool,
    pub muted: bool,
    /// An external modal is open; music stays paused until play resumes.
    pub held_for_modal: bool,
}

impl Default for MusicLifecycle {
    fn default() -> Self {
        Self {
            phase: MusicPhase::AwaitingGesture,
            retried: false,
            muted: false,
            held_for_modal: false,
        }
    }
}

impl MusicLifecycle {
    /// Returns `true` when this gesture should start the track.
    pub fn on_gesture(&mut self) -> bool {
        if self.phase == MusicPhase::AwaitingGesture {
            self.phase = MusicPhase::Starting;
            return true;
        }
        false
    }

    pub fn on_loaded(&mut self) {
        if self.phase == MusicPhase::Starting {
            self.phase = MusicPhase::Playing;
        }
    }

    /// The first failure schedules a retry; any later failure gives up for the session.
    pub fn on_failed(&mut self, retry_delay: Duration) {
        if self.phase != MusicPhase::Starting {
            return;
        }
        self.phase = if self.retried {
            MusicPhase::Abandoned
        } else {
            self.retried = true;
            MusicPhase::RetryScheduled(Timer::new(retry_delay, TimerMode::Once))
        };
    }

    /// Returns `true` on the tick the retry delay runs out.
    pub fn tick_retry(&mut self, delta: Duration) -> bool {
        if let MusicPhase::RetryScheduled(timer) = &mut self.phase {
            if timer.tick(delta).finished() {
                self.phase = MusicPhase::Starting;
                return true;
            }
        }
        false
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn volume(&self, configured: f32) -> f32 {
        if self.muted {
            0.0
        } else {
            configured
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Pending,
    Loaded,
    Failed,
}

impl LoadOutcome {
    fn from_state(state: Option<LoadState>) -> Self {
        match state {
            Some(LoadState::Loaded) => LoadOutcome::Loaded,
            Some(LoadState::Failed(_)) => LoadOutcome::Failed,
            _ => LoadOutcome::Pending,
        }
    }
}

/// Outcome of the current music load attempt. The first attempt reads the asset server's load
/// state. A retry only trusts asset events: its load state can still show the first failure, or
/// go from loading to failed again between two frames.
pub fn attempt_outcome(
    retried: bool,
    state: LoadOutcome,
    loaded_event: bool,
    failed_event: bool,
) -> LoadOutcome {
    if failed_event {
        LoadOutcome::Failed
    } else if loaded_event {
        LoadOutcome::Loaded
    } else if retried {
        LoadOutcome::Pending
    } else {
        state
    }
}

#[derive(Component)]
pub struct BackgroundMusic;

#[derive(Component)]
struct MuteButton;

fn load_audio_handles(asset_server: Res<AssetServer>, mut handles: ResMut<AudioHandles>) {
    handles.music = Some(asset_server.load(MUSIC_PATH));
    handles.jump = Some(asset_server.load(JUMP_PATH));
}

fn spawn_mute_button(mut commands: Commands) {
    commands
        .spawn((
            MuteButton,
            Name::new("MuteButton"),
            ButtonBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    right: Val::Px(16.0),
                    top: Val::Px(16.0),
                    padding: UiRect::axes(Val::Px(8.0), Val::Px(4.0)),
                    ..default()
                },
                background_color: BackgroundColor(Color::srgba(0.1, 0.1, 0.12, 0.85)),
                z_index: ZIndex::Global(20),
                ..default()
            },
        ))
        .with_children(|button| {
            button.spawn(TextBundle::from_section(
                "Sound: on",
                TextStyle {
                    font_size: 14.0,
                    color: Color::srgb(0.9, 0.9, 0.9),
                    ..default()
                },
            ));
        });
}

fn spawn_music(commands: &mut Commands, handle: Handle<AudioSource>, volume: f32) {
    commands.spawn((
        BackgroundMusic,
        Name::new("BackgroundMusic"),
        AudioBundle {
            source: handle,
            settings: PlaybackSettings::LOOP.with_volume(Volume::new(volume)),
        },
    ));
}

fn start_music_on_first_gesture(
    mut commands: Commands,
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    touches: Option<Res<Touches>>,
    handles: Res<AudioHandles>,
    tuning: Res<GameTuning>,
    mut lifecycle: ResMut<MusicLifecycle>,
) {
    if lifecycle.phase != MusicPhase::AwaitingGesture {
        return;
    }

    let gesture = keyboard.is_some_and(|k| k.get_just_pressed().next().is_some())
        || mouse.is_some_and(|m| m.get_just_pressed().next().is_some())
        || touches.is_some_and(|t| t.iter_just_pressed().next().is_some());
    if !gesture || !lifecycle.on_gesture() {
        return;
    }

    let Some(handle) = handles.music.clone() else {
        warn!("Background music handle missing; audio disabled.");
        lifecycle.phase = MusicPhase::Abandoned;
        return;
    };
    spawn_music(
        &mut commands,
        handle,
        lifecycle.volume(tuning.audio.music_volume),
    );
    debug!("First gesture seen; starting background music.");
}

fn monitor_music_loading(
    mut commands: Commands,
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    handles: Res<AudioHandles>,
    tuning: Res<GameTuning>,
    mut lifecycle: ResMut<MusicLifecycle>,
    mut loaded: EventReader<AssetEvent<AudioSource>>,
    mut failed: EventReader<AssetLoadFailedEvent<AudioSource>>,
    music: Query<Entity, With<BackgroundMusic>>,
) {
    let Some(handle) = handles.music.clone() else {
        return;
    };
    // Drained every frame, so events from an earlier attempt never leak into the next one.
    let loaded_event = loaded
        .read()
        .any(|event| event.is_loaded_with_dependencies(handle.id()));
    let failed_event = failed.read().any(|event| event.id == handle.id());

    if lifecycle.tick_retry(time.delta()) {
        info!("Retrying background music.");
        asset_server.reload(MUSIC_PATH);
        spawn_music(
            &mut commands,
            handle,
            lifecycle.volume(tuning.audio.music_volume),
        );
        return;
    }

    if lifecycle.phase != MusicPhase::Starting {
        return;
    }

    let outcome = attempt_outcome(
        lifecycle.retried,
        LoadOutcome::from_state(asset_server.get_load_state(handle.id())),
        loaded_event,
        failed_event,
    );

    match outcome {
        LoadOutcome::Loaded => lifecycle.on_loaded(),
        LoadOutcome::Failed => {
            for entity in &music {
                commands.entity(entity).despawn_recursive();
            }
            lifecycle.on_failed(Duration::from_secs_f32(tuning.audio.retry_delay_secs));
            if lifecycle.phase == MusicPhase::Abandoned {
                warn!("Background music failed again; continuing without it.");
            } else {
                warn!(
                    "Background music failed to load; retrying in {}s.",
                    tuning.audio.retry_delay_secs
                );
            }
        }
        LoadOutcome::Pending => {}
    }
}

fn hold_music_for_modals(
    mut scene_events: EventReader<SceneEvent>,
    mut lifecycle: ResMut<MusicLifecycle>,
) {
    if scene_events.read().any(|event| event.pauses_scene()) && !lifecycle.held_for_modal {
        debug!("Modal opened; pausing background music.");
        lifecycle.held_for_modal = true;
    }
}

fn release_music_hold(mut lifecycle: ResMut<MusicLifecycle>) {
    if lifecycle.held_for_modal {
        lifecycle.held_for_modal = false;
    }
}

fn sync_music_playback(
    lifecycle: Res<MusicLifecycle>,
    mut applied: Local<bool>,
    sinks: Query<Ref<AudioSink>, With<BackgroundMusic>>,
) {
    let held = lifecycle.held_for_modal;
    for sink in &sinks {
        if held != *applied || (held && sink.is_added()) {
            if held {
                sink.pause();
            } else {
                sink.play();
            }
        }
    }
    *applied = held;
}

fn toggle_mute(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    buttons: Query<(Ref<Interaction>, &Children), With<MuteButton>>,
    mut labels: Query<&mut Text>,
    tuning: Res<GameTuning>,
    mut lifecycle: ResMut<MusicLifecycle>,
    sinks: Query<&AudioSink, With<BackgroundMusic>>,
) {
    let key = keyboard.is_some_and(|k| k.just_pressed(KeyCode::KeyM));
    let clicked = buttons
        .iter()
        .any(|(interaction, _)| interaction.is_changed() && *interaction == Interaction::Pressed);
    if !key && !clicked {
        return;
    }

    let muted = lifecycle.toggle_mute();
    let volume = lifecycle.volume(tuning.audio.music_volume);
    for sink in &sinks {
        sink.set_volume(volume);
    }

    let label = if muted { "Sound: off" } else { "Sound: on" };
    for (_, children) in &buttons {
        for child in children.iter() {
            if let Ok(mut text) = labels.get_mut(*child) {
                if let Some(section) = text.sections.first_mut() {
                    section.value = label.to_owned();
                }
            }
        }
    }
}

fn play_jump_sound(
    mut commands: Commands,
    mut jumps: EventReader<CharacterJumped>,
    handles: Res<AudioHandles>,
    lifecycle: Res<MusicLifecycle>,
) {
    let Some(CharacterJumped(kind)) = jumps.read().last().copied() else {
        return;
    };
    if lifecycle.muted {
        return;
    }
    let Some(handle) = handles.jump.clone() else {
        return;
    };
    // The double jump reuses the same clip, pitched up.
    let speed = match kind {
        JumpKind::Single => 1.0,
        JumpKind::Double => 1.25,
    };
    commands.spawn(AudioBundle {
        source: handle,
        settings: PlaybackSettings::DESPAWN.with_speed(speed),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_waits_for_first_gesture_only_once() {
        let mut lifecycle = MusicLifecycle::default();
        assert!(lifecycle.on_gesture());
        assert_eq!(lifecycle.phase, MusicPhase::Starting);
        assert!(!lifecycle.on_gesture());

        lifecycle.on_loaded();
        assert_eq!(lifecycle.phase, MusicPhase::Playing);
    }

    #[test]
    fn failed_music_retries_once_then_abandons() {
        let mut lifecycle = MusicLifecycle::default();
        lifecycle.on_gesture();

        lifecycle.on_failed(Duration::from_secs(2));
        assert!(matches!(lifecycle.phase, MusicPhase::RetryScheduled(_)));
        assert!(!lifecycle.tick_retry(Duration::from_millis(1500)));
        assert!(lifecycle.tick_retry(Duration::from_millis(600)));
        assert_eq!(lifecycle.phase, MusicPhase::Starting);

        lifecycle.on_failed(Duration::from_secs(2));
        assert_eq!(lifecycle.phase, MusicPhase::Abandoned);
        assert!(!lifecycle.tick_retry(Duration::from_secs(10)));
    }

    #[test]
    fn retry_outcome_comes_from_events_only() {
        // First attempt: the load state is authoritative.
        assert_eq!(
            attempt_outcome(false, LoadOutcome::Failed, false, false),
            LoadOutcome::Failed
        );
        assert_eq!(
            attempt_outcome(false, LoadOutcome::Loaded, false, false),
            LoadOutcome::Loaded
        );

        // Retry: a stale failed state alone is not the second failure.
        assert_eq!(
            attempt_outcome(true, LoadOutcome::Failed, false, false),
            LoadOutcome::Pending
        );
        // Retry that failed again before the state was seen as loading.
        assert_eq!(
            attempt_outcome(true, LoadOutcome::Pending, false, true),
            LoadOutcome::Failed
        );
        assert_eq!(
            attempt_outcome(true, LoadOutcome::Failed, true, false),
            LoadOutcome::Loaded
        );
    }

    #[test]
    fn quick_second_failure_abandons_music() {
        let mut lifecycle = MusicLifecycle::default();
        lifecycle.on_gesture();
        lifecycle.on_failed(Duration::from_secs(2));
        assert!(lifecycle.tick_retry(Duration::from_secs(2)));

        // The reload went Loading -> Failed between frames; only the event is left.
        match attempt_outcome(lifecycle.retried, LoadOutcome::Failed, false, true) {
            LoadOutcome::Failed => lifecycle.on_failed(Duration::from_secs(2)),
            other => panic!("expected a failure, got {other:?}"),
        }

        assert_eq!(lifecycle.phase, MusicPhase::Abandoned);
    }

    #[test]
    fn pausing_modals_hold_music_until_play_resumes() {
        use bevy::state::app::StatesPlugin;

        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .init_state::<GameState>()
            .add_event::<SceneEvent>()
            .init_resource::<MusicLifecycle>()
            .add_systems(OnEnter(GameState::Playing), release_music_hold)
            .add_systems(Update, hold_music_for_modals);
        app.update();

        app.world_mut().send_event(SceneEvent::OpenSketchCanvas);
        app.update();
        assert!(!app.world().resource::<MusicLifecycle>().held_for_modal);

        app.world_mut().send_event(SceneEvent::OpenVideoBooth);
        app.update();
        assert!(app.world().resource::<MusicLifecycle>().held_for_modal);

        app.world_mut()
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        app.update();
        assert!(!app.world().resource::<MusicLifecycle>().held_for_modal);
    }

    #[test]
    fn mute_zeroes_volume() {
        let mut lifecycle = MusicLifecycle::default();
        assert_eq!(lifecycle.volume(0.5), 0.5);
        assert!(lifecycle.toggle_mute());
        assert_eq!(lifecycle.volume(0.5), 0.0);
        assert!(!lifecycle.toggle_mute());
        assert_eq!(lifecycle.volume(0.5), 0.5);
    }
}
