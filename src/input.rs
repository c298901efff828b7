//! Input abstraction. Keyboard and touch both feed one `InputIntent` per frame, so the character
//! controller never needs to know which device is in use.
//!
//! Touch devices get a virtual joystick in the bottom-left corner and a jump button in the
//! bottom-right. A touch belongs to whichever control it lands on first; the jump button is
//! hit-tested before the joystick and a touch never drives both.

use std::time::Duration;

use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::{GameTuning, InputTuning};
use crate::state::{GameSet, GameState};

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        let tuning = app
            .world()
            .get_resource::<GameTuning>()
            .map(|tuning| tuning.input.clone())
            .unwrap_or_default();

        app.init_resource::<InputIntent>()
            .insert_resource(TouchControls::new(&tuning))
            .add_systems(Startup, spawn_touch_hud)
            .add_systems(
                Update,
                (
                    update_input_intent.in_set(GameSet::Input),
                    sync_touch_hud.after(GameSet::Input),
                )
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(OnExit(GameState::Playing), clear_input_intent);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputSourceKind {
    #[default]
    None,
    Keyboard,
    Touch,
}

/// What the player asked for this frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct InputIntent {
    /// Horizontal axis in `[-1, 1]`.
    pub axis: f32,
    pub jump: bool,
    /// Set on the frame a movement input is let go; the controller stops horizontal motion at once.
    pub halt: bool,
    pub source: InputSourceKind,
}

/// One device's contribution to a frame's intent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceSample {
    pub axis: f32,
    pub jump: bool,
    pub halt: bool,
}

impl SourceSample {
    fn is_active(&self) -> bool {
        self.axis != 0.0 || self.jump
    }
}

impl InputIntent {
    /// Merges both device samples. The axis comes from whichever source reported most recently.
    pub fn combine(keyboard: SourceSample, touch: SourceSample, previous: InputSourceKind) -> Self {
        let source = if keyboard.is_active() {
            InputSourceKind::Keyboard
        } else if touch.is_active() {
            InputSourceKind::Touch
        } else {
            previous
        };

        let axis = match source {
            InputSourceKind::Keyboard => keyboard.axis,
            InputSourceKind::Touch => touch.axis,
            InputSourceKind::None => 0.0,
        };

        Self {
            axis: axis.clamp(-1.0, 1.0),
            jump: keyboard.jump || touch.jump,
            halt: keyboard.halt || touch.halt,
            source,
        }
    }
}

pub fn keyboard_sample(keyboard: &ButtonInput<KeyCode>) -> SourceSample {
    let mut axis = 0.0;
    if keyboard.pressed(KeyCode::ArrowLeft) || keyboard.pressed(KeyCode::KeyA) {
        axis -= 1.0;
    }
    if keyboard.pressed(KeyCode::ArrowRight) || keyboard.pressed(KeyCode::KeyD) {
        axis += 1.0;
    }

    let released = keyboard.any_just_released([
        KeyCode::ArrowLeft,
        KeyCode::ArrowRight,
        KeyCode::KeyA,
        KeyCode::KeyD,
    ]);

    SourceSample {
        axis,
        jump: keyboard.any_just_pressed([KeyCode::Space, KeyCode::ArrowUp]),
        halt: released && axis == 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualJoystick {
    pub center: Vec2,
    pub radius: f32,
    pub dead_zone: f32,
    offset: Vec2,
    touch: Option<u64>,
}

impl VirtualJoystick {
    pub fn new(center: Vec2, radius: f32, dead_zone: f32) -> Self {
        Self {
            center,
            radius,
            dead_zone,
            offset: Vec2::ZERO,
            touch: None,
        }
    }

    pub fn begin(&mut self, touch: u64, point: Vec2) {
        self.touch = Some(touch);
        self.drag_to(point);
    }

    /// Moves the thumb toward `point`, never further than `radius` from the center.
    pub fn drag_to(&mut self, point: Vec2) -> Vec2 {
        self.offset = (point - self.center).clamp_length_max(self.radius);
        self.offset
    }

    pub fn release(&mut self) {
        self.touch = None;
        self.offset = Vec2::ZERO;
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn touch_id(&self) -> Option<u64> {
        self.touch
    }

    pub fn axis(&self) -> f32 {
        let x = self.offset.x / self.radius;
        if x.abs() < self.dead_zone {
            0.0
        } else {
            x.clamp(-1.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpButton {
    pub center: Vec2,
    pub radius: f32,
    pub cooldown: Duration,
    last_press: Option<Duration>,
}

impl JumpButton {
    pub fn new(center: Vec2, radius: f32, cooldown: Duration) -> Self {
        Self {
            center,
            radius,
            cooldown,
            last_press: None,
        }
    }

    /// Registers a press at elapsed time `now`. Presses inside the cooldown window are dropped.
    pub fn try_press(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_press {
            if now.saturating_sub(last) < self.cooldown {
                return false;
            }
        }
        self.last_press = Some(now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchTarget {
    JumpButton,
    Joystick,
    Scene,
}

#[derive(Resource, Debug, Clone)]
pub struct TouchControls {
    pub joystick: VirtualJoystick,
    pub jump_button: JumpButton,
    inset: f32,
    /// The HUD stays hidden until the first touch arrives.
    pub seen_touch: bool,
}

impl TouchControls {
    pub fn new(tuning: &InputTuning) -> Self {
        Self {
            joystick: VirtualJoystick::new(
                Vec2::splat(tuning.control_inset),
                tuning.joystick_radius,
                tuning.joystick_dead_zone,
            ),
            jump_button: JumpButton::new(
                Vec2::splat(tuning.control_inset),
                tuning.jump_button_radius,
                Duration::from_millis(tuning.jump_cooldown_ms),
            ),
            inset: tuning.control_inset,
            seen_touch: false,
        }
    }

    /// Anchors the controls to the bottom corners of a viewport in logical pixels.
    pub fn fit_viewport(&mut self, viewport: Vec2) {
        self.joystick.center = Vec2::new(self.inset, viewport.y - self.inset);
        self.jump_button.center = Vec2::new(viewport.x - self.inset, viewport.y - self.inset);
    }

    /// Which control owns a touch that starts at `point`. The jump button is tested first.
    pub fn route(&self, point: Vec2) -> TouchTarget {
        if point.distance(self.jump_button.center) <= self.jump_button.radius {
            TouchTarget::JumpButton
        } else if point.distance(self.joystick.center) <= self.joystick.radius * 2.0 {
            TouchTarget::Joystick
        } else {
            TouchTarget::Scene
        }
    }

    pub fn touch_sample(&mut self, touches: &Touches, now: Duration) -> SourceSample {
        let mut sample = SourceSample::default();

        for touch in touches.iter_just_pressed() {
            self.seen_touch = true;
            match self.route(touch.position()) {
                TouchTarget::JumpButton => {
                    if self.jump_button.try_press(now) {
                        sample.jump = true;
                    }
                }
                TouchTarget::Joystick if self.joystick.touch_id().is_none() => {
                    self.joystick.begin(touch.id(), touch.position());
                }
                _ => {}
            }
        }

        if let Some(id) = self.joystick.touch_id() {
            match touches.get_pressed(id) {
                Some(touch) => {
                    self.joystick.drag_to(touch.position());
                }
                None => {
                    self.joystick.release();
                    sample.halt = true;
                }
            }
        }

        sample.axis = self.joystick.axis();
        sample
    }
}

fn update_input_intent(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    touches: Option<Res<Touches>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut controls: ResMut<TouchControls>,
    mut intent: ResMut<InputIntent>,
    mut warned_no_keyboard: Local<bool>,
) {
    if let Ok(window) = windows.get_single() {
        controls.fit_viewport(Vec2::new(window.width(), window.height()));
    }

    let keyboard = match keyboard {
        Some(keyboard) => keyboard_sample(&keyboard),
        None => {
            if !*warned_no_keyboard {
                warn!("No keyboard input available; keyboard movement disabled.");
                *warned_no_keyboard = true;
            }
            SourceSample::default()
        }
    };

    let touch = touches
        .map(|touches| controls.touch_sample(&touches, time.elapsed()))
        .unwrap_or_default();

    *intent = InputIntent::combine(keyboard, touch, intent.source);
}

fn clear_input_intent(mut intent: ResMut<InputIntent>, mut controls: ResMut<TouchControls>) {
    let source = intent.source;
    *intent = InputIntent {
        source,
        ..default()
    };
    controls.joystick.release();
}

#[derive(Component)]
struct TouchHud;

#[derive(Component)]
struct JoystickBase;

#[derive(Component)]
struct JoystickThumb;

#[derive(Component)]
struct JumpButtonNode;

const THUMB_SIZE: f32 = 40.0;

fn circle_node(size: f32, color: Color) -> NodeBundle {
    NodeBundle {
        style: Style {
            position_type: PositionType::Absolute,
            width: Val::Px(size),
            height: Val::Px(size),
            ..default()
        },
        background_color: BackgroundColor(color),
        border_radius: BorderRadius::MAX,
        ..default()
    }
}

fn spawn_touch_hud(mut commands: Commands, controls: Res<TouchControls>) {
    let base_size = controls.joystick.radius * 2.0;
    let button_size = controls.jump_button.radius * 2.0;

    commands
        .spawn((
            TouchHud,
            Name::new("TouchHud"),
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    ..default()
                },
                visibility: Visibility::Hidden,
                z_index: ZIndex::Global(10),
                ..default()
            },
        ))
        .with_children(|hud| {
            hud.spawn((
                JoystickBase,
                circle_node(base_size, Color::srgba(1.0, 1.0, 1.0, 0.15)),
            ));
            hud.spawn((
                JoystickThumb,
                circle_node(THUMB_SIZE, Color::srgba(1.0, 1.0, 1.0, 0.45)),
            ));
            hud.spawn((
                JumpButtonNode,
                circle_node(button_size, Color::srgba(0.95, 0.75, 0.3, 0.45)),
            ));
        });
}

fn place(style: &mut Style, center: Vec2, size: f32) {
    style.left = Val::Px(center.x - size * 0.5);
    style.top = Val::Px(center.y - size * 0.5);
}

#[allow(clippy::type_complexity)]
fn sync_touch_hud(
    controls: Res<TouchControls>,
    mut hud: Query<&mut Visibility, With<TouchHud>>,
    mut nodes: ParamSet<(
        Query<&mut Style, With<JoystickBase>>,
        Query<&mut Style, With<JoystickThumb>>,
        Query<&mut Style, With<JumpButtonNode>>,
    )>,
) {
    if !controls.is_changed() {
        return;
    }

    for mut visibility in &mut hud {
        *visibility = if controls.seen_touch {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }

    let joystick = &controls.joystick;
    for mut style in &mut nodes.p0() {
        place(&mut style, joystick.center, joystick.radius * 2.0);
    }
    for mut style in &mut nodes.p1() {
        place(&mut style, joystick.center + joystick.offset(), THUMB_SIZE);
    }
    let button = &controls.jump_button;
    for mut style in &mut nodes.p2() {
        place(&mut style, button.center, button.radius * 2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joystick() -> VirtualJoystick {
        VirtualJoystick::new(Vec2::new(100.0, 500.0), 50.0, 0.1)
    }

    #[test]
    fn joystick_offset_is_clamped_to_radius() {
        let mut stick = joystick();
        stick.begin(1, Vec2::new(100.0, 500.0));

        let offset = stick.drag_to(Vec2::new(300.0, 500.0));

        assert_eq!(offset, Vec2::new(50.0, 0.0));
        assert_eq!(stick.axis(), 1.0);
    }

    #[test]
    fn diagonal_drag_is_clamped_by_length() {
        let mut stick = joystick();
        let offset = stick.drag_to(Vec2::new(400.0, 800.0));
        assert!(offset.length() <= 50.0 + 1e-4);
    }

    #[test]
    fn small_offsets_fall_inside_dead_zone() {
        let mut stick = joystick();
        stick.drag_to(Vec2::new(104.0, 500.0));
        assert_eq!(stick.axis(), 0.0);

        stick.drag_to(Vec2::new(75.0, 500.0));
        assert_eq!(stick.axis(), -0.5);
    }

    #[test]
    fn release_returns_thumb_to_rest() {
        let mut stick = joystick();
        stick.begin(7, Vec2::new(140.0, 500.0));
        stick.release();

        assert_eq!(stick.offset(), Vec2::ZERO);
        assert_eq!(stick.touch_id(), None);
        assert_eq!(stick.axis(), 0.0);
    }

    #[test]
    fn jump_button_presses_inside_cooldown_are_dropped() {
        let mut button = JumpButton::new(Vec2::ZERO, 40.0, Duration::from_millis(200));

        assert!(button.try_press(Duration::from_millis(1000)));
        assert!(!button.try_press(Duration::from_millis(1150)));
        assert!(button.try_press(Duration::from_millis(1200)));
    }

    #[test]
    fn jump_button_wins_overlapping_hit_tests() {
        let mut controls = TouchControls::new(&InputTuning::default());
        controls.fit_viewport(Vec2::new(260.0, 600.0));
        // Joystick at (100, 500) with a 100px activation area, jump button at (160, 500).
        assert_eq!(controls.route(Vec2::new(160.0, 500.0)), TouchTarget::JumpButton);
        assert_eq!(controls.route(Vec2::new(60.0, 500.0)), TouchTarget::Joystick);
        assert_eq!(controls.route(Vec2::new(130.0, 200.0)), TouchTarget::Scene);
    }

    #[test]
    fn keyboard_axis_wins_over_idle_touch() {
        let keyboard = SourceSample {
            axis: -1.0,
            ..default()
        };
        let touch = SourceSample::default();

        let intent = InputIntent::combine(keyboard, touch, InputSourceKind::Touch);

        assert_eq!(intent.axis, -1.0);
        assert_eq!(intent.source, InputSourceKind::Keyboard);
    }

    #[test]
    fn touch_axis_used_when_keyboard_is_idle() {
        let touch = SourceSample {
            axis: 0.6,
            ..default()
        };

        let intent = InputIntent::combine(SourceSample::default(), touch, InputSourceKind::None);

        assert_eq!(intent.axis, 0.6);
        assert_eq!(intent.source, InputSourceKind::Touch);
    }

    fn input_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .init_resource::<InputIntent>()
            .insert_resource(TouchControls::new(&InputTuning::default()))
            .add_systems(Update, update_input_intent);
        app
    }

    #[test]
    fn arrow_keys_and_space_drive_the_intent() {
        let mut app = input_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        {
            let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
            keyboard.press(KeyCode::ArrowLeft);
            keyboard.press(KeyCode::Space);
        }

        app.update();

        let intent = *app.world().resource::<InputIntent>();
        assert_eq!(intent.axis, -1.0);
        assert!(intent.jump);
        assert_eq!(intent.source, InputSourceKind::Keyboard);
    }

    #[test]
    fn held_space_requests_a_single_jump() {
        let mut app = input_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::Space);
        app.update();
        app.world_mut().resource_mut::<ButtonInput<KeyCode>>().clear();
        app.update();

        assert!(!app.world().resource::<InputIntent>().jump);
    }

    #[test]
    fn releasing_direction_key_halts() {
        let mut app = input_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::ArrowRight);
        app.update();
        {
            let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
            keyboard.clear();
            keyboard.release(KeyCode::ArrowRight);
        }
        app.update();

        let intent = *app.world().resource::<InputIntent>();
        assert_eq!(intent.axis, 0.0);
        assert!(intent.halt);
    }

    #[test]
    fn missing_keyboard_degrades_to_no_movement() {
        let mut app = input_app();
        app.update();

        let intent = *app.world().resource::<InputIntent>();
        assert_eq!(intent.axis, 0.0);
        assert!(!intent.jump);
    }
}
