use bevy::prelude::*;

use crate::collision::CollisionWorld;
use crate::config::{GameTuning, MovementTuning};
use crate::input::InputIntent;
use crate::state::{GameSet, GameState};
use crate::world::WorldLayout;

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CharacterJumped>().add_systems(
            Update,
            advance_character
                .in_set(GameSet::Movement)
                .run_if(in_state(GameState::Playing)),
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JumpState {
    #[default]
    Grounded,
    RisingSingle,
    RisingDouble,
}

impl JumpState {
    pub fn is_airborne(self) -> bool {
        self != JumpState::Grounded
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Single,
    Double,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterJumped(pub JumpKind);

/// Kinematic state of the playable character. Position lives in the `Transform`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Character {
    pub velocity: Vec2,
    pub jump: JumpState,
    pub facing: Facing,
}

#[derive(Component, Copy, Clone, Debug)]
pub struct Collider {
    pub half_extents: Vec2,
}

impl Collider {
    pub fn from_size(size: Vec2) -> Self {
        Self {
            half_extents: size * 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub jumped: Option<JumpKind>,
    pub landed: bool,
    pub blocked: bool,
}

impl Character {
    /// Applies a jump request. A grounded character launches; a character on its first airborne
    /// arc gets one extra boost that also pushes it forward. Anything else is ignored.
    pub fn try_jump(&mut self, tuning: &MovementTuning) -> Option<JumpKind> {
        match self.jump {
            JumpState::Grounded => {
                self.velocity.y = tuning.jump_velocity;
                self.jump = JumpState::RisingSingle;
                Some(JumpKind::Single)
            }
            JumpState::RisingSingle => {
                self.velocity.y = tuning.double_jump_velocity;
                self.velocity.x = tuning.double_jump_boost * self.facing.sign();
                self.jump = JumpState::RisingDouble;
                Some(JumpKind::Double)
            }
            JumpState::RisingDouble => None,
        }
    }

    fn apply_horizontal_intent(&mut self, intent: &InputIntent, tuning: &MovementTuning) {
        if intent.axis != 0.0 {
            self.velocity.x = intent.axis * tuning.run_speed;
            self.facing = if intent.axis < 0.0 {
                Facing::Left
            } else {
                Facing::Right
            };
        } else if intent.halt || !self.jump.is_airborne() {
            self.velocity.x = 0.0;
        }
    }
}

/// Advances one character by `dt`: intent, jump, gravity, then per-axis collision.
pub fn step_character(
    character: &mut Character,
    position: &mut Vec2,
    half: Vec2,
    intent: &InputIntent,
    tuning: &MovementTuning,
    world: &CollisionWorld,
    dt: f32,
) -> StepReport {
    let mut report = StepReport::default();

    character.apply_horizontal_intent(intent, tuning);

    if intent.jump {
        report.jumped = character.try_jump(tuning);
    }

    character.velocity.y = (character.velocity.y - tuning.gravity * dt).max(-tuning.terminal_velocity);

    report.blocked = world.sweep_x(
        position,
        &mut character.velocity.x,
        half,
        dt,
        tuning.max_step_height,
    );

    let falling = character.velocity.y <= 0.0;
    // A grounded character follows the floor down steps no taller than it can climb.
    let snap_down = if falling && character.jump == JumpState::Grounded {
        tuning.max_step_height
    } else {
        0.0
    };
    let supported = world.sweep_y(position, &mut character.velocity.y, half, dt, snap_down);

    if supported && falling {
        if character.jump.is_airborne() {
            report.landed = true;
            character.jump = JumpState::Grounded;
        }
        if intent.axis == 0.0 {
            character.velocity.x = 0.0;
        }
    } else if !supported && character.jump == JumpState::Grounded {
        // Walked off a ledge: the fall counts as the first airborne arc.
        character.jump = JumpState::RisingSingle;
    }

    report
}

fn advance_character(
    time: Res<Time>,
    tuning: Res<GameTuning>,
    intent: Res<InputIntent>,
    collision: Res<CollisionWorld>,
    layout: Res<WorldLayout>,
    mut jumped: EventWriter<CharacterJumped>,
    mut query: Query<(&mut Transform, &mut Character, &Collider)>,
) {
    let dt = time.delta_seconds();

    for (mut transform, mut character, collider) in &mut query {
        let half = collider.half_extents;
        let mut position = transform.translation.truncate();

        let report = step_character(
            &mut character,
            &mut position,
            half,
            &intent,
            &tuning.movement,
            &collision,
            dt,
        );

        let min_x = half.x;
        let max_x = (layout.size.x - half.x).max(min_x);
        if position.x < min_x || position.x > max_x {
            position.x = position.x.clamp(min_x, max_x);
            character.velocity.x = 0.0;
        }

        if let Some(kind) = report.jumped {
            jumped.send(CharacterJumped(kind));
        }
        if report.landed {
            debug!("Character landed at {:?}.", position);
        }
        if report.blocked {
            trace!("Character blocked by a wall at {:?}.", position);
        }

        transform.translation.x = position.x;
        transform.translation.y = position.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::SKIN;
    use bevy::math::Rect;

    const HALF: Vec2 = Vec2::new(16.0, 16.0);
    const DT: f32 = 1.0 / 60.0;

    fn ground() -> CollisionWorld {
        CollisionWorld::from_solids([Rect::new(0.0, 0.0, 2000.0, 64.0)])
    }

    fn standing() -> Vec2 {
        Vec2::new(300.0, 64.0 + HALF.y + SKIN)
    }

    fn intent(axis: f32, jump: bool) -> InputIntent {
        InputIntent {
            axis,
            jump,
            ..default()
        }
    }

    fn step(character: &mut Character, position: &mut Vec2, intent: InputIntent) -> StepReport {
        step_character(
            character,
            position,
            HALF,
            &intent,
            &MovementTuning::default(),
            &ground(),
            DT,
        )
    }

    #[test]
    fn grounded_without_input_has_zero_horizontal_velocity() {
        let mut character = Character {
            velocity: Vec2::new(180.0, 0.0),
            ..default()
        };
        let mut position = standing();

        step(&mut character, &mut position, intent(0.0, false));

        assert_eq!(character.velocity.x, 0.0);
        assert_eq!(character.jump, JumpState::Grounded);
    }

    #[test]
    fn jump_then_double_jump_then_nothing() {
        let tuning = MovementTuning::default();
        let mut character = Character {
            facing: Facing::Left,
            ..default()
        };

        assert_eq!(character.try_jump(&tuning), Some(JumpKind::Single));
        assert_eq!(character.velocity.y, 300.0);
        assert_eq!(character.jump, JumpState::RisingSingle);

        assert_eq!(character.try_jump(&tuning), Some(JumpKind::Double));
        assert_eq!(character.velocity.y, 200.0);
        assert_eq!(character.velocity.x, -250.0);
        assert_eq!(character.jump, JumpState::RisingDouble);

        let before = character;
        assert_eq!(character.try_jump(&tuning), None);
        assert_eq!(character, before);
    }

    #[test]
    fn double_jump_boost_follows_facing() {
        let tuning = MovementTuning::default();
        let mut character = Character {
            jump: JumpState::RisingSingle,
            facing: Facing::Right,
            ..default()
        };

        character.try_jump(&tuning);

        assert_eq!(character.velocity.x, 250.0);
    }

    #[test]
    fn double_jump_is_available_again_only_after_landing() {
        let mut character = Character::default();
        let mut position = standing();

        let first = step(&mut character, &mut position, intent(0.0, true));
        assert_eq!(first.jumped, Some(JumpKind::Single));
        let second = step(&mut character, &mut position, intent(0.0, true));
        assert_eq!(second.jumped, Some(JumpKind::Double));
        let third = step(&mut character, &mut position, intent(0.0, true));
        assert_eq!(third.jumped, None);

        let mut landed = false;
        for _ in 0..600 {
            if step(&mut character, &mut position, intent(0.0, false)).landed {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert_eq!(character.jump, JumpState::Grounded);
        assert_eq!(character.velocity.x, 0.0);

        let again = step(&mut character, &mut position, intent(0.0, true));
        assert_eq!(again.jumped, Some(JumpKind::Single));
    }

    #[test]
    fn airborne_momentum_survives_until_landing_or_halt() {
        let mut character = Character {
            velocity: Vec2::new(250.0, 100.0),
            jump: JumpState::RisingDouble,
            ..default()
        };
        let mut position = Vec2::new(300.0, 300.0);

        step(&mut character, &mut position, intent(0.0, false));
        assert_eq!(character.velocity.x, 250.0);

        let halt = InputIntent {
            halt: true,
            ..default()
        };
        step(&mut character, &mut position, halt);
        assert_eq!(character.velocity.x, 0.0);
    }

    #[test]
    fn landing_with_input_keeps_running() {
        let mut character = Character {
            velocity: Vec2::new(0.0, -200.0),
            jump: JumpState::RisingSingle,
            ..default()
        };
        let mut position = standing() + Vec2::new(0.0, 1.0);

        let report = step(&mut character, &mut position, intent(1.0, false));

        assert!(report.landed);
        assert_eq!(character.velocity.x, 200.0);
        assert_eq!(character.facing, Facing::Right);
    }

    #[test]
    fn walking_off_a_ledge_leaves_one_air_jump() {
        let mut character = Character::default();
        let mut position = Vec2::new(2100.0, 200.0);

        step(&mut character, &mut position, intent(0.0, false));
        assert_eq!(character.jump, JumpState::RisingSingle);

        let report = step(&mut character, &mut position, intent(0.0, true));
        assert_eq!(report.jumped, Some(JumpKind::Double));
    }

    #[test]
    fn walking_down_the_ramp_stays_grounded() {
        let layout = crate::world::WorldLayout::sketch_world();
        let world = CollisionWorld::from_solids(layout.solids());
        let tuning = MovementTuning::default();
        let half = Vec2::new(14.0, 24.0);
        let mut character = Character::default();
        let mut position = Vec2::new(1700.0, 192.0 + half.y + SKIN);

        let mut frames = 0;
        while position.x > 1150.0 {
            step_character(
                &mut character,
                &mut position,
                half,
                &intent(-1.0, false),
                &tuning,
                &world,
                DT,
            );
            frames += 1;
            assert_eq!(
                character.jump,
                JumpState::Grounded,
                "airborne at x={} on frame {frames}",
                position.x
            );
            assert!(frames < 1000);
        }

        assert!((position.y - (64.0 + half.y + SKIN)).abs() < 1e-3);

        let report = step_character(
            &mut character,
            &mut position,
            half,
            &intent(0.0, true),
            &tuning,
            &world,
            DT,
        );
        assert_eq!(report.jumped, Some(JumpKind::Single));
    }

    #[test]
    fn left_input_faces_left() {
        let mut character = Character::default();
        let mut position = standing();

        step(&mut character, &mut position, intent(-1.0, false));

        assert_eq!(character.facing, Facing::Left);
        assert_eq!(character.velocity.x, -200.0);
        assert!(position.x < 300.0);
    }
}
