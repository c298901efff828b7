//! Static collision geometry. The world is a handful of axis-aligned solids (ground segments and
//! ramp steps), so a flat list swept per axis is all the resolution the character needs.

use bevy::math::Rect;
use bevy::prelude::*;

/// Gap kept between a resolved body and the surface it touches so the next frame starts outside it.
pub const SKIN: f32 = 0.01;

#[derive(Resource, Default, Debug, Clone)]
pub struct CollisionWorld {
    pub solids: Vec<Rect>,
}

impl CollisionWorld {
    pub fn from_solids(solids: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            solids: solids.into_iter().collect(),
        }
    }

    /// Moves `position` horizontally by `velocity * dt`, stopping at the first wall in the way.
    /// Ledges no taller than `max_step` lift the body on top instead of blocking it.
    /// Returns `true` when a wall stopped the body.
    pub fn sweep_x(
        &self,
        position: &mut Vec2,
        velocity: &mut f32,
        half: Vec2,
        dt: f32,
        max_step: f32,
    ) -> bool {
        if velocity.abs() < f32::EPSILON {
            return false;
        }

        let dir = velocity.signum();
        let mut target_x = position.x + *velocity * dt;
        let feet = position.y - half.y;
        let head = position.y + half.y;
        let mut lift_to: Option<f32> = None;
        let mut blocked = false;

        for solid in &self.solids {
            if solid.max.y <= feet + SKIN || solid.min.y >= head - SKIN {
                continue;
            }

            let ahead = if dir > 0.0 {
                solid.min.x >= position.x + half.x - SKIN && solid.min.x < target_x + half.x
            } else {
                solid.max.x <= position.x - half.x + SKIN && solid.max.x > target_x - half.x
            };
            if !ahead {
                continue;
            }

            let rise = solid.max.y - feet;
            if rise <= max_step {
                lift_to = Some(lift_to.map_or(solid.max.y, |top: f32| top.max(solid.max.y)));
                continue;
            }

            target_x = if dir > 0.0 {
                target_x.min(solid.min.x - half.x - SKIN)
            } else {
                target_x.max(solid.max.x + half.x + SKIN)
            };
            blocked = true;
        }

        position.x = target_x;
        if let Some(top) = lift_to {
            position.y = top + half.y + SKIN;
        }
        if blocked {
            *velocity = 0.0;
        }
        blocked
    }

    /// Moves `position` vertically by `velocity * dt` and returns `true` when the body ends up
    /// standing on a surface. A body at rest still probes slightly below its feet, so standing
    /// reports support every frame. `snap_down` extends that probe: a floor up to that far below
    /// the feet pulls the body onto it, which keeps a walking body attached when going down steps.
    pub fn sweep_y(
        &self,
        position: &mut Vec2,
        velocity: &mut f32,
        half: Vec2,
        dt: f32,
        snap_down: f32,
    ) -> bool {
        let target_y = position.y + *velocity * dt;
        let left = position.x - half.x + SKIN;
        let right = position.x + half.x - SKIN;
        let overlapping = self
            .solids
            .iter()
            .filter(|solid| solid.min.x < right && solid.max.x > left);

        if *velocity <= 0.0 {
            let bottom = position.y - half.y;
            let probe = (target_y - half.y).min(bottom - SKIN * 2.0 - snap_down.max(0.0));
            let floor = overlapping
                .filter(|solid| solid.max.y <= bottom + SKIN && solid.max.y > probe)
                .map(|solid| solid.max.y)
                .fold(None, |best: Option<f32>, top| {
                    Some(best.map_or(top, |b| b.max(top)))
                });

            if let Some(top) = floor {
                position.y = top + half.y + SKIN;
                *velocity = 0.0;
                return true;
            }
        } else {
            let top = position.y + half.y;
            let ceiling = overlapping
                .filter(|solid| solid.min.y >= top - SKIN && solid.min.y < target_y + half.y)
                .map(|solid| solid.min.y)
                .fold(None, |best: Option<f32>, bottom| {
                    Some(best.map_or(bottom, |b| b.min(bottom)))
                });

            if let Some(bottom) = ceiling {
                position.y = bottom - half.y - SKIN;
                *velocity = 0.0;
                return false;
            }
        }

        position.y = target_y;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF: Vec2 = Vec2::new(16.0, 16.0);

    fn flat_world() -> CollisionWorld {
        CollisionWorld::from_solids([
            Rect::new(0.0, 0.0, 500.0, 64.0),
            Rect::new(500.0, 0.0, 550.0, 80.0),
            Rect::new(600.0, 0.0, 700.0, 300.0),
        ])
    }

    fn standing_at(x: f32) -> Vec2 {
        Vec2::new(x, 64.0 + HALF.y + SKIN)
    }

    #[test]
    fn standing_body_reports_ground_contact_with_zero_velocity() {
        let world = flat_world();
        let mut position = standing_at(100.0);
        let mut vy = 0.0;

        assert!(world.sweep_y(&mut position, &mut vy, HALF, 0.0, 0.0));
        assert_eq!(vy, 0.0);
        assert!((position.y - standing_at(100.0).y).abs() < 1e-4);
    }

    #[test]
    fn falling_body_lands_on_highest_surface() {
        let world = flat_world();
        let mut position = Vec2::new(100.0, 120.0);
        let mut vy = -900.0;

        assert!(world.sweep_y(&mut position, &mut vy, HALF, 0.1, 0.0));
        assert_eq!(vy, 0.0);
        assert!((position.y - (64.0 + HALF.y + SKIN)).abs() < 1e-4);
    }

    #[test]
    fn airborne_body_keeps_falling_without_support() {
        let world = CollisionWorld::default();
        let mut position = Vec2::new(0.0, 100.0);
        let mut vy = -100.0;

        assert!(!world.sweep_y(&mut position, &mut vy, HALF, 0.5, 0.0));
        assert_eq!(position.y, 50.0);
    }

    #[test]
    fn snap_down_follows_a_lower_step() {
        let world = CollisionWorld::from_solids([Rect::new(0.0, 0.0, 500.0, 48.0)]);
        let mut unsnapped = standing_at(100.0);
        let mut unsnapped_vy = -10.0;
        assert!(!world.sweep_y(&mut unsnapped, &mut unsnapped_vy, HALF, 1.0 / 60.0, 0.0));

        let mut position = standing_at(100.0);
        let mut vy = -10.0;
        assert!(world.sweep_y(&mut position, &mut vy, HALF, 1.0 / 60.0, 20.0));
        assert!((position.y - (48.0 + HALF.y + SKIN)).abs() < 1e-4);
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn snap_down_ignores_drops_taller_than_a_step() {
        let world = CollisionWorld::from_solids([Rect::new(0.0, 0.0, 500.0, 20.0)]);
        let mut position = standing_at(100.0);
        let mut vy = -10.0;

        assert!(!world.sweep_y(&mut position, &mut vy, HALF, 1.0 / 60.0, 20.0));
        assert!(position.y > 64.0);
    }

    #[test]
    fn low_ledge_is_climbed_instead_of_blocking() {
        let world = flat_world();
        let mut position = standing_at(480.0);
        let mut vx = 200.0;

        assert!(!world.sweep_x(&mut position, &mut vx, HALF, 0.1, 20.0));
        assert_eq!(vx, 200.0);
        assert!((position.y - (80.0 + HALF.y + SKIN)).abs() < 1e-4);
    }

    #[test]
    fn tall_wall_blocks_and_zeroes_velocity() {
        let world = flat_world();
        let mut position = Vec2::new(570.0, 80.0 + HALF.y + SKIN);
        let mut vx = 400.0;

        assert!(world.sweep_x(&mut position, &mut vx, HALF, 0.1, 20.0));
        assert_eq!(vx, 0.0);
        assert!(position.x + HALF.x <= 600.0);
    }

    #[test]
    fn jumping_into_ceiling_stops_upward_motion() {
        let world = CollisionWorld::from_solids([Rect::new(0.0, 200.0, 100.0, 220.0)]);
        let mut position = Vec2::new(50.0, 170.0);
        let mut vy = 300.0;

        assert!(!world.sweep_y(&mut position, &mut vy, HALF, 0.1, 0.0));
        assert_eq!(vy, 0.0);
        assert!(position.y + HALF.y <= 200.0);
    }
}
