//! Static world geometry: the ground segments, the ramp between them and where each kiosk stands.
//!
//! The layout is authored in code and never changes after startup. Collision bodies go into
//! `CollisionWorld`; the visible ground is drawn separately as decorative tiles, so art can be
//! swapped without touching what the character walks on.

use bevy::math::Rect;
use bevy::prelude::*;

use crate::collision::CollisionWorld;
use crate::state::GameState;
use crate::zones::KioskKind;

pub const TILE_SIZE: f32 = 64.0;

/// Registers the fixed layout and spawns its bodies and tiles when the scene loads.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(WorldLayout::sketch_world())
            .init_resource::<CollisionWorld>()
            .add_systems(OnEnter(GameState::Loading), spawn_world);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSegment {
    pub rect: Rect,
}

impl GroundSegment {
    pub fn new(x: f32, width: f32, height: f32) -> Self {
        Self {
            rect: Rect::new(x, 0.0, x + width, height),
        }
    }
}

/// Sloped stretch approximated by equal-width steps, each one `rise / steps` taller than the last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub start_x: f32,
    pub end_x: f32,
    pub from_height: f32,
    pub to_height: f32,
    pub steps: u32,
}

impl Ramp {
    pub fn step_rects(&self) -> Vec<Rect> {
        let steps = self.steps.max(1);
        let width = (self.end_x - self.start_x) / steps as f32;
        let rise = (self.to_height - self.from_height) / steps as f32;
        (0..steps)
            .map(|i| {
                let x = self.start_x + width * i as f32;
                let height = self.from_height + rise * (i + 1) as f32;
                Rect::new(x, 0.0, x + width, height)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KioskPlacement {
    pub kind: KioskKind,
    pub x: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct WorldLayout {
    pub size: Vec2,
    pub segments: Vec<GroundSegment>,
    pub ramp: Ramp,
    pub kiosks: Vec<KioskPlacement>,
    pub spawn_point: Vec2,
}

impl WorldLayout {
    pub fn sketch_world() -> Self {
        Self {
            size: Vec2::new(3200.0, 720.0),
            segments: vec![
                GroundSegment::new(0.0, 1200.0, 64.0),
                GroundSegment::new(1600.0, 1600.0, 192.0),
            ],
            ramp: Ramp {
                start_x: 1200.0,
                end_x: 1600.0,
                from_height: 64.0,
                to_height: 192.0,
                steps: 8,
            },
            kiosks: vec![
                KioskPlacement {
                    kind: KioskKind::Sketch,
                    x: 300.0,
                },
                KioskPlacement {
                    kind: KioskKind::Photo,
                    x: 900.0,
                },
                KioskPlacement {
                    kind: KioskKind::ArTrace,
                    x: 2000.0,
                },
                KioskPlacement {
                    kind: KioskKind::Video,
                    x: 2600.0,
                },
            ],
            spawn_point: Vec2::new(120.0, 200.0),
        }
    }

    /// Every collision body, ground segments and ramp steps, ordered left to right.
    pub fn solids(&self) -> Vec<Rect> {
        let mut solids: Vec<Rect> = self.segments.iter().map(|segment| segment.rect).collect();
        solids.extend(self.ramp.step_rects());
        solids.sort_by(|a, b| a.min.x.total_cmp(&b.min.x));
        solids
    }

    /// True when the solids cover `[0, size.x]` with no gaps or overlaps.
    pub fn is_contiguous(&self) -> bool {
        let solids = self.solids();
        let Some(first) = solids.first() else {
            return false;
        };
        if first.min.x.abs() > 0.01 {
            return false;
        }

        let mut edge = first.max.x;
        for solid in solids.iter().skip(1) {
            if (solid.min.x - edge).abs() > 0.01 {
                return false;
            }
            edge = solid.max.x;
        }
        (edge - self.size.x).abs() <= 0.01
    }

    /// Height of the walkable surface at `x`, or 0 outside the world.
    pub fn surface_height_at(&self, x: f32) -> f32 {
        self.solids()
            .iter()
            .filter(|solid| x >= solid.min.x && x < solid.max.x)
            .map(|solid| solid.max.y)
            .fold(0.0, f32::max)
    }
}

#[derive(Component)]
pub struct WorldRoot;

fn spawn_world(
    mut commands: Commands,
    existing: Query<Entity, With<WorldRoot>>,
    layout: Res<WorldLayout>,
    asset_server: Res<AssetServer>,
    mut collision: ResMut<CollisionWorld>,
) {
    for entity in &existing {
        commands.entity(entity).despawn_recursive();
    }

    if !layout.is_contiguous() {
        warn!("World layout has gaps between ground segments; the character may fall through.");
    }

    let solids = layout.solids();
    *collision = CollisionWorld::from_solids(solids.iter().copied());

    let tile_texture: Handle<Image> = asset_server.load("tiles/ground.png");

    commands
        .spawn((
            WorldRoot,
            Name::new("World"),
            SpatialBundle::default(),
        ))
        .with_children(|parent| {
            // Fill bodies sit behind the surface tiles.
            for solid in &solids {
                parent.spawn((
                    Name::new("GroundFill"),
                    SpriteBundle {
                        sprite: Sprite {
                            color: Color::srgb(0.32, 0.27, 0.22),
                            custom_size: Some(solid.size()),
                            ..default()
                        },
                        transform: Transform::from_translation(solid.center().extend(0.0)),
                        ..default()
                    },
                ));
            }

            let columns = (layout.size.x / TILE_SIZE).ceil() as u32;
            for column in 0..columns {
                let x = column as f32 * TILE_SIZE + TILE_SIZE * 0.5;
                let surface = layout.surface_height_at(x);
                parent.spawn((
                    Name::new("GroundTile"),
                    SpriteBundle {
                        texture: tile_texture.clone(),
                        sprite: Sprite {
                            custom_size: Some(Vec2::new(TILE_SIZE, TILE_SIZE * 0.5)),
                            ..default()
                        },
                        transform: Transform::from_xyz(x, surface - TILE_SIZE * 0.25, 0.1),
                        ..default()
                    },
                ));
            }
        });

    info!(
        "Spawned world: {} solids across {}px, {} kiosks.",
        solids.len(),
        layout.size.x,
        layout.kiosks.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_contiguous() {
        assert!(WorldLayout::sketch_world().is_contiguous());
    }

    #[test]
    fn gap_between_segments_breaks_contiguity() {
        let mut layout = WorldLayout::sketch_world();
        layout.segments[1] = GroundSegment::new(1650.0, 1550.0, 192.0);
        assert!(!layout.is_contiguous());
    }

    #[test]
    fn ramp_steps_interpolate_between_segment_heights() {
        let layout = WorldLayout::sketch_world();
        let steps = layout.ramp.step_rects();

        assert_eq!(steps.len(), 8);
        assert_eq!(steps[0].min.x, 1200.0);
        assert_eq!(steps[0].max.y, 80.0);
        assert_eq!(steps[7].max.x, 1600.0);
        assert_eq!(steps[7].max.y, 192.0);
    }

    #[test]
    fn ramp_rises_stay_climbable() {
        let layout = WorldLayout::sketch_world();
        let max_step = crate::config::MovementTuning::default().max_step_height;
        let steps = layout.ramp.step_rects();

        let mut previous = layout.ramp.from_height;
        for step in steps {
            assert!(step.max.y - previous <= max_step);
            previous = step.max.y;
        }
    }

    #[test]
    fn surface_height_follows_segments_and_ramp() {
        let layout = WorldLayout::sketch_world();
        assert_eq!(layout.surface_height_at(300.0), 64.0);
        assert_eq!(layout.surface_height_at(1225.0), 80.0);
        assert_eq!(layout.surface_height_at(2000.0), 192.0);
        assert_eq!(layout.surface_height_at(5000.0), 0.0);
    }
}
