//! Minimap HUD: a scaled-down drawing of the ground and kiosks with a live marker for the
//! character. The panel can be dragged by its title bar, with the mouse or a finger, and collapsed
//! to just the title bar.

use bevy::input::mouse::MouseButton;
use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::GameTuning;
use crate::player::Player;
use crate::state::{GameSet, GameState};
use crate::world::WorldLayout;

pub struct MinimapPlugin;

impl Plugin for MinimapPlugin {
    fn build(&self, app: &mut App) {
        let start = app
            .world()
            .get_resource::<GameTuning>()
            .map(|tuning| Vec2::new(tuning.minimap.start_left, tuning.minimap.start_top))
            .unwrap_or(Vec2::splat(16.0));

        app.insert_resource(MinimapState::new(start))
            .add_systems(OnEnter(GameState::Loading), spawn_minimap)
            .add_systems(
                Update,
                (
                    toggle_minimap,
                    drag_minimap,
                    update_minimap_marker
                        .in_set(GameSet::Effects)
                        .run_if(in_state(GameState::Playing)),
                ),
            );
    }
}

const TITLE_HEIGHT: f32 = 24.0;
const MARKER_SIZE: f32 = 6.0;

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct MinimapState {
    /// Top-left corner in logical pixels.
    pub position: Vec2,
    pub collapsed: bool,
    pub drag: Option<MinimapDrag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPointer {
    Mouse,
    Touch(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapDrag {
    pub pointer: DragPointer,
    /// Pointer offset from the panel's top-left corner when the drag started.
    pub grab: Vec2,
}

impl MinimapState {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            collapsed: false,
            drag: None,
        }
    }
}

/// Area of the title bar that starts a drag: everything left of the collapse toggle.
pub fn drag_handle_rect(position: Vec2, panel_width: f32) -> Rect {
    let width = (panel_width - TITLE_HEIGHT).max(0.0);
    Rect::new(
        position.x,
        position.y,
        position.x + width,
        position.y + TITLE_HEIGHT,
    )
}

/// Keeps a panel of `size` fully inside `viewport`.
pub fn clamp_to_viewport(position: Vec2, size: Vec2, viewport: Vec2) -> Vec2 {
    let max = (viewport - size).max(Vec2::ZERO);
    position.clamp(Vec2::ZERO, max)
}

/// Maps a y-up world position into minimap pixels (y-down, origin at the map's top-left).
pub fn world_to_minimap(world: Vec2, scale: f32, world_height: f32) -> Vec2 {
    Vec2::new(world.x * scale, (world_height - world.y) * scale)
}

#[derive(Component)]
struct MinimapRoot;

#[derive(Component)]
struct MinimapDragHandle;

#[derive(Component)]
struct MinimapToggle;

#[derive(Component)]
struct MinimapContent;

#[derive(Component)]
struct MinimapMarker;

fn spawn_minimap(
    mut commands: Commands,
    layout: Res<WorldLayout>,
    tuning: Res<GameTuning>,
    state: Res<MinimapState>,
    existing: Query<Entity, With<MinimapRoot>>,
) {
    for entity in &existing {
        commands.entity(entity).despawn_recursive();
    }

    let scale = tuning.minimap.scale;
    let map_size = layout.size * scale;

    commands
        .spawn((
            MinimapRoot,
            Name::new("Minimap"),
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    left: Val::Px(state.position.x),
                    top: Val::Px(state.position.y),
                    width: Val::Px(map_size.x),
                    flex_direction: FlexDirection::Column,
                    ..default()
                },
                z_index: ZIndex::Global(20),
                ..default()
            },
        ))
        .with_children(|root| {
            root.spawn(NodeBundle {
                style: Style {
                    height: Val::Px(TITLE_HEIGHT),
                    flex_direction: FlexDirection::Row,
                    align_items: AlignItems::Center,
                    ..default()
                },
                background_color: BackgroundColor(Color::srgba(0.1, 0.1, 0.12, 0.85)),
                ..default()
            })
            .with_children(|bar| {
                bar.spawn((
                    MinimapDragHandle,
                    ButtonBundle {
                        style: Style {
                            flex_grow: 1.0,
                            height: Val::Percent(100.0),
                            padding: UiRect::left(Val::Px(6.0)),
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        background_color: BackgroundColor(Color::NONE),
                        ..default()
                    },
                ))
                .with_children(|handle| {
                    handle.spawn(TextBundle::from_section(
                        "Map",
                        TextStyle {
                            font_size: 14.0,
                            color: Color::srgb(0.9, 0.9, 0.9),
                            ..default()
                        },
                    ));
                });

                bar.spawn((
                    MinimapToggle,
                    ButtonBundle {
                        style: Style {
                            width: Val::Px(TITLE_HEIGHT),
                            height: Val::Px(TITLE_HEIGHT),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        background_color: BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.1)),
                        ..default()
                    },
                ))
                .with_children(|toggle| {
                    toggle.spawn(TextBundle::from_section(
                        "-",
                        TextStyle {
                            font_size: 16.0,
                            color: Color::srgb(0.9, 0.9, 0.9),
                            ..default()
                        },
                    ));
                });
            });

            root.spawn((
                MinimapContent,
                NodeBundle {
                    style: Style {
                        width: Val::Px(map_size.x),
                        height: Val::Px(map_size.y),
                        ..default()
                    },
                    background_color: BackgroundColor(Color::srgba(0.05, 0.07, 0.12, 0.75)),
                    ..default()
                },
            ))
            .with_children(|content| {
                for solid in layout.solids() {
                    let top_left =
                        world_to_minimap(Vec2::new(solid.min.x, solid.max.y), scale, layout.size.y);
                    content.spawn(NodeBundle {
                        style: Style {
                            position_type: PositionType::Absolute,
                            left: Val::Px(top_left.x),
                            top: Val::Px(top_left.y),
                            width: Val::Px(solid.width() * scale),
                            height: Val::Px(solid.height() * scale),
                            ..default()
                        },
                        background_color: BackgroundColor(Color::srgb(0.55, 0.48, 0.4)),
                        ..default()
                    });
                }

                for kiosk in &layout.kiosks {
                    let surface = layout.surface_height_at(kiosk.x);
                    let dot = world_to_minimap(Vec2::new(kiosk.x, surface), scale, layout.size.y);
                    content.spawn(NodeBundle {
                        style: Style {
                            position_type: PositionType::Absolute,
                            left: Val::Px(dot.x - 2.0),
                            top: Val::Px(dot.y - 6.0),
                            width: Val::Px(4.0),
                            height: Val::Px(6.0),
                            ..default()
                        },
                        background_color: BackgroundColor(Color::srgb(0.95, 0.75, 0.3)),
                        ..default()
                    });
                }

                content.spawn((
                    MinimapMarker,
                    NodeBundle {
                        style: Style {
                            position_type: PositionType::Absolute,
                            width: Val::Px(MARKER_SIZE),
                            height: Val::Px(MARKER_SIZE),
                            ..default()
                        },
                        background_color: BackgroundColor(Color::srgb(0.9, 0.2, 0.25)),
                        border_radius: BorderRadius::MAX,
                        ..default()
                    },
                ));
            });
        });
}

fn toggle_minimap(
    mut state: ResMut<MinimapState>,
    toggles: Query<(&Interaction, &Children), (Changed<Interaction>, With<MinimapToggle>)>,
    mut content: Query<&mut Style, With<MinimapContent>>,
    mut labels: Query<&mut Text>,
) {
    for (interaction, children) in &toggles {
        if *interaction != Interaction::Pressed {
            continue;
        }
        state.collapsed = !state.collapsed;

        for mut style in &mut content {
            style.display = if state.collapsed {
                Display::None
            } else {
                Display::Flex
            };
        }
        for child in children.iter() {
            if let Ok(mut text) = labels.get_mut(*child) {
                if let Some(section) = text.sections.first_mut() {
                    section.value = if state.collapsed { "+" } else { "-" }.to_owned();
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn drag_minimap(
    mut state: ResMut<MinimapState>,
    handles: Query<&Interaction, With<MinimapDragHandle>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    touches: Option<Res<Touches>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    layout: Res<WorldLayout>,
    tuning: Res<GameTuning>,
    mut roots: Query<&mut Style, With<MinimapRoot>>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let map_size = layout.size * tuning.minimap.scale;
    let mouse_held = mouse
        .as_ref()
        .is_some_and(|mouse| mouse.pressed(MouseButton::Left));
    let cursor = window.cursor_position();

    if state.drag.is_none() {
        let handle = drag_handle_rect(state.position, map_size.x);
        let touch_start = touches.as_ref().and_then(|touches| {
            touches
                .iter_just_pressed()
                .find(|touch| handle.contains(touch.position()))
                .map(|touch| (DragPointer::Touch(touch.id()), touch.position()))
        });
        let mouse_start = cursor
            .filter(|_| mouse_held && handles.iter().any(|i| *i == Interaction::Pressed))
            .map(|cursor| (DragPointer::Mouse, cursor));

        if let Some((pointer, at)) = touch_start.or(mouse_start) {
            state.drag = Some(MinimapDrag {
                pointer,
                grab: at - state.position,
            });
        }
    }
    let Some(drag) = state.drag else {
        return;
    };

    let pointer_at = match drag.pointer {
        DragPointer::Mouse if mouse_held => match cursor {
            Some(cursor) => Some(cursor),
            // Cursor left the window mid-drag; hold position until it returns.
            None => return,
        },
        DragPointer::Mouse => None,
        DragPointer::Touch(id) => touches
            .as_ref()
            .and_then(|touches| touches.get_pressed(id))
            .map(|touch| touch.position()),
    };
    let Some(pointer_at) = pointer_at else {
        state.drag = None;
        return;
    };

    let height = if state.collapsed {
        TITLE_HEIGHT
    } else {
        TITLE_HEIGHT + map_size.y
    };
    let viewport = Vec2::new(window.width(), window.height());
    let position = clamp_to_viewport(
        pointer_at - drag.grab,
        Vec2::new(map_size.x, height),
        viewport,
    );
    if position == state.position {
        return;
    }
    state.position = position;

    for mut style in &mut roots {
        style.left = Val::Px(position.x);
        style.top = Val::Px(position.y);
    }
}

fn update_minimap_marker(
    player: Query<&Transform, With<Player>>,
    layout: Res<WorldLayout>,
    tuning: Res<GameTuning>,
    mut markers: Query<&mut Style, With<MinimapMarker>>,
) {
    let Ok(transform) = player.get_single() else {
        return;
    };
    let point = world_to_minimap(
        transform.translation.truncate(),
        tuning.minimap.scale,
        layout.size.y,
    );

    for mut style in &mut markers {
        style.left = Val::Px(point.x - MARKER_SIZE * 0.5);
        style.top = Val::Px(point.y - MARKER_SIZE * 0.5);
    }
}
