//! Global game state definitions. Switching states only updates an enum value and triggers the
//! on-enter/on-exit schedules.
//!
//! `Paused` is driven by the modal bridge rather than a pause key: while an external modal (webcam,
//! AR trace, video booth) is open, every gameplay set stops advancing.

use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::player::CharacterSheet;

/// High-level state machine for the scene.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
    Paused,
}

/// Named system sets to structure the Update schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameSet {
    Input,
    Movement,
    Effects,
}

/// Leaves `Loading` once the character sheet is resolved. A failed load is logged and the scene
/// starts anyway with whatever visuals are available.
pub fn monitor_asset_loading(
    asset_server: Res<AssetServer>,
    sheet: Option<Res<CharacterSheet>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(sheet) = sheet else {
        return;
    };

    match asset_server.get_load_state(sheet.texture.id()) {
        Some(LoadState::Loaded) => next_state.set(GameState::Playing),
        Some(LoadState::Failed(_)) => {
            warn!("Character sheet failed to load; continuing without character art.");
            next_state.set(GameState::Playing);
        }
        _ => {}
    }
}
