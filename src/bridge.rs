//! Message passing between the scene and the page around it.
//!
//! Outgoing: a confirmed kiosk becomes a `SceneEvent` handed to the installed `SceneEventSink`
//! (DOM `CustomEvent`s in the browser, a log line natively). Modal events pause the scene.
//!
//! Incoming: page code pushes `SceneCommand`s into the shared `SceneInbox`. The scene drains it once
//! per frame, even while paused, so a closed modal can resume play. Native builds have no page, so
//! Escape stands in for closing the open modal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use bevy::prelude::*;
use thiserror::Error;

use crate::state::{GameSet, GameState};
use crate::zones::{KioskActivated, KioskKind};

pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        let inbox = SceneInbox::default();

        #[cfg(all(target_arch = "wasm32", feature = "web"))]
        {
            crate::wasm::listen_for_scene_commands(&inbox);
            app.insert_resource(SceneOutlet(Box::new(crate::wasm::DomEventSink)));
        }

        #[cfg(not(all(target_arch = "wasm32", feature = "web")))]
        app.add_systems(
            Update,
            close_modal_with_escape
                .before(drain_scene_commands)
                .after(GameSet::Effects),
        );

        if !app.world().contains_resource::<SceneOutlet>() {
            app.insert_resource(SceneOutlet(Box::new(LogSink)));
        }

        app.insert_resource(inbox)
            .init_resource::<ActiveModal>()
            .add_event::<SceneEvent>()
            .add_systems(
                Update,
                (drain_scene_commands, forward_kiosk_activations)
                    .chain()
                    .after(GameSet::Effects),
            );
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    OpenSketchCanvas,
    OpenWebcamCapture,
    OpenArTraceTool,
    OpenVideoBooth,
}

impl SceneEvent {
    pub fn dom_name(self) -> &'static str {
        match self {
            SceneEvent::OpenSketchCanvas => "openSketchCanvas",
            SceneEvent::OpenWebcamCapture => "openWebcamCapture",
            SceneEvent::OpenArTraceTool => "openARTraceTool",
            SceneEvent::OpenVideoBooth => "openVideoBooth",
        }
    }

    /// Name of the page event that ends the modal. `None` for overlays that don't pause the scene.
    pub fn resumes_on(self) -> Option<&'static str> {
        match self {
            SceneEvent::OpenSketchCanvas => None,
            SceneEvent::OpenWebcamCapture => Some("webcamClosed"),
            SceneEvent::OpenArTraceTool => Some("arTraceToolClosed"),
            SceneEvent::OpenVideoBooth => Some("videoBoothClosed"),
        }
    }

    pub fn pauses_scene(self) -> bool {
        self.resumes_on().is_some()
    }
}

impl From<KioskKind> for SceneEvent {
    fn from(kind: KioskKind) -> Self {
        match kind {
            KioskKind::Sketch => SceneEvent::OpenSketchCanvas,
            KioskKind::Photo => SceneEvent::OpenWebcamCapture,
            KioskKind::ArTrace => SceneEvent::OpenArTraceTool,
            KioskKind::Video => SceneEvent::OpenVideoBooth,
        }
    }
}

/// Every page event name the scene listens for.
#[cfg_attr(not(all(target_arch = "wasm32", feature = "web")), allow(dead_code))]
pub const MODAL_CLOSED_EVENTS: [&str; 3] = ["webcamClosed", "arTraceToolClosed", "videoBoothClosed"];

/// Page event carrying a kiosk short name in its `detail`, used by UI outside the canvas.
#[cfg_attr(not(all(target_arch = "wasm32", feature = "web")), allow(dead_code))]
pub const REQUEST_KIOSK_EVENT: &str = "requestKiosk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    ModalClosed(String),
    #[cfg_attr(not(all(target_arch = "wasm32", feature = "web")), allow(dead_code))]
    OpenKiosk(KioskKind),
}

#[derive(Resource, Clone, Default)]
pub struct SceneInbox(Arc<Mutex<VecDeque<SceneCommand>>>);

impl SceneInbox {
    pub fn push(&self, command: SceneCommand) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(command);
    }

    pub fn drain(&self) -> Vec<SceneCommand> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

#[derive(Debug, Error)]
#[cfg_attr(not(all(target_arch = "wasm32", feature = "web")), allow(dead_code))]
pub enum BridgeError {
    #[error("browser window is unavailable")]
    NoWindow,
    #[error("dispatching '{event}' failed: {reason}")]
    Dispatch { event: &'static str, reason: String },
}

pub trait SceneEventSink: Send + Sync + 'static {
    fn dispatch(&self, event: SceneEvent) -> Result<(), BridgeError>;
}

#[derive(Resource)]
pub struct SceneOutlet(pub Box<dyn SceneEventSink>);

/// Native stand-in for the page: there are no modals to open, so requests are only logged.
pub struct LogSink;

impl SceneEventSink for LogSink {
    fn dispatch(&self, event: SceneEvent) -> Result<(), BridgeError> {
        info!("Scene event '{}' (no page attached).", event.dom_name());
        Ok(())
    }
}

/// The modal currently holding the scene paused.
#[derive(Resource, Default, Debug)]
pub struct ActiveModal(pub Option<SceneEvent>);

#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
fn close_modal_with_escape(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    active: Res<ActiveModal>,
    inbox: Res<SceneInbox>,
) {
    let pressed = keyboard.is_some_and(|keyboard| keyboard.just_pressed(KeyCode::Escape));
    if !pressed {
        return;
    }
    if let Some(name) = active.0.and_then(SceneEvent::resumes_on) {
        inbox.push(SceneCommand::ModalClosed(name.to_owned()));
    }
}

fn drain_scene_commands(
    inbox: Res<SceneInbox>,
    state: Res<State<GameState>>,
    mut active: ResMut<ActiveModal>,
    mut next_state: ResMut<NextState<GameState>>,
    mut kiosks: EventWriter<KioskActivated>,
) {
    for command in inbox.drain() {
        match command {
            SceneCommand::ModalClosed(name) => {
                let expected = active.0.and_then(SceneEvent::resumes_on);
                if expected == Some(name.as_str()) {
                    info!("'{}' received; resuming scene.", name);
                    active.0 = None;
                    next_state.set(GameState::Playing);
                } else {
                    debug!("Ignoring '{}' with no matching modal open.", name);
                }
            }
            SceneCommand::OpenKiosk(kind) => {
                if *state.get() == GameState::Playing {
                    kiosks.send(KioskActivated(kind));
                } else {
                    debug!("Ignoring request for {} while not playing.", kind.label());
                }
            }
        }
    }
}

fn forward_kiosk_activations(
    mut activations: EventReader<KioskActivated>,
    outlet: Res<SceneOutlet>,
    state: Res<State<GameState>>,
    mut active: ResMut<ActiveModal>,
    mut next_state: ResMut<NextState<GameState>>,
    mut scene_events: EventWriter<SceneEvent>,
) {
    for KioskActivated(kind) in activations.read() {
        if active.0.is_some() {
            continue;
        }

        let event = SceneEvent::from(*kind);
        if let Err(err) = outlet.0.dispatch(event) {
            warn!("{err}");
            continue;
        }
        scene_events.send(event);

        if event.pauses_scene() && *state.get() == GameState::Playing {
            active.0 = Some(event);
            next_state.set(GameState::Paused);
        }
    }
}
