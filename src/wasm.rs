//! Browser glue for WebAssembly builds: the panic hook, DOM `CustomEvent`s going out to the page's
//! modal components, page events coming back into the scene inbox, and the launch query string.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::bridge::{
    BridgeError, SceneCommand, SceneEvent, SceneEventSink, SceneInbox, MODAL_CLOSED_EVENTS,
    REQUEST_KIOSK_EVENT,
};
use crate::zones::KioskKind;

/// By default Rust panics just call `abort` in WASM; installing a panic hook pipes the message
/// into the browser console instead.
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Fires each scene event as a payload-less `CustomEvent` on `window`.
pub struct DomEventSink;

impl SceneEventSink for DomEventSink {
    fn dispatch(&self, event: SceneEvent) -> Result<(), BridgeError> {
        let window = web_sys::window().ok_or(BridgeError::NoWindow)?;
        let name = event.dom_name();
        let dom_event = web_sys::CustomEvent::new(name).map_err(|err| BridgeError::Dispatch {
            event: name,
            reason: format!("{err:?}"),
        })?;
        window
            .dispatch_event(&dom_event)
            .map_err(|err| BridgeError::Dispatch {
                event: name,
                reason: format!("{err:?}"),
            })?;
        Ok(())
    }
}

/// Registers window listeners that translate page events into `SceneCommand`s. The closures live
/// for the whole page session, so they are leaked on purpose.
pub fn listen_for_scene_commands(inbox: &SceneInbox) {
    let Some(window) = web_sys::window() else {
        web_sys::console::warn_1(&"No browser window; scene commands disabled.".into());
        return;
    };

    for name in MODAL_CLOSED_EVENTS {
        let inbox = inbox.clone();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            inbox.push(SceneCommand::ModalClosed(name.to_owned()));
        });
        if window
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            .is_err()
        {
            web_sys::console::warn_1(&format!("Could not listen for '{name}'.").into());
        }
        closure.forget();
    }

    let requests = inbox.clone();
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        let kind = event
            .dyn_into::<web_sys::CustomEvent>()
            .ok()
            .and_then(|custom| custom.detail().as_string())
            .and_then(|detail| KioskKind::from_query_value(&detail));
        match kind {
            Some(kind) => requests.push(SceneCommand::OpenKiosk(kind)),
            None => web_sys::console::warn_1(
                &format!("Ignoring '{REQUEST_KIOSK_EVENT}' without a known kiosk.").into(),
            ),
        }
    });
    if window
        .add_event_listener_with_callback(REQUEST_KIOSK_EVENT, closure.as_ref().unchecked_ref())
        .is_err()
    {
        web_sys::console::warn_1(&format!("Could not listen for '{REQUEST_KIOSK_EVENT}'.").into());
    }
    closure.forget();
}

/// The page's `location.search`, e.g. `?npc=photo`.
pub fn location_query() -> Option<String> {
    web_sys::window()?.location().search().ok()
}
