use anyhow::{anyhow, Result};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, KeyboardEvent, WheelEvent};

use super::KeyCode;

/// DOM event listener that unregisters itself when dropped.
pub struct EventListener {
    target: EventTarget,
    event_type: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub fn new<F>(target: &EventTarget, event_type: &'static str, mut handler: F) -> Result<Self>
    where
        F: FnMut(&Event) + 'static,
    {
        let callback =
            Closure::wrap(Box::new(move |event: Event| handler(&event)) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(event_type, callback.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("failed to listen for {event_type}: {err:?}"))?;
        Ok(Self {
            target: target.clone(),
            event_type,
            callback,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback(
            self.event_type,
            self.callback.as_ref().unchecked_ref(),
        );
    }
}

pub fn map_key(event: &KeyboardEvent) -> Option<KeyCode> {
    KeyCode::from_name(&event.key())
}

/// One dolly step per wheel event, positive when scrolling towards the user.
pub fn wheel_steps(event: &WheelEvent) -> f32 {
    let delta = event.delta_y();
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else {
        0.0
    }
}
