//! Audio event bus
//!
//! Single-consumer FIFO queue carrying the notifications the orchestrator
//! reacts to. Producers (settings UI, scene loader) hold clones of the same
//! [`EventBus`]; the orchestrator drains it once per tick.
//!
//! Supports immediate delivery ([`EventBus::send`], delivered on the next
//! drain) and deferred delivery ([`EventBus::post`], delivered on the first
//! drain at or after the requested bus time).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Notifications consumed by the audio orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEvent {
    /// Audio configuration changed (volumes, output device reset)
    ConfigChanged,
    /// Music was switched on by the player
    MusicEnabled,
    /// Music was switched off by the player
    MusicDisabled,
    /// The current scene was unloaded
    SceneUnloaded,
}

#[derive(Debug, Default)]
struct BusState {
    immediate: VecDeque<AudioEvent>,
    deferred: Vec<(f64, AudioEvent)>,
    current_time: f64,
}

/// Cloneable handle to a shared event queue
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    /// Create a new empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next drain
    pub fn send(&self, event: AudioEvent) {
        self.state.borrow_mut().immediate.push_back(event);
    }

    /// Queue an event for delivery `delay` seconds of bus time from now
    pub fn post(&self, delay: f64, event: AudioEvent) {
        let mut state = self.state.borrow_mut();
        let delivery_time = state.current_time + delay.max(0.0);
        state.deferred.push((delivery_time, event));
    }

    /// Advance bus time by `delta_time` and take every due event
    ///
    /// Immediate events come first in send order, followed by due deferred
    /// events in post order.
    pub fn drain(&self, delta_time: f32) -> Vec<AudioEvent> {
        let mut state = self.state.borrow_mut();
        state.current_time += f64::from(delta_time.max(0.0));

        let mut due: Vec<AudioEvent> = state.immediate.drain(..).collect();

        let now = state.current_time;
        let mut i = 0;
        while i < state.deferred.len() {
            if state.deferred[i].0 <= now {
                let (_, event) = state.deferred.remove(i);
                due.push(event);
            } else {
                i += 1;
            }
        }

        due
    }

    /// Number of events still waiting (immediate and deferred)
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.immediate.len() + state.deferred.len()
    }

    /// Current bus time in seconds
    pub fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    /// Drop every queued event (useful for state transitions)
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.immediate.clear();
        state.deferred.clear();
    }
}
