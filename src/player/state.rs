// Transport state - Shared record of one player session and its change broadcast
//
// Every registered component sees every change made by any other component.
// The updater is never notified of its own change, a setter given the current
// value notifies nobody. Notification is synchronous and happens on the update
// cycle thread, a callback may call setters again (re-entrant broadcast).

use super::playback::PlaybackMode;
use crate::score::{BeatTimeline, ScoreAudio, SheetGraphics};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Slowest playback speed
pub const MIN_SPEED: f32 = 0.1;
/// Nominal playback speed
pub const MAX_SPEED: f32 = 1.0;
/// Speed changes smaller than this are ignored
pub const SPEED_EPSILON: f32 = 0.001;

/// Snapshot of the transport values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub playback: PlaybackMode,
    /// Current playback position, negative while counting in
    pub tick: i64,
    /// Solo the practised instrument's channel
    pub solo: bool,
    /// Mute the practised instrument's channel
    pub mute: bool,
    pub metronome: bool,
    pub count_in: bool,
    /// Pause when the player misses the expected note
    pub auto_pause: bool,
    pub speed: f32,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            playback: PlaybackMode::Paused,
            tick: 0,
            solo: false,
            mute: false,
            metronome: true,
            count_in: true,
            auto_pause: true,
            speed: MAX_SPEED,
        }
    }
}

/// Identity of a registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    /// Updater that belongs to no component, every component is notified
    pub const EXTERNAL: ComponentId = ComponentId(usize::MAX);
}

/// A participant of the change broadcast
///
/// Every callback receives the receiving component's own handle, changes made
/// through it are attributed to that component.
pub trait Component {
    fn on_start_loading(&self, _state: &StateHandle) {}
    fn on_load_audio(&self, _state: &StateHandle, _audio: &Arc<ScoreAudio>) {}
    fn on_load_timeline(&self, _state: &StateHandle, _timeline: &Arc<BeatTimeline>) {}
    fn on_load_graphics(&self, _state: &StateHandle, _graphics: &Arc<SheetGraphics>) {}
    fn on_end_loading(&self, _state: &StateHandle) {}

    fn on_playback_update(&self, _state: &StateHandle, _playback: PlaybackMode) {}
    fn on_tick_update(&self, _state: &StateHandle, _tick: i64) {}
    fn on_solo_update(&self, _state: &StateHandle, _solo: bool) {}
    fn on_mute_update(&self, _state: &StateHandle, _mute: bool) {}
    fn on_metronome_update(&self, _state: &StateHandle, _metronome: bool) {}
    fn on_count_in_update(&self, _state: &StateHandle, _count_in: bool) {}
    fn on_auto_pause_update(&self, _state: &StateHandle, _auto_pause: bool) {}
    fn on_speed_update(&self, _state: &StateHandle, _speed: f32) {}

    /// Called once per update cycle
    fn poll(&self, _state: &StateHandle) {}
}

type Registration = (ComponentId, Rc<dyn Component>);

/// The transport values and the components they are broadcast to
pub struct SharedState {
    values: Cell<TransportState>,
    components: RefCell<Vec<Registration>>,
    next_id: Cell<usize>,
}

impl SharedState {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            values: Cell::new(TransportState::default()),
            components: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }

    /// Register a component, it receives every later change it did not make
    pub fn register(self: &Rc<Self>, component: Rc<dyn Component>) -> StateHandle {
        let id = ComponentId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.components.borrow_mut().push((id, component));
        StateHandle {
            shared: Rc::clone(self),
            id,
        }
    }

    /// Handle whose changes reach every component
    pub fn external_handle(self: &Rc<Self>) -> StateHandle {
        StateHandle {
            shared: Rc::clone(self),
            id: ComponentId::EXTERNAL,
        }
    }

    pub fn snapshot(&self) -> TransportState {
        self.values.get()
    }

    pub fn component_count(&self) -> usize {
        self.components.borrow().len()
    }

    /// Back to a paused transport at the start of the score
    /// Every component is notified, whoever asked for the reset
    pub fn reset_playback(self: &Rc<Self>) {
        let reset = self.external_handle();
        reset.set_playback(PlaybackMode::Paused);
        reset.set_tick(0);
    }

    /// Call `op` on every component in registration order
    pub fn for_each(self: &Rc<Self>, op: impl Fn(&dyn Component, &StateHandle)) {
        self.notify(ComponentId::EXTERNAL, op);
    }

    fn notify(self: &Rc<Self>, updater: ComponentId, op: impl Fn(&dyn Component, &StateHandle)) {
        // No borrow is held across a callback, components may register or set values
        let mut index = 0;
        loop {
            let entry = self
                .components
                .borrow()
                .get(index)
                .map(|(id, component)| (*id, Rc::clone(component)));
            let Some((id, component)) = entry else {
                break;
            };
            index += 1;

            if id == updater {
                continue;
            }
            let handle = StateHandle {
                shared: Rc::clone(self),
                id,
            };
            op(component.as_ref(), &handle);
        }
    }
}

/// A component's access to the shared transport
#[derive(Clone)]
pub struct StateHandle {
    shared: Rc<SharedState>,
    id: ComponentId,
}

impl StateHandle {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn get(&self) -> TransportState {
        self.shared.snapshot()
    }

    pub fn playback(&self) -> PlaybackMode {
        self.get().playback
    }

    pub fn tick(&self) -> i64 {
        self.get().tick
    }

    pub fn solo(&self) -> bool {
        self.get().solo
    }

    pub fn mute(&self) -> bool {
        self.get().mute
    }

    pub fn metronome(&self) -> bool {
        self.get().metronome
    }

    pub fn count_in(&self) -> bool {
        self.get().count_in
    }

    pub fn auto_pause(&self) -> bool {
        self.get().auto_pause
    }

    pub fn speed(&self) -> f32 {
        self.get().speed
    }

    pub fn set_playback(&self, playback: PlaybackMode) {
        self.apply(playback, |s| &mut s.playback, |c, h, v| c.on_playback_update(h, v));
    }

    pub fn set_tick(&self, tick: i64) {
        self.apply(tick, |s| &mut s.tick, |c, h, v| c.on_tick_update(h, v));
    }

    pub fn set_solo(&self, solo: bool) {
        self.apply(solo, |s| &mut s.solo, |c, h, v| c.on_solo_update(h, v));
    }

    pub fn set_mute(&self, mute: bool) {
        self.apply(mute, |s| &mut s.mute, |c, h, v| c.on_mute_update(h, v));
    }

    pub fn set_metronome(&self, metronome: bool) {
        self.apply(metronome, |s| &mut s.metronome, |c, h, v| c.on_metronome_update(h, v));
    }

    pub fn set_count_in(&self, count_in: bool) {
        self.apply(count_in, |s| &mut s.count_in, |c, h, v| c.on_count_in_update(h, v));
    }

    pub fn set_auto_pause(&self, auto_pause: bool) {
        self.apply(auto_pause, |s| &mut s.auto_pause, |c, h, v| c.on_auto_pause_update(h, v));
    }

    /// Clamped to [MIN_SPEED, MAX_SPEED], listeners receive the clamped value
    pub fn set_speed(&self, speed: f32) {
        if speed.is_nan() {
            return;
        }
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);

        let mut values = self.shared.values.get();
        if (speed - values.speed).abs() < SPEED_EPSILON {
            return;
        }
        values.speed = speed;
        self.shared.values.set(values);
        self.shared
            .notify(self.id, |component, handle| component.on_speed_update(handle, speed));
    }

    /// See `SharedState::reset_playback`
    pub fn reset_playback(&self) {
        self.shared.reset_playback();
    }

    fn apply<T: PartialEq + Copy>(
        &self,
        value: T,
        field: fn(&mut TransportState) -> &mut T,
        notify: fn(&dyn Component, &StateHandle, T),
    ) {
        let mut values = self.shared.values.get();
        let slot = field(&mut values);
        if *slot == value {
            return;
        }
        *slot = value;
        self.shared.values.set(values);
        self.shared
            .notify(self.id, |component, handle| notify(component, handle, value));
    }
}

impl fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("id", &self.id)
            .field("values", &self.get())
            .finish()
    }
}
