// Note activity - Debounced view of the notes the player is holding
//
// A pressed note keeps a timer at the buffering duration, a released note's
// timer runs down with elapsed time. A note is active while its timer is
// positive, so short releases between repeated notes are bridged.

use super::MidiEventConsumer;
use super::event::MidiEvent;
use ringbuf::traits::Consumer;
use std::cell::RefCell;
use std::rc::Rc;

pub const NOTE_COUNT: usize = 128;

const PITCH_CLASSES: usize = 12;

/// Query side of the activity tracker
pub trait NoteActivity {
    /// With `fold_octaves` any note of the same pitch class counts
    fn is_active(&self, pitch: u8, fold_octaves: bool) -> bool;
}

impl<T: NoteActivity> NoteActivity for Rc<RefCell<T>> {
    fn is_active(&self, pitch: u8, fold_octaves: bool) -> bool {
        self.borrow().is_active(pitch, fold_octaves)
    }
}

pub struct NoteActivityTracker {
    events: MidiEventConsumer,
    pressed: [bool; NOTE_COUNT],
    /// Remaining activeness per note, in seconds
    remaining: [f32; NOTE_COUNT],
    buffering_duration: f32,
}

impl NoteActivityTracker {
    pub fn new(events: MidiEventConsumer, buffering_duration: f32) -> Self {
        Self {
            events,
            pressed: [false; NOTE_COUNT],
            remaining: [0.0; NOTE_COUNT],
            buffering_duration,
        }
    }

    /// Drain pending events then advance the timers
    pub fn update(&mut self, elapsed: f32) {
        while let Some(event) = self.events.try_pop() {
            let note = event.note() as usize;
            match event {
                MidiEvent::NoteOn { .. } => {
                    self.pressed[note] = true;
                    // A tap shorter than one cycle still counts
                    self.remaining[note] = self.buffering_duration;
                }
                MidiEvent::NoteOff { .. } => self.pressed[note] = false,
            }
        }

        for (pressed, remaining) in self.pressed.iter().zip(self.remaining.iter_mut()) {
            *remaining = if *pressed {
                self.buffering_duration
            } else {
                (*remaining - elapsed).max(0.0)
            };
        }
    }

    /// Currently active notes, ascending
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..NOTE_COUNT as u8).filter(|&pitch| self.remaining[pitch as usize] > 0.0)
    }
}

impl NoteActivity for NoteActivityTracker {
    fn is_active(&self, pitch: u8, fold_octaves: bool) -> bool {
        let pitch = pitch as usize;
        if pitch >= NOTE_COUNT {
            return false;
        }
        if fold_octaves {
            (pitch % PITCH_CLASSES..NOTE_COUNT)
                .step_by(PITCH_CLASSES)
                .any(|note| self.remaining[note] > 0.0)
        } else {
            self.remaining[pitch] > 0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::create_event_channel;
    use ringbuf::traits::Producer;

    #[test]
    fn test_release_is_debounced() {
        let (mut tx, rx) = create_event_channel(16);
        let mut tracker = NoteActivityTracker::new(rx, 0.25);

        tx.try_push(MidiEvent::NoteOn { note: 40, velocity: 90 }).unwrap();
        tracker.update(0.016);
        assert!(tracker.is_active(40, false));

        tx.try_push(MidiEvent::NoteOff { note: 40 }).unwrap();
        tracker.update(0.125);
        assert!(tracker.is_active(40, false));
        tracker.update(0.125);
        assert!(!tracker.is_active(40, false));
    }

    #[test]
    fn test_held_note_stays_active() {
        let (mut tx, rx) = create_event_channel(16);
        let mut tracker = NoteActivityTracker::new(rx, 0.25);

        tx.try_push(MidiEvent::NoteOn { note: 33, velocity: 90 }).unwrap();
        for _ in 0..100 {
            tracker.update(0.5);
        }
        assert!(tracker.is_active(33, false));
        assert_eq!(tracker.active_notes().collect::<Vec<_>>(), vec![33]);
    }

    #[test]
    fn test_short_tap_counts() {
        let (mut tx, rx) = create_event_channel(16);
        let mut tracker = NoteActivityTracker::new(rx, 0.25);

        tx.try_push(MidiEvent::NoteOn { note: 28, velocity: 90 }).unwrap();
        tx.try_push(MidiEvent::NoteOff { note: 28 }).unwrap();
        tracker.update(0.0);
        assert!(tracker.is_active(28, false));
    }

    #[test]
    fn test_octave_folding() {
        let (mut tx, rx) = create_event_channel(16);
        let mut tracker = NoteActivityTracker::new(rx, 0.25);

        // E1 held, E2 expected
        tx.try_push(MidiEvent::NoteOn { note: 28, velocity: 90 }).unwrap();
        tracker.update(0.0);
        assert!(!tracker.is_active(40, false));
        assert!(tracker.is_active(40, true));
        assert!(tracker.is_active(4, true));
        assert!(!tracker.is_active(41, true));
        assert!(!tracker.is_active(200, true));
    }
}
