// MIDI - Note input of the practised instrument

pub mod activity;
pub mod event;
pub mod input;

pub use activity::{NoteActivity, NoteActivityTracker};
pub use event::MidiEvent;
pub use input::{MidiNoteInput, list_input_ports};

use ringbuf::{HeapRb, traits::Split};
use thiserror::Error;

/// MIDI input errors
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI initialization failed: {0}")]
    Init(#[from] midir::InitError),

    #[error("No MIDI input port detected")]
    NoPort,

    #[error("MIDI connection failed: {0}")]
    Connect(String),
}

pub type MidiResult<T> = Result<T, MidiError>;

/// Lock-free channel from the MIDI callback to the update cycle
pub type MidiEventProducer = ringbuf::HeapProd<MidiEvent>;
pub type MidiEventConsumer = ringbuf::HeapCons<MidiEvent>;

pub fn create_event_channel(capacity: usize) -> (MidiEventProducer, MidiEventConsumer) {
    let rb = HeapRb::<MidiEvent>::new(capacity);
    rb.split()
}
