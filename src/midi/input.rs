// MIDI input - Feeds the played notes into the activity tracker

use super::event::MidiEvent;
use super::{MidiError, MidiEventProducer, MidiResult};
use midir::MidiInput as MidirInput;
use ringbuf::traits::Producer;
use tracing::warn;

const CLIENT_NAME: &str = "Practice Player MIDI Input";

/// Names of the available input ports
pub fn list_input_ports() -> MidiResult<Vec<String>> {
    let midi_in = MidirInput::new(CLIENT_NAME)?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect())
}

pub struct MidiNoteInput {
    port_name: String,
    _connection: midir::MidiInputConnection<()>,
}

impl MidiNoteInput {
    /// Connect to the preferred port, or the first one
    ///
    /// Events are pushed into `events` from the MIDI thread, a full buffer drops them.
    pub fn connect(preferred_port: Option<&str>, mut events: MidiEventProducer) -> MidiResult<Self> {
        let midi_in = MidirInput::new(CLIENT_NAME)?;
        let named: Vec<_> = midi_in
            .ports()
            .into_iter()
            .filter_map(|port| midi_in.port_name(&port).ok().map(|name| (port, name)))
            .collect();

        let names: Vec<&str> = named.iter().map(|(_, name)| name.as_str()).collect();
        let index = select_port(&names, preferred_port).ok_or(MidiError::NoPort)?;
        let (port, port_name) = &named[index];

        let connection = midi_in
            .connect(
                port,
                "practice-player-input",
                move |_timestamp, message, _| {
                    if let Some(event) = MidiEvent::from_bytes(message) {
                        let _ = events.try_push(event);
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        Ok(Self {
            port_name: port_name.clone(),
            _connection: connection,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Index of the first port containing `preferred`, falling back to the first port
fn select_port(names: &[&str], preferred: Option<&str>) -> Option<usize> {
    if let Some(preferred) = preferred {
        if let Some(index) = names.iter().position(|name| name.contains(preferred)) {
            return Some(index);
        }
        warn!(port = %preferred, "Preferred MIDI port not found, using the first one");
    }

    (!names.is_empty()).then_some(0)
}
