// MIDI events - Raw message parsing
// Only note messages matter to the player, everything else is dropped

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl MidiEvent {
    /// Parse a raw MIDI message, channel is ignored
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if data.len() < 2 {
            return None;
        }
        let note = data[0] & 0x7F;

        match status & 0xF0 {
            0x90 => {
                let velocity = data[1] & 0x7F;
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiEvent::NoteOff { note })
                } else {
                    Some(MidiEvent::NoteOn { note, velocity })
                }
            }
            0x80 => Some(MidiEvent::NoteOff { note }),
            _ => None,
        }
    }

    pub fn note(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note } => note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        let event = MidiEvent::from_bytes(&[0x90, 40, 100]).unwrap();
        assert_eq!(event, MidiEvent::NoteOn { note: 40, velocity: 100 });
        assert_eq!(event.note(), 40);
    }

    #[test]
    fn test_note_off_on_any_channel() {
        assert_eq!(
            MidiEvent::from_bytes(&[0x85, 28, 64]),
            Some(MidiEvent::NoteOff { note: 28 })
        );
    }

    #[test]
    fn test_note_off_velocity_zero() {
        // Note On with velocity 0 = Note Off
        assert_eq!(
            MidiEvent::from_bytes(&[0x9F, 33, 0]),
            Some(MidiEvent::NoteOff { note: 33 })
        );
    }

    #[test]
    fn test_ignored_messages() {
        assert_eq!(MidiEvent::from_bytes(&[]), None);
        assert_eq!(MidiEvent::from_bytes(&[0x90, 40]), None);
        // Control change
        assert_eq!(MidiEvent::from_bytes(&[0xB0, 7, 127]), None);
        // Pitch bend
        assert_eq!(MidiEvent::from_bytes(&[0xE0, 0x00, 0x40]), None);
    }
}
