use practice_player::audio::{AudioOutputBridge, AudioOutputDevice, list_output_devices};
use practice_player::config::PlayerConfig;
use practice_player::loading::{DocumentSource, Loader, ScoreLibrary};
use practice_player::midi::{
    MidiNoteInput, NoteActivityTracker, create_event_channel, list_input_ports,
};
use practice_player::player::{EngineBridge, InputMatcher, PlaybackMode, Player, TransportState};
use practice_player::synth::ToneRenderer;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// Ringbuffer capacity for MIDI events
// A MIDI cable carries ~1000 messages/second at most, the update cycle drains
// the buffer 60 times per second
const MIDI_RINGBUFFER_CAPACITY: usize = 256;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Practice Player ===");

    let config = match PlayerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(%e, "Config ignored, using defaults");
            PlayerConfig::default()
        }
    };

    let Some(score) = pick_score(&config) else {
        error!(folder = %config.scores_folder.display(), "No score to practise");
        return;
    };

    let layout = match config.layout() {
        Ok(layout) => layout,
        Err(e) => {
            error!(%e, "Invalid audio layout");
            return;
        }
    };

    // Audio: device pulls from the bridge, the renderer fills it
    info!(devices = ?list_output_devices(), "Audio outputs");
    let bridge = Arc::new(AudioOutputBridge::new(layout));
    let device = match AudioOutputDevice::open(Arc::clone(&bridge)) {
        Ok(device) => device,
        Err(e) => {
            error!(%e, "Audio output unavailable");
            return;
        }
    };
    let renderer = match ToneRenderer::new(Arc::clone(&bridge), device.sample_rate()) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!(%e, "Renderer failed to start");
            return;
        }
    };
    bridge.open();
    info!(device = device.name(), "Audio output ready");

    // MIDI: callback thread to the activity tracker through a ring buffer
    let (midi_tx, midi_rx) = create_event_channel(MIDI_RINGBUFFER_CAPACITY);
    let tracker = Rc::new(RefCell::new(NoteActivityTracker::new(
        midi_rx,
        config.note_buffering_duration as f32,
    )));
    match list_input_ports() {
        Ok(ports) => info!(?ports, "MIDI inputs"),
        Err(e) => warn!(%e, "Cannot list MIDI inputs"),
    }
    let _midi_input = match MidiNoteInput::connect(config.midi_port.as_deref(), midi_tx) {
        Ok(input) => {
            info!(port = input.port_name(), "Listening for notes");
            Some(input)
        }
        Err(e) => {
            warn!(%e, "MIDI unavailable, every note reads as released");
            None
        }
    };

    let mut player = Player::new(config.look_ahead_beats);
    player.register(Rc::new(EngineBridge::new(renderer)));
    player.register(Rc::new(InputMatcher::new(
        Rc::clone(&tracker),
        config.matcher_settings(),
    )));
    if std::env::args().any(|arg| arg == "--no-auto-pause") {
        player.set_auto_pause(false);
    }

    let mut loader = Loader::new();
    if let Err(e) = loader.request(DocumentSource::new(score, config.sheet_layout()), &mut player) {
        error!(%e, "Score request refused");
        return;
    }

    run(&config, &mut player, &mut loader, &tracker, &device);
}

/// Score named on the command line, otherwise the first one of the library
fn pick_score(config: &PlayerConfig) -> Option<PathBuf> {
    if let Some(path) = std::env::args().skip(1).find(|arg| !arg.starts_with("--")) {
        return Some(PathBuf::from(path));
    }

    let library = ScoreLibrary::new(&config.scores_folder);
    match library.list() {
        Ok(scores) => scores.into_iter().next(),
        Err(e) => {
            warn!(%e, "Score library unavailable");
            None
        }
    }
}

/// The update cycle
///
/// Plays the score once. While auto-paused, any played note resumes.
fn run(
    config: &PlayerConfig,
    player: &mut Player,
    loader: &mut Loader,
    tracker: &Rc<RefCell<NoteActivityTracker>>,
    device: &AudioOutputDevice,
) {
    let period = Duration::from_secs_f64(1.0 / config.update_rate_hz as f64);
    let mut last = Instant::now();
    let mut started = false;
    let mut reported = player.state();

    loop {
        let now = Instant::now();
        tracker.borrow_mut().update(now.duration_since(last).as_secs_f32());
        last = now;

        loader.update(player);
        player.poll();

        if device.has_failed() {
            error!("Audio stream stopped");
            return;
        }

        let state = player.state();
        if state.playback != reported.playback {
            info!(playback = %state.playback, tick = state.tick, "Transport");
        }

        if player.is_loaded() && !loader.is_loading() {
            match state.playback {
                PlaybackMode::Paused if !started => {
                    started = player.request_play(true);
                }
                PlaybackMode::Paused if finished(player, &reported, state.tick) => {
                    info!("Score finished");
                    return;
                }
                PlaybackMode::Paused => {
                    let resume = tracker.borrow().active_notes().next().is_some();
                    if resume {
                        player.request_play(true);
                    }
                }
                _ => {}
            }
        } else if !loader.is_loading() && !player.is_loaded() {
            error!("Nothing to play");
            return;
        }
        reported = state;

        std::thread::sleep(period.saturating_sub(now.elapsed()));
    }
}

/// The engine bridge rewinds to the start once the last beat has played
fn finished(player: &Player, previous: &TransportState, tick: i64) -> bool {
    let Some(timeline) = player.timeline() else {
        return false;
    };
    let last_beat = timeline.beat(timeline.end_index().saturating_sub(1)).tick;
    tick == 0 && previous.playback == PlaybackMode::Playing && previous.tick >= last_beat
}
