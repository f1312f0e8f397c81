// Tone renderer - Reference render engine of the player
//
// Blocks are rendered on a worker thread, woken when the output bridge asks
// for samples or when a command arrives. The reported position follows the
// samples actually handed to the hardware, not the rendered ones.

use super::click::{ClickPlayer, ClickType};
use super::engine::RenderEngine;
use super::voice::PluckVoice;
use crate::audio::{AtomicF32, AtomicF64, AudioOutputBridge, AudioResult, CHANNEL_COUNT, OutputListener};
use crate::score::{ScoreAudio, TICKS_PER_QUARTER};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;
use tracing::{debug, info, warn};

const MIDI_CHANNELS: usize = 16;
const MAX_VOICES: usize = 32;
const COMMAND_CAPACITY: usize = 64;
/// Upper bound of a worker sleep, wakeups normally come from unpark
const WORKER_IDLE: Duration = Duration::from_millis(50);

enum RenderCommand {
    Load(Arc<ScoreAudio>),
    /// Start rendering from `start_tick`, after `count_in_ticks` of count-in
    Restart {
        start_tick: i64,
        count_in_ticks: i64,
        count_in_beats: u8,
    },
    Mute(u8, bool),
    Solo(u8, bool),
    ResetChannels,
}

/// Values shared between the control side, the worker and the audio callback
struct RendererShared {
    sample_rate: f64,
    playing: AtomicBool,
    start_tick: AtomicI64,
    /// Ticks heard since the last restart, count-in included
    elapsed_ticks: AtomicF64,
    count_in_ticks: AtomicI64,
    end_tick: AtomicI64,
    bpm: AtomicF64,
    speed: AtomicF32,
    metronome_volume: AtomicF32,
    count_in_volume: AtomicF32,
    finished: Arc<AtomicBool>,
    sample_requested: AtomicBool,
    shutdown: AtomicBool,
}

impl RendererShared {
    /// Score ticks per second of audio
    fn tick_rate(&self) -> f64 {
        self.bpm.get() / 60.0 * TICKS_PER_QUARTER as f64 * self.speed.get() as f64
    }

    fn tick_position(&self) -> i64 {
        let elapsed = self.elapsed_ticks.get();
        let count_in = self.count_in_ticks.load(Ordering::Acquire) as f64;
        if elapsed < count_in {
            elapsed as i64
        } else {
            self.start_tick.load(Ordering::Acquire) + (elapsed - count_in) as i64
        }
    }

    /// Account for frames handed to the hardware
    fn advance(&self, frames: usize) {
        if !self.playing.load(Ordering::Acquire) {
            return;
        }
        let ticks = frames as f64 / self.sample_rate * self.tick_rate();
        self.elapsed_ticks.add(ticks);

        let end = self.end_tick.load(Ordering::Acquire);
        if self.tick_position() >= end && !self.is_counting_in() {
            self.playing.store(false, Ordering::Release);
            self.finished.store(true, Ordering::Release);
        }
    }

    fn is_counting_in(&self) -> bool {
        self.elapsed_ticks.get() < self.count_in_ticks.load(Ordering::Acquire) as f64
    }

    fn restart(&self, start_tick: i64, count_in_ticks: i64) {
        self.start_tick.store(start_tick, Ordering::Release);
        self.count_in_ticks.store(count_in_ticks, Ordering::Release);
        self.elapsed_ticks.set(0.0);
    }
}

/// Output bridge signals, forwarded to the shared clock and the worker
struct RendererSignals {
    shared: Arc<RendererShared>,
    worker: Thread,
}

impl OutputListener for RendererSignals {
    fn on_ready(&self) {
        info!("Renderer attached to the audio output");
    }

    fn on_samples_played(&self, frames: usize) {
        self.shared.advance(frames);
    }

    fn on_sample_request(&self) {
        self.shared.sample_requested.store(true, Ordering::Release);
        self.worker.unpark();
    }
}

pub struct ToneRenderer {
    shared: Arc<RendererShared>,
    commands: HeapProd<RenderCommand>,
    output: Arc<AudioOutputBridge>,
    worker: Option<JoinHandle<()>>,
    audio: Option<Arc<ScoreAudio>>,
}

impl ToneRenderer {
    /// Spawn the render worker and attach it to `output`
    pub fn new(output: Arc<AudioOutputBridge>, sample_rate: u32) -> AudioResult<Self> {
        let shared = Arc::new(RendererShared {
            sample_rate: sample_rate as f64,
            playing: AtomicBool::new(false),
            start_tick: AtomicI64::new(0),
            elapsed_ticks: AtomicF64::default(),
            count_in_ticks: AtomicI64::new(0),
            end_tick: AtomicI64::new(0),
            bpm: AtomicF64::new(120.0),
            speed: AtomicF32::new(1.0),
            metronome_volume: AtomicF32::default(),
            count_in_volume: AtomicF32::default(),
            finished: Arc::new(AtomicBool::new(false)),
            sample_requested: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });

        let (commands, command_rx) = HeapRb::<RenderCommand>::new(COMMAND_CAPACITY).split();

        let block_len = output.layout().capacity();
        let worker = {
            let shared = Arc::clone(&shared);
            let output = Arc::clone(&output);
            thread::Builder::new()
                .name("tone-renderer".to_string())
                .spawn(move || run_worker(shared, command_rx, output, block_len))?
        };

        output.connect(Arc::new(RendererSignals {
            shared: Arc::clone(&shared),
            worker: worker.thread().clone(),
        }))?;

        Ok(Self {
            shared,
            commands,
            output,
            worker: Some(worker),
            audio: None,
        })
    }

    pub fn output(&self) -> &Arc<AudioOutputBridge> {
        &self.output
    }

    fn send(&mut self, command: RenderCommand) {
        if self.commands.try_push(command).is_err() {
            warn!("Renderer command queue full, command dropped");
        }
        self.wake_worker();
    }

    fn wake_worker(&self) {
        if let Some(worker) = &self.worker {
            worker.thread().unpark();
        }
    }

    fn restart(&mut self, start_tick: i64, count_in_beats: u8) {
        let count_in_ticks = TICKS_PER_QUARTER * count_in_beats as i64;
        self.shared.restart(start_tick, count_in_ticks);
        self.send(RenderCommand::Restart {
            start_tick,
            count_in_ticks,
            count_in_beats,
        });
    }
}

impl RenderEngine for ToneRenderer {
    fn load(&mut self, audio: Arc<ScoreAudio>) {
        self.shared.playing.store(false, Ordering::Release);
        self.output.stop();
        self.shared.bpm.set(audio.tempo().bpm());
        self.shared.end_tick.store(audio.end_tick(), Ordering::Release);
        self.shared.restart(0, 0);
        self.audio = Some(Arc::clone(&audio));
        self.send(RenderCommand::Load(audio));
        debug!("Score audio loaded into the renderer");
    }

    fn play(&mut self) {
        let Some(audio) = self.audio.clone() else {
            warn!("Play requested without score audio");
            return;
        };
        let start = self.shared.tick_position().max(0);
        let count_in_beats = if self.shared.count_in_volume.get() > 0.0 {
            audio.time_signature_at(start).numerator
        } else {
            0
        };

        self.restart(start, count_in_beats);
        self.shared.playing.store(true, Ordering::Release);
        self.output.reset();
        self.output.start();
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.output.stop();
    }

    fn tick_position(&self) -> i64 {
        self.shared.tick_position()
    }

    fn set_tick_position(&mut self, tick: i64) {
        self.restart(tick, 0);
        self.output.reset();
    }

    fn reset_channel_states(&mut self) {
        self.send(RenderCommand::ResetChannels);
    }

    fn set_channel_mute(&mut self, channel: u8, mute: bool) {
        self.send(RenderCommand::Mute(channel, mute));
    }

    fn set_channel_solo(&mut self, channel: u8, solo: bool) {
        self.send(RenderCommand::Solo(channel, solo));
    }

    fn set_metronome_volume(&mut self, volume: f32) {
        self.shared.metronome_volume.set(volume.clamp(0.0, 1.0));
    }

    fn set_count_in_volume(&mut self, volume: f32) {
        self.shared.count_in_volume.set(volume.clamp(0.0, 1.0));
    }

    fn set_playback_speed(&mut self, speed: f32) {
        self.shared.speed.set(speed);
    }

    fn is_playing_count_in(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire) && self.shared.is_counting_in()
    }

    fn finished_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.finished)
    }
}

impl Drop for ToneRenderer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            if worker.join().is_err() {
                warn!("Render worker panicked");
            }
        }
    }
}

fn run_worker(
    shared: Arc<RendererShared>,
    mut commands: HeapCons<RenderCommand>,
    output: Arc<AudioOutputBridge>,
    block_len: usize,
) {
    let mut renderer = BlockRenderer::new(shared.sample_rate as f32);
    let mut block = vec![0.0f32; block_len];

    while !shared.shutdown.load(Ordering::Acquire) {
        while let Some(command) = commands.try_pop() {
            renderer.apply(command);
        }

        if shared.sample_requested.swap(false, Ordering::AcqRel) && shared.playing.load(Ordering::Acquire) {
            renderer.render(&shared, &mut block);
            output.produce(&block);
        }

        thread::park_timeout(WORKER_IDLE);
    }
}

/// Worker side render state
struct BlockRenderer {
    sample_rate: f32,
    audio: Option<Arc<ScoreAudio>>,
    voices: Vec<PluckVoice>,
    clicks: ClickPlayer,
    /// Render position in ticks since the last restart, count-in included
    position: f64,
    start_tick: i64,
    count_in_ticks: i64,
    count_in_beats: u8,
    next_note: usize,
    muted: [bool; MIDI_CHANNELS],
    soloed: [bool; MIDI_CHANNELS],
}

impl BlockRenderer {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            audio: None,
            voices: Vec::with_capacity(MAX_VOICES),
            clicks: ClickPlayer::new(sample_rate),
            position: 0.0,
            start_tick: 0,
            count_in_ticks: 0,
            count_in_beats: 0,
            next_note: 0,
            muted: [false; MIDI_CHANNELS],
            soloed: [false; MIDI_CHANNELS],
        }
    }

    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Load(audio) => {
                self.audio = Some(audio);
                self.restart(0, 0, 0);
            }
            RenderCommand::Restart {
                start_tick,
                count_in_ticks,
                count_in_beats,
            } => self.restart(start_tick, count_in_ticks, count_in_beats),
            RenderCommand::Mute(channel, mute) => self.muted[channel as usize % MIDI_CHANNELS] = mute,
            RenderCommand::Solo(channel, solo) => self.soloed[channel as usize % MIDI_CHANNELS] = solo,
            RenderCommand::ResetChannels => {
                self.muted = [false; MIDI_CHANNELS];
                self.soloed = [false; MIDI_CHANNELS];
            }
        }
    }

    fn restart(&mut self, start_tick: i64, count_in_ticks: i64, count_in_beats: u8) {
        self.position = 0.0;
        self.start_tick = start_tick;
        self.count_in_ticks = count_in_ticks;
        self.count_in_beats = count_in_beats;
        self.next_note = self
            .audio
            .as_ref()
            .map_or(0, |audio| audio.first_note_from(start_tick));
        self.voices.clear();
        self.clicks.reset();
    }

    fn is_audible(&self, channel: u8) -> bool {
        let channel = channel as usize % MIDI_CHANNELS;
        if self.muted[channel] {
            return false;
        }
        !self.soloed.iter().any(|&solo| solo) || self.soloed[channel]
    }

    fn render(&mut self, shared: &RendererShared, block: &mut [f32]) {
        let tick_rate = shared.tick_rate();
        let ticks_per_frame = tick_rate / self.sample_rate as f64;
        let metronome_volume = shared.metronome_volume.get();
        let count_in_volume = shared.count_in_volume.get();
        let count_in = self.count_in_ticks as f64;

        for frame in block.chunks_exact_mut(CHANNEL_COUNT) {
            let from = self.position;
            let to = from + ticks_per_frame;
            self.position = to;

            if from < count_in {
                if let Some(beat) = crossed_quarter(from, to.min(count_in)) {
                    let click = if beat % self.count_in_beats.max(1) as i64 == 0 {
                        ClickType::Accent
                    } else {
                        ClickType::Regular
                    };
                    self.clicks.trigger(click, count_in_volume);
                }
            }

            if to > count_in {
                let score_from = self.start_tick as f64 + (from - count_in).max(0.0);
                let score_to = self.start_tick as f64 + (to - count_in);
                self.start_notes(score_to, tick_rate);

                if let Some(beat) = crossed_quarter(score_from, score_to) {
                    self.metronome_click(beat, metronome_volume);
                }
            }

            let mut sample = self.clicks.process_sample();
            for voice in &mut self.voices {
                sample += voice.next_sample();
            }
            frame.fill(sample);
        }

        self.voices.retain(|voice| !voice.is_finished());
    }

    /// Start every note beginning before `until`
    fn start_notes(&mut self, until: f64, tick_rate: f64) {
        let Some(audio) = self.audio.clone() else {
            return;
        };
        let notes = audio.notes();
        while let Some(note) = notes.get(self.next_note) {
            if note.tick as f64 >= until {
                break;
            }
            self.next_note += 1;
            if !self.is_audible(note.channel) {
                continue;
            }
            if self.voices.len() >= MAX_VOICES {
                self.voices.remove(0);
            }
            let duration = (note.duration_ticks as f64 / tick_rate) as f32;
            self.voices
                .push(PluckVoice::new(note.pitch, note.velocity, duration, self.sample_rate));
        }
    }

    fn metronome_click(&mut self, quarter: i64, volume: f32) {
        let Some(audio) = &self.audio else {
            return;
        };
        let numerator = audio.time_signature_at(quarter * TICKS_PER_QUARTER).numerator;
        let click = if quarter % numerator.max(1) as i64 == 0 {
            ClickType::Accent
        } else {
            ClickType::Regular
        };
        self.clicks.trigger(click, volume);
    }
}

/// Quarter boundary within [from, to), as a quarter index
fn crossed_quarter(from: f64, to: f64) -> Option<i64> {
    let quarter = (from / TICKS_PER_QUARTER as f64).ceil();
    (quarter * (TICKS_PER_QUARTER as f64) < to).then_some(quarter as i64)
}
