// Playback synchronization through a full player session
//
// A scripted render engine and a scripted note input are driven through the
// player's update cycle, the way the binary wires the real ones.

use practice_player::loading::LoadingListener;
use practice_player::midi::NoteActivity;
use practice_player::player::{
    Component, EngineBridge, InputMatcher, MatcherSettings, PlaybackMode, Player, StateHandle,
};
use practice_player::score::{Beat, BeatTimeline, Note, ScoreAudio, SheetGraphics, Tempo, TimeSignature};
use practice_player::synth::RenderEngine;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct EngineScript {
    calls: Vec<String>,
    tick: i64,
    counting_in: bool,
}

#[derive(Clone, Default)]
struct ScriptedEngine {
    script: Rc<RefCell<EngineScript>>,
    finished: Arc<AtomicBool>,
}

impl ScriptedEngine {
    fn advance_to(&self, tick: i64) {
        self.script.borrow_mut().tick = tick;
    }

    fn last_call(&self) -> Option<String> {
        self.script.borrow().calls.last().cloned()
    }
}

impl RenderEngine for ScriptedEngine {
    fn load(&mut self, _audio: Arc<ScoreAudio>) {
        self.script.borrow_mut().calls.push("load".into());
    }
    fn play(&mut self) {
        self.script.borrow_mut().calls.push("play".into());
    }
    fn pause(&mut self) {
        self.script.borrow_mut().calls.push("pause".into());
    }
    fn tick_position(&self) -> i64 {
        self.script.borrow().tick
    }
    fn set_tick_position(&mut self, tick: i64) {
        let mut script = self.script.borrow_mut();
        script.tick = tick;
        script.calls.push(format!("tick {}", tick));
    }
    fn reset_channel_states(&mut self) {}
    fn set_channel_mute(&mut self, _channel: u8, _mute: bool) {}
    fn set_channel_solo(&mut self, _channel: u8, _solo: bool) {}
    fn set_metronome_volume(&mut self, _volume: f32) {}
    fn set_count_in_volume(&mut self, _volume: f32) {}
    fn set_playback_speed(&mut self, speed: f32) {
        self.script.borrow_mut().calls.push(format!("speed {}", speed));
    }
    fn is_playing_count_in(&self) -> bool {
        self.script.borrow().counting_in
    }
    fn finished_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }
}

/// Notes the player is holding
#[derive(Default)]
struct HeldNotes(Vec<u8>);

impl NoteActivity for HeldNotes {
    fn is_active(&self, pitch: u8, fold_octaves: bool) -> bool {
        self.0.iter().any(|&held| {
            if fold_octaves {
                held % 12 == pitch % 12
            } else {
                held == pitch
            }
        })
    }
}

/// Records the value changes it is told about
#[derive(Default)]
struct ChangeLog(RefCell<Vec<String>>);

impl ChangeLog {
    fn take(&self) -> Vec<String> {
        self.0.take()
    }
}

impl Component for ChangeLog {
    fn on_playback_update(&self, _state: &StateHandle, playback: PlaybackMode) {
        self.0.borrow_mut().push(format!("playback {}", playback));
    }
    fn on_tick_update(&self, _state: &StateHandle, tick: i64) {
        self.0.borrow_mut().push(format!("tick {}", tick));
    }
    fn on_metronome_update(&self, _state: &StateHandle, metronome: bool) {
        self.0.borrow_mut().push(format!("metronome {}", metronome));
    }
    fn on_speed_update(&self, _state: &StateHandle, speed: f32) {
        self.0.borrow_mut().push(format!("speed {}", speed));
    }
}

fn note(pitch: u8) -> Option<Note> {
    Some(Note {
        duration_ticks: 480,
        string: 1,
        fret: 2,
        pitch,
    })
}

/// Rest at 0, notes at 480 and 960, rest at 1440, note at 1920, 40 BPM
fn timeline() -> BeatTimeline {
    let ts = TimeSignature::four_four();
    let beats = vec![
        Beat::new(0, 0, None, ts),
        Beat::new(480, 10, note(40), ts),
        Beat::new(960, 20, note(43), ts),
        Beat::new(1440, 30, None, ts),
        Beat::new(1920, 40, note(45), ts),
    ];
    BeatTimeline::new(beats, 2400, 50, Tempo::new(40.0)).unwrap()
}

/// 10 ticks of delay and 40 ticks of radius at 40 BPM
fn settings() -> MatcherSettings {
    MatcherSettings {
        note_delay: 0.015625,
        detection_radius: 0.0625,
        distinguish_octaves: true,
    }
}

struct Session {
    player: Player,
    engine: ScriptedEngine,
    held: Rc<RefCell<HeldNotes>>,
    log: Rc<ChangeLog>,
}

fn session() -> Session {
    let mut player = Player::new(4);
    let engine = ScriptedEngine::default();
    let held = Rc::new(RefCell::new(HeldNotes::default()));
    let log = Rc::new(ChangeLog::default());

    player.register(Rc::new(EngineBridge::new(engine.clone())));
    player.register(Rc::new(InputMatcher::new(Rc::clone(&held), settings())));
    player.register(Rc::clone(&log));

    player.on_start_loading();
    player.on_load_audio(Arc::new(ScoreAudio::new(vec![], 0, Tempo::new(40.0), vec![], 2400)));
    player.on_load_timeline(Arc::new(timeline()));
    player.on_load_graphics(Arc::new(SheetGraphics::new(50, 10, 30, vec![])));
    player.on_finish_loading();
    player.set_count_in(false);
    player.set_auto_pause(false);
    log.take();

    Session {
        player,
        engine,
        held,
        log,
    }
}

/// The engine runs on to `tick`, then one update cycle
fn cycle(session: &Session, tick: i64) {
    session.engine.advance_to(tick);
    session.player.poll();
}

#[test]
fn test_play_follows_engine_position() {
    let session = session();
    assert!(session.player.request_play(true));
    assert_eq!(session.engine.last_call().as_deref(), Some("play"));

    cycle(&session, 700);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Playing);
    assert_eq!(state.tick, 700);
    assert_eq!(session.player.visual_position(), Some(14));
}

#[test]
fn test_missed_note_pauses_and_rewinds() {
    let session = session();
    session.player.set_auto_pause(true);
    session.player.request_play(true);

    cycle(&session, 400);
    assert_eq!(session.player.state().playback, PlaybackMode::Playing);

    // 531 - 10 is past 480 + 40
    cycle(&session, 531);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 0);
    assert_eq!(session.engine.last_call().as_deref(), Some("pause"));
}

#[test]
fn test_hit_notes_keep_playing_until_next_miss() {
    let session = session();
    session.player.set_auto_pause(true);
    session.player.request_play(true);

    session.held.borrow_mut().0 = vec![40];
    cycle(&session, 490);
    session.held.borrow_mut().0 = vec![43];
    cycle(&session, 970);
    session.held.borrow_mut().0.clear();

    cycle(&session, 1500);
    assert_eq!(session.player.state().playback, PlaybackMode::Playing);

    // Nothing played for the note at 1920, back to the rest before it
    cycle(&session, 1971);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 1440);
}

#[test]
fn test_auto_pause_off_ignores_misses() {
    let session = session();
    session.player.request_play(true);
    cycle(&session, 1000);
    cycle(&session, 2000);
    assert_eq!(session.player.state().playback, PlaybackMode::Playing);
}

#[test]
fn test_unchanged_values_are_not_broadcast() {
    let session = session();
    session.player.set_metronome(false);
    session.player.set_metronome(false);
    session.player.set_speed(0.5);
    session.player.set_speed(0.5004);
    assert_eq!(session.log.take(), vec!["metronome false", "speed 0.5"]);
    assert_eq!(session.engine.last_call().as_deref(), Some("speed 0.5"));
}

#[test]
fn test_speed_is_clamped_before_broadcast() {
    let session = session();
    session.player.set_speed(3.0);
    assert!(session.log.take().is_empty());
    session.player.set_speed(0.0);
    assert_eq!(session.log.take(), vec!["speed 0.1"]);
    session.player.set_speed(f32::NAN);
    assert!(session.log.take().is_empty());
}

#[test]
fn test_score_end_resets_every_component() {
    let session = session();
    session.player.request_play(true);
    cycle(&session, 1200);
    session.log.take();

    session.engine.finished.store(true, Ordering::Release);
    cycle(&session, 2400);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 0);
    assert_eq!(
        session.log.take(),
        vec!["tick 2400", "playback paused", "tick 0"]
    );
}

#[test]
fn test_count_in_leads_into_playback() {
    let session = session();
    session.player.set_count_in(true);
    session.player.start_scroll(20);
    session.player.end_scroll(20);
    assert_eq!(session.player.state().tick, 960);

    assert!(session.player.request_play(true));
    assert_eq!(session.player.state().playback, PlaybackMode::CountingIn);
    // Toggling is refused while counting in
    assert!(!session.player.request_play(false));

    session.engine.script.borrow_mut().counting_in = true;
    cycle(&session, 960);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::CountingIn);
    assert_eq!(state.tick, 960 - 3840 + 960);
    assert!(session.player.cues().iter().all(|cue| cue.convergence < 1.0));

    session.engine.script.borrow_mut().counting_in = false;
    cycle(&session, 980);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Playing);
    assert_eq!(state.tick, 980);
}

#[test]
fn test_auto_pause_waits_for_count_in_to_end() {
    let session = session();
    session.player.set_count_in(true);
    session.player.set_auto_pause(true);
    assert!(session.player.request_play(true));

    // The whole bar of count-in plays with nothing held
    session.engine.script.borrow_mut().counting_in = true;
    for elapsed in [0, 2000, 3500, 3839] {
        cycle(&session, elapsed);
        let state = session.player.state();
        assert_eq!(state.playback, PlaybackMode::CountingIn);
        assert_eq!(state.tick, elapsed - 3840);
    }

    session.engine.script.borrow_mut().counting_in = false;
    cycle(&session, 20);
    assert_eq!(session.player.state().playback, PlaybackMode::Playing);

    // Matching resumes with the first note
    cycle(&session, 531);
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 0);
}

#[test]
fn test_pause_snaps_to_current_beat() {
    let session = session();
    session.player.request_play(true);
    cycle(&session, 1300);
    assert!(session.player.toggle_play());
    let state = session.player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 960);
}
