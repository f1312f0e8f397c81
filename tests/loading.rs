// Score documents loaded from disk into a player

use practice_player::loading::{DocumentSource, LoadError, Loader, LoadingStep, ScoreLibrary};
use practice_player::player::{PlaybackMode, Player};
use practice_player::score::SheetLayout;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BASS_LINE: &str = r#"(
    title: "Root notes",
    tempo: 90.0,
    tracks: [
        (
            name: "Bass",
            program: 34,
            channel: 0,
            tuning: [43, 38, 33, 28],
            bars: [
                (beats: [
                    (duration: 960, note: Some((string: 3, fret: 3))),
                    (duration: 960),
                    (duration: 960, note: Some((string: 2, fret: 0))),
                    (duration: 960, note: Some((string: 2, fret: 2))),
                ]),
                (
                    time_signature: (numerator: 3, denominator: 4),
                    beats: [
                        (duration: 1920, note: Some((string: 3, fret: 5))),
                        (duration: 960),
                    ],
                ),
            ],
        ),
    ],
)"#;

/// Update cycles until the loader settles
fn run_loader(loader: &mut Loader, player: &mut Player) -> LoadingStep {
    let deadline = Instant::now() + Duration::from_secs(10);
    while loader.is_loading() && Instant::now() < deadline {
        loader.update(player);
        std::thread::sleep(Duration::from_millis(1));
    }
    loader.step()
}

#[test]
fn test_document_reaches_player() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("root_notes.ron");
    fs::write(&path, BASS_LINE).unwrap();

    let mut player = Player::default();
    let mut loader = Loader::new();
    loader
        .request(DocumentSource::new(&path, SheetLayout::default()), &mut player)
        .unwrap();
    assert!(!player.is_loaded());

    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Loaded);
    assert!(player.is_loaded());

    let timeline = player.timeline().unwrap();
    assert_eq!(timeline.beats().len(), 7);
    assert_eq!(timeline.end_beat().tick, 6720);
    assert_eq!(timeline.beat(4).time_signature.numerator, 3);
    assert!(player.graphics().unwrap().is_finalized());

    let state = player.state();
    assert_eq!(state.playback, PlaybackMode::Paused);
    assert_eq!(state.tick, 0);
    assert!(player.request_play(true));
}

#[test]
fn test_library_source_loads() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("etudes")).unwrap();
    fs::write(dir.path().join("etudes").join("root_notes.ron"), BASS_LINE).unwrap();

    let library = ScoreLibrary::new(dir.path());
    let scores = library.list().unwrap();
    assert_eq!(scores.len(), 1);

    let mut player = Player::default();
    let mut loader = Loader::new();
    loader
        .request(library.source("etudes/root_notes.ron", SheetLayout::default()), &mut player)
        .unwrap();
    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Loaded);
}

#[test]
fn test_broken_document_leaves_player_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "(title: \"Broken\", tempo: ").unwrap();

    let mut player = Player::default();
    let mut loader = Loader::new();
    loader
        .request(DocumentSource::new(&path, SheetLayout::default()), &mut player)
        .unwrap();
    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Failed);
    assert!(!player.is_loaded());
    assert!(!player.request_play(true));
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let mut player = Player::default();
    let mut loader = Loader::new();
    loader
        .request(
            DocumentSource::new(dir.path().join("missing.ron"), SheetLayout::default()),
            &mut player,
        )
        .unwrap();
    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Failed);
}

#[test]
fn test_second_request_while_loading_is_busy() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("root_notes.ron");
    fs::write(&path, BASS_LINE).unwrap();

    let mut player = Player::default();
    let mut loader = Loader::new();
    loader
        .request(DocumentSource::new(&path, SheetLayout::default()), &mut player)
        .unwrap();
    let second = loader.request(DocumentSource::new(&path, SheetLayout::default()), &mut player);
    assert!(matches!(second, Err(LoadError::Busy)));

    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Loaded);

    // A loaded score can be replaced
    loader
        .request(DocumentSource::new(&path, SheetLayout::default()), &mut player)
        .unwrap();
    assert!(!player.is_loaded());
    assert_eq!(run_loader(&mut loader, &mut player), LoadingStep::Loaded);
    assert!(player.is_loaded());
}
