// Loader - Builds a score on a worker thread and hands it over in phases
//
// Each phase is one step of the update cycle, the caller polls `update()`
// once per cycle. Payloads cross from the worker through a one-slot ring
// buffer, the phase marker is a shared atomic.

use super::{LoadError, LoadResult};
use crate::score::{BeatTimeline, LoadedScore, ScoreAudio, ScoreDocument, SheetGraphics, SheetLayout};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Loading phase marker
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStep {
    NoScoreLoaded = 0,
    /// The worker is building the score
    LoadingOnWorker = 1,
    /// The worker is done, payloads wait for the next cycle
    WaitingFinalize = 2,
    /// Sheet segments are finalized, one per cycle
    Finalizing = 3,
    WaitingCompletion = 4,
    Loaded = 5,
    Failed = 6,
}

impl LoadingStep {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadingStep::LoadingOnWorker,
            2 => LoadingStep::WaitingFinalize,
            3 => LoadingStep::Finalizing,
            4 => LoadingStep::WaitingCompletion,
            5 => LoadingStep::Loaded,
            6 => LoadingStep::Failed,
            _ => LoadingStep::NoScoreLoaded,
        }
    }

    /// True while a request is in flight
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            LoadingStep::LoadingOnWorker
                | LoadingStep::WaitingFinalize
                | LoadingStep::Finalizing
                | LoadingStep::WaitingCompletion
        )
    }
}

/// Receiver of the loading lifecycle
///
/// For a successful load the calls arrive in order: start, audio, timeline,
/// graphics, finish. A failed load reports start then failure.
pub trait LoadingListener {
    fn on_start_loading(&mut self) {}
    fn on_load_audio(&mut self, _audio: Arc<ScoreAudio>) {}
    fn on_load_timeline(&mut self, _timeline: Arc<BeatTimeline>) {}
    fn on_load_graphics(&mut self, _graphics: Arc<SheetGraphics>) {}
    fn on_finish_loading(&mut self) {}
    fn on_load_failed(&mut self, _error: &LoadError) {}
}

/// Something the worker can build a score from
pub trait ScoreSource: Send + 'static {
    /// Human readable name, for logs
    fn describe(&self) -> String;

    fn load(&mut self) -> LoadResult<LoadedScore>;
}

/// A RON score document on disk
#[derive(Debug, Clone)]
pub struct DocumentSource {
    path: PathBuf,
    layout: SheetLayout,
}

impl DocumentSource {
    pub fn new(path: impl Into<PathBuf>, layout: SheetLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }
}

impl ScoreSource for DocumentSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&mut self) -> LoadResult<LoadedScore> {
        ScoreDocument::open(&self.path)?.build(&self.layout)
    }
}

type ScoreConsumer = HeapCons<LoadResult<LoadedScore>>;

pub struct Loader {
    step: Arc<AtomicU8>,
    result: Option<ScoreConsumer>,
    worker: Option<JoinHandle<()>>,
    /// Graphics being finalized
    graphics: Option<SheetGraphics>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            step: Arc::new(AtomicU8::new(LoadingStep::NoScoreLoaded as u8)),
            result: None,
            worker: None,
            graphics: None,
        }
    }

    pub fn step(&self) -> LoadingStep {
        LoadingStep::from_u8(self.step.load(Ordering::Acquire))
    }

    pub fn is_loading(&self) -> bool {
        self.step().is_loading()
    }

    fn set_step(&self, step: LoadingStep) {
        debug!(?step, "Loading step");
        self.step.store(step as u8, Ordering::Release);
    }

    /// Start loading a score
    /// Rejected with `LoadError::Busy` while another load is in flight
    pub fn request<S: ScoreSource>(
        &mut self,
        mut source: S,
        listener: &mut dyn LoadingListener,
    ) -> LoadResult<()> {
        if self.is_loading() {
            return Err(LoadError::Busy);
        }

        info!(score = %source.describe(), "Loading score");

        let (mut producer, consumer) = HeapRb::<LoadResult<LoadedScore>>::new(1).split();
        self.result = Some(consumer);
        self.graphics = None;
        self.set_step(LoadingStep::LoadingOnWorker);
        listener.on_start_loading();

        let step = Arc::clone(&self.step);
        let spawned = thread::Builder::new()
            .name("score-loader".to_string())
            .spawn(move || {
                let result = source.load();
                if producer.try_push(result).is_err() {
                    error!("Score slot already filled");
                }
                step.store(LoadingStep::WaitingFinalize as u8, Ordering::Release);
            });

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => self.fail(LoadError::Io(e), listener),
        }
        Ok(())
    }

    /// Advance the current load by one phase
    pub fn update(&mut self, listener: &mut dyn LoadingListener) {
        match self.step() {
            LoadingStep::LoadingOnWorker => {
                // The worker stores the next step before exiting
                let exited = self.worker.as_ref().is_some_and(JoinHandle::is_finished);
                if exited && self.step() == LoadingStep::LoadingOnWorker {
                    self.join_worker();
                    self.fail(LoadError::WorkerPanicked, listener);
                }
            }
            LoadingStep::WaitingFinalize => {
                self.join_worker();
                let result = self
                    .result
                    .take()
                    .and_then(|mut consumer| consumer.try_pop())
                    .unwrap_or(Err(LoadError::WorkerPanicked));

                match result {
                    Ok(score) => {
                        listener.on_load_audio(Arc::new(score.audio));
                        listener.on_load_timeline(Arc::new(score.timeline));
                        self.graphics = Some(score.graphics);
                        self.set_step(LoadingStep::Finalizing);
                    }
                    Err(e) => self.fail(e, listener),
                }
            }
            LoadingStep::Finalizing => {
                let pending = self
                    .graphics
                    .as_mut()
                    .is_some_and(|graphics| graphics.finalize_next());
                if !pending {
                    if let Some(graphics) = self.graphics.take() {
                        listener.on_load_graphics(Arc::new(graphics));
                    }
                    self.set_step(LoadingStep::WaitingCompletion);
                }
            }
            LoadingStep::WaitingCompletion => {
                listener.on_finish_loading();
                self.set_step(LoadingStep::Loaded);
                info!("Score loaded");
            }
            LoadingStep::NoScoreLoaded | LoadingStep::Loaded | LoadingStep::Failed => {}
        }
    }

    fn fail(&mut self, error: LoadError, listener: &mut dyn LoadingListener) {
        error!(%error, "Score loading failed");
        self.result = None;
        self.graphics = None;
        self.set_step(LoadingStep::Failed);
        listener.on_load_failed(&error);
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Score loading worker panicked");
            }
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.join_worker();
    }
}
