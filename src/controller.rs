//! Application controller.
//!
//! Owns all UI-visible state (paths, status line, pending notices, the
//! engine handle) and sequences the two asynchronous operations - engine
//! initialization and recognition - through the task runner. State is only
//! ever mutated on the UI thread; workers hand results back as completions.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::engine::{EngineConfig, TesseractEngine, TextRecognizer};
use crate::error::{TaskError, ValidationError};
use crate::output;
use crate::task::TaskRunner;

/// Lifecycle of the one OCR feature. The run action is enabled exactly in
/// `Ready`; everything the UI disables or colors is derived from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, engine init not yet submitted.
    Uninitialized,
    /// Engine init running in the background.
    Initializing,
    /// Engine loaded, no recognition in flight.
    Ready,
    /// A recognition run (including the file write) is in flight.
    Busy,
    /// Engine init failed. Terminal until restart.
    Failed,
}

/// How the status line should be colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Muted,
    Working,
    Success,
    Error,
}

/// One line of status text shown under the input fields.
#[derive(Debug, Clone)]
pub struct Status {
    pub text: String,
    pub severity: Severity,
}

impl Status {
    fn muted(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Muted }
    }

    fn working(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Working }
    }

    fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Success }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Error }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A modal notification queued by the controller and rendered by the UI
/// layer. Workers never touch dialogs directly.
#[derive(Debug, Clone)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub level: NoticeLevel,
}

impl Notice {
    fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into(), level: NoticeLevel::Info }
    }

    fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into(), level: NoticeLevel::Error }
    }
}

/// Outcome data of a successful recognition run.
struct RunSummary {
    line_count: usize,
    save_path: PathBuf,
}

/// Owns UI state and drives the init -> ready -> busy lifecycle.
pub struct AppController {
    /// Text of the image-path entry field.
    pub image_path: String,
    /// Text of the save-path entry field.
    pub save_path: String,
    engine_config: EngineConfig,
    phase: Phase,
    status: Status,
    engine: Option<Arc<dyn TextRecognizer>>,
    notices: VecDeque<Notice>,
}

impl AppController {
    pub fn new(engine_config: EngineConfig) -> Self {
        Self {
            image_path: String::new(),
            save_path: String::new(),
            engine_config,
            phase: Phase::Uninitialized,
            status: Status::muted("Starting up"),
            engine: None,
            notices: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The run action is enabled if and only if the phase is exactly `Ready`.
    pub fn can_run(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Pop the next pending modal notification, if any.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    /// Submit engine initialization to the runner. Called once at startup;
    /// later calls are ignored.
    pub fn start_engine_init(&mut self, tasks: &TaskRunner<Self>) {
        if self.phase != Phase::Uninitialized {
            return;
        }

        self.phase = Phase::Initializing;
        self.status = Status::working("Initializing OCR engine...");
        info!("starting OCR engine initialization");

        let config = self.engine_config.clone();
        tasks.run(
            move || {
                TesseractEngine::initialize(&config)
                    .map(|engine| Arc::new(engine) as Arc<dyn TextRecognizer>)
                    .map_err(|e| TaskError::EngineInit(format!("{:#}", e)))
            },
            Self::finish_engine_init,
        );
    }

    fn finish_engine_init(&mut self, result: Result<Arc<dyn TextRecognizer>, TaskError>) {
        match result {
            Ok(engine) => {
                self.engine = Some(engine);
                self.phase = Phase::Ready;
                self.status = Status::success("Ready");
                info!("OCR engine initialized");
            }
            Err(err) => {
                self.phase = Phase::Failed;
                self.status = Status::error(err.to_string());
                self.push_notice(Notice::error(
                    "OCR engine unavailable",
                    format!(
                        "{}\n\nText recognition stays disabled until the application is restarted.",
                        err
                    ),
                ));
                error!("engine initialization failed: {}", err);
            }
        }
    }

    /// Check user input without touching the background thread.
    fn validate(&self) -> Result<(), ValidationError> {
        if !Path::new(&self.image_path).is_file() {
            return Err(ValidationError::InvalidImagePath);
        }
        if self.save_path.is_empty() {
            return Err(ValidationError::MissingSavePath);
        }
        Ok(())
    }

    /// Handle the run button: validate synchronously, then submit one
    /// recognition run (recognize + write) to the runner.
    pub fn request_run(&mut self, tasks: &TaskRunner<Self>) {
        if self.phase != Phase::Ready {
            return;
        }

        if let Err(err) = self.validate() {
            self.status = Status::error(err.to_string());
            self.push_notice(Notice::error("Invalid input", err.to_string()));
            return;
        }

        // Ready implies the engine is present.
        let Some(engine) = self.engine.clone() else {
            return;
        };
        let image_path = PathBuf::from(&self.image_path);
        let save_path = PathBuf::from(&self.save_path);

        self.phase = Phase::Busy;
        self.status = Status::working("Recognizing text...");
        info!("recognition started for {:?}", image_path);

        tasks.run(
            move || run_recognition(engine, &image_path, &save_path),
            Self::finish_run,
        );
    }

    fn finish_run(&mut self, result: Result<RunSummary, TaskError>) {
        // Both outcomes are recoverable; the user may retry.
        self.phase = Phase::Ready;

        match result {
            Ok(summary) => {
                self.status =
                    Status::success(format!("Done - {} lines recognized", summary.line_count));
                self.push_notice(Notice::info(
                    "Recognition complete",
                    format!("Result saved to:\n{}", summary.save_path.display()),
                ));
                info!(
                    "recognition finished: {} lines -> {:?}",
                    summary.line_count, summary.save_path
                );
            }
            Err(err) => {
                let title = match err {
                    TaskError::OutputWrite(_) => "Could not save result",
                    _ => "Recognition failed",
                };
                self.status = Status::error(err.to_string());
                self.push_notice(Notice::error(title, err.to_string()));
                error!("recognition run failed: {}", err);
            }
        }
    }
}

/// The background half of one run: recognize, then write the output file.
/// Runs on a worker thread; returns data only.
fn run_recognition(
    engine: Arc<dyn TextRecognizer>,
    image_path: &Path,
    save_path: &Path,
) -> Result<RunSummary, TaskError> {
    let regions = engine
        .recognize(image_path)
        .map_err(|e| TaskError::Recognition(format!("{:#}", e)))?;

    let lines: Vec<String> = regions.into_iter().map(|r| r.text).collect();

    output::write_lines(save_path, &lines)
        .map_err(|e| TaskError::OutputWrite(format!("{:#}", e)))?;

    Ok(RunSummary {
        line_count: lines.len(),
        save_path: save_path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TextRegion;
    use anyhow::anyhow;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Recognizer that returns a fixed set of lines.
    struct StubEngine {
        lines: Vec<&'static str>,
        delay: Duration,
    }

    impl StubEngine {
        fn lines(lines: &[&'static str]) -> Arc<dyn TextRecognizer> {
            Arc::new(Self { lines: lines.to_vec(), delay: Duration::ZERO })
        }

        fn slow(lines: &[&'static str], delay: Duration) -> Arc<dyn TextRecognizer> {
            Arc::new(Self { lines: lines.to_vec(), delay })
        }
    }

    impl TextRecognizer for StubEngine {
        fn recognize(&self, _image_path: &Path) -> anyhow::Result<Vec<TextRegion>> {
            std::thread::sleep(self.delay);
            Ok(self
                .lines
                .iter()
                .enumerate()
                .map(|(i, text)| TextRegion {
                    text: text.to_string(),
                    confidence: 0.9,
                    bounds: (0, 20 * i as u32, 100, 16),
                })
                .collect())
        }
    }

    /// Recognizer that always fails.
    struct BrokenEngine;

    impl TextRecognizer for BrokenEngine {
        fn recognize(&self, _image_path: &Path) -> anyhow::Result<Vec<TextRegion>> {
            Err(anyhow!("corrupted image data"))
        }
    }

    fn ready_controller(engine: Arc<dyn TextRecognizer>) -> AppController {
        let mut controller = AppController::new(EngineConfig::default());
        controller.finish_engine_init(Ok(engine));
        controller
    }

    fn poll_until_phase(
        runner: &TaskRunner<AppController>,
        controller: &mut AppController,
        phase: Phase,
    ) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.phase() != phase {
            runner.poll(controller);
            if Instant::now() > deadline {
                panic!("timed out waiting for phase {:?}", phase);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_starts_uninitialized_with_run_disabled() {
        let controller = AppController::new(EngineConfig::default());

        assert_eq!(controller.phase(), Phase::Uninitialized);
        assert!(!controller.can_run());
        assert_eq!(controller.status().severity, Severity::Muted);
    }

    #[test]
    fn test_run_enabled_iff_ready() {
        let mut controller = AppController::new(EngineConfig::default());
        let phases = [
            (Phase::Uninitialized, false),
            (Phase::Initializing, false),
            (Phase::Ready, true),
            (Phase::Busy, false),
            (Phase::Failed, false),
        ];

        for (phase, expected) in phases {
            controller.phase = phase;
            assert_eq!(controller.can_run(), expected, "phase {:?}", phase);
        }
    }

    #[test]
    fn test_successful_init_enables_run() {
        let mut controller = AppController::new(EngineConfig::default());

        controller.finish_engine_init(Ok(StubEngine::lines(&["x"])));

        assert_eq!(controller.phase(), Phase::Ready);
        assert!(controller.can_run());
        assert_eq!(controller.status().severity, Severity::Success);
    }

    #[test]
    fn test_failed_init_is_terminal_and_surfaces_cause() {
        let mut controller = AppController::new(EngineConfig::default());

        controller.finish_engine_init(Err(TaskError::EngineInit(
            "trained data download failed".to_string(),
        )));

        assert_eq!(controller.phase(), Phase::Failed);
        assert!(!controller.can_run());
        assert_eq!(controller.status().severity, Severity::Error);

        let notice = controller.take_notice().expect("a notice must be queued");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.body.contains("trained data download failed"));
        assert!(notice.body.contains("restarted"));
    }

    #[test]
    fn test_start_engine_init_runs_in_background_and_is_one_shot() {
        let dir = TempDir::new().unwrap();
        // A tag the validator rejects, so the worker fails fast without
        // probing the network no matter what is installed.
        let mut controller = AppController::new(EngineConfig {
            languages: vec!["no/such".to_string()],
            data_dir: Some(dir.path().to_path_buf()),
        });
        let runner = TaskRunner::new();

        controller.start_engine_init(&runner);
        assert_eq!(controller.phase(), Phase::Initializing);
        assert!(!controller.can_run());

        // Re-submission is ignored outside Uninitialized.
        controller.start_engine_init(&runner);

        poll_until_phase(&runner, &mut controller, Phase::Failed);
        assert!(controller.take_notice().is_some());
        assert!(controller.take_notice().is_none());
    }

    #[test]
    fn test_invalid_image_path_rejected_without_background_work() {
        let mut controller = ready_controller(StubEngine::lines(&["x"]));
        controller.image_path = "/definitely/not/a/real/file.png".to_string();
        controller.save_path = "/tmp/out.txt".to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);

        assert_eq!(controller.phase(), Phase::Ready);
        assert_eq!(controller.status().severity, Severity::Error);
        let notice = controller.take_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        // Nothing was submitted: validation failed synchronously.
        assert_eq!(runner.poll(&mut controller), 0);
        assert!(!runner.has_pending());
    }

    #[test]
    fn test_missing_save_path_rejected_before_submission() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();

        let mut controller = ready_controller(StubEngine::lines(&["x"]));
        controller.image_path = image.display().to_string();
        controller.save_path = String::new();
        let runner = TaskRunner::new();

        controller.request_run(&runner);

        assert_eq!(controller.phase(), Phase::Ready);
        assert_eq!(controller.status().severity, Severity::Error);
        assert!(controller.status().text.contains("save"));
        assert!(controller.take_notice().is_some());
        assert_eq!(runner.poll(&mut controller), 0);
    }

    #[test]
    fn test_successful_run_writes_joined_lines() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        let save = dir.path().join("out").join("nested").join("result.txt");

        let mut controller = ready_controller(StubEngine::lines(&["Hello", "World"]));
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);
        assert_eq!(controller.phase(), Phase::Busy);
        assert!(!controller.can_run());

        poll_until_phase(&runner, &mut controller, Phase::Ready);

        assert_eq!(std::fs::read_to_string(&save).unwrap(), "Hello\nWorld");
        assert_eq!(controller.status().severity, Severity::Success);
        let notice = controller.take_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.body.contains("result.txt"));
    }

    #[test]
    fn test_rerun_overwrites_output() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        let save = dir.path().join("result.txt");

        let mut controller = ready_controller(StubEngine::lines(&["Hello", "World"]));
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        for _ in 0..2 {
            controller.request_run(&runner);
            poll_until_phase(&runner, &mut controller, Phase::Ready);
        }

        assert_eq!(std::fs::read_to_string(&save).unwrap(), "Hello\nWorld");
    }

    #[test]
    fn test_failed_recognition_returns_to_ready_without_output() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        let save = dir.path().join("result.txt");

        let mut controller = ready_controller(Arc::new(BrokenEngine));
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);
        poll_until_phase(&runner, &mut controller, Phase::Ready);

        assert!(controller.can_run(), "user may retry after a failure");
        assert_eq!(controller.status().severity, Severity::Error);
        assert!(controller.status().text.contains("corrupted image data"));
        let notice = controller.take_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(!save.exists(), "no output file on failure");
    }

    #[test]
    fn test_write_failure_reports_not_saved() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        // A directory at the save path makes the write itself fail.
        let save = dir.path().join("result.txt");
        std::fs::create_dir(&save).unwrap();

        let mut controller = ready_controller(StubEngine::lines(&["Hello"]));
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);
        poll_until_phase(&runner, &mut controller, Phase::Ready);

        assert_eq!(controller.status().severity, Severity::Error);
        assert!(controller.status().text.contains("NOT saved"));
        let notice = controller.take_notice().unwrap();
        assert_eq!(notice.title, "Could not save result");
    }

    #[test]
    fn test_busy_phase_ignores_further_run_requests() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        let save = dir.path().join("result.txt");

        let slow = StubEngine::slow(&["only"], Duration::from_millis(150));
        let mut controller = ready_controller(slow);
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);
        assert_eq!(controller.phase(), Phase::Busy);
        controller.request_run(&runner);
        controller.request_run(&runner);

        poll_until_phase(&runner, &mut controller, Phase::Ready);
        // Exactly one completion notice: the extra requests were dropped.
        assert!(controller.take_notice().is_some());
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(runner.poll(&mut controller), 0);
        assert!(controller.take_notice().is_none());
    }

    #[test]
    fn test_empty_recognition_result_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"fake image bytes").unwrap();
        let save = dir.path().join("result.txt");

        let mut controller = ready_controller(StubEngine::lines(&[]));
        controller.image_path = image.display().to_string();
        controller.save_path = save.display().to_string();
        let runner = TaskRunner::new();

        controller.request_run(&runner);
        poll_until_phase(&runner, &mut controller, Phase::Ready);

        assert_eq!(std::fs::read_to_string(&save).unwrap(), "");
        assert!(controller.status().text.contains("0 lines"));
    }
}
