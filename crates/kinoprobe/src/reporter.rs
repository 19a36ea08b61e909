//! Step annotations and screenshot attachments.
//!
//! The workflow emits named steps and failure screenshots as observability
//! hooks. They are fire-and-forget: a sink failure is logged and never
//! affects control flow, so the trait methods are infallible from the
//! caller's point of view.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};
use uuid::Uuid;

/// Sink for step annotations and screenshot attachments
pub trait StepReporter: std::fmt::Debug {
    /// Record a named step
    fn step(&self, name: &str);

    /// Attach a PNG screenshot under the given name
    fn attach_screenshot(&self, name: &str, png: &[u8]);
}

/// Reporter that only forwards to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl StepReporter for NullReporter {
    fn step(&self, name: &str) {
        debug!(step = name, "step");
    }

    fn attach_screenshot(&self, name: &str, png: &[u8]) {
        debug!(attachment = name, bytes = png.len(), "screenshot discarded");
    }
}

/// Reporter that persists steps and screenshots under a per-run directory
#[derive(Debug, Clone)]
pub struct FsReporter {
    run_dir: PathBuf,
}

impl FsReporter {
    /// Create a reporter writing under `base_dir/run-<id>/`.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let run_dir = base_dir
            .as_ref()
            .join(format!("run-{}", Uuid::new_v4().simple()));
        Self { run_dir }
    }

    /// Directory this run's artifacts land in
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn ensure_run_dir(&self) -> bool {
        match fs::create_dir_all(&self.run_dir) {
            Ok(()) => true,
            Err(err) => {
                warn!(dir = %self.run_dir.display(), %err, "could not create report directory");
                false
            }
        }
    }
}

impl StepReporter for FsReporter {
    fn step(&self, name: &str) {
        debug!(step = name, "step");
        if !self.ensure_run_dir() {
            return;
        }
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.run_dir.join("steps.log"))
            .and_then(|mut file| writeln!(file, "{name}"));
        if let Err(err) = result {
            warn!(step = name, %err, "could not record step");
        }
    }

    fn attach_screenshot(&self, name: &str, png: &[u8]) {
        if !self.ensure_run_dir() {
            return;
        }
        let path = self.run_dir.join(format!("{}.png", sanitize(name)));
        if let Err(err) = fs::write(&path, png) {
            warn!(attachment = name, %err, "could not write screenshot");
        } else {
            debug!(attachment = %path.display(), bytes = png.len(), "screenshot attached");
        }
    }
}

/// Reporter that records everything in memory (test double)
#[derive(Debug, Default)]
pub struct RecordingReporter {
    steps: Mutex<Vec<String>>,
    screenshots: Mutex<Vec<(String, usize)>>,
}

impl RecordingReporter {
    /// Create an empty recording reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps recorded so far, in order
    #[must_use]
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    /// Screenshot names and sizes recorded so far
    #[must_use]
    pub fn screenshots(&self) -> Vec<(String, usize)> {
        self.screenshots.lock().unwrap().clone()
    }
}

impl StepReporter for RecordingReporter {
    fn step(&self, name: &str) {
        self.steps.lock().unwrap().push(name.to_string());
    }

    fn attach_screenshot(&self, name: &str, png: &[u8]) {
        self.screenshots
            .lock()
            .unwrap()
            .push((name.to_string(), png.len()));
    }
}

impl<R: StepReporter + ?Sized> StepReporter for std::sync::Arc<R> {
    fn step(&self, name: &str) {
        (**self).step(name);
    }

    fn attach_screenshot(&self, name: &str, png: &[u8]) {
        (**self).attach_screenshot(name, png);
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reporter_is_silent() {
        let reporter = NullReporter;
        reporter.step("open page");
        reporter.attach_screenshot("failure", &[1, 2, 3]);
    }

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.step("open page");
        reporter.step("search for 'матрица'");
        reporter.attach_screenshot("failure", &[0; 16]);

        assert_eq!(reporter.steps(), vec!["open page", "search for 'матрица'"]);
        assert_eq!(reporter.screenshots(), vec![("failure".to_string(), 16)]);
    }

    #[test]
    fn test_fs_reporter_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FsReporter::new(dir.path());

        reporter.step("open page");
        reporter.attach_screenshot("basic search/failure", &[0x89, b'P', b'N', b'G']);

        let log = fs::read_to_string(reporter.run_dir().join("steps.log")).unwrap();
        assert!(log.contains("open page"));
        // attachment names are sanitized for the filesystem
        assert!(reporter.run_dir().join("basic-search-failure.png").exists());
    }

    #[test]
    fn test_fs_reporter_swallows_write_failures() {
        // a base dir that cannot be created: a file stands in its way
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"file").unwrap();

        let reporter = FsReporter::new(&blocker);
        reporter.step("step into the void");
        reporter.attach_screenshot("nope", &[1]);
        // nothing panicked, nothing propagated
    }
}
