//! Interpreter discovery.
//!
//! Probes an ordered candidate list with `--version` and caches the first
//! candidate that runs. Only success is cached: while nothing is found every
//! call re-probes the full list, so a runtime installed mid-session is picked
//! up by the next heartbeat.

use crate::process::ProcessRunner;
use crate::storage::StoragePaths;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const NEWEST_MINOR: u32 = 40;
const OLDEST_MINOR: u32 = 26;

pub struct RuntimeLocator {
    candidates: Vec<PathBuf>,
    runner: Arc<dyn ProcessRunner>,
    cached: Mutex<Option<PathBuf>>,
}

impl std::fmt::Debug for RuntimeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLocator")
            .field("candidates", &self.candidates.len())
            .field("cached", &self.cached())
            .finish()
    }
}

impl RuntimeLocator {
    pub fn new(paths: &StoragePaths, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_candidates(
            default_candidates(paths.bundled_runtime(), cfg!(windows)),
            runner,
        )
    }

    pub fn with_candidates(candidates: Vec<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            candidates,
            runner,
            cached: Mutex::new(None),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Returns the cached runtime without probing.
    pub fn cached(&self) -> Option<PathBuf> {
        self.cached.lock().ok().and_then(|guard| guard.clone())
    }

    /// Forgets the cached runtime so the next `resolve` probes again.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    /// Returns the first working interpreter, probing only on a cache miss.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = self.cached() {
            return Some(path);
        }

        let found = self
            .candidates
            .iter()
            .find(|candidate| self.probe(candidate))
            .cloned();

        match &found {
            Some(path) => {
                tracing::info!(runtime = %path.display(), "Resolved interpreter");
                if let Ok(mut guard) = self.cached.lock() {
                    *guard = Some(path.clone());
                }
            }
            None => {
                tracing::debug!(
                    candidates = self.candidates.len(),
                    "No working interpreter found"
                );
            }
        }

        found
    }

    fn probe(&self, candidate: &Path) -> bool {
        match self.runner.run(candidate, &[OsStr::new("--version")]) {
            Ok(output) => output.success,
            Err(_) => false,
        }
    }
}

/// Candidate interpreters in priority order: bundled copy, `PATH` lookups,
/// common absolute locations, then (Windows) versioned install directories
/// from newest to oldest.
pub fn default_candidates(bundled: PathBuf, windows: bool) -> Vec<PathBuf> {
    let mut candidates = vec![
        bundled,
        PathBuf::from("pythonw"),
        PathBuf::from("python"),
        PathBuf::from("python3"),
        PathBuf::from("/usr/local/bin/python"),
        PathBuf::from("/usr/bin/python"),
    ];

    if windows {
        for minor in (OLDEST_MINOR..=NEWEST_MINOR).rev() {
            candidates.push(PathBuf::from(format!(r"\python{}\pythonw", minor)));
            candidates.push(PathBuf::from(format!(r"\Python{}\pythonw", minor)));
        }
    }

    candidates
}
