//! Dependency provisioning for the interpreter and the core tool.
//!
//! ## Sequence
//!
//! ```text
//! Locating ──(runtime found)──────────────────────┐
//!    │                                            ▼
//!    └─(none)→ InstallingRuntime ─(windows)→ check core ─(absent/outdated)→ InstallingCore → Ready
//!                    │                            │
//!                    └─(other OS)→ Unavailable    └─(current)→ Ready
//! ```
//!
//! Failures are logged and leave the sequence in `Unavailable`; the ready
//! callback only fires on `Ready`. Nothing is retried until the next start.
//!
//! Replacing the core tool removes the old tree before extracting the new one,
//! so an interrupted upgrade leaves no tree rather than a mixed one.

use crate::config::SourcesConfig;
use crate::error::{Result, TrackerError};
use crate::fetch::Fetcher;
use crate::patterns::find_version_info;
use crate::process::ProcessRunner;
use crate::runtime::RuntimeLocator;
use crate::storage::StoragePaths;
use fs_err as fs;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Locating,
    InstallingRuntime,
    InstallingCore,
    Ready,
    Unavailable { reason: String },
}

/// Target OS family and CPU architecture for interpreter downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// The embeddable interpreter archive only exists for Windows.
    pub fn supports_runtime_install(&self) -> bool {
        self.os == "windows"
    }
}

pub struct DependencyInstaller {
    paths: StoragePaths,
    sources: SourcesConfig,
    platform: Platform,
    locator: Arc<RuntimeLocator>,
    runner: Arc<dyn ProcessRunner>,
    fetcher: Arc<dyn Fetcher>,
    readiness: Mutex<Readiness>,
}

impl DependencyInstaller {
    pub fn new(
        paths: StoragePaths,
        sources: SourcesConfig,
        platform: Platform,
        locator: Arc<RuntimeLocator>,
        runner: Arc<dyn ProcessRunner>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            paths,
            sources,
            platform,
            locator,
            runner,
            fetcher,
            readiness: Mutex::new(Readiness::Locating),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(Readiness::Locating)
    }

    /// Makes sure a runtime and a current core tool exist, then calls
    /// `on_ready`. Returns the final readiness.
    pub fn ensure_ready<F: FnOnce()>(&self, on_ready: F) -> Readiness {
        match self.try_ensure_ready() {
            Ok(()) => {
                self.set_readiness(Readiness::Ready);
                on_ready();
            }
            Err(err) => {
                tracing::error!(error = %err, "Dependency setup failed");
                self.set_readiness(Readiness::Unavailable {
                    reason: err.to_string(),
                });
            }
        }
        self.readiness()
    }

    /// Runs [`ensure_ready`](Self::ensure_ready) on a background thread.
    pub fn spawn_ensure_ready<F>(self: Arc<Self>, on_ready: F) -> io::Result<JoinHandle<Readiness>>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new()
            .name("pulse-installer".to_string())
            .spawn(move || self.ensure_ready(on_ready))
    }

    fn try_ensure_ready(&self) -> Result<()> {
        self.set_readiness(Readiness::Locating);

        let runtime = match self.locator.resolve() {
            Some(runtime) => runtime,
            None => {
                self.set_readiness(Readiness::InstallingRuntime);
                self.install_runtime()?;
                self.locator.invalidate();
                self.locator.resolve().ok_or(TrackerError::RuntimeNotFound)?
            }
        };

        self.check_and_install_core(&runtime)
    }

    /// Installs the core tool when it is missing or differs from upstream.
    pub fn check_and_install_core(&self, runtime: &Path) -> Result<()> {
        if !self.is_core_installed() {
            tracing::info!("Core tool not installed");
            return self.install_core();
        }

        if !self.is_core_latest(runtime) {
            return self.install_core();
        }

        Ok(())
    }

    pub fn is_core_installed(&self) -> bool {
        self.paths.core_cli().exists()
    }

    /// Asks the installed tool for its version; it prints it on stderr.
    pub fn current_core_version(&self, runtime: &Path) -> Option<String> {
        let cli = self.paths.core_cli();
        let output = self
            .runner
            .run(runtime, &[cli.as_os_str(), OsStr::new("--version")])
            .ok()?;
        if !output.success {
            return None;
        }
        Some(output.stderr.trim().to_string())
    }

    /// Latest upstream version, or `None` if it cannot be determined.
    pub fn latest_core_version(&self) -> Option<String> {
        match self.fetcher.fetch_text(&self.sources.core_version_url) {
            Ok(body) => find_version_info(&body),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to fetch core tool version metadata");
                None
            }
        }
    }

    fn is_core_latest(&self, runtime: &Path) -> bool {
        let Some(current) = self.current_core_version(runtime) else {
            tracing::warn!("Could not read installed core tool version");
            return false;
        };
        tracing::info!(version = %current, "Current core tool version");

        tracing::info!("Checking for core tool updates");
        match self.latest_core_version() {
            Some(latest) if latest == current => {
                tracing::info!("Core tool is up to date");
                true
            }
            Some(latest) => {
                tracing::info!(version = %latest, "Found an updated core tool");
                false
            }
            None => {
                tracing::warn!("Unable to find latest core tool version");
                false
            }
        }
    }

    /// Downloads the core archive and replaces the installed tree with it.
    pub fn install_core(&self) -> Result<()> {
        self.set_readiness(Readiness::InstallingCore);

        let archive = self.paths.core_archive();
        tracing::info!(url = %self.sources.core_archive_url, "Downloading core tool");
        if let Err(err) = self.fetcher.download(&self.sources.core_archive_url, &archive) {
            discard_archive(&archive);
            return Err(err);
        }

        tracing::info!(dest = %self.paths.install_root().display(), "Extracting core tool");
        let result = remove_tree(&self.paths.core_dir())
            .and_then(|()| extract_archive(&archive, self.paths.install_root()));
        discard_archive(&archive);
        result?;

        tracing::info!("Finished extracting core tool");
        Ok(())
    }

    fn install_runtime(&self) -> Result<()> {
        if !self.platform.supports_runtime_install() {
            return Err(TrackerError::UnsupportedPlatform(self.platform.os.to_string()));
        }

        let url = self.sources.runtime_archive_url(self.platform.arch);
        let archive = self.paths.runtime_archive();
        tracing::info!(url = %url, "Downloading interpreter");
        if let Err(err) = self.fetcher.download(&url, &archive) {
            discard_archive(&archive);
            return Err(err);
        }

        tracing::info!("Extracting interpreter");
        let result = extract_archive(&archive, &self.paths.runtime_dir());
        discard_archive(&archive);
        result?;

        tracing::info!("Finished installing interpreter");
        Ok(())
    }

    fn set_readiness(&self, readiness: Readiness) {
        if let Ok(mut guard) = self.readiness.lock() {
            tracing::debug!(from = ?*guard, to = ?readiness, "Readiness changed");
            *guard = readiness;
        }
    }
}

/// Recursively deletes `path`; a missing tree is not an error.
pub fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TrackerError::io("removing installed tree", err)),
    }
}

/// Unpacks a zip archive into `dest`, overwriting existing files.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive).map_err(|err| TrackerError::io("opening archive", err))?;
    let archive_err = |details: String| TrackerError::Archive {
        path: archive.to_path_buf(),
        details,
    };

    let mut zip = zip::ZipArchive::new(file).map_err(|err| archive_err(err.to_string()))?;
    fs::create_dir_all(dest).map_err(|err| TrackerError::io("creating extract directory", err))?;
    zip.extract(dest).map_err(|err| archive_err(err.to_string()))
}

fn discard_archive(archive: &Path) {
    if let Err(err) = fs::remove_file(archive) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(error = %err, "Failed to delete downloaded archive");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CapturedOutput;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch_text(&self, url: &str) -> Result<String> {
            Err(TrackerError::Network {
                url: url.to_string(),
                details: "offline".to_string(),
            })
        }

        fn download(&self, url: &str, _dest: &Path) -> Result<()> {
            self.fetch_text(url).map(|_| ())
        }
    }

    struct NoRuntime;

    impl ProcessRunner for NoRuntime {
        fn run(&self, _: &Path, _: &[&OsStr]) -> io::Result<CapturedOutput> {
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    fn installer(temp: &TempDir, platform: Platform) -> DependencyInstaller {
        let paths = StoragePaths::with_roots(temp.path().join("home"), temp.path().join("install"));
        let runner: Arc<dyn ProcessRunner> = Arc::new(NoRuntime);
        let locator = Arc::new(RuntimeLocator::with_candidates(
            vec![PathBuf::from("python")],
            runner.clone(),
        ));
        DependencyInstaller::new(
            paths,
            SourcesConfig::default(),
            platform,
            locator,
            runner,
            Arc::new(NoFetch),
        )
    }

    /// Offline for metadata; downloads write a few bytes then fail.
    #[derive(Default)]
    struct CountingFetch {
        fetches: AtomicUsize,
    }

    impl Fetcher for CountingFetch {
        fn fetch_text(&self, url: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            NoFetch.fetch_text(url)
        }

        fn download(&self, url: &str, dest: &Path) -> Result<()> {
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, b"PK\x03\x04trunc").unwrap();
            Err(TrackerError::Network {
                url: url.to_string(),
                details: "connection reset".to_string(),
            })
        }
    }

    /// Any program runs; `<cli> --version` prints the given version on stderr.
    struct ReportsVersion(&'static str);

    impl ProcessRunner for ReportsVersion {
        fn run(&self, _: &Path, _: &[&OsStr]) -> io::Result<CapturedOutput> {
            Ok(CapturedOutput {
                success: true,
                code: Some(0),
                stderr: format!("{}\n", self.0),
                ..Default::default()
            })
        }
    }

    fn installer_with(
        temp: &TempDir,
        runner: Arc<dyn ProcessRunner>,
        fetcher: Arc<dyn Fetcher>,
    ) -> DependencyInstaller {
        let paths = StoragePaths::with_roots(temp.path().join("home"), temp.path().join("install"));
        let locator = Arc::new(RuntimeLocator::with_candidates(
            vec![PathBuf::from("python")],
            runner.clone(),
        ));
        DependencyInstaller::new(
            paths,
            SourcesConfig::default(),
            Platform {
                os: "linux",
                arch: "x86_64",
            },
            locator,
            runner,
            fetcher,
        )
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, body) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn remove_tree_tolerates_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(remove_tree(&temp.path().join("nope")).is_ok());
    }

    #[test]
    fn extract_archive_writes_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        write_zip(&archive, &[("pkg/mod.py", "print('hi')")]);

        extract_archive(&archive, &temp.path().join("out")).unwrap();

        let body = fs::read_to_string(temp.path().join("out/pkg/mod.py")).unwrap();
        assert_eq!(body, "print('hi')");
    }

    #[test]
    fn corrupt_archive_is_archive_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.zip");
        fs::write(&archive, b"not a zip").unwrap();

        let err = extract_archive(&archive, temp.path()).unwrap_err();
        assert!(matches!(err, TrackerError::Archive { .. }));
    }

    #[test]
    fn missing_runtime_off_windows_is_terminal() {
        let temp = TempDir::new().unwrap();
        let installer = installer(
            &temp,
            Platform {
                os: "linux",
                arch: "x86_64",
            },
        );

        let mut called = false;
        let readiness = installer.ensure_ready(|| called = true);

        assert!(!called, "ready callback must not fire");
        match readiness {
            Readiness::Unavailable { reason } => assert!(reason.contains("linux")),
            other => panic!("unexpected readiness {:?}", other),
        }
    }

    #[test]
    fn runtime_download_failure_on_windows_is_logged_not_raised() {
        let temp = TempDir::new().unwrap();
        let installer = installer(
            &temp,
            Platform {
                os: "windows",
                arch: "x86_64",
            },
        );

        let mut called = false;
        let readiness = installer.ensure_ready(|| called = true);

        assert!(!called);
        assert!(matches!(readiness, Readiness::Unavailable { .. }));
        assert!(!installer.paths.runtime_archive().exists());
    }

    #[test]
    fn unreadable_local_version_means_outdated() {
        let temp = TempDir::new().unwrap();
        let installer = installer(
            &temp,
            Platform {
                os: "linux",
                arch: "x86_64",
            },
        );
        assert_eq!(installer.current_core_version(Path::new("python")), None);
        assert!(!installer.is_core_latest(Path::new("python")));
    }

    #[test]
    fn unknown_remote_version_means_outdated() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(CountingFetch::default());
        let installer = installer_with(
            &temp,
            Arc::new(ReportsVersion("13.0.7")),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );

        assert_eq!(
            installer.current_core_version(Path::new("python")),
            Some("13.0.7".to_string())
        );
        assert!(!installer.is_core_latest(Path::new("python")));
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn partial_download_is_discarded() {
        let temp = TempDir::new().unwrap();
        let installer = installer_with(
            &temp,
            Arc::new(ReportsVersion("13.0.7")),
            Arc::new(CountingFetch::default()),
        );

        let err = installer.install_core().unwrap_err();

        assert!(matches!(err, TrackerError::Network { .. }));
        assert!(!installer.paths.core_archive().exists());
    }
}
