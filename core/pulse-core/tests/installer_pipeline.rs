//! End-to-end tests for dependency provisioning with fake network and
//! subprocess seams. Archives are real zips written into a temp dir.

use pulse_core::config::SourcesConfig;
use pulse_core::{
    CapturedOutput, DependencyInstaller, Fetcher, Platform, ProcessRunner, Readiness,
    RuntimeLocator, StoragePaths, TrackerError,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const LINUX: Platform = Platform {
    os: "linux",
    arch: "x86_64",
};

const WINDOWS: Platform = Platform {
    os: "windows",
    arch: "x86_64",
};

/// Serves zip archives by URL and a fixed version metadata body.
struct FakeFetcher {
    archives: HashMap<String, Vec<(&'static str, &'static str)>>,
    metadata: Option<String>,
    downloads: AtomicUsize,
    metadata_fetches: AtomicUsize,
}

impl FakeFetcher {
    fn new(metadata: Option<&str>) -> Self {
        let sources = SourcesConfig::default();
        let mut archives = HashMap::new();
        archives.insert(
            sources.core_archive_url.clone(),
            vec![
                ("wakatime-master/wakatime/cli.py", "# cli"),
                ("wakatime-master/wakatime/__about__.py", "# about"),
            ],
        );
        archives.insert(
            sources.runtime_archive_url(WINDOWS.arch),
            vec![("pythonw", "#!interpreter")],
        );
        Self {
            archives,
            metadata: metadata.map(str::to_string),
            downloads: AtomicUsize::new(0),
            metadata_fetches: AtomicUsize::new(0),
        }
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn metadata_fetches(&self) -> usize {
        self.metadata_fetches.load(Ordering::SeqCst)
    }
}

impl Fetcher for FakeFetcher {
    fn fetch_text(&self, url: &str) -> pulse_core::Result<String> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone().ok_or_else(|| TrackerError::Network {
            url: url.to_string(),
            details: "offline".to_string(),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> pulse_core::Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let entries = self.archives.get(url).ok_or_else(|| TrackerError::Network {
            url: url.to_string(),
            details: "HTTP 404".to_string(),
        })?;
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        write_zip(dest, entries);
        Ok(())
    }
}

/// Interpreter stand-in: `--version` succeeds for listed names or for any
/// path that exists on disk; `<cli> --version` reports `core_version` on
/// stderr.
struct FakeRuntime {
    working: Vec<PathBuf>,
    core_version: Mutex<Option<String>>,
}

impl FakeRuntime {
    fn new(working: &[&str], core_version: Option<&str>) -> Self {
        Self {
            working: working.iter().map(PathBuf::from).collect(),
            core_version: Mutex::new(core_version.map(str::to_string)),
        }
    }
}

impl ProcessRunner for FakeRuntime {
    fn run(&self, program: &Path, args: &[&OsStr]) -> io::Result<CapturedOutput> {
        if !self.working.iter().any(|p| p == program) && !program.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }

        if args.len() == 2 && args[1] == "--version" {
            let version = self.core_version.lock().unwrap().clone();
            return Ok(CapturedOutput {
                success: version.is_some(),
                code: Some(if version.is_some() { 0 } else { 1 }),
                stderr: version.map(|v| format!("{}\n", v)).unwrap_or_default(),
                ..Default::default()
            });
        }

        Ok(CapturedOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }
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

struct Harness {
    _temp: TempDir,
    paths: StoragePaths,
    fetcher: Arc<FakeFetcher>,
    installer: DependencyInstaller,
}

fn harness(
    platform: Platform,
    candidates: impl FnOnce(&StoragePaths) -> Vec<PathBuf>,
    runtime: FakeRuntime,
    fetcher: FakeFetcher,
) -> Harness {
    let temp = TempDir::new().unwrap();
    let paths = StoragePaths::with_roots(temp.path().join("home"), temp.path().join("install"));
    let runner: Arc<dyn ProcessRunner> = Arc::new(runtime);
    let locator = Arc::new(RuntimeLocator::with_candidates(
        candidates(&paths),
        Arc::clone(&runner),
    ));
    let fetcher = Arc::new(fetcher);
    let installer = DependencyInstaller::new(
        paths.clone(),
        SourcesConfig::default(),
        platform,
        locator,
        runner,
        Arc::clone(&fetcher) as Arc<dyn Fetcher>,
    );
    Harness {
        _temp: temp,
        paths,
        fetcher,
        installer,
    }
}

fn system_python(_: &StoragePaths) -> Vec<PathBuf> {
    vec![PathBuf::from("python")]
}

#[test]
fn absent_core_tool_is_downloaded_once_without_version_check() {
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], None),
        FakeFetcher::new(Some("__version_info__ = ('13', '0', '7')\n")),
    );

    let mut ready_calls = 0;
    let readiness = h.installer.ensure_ready(|| ready_calls += 1);

    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(ready_calls, 1);
    assert_eq!(h.fetcher.downloads(), 1);
    assert_eq!(h.fetcher.metadata_fetches(), 0);
    assert!(h.paths.core_cli().exists());
    assert!(
        !h.paths.core_archive().exists(),
        "downloaded archive must be deleted after extraction"
    );
}

#[test]
fn current_core_tool_is_left_alone() {
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], Some("13.0.7")),
        FakeFetcher::new(Some("__title__ = 'wakatime'\n__version_info__ = ('13', '0', '7')\n")),
    );
    std::fs::create_dir_all(h.paths.core_cli().parent().unwrap()).unwrap();
    std::fs::write(h.paths.core_cli(), "# installed").unwrap();

    let mut ready_calls = 0;
    let readiness = h.installer.ensure_ready(|| ready_calls += 1);

    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(ready_calls, 1);
    assert_eq!(h.fetcher.metadata_fetches(), 1);
    assert_eq!(h.fetcher.downloads(), 0);
    assert_eq!(
        std::fs::read_to_string(h.paths.core_cli()).unwrap(),
        "# installed"
    );
}

#[test]
fn outdated_core_tool_is_replaced_wholesale() {
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], Some("12.1.0")),
        FakeFetcher::new(Some("__version_info__ = ('13', '0', '7')\n")),
    );
    let stale = h.paths.core_dir().join("wakatime").join("stale.py");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(h.paths.core_cli(), "# old").unwrap();
    std::fs::write(&stale, "# left over").unwrap();

    let readiness = h.installer.ensure_ready(|| {});

    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(h.fetcher.downloads(), 1);
    assert!(!stale.exists(), "old tree must be removed before extraction");
    assert_eq!(std::fs::read_to_string(h.paths.core_cli()).unwrap(), "# cli");
}

#[test]
fn unreachable_metadata_forces_reinstall() {
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], Some("13.0.7")),
        FakeFetcher::new(None),
    );
    std::fs::create_dir_all(h.paths.core_cli().parent().unwrap()).unwrap();
    std::fs::write(h.paths.core_cli(), "# installed").unwrap();

    assert_eq!(h.installer.ensure_ready(|| {}), Readiness::Ready);
    assert_eq!(h.fetcher.metadata_fetches(), 1);
    assert_eq!(h.fetcher.downloads(), 1);
}

// The fake archive holds `pythonw`; a Windows host looks for `pythonw.exe`.
#[cfg(not(windows))]
#[test]
fn windows_installs_runtime_then_core() {
    let h = harness(
        WINDOWS,
        |paths| vec![paths.bundled_runtime()],
        FakeRuntime::new(&[], None),
        FakeFetcher::new(Some("__version_info__ = ('13', '0', '7')\n")),
    );

    let mut ready_calls = 0;
    let readiness = h.installer.ensure_ready(|| ready_calls += 1);

    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(ready_calls, 1);
    assert_eq!(h.fetcher.downloads(), 2);
    assert!(h.paths.runtime_dir().join("pythonw").exists());
    assert!(h.paths.core_cli().exists());
    assert!(!h.paths.runtime_archive().exists());
}

#[test]
fn failed_core_download_leaves_sequence_unavailable() {
    let mut fetcher = FakeFetcher::new(None);
    fetcher.archives.clear();
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], None),
        fetcher,
    );

    let mut ready_calls = 0;
    let readiness = h.installer.ensure_ready(|| ready_calls += 1);

    assert_eq!(ready_calls, 0);
    match readiness {
        Readiness::Unavailable { reason } => assert!(reason.contains("404")),
        other => panic!("unexpected readiness {:?}", other),
    }
    assert!(matches!(
        h.installer.readiness(),
        Readiness::Unavailable { .. }
    ));
    assert!(!h.paths.core_cli().exists());
}

#[test]
fn background_setup_reports_through_join_handle() {
    let h = harness(
        LINUX,
        system_python,
        FakeRuntime::new(&["python"], None),
        FakeFetcher::new(None),
    );
    let installer = Arc::new(h.installer);
    let (tx, rx) = std::sync::mpsc::channel();

    let handle = Arc::clone(&installer)
        .spawn_ensure_ready(move || tx.send(()).unwrap())
        .expect("spawn installer thread");

    assert_eq!(handle.join().unwrap(), Readiness::Ready);
    assert!(rx.try_recv().is_ok());
    assert_eq!(installer.readiness(), Readiness::Ready);
}
