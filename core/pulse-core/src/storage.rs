//! Storage paths for pulse.
//!
//! `StoragePaths` centralizes every filesystem location the tracker touches:
//! the user's home (for `~/.wakatime.cfg`), the install root that holds the
//! bundled interpreter and the core tool, and the plugin config directory.
//!
//! Production code uses `StoragePaths::detect()`; tests use
//! `StoragePaths::with_roots()` pointed at temp directories.

use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pulse";
const INSTALL_DIR_ENV: &str = "PULSE_INSTALL_DIR";
const CONFIG_ENV: &str = "PULSE_CONFIG";

pub const CORE_DIR_NAME: &str = "wakatime-master";
pub const RUNTIME_DIR_NAME: &str = "python";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    /// User home; holds `.wakatime.cfg`.
    home: PathBuf,
    /// Install root for the interpreter and the core tool.
    install_root: PathBuf,
    /// Plugin config file (TOML).
    config_file: PathBuf,
}

impl StoragePaths {
    /// Resolves paths from the environment and platform directories.
    /// Returns `None` when no home directory can be determined.
    pub fn detect() -> Option<Self> {
        let home = dirs::home_dir()?;

        let install_root = env::var_os(INSTALL_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| home.join(".pulse"));

        let config_file = env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")))
            .unwrap_or_else(|| home.join(".pulse").join("config.toml"));

        Some(Self {
            home,
            install_root,
            config_file,
        })
    }

    /// Creates paths rooted at explicit directories. Used by tests.
    pub fn with_roots(home: PathBuf, install_root: PathBuf) -> Self {
        let config_file = install_root.join("config.toml");
        Self {
            home,
            install_root,
            config_file,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to `~/.wakatime.cfg`.
    pub fn credential_file(&self) -> PathBuf {
        self.home.join(".wakatime.cfg")
    }

    /// Entry point of the core tool.
    pub fn core_cli(&self) -> PathBuf {
        self.core_dir().join("wakatime").join("cli.py")
    }

    /// Download target for the core tool archive.
    pub fn core_archive(&self) -> PathBuf {
        self.install_root.join(format!("{}.zip", CORE_DIR_NAME))
    }

    /// Download target for the interpreter archive.
    pub fn runtime_archive(&self) -> PathBuf {
        self.install_root.join(format!("{}.zip", RUNTIME_DIR_NAME))
    }

    /// Bundled interpreter executable.
    pub fn bundled_runtime(&self) -> PathBuf {
        let name = if cfg!(windows) {
            "pythonw.exe"
        } else {
            "pythonw"
        };
        self.runtime_dir().join(name)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    /// Root of the extracted core tool tree.
    pub fn core_dir(&self) -> PathBuf {
        self.install_root.join(CORE_DIR_NAME)
    }

    /// Extraction target for the bundled interpreter.
    pub fn runtime_dir(&self) -> PathBuf {
        self.install_root.join(RUNTIME_DIR_NAME)
    }

    /// Directory for rolling log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.install_root.join("logs")
    }
}
