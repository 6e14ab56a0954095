//! # pulse-core
//!
//! Turns editor activity into WakaTime heartbeats.
//!
//! ## Pipeline
//!
//! ```text
//! editor event → Debouncer → HeartbeatDispatcher → RuntimeLocator → core tool subprocess
//!                                                                        │
//!                                              StatusSink ← exit code ←──┘
//! ```
//!
//! `DependencyInstaller` runs once at startup on a background thread and makes
//! sure an interpreter and a current core tool are installed.
//!
//! ## Design Principles
//!
//! - **Never crash the host**: every failure becomes a log line and, where
//!   user-facing, a status update.
//! - **Single owner**: `Tracker` owns session state; shared state is `Arc`-wrapped
//!   and synchronized.
//! - **Seams for tests**: subprocesses (`ProcessRunner`), HTTP (`Fetcher`),
//!   the editor (`StatusSink`, `CredentialPrompt`) and paths (`StoragePaths`)
//!   are all injectable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pulse_core::{StoragePaths, Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(StoragePaths::detect()?, TrackerConfig::default(), sink);
//! tracker.start(None)?;
//! tracker.handle_activity(ActivityKind::Saved, Some("/p/src/main.rs"));
//! ```

pub mod activity;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod patterns;
pub mod process;
pub mod project;
pub mod runtime;
pub mod status;
pub mod storage;

pub use activity::{Debouncer, Heartbeat, SessionState};
pub use config::{load_config, load_config_or_default, SourcesConfig, TrackerConfig};
pub use credentials::{CredentialPrompt, CredentialStore};
pub use dispatch::{DispatchOutcome, HeartbeatDispatcher, PluginInfo};
pub use engine::Tracker;
pub use error::{CredentialError, Result, TrackerError};
pub use fetch::{Fetcher, HttpFetcher};
pub use installer::{DependencyInstaller, Platform, Readiness};
pub use process::{CapturedOutput, CommandRunner, ProcessRunner};
pub use project::project_name;
pub use runtime::RuntimeLocator;
pub use status::{HeartbeatStatus, StatusSink};
pub use storage::StoragePaths;

pub use pulse_protocol::{ActivityKind, EditorMessage, StatusLine};
