//! Tracker engine: the single owner of session state.
//!
//! The engine is driven from one thread (the editor event loop). It owns the
//! debouncer by value; everything it shares with background work (runtime
//! cache, readiness, status sink) sits behind `Arc`.

use crate::activity::{Debouncer, Heartbeat, SessionState};
use crate::config::TrackerConfig;
use crate::credentials::{CredentialPrompt, CredentialStore};
use crate::dispatch::{DispatchOutcome, HeartbeatDispatcher, PluginInfo};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::installer::{DependencyInstaller, Platform, Readiness};
use crate::process::{CommandRunner, ProcessRunner};
use crate::project::project_name;
use crate::runtime::RuntimeLocator;
use crate::status::{initialized_line, initializing_line, HeartbeatStatus, StatusSink};
use crate::storage::StoragePaths;
use chrono::{DateTime, Utc};
use pulse_protocol::{ActivityKind, EditorMessage, PROTOCOL_VERSION};
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct Tracker {
    config: TrackerConfig,
    credentials: CredentialStore,
    locator: Arc<RuntimeLocator>,
    installer: Arc<DependencyInstaller>,
    dispatcher: HeartbeatDispatcher,
    debouncer: Debouncer,
    status: Arc<dyn StatusSink>,
    plugin: PluginInfo,
    workspace_root: Option<String>,
}

impl Tracker {
    /// Production wiring: real subprocesses, HTTPS, the current platform.
    pub fn new(paths: StoragePaths, config: TrackerConfig, status: Arc<dyn StatusSink>) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(CommandRunner);
        let locator = Arc::new(RuntimeLocator::new(&paths, Arc::clone(&runner)));
        Self::with_parts(
            paths,
            config,
            status,
            locator,
            runner,
            Arc::new(HttpFetcher::new()),
            Platform::current(),
        )
    }

    pub fn with_parts(
        paths: StoragePaths,
        config: TrackerConfig,
        status: Arc<dyn StatusSink>,
        locator: Arc<RuntimeLocator>,
        runner: Arc<dyn ProcessRunner>,
        fetcher: Arc<dyn Fetcher>,
        platform: Platform,
    ) -> Self {
        let installer = Arc::new(DependencyInstaller::new(
            paths.clone(),
            config.sources.clone(),
            platform,
            Arc::clone(&locator),
            runner,
            fetcher,
        ));
        let dispatcher = HeartbeatDispatcher::new(
            Arc::clone(&locator),
            paths.core_cli(),
            Arc::clone(&status),
            config.max_in_flight,
        );

        Self {
            credentials: CredentialStore::new(paths.credential_file()),
            debouncer: Debouncer::new(config.debounce_ms),
            config,
            locator,
            installer,
            dispatcher,
            status,
            plugin: PluginInfo::default(),
            workspace_root: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn installer(&self) -> &Arc<DependencyInstaller> {
        &self.installer
    }

    pub fn locator(&self) -> &Arc<RuntimeLocator> {
        &self.locator
    }

    pub fn session(&self) -> &SessionState {
        self.debouncer.session()
    }

    pub fn readiness(&self) -> Readiness {
        self.installer.readiness()
    }

    pub fn set_plugin(&mut self, plugin: PluginInfo) {
        self.plugin = plugin;
    }

    pub fn set_workspace_root(&mut self, workspace_root: Option<String>) {
        self.workspace_root = workspace_root;
    }

    /// Shows the initializing status, makes sure an API key exists (prompting
    /// when a prompt is available) and starts dependency setup in the
    /// background. The status flips to initialized once setup succeeds.
    pub fn start(
        &self,
        prompt: Option<&dyn CredentialPrompt>,
    ) -> io::Result<JoinHandle<Readiness>> {
        self.status.update(&initializing_line());

        match prompt {
            Some(prompt) => {
                self.credentials.ensure_api_key(prompt);
            }
            None if !self.credentials.has_api_key() => {
                tracing::warn!(
                    path = %self.credentials.path().display(),
                    "No api key configured; heartbeats will be rejected until one is set"
                );
            }
            None => {}
        }

        let status = Arc::clone(&self.status);
        Arc::clone(&self.installer).spawn_ensure_ready(move || {
            status.update(&initialized_line());
        })
    }

    /// Applies one editor protocol message.
    pub fn handle_message(&mut self, message: &EditorMessage) -> Option<DispatchOutcome> {
        match message {
            EditorMessage::Hello {
                editor,
                editor_version,
                workspace_root,
                protocol_version,
            } => {
                if let Some(version) = protocol_version.filter(|v| *v != PROTOCOL_VERSION) {
                    tracing::warn!(
                        editor_protocol = version,
                        protocol = PROTOCOL_VERSION,
                        "Editor speaks a different protocol version"
                    );
                }
                tracing::info!(editor = %editor, editor_version = %editor_version, "Editor attached");
                self.set_plugin(PluginInfo {
                    editor: editor.clone(),
                    editor_version: editor_version.clone(),
                });
                self.set_workspace_root(workspace_root.clone());
                None
            }
            EditorMessage::WorkspaceChanged { workspace_root } => {
                self.set_workspace_root(workspace_root.clone());
                None
            }
            EditorMessage::ApiKey { value } => {
                match value.as_deref() {
                    Some(key) => {
                        if let Err(err) = self.credentials.set_api_key(key) {
                            tracing::warn!(error = %err, "Ignoring api key from editor");
                        }
                    }
                    None => tracing::debug!("Unsolicited api key cancel ignored"),
                }
                None
            }
            other => {
                let (kind, file) = other.activity()?;
                self.handle_activity_at(kind, file, Utc::now())
            }
        }
    }

    pub fn handle_activity(
        &mut self,
        kind: ActivityKind,
        file: Option<&str>,
    ) -> Option<DispatchOutcome> {
        self.handle_activity_at(kind, file, Utc::now())
    }

    /// Debounces the signal and, if it qualifies, dispatches a heartbeat
    /// without waiting for it.
    pub fn handle_activity_at(
        &mut self,
        kind: ActivityKind,
        file: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<DispatchOutcome> {
        let heartbeat = self.debouncer.observe(kind, file, now)?;
        let project = project_name(self.workspace_root.as_deref());
        Some(
            self.dispatcher
                .dispatch(&heartbeat, &self.plugin, project.as_deref()),
        )
    }

    /// Sends one heartbeat immediately and waits for the tool to exit.
    pub fn send_now(&self, file: &str, is_write: bool) -> Result<HeartbeatStatus> {
        let heartbeat = Heartbeat {
            file: file.to_string(),
            is_write,
            time: Utc::now(),
        };
        let project = project_name(self.workspace_root.as_deref());
        self.dispatcher
            .dispatch_blocking(&heartbeat, &self.plugin, project.as_deref())
    }
}
