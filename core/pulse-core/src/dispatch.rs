//! Heartbeat dispatch through the core tool.
//!
//! Each heartbeat runs `<runtime> <cli.py> --file … --plugin …` as a child
//! process. The caller never waits: a waiter thread collects the exit code,
//! maps it to a [`HeartbeatStatus`] and pushes it to the status sink.
//! Concurrent children are capped; beyond the cap a heartbeat is dropped.

use crate::activity::Heartbeat;
use crate::error::{Result, TrackerError};
use crate::runtime::RuntimeLocator;
use crate::status::{HeartbeatStatus, StatusSink, EXIT_NO_CODE};
use chrono::Local;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

pub const PLUGIN_NAME: &str = "pulse-hook";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifies the editor in the `--plugin` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub editor: String,
    pub editor_version: String,
}

impl Default for PluginInfo {
    fn default() -> Self {
        Self {
            editor: "unknown".to_string(),
            editor_version: "0".to_string(),
        }
    }
}

impl PluginInfo {
    /// `vscode/1.90.0 pulse-hook/0.3.0`
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} {}/{}",
            self.editor, self.editor_version, PLUGIN_NAME, PLUGIN_VERSION
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Spawned,
    NoRuntime,
    Throttled,
    Failed,
}

/// Arguments passed to the runtime, starting with the core tool script.
pub fn build_args(
    core_cli: &Path,
    file: &str,
    plugin: &str,
    project: Option<&str>,
    is_write: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        core_cli.as_os_str().to_owned(),
        "--file".into(),
        file.into(),
        "--plugin".into(),
        plugin.into(),
    ];
    if let Some(project) = project {
        args.push("--alternate-project".into());
        args.push(project.into());
    }
    if is_write {
        args.push("--write".into());
    }
    args
}

pub struct HeartbeatDispatcher {
    locator: Arc<RuntimeLocator>,
    core_cli: PathBuf,
    status: Arc<dyn StatusSink>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
}

impl HeartbeatDispatcher {
    pub fn new(
        locator: Arc<RuntimeLocator>,
        core_cli: PathBuf,
        status: Arc<dyn StatusSink>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            locator,
            core_cli,
            status,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Starts a heartbeat without waiting for it. Without a runtime this is a
    /// silent no-op.
    pub fn dispatch(
        &self,
        heartbeat: &Heartbeat,
        plugin: &PluginInfo,
        project: Option<&str>,
    ) -> DispatchOutcome {
        let Some(runtime) = self.locator.resolve() else {
            tracing::debug!(file = %heartbeat.file, "Skipping heartbeat (no runtime)");
            return DispatchOutcome::NoRuntime;
        };

        let Some(slot) = InFlightSlot::acquire(&self.in_flight, self.max_in_flight) else {
            tracing::warn!(
                file = %heartbeat.file,
                max_in_flight = self.max_in_flight,
                "Dropping heartbeat (too many in flight)"
            );
            return DispatchOutcome::Throttled;
        };

        let args = build_args(
            &self.core_cli,
            &heartbeat.file,
            &plugin.user_agent(),
            project,
            heartbeat.is_write,
        );

        // The waiter starts first so a failed thread spawn never strands a child.
        let (child_tx, child_rx) = mpsc::channel::<Child>();
        let status = Arc::clone(&self.status);
        let waiter = thread::Builder::new()
            .name("pulse-heartbeat".to_string())
            .spawn(move || {
                let Ok(child) = child_rx.recv() else {
                    return;
                };
                let result = interpret(child.wait_with_output());
                drop(slot);
                result.log();
                status.update(&result.status_line());
            });
        if let Err(err) = waiter {
            tracing::error!(error = %err, "Failed to start heartbeat waiter thread");
            self.report(HeartbeatStatus::Unknown { code: EXIT_NO_CODE });
            return DispatchOutcome::Failed;
        }

        let child = match spawn_tool(&runtime, &args) {
            Ok(child) => child,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    runtime = %runtime.display(),
                    "Failed to start core tool"
                );
                self.report(HeartbeatStatus::Unknown { code: EXIT_NO_CODE });
                return DispatchOutcome::Failed;
            }
        };

        if let Err(mpsc::SendError(mut child)) = child_tx.send(child) {
            tracing::error!("Heartbeat waiter exited early; killing core tool");
            let _ = child.kill();
            let _ = child.wait();
            self.report(HeartbeatStatus::Unknown { code: EXIT_NO_CODE });
            return DispatchOutcome::Failed;
        }

        tracing::debug!(
            file = %heartbeat.file,
            write = heartbeat.is_write,
            "Heartbeat dispatched"
        );
        DispatchOutcome::Spawned
    }

    /// Runs a heartbeat to completion and returns its status.
    pub fn dispatch_blocking(
        &self,
        heartbeat: &Heartbeat,
        plugin: &PluginInfo,
        project: Option<&str>,
    ) -> Result<HeartbeatStatus> {
        let runtime = self.locator.resolve().ok_or(TrackerError::RuntimeNotFound)?;
        let args = build_args(
            &self.core_cli,
            &heartbeat.file,
            &plugin.user_agent(),
            project,
            heartbeat.is_write,
        );

        let child = spawn_tool(&runtime, &args).map_err(|source| TrackerError::Spawn {
            command: runtime.display().to_string(),
            source,
        })?;
        let result = interpret(child.wait_with_output());
        self.report(result.clone());
        Ok(result)
    }

    fn report(&self, status: HeartbeatStatus) {
        status.log();
        self.status.update(&status.status_line());
    }
}

fn spawn_tool(runtime: &Path, args: &[OsString]) -> io::Result<Child> {
    Command::new(runtime)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

fn interpret(output: io::Result<Output>) -> HeartbeatStatus {
    let output = match output {
        Ok(output) => output,
        Err(err) => {
            tracing::error!(error = %err, "Failed waiting for core tool");
            return HeartbeatStatus::Unknown { code: EXIT_NO_CODE };
        }
    };

    let code = output.status.code().unwrap_or(EXIT_NO_CODE);
    if code != 0 {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stderr.trim().is_empty() {
            tracing::error!(code, stderr = %stderr.trim(), "Core tool stderr");
        }
        if !stdout.trim().is_empty() {
            tracing::error!(code, stdout = %stdout.trim(), "Core tool stdout");
        }
    }

    HeartbeatStatus::from_exit_code(code, Local::now())
}

/// Counts one running child; released on drop.
struct InFlightSlot(Arc<AtomicUsize>);

impl InFlightSlot {
    fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < max).then_some(current + 1)
            })
            .ok()
            .map(|_| InFlightSlot(Arc::clone(counter)))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
