//! Long-lived editor session.
//!
//! The editor writes one JSON message per line on stdin and reads status
//! lines from stdout. The loop ends when stdin closes.
//!
//! ```text
//! stdin  → {"type":"hello","editor":"vscode","editor_version":"1.90.0"}
//! stdin  → {"type":"document_saved","file":"/p/src/main.rs"}
//! stdout ← {"text":"WakaTime Active","tooltip":"Last heartbeat sent at …"}
//! ```
//!
//! Without a stored key the session first asks the editor for one; lines that
//! arrive before the answer are replayed once it has been handled.
//!
//! Malformed lines are logged and skipped; they never end the session.

use crate::prompt::EditorPrompt;
use crate::EditorArgs;
use pulse_core::{DispatchOutcome, StatusLine, StatusSink, StoragePaths, Tracker, TrackerConfig};
use pulse_protocol::{parse_message, HookRequest};
use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};

pub fn run(paths: StoragePaths, config: TrackerConfig, editor: &EditorArgs) -> Result<u8, String> {
    let sink = Arc::new(JsonLinesSink::new(io::stdout()));
    let mut tracker = Tracker::new(paths, config, Arc::clone(&sink) as Arc<dyn StatusSink>);
    tracker.set_plugin(editor.plugin());
    tracker.set_workspace_root(editor.workspace());

    // Setup keeps running in the background; heartbeats before it finishes
    // are skipped if no interpreter is available yet.
    let prompt = EditorPrompt::new(io::stdin().lock(), sink);
    tracker
        .start(Some(&prompt))
        .map_err(|e| format!("Failed to start installer: {}", e))?;

    let (deferred, rest) = prompt.into_parts();
    let stats = serve(&mut tracker, io::Cursor::new(deferred).chain(rest))
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    tracing::info!(
        messages = stats.messages,
        rejected = stats.rejected,
        heartbeats = stats.heartbeats,
        "Editor detached"
    );
    Ok(0)
}

/// Writes each status as one JSON line. Updates come from heartbeat waiter
/// threads as well as the main loop, so writes are serialized.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out.into_inner().unwrap()
    }

    /// Writes a request on the same stream as status lines.
    pub fn request(&self, request: &HookRequest) {
        match serde_json::to_string(request) {
            Ok(line) => self.write_line(&line),
            Err(err) => tracing::warn!(error = %err, "Failed to encode request"),
        }
    }

    fn write_line(&self, line: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(err) = writeln!(out, "{}", line).and_then(|()| out.flush()) {
            tracing::debug!(error = %err, "Failed to write stdout line");
        }
    }
}

impl<W: Write + Send> StatusSink for JsonLinesSink<W> {
    fn update(&self, status: &StatusLine) {
        match serde_json::to_string(status) {
            Ok(line) => self.write_line(&line),
            Err(err) => tracing::warn!(error = %err, "Failed to encode status line"),
        }
    }
}

/// Counters for one session, logged when the editor detaches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub messages: usize,
    pub rejected: usize,
    pub heartbeats: usize,
}

/// Feeds protocol lines from `input` into the tracker until EOF.
pub fn serve(tracker: &mut Tracker, input: impl BufRead) -> io::Result<SessionStats> {
    let mut stats = SessionStats::default();

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_message(&line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(code = err.code, error = %err.message, "Skipping malformed message");
                stats.rejected += 1;
                continue;
            }
        };

        stats.messages += 1;
        if let Some(DispatchOutcome::Spawned) = tracker.handle_message(&message) {
            stats.heartbeats += 1;
        }
    }

    Ok(stats)
}
