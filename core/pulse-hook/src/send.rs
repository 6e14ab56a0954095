//! One-shot heartbeat.
//!
//! ```bash
//! pulse-hook send --file /p/src/main.rs --write --editor vim --editor-version 9.1 --workspace /p
//! ```
//!
//! Exits with the core tool's own code (0, 102, 103, 104, …) so scripts can
//! branch on it. No interpreter is exit code 1; run `pulse-hook setup` first.

use crate::watch::JsonLinesSink;
use crate::EditorArgs;
use pulse_core::{StoragePaths, Tracker, TrackerConfig, TrackerError};
use std::io;
use std::sync::Arc;

pub fn run(
    paths: StoragePaths,
    config: TrackerConfig,
    file: &str,
    write: bool,
    editor: &EditorArgs,
) -> Result<u8, String> {
    let sink = Arc::new(JsonLinesSink::new(io::stdout()));
    let mut tracker = Tracker::new(paths, config, sink);
    tracker.set_plugin(editor.plugin());
    tracker.set_workspace_root(editor.workspace());

    match tracker.send_now(file, write) {
        Ok(status) => Ok(process_exit_code(status.exit_code())),
        Err(TrackerError::RuntimeNotFound) => {
            Err("No working interpreter found; run `pulse-hook setup`".to_string())
        }
        Err(err) => Err(err.to_string()),
    }
}

/// Signal kills (-1) and codes outside the process range become 1.
fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
