//! Interactive setup: API key prompt plus a blocking dependency install.

use crate::prompt::StdinPrompt;
use crate::watch::JsonLinesSink;
use pulse_core::{Readiness, StoragePaths, Tracker, TrackerConfig};
use std::io;
use std::sync::Arc;

pub fn run(paths: StoragePaths, config: TrackerConfig) -> Result<u8, String> {
    let sink = Arc::new(JsonLinesSink::new(io::stdout()));
    let tracker = Tracker::new(paths, config, sink);

    let handle = tracker
        .start(Some(&StdinPrompt))
        .map_err(|e| format!("Failed to start installer: {}", e))?;
    let readiness = handle
        .join()
        .map_err(|_| "Installer thread panicked".to_string())?;

    match readiness {
        Readiness::Ready => {
            if !tracker.credentials().has_api_key() {
                tracing::warn!("Dependencies ready but no api key configured");
                eprintln!("No API key configured; run `pulse-hook api-key set`");
            }
            Ok(0)
        }
        Readiness::Unavailable { reason } => Err(reason),
        other => Err(format!("Setup stopped while {:?}", other)),
    }
}
