//! Tracing setup for pulse-hook.
//!
//! Logs go to a daily rolling file under the install root; stdout is reserved
//! for status lines. When the log directory can't be created we fall back to
//! stderr.

use std::env;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "PULSE_DEBUG_LOG";
const LOG_FILE_NAME: &str = "pulse-hook.log";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    if let Some(dir) = log_dir {
        match fs_err::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let installed = tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_writer(writer)
                    .with_ansi(false)
                    .try_init()
                    .is_ok();
                return installed.then_some(guard);
            }
            Err(err) => {
                eprintln!("pulse-hook: logging to stderr ({})", err);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .try_init();
    None
}

fn env_filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_switch_accepts_common_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "YES"] {
            assert!(debug_enabled(Some(value)), "{value}");
        }
        for value in [None, Some("0"), Some("false"), Some("")] {
            assert!(!debug_enabled(value));
        }
    }
}
