//! Heartbeat outcomes and the status surface they are rendered to.
//!
//! The exit-code table is fixed by the core tool:
//!
//! | code  | status               |
//! |-------|----------------------|
//! | 0     | Active               |
//! | 102   | Offline              |
//! | 103   | Config parsing error |
//! | 104   | Invalid API key      |
//! | other | Unknown error        |

use chrono::{DateTime, Local, NaiveDateTime};
use pulse_protocol::StatusLine;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_API_ERROR: i32 = 102;
pub const EXIT_CONFIG_PARSE_ERROR: i32 = 103;
pub const EXIT_AUTH_ERROR: i32 = 104;
/// Used when the tool was killed by a signal and has no exit code.
pub const EXIT_NO_CODE: i32 = -1;

/// Renders status text and tooltip in the editor.
///
/// Updates may arrive from any thread and out of order; the last one wins.
pub trait StatusSink: Send + Sync {
    fn update(&self, status: &StatusLine);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Active { sent_at: DateTime<Local> },
    Offline,
    ConfigParsingError,
    InvalidApiKey,
    Unknown { code: i32 },
}

impl HeartbeatStatus {
    pub fn from_exit_code(code: i32, now: DateTime<Local>) -> Self {
        match code {
            EXIT_SUCCESS => HeartbeatStatus::Active { sent_at: now },
            EXIT_API_ERROR => HeartbeatStatus::Offline,
            EXIT_CONFIG_PARSE_ERROR => HeartbeatStatus::ConfigParsingError,
            EXIT_AUTH_ERROR => HeartbeatStatus::InvalidApiKey,
            code => HeartbeatStatus::Unknown { code },
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            HeartbeatStatus::Active { .. } => EXIT_SUCCESS,
            HeartbeatStatus::Offline => EXIT_API_ERROR,
            HeartbeatStatus::ConfigParsingError => EXIT_CONFIG_PARSE_ERROR,
            HeartbeatStatus::InvalidApiKey => EXIT_AUTH_ERROR,
            HeartbeatStatus::Unknown { code } => *code,
        }
    }

    pub fn status_line(&self) -> StatusLine {
        match self {
            HeartbeatStatus::Active { sent_at } => StatusLine {
                text: "WakaTime Active".to_string(),
                tooltip: Some(format!(
                    "Last heartbeat sent at {}",
                    format_send_time(&sent_at.naive_local())
                )),
            },
            HeartbeatStatus::Offline => StatusLine {
                text: "WakaTime Offline, coding activity will sync when online.".to_string(),
                tooltip: None,
            },
            HeartbeatStatus::ConfigParsingError => error_line(
                "Config Parsing Error (103); Check your ~/.wakatime.log file for more details.",
            ),
            HeartbeatStatus::InvalidApiKey => {
                error_line("Invalid API Key (104); Make sure your API Key is correct!")
            }
            HeartbeatStatus::Unknown { code } => error_line(&format!(
                "Unknown Error ({}); Check your ~/.wakatime.log file for more details.",
                code
            )),
        }
    }

    /// Emits the log entry that accompanies this status.
    pub fn log(&self) {
        match self {
            HeartbeatStatus::Active { .. } => tracing::debug!("Heartbeat sent"),
            HeartbeatStatus::Offline => tracing::warn!(
                code = EXIT_API_ERROR,
                "API Error (102); Check your ~/.wakatime.log file for more details."
            ),
            other => {
                if let Some(tooltip) = other.status_line().tooltip {
                    tracing::error!(code = other.exit_code(), "{}", tooltip);
                }
            }
        }
    }
}

fn error_line(tooltip: &str) -> StatusLine {
    StatusLine {
        text: "WakaTime Error".to_string(),
        tooltip: Some(tooltip.to_string()),
    }
}

pub fn initializing_line() -> StatusLine {
    StatusLine {
        text: "WakaTime Initializing...".to_string(),
        tooltip: None,
    }
}

pub fn initialized_line() -> StatusLine {
    StatusLine {
        text: "WakaTime Initialized".to_string(),
        tooltip: None,
    }
}

/// `Jan 5, 2026 3:07 PM`: 12-hour clock, zero-padded minutes.
pub fn format_send_time(time: &NaiveDateTime) -> String {
    time.format("%b %-d, %Y %-I:%M %p").to_string()
}
