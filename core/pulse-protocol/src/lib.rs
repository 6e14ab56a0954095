//! Wire types for the editor <-> pulse-hook JSON-lines protocol.
//!
//! The editor writes one [`EditorMessage`] per line to `pulse-hook watch` stdin
//! and reads one [`StatusLine`] per line from its stdout. When the hook needs
//! input it writes a [`HookRequest`] instead (distinguished by its `type`
//! field) and waits for the matching editor message:
//!
//! ```text
//! stdout ← {"type":"prompt_api_key","label":"WakaTime API Key"}
//! stdin  → {"type":"api_key","value":"waka_…"}      (null cancels)
//! ```
//!
//! This crate is shared by the hook and its core library so the schema cannot
//! drift.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Editor activity signal kinds that can trigger a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    SelectionChanged,
    ActiveEditorChanged,
    Saved,
}

impl ActivityKind {
    pub fn is_write(self) -> bool {
        matches!(self, ActivityKind::Saved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorMessage {
    /// Sent once when the editor attaches.
    Hello {
        editor: String,
        editor_version: String,
        #[serde(default)]
        workspace_root: Option<String>,
        #[serde(default)]
        protocol_version: Option<u32>,
    },
    SelectionChanged {
        #[serde(default)]
        file: Option<String>,
    },
    ActiveEditorChanged {
        #[serde(default)]
        file: Option<String>,
    },
    DocumentSaved {
        #[serde(default)]
        file: Option<String>,
    },
    WorkspaceChanged {
        #[serde(default)]
        workspace_root: Option<String>,
    },
    /// Answer to [`HookRequest::PromptApiKey`]; `None` means cancelled.
    /// Also accepted unprompted to replace the stored key.
    ApiKey {
        #[serde(default)]
        value: Option<String>,
    },
}

/// Requests from the hook that expect an editor reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookRequest {
    /// Ask the user for their API key; answered with [`EditorMessage::ApiKey`].
    PromptApiKey {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

impl EditorMessage {
    /// Splits an activity message into its kind and active file.
    /// Returns `None` for control messages (hello, workspace changes, keys).
    pub fn activity(&self) -> Option<(ActivityKind, Option<&str>)> {
        match self {
            EditorMessage::SelectionChanged { file } => {
                Some((ActivityKind::SelectionChanged, file.as_deref()))
            }
            EditorMessage::ActiveEditorChanged { file } => {
                Some((ActivityKind::ActiveEditorChanged, file.as_deref()))
            }
            EditorMessage::DocumentSaved { file } => Some((ActivityKind::Saved, file.as_deref())),
            EditorMessage::Hello { .. }
            | EditorMessage::WorkspaceChanged { .. }
            | EditorMessage::ApiKey { .. } => None,
        }
    }
}

/// Status-bar text and tooltip pushed back to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse_message(line: &str) -> Result<EditorMessage, ParseError> {
    if line.len() > MAX_LINE_BYTES {
        return Err(ParseError {
            code: "line_too_large",
            message: format!("message exceeds {} bytes", MAX_LINE_BYTES),
        });
    }

    serde_json::from_str(line).map_err(|err| ParseError {
        code: "invalid_json",
        message: err.to_string(),
    })
}
