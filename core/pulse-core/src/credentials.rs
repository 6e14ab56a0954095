//! API key storage in `~/.wakatime.cfg`.
//!
//! The file is INI-formatted and shared with the core tool, which reads
//! `settings.api_key` on every heartbeat. Writes replace the whole file with a
//! single `[settings]` section; any other sections or keys are dropped.

use crate::error::CredentialError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PROMPT_LABEL: &str = "WakaTime API Key";

/// One-line text input supplied by the editor.
pub trait CredentialPrompt {
    /// Returns the entered value, or `None` if the user cancelled.
    fn prompt(&self, label: &str, default: Option<&str>) -> Option<String>;
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the API key, serving from cache after the first successful read.
    pub fn get_api_key(&self) -> Result<String, CredentialError> {
        if let Some(key) = self.cached_key() {
            return Ok(key);
        }

        let key = read_api_key(&self.path)?;
        self.remember(&key);
        Ok(key)
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_ok()
    }

    /// Replaces the config file with a `[settings]` section holding `api_key`.
    pub fn set_api_key(&self, api_key: &str) -> Result<(), CredentialError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }

        let content = format!("[settings]\napi_key = {}", api_key);
        fs_err::write(&self.path, content).map_err(|source| CredentialError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;

        self.remember(api_key);
        tracing::info!(path = %self.path.display(), "Saved api key");
        Ok(())
    }

    /// Asks for a key, pre-filled with the current one when present.
    pub fn prompt_for_api_key(&self, prompt: &dyn CredentialPrompt) -> Option<String> {
        let current = self.get_api_key().ok();
        prompt
            .prompt(PROMPT_LABEL, current.as_deref())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Prompts and stores a key when none is configured.
    /// Returns true when a usable key exists afterwards.
    pub fn ensure_api_key(&self, prompt: &dyn CredentialPrompt) -> bool {
        match self.get_api_key() {
            Ok(_) => true,
            Err(err @ CredentialError::Malformed { .. }) => {
                // Writing would replace the user's file wholesale.
                tracing::error!(error = %err, "Api key config unreadable; leaving it untouched");
                false
            }
            Err(err) => {
                tracing::info!(reason = %err, "No api key configured; prompting");
                let Some(key) = self.prompt_for_api_key(prompt) else {
                    tracing::warn!("Api key prompt cancelled");
                    return false;
                };
                match self.set_api_key(&key) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to store api key");
                        false
                    }
                }
            }
        }
    }

    fn cached_key(&self) -> Option<String> {
        self.cached.lock().ok().and_then(|guard| guard.clone())
    }

    fn remember(&self, key: &str) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(key.to_string());
        }
    }
}

fn read_api_key(path: &Path) -> Result<String, CredentialError> {
    let content = fs_err::read_to_string(path).map_err(|source| CredentialError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let key = match ini::Ini::load_from_str(&content) {
        Ok(parsed) => parsed
            .section(Some("settings"))
            .and_then(|settings| settings.get("api_key"))
            .map(str::to_string),
        Err(err) => {
            tracing::debug!(error = %err, "Strict ini parse failed; scanning [settings]");
            let Some(key) = scan_settings_key(&content) else {
                return Err(CredentialError::Malformed {
                    path: path.to_path_buf(),
                    details: err.to_string(),
                });
            };
            Some(key)
        }
    };

    key.as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CredentialError::KeyMissing {
            path: path.to_path_buf(),
        })
}

/// Line scan for `api_key` under `[settings]`. Accepts the loose INI the core
/// tool writes, such as bare flags without `=`.
fn scan_settings_key(content: &str) -> Option<String> {
    let mut in_settings = false;
    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_settings = line.trim_end_matches(']').trim_start_matches('[').trim() == "settings";
            continue;
        }
        if !in_settings || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == "api_key" {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}
