//! Credential prompts: a terminal one for `setup` and `api-key set`, and one
//! that asks the attached editor over the watch protocol.

use crate::watch::JsonLinesSink;
use pulse_core::CredentialPrompt;
use pulse_protocol::{parse_message, EditorMessage, HookRequest};
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

pub struct StdinPrompt;

impl CredentialPrompt for StdinPrompt {
    fn prompt(&self, label: &str, default: Option<&str>) -> Option<String> {
        let mut stderr = io::stderr();
        let _ = match default {
            Some(current) => write!(stderr, "{} [{}]: ", label, mask(current)),
            None => write!(stderr, "{}: ", label),
        };
        let _ = stderr.flush();

        read_answer(&mut io::stdin().lock(), default)
    }
}

/// Reads one line. EOF or a read error cancels; a blank line keeps `default`.
fn read_answer(input: &mut impl BufRead, default: Option<&str>) -> Option<String> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let answer = line.trim();
            if answer.is_empty() {
                default.map(str::to_string)
            } else {
                Some(answer.to_string())
            }
        }
    }
}

/// Sends `prompt_api_key` and waits for the editor's `api_key` answer.
///
/// Other lines read while waiting are kept, untouched, for the session loop.
pub struct EditorPrompt<R: BufRead, W: Write + Send> {
    input: RefCell<R>,
    deferred: RefCell<Vec<u8>>,
    out: Arc<JsonLinesSink<W>>,
}

impl<R: BufRead, W: Write + Send> EditorPrompt<R, W> {
    pub fn new(input: R, out: Arc<JsonLinesSink<W>>) -> Self {
        Self {
            input: RefCell::new(input),
            deferred: RefCell::new(Vec::new()),
            out,
        }
    }

    /// Lines read past while prompting, followed by the unread input.
    pub fn into_parts(self) -> (Vec<u8>, R) {
        (self.deferred.into_inner(), self.input.into_inner())
    }

    fn await_answer(&self) -> Option<Option<String>> {
        let mut input = self.input.borrow_mut();
        loop {
            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => return None,
                Err(err) => {
                    tracing::debug!(error = %err, "Stdin failed while waiting for api key");
                    return None;
                }
                Ok(_) => {}
            }

            if let Ok(EditorMessage::ApiKey { value }) = parse_message(line.trim_end()) {
                return Some(value);
            }
            if !line.ends_with('\n') {
                line.push('\n');
            }
            self.deferred.borrow_mut().extend_from_slice(line.as_bytes());
        }
    }
}

impl<R: BufRead, W: Write + Send> CredentialPrompt for EditorPrompt<R, W> {
    fn prompt(&self, label: &str, default: Option<&str>) -> Option<String> {
        self.out.request(&HookRequest::PromptApiKey {
            label: label.to_string(),
            default: default.map(mask),
        });

        // An empty answer keeps the current key, as at the terminal.
        match self.await_answer()? {
            Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            Some(_) => default.map(str::to_string),
            None => None,
        }
    }
}

/// Shows only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let visible = chars.len().min(4);
    let tail: String = chars[chars.len() - visible..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - visible), tail)
}
