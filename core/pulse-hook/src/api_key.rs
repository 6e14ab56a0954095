//! `pulse-hook api-key get|set`.

use crate::prompt::StdinPrompt;
use pulse_core::{CredentialStore, StoragePaths};

pub fn get(paths: &StoragePaths) -> Result<u8, String> {
    let store = CredentialStore::new(paths.credential_file());
    let key = store.get_api_key().map_err(|e| e.to_string())?;
    println!("{}", key);
    Ok(0)
}

pub fn set(paths: &StoragePaths, key: Option<&str>) -> Result<u8, String> {
    let store = CredentialStore::new(paths.credential_file());
    let key = match key {
        Some(key) => key.to_string(),
        None => store
            .prompt_for_api_key(&StdinPrompt)
            .ok_or_else(|| "No API key entered".to_string())?,
    };

    store.set_api_key(&key).map_err(|e| e.to_string())?;
    eprintln!("Saved API key to {}", store.path().display());
    Ok(0)
}
