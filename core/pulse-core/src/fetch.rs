//! HTTPS access for version metadata and archive downloads.

use crate::error::{Result, TrackerError};
use fs_err as fs;
use std::io;
use std::path::Path;
use std::time::Duration;

const METADATA_TIMEOUT_SECS: u64 = 20;
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

pub trait Fetcher: Send + Sync {
    /// GETs `url` and returns the body as text. Non-200 responses are errors.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// GETs `url` and streams the body into `dest`, creating or truncating it.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

pub struct HttpFetcher {
    metadata: ureq::Agent,
    downloads: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let user_agent = format!("pulse-hook/{}", env!("CARGO_PKG_VERSION"));
        Self {
            metadata: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
                .user_agent(&user_agent)
                .build(),
            downloads: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
                .user_agent(&user_agent)
                .build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let response = get(&self.metadata, url)?;
        response.into_string().map_err(|err| TrackerError::Network {
            url: url.to_string(),
            details: format!("failed reading body: {}", err),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let response = get(&self.downloads, url)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| TrackerError::io("creating download directory", err))?;
        }

        let mut out = fs::File::create(dest)
            .map_err(|err| TrackerError::io("creating download file", err))?;
        let mut reader = response.into_reader();
        let bytes = io::copy(&mut reader, &mut out).map_err(|err| TrackerError::Network {
            url: url.to_string(),
            details: format!("failed writing {}: {}", dest.display(), err),
        })?;

        tracing::debug!(url, bytes, dest = %dest.display(), "Download finished");
        Ok(())
    }
}

fn get(agent: &ureq::Agent, url: &str) -> Result<ureq::Response> {
    let response = agent.get(url).call().map_err(|err| TrackerError::Network {
        url: url.to_string(),
        details: match err {
            ureq::Error::Status(code, _) => format!("HTTP {}", code),
            ureq::Error::Transport(transport) => transport.to_string(),
        },
    })?;

    if response.status() != 200 {
        return Err(TrackerError::Network {
            url: url.to_string(),
            details: format!("HTTP {}", response.status()),
        });
    }

    Ok(response)
}
