//! Importing per-build descriptor files from a remote server.
//!
//! The server is expected to serve `<url>/<identifier>.json` for each image
//! identifier. Transfers run on a background thread and only complete
//! bodies are written to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::image_file_path;
use crate::error::{Error, Result};

const TIMEOUT_SECS: u64 = 30;

/// Result of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub url: String,
    /// Descriptor files written to the patches directory
    pub saved: Vec<PathBuf>,
    /// `(identifier, error)` for each file that could not be fetched
    pub failed: Vec<(String, String)>,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        !self.saved.is_empty()
    }
}

/// Check the URL scheme and strip trailing slashes
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::InvalidUrl(url.to_string()));
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Download the descriptor file of one identifier
pub fn fetch_catalog(agent: &ureq::Agent, base_url: &str, identifier: &str) -> Result<String> {
    let url = format!("{}/{}.json", base_url, identifier);
    debug!("GET {}", url);
    let mut response = agent
        .get(&url)
        .call()
        .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::Network(format!("{}: {}", url, e)))
}

fn import(base_url: &str, identifiers: &[String], patches_dir: &Path) -> ImportOutcome {
    let agent = agent();
    let mut outcome = ImportOutcome {
        url: base_url.to_string(),
        ..Default::default()
    };

    for identifier in identifiers {
        let saved = fetch_catalog(&agent, base_url, identifier).and_then(|body| {
            // Reject bodies that are not JSON before they replace a local file
            serde_json::from_str::<serde_json::Value>(&body)?;
            fs::create_dir_all(patches_dir)?;
            let path = image_file_path(patches_dir, identifier);
            fs::write(&path, body)?;
            Ok(path)
        });
        match saved {
            Ok(path) => {
                info!("Imported {}", path.display());
                outcome.saved.push(path);
            }
            Err(e) => {
                warn!("Import of {} failed: {}", identifier, e);
                outcome.failed.push((identifier.clone(), e.to_string()));
            }
        }
    }
    outcome
}

/// A running import
pub struct RemoteImport {
    receiver: Receiver<ImportOutcome>,
    done: Option<ImportOutcome>,
}

impl RemoteImport {
    /// Start fetching the descriptor files of `identifiers` from `url`
    pub fn spawn(url: &str, identifiers: Vec<String>, patches_dir: PathBuf) -> Result<Self> {
        let base_url = normalize_url(url)?;
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("hexpatch-import".into())
            .spawn(move || {
                let outcome = import(&base_url, &identifiers, &patches_dir);
                // The receiver may be gone if the caller lost interest
                let _ = sender.send(outcome);
            })?;
        Ok(Self { receiver, done: None })
    }

    /// The outcome, once the transfer has finished
    pub fn try_finish(&mut self) -> Option<ImportOutcome> {
        if self.done.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.done = Some(outcome),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.done = Some(ImportOutcome::default()),
            }
        }
        self.done.clone()
    }

    /// Block until the transfer has finished
    pub fn wait(self) -> ImportOutcome {
        match self.done {
            Some(outcome) => outcome,
            None => self.receiver.recv().unwrap_or_default(),
        }
    }
}
