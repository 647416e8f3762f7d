//! Client configuration from the environment.
//!
//! `from_env` loads a `.env` file when present, then reads:
//!
//! | Variable | Default |
//! |---|---|
//! | `AGENDA_API_URL` | `http://localhost:3001/api` |
//! | `AGENDA_ALLOWED_DOMAIN` | `uml.edu.ni` |
//! | `AGENDA_SESSION_FILE` | unset (in-memory session) |
//!
//! Empty values count as unset.

use std::env;
use std::path::PathBuf;

use dotenv::dotenv;
use tracing::info;
use url::Url;

use crate::auth::{DomainPolicy, DEFAULT_ALLOWED_DOMAIN};
use crate::client::{AgendaClient, DEFAULT_BASE_URL};
use crate::error::ApiError;
use crate::session::{FileStorage, MemoryStorage, Storage};
use crate::transport::UreqTransport;

pub const API_URL_VAR: &str = "AGENDA_API_URL";
pub const ALLOWED_DOMAIN_VAR: &str = "AGENDA_ALLOWED_DOMAIN";
pub const SESSION_FILE_VAR: &str = "AGENDA_SESSION_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub allowed_domain: String,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            allowed_domain: DEFAULT_ALLOWED_DOMAIN.to_string(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ApiError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = read(API_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let parsed = Url::parse(&base_url)
            .map_err(|e| ApiError::Config(format!("{API_URL_VAR}={base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "{API_URL_VAR} must be an http(s) URL, got {base_url}"
            )));
        }

        let allowed_domain =
            read(ALLOWED_DOMAIN_VAR).unwrap_or_else(|| DEFAULT_ALLOWED_DOMAIN.to_string());
        let session_file = read(SESSION_FILE_VAR).map(PathBuf::from);

        Ok(Self {
            base_url,
            allowed_domain,
            session_file,
        })
    }

    pub fn domain_policy(&self) -> DomainPolicy {
        DomainPolicy::new(&self.allowed_domain)
    }

    /// File-backed storage when a session file is configured, memory
    /// otherwise.
    pub fn storage(&self) -> Box<dyn Storage> {
        match &self.session_file {
            Some(path) => Box::new(FileStorage::new(path)),
            None => Box::new(MemoryStorage::new()),
        }
    }

    /// Network client for this configuration.
    pub fn connect(&self) -> AgendaClient<UreqTransport, Box<dyn Storage>> {
        info!(base_url = %self.base_url, persisted = self.session_file.is_some(), "agenda client configured");
        AgendaClient::new(&self.base_url, UreqTransport::new(), self.storage())
    }
}
