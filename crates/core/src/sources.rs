use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::account::AccountRecord;
use crate::domain::legacy_site::LegacySite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Analytics,
    Crm,
    SiteIndex,
    SearchAdmin,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Crm => "crm",
            Self::SiteIndex => "site_index",
            Self::SearchAdmin => "search_admin",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} is not configured")]
    NotConfigured(SourceKind),
    #[error("{source_kind} rejected credentials: {message}")]
    Authentication { source_kind: SourceKind, message: String },
    #[error("{source_kind} request failed: {message}")]
    Transport { source_kind: SourceKind, message: String },
    #[error("{source_kind} returned status {status}: {message}")]
    Status { source_kind: SourceKind, status: u16, message: String },
    #[error("{source_kind} response could not be decoded: {message}")]
    Decode { source_kind: SourceKind, message: String },
}

impl SourceError {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            Self::NotConfigured(kind) => *kind,
            Self::Authentication { source_kind, .. }
            | Self::Transport { source_kind, .. }
            | Self::Status { source_kind, .. }
            | Self::Decode { source_kind, .. } => *source_kind,
        }
    }

    pub fn transport(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::Transport { source_kind, message: message.into() }
    }

    pub fn decode(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::Decode { source_kind, message: message.into() }
    }
}

/// An upstream that can list accounts matching a free-text term.
#[async_trait]
pub trait AccountSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn query_accounts_by_term(&self, term: &str) -> Result<Vec<AccountRecord>, SourceError>;
}

#[async_trait]
pub trait SiteIndexSource: Send + Sync {
    async fn find_sites(&self, query: &str) -> Result<Vec<LegacySite>, SourceError>;
}

/// Flat `key: value` view of a search admin JSON object, sorted by key.
pub type SiteReport = BTreeMap<String, String>;

#[async_trait]
pub trait SearchAdminSource: Send + Sync {
    async fn site_status(&self, site_id: &str) -> Result<SiteReport, SourceError>;

    async fn exclusion_stats(&self, site_id: &str) -> Result<SiteReport, SourceError>;

    async fn restart_site(&self, site_id: &str) -> Result<(), SourceError>;
}
