use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use nebo_core::config::SiteIndexConfig;
use nebo_core::domain::legacy_site::{LegacySite, LegacySiteIndex};
use nebo_core::sources::{SiteIndexSource, SourceError, SourceKind};

use crate::client::{decode_json, scalar_text, transport_error};

#[derive(Clone, Debug)]
pub struct SiteIndexSettings {
    pub report_url: String,
    pub user: String,
    pub password: SecretString,
}

impl SiteIndexSettings {
    pub fn from_config(config: &SiteIndexConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            report_url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }
}

/// Legacy client report, downloaded once and searched in memory afterwards.
pub struct LegacyReportIndex {
    client: Client,
    settings: SiteIndexSettings,
    index: OnceCell<LegacySiteIndex>,
}

impl LegacyReportIndex {
    pub fn new(client: Client, settings: SiteIndexSettings) -> Self {
        Self { client, settings, index: OnceCell::new() }
    }

    async fn index(&self) -> Result<&LegacySiteIndex, SourceError> {
        self.index.get_or_try_init(|| self.download()).await
    }

    async fn download(&self) -> Result<LegacySiteIndex, SourceError> {
        let response = self
            .client
            .get(&self.settings.report_url)
            .basic_auth(&self.settings.user, Some(self.settings.password.expose_secret()))
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::SiteIndex, error))?;

        let report: ReportResponse = decode_json(SourceKind::SiteIndex, response).await?;
        let index = report.into_index();
        info!(
            event_name = "upstream.site_index.loaded",
            sites = index.len(),
            "legacy site report loaded"
        );
        Ok(index)
    }
}

#[async_trait]
impl SiteIndexSource for LegacyReportIndex {
    async fn find_sites(&self, query: &str) -> Result<Vec<LegacySite>, SourceError> {
        Ok(self.index().await?.find_matches(query.trim()))
    }
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

impl ReportResponse {
    fn into_index(self) -> LegacySiteIndex {
        LegacySiteIndex::from_sites(self.data.iter().filter_map(|row| {
            let cells: Vec<String> =
                row.iter().map(|cell| scalar_text(cell).unwrap_or_default()).collect();
            LegacySite::from_row(&cells)
        }))
    }
}
