use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use nebo_core::sources::{SearchAdminSource, SiteReport, SourceError, SourceKind};

use crate::client::{decode_json, ensure_success, flatten_object, join_url, transport_error};

/// Search admin API; site ids are path segments.
pub struct BoostAdminClient {
    client: Client,
    base_url: String,
}

impl BoostAdminClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    fn site_url(&self, site_id: &str, action: &str) -> Result<String, SourceError> {
        let site_id = site_id.trim();
        if site_id.is_empty() || !site_id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(SourceError::Status {
                source_kind: SourceKind::SearchAdmin,
                status: 400,
                message: format!("invalid site id `{site_id}`"),
            });
        }
        Ok(join_url(&self.base_url, &format!("sites/{site_id}/{action}")))
    }

    async fn get_report(&self, site_id: &str, action: &str) -> Result<SiteReport, SourceError> {
        let response = self
            .client
            .get(self.site_url(site_id, action)?)
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::SearchAdmin, error))?;

        let payload: Value = decode_json(SourceKind::SearchAdmin, response).await?;
        Ok(flatten_object(payload))
    }
}

#[async_trait]
impl SearchAdminSource for BoostAdminClient {
    async fn site_status(&self, site_id: &str) -> Result<SiteReport, SourceError> {
        self.get_report(site_id, "status").await
    }

    async fn exclusion_stats(&self, site_id: &str) -> Result<SiteReport, SourceError> {
        self.get_report(site_id, "exclusionStats").await
    }

    async fn restart_site(&self, site_id: &str) -> Result<(), SourceError> {
        let response = self
            .client
            .post(self.site_url(site_id, "restart")?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::SearchAdmin, error))?;

        ensure_success(SourceKind::SearchAdmin, response).await?;
        info!(event_name = "upstream.search_admin.site_restarted", site_id, "site restart requested");
        Ok(())
    }
}
