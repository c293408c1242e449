use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use nebo_core::config::AnalyticsConfig;
use nebo_core::domain::account::{AccountRecord, ActivityStatus, Revenue, UNKNOWN};
use nebo_core::normalize::sanitize_search_term;
use nebo_core::sources::{AccountSource, SourceError, SourceKind};

use crate::client::{decode_json, join_url, scalar_text, transport_error};
use crate::QUERY_ROW_LIMIT;

const ACCOUNT_FIELDS: &str = "domainName, csm, active, familyMrr, mrr, platform_smart, \
integrationType, trackingCode, city, state";

#[derive(Clone, Debug)]
pub struct AnalyticsSettings {
    pub base_url: String,
    pub user: String,
    pub password: SecretString,
    pub database_id: u32,
    pub provider_label: String,
}

impl AnalyticsSettings {
    pub fn from_config(config: &AnalyticsConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            base_url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            database_id: config.database_id,
            provider_label: config.provider_label.clone(),
        })
    }
}

/// Metabase native-query account source.
pub struct MetabaseSource {
    client: Client,
    settings: AnalyticsSettings,
    session_id: Mutex<Option<String>>,
}

impl MetabaseSource {
    pub fn new(client: Client, settings: AnalyticsSettings) -> Self {
        Self { client, settings, session_id: Mutex::new(None) }
    }

    async fn session_id(&self) -> Result<String, SourceError> {
        let mut cached = self.session_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let response = self
            .client
            .post(join_url(&self.settings.base_url, "api/session"))
            .json(&json!({
                "username": self.settings.user,
                "password": self.settings.password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::Analytics, error))?;

        let session: SessionResponse = decode_json(SourceKind::Analytics, response).await?;
        debug!(event_name = "upstream.analytics.session_opened", "analytics session opened");
        *cached = Some(session.id.clone());
        Ok(session.id)
    }

    async fn run_native_query(&self, sql: &str) -> Result<DatasetData, SourceError> {
        let session_id = self.session_id().await?;
        let response = self
            .client
            .post(join_url(&self.settings.base_url, "api/dataset"))
            .header("X-Metabase-Session", session_id)
            .json(&json!({
                "database": self.settings.database_id,
                "type": "native",
                "native": { "query": sql },
            }))
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::Analytics, error))?;

        match decode_json::<DatasetResponse>(SourceKind::Analytics, response).await {
            Ok(payload) => Ok(payload.data),
            Err(error @ SourceError::Authentication { .. }) => {
                warn!(event_name = "upstream.analytics.session_expired", "analytics session rejected");
                *self.session_id.lock().await = None;
                Err(error)
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl AccountSource for MetabaseSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Analytics
    }

    async fn query_accounts_by_term(&self, term: &str) -> Result<Vec<AccountRecord>, SourceError> {
        let data = self.run_native_query(&account_query(term)).await?;
        Ok(data.into_records(&self.settings.provider_label))
    }
}

pub fn account_query(term: &str) -> String {
    let term = sanitize_search_term(term);
    format!(
        "SELECT {ACCOUNT_FIELDS} FROM websites WHERE active AND !presales AND !sandbox AND (name \
         LIKE '%{term}%' OR platform_smart LIKE '%{term}%' OR trackingCode = '{term}') ORDER BY \
         mrr DESC LIMIT {QUERY_ROW_LIMIT}"
    )
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    data: DatasetData,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetData {
    #[serde(default)]
    cols: Vec<DatasetColumn>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DatasetColumn {
    name: String,
}

impl DatasetData {
    /// Columns are resolved by name, so their order in the result does not matter.
    fn into_records(self, provider_label: &str) -> Vec<AccountRecord> {
        let columns: Vec<String> = self.cols.into_iter().map(|column| column.name).collect();
        self.rows
            .iter()
            .map(|row| {
                let mut record = AccountRecord {
                    active: ActivityStatus::Active,
                    provider: provider_label.to_owned(),
                    ..AccountRecord::default()
                };
                for (name, value) in columns.iter().zip(row) {
                    apply_column(&mut record, name, value);
                }
                record
            })
            .collect()
    }
}

fn apply_column(record: &mut AccountRecord, name: &str, value: &Value) {
    match name {
        "mrr" => record.mrr = Revenue::from_optional(value.as_f64()),
        "familyMrr" => record.family_mrr = Revenue::from_optional(value.as_f64()),
        _ => {
            let Some(text) = scalar_text(value).filter(|text| !text.trim().is_empty()) else {
                return;
            };
            match name {
                "domainName" => record.website = text,
                "csm" => record.manager = text,
                "platform_smart" => record.platform = text,
                "integrationType" => record.integration = text,
                "trackingCode" => record.site_id = text,
                "city" => record.city = text,
                "state" => record.state = text,
                _ => {}
            }
        }
    }
}
