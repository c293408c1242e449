use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use nebo_core::config::CrmConfig;
use nebo_core::domain::account::{AccountRecord, ActivityStatus, RecordType, Revenue, UNKNOWN};
use nebo_core::normalize::sanitize_search_term;
use nebo_core::sources::{AccountSource, SourceError, SourceKind};

use crate::client::{decode_json, join_url, transport_error};
use crate::QUERY_ROW_LIMIT;

const SELECT_FIELDS: &str = "Type, Website, CS_Manager__r.Name, Family_MRR__c, Chargify_MRR__c, \
Platform__c, Integration_Type__c, Chargify_Source__c, Tracking_Code__c, BillingCity, \
BillingCountry, BillingState";

#[derive(Clone, Debug)]
pub struct CrmSettings {
    pub base_url: String,
    pub user: String,
    pub password: SecretString,
    pub security_token: SecretString,
    pub client_id: String,
    pub client_secret: SecretString,
    pub api_version: String,
}

impl CrmSettings {
    /// `None` when any credential the password grant needs is blank.
    pub fn from_config(config: &CrmConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            base_url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            security_token: config.security_token.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            api_version: config.api_version.clone(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CrmSession {
    access_token: String,
    instance_url: String,
}

/// Salesforce REST account source using the OAuth2 password grant.
pub struct SalesforceSource {
    client: Client,
    settings: CrmSettings,
    session: Mutex<Option<CrmSession>>,
}

impl SalesforceSource {
    pub fn new(client: Client, settings: CrmSettings) -> Self {
        Self { client, settings, session: Mutex::new(None) }
    }

    async fn session(&self) -> Result<CrmSession, SourceError> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            return Ok(session.clone());
        }

        let password = format!(
            "{}{}",
            self.settings.password.expose_secret(),
            self.settings.security_token.expose_secret()
        );
        let response = self
            .client
            .post(join_url(&self.settings.base_url, "services/oauth2/token"))
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.expose_secret()),
                ("username", self.settings.user.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::Crm, error))?;

        let session: CrmSession = decode_json(SourceKind::Crm, response).await?;
        if session.access_token.trim().is_empty() {
            return Err(SourceError::Authentication {
                source_kind: SourceKind::Crm,
                message: "token endpoint returned empty access token".to_owned(),
            });
        }

        debug!(event_name = "upstream.crm.session_opened", "crm session opened");
        *cached = Some(session.clone());
        Ok(session)
    }

    async fn query(&self, soql: &str) -> Result<Vec<CrmAccountRow>, SourceError> {
        let session = self.session().await?;
        let url = join_url(
            &session.instance_url,
            &format!("services/data/{}/query", self.settings.api_version),
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&session.access_token)
            .query(&[("q", soql)])
            .send()
            .await
            .map_err(|error| transport_error(SourceKind::Crm, error))?;

        match decode_json::<QueryResponse>(SourceKind::Crm, response).await {
            Ok(payload) => Ok(payload.records),
            Err(error @ SourceError::Authentication { .. }) => {
                warn!(event_name = "upstream.crm.session_expired", "crm session rejected");
                *self.session.lock().await = None;
                Err(error)
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl AccountSource for SalesforceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crm
    }

    async fn query_accounts_by_term(&self, term: &str) -> Result<Vec<AccountRecord>, SourceError> {
        let rows = self.query(&account_query(term)).await?;
        Ok(rows.into_iter().map(CrmAccountRow::into_record).collect())
    }
}

/// Every account type is selected; the reconciler needs prospects to exclude them.
pub fn account_query(term: &str) -> String {
    let term = sanitize_search_term(term);
    format!(
        "SELECT {SELECT_FIELDS} FROM Account WHERE (Website LIKE '%{term}%' OR Platform__c LIKE \
         '%{term}%' OR Tracking_Code__c = '{term}') ORDER BY Chargify_MRR__c DESC LIMIT \
         {QUERY_ROW_LIMIT}"
    )
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    records: Vec<CrmAccountRow>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmManager {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmAccountRow {
    #[serde(rename = "Type")]
    account_type: Option<String>,
    #[serde(rename = "Website")]
    website: Option<String>,
    #[serde(rename = "CS_Manager__r")]
    manager: Option<CrmManager>,
    #[serde(rename = "Family_MRR__c")]
    family_mrr: Option<f64>,
    #[serde(rename = "Chargify_MRR__c")]
    mrr: Option<f64>,
    #[serde(rename = "Platform__c")]
    platform: Option<String>,
    #[serde(rename = "Integration_Type__c")]
    integration: Option<String>,
    #[serde(rename = "Chargify_Source__c")]
    provider: Option<String>,
    #[serde(rename = "Tracking_Code__c")]
    tracking_code: Option<String>,
    #[serde(rename = "BillingCity")]
    city: Option<String>,
    #[serde(rename = "BillingState")]
    state: Option<String>,
}

impl CrmAccountRow {
    fn into_record(self) -> AccountRecord {
        let record_type = self.account_type.as_deref().map(RecordType::parse);
        let active = match record_type {
            Some(RecordType::Customer) => ActivityStatus::Active,
            _ => ActivityStatus::NotActive,
        };
        let (city, state) = match (self.city, self.state) {
            (Some(city), Some(state)) => (city, state),
            _ => (UNKNOWN.to_owned(), UNKNOWN.to_owned()),
        };

        AccountRecord {
            website: or_unknown(self.website),
            site_id: or_unknown(self.tracking_code),
            manager: or_unknown(self.manager.and_then(|manager| manager.name)),
            active,
            record_type,
            mrr: Revenue::from_optional(self.mrr),
            family_mrr: Revenue::from_optional(self.family_mrr),
            platform: or_unknown(self.platform),
            integration: or_unknown(self.integration),
            provider: or_unknown(self.provider),
            city,
            state,
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.filter(|value| !value.trim().is_empty()).unwrap_or_else(|| UNKNOWN.to_owned())
}
