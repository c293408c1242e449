use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use nebo_core::config::{AppConfig, ConfigError};
use nebo_core::sources::{AccountSource, SiteIndexSource};
use nebo_slack::commands::CommandRouter;
use nebo_upstream::{
    build_http_client, AnalyticsSettings, BoostAdminClient, CrmSettings, LegacyReportIndex,
    MetabaseSource, SalesforceSource, SiteIndexSettings,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::health;
use crate::service::{NeboService, Upstreams};
use crate::slash::{self, SlashState};

pub struct Application {
    pub config: AppConfig,
    pub router: Arc<CommandRouter<NeboService>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
pub async fn bootstrap(
    options: nebo_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let blanks = config.blank_required_fields();
    if !blanks.is_empty() {
        warn!(
            event_name = "system.bootstrap.blank_settings",
            correlation_id = "bootstrap",
            settings = %blanks.join(", "),
            "blank settings tolerated in dev mode; affected upstreams are disabled"
        );
    }

    let client = build_http_client(Duration::from_secs(config.upstream.timeout_secs))
        .map_err(BootstrapError::HttpClient)?;
    let upstreams = build_upstreams(&config, client);

    for (kind, configured) in upstreams.configured() {
        info!(
            event_name = "system.bootstrap.upstream",
            correlation_id = "bootstrap",
            upstream = %kind,
            configured,
            "upstream client initialized"
        );
    }

    let router = CommandRouter::new(NeboService::new(upstreams))
        .with_fire_doc_folder(config.docs.fire_doc_folder_id.clone());

    Ok(Application { config, router: Arc::new(router) })
}

/// Clients are only constructed for upstreams whose credentials are present.
pub fn build_upstreams(config: &AppConfig, client: reqwest::Client) -> Upstreams {
    Upstreams {
        analytics: AnalyticsSettings::from_config(&config.analytics).map(|settings| {
            Arc::new(MetabaseSource::new(client.clone(), settings)) as Arc<dyn AccountSource>
        }),
        crm: CrmSettings::from_config(&config.crm).map(|settings| {
            Arc::new(SalesforceSource::new(client.clone(), settings)) as Arc<dyn AccountSource>
        }),
        site_index: SiteIndexSettings::from_config(&config.site_index).map(|settings| {
            Arc::new(LegacyReportIndex::new(client.clone(), settings)) as Arc<dyn SiteIndexSource>
        }),
        search_admin: Arc::new(BoostAdminClient::new(client, config.search_admin.url.clone())),
    }
}

impl Application {
    pub fn http_router(&self) -> Router {
        let upstreams = self.router.service().upstreams().clone();
        Router::new().merge(health::router(upstreams)).merge(slash::router(SlashState::new(
            Arc::clone(&self.router),
            self.config.slack.verification_token.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use nebo_core::config::{ConfigOverrides, LoadOptions};
    use nebo_core::sources::SourceKind;

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_on_blank_settings_outside_dev_mode() {
        let result = bootstrap(LoadOptions {
            config_path: Some("/nonexistent/nebo.toml".into()),
            overrides: ConfigOverrides { dev_mode: Some(false), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        })
        .await;

        let message = match result {
            Err(error @ BootstrapError::Config(_)) => error.to_string(),
            Err(other) => panic!("unexpected bootstrap error: {other}"),
            Ok(_) => panic!("blank settings should fail outside dev mode"),
        };
        assert!(message.contains("slack.verification_token"));
    }

    #[tokio::test]
    async fn dev_mode_bootstrap_leaves_unconfigured_upstreams_out() {
        let app = bootstrap(LoadOptions {
            config_path: Some("/nonexistent/nebo.toml".into()),
            overrides: ConfigOverrides {
                dev_mode: Some(true),
                slack_verification_token: Some("verify".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("dev mode tolerates blanks");

        let configured = app.router.service().upstreams().configured();
        assert!(configured.contains(&(SourceKind::Crm, false)));
        assert!(configured.contains(&(SourceKind::Analytics, false)));
        assert!(configured.contains(&(SourceKind::SearchAdmin, true)));
    }
}
