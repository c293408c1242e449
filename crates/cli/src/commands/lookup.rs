use std::sync::Arc;
use std::time::Duration;

use nebo_core::config::{AppConfig, LoadOptions};
use nebo_core::domain::account::{AccountRecord, UNKNOWN};
use nebo_core::lookup::{AccountLookup, LookupOutcome};
use nebo_core::sources::AccountSource;
use nebo_upstream::{
    build_http_client, AnalyticsSettings, CrmSettings, MetabaseSource, SalesforceSource,
};

use crate::commands::CommandResult;

pub fn run(term: &str, crm_only: bool) -> CommandResult {
    let term = term.trim();
    if term.is_empty() {
        return CommandResult::failure("lookup", "invalid_term", "search term must not be blank", 2);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let crm_settings = CrmSettings::from_config(&config.crm);
    let analytics_settings = AnalyticsSettings::from_config(&config.analytics);
    let mut missing = Vec::new();
    if crm_settings.is_none() {
        missing.push("crm");
    }
    if analytics_settings.is_none() && !crm_only {
        missing.push("analytics");
    }
    let crm_settings = match crm_settings {
        Some(settings) if missing.is_empty() => settings,
        _ => {
            return CommandResult::failure(
                "lookup",
                "missing_credentials",
                format!("missing required credentials for {}", missing.join(", ")),
                3,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let client = match build_http_client(Duration::from_secs(config.upstream.timeout_secs)) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "http_client",
                format!("failed to build http client: {error}"),
                5,
            );
        }
    };

    let crm: Arc<dyn AccountSource> = Arc::new(SalesforceSource::new(client.clone(), crm_settings));
    let analytics: Arc<dyn AccountSource> = match analytics_settings {
        Some(settings) => Arc::new(MetabaseSource::new(client, settings)),
        // `search_crm` never touches analytics; the crm client fills the slot.
        None => Arc::clone(&crm),
    };
    let lookup = AccountLookup::new(analytics, crm);

    let outcome = runtime.block_on(async {
        if crm_only {
            lookup.search_crm(term).await
        } else {
            lookup.search(term).await
        }
    });

    if crm_only {
        if let Some(failure) = outcome.failures.first() {
            return CommandResult::failure("lookup", "upstream", failure.error.to_string(), 6);
        }
    }

    CommandResult::success("lookup", summarize(term, &outcome))
}

fn summarize(term: &str, outcome: &LookupOutcome) -> String {
    let mut lines = Vec::with_capacity(outcome.records.len() + outcome.failures.len() + 1);
    if outcome.records.is_empty() {
        lines.push(format!("no results for `{term}`"));
    } else {
        lines.push(format!("{} result(s) for `{term}`", outcome.records.len()));
    }

    lines.extend(outcome.records.iter().map(render_record));
    lines.extend(outcome.failures.iter().map(|failure| {
        format!("degraded: {} unavailable ({})", failure.source, failure.error)
    }));

    lines.join("\n")
}

fn render_record(record: &AccountRecord) -> String {
    let mrr = record.mrr.amount().map(|amount| amount.to_string());
    format!(
        "{} [{}] rep={} mrr={} platform={}",
        record.website,
        record.site_id,
        record.manager,
        mrr.as_deref().unwrap_or(UNKNOWN),
        record.platform
    )
}
