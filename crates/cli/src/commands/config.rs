use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nebo_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<(&str, String, Option<&str>)> = vec![
        ("dev_mode", config.dev_mode.to_string(), Some("NEBO_DEV_MODE")),
        (
            "slack.verification_token",
            redact_secret(&config.slack.verification_token),
            Some("NEBO_SLACK_VERIFICATION_TOKEN"),
        ),
        ("slack.oauth_token", redact_secret(&config.slack.oauth_token), Some("NEBO_SLACK_OAUTH_TOKEN")),
        ("crm.url", or_unset(&config.crm.url), Some("NEBO_CRM_URL")),
        ("crm.user", or_unset(&config.crm.user), Some("NEBO_CRM_USER")),
        ("crm.password", redact_secret(&config.crm.password), Some("NEBO_CRM_PASSWORD")),
        (
            "crm.security_token",
            redact_secret(&config.crm.security_token),
            Some("NEBO_CRM_SECURITY_TOKEN"),
        ),
        ("crm.client_id", or_unset(&config.crm.client_id), Some("NEBO_CRM_CLIENT_ID")),
        (
            "crm.client_secret",
            redact_secret(&config.crm.client_secret),
            Some("NEBO_CRM_CLIENT_SECRET"),
        ),
        ("crm.api_version", config.crm.api_version.clone(), Some("NEBO_CRM_API_VERSION")),
        ("analytics.url", or_unset(&config.analytics.url), Some("NEBO_ANALYTICS_URL")),
        ("analytics.user", or_unset(&config.analytics.user), Some("NEBO_ANALYTICS_USER")),
        (
            "analytics.password",
            redact_secret(&config.analytics.password),
            Some("NEBO_ANALYTICS_PASSWORD"),
        ),
        (
            "analytics.database_id",
            config.analytics.database_id.to_string(),
            Some("NEBO_ANALYTICS_DATABASE_ID"),
        ),
        (
            "analytics.provider_label",
            config.analytics.provider_label.clone(),
            Some("NEBO_ANALYTICS_PROVIDER_LABEL"),
        ),
        ("site_index.url", or_unset(&config.site_index.url), Some("NEBO_SITE_INDEX_URL")),
        ("site_index.user", or_unset(&config.site_index.user), Some("NEBO_SITE_INDEX_USER")),
        (
            "site_index.password",
            redact_secret(&config.site_index.password),
            Some("NEBO_SITE_INDEX_PASSWORD"),
        ),
        ("search_admin.url", config.search_admin.url.clone(), Some("NEBO_SEARCH_ADMIN_URL")),
        (
            "docs.fire_doc_folder_id",
            or_unset(&config.docs.fire_doc_folder_id),
            Some("NEBO_DOCS_FIRE_DOC_FOLDER_ID"),
        ),
        (
            "upstream.timeout_secs",
            config.upstream.timeout_secs.to_string(),
            Some("NEBO_UPSTREAM_TIMEOUT_SECS"),
        ),
        ("server.bind_address", config.server.bind_address.clone(), Some("NEBO_SERVER_BIND_ADDRESS")),
        ("server.port", config.server.port.to_string(), Some("NEBO_SERVER_PORT")),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            Some("NEBO_SERVER_GRACEFUL_SHUTDOWN_SECS"),
        ),
        ("logging.level", config.logging.level.clone(), Some("NEBO_LOGGING_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("NEBO_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    let blanks = config.blank_required_fields();
    if !blanks.is_empty() {
        lines.push(format!("blank settings tolerated in dev mode: {}", blanks.join(", ")));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("nebo.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/nebo.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_secret(secret: &SecretString) -> String {
    if secret.expose_secret().trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
