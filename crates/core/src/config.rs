use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ANALYTICS_URL: &str = "https://metabase.kube.searchspring.io";
pub const DEFAULT_SITE_INDEX_URL: &str =
    "https://client-report.nxtpd.com/api/data-table.php?table=accounts";
pub const DEFAULT_SEARCH_ADMIN_URL: &str = "https://boostadmin.azurewebsites.net";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub crm: CrmConfig,
    pub analytics: AnalyticsConfig,
    pub site_index: SiteIndexConfig,
    pub search_admin: SearchAdminConfig,
    pub docs: DocsConfig,
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub dev_mode: bool,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub verification_token: SecretString,
    pub oauth_token: SecretString,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub url: String,
    pub user: String,
    pub password: SecretString,
    pub security_token: SecretString,
    pub client_id: String,
    pub client_secret: SecretString,
    pub api_version: String,
}

#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub url: String,
    pub user: String,
    pub password: SecretString,
    pub database_id: u32,
    pub provider_label: String,
}

#[derive(Clone, Debug)]
pub struct SiteIndexConfig {
    pub url: String,
    pub user: String,
    pub password: SecretString,
}

#[derive(Clone, Debug)]
pub struct SearchAdminConfig {
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct DocsConfig {
    pub fire_doc_folder_id: String,
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub dev_mode: Option<bool>,
    pub server_port: Option<u16>,
    pub upstream_timeout_secs: Option<u64>,
    pub slack_verification_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("the following settings are blank: {}", .0.join(", "))]
    BlankSettings(Vec<&'static str>),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                verification_token: String::new().into(),
                oauth_token: String::new().into(),
            },
            crm: CrmConfig {
                url: String::new(),
                user: String::new(),
                password: String::new().into(),
                security_token: String::new().into(),
                client_id: String::new(),
                client_secret: String::new().into(),
                api_version: "v52.0".to_string(),
            },
            analytics: AnalyticsConfig {
                url: DEFAULT_ANALYTICS_URL.to_string(),
                user: String::new(),
                password: String::new().into(),
                database_id: 5,
                provider_label: "Searchspring".to_string(),
            },
            site_index: SiteIndexConfig {
                url: DEFAULT_SITE_INDEX_URL.to_string(),
                user: String::new(),
                password: String::new().into(),
            },
            search_admin: SearchAdminConfig { url: DEFAULT_SEARCH_ADMIN_URL.to_string() },
            docs: DocsConfig { fire_doc_folder_id: String::new() },
            upstream: UpstreamConfig { timeout_secs: 10 },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            dev_mode: false,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl CrmConfig {
    pub fn is_configured(&self) -> bool {
        !is_blank(&self.url)
            && !is_blank(&self.user)
            && !is_blank(self.password.expose_secret())
            && !is_blank(&self.client_id)
            && !is_blank(self.client_secret.expose_secret())
    }
}

impl AnalyticsConfig {
    pub fn is_configured(&self) -> bool {
        !is_blank(&self.url) && !is_blank(&self.user) && !is_blank(self.password.expose_secret())
    }
}

impl SiteIndexConfig {
    pub fn is_configured(&self) -> bool {
        !is_blank(&self.url) && !is_blank(&self.user) && !is_blank(self.password.expose_secret())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("nebo.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Names of required settings that are empty, in a fixed order.
    pub fn blank_required_fields(&self) -> Vec<&'static str> {
        let required: [(&'static str, &str); 14] = [
            ("slack.verification_token", self.slack.verification_token.expose_secret()),
            ("slack.oauth_token", self.slack.oauth_token.expose_secret()),
            ("crm.url", self.crm.url.as_str()),
            ("crm.user", self.crm.user.as_str()),
            ("crm.password", self.crm.password.expose_secret()),
            ("crm.security_token", self.crm.security_token.expose_secret()),
            ("crm.client_id", self.crm.client_id.as_str()),
            ("crm.client_secret", self.crm.client_secret.expose_secret()),
            ("analytics.url", self.analytics.url.as_str()),
            ("analytics.user", self.analytics.user.as_str()),
            ("analytics.password", self.analytics.password.expose_secret()),
            ("site_index.user", self.site_index.user.as_str()),
            ("site_index.password", self.site_index.password.expose_secret()),
            ("docs.fire_doc_folder_id", self.docs.fire_doc_folder_id.as_str()),
        ];

        required.iter().filter(|(_, value)| is_blank(value)).map(|(name, _)| *name).collect()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(dev_mode) = patch.dev_mode {
            self.dev_mode = dev_mode.enabled();
        }

        if let Some(slack) = patch.slack {
            if let Some(verification_token) = slack.verification_token {
                self.slack.verification_token = secret_value(verification_token);
            }
            if let Some(oauth_token) = slack.oauth_token {
                self.slack.oauth_token = secret_value(oauth_token);
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(url) = crm.url {
                self.crm.url = url;
            }
            if let Some(user) = crm.user {
                self.crm.user = user;
            }
            if let Some(password) = crm.password {
                self.crm.password = secret_value(password);
            }
            if let Some(security_token) = crm.security_token {
                self.crm.security_token = secret_value(security_token);
            }
            if let Some(client_id) = crm.client_id {
                self.crm.client_id = client_id;
            }
            if let Some(client_secret) = crm.client_secret {
                self.crm.client_secret = secret_value(client_secret);
            }
            if let Some(api_version) = crm.api_version {
                self.crm.api_version = api_version;
            }
        }

        if let Some(analytics) = patch.analytics {
            if let Some(url) = analytics.url {
                self.analytics.url = url;
            }
            if let Some(user) = analytics.user {
                self.analytics.user = user;
            }
            if let Some(password) = analytics.password {
                self.analytics.password = secret_value(password);
            }
            if let Some(database_id) = analytics.database_id {
                self.analytics.database_id = database_id;
            }
            if let Some(provider_label) = analytics.provider_label {
                self.analytics.provider_label = provider_label;
            }
        }

        if let Some(site_index) = patch.site_index {
            if let Some(url) = site_index.url {
                self.site_index.url = url;
            }
            if let Some(user) = site_index.user {
                self.site_index.user = user;
            }
            if let Some(password) = site_index.password {
                self.site_index.password = secret_value(password);
            }
        }

        if let Some(url) = patch.search_admin.and_then(|search_admin| search_admin.url) {
            self.search_admin.url = url;
        }

        if let Some(folder_id) = patch.docs.and_then(|docs| docs.fire_doc_folder_id) {
            self.docs.fire_doc_folder_id = folder_id;
        }

        if let Some(timeout_secs) = patch.upstream.and_then(|upstream| upstream.timeout_secs) {
            self.upstream.timeout_secs = timeout_secs;
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("NEBO_DEV_MODE") {
            self.dev_mode = parse_dev_mode("NEBO_DEV_MODE", &value)?;
        }

        if let Some(value) = read_env("NEBO_SLACK_VERIFICATION_TOKEN") {
            self.slack.verification_token = secret_value(value);
        }
        if let Some(value) = read_env("NEBO_SLACK_OAUTH_TOKEN") {
            self.slack.oauth_token = secret_value(value);
        }

        if let Some(value) = read_env("NEBO_CRM_URL") {
            self.crm.url = value;
        }
        if let Some(value) = read_env("NEBO_CRM_USER") {
            self.crm.user = value;
        }
        if let Some(value) = read_env("NEBO_CRM_PASSWORD") {
            self.crm.password = secret_value(value);
        }
        if let Some(value) = read_env("NEBO_CRM_SECURITY_TOKEN") {
            self.crm.security_token = secret_value(value);
        }
        if let Some(value) = read_env("NEBO_CRM_CLIENT_ID") {
            self.crm.client_id = value;
        }
        if let Some(value) = read_env("NEBO_CRM_CLIENT_SECRET") {
            self.crm.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("NEBO_CRM_API_VERSION") {
            self.crm.api_version = value;
        }

        if let Some(value) = read_env("NEBO_ANALYTICS_URL") {
            self.analytics.url = value;
        }
        if let Some(value) = read_env("NEBO_ANALYTICS_USER") {
            self.analytics.user = value;
        }
        if let Some(value) = read_env("NEBO_ANALYTICS_PASSWORD") {
            self.analytics.password = secret_value(value);
        }
        if let Some(value) = read_env("NEBO_ANALYTICS_DATABASE_ID") {
            self.analytics.database_id = parse_u32("NEBO_ANALYTICS_DATABASE_ID", &value)?;
        }
        if let Some(value) = read_env("NEBO_ANALYTICS_PROVIDER_LABEL") {
            self.analytics.provider_label = value;
        }

        if let Some(value) = read_env("NEBO_SITE_INDEX_URL") {
            self.site_index.url = value;
        }
        if let Some(value) = read_env("NEBO_SITE_INDEX_USER") {
            self.site_index.user = value;
        }
        if let Some(value) = read_env("NEBO_SITE_INDEX_PASSWORD") {
            self.site_index.password = secret_value(value);
        }

        if let Some(value) = read_env("NEBO_SEARCH_ADMIN_URL") {
            self.search_admin.url = value;
        }
        if let Some(value) = read_env("NEBO_DOCS_FIRE_DOC_FOLDER_ID") {
            self.docs.fire_doc_folder_id = value;
        }
        if let Some(value) = read_env("NEBO_UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse_u64("NEBO_UPSTREAM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("NEBO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("NEBO_SERVER_PORT") {
            self.server.port = parse_u16("NEBO_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("NEBO_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("NEBO_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("NEBO_LOGGING_LEVEL").or_else(|| read_env("NEBO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("NEBO_LOGGING_FORMAT").or_else(|| read_env("NEBO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(dev_mode) = overrides.dev_mode {
            self.dev_mode = dev_mode;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(timeout_secs) = overrides.upstream_timeout_secs {
            self.upstream.timeout_secs = timeout_secs;
        }
        if let Some(verification_token) = overrides.slack_verification_token {
            self.slack.verification_token = secret_value(verification_token);
        }
    }

    /// Blank required settings only fail outside dev mode; range checks always apply.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blanks = self.blank_required_fields();
        if !blanks.is_empty() && !self.dev_mode {
            return Err(ConfigError::BlankSettings(blanks));
        }

        validate_urls(self)?;
        validate_upstream(&self.upstream)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("nebo.toml"), PathBuf::from("config/nebo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_urls(config: &AppConfig) -> Result<(), ConfigError> {
    let urls = [
        ("crm.url", config.crm.url.as_str()),
        ("analytics.url", config.analytics.url.as_str()),
        ("site_index.url", config.site_index.url.as_str()),
        ("search_admin.url", config.search_admin.url.as_str()),
    ];

    for (name, url) in urls {
        if !is_blank(url) && !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{name} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_upstream(upstream: &UpstreamConfig) -> Result<(), ConfigError> {
    if upstream.timeout_secs == 0 || upstream.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "upstream.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_dev_mode(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "development" | "true" | "1" => Ok(true),
        "production" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    dev_mode: Option<DevModePatch>,
    slack: Option<SlackPatch>,
    crm: Option<CrmPatch>,
    analytics: Option<AnalyticsPatch>,
    site_index: Option<SiteIndexPatch>,
    search_admin: Option<SearchAdminPatch>,
    docs: Option<DocsPatch>,
    upstream: Option<UpstreamPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

/// `dev_mode = true` or `dev_mode = "development"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DevModePatch {
    Flag(bool),
    Label(String),
}

impl DevModePatch {
    fn enabled(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Label(label) => label.trim().eq_ignore_ascii_case("development"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    verification_token: Option<String>,
    oauth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    security_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    api_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyticsPatch {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    database_id: Option<u32>,
    provider_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SiteIndexPatch {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchAdminPatch {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DocsPatch {
    fire_doc_folder_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UpstreamPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn dev_mode() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides { dev_mode: Some(true), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        }
    }

    const COMPLETE_FILE: &str = r#"
[slack]
verification_token = "verify-from-file"
oauth_token = "xoxb-from-file"

[crm]
url = "https://example.my.salesforce.com"
user = "nebo@example.com"
password = "crm-password"
security_token = "crm-token"
client_id = "client-id"
client_secret = "client-secret"

[analytics]
user = "metabase@example.com"
password = "metabase-password"

[site_index]
user = "report"
password = "report-password"

[docs]
fire_doc_folder_id = "folder-123"
"#;

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_NEBO_VERIFICATION_TOKEN", "verify-from-env");
        env::set_var("TEST_NEBO_CRM_PASSWORD", "crm-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("nebo.toml");
            fs::write(
                &path,
                r#"
dev_mode = "development"

[slack]
verification_token = "${TEST_NEBO_VERIFICATION_TOKEN}"

[crm]
password = "${TEST_NEBO_CRM_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.dev_mode, "dev_mode label should enable dev mode")?;
            ensure(
                config.slack.verification_token.expose_secret() == "verify-from-env",
                "verification token should be loaded from environment",
            )?;
            ensure(
                config.crm.password.expose_secret() == "crm-from-env",
                "crm password should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_NEBO_VERIFICATION_TOKEN", "TEST_NEBO_CRM_PASSWORD"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_LOG_LEVEL", "warn");
        env::set_var("NEBO_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config =
                AppConfig::load(dev_mode()).map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["NEBO_LOG_LEVEL", "NEBO_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_SLACK_VERIFICATION_TOKEN", "verify-from-env");
        env::set_var("NEBO_SERVER_PORT", "9090");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("nebo.toml");
            let contents = format!(
                "{COMPLETE_FILE}\n[server]\nport = 7070\n\n[upstream]\ntimeout_secs = 30\n\n[logging]\nlevel = \"warn\"\n"
            );
            fs::write(&path, contents).map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    upstream_timeout_secs: Some(5),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.upstream.timeout_secs == 5, "override timeout should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 9090, "env port should win over file")?;
            ensure(
                config.slack.verification_token.expose_secret() == "verify-from-env",
                "env verification token should win over file and defaults",
            )?;
            ensure(config.analytics.database_id == 5, "analytics database id defaults to 5")?;
            ensure(config.crm.api_version == "v52.0", "crm api version has a default")?;
            ensure(!config.dev_mode, "dev mode defaults to off")?;
            Ok(())
        })();

        clear_vars(&["NEBO_SLACK_VERIFICATION_TOKEN", "NEBO_SERVER_PORT"]);
        result
    }

    #[test]
    fn blank_settings_fail_outside_dev_mode() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_SLACK_VERIFICATION_TOKEN", "verify");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let blanks = match error {
                ConfigError::BlankSettings(blanks) => blanks,
                other => return Err(format!("unexpected error: {other}")),
            };
            ensure(blanks.contains(&"crm.url"), "blank list should name crm.url")?;
            ensure(
                !blanks.contains(&"slack.verification_token"),
                "configured settings should not be listed",
            )?;
            ensure(
                !blanks.contains(&"analytics.url"),
                "analytics url has a default and should not be listed",
            )
        })();

        clear_vars(&["NEBO_SLACK_VERIFICATION_TOKEN"]);
        result
    }

    #[test]
    fn dev_mode_tolerates_blanks_but_reports_them() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_DEV_MODE", "development");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.dev_mode, "NEBO_DEV_MODE=development should enable dev mode")?;
            ensure(
                config.blank_required_fields().len() == 13,
                "every required setting without a default should be reported",
            )?;
            ensure(!config.crm.is_configured(), "crm should not be configured")
        })();

        clear_vars(&["NEBO_DEV_MODE"]);
        result
    }

    #[test]
    fn complete_file_passes_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("nebo.toml");
        fs::write(&path, COMPLETE_FILE).map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.blank_required_fields().is_empty(), "no blanks expected")?;
        ensure(config.crm.is_configured(), "crm should be configured")?;
        ensure(config.analytics.is_configured(), "analytics should be configured")?;
        ensure(config.site_index.is_configured(), "site index should be configured")
    }

    #[test]
    fn range_checks_apply_in_dev_mode() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_UPSTREAM_TIMEOUT_SECS", "500");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(dev_mode()) {
                Ok(_) => return Err("expected timeout validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("upstream.timeout_secs")
            );
            ensure(has_message, "validation failure should mention upstream.timeout_secs")
        })();

        clear_vars(&["NEBO_UPSTREAM_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn invalid_dev_mode_value_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_DEV_MODE", "sometimes");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) if key == "NEBO_DEV_MODE" => Ok(()),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override".to_string()),
        };

        clear_vars(&["NEBO_DEV_MODE"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NEBO_SLACK_VERIFICATION_TOKEN", "verify-secret-value");
        env::set_var("NEBO_CRM_PASSWORD", "crm-secret-value");

        let result = (|| -> Result<(), String> {
            let config =
                AppConfig::load(dev_mode()).map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("verify-secret-value"),
                "debug output should not contain the verification token",
            )?;
            ensure(
                !debug.contains("crm-secret-value"),
                "debug output should not contain the crm password",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["NEBO_SLACK_VERIFICATION_TOKEN", "NEBO_CRM_PASSWORD"]);
        result
    }
}
