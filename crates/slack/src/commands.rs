use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use nebo_core::errors::ApplicationError;
use nebo_core::normalize::PLATFORMS;

use crate::blocks::{self, MessageTemplate, ResponseType};
use crate::playbooks;

/// Form fields Slack posts for a slash command. Fields nebo never reads are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub token: String,
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: NeboCommand,
    pub slash_command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NeboCommand {
    AccountLookup { term: String },
    LegacySiteLookup { query: String },
    CrmLookup { query: String },
    Fire,
    FireDown,
    Meet { name: String },
    Boost(BoostAction),
    Help(HelpTopic),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopic {
    Nebo,
    Neboid,
    Fire,
    Meet,
    Boost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoostAction {
    Status { site_id: String },
    Exclusions { site_id: String },
    Restart { site_id: String },
}

impl BoostAction {
    pub fn site_id(&self) -> &str {
        match self {
            Self::Status { site_id } | Self::Exclusions { site_id } | Self::Restart { site_id } => {
                site_id
            }
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Exclusions { .. } => "exclusions",
            Self::Restart { .. } => "restart",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

pub fn normalize_command(payload: SlashCommandPayload) -> Result<CommandEnvelope, CommandParseError> {
    let command = parse_command(&payload.command, &payload.text)?;

    Ok(CommandEnvelope {
        command,
        slash_command: payload.command,
        text: payload.text.trim().to_owned(),
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        request_id: payload.request_id,
    })
}

pub fn parse_command(command: &str, text: &str) -> Result<NeboCommand, CommandParseError> {
    let text = text.trim();
    let wants_help = text == "help";
    let blank_or_help = wants_help || text.is_empty();

    let parsed = match command {
        "/nebo" | "/rep" | "/alpha-nebo" if blank_or_help => NeboCommand::Help(HelpTopic::Nebo),
        "/nebo" | "/rep" | "/alpha-nebo" => NeboCommand::AccountLookup { term: text.to_owned() },
        "/neboid" | "/neboidnx" | "/neboidss" if blank_or_help => {
            NeboCommand::Help(HelpTopic::Neboid)
        }
        "/neboid" | "/neboidnx" => NeboCommand::LegacySiteLookup { query: text.to_owned() },
        "/neboidss" => NeboCommand::CrmLookup { query: text.to_owned() },
        "/fire" if wants_help => NeboCommand::Help(HelpTopic::Fire),
        "/fire" => NeboCommand::Fire,
        "/firedown" => NeboCommand::FireDown,
        "/meet" if wants_help => NeboCommand::Help(HelpTopic::Meet),
        "/meet" => NeboCommand::Meet { name: text.to_owned() },
        "/boost" => parse_boost_action(text)
            .map(NeboCommand::Boost)
            .unwrap_or(NeboCommand::Help(HelpTopic::Boost)),
        other => return Err(CommandParseError::UnsupportedCommand(other.to_owned())),
    };

    Ok(parsed)
}

/// `<verb> <siteId>`, nothing more and nothing less.
pub fn parse_boost_action(text: &str) -> Option<BoostAction> {
    let args: Vec<&str> = text.split_whitespace().collect();
    let [verb, site_id] = args.as_slice() else {
        return None;
    };

    let site_id = (*site_id).to_owned();
    match *verb {
        "status" => Some(BoostAction::Status { site_id }),
        "exclusions" => Some(BoostAction::Exclusions { site_id }),
        "restart" => Some(BoostAction::Restart { site_id }),
        _ => None,
    }
}

pub fn help_message(topic: HelpTopic) -> MessageTemplate {
    match topic {
        HelpTopic::Nebo => blocks::nebo_help_message(&PLATFORMS),
        HelpTopic::Neboid => blocks::neboid_help_message(),
        HelpTopic::Fire => blocks::fire_help_message(),
        HelpTopic::Meet => blocks::meet_help_message(),
        HelpTopic::Boost => blocks::boost_help_message(),
    }
}

pub struct CommandRouter<S> {
    service: S,
    fire_doc_folder_id: String,
}

impl<S> CommandRouter<S>
where
    S: NeboCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service, fire_doc_folder_id: String::new() }
    }

    pub fn with_fire_doc_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.fire_doc_folder_id = folder_id.into();
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        debug!(
            event_name = "slack.command.routed",
            correlation_id = %envelope.request_id,
            command = %envelope.slash_command,
            "routing slash command"
        );

        match &envelope.command {
            NeboCommand::AccountLookup { term } => {
                self.service.lookup_accounts(term, &envelope).await
            }
            NeboCommand::LegacySiteLookup { query } => {
                self.service.lookup_legacy_sites(query, &envelope).await
            }
            NeboCommand::CrmLookup { query } => {
                self.service.lookup_crm_accounts(query, &envelope).await
            }
            NeboCommand::Boost(action) => self.service.boost(action, &envelope).await,
            NeboCommand::Fire => Ok(blocks::text_message(
                ResponseType::InChannel,
                playbooks::fire_checklist(&self.fire_doc_folder_id, Utc::now()),
            )),
            NeboCommand::FireDown => Ok(blocks::text_message(
                ResponseType::InChannel,
                playbooks::firedown_checklist(),
            )),
            NeboCommand::Meet { name } => {
                Ok(blocks::text_message(ResponseType::InChannel, playbooks::meet_link(name)))
            }
            NeboCommand::Help(topic) => Ok(help_message(*topic)),
        }
    }
}

/// Commands that need an upstream. Everything else the router answers itself.
#[async_trait]
pub trait NeboCommandService: Send + Sync {
    async fn lookup_accounts(
        &self,
        term: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn lookup_legacy_sites(
        &self,
        query: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn lookup_crm_accounts(
        &self,
        query: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn boost(
        &self,
        action: &BoostAction,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

#[derive(Default)]
pub struct NoopNeboCommandService;

#[async_trait]
impl NeboCommandService for NoopNeboCommandService {
    async fn lookup_accounts(
        &self,
        term: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::account_results_message(term, &[]))
    }

    async fn lookup_legacy_sites(
        &self,
        _query: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::legacy_sites_message(&[]))
    }

    async fn lookup_crm_accounts(
        &self,
        query: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::account_results_message(query, &[]))
    }

    async fn boost(
        &self,
        action: &BoostAction,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::text_message(
            ResponseType::InChannel,
            format!("boost {} requested for {}", action.verb(), action.site_id()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use nebo_core::errors::ApplicationError;
    use nebo_core::sources::{SourceError, SourceKind};

    use super::{
        normalize_command, parse_boost_action, parse_command, BoostAction, CommandEnvelope,
        CommandParseError, CommandRouteError, CommandRouter, HelpTopic, NeboCommand,
        NeboCommandService, NoopNeboCommandService, SlashCommandPayload,
    };
    use crate::blocks::{MessageTemplate, ResponseType};

    fn envelope(command: &str, text: &str) -> CommandEnvelope {
        normalize_command(SlashCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            request_id: "req-1".to_owned(),
            ..SlashCommandPayload::default()
        })
        .expect("supported command")
    }

    #[test]
    fn lookup_aliases_share_one_command() {
        for alias in ["/nebo", "/rep", "/alpha-nebo"] {
            assert_eq!(
                parse_command(alias, "  shoes "),
                Ok(NeboCommand::AccountLookup { term: "shoes".to_owned() })
            );
            assert_eq!(parse_command(alias, ""), Ok(NeboCommand::Help(HelpTopic::Nebo)));
            assert_eq!(parse_command(alias, " help "), Ok(NeboCommand::Help(HelpTopic::Nebo)));
        }
    }

    #[test]
    fn id_lookups_pick_their_source() {
        assert_eq!(
            parse_command("/neboidnx", "ee33"),
            Ok(NeboCommand::LegacySiteLookup { query: "ee33".to_owned() })
        );
        assert_eq!(
            parse_command("/neboid", "ee33"),
            Ok(NeboCommand::LegacySiteLookup { query: "ee33".to_owned() })
        );
        assert_eq!(
            parse_command("/neboidss", "q8q4"),
            Ok(NeboCommand::CrmLookup { query: "q8q4".to_owned() })
        );
        assert_eq!(parse_command("/neboidss", ""), Ok(NeboCommand::Help(HelpTopic::Neboid)));
    }

    #[test]
    fn fire_and_meet_only_show_help_when_asked() {
        assert_eq!(parse_command("/fire", ""), Ok(NeboCommand::Fire));
        assert_eq!(parse_command("/fire", "help"), Ok(NeboCommand::Help(HelpTopic::Fire)));
        assert_eq!(parse_command("/firedown", "help"), Ok(NeboCommand::FireDown));
        assert_eq!(parse_command("/meet", ""), Ok(NeboCommand::Meet { name: String::new() }));
        assert_eq!(parse_command("/meet", "help"), Ok(NeboCommand::Help(HelpTopic::Meet)));
    }

    #[test]
    fn boost_requires_a_verb_and_a_site() {
        assert_eq!(
            parse_boost_action("status q8q4eu"),
            Some(BoostAction::Status { site_id: "q8q4eu".to_owned() })
        );
        assert_eq!(
            parse_boost_action("restart q8q4eu"),
            Some(BoostAction::Restart { site_id: "q8q4eu".to_owned() })
        );
        assert_eq!(parse_boost_action("status"), None);
        assert_eq!(parse_boost_action("status a b"), None);
        assert_eq!(parse_boost_action("pause q8q4eu"), None);
        assert_eq!(parse_command("/boost", "help"), Ok(NeboCommand::Help(HelpTopic::Boost)));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert_eq!(
            parse_command("/quote", "new"),
            Err(CommandParseError::UnsupportedCommand("/quote".to_owned()))
        );
    }

    #[tokio::test]
    async fn router_answers_playbooks_without_the_service() {
        let router = CommandRouter::new(NoopNeboCommandService).with_fire_doc_folder("folder-1");

        let fire = router.route(envelope("/fire", "")).await.expect("fire");
        assert_eq!(fire.response_type, ResponseType::InChannel);
        assert!(fire.text.contains("drive/folders/folder-1>"));

        let meet = router.route(envelope("/meet", "war room")).await.expect("meet");
        assert_eq!(meet.text, "g.co/meet/war-room");

        let help = router.route(envelope("/boost", "")).await.expect("boost help");
        assert_eq!(help.response_type, ResponseType::Ephemeral);
        assert!(help.text.contains("`/boost status <siteId>`"));
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NeboCommandService for RecordingService {
        async fn lookup_accounts(
            &self,
            term: &str,
            envelope: &CommandEnvelope,
        ) -> Result<MessageTemplate, CommandRouteError> {
            self.calls.lock().expect("calls lock").push(format!("accounts:{term}"));
            NoopNeboCommandService.lookup_accounts(term, envelope).await
        }

        async fn lookup_legacy_sites(
            &self,
            query: &str,
            _envelope: &CommandEnvelope,
        ) -> Result<MessageTemplate, CommandRouteError> {
            self.calls.lock().expect("calls lock").push(format!("legacy:{query}"));
            Err(ApplicationError::from(SourceError::NotConfigured(SourceKind::SiteIndex)).into())
        }

        async fn lookup_crm_accounts(
            &self,
            query: &str,
            envelope: &CommandEnvelope,
        ) -> Result<MessageTemplate, CommandRouteError> {
            self.calls.lock().expect("calls lock").push(format!("crm:{query}"));
            NoopNeboCommandService.lookup_crm_accounts(query, envelope).await
        }

        async fn boost(
            &self,
            action: &BoostAction,
            envelope: &CommandEnvelope,
        ) -> Result<MessageTemplate, CommandRouteError> {
            self.calls.lock().expect("calls lock").push(format!("boost:{}", action.verb()));
            NoopNeboCommandService.boost(action, envelope).await
        }
    }

    #[tokio::test]
    async fn router_delegates_upstream_commands() {
        let router = CommandRouter::new(RecordingService::default());

        let accounts = router.route(envelope("/rep", "shoes")).await.expect("accounts");
        assert_eq!(accounts.text, "No results for: shoes");
        router.route(envelope("/neboidss", "q8q4")).await.expect("crm");
        router.route(envelope("/boost", "exclusions q8q4eu")).await.expect("boost");
        let legacy = router.route(envelope("/neboid", "ee33")).await;

        assert_eq!(
            legacy,
            Err(CommandRouteError::Application(ApplicationError::Source(
                SourceError::NotConfigured(SourceKind::SiteIndex)
            )))
        );
        assert_eq!(
            *router.service().calls.lock().expect("calls lock"),
            vec!["accounts:shoes", "crm:q8q4", "boost:exclusions", "legacy:ee33"]
        );
    }

    #[tokio::test]
    async fn help_text_never_reaches_the_service() {
        let router = CommandRouter::new(RecordingService::default());

        let help = router.route(envelope("/nebo", "help")).await.expect("help");

        assert!(help.text.starts_with("Nebo usage:"));
        assert!(router.service().calls.lock().expect("calls lock").is_empty());
    }
}
