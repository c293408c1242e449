//! Slack surface for nebo.
//!
//! - **Slash commands** (`commands`): payload parsing and routing for `/nebo`,
//!   `/neboid`, `/neboidss`, `/fire`, `/firedown`, `/meet` and `/boost`
//! - **Messages** (`blocks`): response builders with legacy attachments
//! - **Playbooks** (`playbooks`): fire checklists and meet links
//!
//! Commands that need an upstream go through [`commands::NeboCommandService`];
//! the router answers help text and playbooks itself.

pub mod blocks;
pub mod commands;
pub mod playbooks;

pub use blocks::{Attachment, MessageBuilder, MessageTemplate, ResponseType};
pub use commands::{
    normalize_command, parse_command, BoostAction, CommandEnvelope, CommandParseError,
    CommandRouteError, CommandRouter, HelpTopic, NeboCommand, NeboCommandService,
    SlashCommandPayload,
};
