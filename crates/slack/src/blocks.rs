use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use nebo_core::domain::account::{AccountRecord, Revenue, UNKNOWN};
use nebo_core::domain::legacy_site::LegacySite;
use nebo_core::sources::SiteReport;

pub const BRAND_COLOR: &str = "#3A23AD";
pub const UNASSIGNED_COLOR: &str = "#FF0000";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    InChannel,
    Ephemeral,
}

/// Legacy message attachment; Slack still renders these as a colored bar with
/// an author line above the body text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author_name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub response_type: ResponseType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

pub struct MessageBuilder {
    response_type: ResponseType,
    text: String,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self { response_type: ResponseType::InChannel, text: text.into(), attachments: Vec::new() }
    }

    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self { response_type: ResponseType::Ephemeral, text: text.into(), attachments: Vec::new() }
    }

    pub fn attachment<F>(mut self, color: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut AttachmentBuilder),
    {
        let mut builder = AttachmentBuilder::default();
        build(&mut builder);
        self.attachments.push(builder.build(color.into()));
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            response_type: self.response_type,
            text: self.text,
            attachments: self.attachments,
        }
    }
}

#[derive(Default)]
pub struct AttachmentBuilder {
    author_name: String,
    lines: Vec<String>,
}

impl AttachmentBuilder {
    pub fn author(&mut self, author_name: impl Into<String>) -> &mut Self {
        self.author_name = author_name.into();
        self
    }

    pub fn field(&mut self, label: &str, value: impl AsRef<str>) -> &mut Self {
        self.lines.push(format!("{label}: {}", value.as_ref()));
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    fn build(self, color: String) -> Attachment {
        Attachment { color, author_name: self.author_name, text: self.lines.join("\n") }
    }
}

/// Dollar amount with thousands separators, or `unknown` for the sentinel.
pub fn format_revenue(revenue: Revenue) -> String {
    match revenue.amount() {
        Some(amount) => format_dollars(amount),
        None => UNKNOWN.to_owned(),
    }
}

fn format_dollars(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn location(record: &AccountRecord) -> String {
    if record.state == UNKNOWN {
        record.city.clone()
    } else {
        format!("{}, {}", record.city, record.state)
    }
}

pub fn account_results_message(term: &str, records: &[AccountRecord]) -> MessageTemplate {
    let text = if records.is_empty() {
        format!("No results for: {term}")
    } else {
        format!("Reps for search: {term}")
    };

    records.iter().fold(MessageBuilder::in_channel(text), |message, record| {
        let color = if record.manager == UNKNOWN { UNASSIGNED_COLOR } else { BRAND_COLOR };
        message.attachment(color, |attachment| {
            attachment
                .author(format!(
                    "{} ({}) (SiteId: {})",
                    record.website, record.active, record.site_id
                ))
                .field("Rep", &record.manager)
                .field(
                    "MRR",
                    format!(
                        "{} (Family MRR: {})",
                        format_revenue(record.mrr),
                        format_revenue(record.family_mrr)
                    ),
                )
                .field("Platform", &record.platform)
                .field("Integration", &record.integration)
                .field("Provider", &record.provider)
                .field("Location", location(record));
        })
    })
    .build()
}

pub fn legacy_sites_message(sites: &[LegacySite]) -> MessageTemplate {
    let text = if sites.is_empty() { "No Matches :(" } else { "matches" };

    sites
        .iter()
        .fold(MessageBuilder::in_channel(text), |message, site| {
            message.attachment(BRAND_COLOR, |attachment| {
                attachment
                    .author(&site.name)
                    .field("URL", &site.url)
                    .field("ID 1", &site.primary_id)
                    .field("ID 2", &site.secondary_id)
                    .field("Type", &site.plan)
                    .line(format!("Version: {}, System: {}", site.version, site.system));
            })
        })
        .build()
}

/// Renders a search admin report as a fenced `key: value` block.
pub fn site_report_message(report: &SiteReport) -> MessageTemplate {
    let mut text = String::from("```");
    for (key, value) in report {
        text.push_str(&format!("{key}: {value}\n"));
    }
    text.push_str("```");
    MessageBuilder::in_channel(text).build()
}

pub fn text_message(response_type: ResponseType, text: impl Into<String>) -> MessageTemplate {
    match response_type {
        ResponseType::InChannel => MessageBuilder::in_channel(text).build(),
        ResponseType::Ephemeral => MessageBuilder::ephemeral(text).build(),
    }
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::ephemeral(format!(":warning: {summary}"))
        .attachment(UNASSIGNED_COLOR, |attachment| {
            attachment.field("Correlation ID", correlation_id);
        })
        .build()
}

pub fn nebo_help_message(platforms: &[&str]) -> MessageTemplate {
    let platforms = platforms.join(", ").to_lowercase();
    MessageBuilder::ephemeral(format!(
        "Nebo usage:\n\
         `/nebo shoes` - find all customers with shoe in the name\n\
         `/nebo shopify` - show {{{platforms}}} clients sorted by MRR\n\
         `/meet <optional name>` - create a google meet link (this link has to be opened in your searchspring chrome profile or you'll end up in a different meeting :/ )\n\
         `/fire` - used when our product is broken and the fire team should assemble immediately to fix it\n\
         `/firedown` - used when the fire is out to produce a checklist of tasks that we forget after an intense fire\n\
         `/neboidnx` - gets a Nextopia customer ID based on name or id\n\
         `/neboidss` - gets a Searchspring customer ID based on name or id\n\
         `/nebo help` - this message"
    ))
    .build()
}

pub fn neboid_help_message() -> MessageTemplate {
    MessageBuilder::ephemeral(
        "Neboid usage:\n\
         `/neboid <id prefix>` - find all customers with an id that starts with this prefix\n\
         `/neboid help` - this message",
    )
    .build()
}

pub fn meet_help_message() -> MessageTemplate {
    MessageBuilder::ephemeral(
        "Meet usage:\n\
         `/meet` - generate a random meet\n\
         `/meet name` - generate a meet with a name\n\
         `/meet help` - this message",
    )
    .build()
}

pub fn fire_help_message() -> MessageTemplate {
    MessageBuilder::ephemeral("Fire usage:\n`/fire` - generate a fire checklist to handle the fire")
        .build()
}

pub fn boost_help_message() -> MessageTemplate {
    MessageBuilder::ephemeral(
        "Try a command from this here list:\n\n\
         `/boost status <siteId>` - gets current status of a site\n\
         `/boost exclusions <siteId>` - list exclusion stats for a site\n\
         `/boost restart <siteId>` - restart a site and show its status",
    )
    .build()
}
