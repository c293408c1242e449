pub mod analytics;
pub mod client;
pub mod crm;
pub mod memory;
pub mod search_admin;
pub mod site_index;

/// Upper bound on rows any account query asks an upstream for.
pub const QUERY_ROW_LIMIT: usize = 200;

pub use analytics::{AnalyticsSettings, MetabaseSource};
pub use client::build_http_client;
pub use crm::{CrmSettings, SalesforceSource};
pub use memory::{InMemoryAccountSource, InMemorySearchAdmin, InMemorySiteIndex};
pub use search_admin::BoostAdminClient;
pub use site_index::{LegacyReportIndex, SiteIndexSettings};
