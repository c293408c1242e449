pub mod config;
pub mod domain;
pub mod errors;
pub mod lookup;
pub mod normalize;
pub mod reconcile;
pub mod sources;

pub use domain::account::{AccountRecord, ActivityStatus, RecordType, Revenue, UNKNOWN};
pub use domain::legacy_site::{LegacySite, LegacySiteIndex};
pub use errors::{ApplicationError, InterfaceError};
pub use lookup::{AccountLookup, LookupOutcome, SourceFailure};
pub use normalize::{
    is_category_search, is_platform_search, normalize_records, normalize_website,
    sanitize_search_term, PLATFORMS,
};
pub use reconcile::{reconcile, Reconciler, MAX_RESULTS};
pub use sources::{
    AccountSource, SearchAdminSource, SiteIndexSource, SiteReport, SourceError, SourceKind,
};
