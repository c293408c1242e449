use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use nebo_core::domain::account::AccountRecord;
use nebo_core::errors::ApplicationError;
use nebo_core::lookup::{AccountLookup, LookupOutcome};
use nebo_core::sources::{
    AccountSource, SearchAdminSource, SiteIndexSource, SourceError, SourceKind,
};
use nebo_slack::blocks::{self, MessageTemplate};
use nebo_slack::commands::{BoostAction, CommandEnvelope, CommandRouteError, NeboCommandService};

/// Upstream clients built at startup. `None` means the credentials were blank.
#[derive(Clone)]
pub struct Upstreams {
    pub analytics: Option<Arc<dyn AccountSource>>,
    pub crm: Option<Arc<dyn AccountSource>>,
    pub site_index: Option<Arc<dyn SiteIndexSource>>,
    pub search_admin: Arc<dyn SearchAdminSource>,
}

impl Upstreams {
    pub fn configured(&self) -> [(SourceKind, bool); 4] {
        [
            (SourceKind::Analytics, self.analytics.is_some()),
            (SourceKind::Crm, self.crm.is_some()),
            (SourceKind::SiteIndex, self.site_index.is_some()),
            (SourceKind::SearchAdmin, true),
        ]
    }
}

/// Stand-in for an account source whose credentials are missing.
struct UnconfiguredSource(SourceKind);

#[async_trait]
impl AccountSource for UnconfiguredSource {
    fn kind(&self) -> SourceKind {
        self.0
    }

    async fn query_accounts_by_term(&self, _term: &str) -> Result<Vec<AccountRecord>, SourceError> {
        Err(SourceError::NotConfigured(self.0))
    }
}

fn or_unconfigured(
    source: Option<Arc<dyn AccountSource>>,
    kind: SourceKind,
) -> Arc<dyn AccountSource> {
    match source {
        Some(source) => source,
        None => Arc::new(UnconfiguredSource(kind)),
    }
}

pub struct NeboService {
    upstreams: Upstreams,
    lookup: AccountLookup,
}

impl NeboService {
    pub fn new(upstreams: Upstreams) -> Self {
        let analytics = or_unconfigured(upstreams.analytics.clone(), SourceKind::Analytics);
        let crm = or_unconfigured(upstreams.crm.clone(), SourceKind::Crm);

        Self { upstreams, lookup: AccountLookup::new(analytics, crm) }
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    fn require(&self, kind: SourceKind) -> Result<(), ApplicationError> {
        let configured = self
            .upstreams
            .configured()
            .iter()
            .any(|(candidate, configured)| *candidate == kind && *configured);
        if configured {
            Ok(())
        } else {
            Err(SourceError::NotConfigured(kind).into())
        }
    }

    fn search_admin(&self) -> &dyn SearchAdminSource {
        self.upstreams.search_admin.as_ref()
    }
}

fn failure_event(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Analytics => "upstream.analytics.query_failed",
        SourceKind::Crm => "upstream.crm.query_failed",
        SourceKind::SiteIndex => "upstream.site_index.query_failed",
        SourceKind::SearchAdmin => "upstream.search_admin.query_failed",
    }
}

fn log_failures(outcome: &LookupOutcome, envelope: &CommandEnvelope) {
    for failure in &outcome.failures {
        warn!(
            event_name = failure_event(failure.source),
            correlation_id = %envelope.request_id,
            source = %failure.source,
            error = %failure.error,
            "upstream failed; continuing with an empty result"
        );
    }
}

#[async_trait]
impl NeboCommandService for NeboService {
    async fn lookup_accounts(
        &self,
        term: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        self.require(SourceKind::Crm)?;
        self.require(SourceKind::Analytics)?;

        let outcome = self.lookup.search(term).await;
        log_failures(&outcome, envelope);
        Ok(blocks::account_results_message(term, &outcome.records))
    }

    async fn lookup_legacy_sites(
        &self,
        query: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let site_index = self
            .upstreams
            .site_index
            .as_ref()
            .ok_or(ApplicationError::from(SourceError::NotConfigured(SourceKind::SiteIndex)))?;

        let sites = site_index.find_sites(query).await.map_err(ApplicationError::from)?;
        Ok(blocks::legacy_sites_message(&sites))
    }

    /// Single-source lookup: a CRM failure is the answer, not an empty list.
    async fn lookup_crm_accounts(
        &self,
        query: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        self.require(SourceKind::Crm)?;

        let outcome = self.lookup.search_crm(query).await;
        log_failures(&outcome, envelope);
        if let Some(failure) = outcome.failures.into_iter().next() {
            return Err(ApplicationError::from(failure.error).into());
        }
        Ok(blocks::account_results_message(query, &outcome.records))
    }

    async fn boost(
        &self,
        action: &BoostAction,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let admin = self.search_admin();
        let report = match action {
            BoostAction::Status { site_id } => admin.site_status(site_id).await,
            BoostAction::Exclusions { site_id } => admin.exclusion_stats(site_id).await,
            BoostAction::Restart { site_id } => match admin.restart_site(site_id).await {
                Ok(()) => admin.site_status(site_id).await,
                Err(error) => Err(error),
            },
        }
        .map_err(ApplicationError::from)?;

        Ok(blocks::site_report_message(&report))
    }
}
