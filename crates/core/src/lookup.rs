use std::sync::Arc;

use crate::domain::account::AccountRecord;
use crate::reconcile::Reconciler;
use crate::sources::{AccountSource, SourceError, SourceKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub error: SourceError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupOutcome {
    pub records: Vec<AccountRecord>,
    pub failures: Vec<SourceFailure>,
}

impl LookupOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fans a search term out to both account sources and reconciles the answers.
///
/// A failing source contributes an empty list; its error is returned in the
/// outcome instead of aborting the lookup.
#[derive(Clone)]
pub struct AccountLookup {
    analytics: Arc<dyn AccountSource>,
    crm: Arc<dyn AccountSource>,
    reconciler: Reconciler,
}

impl AccountLookup {
    pub fn new(analytics: Arc<dyn AccountSource>, crm: Arc<dyn AccountSource>) -> Self {
        Self { analytics, crm, reconciler: Reconciler::default() }
    }

    pub async fn search(&self, term: &str) -> LookupOutcome {
        let term = term.trim();
        let (analytics, crm) = tokio::join!(
            self.analytics.query_accounts_by_term(term),
            self.crm.query_accounts_by_term(term)
        );

        let mut failures = Vec::new();
        let analytics = settle(self.analytics.kind(), analytics, &mut failures);
        let crm = settle(self.crm.kind(), crm, &mut failures);

        LookupOutcome { records: self.reconciler.reconcile(analytics, crm, term), failures }
    }

    /// CRM-only lookup, ranked the same way as a reconciled one.
    pub async fn search_crm(&self, term: &str) -> LookupOutcome {
        let term = term.trim();
        let mut failures = Vec::new();
        let crm = settle(self.crm.kind(), self.crm.query_accounts_by_term(term).await, &mut failures);

        LookupOutcome { records: self.reconciler.rank(crm, term), failures }
    }
}

fn settle(
    source: SourceKind,
    result: Result<Vec<AccountRecord>, SourceError>,
    failures: &mut Vec<SourceFailure>,
) -> Vec<AccountRecord> {
    match result {
        Ok(records) => records,
        Err(error) => {
            failures.push(SourceFailure { source, error });
            Vec::new()
        }
    }
}
