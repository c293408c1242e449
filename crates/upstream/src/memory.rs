use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use nebo_core::domain::account::AccountRecord;
use nebo_core::domain::legacy_site::{LegacySite, LegacySiteIndex};
use nebo_core::sources::{
    AccountSource, SearchAdminSource, SiteIndexSource, SiteReport, SourceError, SourceKind,
};

/// Account source over a fixed record list, matching the way the live
/// queries do: website or platform contains the term, or the site id equals it.
pub struct InMemoryAccountSource {
    kind: SourceKind,
    records: RwLock<Vec<AccountRecord>>,
    failure: RwLock<Option<SourceError>>,
}

impl InMemoryAccountSource {
    pub fn new(kind: SourceKind, records: Vec<AccountRecord>) -> Self {
        Self { kind, records: RwLock::new(records), failure: RwLock::new(None) }
    }

    pub fn failing(kind: SourceKind, error: SourceError) -> Self {
        Self { kind, records: RwLock::new(Vec::new()), failure: RwLock::new(Some(error)) }
    }

    pub async fn push(&self, record: AccountRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl AccountSource for InMemoryAccountSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn query_accounts_by_term(&self, term: &str) -> Result<Vec<AccountRecord>, SourceError> {
        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        let needle = term.trim().to_ascii_lowercase();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| {
                record.website.to_ascii_lowercase().contains(&needle)
                    || record.platform.to_ascii_lowercase().contains(&needle)
                    || record.site_id == term.trim()
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySiteIndex {
    index: RwLock<LegacySiteIndex>,
}

impl InMemorySiteIndex {
    pub fn new(sites: Vec<LegacySite>) -> Self {
        Self { index: RwLock::new(LegacySiteIndex::from_sites(sites)) }
    }
}

#[async_trait]
impl SiteIndexSource for InMemorySiteIndex {
    async fn find_sites(&self, query: &str) -> Result<Vec<LegacySite>, SourceError> {
        Ok(self.index.read().await.find_matches(query.trim()))
    }
}

#[derive(Default)]
pub struct InMemorySearchAdmin {
    statuses: RwLock<HashMap<String, SiteReport>>,
    exclusions: RwLock<HashMap<String, SiteReport>>,
    restarts: RwLock<Vec<String>>,
}

impl InMemorySearchAdmin {
    pub async fn set_status(&self, site_id: &str, report: SiteReport) {
        self.statuses.write().await.insert(site_id.to_owned(), report);
    }

    pub async fn set_exclusions(&self, site_id: &str, report: SiteReport) {
        self.exclusions.write().await.insert(site_id.to_owned(), report);
    }

    pub async fn restarts(&self) -> Vec<String> {
        self.restarts.read().await.clone()
    }
}

#[async_trait]
impl SearchAdminSource for InMemorySearchAdmin {
    async fn site_status(&self, site_id: &str) -> Result<SiteReport, SourceError> {
        Ok(self.statuses.read().await.get(site_id).cloned().unwrap_or_default())
    }

    async fn exclusion_stats(&self, site_id: &str) -> Result<SiteReport, SourceError> {
        Ok(self.exclusions.read().await.get(site_id).cloned().unwrap_or_default())
    }

    async fn restart_site(&self, site_id: &str) -> Result<(), SourceError> {
        self.restarts.write().await.push(site_id.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nebo_core::domain::account::AccountRecord;
    use nebo_core::sources::{AccountSource, SearchAdminSource, SourceError, SourceKind};

    use super::{InMemoryAccountSource, InMemorySearchAdmin};

    #[tokio::test]
    async fn account_source_matches_like_the_live_queries() {
        let source = InMemoryAccountSource::new(
            SourceKind::Analytics,
            vec![
                AccountRecord::new("abc123", "shoes.com"),
                AccountRecord { platform: "Shopify".to_owned(), ..AccountRecord::new("x1", "a.io") },
            ],
        );
        source.push(AccountRecord::new("zzz999", "boots.com")).await;

        assert_eq!(source.query_accounts_by_term("SHOES").await.expect("query").len(), 1);
        assert_eq!(source.query_accounts_by_term("shopify").await.expect("query").len(), 1);
        assert_eq!(source.query_accounts_by_term("zzz999").await.expect("query").len(), 1);
        assert!(source.query_accounts_by_term("sandals").await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn failing_source_returns_its_error() {
        let source = InMemoryAccountSource::failing(
            SourceKind::Crm,
            SourceError::NotConfigured(SourceKind::Crm),
        );

        assert_eq!(
            source.query_accounts_by_term("x").await,
            Err(SourceError::NotConfigured(SourceKind::Crm))
        );
    }

    #[tokio::test]
    async fn search_admin_records_restarts() {
        let admin = InMemorySearchAdmin::default();
        admin.restart_site("q8q4eu").await.expect("restart");

        assert_eq!(admin.restarts().await, vec!["q8q4eu".to_owned()]);
        assert!(admin.site_status("q8q4eu").await.expect("status").is_empty());
    }
}
