use serde::{Deserialize, Serialize};

pub const LEGACY_MATCH_LIMIT: usize = 100;

/// One row of the legacy search platform's client report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySite {
    pub primary_id: String,
    pub secondary_id: String,
    pub name: String,
    pub status: String,
    pub url: String,
    pub plan: String,
    pub version: String,
    pub system: String,
}

impl LegacySite {
    /// Builds a site from a positional report row; rows shorter than nine
    /// columns are rejected.
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < 9 {
            return None;
        }

        Some(Self {
            primary_id: row[0].clone(),
            secondary_id: row[1].clone(),
            name: row[2].clone(),
            status: row[3].clone(),
            url: row[4].clone(),
            plan: row[5].clone(),
            version: row[7].clone(),
            system: row[8].clone(),
        })
    }

    pub fn matches(&self, query: &str) -> bool {
        self.primary_id.starts_with(query)
            || self.secondary_id.starts_with(query)
            || self.name.contains(query)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacySiteIndex {
    sites: Vec<LegacySite>,
}

impl LegacySiteIndex {
    /// Later rows with an already seen primary id replace the earlier entry.
    pub fn from_sites(sites: impl IntoIterator<Item = LegacySite>) -> Self {
        let mut indexed: Vec<LegacySite> = Vec::new();
        for site in sites {
            match indexed.iter_mut().find(|existing| existing.primary_id == site.primary_id) {
                Some(existing) => *existing = site,
                None => indexed.push(site),
            }
        }
        Self { sites: indexed }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn find_matches(&self, query: &str) -> Vec<LegacySite> {
        self.sites
            .iter()
            .filter(|site| site.matches(query))
            .take(LEGACY_MATCH_LIMIT)
            .cloned()
            .collect()
    }
}
