use crate::domain::account::{AccountRecord, UNKNOWN};
use crate::normalize::{is_category_search, normalize_records, PLATFORMS};

pub const MAX_RESULTS: usize = 20;

/// Merges analytics and CRM account lists into one ranked, bounded list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciler {
    categories: Vec<String>,
    limit: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(PLATFORMS.iter().map(|platform| (*platform).to_owned()).collect(), MAX_RESULTS)
    }
}

impl Reconciler {
    pub fn new(categories: Vec<String>, limit: usize) -> Self {
        Self { categories, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_category_search(&self, term: &str) -> bool {
        let categories: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        is_category_search(term, &categories)
    }

    /// Analytics records are kept unless every CRM counterpart is a
    /// non-customer; CRM records only join when they are customers the
    /// analytics side has not already contributed.
    pub fn reconcile(
        &self,
        analytics: Vec<AccountRecord>,
        crm: Vec<AccountRecord>,
        term: &str,
    ) -> Vec<AccountRecord> {
        let analytics = normalize_records(analytics);
        let crm = normalize_records(crm);

        let mut merged: Vec<AccountRecord> = Vec::with_capacity(analytics.len() + crm.len());
        for record in analytics {
            if merged.iter().any(|kept| same_account(kept, &record)) {
                continue;
            }

            let mut counterparts = crm.iter().filter(|other| same_account(other, &record)).peekable();
            let unmatched = counterparts.peek().is_none();
            if unmatched || counterparts.any(AccountRecord::is_customer) {
                merged.push(record);
            }
        }

        for record in crm {
            if record.is_customer() && !merged.iter().any(|kept| same_account(kept, &record)) {
                merged.push(record);
            }
        }

        self.order(merged, term)
    }

    /// Normalizes, orders and truncates a single-source list.
    pub fn rank(&self, records: Vec<AccountRecord>, term: &str) -> Vec<AccountRecord> {
        self.order(normalize_records(records), term)
    }

    fn order(&self, mut records: Vec<AccountRecord>, term: &str) -> Vec<AccountRecord> {
        if !self.is_category_search(term) {
            records.sort_by_key(|record| record.website.chars().count());
        }
        records.truncate(self.limit);
        records.sort_by(|left, right| right.mrr.cmp(&left.mrr));
        records
    }
}

pub fn reconcile(
    analytics: Vec<AccountRecord>,
    crm: Vec<AccountRecord>,
    term: &str,
) -> Vec<AccountRecord> {
    Reconciler::default().reconcile(analytics, crm, term)
}

/// Both records must already carry normalized websites.
fn same_account(left: &AccountRecord, right: &AccountRecord) -> bool {
    if let (Some(left_id), Some(right_id)) = (left.join_site_id(), right.join_site_id()) {
        if left_id == right_id {
            return true;
        }
    }

    is_join_website(&left.website) && left.website == right.website
}

fn is_join_website(website: &str) -> bool {
    !website.is_empty() && !website.eq_ignore_ascii_case(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{reconcile, Reconciler, MAX_RESULTS};
    use crate::domain::account::{AccountRecord, RecordType, Revenue};

    fn analytics(site_id: &str, website: &str) -> AccountRecord {
        AccountRecord::new(site_id, website)
    }

    fn crm(site_id: &str, website: &str, record_type: &str) -> AccountRecord {
        AccountRecord::new(site_id, website).with_record_type(RecordType::parse(record_type))
    }

    fn mrr(amount: i64) -> Revenue {
        Revenue::Known(Decimal::from(amount))
    }

    fn websites(records: &[AccountRecord]) -> Vec<&str> {
        records.iter().map(|record| record.website.as_str()).collect()
    }

    #[test]
    fn prospect_counterpart_excludes_analytics_record() {
        let result = reconcile(
            vec![analytics("123456", "one.com"), analytics("abcdef", "two.com")],
            vec![crm("123abc", "three.com", "Customer"), crm("123456", "one.com", "Prospect")],
            "com",
        );

        assert_eq!(websites(&result), vec!["two.com", "three.com"]);
    }

    #[test]
    fn crm_only_non_customers_never_appear() {
        let result = reconcile(
            Vec::new(),
            vec![
                crm("p1", "prospect.com", "Prospect"),
                crm("p2", "partner.com", "Partner"),
                crm("c1", "customer.com", "Inactive Customer"),
            ],
            "com",
        );

        assert_eq!(websites(&result), vec!["customer.com"]);
    }

    #[test]
    fn unmatched_analytics_records_are_kept_without_record_type() {
        let result = reconcile(vec![analytics("zz9", "fresh.com")], Vec::new(), "fresh");

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].record_type, None);
    }

    #[test]
    fn any_customer_counterpart_keeps_the_analytics_record() {
        let result = reconcile(
            vec![analytics("s1", "shop.com").with_manager("Dana")],
            vec![crm("s1", "other.com", "Prospect"), crm("unknown", "shop.com", "Customer")],
            "shop",
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].manager, "Dana");
        assert_eq!(result[0].record_type, None);
    }

    #[test]
    fn unknown_site_ids_never_join() {
        let result = reconcile(
            vec![analytics("unknown", "a.com")],
            vec![crm("unknown", "b.com", "Prospect"), crm("", "c.com", "Customer")],
            "x",
        );

        assert_eq!(websites(&result), vec!["a.com", "c.com"]);
    }

    #[test]
    fn websites_join_after_normalization() {
        let result = reconcile(
            vec![analytics("a1", "https://www.shop.com/")],
            vec![crm("c9", "shop.com", "Prospect"), crm("c8", "http://shop.com", "Customer")],
            "shop",
        );

        assert_eq!(websites(&result), vec!["shop.com"]);
        assert_eq!(result[0].site_id, "a1");
    }

    #[test]
    fn same_display_name_with_distinct_keys_stays_distinct() {
        let result = reconcile(
            vec![analytics("a1", "shop.com")],
            vec![crm("c1", "shop.co.uk", "Customer")],
            "shop",
        );

        assert_eq!(result.len(), 2);
    }

    #[test]
    fn disjoint_inputs_keep_every_passing_record_up_to_the_cap() {
        let analytics_side: Vec<AccountRecord> =
            (0..8).map(|n| analytics(&format!("a{n}"), &format!("analytics{n}.com"))).collect();
        let crm_side: Vec<AccountRecord> = (0..6)
            .map(|n| {
                let kind = if n % 2 == 0 { "Customer" } else { "Prospect" };
                crm(&format!("c{n}"), &format!("crm{n}.com"), kind)
            })
            .collect();

        assert_eq!(reconcile(analytics_side.clone(), crm_side.clone(), "com").len(), 11);

        let many: Vec<AccountRecord> =
            (0..30).map(|n| analytics(&format!("m{n}"), &format!("many{n}.com"))).collect();
        let result = reconcile(many, crm_side, "com");
        assert_eq!(result.len(), MAX_RESULTS);
    }

    #[test]
    fn results_are_ordered_by_revenue_with_unknown_last() {
        let result = reconcile(
            vec![
                analytics("a", "a.com").with_mrr(Revenue::Unknown),
                analytics("b", "b.com").with_mrr(mrr(10)),
                analytics("c", "c.com").with_mrr(mrr(0)),
                analytics("d", "d.com").with_mrr(mrr(250)),
            ],
            vec![crm("e", "e.com", "Customer").with_mrr(mrr(40))],
            "com",
        );

        assert_eq!(websites(&result), vec!["d.com", "e.com", "b.com", "c.com", "a.com"]);
        assert!(result.windows(2).all(|pair| pair[0].mrr >= pair[1].mrr));
    }

    #[test]
    fn free_text_search_truncates_after_preferring_short_domains() {
        let mut records: Vec<AccountRecord> = (0..MAX_RESULTS)
            .map(|n| analytics(&format!("long{n}"), &format!("very-long-shop-variant-{n:02}.com")))
            .collect();
        records.push(analytics("short", "shop.com").with_mrr(Revenue::Unknown));

        let result = reconcile(records, Vec::new(), "shop");

        assert_eq!(result.len(), MAX_RESULTS);
        assert!(result.iter().any(|record| record.website == "shop.com"));
    }

    #[test]
    fn category_search_keeps_arrival_order_for_truncation() {
        let mut records: Vec<AccountRecord> = (0..MAX_RESULTS)
            .map(|n| analytics(&format!("long{n}"), &format!("very-long-shop-variant-{n:02}.com")))
            .collect();
        records.push(analytics("short", "shop.com").with_mrr(mrr(1_000)));

        let result = reconcile(records, Vec::new(), "shopify");

        assert_eq!(result.len(), MAX_RESULTS);
        assert!(result.iter().all(|record| record.website != "shop.com"));
    }

    #[test]
    fn empty_inputs_yield_empty_output() {
        assert!(reconcile(Vec::new(), Vec::new(), "anything").is_empty());
    }

    #[test]
    fn sentinels_survive_the_merge() {
        let result = reconcile(vec![analytics("a1", "a.com")], Vec::new(), "a");

        assert_eq!(result[0].mrr, Revenue::Unknown);
        assert_eq!(result[0].family_mrr, Revenue::Unknown);
        assert_eq!(result[0].manager, "unknown");
    }

    #[test]
    fn rank_orders_a_single_source() {
        let reconciler = Reconciler::new(vec!["Widgets".to_owned()], 2);
        let result = reconciler.rank(
            vec![
                analytics("1", "https://longer-name.com").with_mrr(mrr(500)),
                analytics("2", "b.io").with_mrr(mrr(5)),
                analytics("3", "www.ab.io/").with_mrr(mrr(50)),
            ],
            "b",
        );

        assert_eq!(websites(&result), vec!["ab.io", "b.io"]);
        assert!(reconciler.is_category_search("widgets"));
    }
}
