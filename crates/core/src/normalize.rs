use crate::domain::account::AccountRecord;

/// Commerce platforms that turn a lookup into a platform bucket query.
pub const PLATFORMS: [&str; 11] = [
    "3dcart",
    "BigCommerce",
    "CommerceV3",
    "Custom",
    "Magento",
    "Miva",
    "Netsuite",
    "Other",
    "Shopify",
    "Shopify Plus",
    "Yahoo",
];

const SCHEMES: [&str; 2] = ["http", "https"];

/// Strips a leading `http://`/`https://`, a leading `www.` and one trailing `/`.
///
/// The pass repeats until nothing changes, so the result is always a fixpoint.
pub fn normalize_website(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let next = strip_once(current);
        if next == current {
            return next.to_owned();
        }
        current = next;
    }
}

fn strip_once(website: &str) -> &str {
    let mut stripped = website;
    if let Some((scheme, rest)) = stripped.split_once("://") {
        if SCHEMES.contains(&scheme) {
            stripped = rest;
        }
    }
    if let Some(rest) = stripped.strip_prefix("www.") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix('/') {
        stripped = rest;
    }
    stripped
}

pub fn normalize_records(records: Vec<AccountRecord>) -> Vec<AccountRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.website = normalize_website(&record.website);
            record
        })
        .collect()
}

pub fn is_category_search(term: &str, categories: &[&str]) -> bool {
    let term = term.trim();
    !term.is_empty() && categories.iter().any(|category| category.eq_ignore_ascii_case(term))
}

pub fn is_platform_search(term: &str) -> bool {
    is_category_search(term, &PLATFORMS)
}

/// Keeps only `[A-Za-z0-9_.-]`; everything else is dropped before a term is
/// embedded in an upstream query.
pub fn sanitize_search_term(term: &str) -> String {
    term.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect()
}
