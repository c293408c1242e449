pub mod account;
pub mod legacy_site;
