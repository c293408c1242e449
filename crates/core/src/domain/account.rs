use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Placeholder used by every upstream for a field it could not resolve.
pub const UNKNOWN: &str = "unknown";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[default]
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Not active")]
    NotActive,
}

impl ActivityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::NotActive => "Not active",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// CRM account classification. Only customers survive reconciliation on their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    Customer,
    InactiveCustomer,
    Prospect,
    Partner,
    Other(String),
}

impl RecordType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "customer" => Self::Customer,
            "inactive customer" => Self::InactiveCustomer,
            "prospect" => Self::Prospect,
            "partner" => Self::Partner,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Customer => "Customer",
            Self::InactiveCustomer => "Inactive Customer",
            Self::Prospect => "Prospect",
            Self::Partner => "Partner",
            Self::Other(label) => label,
        }
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, Self::Customer | Self::InactiveCustomer)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Monthly recurring revenue as reported by an upstream.
///
/// Upstreams encode "no figure" as `-1`; that sentinel maps to `Unknown` and
/// back, and `Unknown` orders below every known amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Revenue {
    #[default]
    Unknown,
    Known(Decimal),
}

impl Revenue {
    pub const UNKNOWN_SENTINEL: f64 = -1.0;

    pub fn from_raw(raw: f64) -> Self {
        if !raw.is_finite() || raw < 0.0 {
            return Self::Unknown;
        }
        Decimal::from_f64(raw).map(|value| Self::Known(value.round_dp(2))).unwrap_or_default()
    }

    pub fn from_optional(raw: Option<f64>) -> Self {
        raw.map(Self::from_raw).unwrap_or_default()
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn to_raw(&self) -> f64 {
        match self {
            Self::Known(value) => value.to_f64().unwrap_or(Self::UNKNOWN_SENTINEL),
            Self::Unknown => Self::UNKNOWN_SENTINEL,
        }
    }
}

impl Serialize for Revenue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Revenue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<f64>::deserialize(deserializer)?;
        Ok(Self::from_optional(raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub website: String,
    pub site_id: String,
    pub manager: String,
    pub active: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    pub mrr: Revenue,
    pub family_mrr: Revenue,
    pub platform: String,
    pub integration: String,
    pub provider: String,
    pub city: String,
    pub state: String,
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self {
            website: UNKNOWN.to_owned(),
            site_id: UNKNOWN.to_owned(),
            manager: UNKNOWN.to_owned(),
            active: ActivityStatus::Active,
            record_type: None,
            mrr: Revenue::Unknown,
            family_mrr: Revenue::Unknown,
            platform: UNKNOWN.to_owned(),
            integration: UNKNOWN.to_owned(),
            provider: UNKNOWN.to_owned(),
            city: UNKNOWN.to_owned(),
            state: UNKNOWN.to_owned(),
        }
    }
}

impl AccountRecord {
    pub fn new(site_id: impl Into<String>, website: impl Into<String>) -> Self {
        Self { site_id: site_id.into(), website: website.into(), ..Self::default() }
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    pub fn with_mrr(mut self, mrr: Revenue) -> Self {
        self.mrr = mrr;
        self
    }

    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = manager.into();
        self
    }

    /// The site id when it is usable as a join key.
    pub fn join_site_id(&self) -> Option<&str> {
        let trimmed = self.site_id.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN) {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn is_customer(&self) -> bool {
        self.record_type.as_ref().is_some_and(RecordType::is_customer)
    }

    pub fn has_known_manager(&self) -> bool {
        !self.manager.trim().is_empty() && !self.manager.eq_ignore_ascii_case(UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AccountRecord, RecordType, Revenue};

    #[test]
    fn revenue_sentinel_round_trips_and_orders_lowest() {
        assert_eq!(Revenue::from_raw(-1.0), Revenue::Unknown);
        assert_eq!(Revenue::Unknown.to_raw(), -1.0);
        assert!(Revenue::Unknown < Revenue::Known(Decimal::ZERO));
        assert_eq!(Revenue::from_raw(1250.5), Revenue::Known(Decimal::new(125_050, 2)));
        assert_eq!(Revenue::from_optional(None), Revenue::Unknown);
    }

    #[test]
    fn revenue_zero_is_a_real_figure() {
        assert_eq!(Revenue::from_raw(0.0), Revenue::Known(Decimal::ZERO));
        assert!(Revenue::from_raw(0.0).is_known());
    }

    #[test]
    fn record_type_classifies_customers() {
        assert!(RecordType::parse("Customer").is_customer());
        assert!(RecordType::parse("Inactive Customer").is_customer());
        assert!(!RecordType::parse("Prospect").is_customer());
        assert_eq!(RecordType::parse("Reseller"), RecordType::Other("Reseller".to_owned()));
    }

    #[test]
    fn sentinel_site_ids_are_not_join_keys() {
        assert_eq!(AccountRecord::new("unknown", "a.com").join_site_id(), None);
        assert_eq!(AccountRecord::new("  ", "a.com").join_site_id(), None);
        assert_eq!(AccountRecord::new("q8q4eu", "a.com").join_site_id(), Some("q8q4eu"));
    }

    #[test]
    fn serde_keeps_unknown_revenue_as_sentinel() {
        let record = AccountRecord::new("abc123", "shop.com");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["mrr"], serde_json::json!(-1.0));
        assert!(json.get("record_type").is_none());

        let decoded: AccountRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(decoded.mrr, Revenue::Unknown);
    }
}
