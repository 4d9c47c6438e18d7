// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::fields::resolve_keyed;

/// A source row exactly as it arrived: ordered `(column, value)` pairs.
/// Kept on the canonical record so the UI can fall back to raw values.
pub type RawRow = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Passed,
    NearMiss,
    All,
}

impl ResultKind {
    pub const ALL_KINDS: [Self; 3] = [Self::Passed, Self::NearMiss, Self::All];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::NearMiss => "nearmiss",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "passed" => Some(Self::Passed),
            "nearmiss" => Some(Self::NearMiss),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::NearMiss => "near miss",
            Self::All => "all scanned",
        }
    }
}

/// A report row after field-name normalization. Every attribute is either
/// `None` or a non-empty string; absent and empty are never distinguished
/// downstream. Records are never re-derived after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub buy_price: Option<String>,
    pub sell_price: Option<String>,
    pub profit: Option<String>,
    pub roi: Option<String>,
    pub sold_comps: Option<String>,
    pub url_source: Option<String>,
    pub url_ebay: Option<String>,
    pub raw: RawRow,
}

impl DealRecord {
    /// Canonicalize an already-keyed row (API items, test fixtures) via the
    /// shared alias table.
    pub fn from_keyed(raw: RawRow) -> Self {
        resolve_keyed(raw)
    }

    /// Stable identity used for pinning and de-duplication: first non-null
    /// of the source URL and the eBay URL, else a title+price composite.
    pub fn key(&self) -> String {
        if let Some(url) = &self.url_source {
            return url.clone();
        }
        if let Some(url) = &self.url_ebay {
            return url.clone();
        }
        format!(
            "{}|{}",
            self.title.as_deref().unwrap_or(""),
            self.buy_price.as_deref().unwrap_or("")
        )
    }

    /// Lowercase space-joined `title brand category` used by the text filter.
    pub fn search_haystack(&self) -> String {
        let mut parts = Vec::new();
        for value in [&self.title, &self.brand, &self.category] {
            if let Some(value) = value {
                parts.push(value.to_lowercase());
            }
        }
        parts.join(" ")
    }

    /// Raw-row fallback when the title column never resolved.
    pub fn display_title(&self) -> Option<&str> {
        if let Some(title) = &self.title {
            return Some(title);
        }
        self.raw
            .iter()
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }
}

/// One named collection of scan output. Replaced wholesale on every load,
/// never incrementally mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub records: Vec<DealRecord>,
    pub source: Option<String>,
    pub loaded_at: OffsetDateTime,
}

impl ResultSet {
    pub fn new(records: Vec<DealRecord>, source: Option<String>, loaded_at: OffsetDateTime) -> Self {
        Self {
            records,
            source,
            loaded_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Profit,
    Roi,
    SoldComps,
    Price,
}

impl SortKey {
    pub const ALL_KEYS: [Self; 4] = [Self::Profit, Self::Roi, Self::SoldComps, Self::Price];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profit => "profit",
            Self::Roi => "roi",
            Self::SoldComps => "sold_comps",
            Self::Price => "price",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "profit" => Some(Self::Profit),
            "roi" => Some(Self::Roi),
            "sold_comps" => Some(Self::SoldComps),
            "price" => Some(Self::Price),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Profit => "profit",
            Self::Roi => "ROI",
            Self::SoldComps => "sold comps",
            Self::Price => "buy price",
        }
    }

    /// The record attribute this key orders by; `price` maps to the buy
    /// price column.
    pub fn value_of<'a>(self, record: &'a DealRecord) -> Option<&'a str> {
        match self {
            Self::Profit => record.profit.as_deref(),
            Self::Roi => record.roi.as_deref(),
            Self::SoldComps => record.sold_comps.as_deref(),
            Self::Price => record.buy_price.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

/// Ingestion counters surfaced in the status line. Parse problems are
/// tallied here, never raised as fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub accepted: usize,
    pub skipped_malformed: usize,
    pub skipped_empty: usize,
    pub capped: bool,
}

impl LoadSummary {
    pub fn describe(&self) -> String {
        let mut message = format!("{} rows read, {} accepted", self.rows_read, self.accepted);
        if self.skipped_malformed > 0 {
            message.push_str(&format!(", {} malformed", self.skipped_malformed));
        }
        if self.skipped_empty > 0 {
            message.push_str(&format!(", {} empty", self.skipped_empty));
        }
        if self.capped {
            message.push_str(", capped");
        }
        message
    }
}

/// Result of loading a local CSV report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLoad {
    pub records: Vec<DealRecord>,
    pub summary: LoadSummary,
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{DealRecord, LoadSummary, ResultKind, SortDirection, SortKey};

    fn record_with_urls(source: Option<&str>, ebay: Option<&str>) -> DealRecord {
        DealRecord {
            title: Some("Drill".to_owned()),
            brand: None,
            category: None,
            buy_price: Some("50".to_owned()),
            sell_price: None,
            profit: None,
            roi: None,
            sold_comps: None,
            url_source: source.map(str::to_owned),
            url_ebay: ebay.map(str::to_owned),
            raw: Vec::new(),
        }
    }

    #[test]
    fn key_prefers_source_url_then_ebay_url() {
        let both = record_with_urls(Some("https://woot/a"), Some("https://ebay/a"));
        assert_eq!(both.key(), "https://woot/a");

        let ebay_only = record_with_urls(None, Some("https://ebay/a"));
        assert_eq!(ebay_only.key(), "https://ebay/a");
    }

    #[test]
    fn key_falls_back_to_title_price_composite() {
        let record = record_with_urls(None, None);
        assert_eq!(record.key(), "Drill|50");
    }

    #[test]
    fn key_is_deterministic() {
        let record = record_with_urls(None, None);
        assert_eq!(record.key(), record.key());
    }

    #[test]
    fn search_haystack_skips_null_fields() {
        let mut record = record_with_urls(None, None);
        record.brand = Some("Milwaukee".to_owned());
        assert_eq!(record.search_haystack(), "drill milwaukee");
    }

    #[test]
    fn display_title_falls_back_to_first_raw_value() {
        let record = DealRecord {
            title: None,
            brand: None,
            category: None,
            buy_price: None,
            sell_price: None,
            profit: None,
            roi: None,
            sold_comps: None,
            url_source: None,
            url_ebay: None,
            raw: vec![
                ("sku".to_owned(), "  ".to_owned()),
                ("note".to_owned(), "open box".to_owned()),
            ],
        };
        assert_eq!(record.display_title(), Some("open box"));
    }

    #[test]
    fn result_kind_round_trips_wire_names() {
        for kind in ResultKind::ALL_KINDS {
            assert_eq!(ResultKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResultKind::parse("bogus"), None);
    }

    #[test]
    fn sort_enums_round_trip() {
        for key in SortKey::ALL_KEYS {
            assert_eq!(SortKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
    }

    #[test]
    fn load_summary_describe_mentions_problems_only_when_present() {
        let clean = LoadSummary {
            rows_read: 3,
            accepted: 3,
            ..LoadSummary::default()
        };
        assert_eq!(clean.describe(), "3 rows read, 3 accepted");

        let messy = LoadSummary {
            rows_read: 5,
            accepted: 2,
            skipped_malformed: 2,
            skipped_empty: 1,
            capped: true,
        };
        let message = messy.describe();
        assert!(message.contains("2 malformed"));
        assert!(message.contains("1 empty"));
        assert!(message.contains("capped"));
    }
}
