// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::model::{DealRecord, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Title,
    Brand,
    Category,
    BuyPrice,
    SellPrice,
    Profit,
    Roi,
    SoldComps,
    UrlSource,
    UrlEbay,
}

impl Field {
    pub const ALL_FIELDS: [Self; 10] = [
        Self::Title,
        Self::Brand,
        Self::Category,
        Self::BuyPrice,
        Self::SellPrice,
        Self::Profit,
        Self::Roi,
        Self::SoldComps,
        Self::UrlSource,
        Self::UrlEbay,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Brand => "brand",
            Self::Category => "category",
            Self::BuyPrice => "buy_price",
            Self::SellPrice => "sell_price",
            Self::Profit => "profit",
            Self::Roi => "roi",
            Self::SoldComps => "sold_comps",
            Self::UrlSource => "url_source",
            Self::UrlEbay => "url_ebay",
        }
    }

    /// Accepted source column names, highest priority first. This is the
    /// single alias table; both resolution paths walk it so CSV-sourced and
    /// API-sourced records can never diverge.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Title => &["title", "name", "item", "product"],
            Self::Brand => &["brand"],
            Self::Category => &["category", "categories"],
            Self::BuyPrice => &["woot_price", "buy", "cost", "price_buy", "purchase_price"],
            Self::SellPrice => &[
                "ebay_price",
                "sold_price",
                "sell",
                "price_sell",
                "avg_sold",
                "expected_sale",
            ],
            Self::Profit => &["net_profit", "profit"],
            Self::Roi => &["roi", "net_roi"],
            Self::SoldComps => &["sold_comps", "comps", "sold_count"],
            Self::UrlSource => &["woot_url", "source_url", "url"],
            Self::UrlEbay => &["ebay_url", "comp_url", "ebay_search_url"],
        }
    }
}

/// Trims, strips a UTF-8 BOM, and lowercases a source column name for
/// alias comparison.
fn normalize_column(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn clean_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Header-order binding of canonical fields to source columns, resolved
/// once per CSV file rather than per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    slots: [Option<usize>; Field::ALL_FIELDS.len()],
}

impl ColumnMap {
    /// For each canonical field, walk the alias list in priority order and
    /// bind the first header (in header order) matching that alias. At most
    /// one column is ever bound per field.
    pub fn resolve(headers: &[String]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|name| normalize_column(name)).collect();
        let mut slots = [None; Field::ALL_FIELDS.len()];
        for (index, field) in Field::ALL_FIELDS.iter().enumerate() {
            slots[index] = field
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|header| header == alias));
        }
        Self { slots }
    }

    pub fn column_index(&self, field: Field) -> Option<usize> {
        let slot = Field::ALL_FIELDS.iter().position(|entry| *entry == field)?;
        self.slots[slot]
    }

    fn value<'a>(&self, field: Field, values: &'a [String]) -> Option<&'a str> {
        let index = self.column_index(field)?;
        values.get(index).map(String::as_str)
    }

    /// Build a canonical record from one data row. Unbound fields and bound
    /// but empty values both come out as `None`.
    pub fn record(&self, headers: &[String], values: &[String]) -> DealRecord {
        let field = |field: Field| self.value(field, values).and_then(clean_value);
        let raw: RawRow = headers
            .iter()
            .zip(values.iter())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        DealRecord {
            title: field(Field::Title),
            brand: field(Field::Brand),
            category: field(Field::Category),
            buy_price: field(Field::BuyPrice),
            sell_price: field(Field::SellPrice),
            profit: field(Field::Profit),
            roi: field(Field::Roi),
            sold_comps: field(Field::SoldComps),
            url_source: field(Field::UrlSource),
            url_ebay: field(Field::UrlEbay),
            raw,
        }
    }
}

/// The second resolution path: the same alias walk applied directly to an
/// already-keyed row (API result items). Key-order ties break the same way
/// header order does for CSV rows.
pub fn resolve_keyed(raw: RawRow) -> DealRecord {
    let lookup = |field: Field| {
        field.aliases().iter().find_map(|alias| {
            raw.iter()
                .find(|(name, _)| normalize_column(name) == *alias)
                .and_then(|(_, value)| clean_value(value))
        })
    };
    DealRecord {
        title: lookup(Field::Title),
        brand: lookup(Field::Brand),
        category: lookup(Field::Category),
        buy_price: lookup(Field::BuyPrice),
        sell_price: lookup(Field::SellPrice),
        profit: lookup(Field::Profit),
        roi: lookup(Field::Roi),
        sold_comps: lookup(Field::SoldComps),
        url_source: lookup(Field::UrlSource),
        url_ebay: lookup(Field::UrlEbay),
        raw,
    }
}
