// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::format::{MISSING, format_currency, format_number, format_roi};
use crate::model::{DealRecord, ResultKind, SortSpec};
use crate::state::DashboardState;
use crate::store::RecordStore;

const LOADED_AT_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// One record fully rendered for display. All metric strings are already
/// formatted; the placeholder stands in for anything missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub key: String,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub buy_price: String,
    pub sell_price: String,
    pub profit: String,
    pub roi: String,
    pub sold_comps: String,
    pub url_source: Option<String>,
    pub url_ebay: Option<String>,
    pub pinned: bool,
}

impl CardView {
    fn render(record: &DealRecord, pinned: bool) -> Self {
        let text = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| MISSING.to_owned())
        };
        Self {
            key: record.key(),
            title: record
                .display_title()
                .map_or_else(|| MISSING.to_owned(), str::to_owned),
            brand: text(&record.brand),
            category: text(&record.category),
            buy_price: format_currency(record.buy_price.as_deref()),
            sell_price: format_currency(record.sell_price.as_deref()),
            profit: format_currency(record.profit.as_deref()),
            roi: format_roi(record.roi.as_deref()),
            sold_comps: format_number(record.sold_comps.as_deref()),
            url_source: record.url_source.clone(),
            url_ebay: record.url_ebay.clone(),
            pinned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabView {
    pub kind: ResultKind,
    pub count: usize,
    pub active: bool,
}

/// Everything the screen needs, derived in one pass. Pinned cards come
/// first in pin order, then the filtered and sorted remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub tabs: Vec<TabView>,
    pub cards: Vec<CardView>,
    pub categories: Vec<String>,
    pub search: String,
    pub category_filter: Option<String>,
    pub sort_label: Option<String>,
    pub fallback_banner: bool,
    pub status_line: Option<String>,
    pub source_caption: Option<String>,
}

fn sort_label(spec: SortSpec) -> String {
    format!("{} {}", spec.key.label(), spec.direction.as_str())
}

/// Pure projection of state plus store. No caching, no mutation; every
/// keystroke re-derives from the same two inputs.
pub fn project(state: &DashboardState, store: &RecordStore) -> DashboardView {
    let mut cards: Vec<CardView> = state
        .pinned
        .values()
        .map(|record| CardView::render(record, true))
        .collect();
    cards.extend(
        state
            .visible_unpinned(store)
            .into_iter()
            .map(|record| CardView::render(record, false)),
    );

    let tabs = ResultKind::ALL_KINDS
        .iter()
        .map(|kind| TabView {
            kind: *kind,
            count: store.count(*kind),
            active: *kind == state.active_tab,
        })
        .collect();

    // The fallback banner marks the scan-found-nothing case: the all tab is
    // showing because no record passed, not because the user chose it.
    let fallback_banner = state.active_tab == ResultKind::All
        && store.is_loaded(ResultKind::Passed)
        && store.count(ResultKind::Passed) == 0
        && store.is_loaded(ResultKind::All);

    let source_caption = store.set(state.active_tab).map(|set| {
        let when = set
            .loaded_at
            .format(LOADED_AT_FORMAT)
            .unwrap_or_default();
        match &set.source {
            Some(source) => format!("{source} · {when}"),
            None => when,
        }
    });

    DashboardView {
        tabs,
        cards,
        categories: store.categories(),
        search: state.search.clone(),
        category_filter: state.category_filter.clone(),
        sort_label: state.sort.map(sort_label),
        fallback_banner,
        status_line: state.status_line.clone(),
        source_caption,
    }
}
