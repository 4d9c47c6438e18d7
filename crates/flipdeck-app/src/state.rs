// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use indexmap::IndexMap;

use crate::model::{DealRecord, ResultKind, SortSpec};
use crate::store::{RecordStore, filter_records, sort_records};

/// Ephemeral view state plus the session-lived pinned set. Everything the
/// screen shows is derived from this and the [`RecordStore`]; there is no
/// separately maintained "current items" list to fall out of sync.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub active_tab: ResultKind,
    pub search: String,
    pub category_filter: Option<String>,
    pub sort: Option<SortSpec>,
    pub pinned: IndexMap<String, DealRecord>,
    pub status_line: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            active_tab: ResultKind::Passed,
            search: String::new(),
            category_filter: None,
            sort: None,
            pinned: IndexMap::new(),
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    SwitchTab(ResultKind),
    NextTab,
    PrevTab,
    SetSearch(String),
    SetCategory(Option<String>),
    SetSort(Option<SortSpec>),
    Pin(String),
    Unpin(String),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    TabChanged(ResultKind),
    SearchChanged(String),
    CategoryChanged(Option<String>),
    SortChanged(Option<SortSpec>),
    Pinned(String),
    Unpinned(String),
    StatusUpdated(String),
    StatusCleared,
}

impl DashboardState {
    pub fn dispatch(&mut self, command: DashboardCommand, store: &RecordStore) -> Vec<DashboardEvent> {
        match command {
            DashboardCommand::SwitchTab(kind) => {
                self.active_tab = kind;
                vec![DashboardEvent::TabChanged(kind)]
            }
            DashboardCommand::NextTab => self.rotate_tab(1),
            DashboardCommand::PrevTab => self.rotate_tab(-1),
            DashboardCommand::SetSearch(search) => {
                self.search = search.clone();
                vec![DashboardEvent::SearchChanged(search)]
            }
            DashboardCommand::SetCategory(category) => {
                self.category_filter = category.clone();
                vec![DashboardEvent::CategoryChanged(category)]
            }
            DashboardCommand::SetSort(sort) => {
                self.sort = sort;
                vec![DashboardEvent::SortChanged(sort)]
            }
            DashboardCommand::Pin(key) => self.pin(store, &key),
            DashboardCommand::Unpin(key) => self.unpin(&key),
            DashboardCommand::SetStatus(message) => {
                self.status_line = Some(message.clone());
                vec![DashboardEvent::StatusUpdated(message)]
            }
            DashboardCommand::ClearStatus => {
                self.status_line = None;
                vec![DashboardEvent::StatusCleared]
            }
        }
    }

    /// The active tab's list minus pinned membership, filtered and sorted.
    /// Recomputed on demand, so an unpinned record reappears here at once.
    pub fn visible_unpinned<'a>(&self, store: &'a RecordStore) -> Vec<&'a DealRecord> {
        let mut records = filter_records(
            store.records(self.active_tab),
            &self.search,
            self.category_filter.as_deref(),
        );
        records.retain(|record| !self.pinned.contains_key(&record.key()));
        if let Some(spec) = self.sort {
            sort_records(&mut records, spec);
        }
        records
    }

    /// Pin only acts on a record currently visible in the active tab's
    /// unpinned list; anything else is a silent no-op.
    fn pin(&mut self, store: &RecordStore, key: &str) -> Vec<DashboardEvent> {
        if self.pinned.contains_key(key) {
            return Vec::new();
        }
        let Some(record) = self
            .visible_unpinned(store)
            .into_iter()
            .find(|record| record.key() == key)
        else {
            return Vec::new();
        };
        let record = record.clone();
        self.pinned.insert(key.to_owned(), record);
        vec![DashboardEvent::Pinned(key.to_owned())]
    }

    /// Removing a pin makes the record eligible for its tab's derived list
    /// immediately; remaining pins keep their insertion order.
    fn unpin(&mut self, key: &str) -> Vec<DashboardEvent> {
        if self.pinned.shift_remove(key).is_none() {
            return Vec::new();
        }
        vec![DashboardEvent::Unpinned(key.to_owned())]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<DashboardEvent> {
        let tabs = ResultKind::ALL_KINDS;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![DashboardEvent::TabChanged(self.active_tab)]
    }
}
