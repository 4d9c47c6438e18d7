// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::format::parse_metric;
use crate::model::{DealRecord, ResultKind, ResultSet, SortDirection, SortSpec};

/// In-memory home of the three named result sets. Sets are only ever
/// replaced wholesale; filtering and sorting read through without mutating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordStore {
    sets: [Option<ResultSet>; ResultKind::ALL_KINDS.len()],
}

const fn slot(kind: ResultKind) -> usize {
    match kind {
        ResultKind::Passed => 0,
        ResultKind::NearMiss => 1,
        ResultKind::All => 2,
    }
}

impl RecordStore {
    pub fn replace(&mut self, kind: ResultKind, set: ResultSet) {
        self.sets[slot(kind)] = Some(set);
    }

    /// Drops all three result sets. Pins live elsewhere and are untouched.
    pub fn clear(&mut self) {
        self.sets = [None, None, None];
    }

    pub fn set(&self, kind: ResultKind) -> Option<&ResultSet> {
        self.sets[slot(kind)].as_ref()
    }

    pub fn records(&self, kind: ResultKind) -> &[DealRecord] {
        self.set(kind).map_or(&[], |set| set.records.as_slice())
    }

    pub fn count(&self, kind: ResultKind) -> usize {
        self.records(kind).len()
    }

    pub fn is_loaded(&self, kind: ResultKind) -> bool {
        self.set(kind).is_some()
    }

    /// Sorted union of every non-null category across all loaded sets, not
    /// just the active tab.
    pub fn categories(&self) -> Vec<String> {
        let mut unique = BTreeSet::new();
        for set in self.sets.iter().flatten() {
            for record in &set.records {
                if let Some(category) = &record.category {
                    unique.insert(category.clone());
                }
            }
        }
        unique.into_iter().collect()
    }
}

/// Text and category filters are conjunctive. The text filter matches when
/// the lowercase term is a substring of the record's search haystack; the
/// category filter requires exact equality.
pub fn filter_records<'a>(
    records: &'a [DealRecord],
    search: &str,
    category: Option<&str>,
) -> Vec<&'a DealRecord> {
    let needle = search.trim().to_lowercase();
    records
        .iter()
        .filter(|record| needle.is_empty() || record.search_haystack().contains(&needle))
        .filter(|record| match category {
            Some(wanted) => record.category.as_deref() == Some(wanted),
            None => true,
        })
        .collect()
}

/// Stable sort; records whose sort field is null or unparseable order as
/// negative infinity, so they sort last under `desc` and first under `asc`.
pub fn sort_records(records: &mut [&DealRecord], spec: SortSpec) {
    let value = |record: &DealRecord| {
        parse_metric(spec.key.value_of(record)).unwrap_or(f64::NEG_INFINITY)
    };
    match spec.direction {
        SortDirection::Asc => records.sort_by(|a, b| value(a).total_cmp(&value(b))),
        SortDirection::Desc => records.sort_by(|a, b| value(b).total_cmp(&value(a))),
    }
}
