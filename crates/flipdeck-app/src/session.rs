// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::model::{DealRecord, ResultKind, ResultSet};
use crate::state::DashboardState;
use crate::store::RecordStore;

/// One full scan's worth of results, all three sets together. A batch is
/// applied atomically: either every set lands or none do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultBatch {
    pub passed: Vec<DealRecord>,
    pub nearmiss: Vec<DealRecord>,
    pub all: Vec<DealRecord>,
    pub source: Option<String>,
}

impl ResultBatch {
    pub fn take(&mut self, kind: ResultKind) -> Vec<DealRecord> {
        match kind {
            ResultKind::Passed => std::mem::take(&mut self.passed),
            ResultKind::NearMiss => std::mem::take(&mut self.nearmiss),
            ResultKind::All => std::mem::take(&mut self.all),
        }
    }
}

/// State plus store, with the load lifecycle tying them together.
#[derive(Debug, Clone, Default)]
pub struct DashboardSession {
    pub state: DashboardState,
    pub store: RecordStore,
}

impl DashboardSession {
    /// A load starting drops any previously loaded sets so stale results
    /// never mix with the incoming batch. Pins are session-lived and stay.
    pub fn begin_load(&mut self, label: &str) {
        self.store.clear();
        self.state.status_line = Some(format!("loading {label}..."));
    }

    /// Lands a completed batch: replaces all three sets, switches to the
    /// passed tab when it has results and to the all tab otherwise, and
    /// summarizes the counts in the status line.
    pub fn apply_batch(&mut self, mut batch: ResultBatch, now: OffsetDateTime) {
        for kind in ResultKind::ALL_KINDS {
            let records = batch.take(kind);
            self.store
                .replace(kind, ResultSet::new(records, batch.source.clone(), now));
        }
        self.state.active_tab = if self.store.count(ResultKind::Passed) > 0 {
            ResultKind::Passed
        } else {
            ResultKind::All
        };
        self.state.status_line = Some(format!(
            "loaded {} passed, {} near miss, {} scanned",
            self.store.count(ResultKind::Passed),
            self.store.count(ResultKind::NearMiss),
            self.store.count(ResultKind::All),
        ));
    }

    /// A failed load only reports; whatever begin_load cleared stays
    /// cleared, and pins are untouched.
    pub fn fail_load(&mut self, error: &str) {
        self.state.status_line = Some(format!("load failed: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardSession, ResultBatch};
    use crate::model::{DealRecord, ResultKind};
    use time::OffsetDateTime;

    fn deal(title: &str) -> DealRecord {
        DealRecord::from_keyed(vec![
            ("title".to_owned(), title.to_owned()),
            ("woot_url".to_owned(), format!("https://woot/{title}")),
        ])
    }

    #[test]
    fn begin_load_clears_sets_but_keeps_pins() {
        let mut session = DashboardSession::default();
        session.apply_batch(
            ResultBatch {
                passed: vec![deal("Drill")],
                ..ResultBatch::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        let store = session.store.clone();
        session
            .state
            .dispatch(crate::state::DashboardCommand::Pin("https://woot/Drill".to_owned()), &store);
        assert_eq!(session.state.pinned.len(), 1);

        session.begin_load("latest reports");
        assert!(!session.store.is_loaded(ResultKind::Passed));
        assert_eq!(session.state.pinned.len(), 1);
        assert_eq!(session.state.status_line.as_deref(), Some("loading latest reports..."));
    }

    #[test]
    fn apply_batch_defaults_to_passed_tab_when_nonempty() {
        let mut session = DashboardSession::default();
        session.state.active_tab = ResultKind::NearMiss;
        session.apply_batch(
            ResultBatch {
                passed: vec![deal("Drill")],
                all: vec![deal("Drill"), deal("Saw")],
                ..ResultBatch::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        assert_eq!(session.state.active_tab, ResultKind::Passed);
        assert_eq!(
            session.state.status_line.as_deref(),
            Some("loaded 1 passed, 0 near miss, 2 scanned")
        );
    }

    #[test]
    fn apply_batch_falls_back_to_all_tab_when_passed_is_empty() {
        let mut session = DashboardSession::default();
        session.apply_batch(
            ResultBatch {
                all: vec![deal("Saw")],
                ..ResultBatch::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        assert_eq!(session.state.active_tab, ResultKind::All);
        assert!(session.store.is_loaded(ResultKind::Passed));
        assert_eq!(session.store.count(ResultKind::Passed), 0);
    }

    #[test]
    fn fail_load_surfaces_the_error_text_and_keeps_pins() {
        let mut session = DashboardSession::default();
        session.apply_batch(
            ResultBatch {
                passed: vec![deal("Drill")],
                ..ResultBatch::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        let store = session.store.clone();
        session
            .state
            .dispatch(crate::state::DashboardCommand::Pin("https://woot/Drill".to_owned()), &store);

        session.begin_load("scan");
        session.fail_load("analysis failed: OpenAI quota exceeded");
        assert_eq!(
            session.state.status_line.as_deref(),
            Some("load failed: analysis failed: OpenAI quota exceeded")
        );
        assert_eq!(session.state.pinned.len(), 1);
    }

    #[test]
    fn batch_source_lands_on_every_set() {
        let mut session = DashboardSession::default();
        session.apply_batch(
            ResultBatch {
                passed: vec![deal("Drill")],
                source: Some("report_20260828.csv".to_owned()),
                ..ResultBatch::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        for kind in ResultKind::ALL_KINDS {
            let set = session.store.set(kind).expect("set loaded");
            assert_eq!(set.source.as_deref(), Some("report_20260828.csv"));
        }
    }
}
