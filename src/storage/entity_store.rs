// ============================================================================
// Entity Store
// ============================================================================
//
// Ordered in-memory collection of manuscripts, newest first. It is the only
// thing rendering code reads, and only the mutation coordinator writes to it.
//
// Backed by a persistent vector so that taking a snapshot is a cheap clone.
// Every mutation bumps `version`, which lets readers detect change without
// diffing.
//
// ============================================================================

use crate::core::{Manuscript, ManuscriptPatch, Status};
use im::Vector;
use std::collections::{BTreeMap, HashSet};

use super::query::ManuscriptQuery;

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vector<Manuscript>,
    version: u64,
    stale: bool,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(entities: impl IntoIterator<Item = Manuscript>) -> Self {
        Self {
            entities: entities.into_iter().collect(),
            version: 0,
            stale: false,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when the last resync attempt failed and the contents may still
    /// hold optimistic changes the backing store never accepted.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manuscript> {
        self.entities.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Manuscript> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn to_vec(&self) -> Vec<Manuscript> {
        self.entities.iter().cloned().collect()
    }

    pub fn query(&self, query: &ManuscriptQuery) -> Vec<Manuscript> {
        query.run(self.entities.iter())
    }

    pub fn status_counts(&self) -> BTreeMap<Status, usize> {
        let mut counts: BTreeMap<Status, usize> =
            Status::ALL.into_iter().map(|status| (status, 0)).collect();
        for entity in &self.entities {
            *counts.entry(entity.status).or_default() += 1;
        }
        counts
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Adds a new entity at the front. An entity with the same id is replaced
    /// in place instead.
    pub fn prepend(&mut self, entity: Manuscript) {
        match self.position(&entity.id) {
            Some(index) => {
                self.entities.set(index, entity);
            }
            None => self.entities.push_front(entity),
        }
        self.bump();
    }

    /// Replaces the entity with the same id. Returns the previous value, or
    /// `None` (and changes nothing) when the id is unknown.
    pub fn replace(&mut self, entity: Manuscript) -> Option<Manuscript> {
        let index = self.position(&entity.id)?;
        let previous = self.entities.set(index, entity);
        self.bump();
        Some(previous)
    }

    /// Puts a snapshot back exactly as captured. A no-op when the entity has
    /// since been removed.
    pub fn restore(&mut self, snapshot: Manuscript) -> bool {
        self.replace(snapshot).is_some()
    }

    pub fn remove(&mut self, id: &str) -> Option<Manuscript> {
        let index = self.position(id)?;
        let removed = self.entities.remove(index);
        self.bump();
        Some(removed)
    }

    /// Applies one shared patch to every listed entity that is present and
    /// keeps the normalized result, matching what gateways store.
    /// Returns the number of entities changed.
    pub fn apply_bulk(&mut self, ids: &[String], patch: &ManuscriptPatch) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut applied = 0;
        for entity in self.entities.iter_mut() {
            if wanted.contains(entity.id.as_str()) {
                patch.apply_to(entity);
                *entity = entity.normalized();
                applied += 1;
            }
        }
        if applied > 0 {
            self.bump();
        }
        applied
    }

    /// Resync: discards everything held and takes the backing store's view.
    pub fn replace_all(&mut self, entities: impl IntoIterator<Item = Manuscript>) {
        self.entities = entities.into_iter().collect();
        self.stale = false;
        self.bump();
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
        self.bump();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id == id)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManuscriptDraft, Priority};
    use chrono::{TimeZone, Utc};

    fn entity(id: &str, manuscript_id: &str) -> Manuscript {
        ManuscriptDraft::new(manuscript_id, "JRN")
            .id(id)
            .into_manuscript(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_prepend_keeps_newest_first() {
        let mut store = EntityStore::new();
        store.prepend(entity("a", "J-1"));
        store.prepend(entity("b", "J-2"));
        let ids: Vec<_> = store.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_prepend_existing_id_replaces_in_place() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1"), entity("b", "J-2")]);
        store.prepend(entity("b", "J-22"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b").unwrap().manuscript_id, "J-22");
    }

    #[test]
    fn test_replace_unknown_id_is_noop() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1")]);
        assert!(store.replace(entity("zzz", "J-9")).is_none());
        assert_eq!(store.version(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_restore_after_removal_is_noop() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1")]);
        let snapshot = store.get("a").cloned().unwrap();
        store.remove("a");
        assert!(!store.restore(snapshot));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1")]);
        let snapshot = store.clone();
        store.apply_bulk(&["a".to_string()], &ManuscriptPatch::new().priority(Priority::Urgent));
        assert_eq!(snapshot.get("a").unwrap().priority, Priority::Normal);
        assert_eq!(store.get("a").unwrap().priority, Priority::Urgent);
    }

    #[test]
    fn test_apply_bulk_skips_missing_ids() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1"), entity("b", "J-2")]);
        let applied = store.apply_bulk(
            &["a".to_string(), "ghost".to_string()],
            &ManuscriptPatch::new().status(Status::PendingTl),
        );
        assert_eq!(applied, 1);
        assert_eq!(store.get("a").unwrap().status, Status::PendingTl);
        assert_eq!(store.get("b").unwrap().status, Status::Untouched);
    }

    #[test]
    fn test_apply_bulk_keeps_normalized_copy() {
        let mut worked = entity("a", "J-1");
        worked.status = Status::Worked;
        worked.completed_date = Some(worked.date_received);
        let mut store = EntityStore::from_entities(vec![worked]);

        store.apply_bulk(&["a".to_string()], &ManuscriptPatch::new().status(Status::PendingJm));
        let moved = store.get("a").unwrap();
        assert_eq!(moved.status, Status::PendingJm);
        assert_eq!(moved.completed_date, None);
    }

    #[test]
    fn test_replace_all_clears_stale_flag() {
        let mut store = EntityStore::from_entities(vec![entity("a", "J-1")]);
        store.mark_stale();
        assert!(store.is_stale());
        store.replace_all(vec![entity("b", "J-2")]);
        assert!(!store.is_stale());
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_status_counts_include_empty_statuses() {
        let store = EntityStore::from_entities(vec![entity("a", "J-1"), entity("b", "J-2")]);
        let counts = store.status_counts();
        assert_eq!(counts[&Status::Untouched], 2);
        assert_eq!(counts[&Status::Worked], 0);
        assert_eq!(counts.len(), Status::ALL.len());
    }
}
