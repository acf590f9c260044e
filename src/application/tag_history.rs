//! Bounded most-recently-used history of tag-sets.
//!
//! Entries are keyed by a canonical form (sorted tags joined with
//! [`TAG_SEPARATOR`]) so the same set entered in a different order is one
//! entry. Recency is ordered by `last_used_at`, with a monotonic sequence
//! number breaking timestamp ties in insertion order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::domain::{dedup_tags, ErrorKind, TagHistoryEntry};

/// Joins sorted tags into a key. Tags may not contain it.
pub const TAG_SEPARATOR: char = '\u{1f}';

/// Reject tags that cannot be stored or passed to the tool.
///
/// # Errors
/// Returns `ErrorKind::InvalidTag` for a blank tag or one containing
/// [`TAG_SEPARATOR`].
pub fn validate_tags(tags: &[String]) -> Result<(), ErrorKind> {
    match tags
        .iter()
        .find(|t| t.trim().is_empty() || t.contains(TAG_SEPARATOR))
    {
        Some(bad) => Err(ErrorKind::InvalidTag { tag: bad.clone() }),
        None => Ok(()),
    }
}

/// Canonical key for a tag-set.
#[must_use]
pub fn canonical_key(tags: &[String]) -> String {
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(&TAG_SEPARATOR.to_string())
}

/// Position in recency order: oldest sorts first.
type Recency = (DateTime<Utc>, u64);

#[derive(Debug, Clone)]
struct Slot {
    recency: Recency,
    entry: TagHistoryEntry,
}

/// In-memory LRU set of tag-sets, owned by the sync engine.
#[derive(Debug, Clone)]
pub struct TagHistory {
    capacity: usize,
    next_seq: u64,
    slots: HashMap<String, Slot>,
    order: BTreeMap<Recency, String>,
}

impl TagHistory {
    /// Create an empty history holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            slots: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    /// Record a use of `tags` now.
    ///
    /// Returns `Ok(false)` for an empty set, which is not recorded.
    ///
    /// # Errors
    /// Returns `ErrorKind::InvalidTag` if any tag is rejected by
    /// [`validate_tags`].
    pub fn record(&mut self, tags: &[String]) -> Result<bool, ErrorKind> {
        self.record_at(tags, Utc::now())
    }

    /// Record a use of `tags` at `used_at`. Duplicate tags are dropped,
    /// keeping first occurrences.
    ///
    /// # Errors
    /// See [`TagHistory::record`].
    pub fn record_at(&mut self, tags: &[String], used_at: DateTime<Utc>) -> Result<bool, ErrorKind> {
        if tags.is_empty() {
            return Ok(false);
        }
        validate_tags(tags)?;

        let tags = dedup_tags(tags.iter().cloned());
        let key = canonical_key(&tags);
        let recency = (used_at, self.next_seq);
        self.next_seq += 1;

        if let Some(slot) = self.slots.get_mut(&key) {
            self.order.remove(&slot.recency);
            slot.recency = recency;
            slot.entry.raw_tags = tags;
            slot.entry.last_used_at = used_at;
            self.order.insert(recency, key);
            return Ok(true);
        }

        if self.slots.len() >= self.capacity {
            self.evict_oldest();
        }

        self.order.insert(recency, key.clone());
        self.slots.insert(
            key.clone(),
            Slot {
                recency,
                entry: TagHistoryEntry {
                    tag_set_key: key,
                    raw_tags: tags,
                    last_used_at: used_at,
                },
            },
        );
        Ok(true)
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.slots.remove(&key);
            tracing::debug!(evicted = %key.replace(TAG_SEPARATOR, " "), "Tag history full, evicted oldest entry");
        }
    }

    /// Entries, most recently used first.
    #[must_use]
    pub fn list(&self) -> Vec<TagHistoryEntry> {
        self.order
            .values()
            .rev()
            .filter_map(|key| self.slots.get(key))
            .map(|slot| slot.entry.clone())
            .collect()
    }

    /// Tags of the most recently used entry.
    #[must_use]
    pub fn most_recent(&self) -> Option<&[String]> {
        self.order
            .last_key_value()
            .and_then(|(_, key)| self.slots.get(key))
            .map(|slot| slot.entry.raw_tags.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_record_is_noop() {
        let mut history = TagHistory::new(10);
        assert!(!history.record(&[]).unwrap());
        assert!(history.is_empty());
    }

    #[test]
    fn test_reordered_tags_are_one_entry() {
        let mut history = TagHistory::new(10);
        history.record_at(&tags(&["work", "project"]), t0()).unwrap();
        let later = t0() + Duration::minutes(5);
        history.record_at(&tags(&["project", "work"]), later).unwrap();

        let entries = history.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].last_used_at, later);
        assert_eq!(entries[0].raw_tags, tags(&["project", "work"]));
        assert_eq!(entries[0].tag_set_key, format!("project{TAG_SEPARATOR}work"));
    }

    #[test]
    fn test_case_sensitive_keys() {
        let mut history = TagHistory::new(10);
        history.record(&tags(&["Work"])).unwrap();
        history.record(&tags(&["work"])).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let mut history = TagHistory::new(10);
        history.record(&tags(&["a"])).unwrap();
        history.record(&tags(&["b"])).unwrap();
        history.record(&tags(&["a"])).unwrap();

        let keys: Vec<String> = history.list().into_iter().map(|e| e.tag_set_key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(history.most_recent(), Some(tags(&["a"]).as_slice()));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut history = TagHistory::new(100);
        for i in 0..100 {
            history.record_at(&[format!("tag{i}")], t0()).unwrap();
        }
        // Touch the oldest so tag1 becomes the eviction candidate.
        history.record_at(&tags(&["tag0"]), t0()).unwrap();

        history.record_at(&tags(&["new"]), t0()).unwrap();

        assert_eq!(history.len(), 100);
        let keys: Vec<String> = history.list().into_iter().map(|e| e.tag_set_key).collect();
        assert!(!keys.contains(&"tag1".to_string()));
        assert!(keys.contains(&"tag0".to_string()));
        assert!(keys.contains(&"tag2".to_string()));
        assert_eq!(keys[0], "new");
    }

    #[test]
    fn test_eviction_follows_last_used_at() {
        let mut history = TagHistory::new(2);
        history.record_at(&tags(&["late"]), t0() + Duration::hours(1)).unwrap();
        history.record_at(&tags(&["early"]), t0()).unwrap();
        history.record_at(&tags(&["new"]), t0() + Duration::hours(2)).unwrap();

        let keys: Vec<String> = history.list().into_iter().map(|e| e.tag_set_key).collect();
        assert_eq!(keys, vec!["new", "late"]);
    }

    #[test]
    fn test_duplicate_tags_are_one_entry() {
        let mut history = TagHistory::new(10);
        history.record(&tags(&["a", "a"])).unwrap();
        history.record(&tags(&["a"])).unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history.most_recent(), Some(tags(&["a"]).as_slice()));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = TagHistory::new(3);
        for i in 0..50 {
            history.record(&[format!("t{i}")]).unwrap();
            assert!(history.len() <= 3);
        }
    }

    #[test]
    fn test_separator_rejected() {
        let mut history = TagHistory::new(10);
        let err = history
            .record(&[format!("bad{TAG_SEPARATOR}tag")])
            .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidTag { .. }));
        assert!(history.is_empty());
    }

    #[test]
    fn test_blank_tag_rejected() {
        assert!(validate_tags(&tags(&["ok", " "])).is_err());
        assert!(validate_tags(&tags(&["ok", "fine"])).is_ok());
    }
}
