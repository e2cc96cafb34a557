//! Day windows and label segmentation
//!
//! Labels, when present, are authoritative. Missing labels land in the
//! `UNLABELED` bucket, which is never conflated with episode or day 0.

use std::collections::BTreeMap;

use crate::state::{ActionLogEntry, ReflectionLogEntry, SupervisorMessage};

pub const UNLABELED: i64 = -1;

/// Records that may carry episode/day labels
pub trait Labeled {
    fn episode_index(&self) -> Option<i64>;
    fn day_index(&self) -> Option<i64>;
}

impl Labeled for ActionLogEntry {
    fn episode_index(&self) -> Option<i64> {
        self.episode_index
    }

    fn day_index(&self) -> Option<i64> {
        self.day_index
    }
}

impl Labeled for ReflectionLogEntry {
    fn episode_index(&self) -> Option<i64> {
        self.episode_index
    }

    fn day_index(&self) -> Option<i64> {
        self.day_index
    }
}

impl Labeled for SupervisorMessage {
    fn episode_index(&self) -> Option<i64> {
        self.episode_index
    }

    fn day_index(&self) -> Option<i64> {
        self.day_index
    }
}

pub fn day_of_step(step: u64, steps_per_day: u64) -> i64 {
    (step / steps_per_day.max(1)) as i64
}

/// `d*S <= step < (d+1)*S`
pub fn in_day_window(step: u64, day_index: i64, steps_per_day: u64) -> bool {
    day_index >= 0 && day_of_step(step, steps_per_day) == day_index
}

/// Entries belonging to `day_index`, optionally restricted to one episode
pub fn entries_for_day(
    entries: &[ActionLogEntry],
    day_index: i64,
    steps_per_day: u64,
    episode_index: Option<i64>,
) -> Vec<&ActionLogEntry> {
    entries
        .iter()
        .filter(|e| episode_index.is_none() || e.episode_index == episode_index)
        .filter(|e| match e.day_index {
            Some(d) => d == day_index,
            None => in_day_window(e.step, day_index, steps_per_day),
        })
        .collect()
}

/// Group by episode label, order preserved within each bucket
pub fn segment_by_episode<T: Labeled>(records: &[T]) -> BTreeMap<i64, Vec<&T>> {
    let mut buckets: BTreeMap<i64, Vec<&T>> = BTreeMap::new();
    for record in records {
        buckets
            .entry(record.episode_index().unwrap_or(UNLABELED))
            .or_default()
            .push(record);
    }
    buckets
}

/// Group by day label, order preserved within each bucket
pub fn segment_by_day<T: Labeled>(records: &[T]) -> BTreeMap<i64, Vec<&T>> {
    let mut buckets: BTreeMap<i64, Vec<&T>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.day_index().unwrap_or(UNLABELED)).or_default().push(record);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step: u64, agent: &str) -> ActionLogEntry {
        ActionLogEntry {
            step,
            agent_name: agent.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_day_boundaries() {
        assert_eq!(day_of_step(49, 50), 0);
        assert_eq!(day_of_step(50, 50), 1);
        assert!(in_day_window(49, 0, 50));
        assert!(!in_day_window(50, 0, 50));
        assert!(in_day_window(50, 1, 50));
        assert!(!in_day_window(0, -1, 50));
    }

    #[test]
    fn test_disjoint_days() {
        let entries: Vec<ActionLogEntry> = (0..10)
            .map(|s| entry(s, "A"))
            .chain((10..20).map(|s| entry(s, "B")))
            .collect();

        let day0 = entries_for_day(&entries, 0, 10, None);
        let day1 = entries_for_day(&entries, 1, 10, None);
        assert_eq!(day0.len(), 10);
        assert!(day0.iter().all(|e| e.agent_name == "A"));
        assert!(day1.iter().all(|e| e.agent_name == "B"));
    }

    #[test]
    fn test_labels_are_authoritative() {
        let labeled = entry(3, "A").with_labels(Some(2), Some(1));
        let entries = vec![labeled, entry(3, "B")];

        let day1 = entries_for_day(&entries, 1, 10, None);
        assert_eq!(day1.len(), 1);
        assert_eq!(day1[0].agent_name, "A");

        let day0 = entries_for_day(&entries, 0, 10, None);
        assert_eq!(day0.len(), 1);
        assert_eq!(day0[0].agent_name, "B");

        assert!(entries_for_day(&entries, 1, 10, Some(3)).is_empty());
    }

    #[test]
    fn test_segmentation_sentinel() {
        let entries = vec![
            entry(0, "A").with_labels(Some(0), Some(0)),
            entry(1, "A"),
            entry(2, "A").with_labels(Some(0), Some(1)),
        ];
        let by_episode = segment_by_episode(&entries);
        assert_eq!(by_episode[&0].len(), 2);
        assert_eq!(by_episode[&UNLABELED].len(), 1);

        let by_day = segment_by_day(&entries);
        assert_eq!(by_day.keys().copied().collect::<Vec<_>>(), vec![UNLABELED, 0, 1]);
    }
}
