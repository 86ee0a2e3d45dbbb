//! Record arena and secondary indices.
//!
//! Records live in a growable array; indices hold integer positions into it.
//! Eviction drops the oldest excess and rebuilds every index in one
//! compacting pass, since every surviving position shifts.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use metrik_core::record::MetricRecord;

use super::MetricQuery;

#[derive(Default)]
struct Indexes {
    metric_id: HashMap<String, BTreeSet<usize>>,
    source: HashMap<String, BTreeSet<usize>>,
    tags: HashMap<String, BTreeSet<usize>>,
}

impl Indexes {
    fn insert(&mut self, pos: usize, record: &MetricRecord) {
        self.metric_id
            .entry(record.metric_id.clone())
            .or_default()
            .insert(pos);
        if let Some(source) = &record.source {
            self.source.entry(source.clone()).or_default().insert(pos);
        }
        for tag in &record.tags {
            self.tags.entry(tag.clone()).or_default().insert(pos);
        }
    }

    fn rebuild(records: &[MetricRecord]) -> Indexes {
        let mut idx = Indexes::default();
        for (pos, record) in records.iter().enumerate() {
            idx.insert(pos, record);
        }
        idx
    }
}

pub(super) struct MemoryStore {
    records: Vec<MetricRecord>,
    indexes: Indexes,
}

impl MemoryStore {
    pub(super) fn new() -> Self {
        Self {
            records: Vec::new(),
            indexes: Indexes::default(),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.records.len()
    }

    pub(super) fn append(&mut self, record: MetricRecord) {
        let pos = self.records.len();
        self.indexes.insert(pos, &record);
        self.records.push(record);
    }

    /// Drop the oldest records until `capacity` remain, then rebuild all
    /// three indices with renumbered positions.
    pub(super) fn trim_to(&mut self, capacity: usize) {
        let excess = self.records.len().saturating_sub(capacity);
        if excess == 0 {
            return;
        }
        self.records.drain(..excess);
        self.indexes = Indexes::rebuild(&self.records);
        tracing::debug!(dropped = excess, remaining = self.records.len(), "trimmed memory store");
    }

    pub(super) fn oldest_timestamp(&self) -> Option<String> {
        self.records
            .iter()
            .map(|r| r.timestamp.as_str())
            .min()
            .map(str::to_string)
    }

    /// Candidate positions for the supplied index filters. `None` means no
    /// filter was supplied (full scan); a supplied filter with no index entry
    /// yields an empty set rather than silently matching everything.
    fn candidates(&self, q: &MetricQuery) -> Option<BTreeSet<usize>> {
        let mut acc: Option<BTreeSet<usize>> = None;

        let mut intersect = |set: BTreeSet<usize>| {
            acc = Some(match acc.take() {
                None => set,
                Some(prev) => prev.intersection(&set).copied().collect(),
            });
        };

        if let Some(metric_id) = &q.metric_id {
            intersect(self.indexes.metric_id.get(metric_id).cloned().unwrap_or_default());
        }
        if let Some(source) = &q.source {
            intersect(self.indexes.source.get(source).cloned().unwrap_or_default());
        }
        if let Some(tags) = &q.tags {
            if !tags.is_empty() {
                // OR across the given tags, AND with the other filters
                let mut union = BTreeSet::new();
                for tag in tags {
                    if let Some(set) = self.indexes.tags.get(tag) {
                        union.extend(set.iter().copied());
                    }
                }
                intersect(union);
            }
        }

        acc
    }

    pub(super) fn query(&self, q: &MetricQuery) -> Vec<MetricRecord> {
        let positions: Vec<usize> = match self.candidates(q) {
            Some(set) => set.into_iter().collect(),
            None => (0..self.records.len()).collect(),
        };

        let mut matched: Vec<&MetricRecord> = positions
            .into_iter()
            .filter_map(|pos| self.records.get(pos))
            .filter(|rec| {
                if let Some(start) = &q.start_time {
                    if rec.timestamp.as_str() < start.as_str() {
                        return false;
                    }
                }
                if let Some(end) = &q.end_time {
                    if rec.timestamp.as_str() > end.as_str() {
                        return false;
                    }
                }
                true
            })
            .collect();

        if let Some((field, direction)) = q.sort.split_once(':') {
            let descending = direction.eq_ignore_ascii_case("desc");
            matched.sort_by(|a, b| {
                let ord = compare_field(a, b, field);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        matched
            .into_iter()
            .skip(q.offset)
            .take(q.limit)
            .cloned()
            .collect()
    }

    pub(super) fn indices_consistent(&self) -> bool {
        let expected = Indexes::rebuild(&self.records);
        let bound = self.records.len();
        let within = |m: &HashMap<String, BTreeSet<usize>>| {
            m.values().flatten().all(|&pos| pos < bound)
        };
        self.indexes.metric_id == expected.metric_id
            && self.indexes.source == expected.source
            && self.indexes.tags == expected.tags
            && within(&self.indexes.metric_id)
            && within(&self.indexes.source)
            && within(&self.indexes.tags)
    }
}

/// Stable sort comparator. An unknown field compares everything equal, which
/// leaves the insertion order untouched.
fn compare_field(a: &MetricRecord, b: &MetricRecord, field: &str) -> Ordering {
    match field {
        "timestamp" => a.timestamp.cmp(&b.timestamp),
        "metric_id" => a.metric_id.cmp(&b.metric_id),
        "source" => a.source.as_deref().unwrap_or("").cmp(b.source.as_deref().unwrap_or("")),
        "value" => match (a.value.as_f64(), b.value.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}
