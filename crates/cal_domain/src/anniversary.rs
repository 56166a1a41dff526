use std::fmt;

use cal_core::AnniversaryIndex;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A dated label shown in the grid. Managed entries come from the holiday feed
/// and are replaced wholesale on every sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anniversary {
    pub date: NaiveDate,
    pub label: String,
    #[serde(default)]
    pub is_managed: bool,
}

impl Anniversary {
    pub fn user(date: NaiveDate, label: &str) -> Result<Self, DomainError> {
        Self::with_provenance(date, label, false)
    }

    pub fn managed(date: NaiveDate, label: &str) -> Result<Self, DomainError> {
        Self::with_provenance(date, label, true)
    }

    fn with_provenance(date: NaiveDate, label: &str, is_managed: bool) -> Result<Self, DomainError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DomainError::BlankLabel);
        }
        Ok(Self {
            date,
            label: label.to_string(),
            is_managed,
        })
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_managed {
            "祝日"
        } else {
            "記念日"
        }
    }
}

impl fmt::Display for Anniversary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.date.format("%Y-%m-%d"), self.label)
    }
}

/// Anniversaries in insertion order. Several entries may share a date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AnniversaryStore {
    entries: Vec<Anniversary>,
}

impl AnniversaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anniversary> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Anniversary> {
        self.entries.get(index)
    }

    /// Adds a user entry. Duplicates are allowed here; only the holiday merge dedupes.
    pub fn add_user(&mut self, date: NaiveDate, label: &str) -> Result<&Anniversary, DomainError> {
        Ok(self.push(Anniversary::user(date, label)?))
    }

    pub fn insert_managed(
        &mut self,
        date: NaiveDate,
        label: &str,
    ) -> Result<&Anniversary, DomainError> {
        Ok(self.push(Anniversary::managed(date, label)?))
    }

    fn push(&mut self, entry: Anniversary) -> &Anniversary {
        self.entries.push(entry);
        let idx = self.entries.len() - 1;
        &self.entries[idx]
    }

    pub fn remove(&mut self, index: usize) -> Result<Anniversary, DomainError> {
        if index >= self.entries.len() {
            return Err(DomainError::InvalidAnniversaryIndex(index));
        }
        Ok(self.entries.remove(index))
    }

    /// Drops every managed entry and returns how many were removed.
    pub fn remove_managed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_managed);
        before - self.entries.len()
    }

    /// Exact, case-sensitive match on date and label regardless of provenance.
    pub fn contains(&self, date: NaiveDate, label: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.date == date && entry.label == label)
    }

    pub fn has_managed(&self) -> bool {
        self.entries.iter().any(|entry| entry.is_managed)
    }

    pub fn user_entries(&self) -> impl Iterator<Item = &Anniversary> {
        self.entries.iter().filter(|entry| !entry.is_managed)
    }

    pub fn managed_entries(&self) -> impl Iterator<Item = &Anniversary> {
        self.entries.iter().filter(|entry| entry.is_managed)
    }

    /// Groups labels by date, keeping store order inside each date.
    pub fn group_by_date(&self) -> AnniversaryIndex {
        let mut index = AnniversaryIndex::new();
        for entry in &self.entries {
            if entry.label.trim().is_empty() {
                continue;
            }
            index
                .entry(entry.date)
                .or_default()
                .push(entry.label.clone());
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn user_labels_are_trimmed_and_must_not_be_blank() {
        let mut store = AnniversaryStore::new();
        let entry = store.add_user(date(2025, 2, 14), "  Valentine  ").unwrap();
        assert_eq!(entry.label, "Valentine");
        assert!(!entry.is_managed);
        assert_eq!(entry.kind_label(), "記念日");
        assert_eq!(
            store.add_user(date(2025, 2, 14), " \t "),
            Err(DomainError::BlankLabel)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn user_adds_do_not_deduplicate() {
        let mut store = AnniversaryStore::new();
        store.add_user(date(2025, 1, 1), "Party").unwrap();
        store.add_user(date(2025, 1, 1), "Party").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn grouping_keeps_insertion_order_within_a_date() {
        let mut store = AnniversaryStore::new();
        store.add_user(date(2025, 1, 1), "B").unwrap();
        store.insert_managed(date(2025, 1, 1), "元日").unwrap();
        store.add_user(date(2025, 1, 2), "C").unwrap();
        store.add_user(date(2025, 1, 1), "A").unwrap();

        let index = store.group_by_date();
        assert_eq!(index[&date(2025, 1, 1)], vec!["B", "元日", "A"]);
        assert_eq!(index[&date(2025, 1, 2)], vec!["C"]);
    }

    #[test]
    fn removing_managed_entries_keeps_user_entries() {
        let mut store = AnniversaryStore::new();
        store.add_user(date(2025, 1, 1), "Party").unwrap();
        store.insert_managed(date(2025, 1, 1), "元日").unwrap();
        store.insert_managed(date(2025, 1, 13), "成人の日").unwrap();

        assert!(store.has_managed());
        assert_eq!(store.managed_entries().count(), 2);
        assert_eq!(store.remove_managed(), 2);
        assert!(!store.has_managed());
        assert_eq!(store.user_entries().count(), 1);
    }

    #[test]
    fn remove_by_index() {
        let mut store = AnniversaryStore::new();
        store.add_user(date(2025, 3, 3), "Doll festival").unwrap();
        assert_eq!(
            store.remove(3),
            Err(DomainError::InvalidAnniversaryIndex(3))
        );
        let removed = store.remove(0).unwrap();
        assert_eq!(removed.to_string(), "2025-03-03: Doll festival");
        assert!(store.is_empty());
    }
}
