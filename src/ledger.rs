//! Session ledger: every committed item for the active scanning session.
//!
//! Entries are append-only. A token scanned twice gets two entries; nothing is
//! overwritten, corrected or deleted short of a full `reset`. Totals are always
//! folded from the entries on demand rather than tracked in a counter.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::category::Classification;
use crate::frame::ImageRegion;
use crate::normalize::Token;

/// One committed item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub token: Token,
    pub category: String,
    pub value: u64,
    /// 0-based position in commit order across the whole session.
    pub sequence: u64,
}

/// Per-category aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub count: u64,
    pub value: u64,
}

#[derive(Debug, Default)]
pub struct SessionLedger {
    entries: HashMap<Token, Vec<LedgerEntry>>,
    images: Vec<ImageRegion>,
    commits: u64,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed item and its image.
    pub fn commit(
        &mut self,
        token: Token,
        classification: &Classification,
        image: ImageRegion,
    ) -> &LedgerEntry {
        let entry = LedgerEntry {
            token: token.clone(),
            category: classification.category.clone(),
            value: classification.value,
            sequence: self.commits,
        };
        self.commits += 1;
        self.images.push(image);

        let list = self.entries.entry(token).or_default();
        list.push(entry);
        &list[list.len() - 1]
    }

    /// Sum of every entry's value, in minor units.
    pub fn running_total(&self) -> u64 {
        self.entries
            .values()
            .flatten()
            .map(|entry| entry.value)
            .sum()
    }

    /// Count and value per category name, ordered by name.
    pub fn totals_by_category(&self) -> BTreeMap<String, CategoryTotal> {
        self.entries
            .values()
            .flatten()
            .fold(BTreeMap::new(), |mut acc, entry| {
                let total: &mut CategoryTotal = acc.entry(entry.category.clone()).or_default();
                total.count += 1;
                total.value += entry.value;
                acc
            })
    }

    pub fn item_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn entries_for(&self, token: &Token) -> &[LedgerEntry] {
        self.entries.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries in commit order.
    pub fn entries(&self) -> Vec<&LedgerEntry> {
        let mut all: Vec<&LedgerEntry> = self.entries.values().flatten().collect();
        all.sort_by_key(|entry| entry.sequence);
        all
    }

    pub fn distinct_tokens(&self) -> usize {
        self.entries.len()
    }

    /// Saved images, one per commit, in commit order.
    pub fn saved_images(&self) -> &[ImageRegion] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.commits == 0
    }

    /// Drop every entry and image.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.images.clear();
        self.commits = 0;
    }
}
