use std::collections::BTreeSet;

use crate::entry::{BlockEntry, BlockKind, BlockList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Insert,
    Delete,
}

impl UpdateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        }
    }
}

/// A single mutation inside a batched firewall update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUpdate {
    pub action: UpdateAction,
    pub entry: BlockEntry,
}

impl BlockUpdate {
    pub fn insert(entry: BlockEntry) -> Self {
        Self {
            action: UpdateAction::Insert,
            entry,
        }
    }

    pub fn delete(entry: BlockEntry) -> Self {
        Self {
            action: UpdateAction::Delete,
            entry,
        }
    }
}

/// Minimal changes that turn one partition of a block list into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub to_add: BTreeSet<BlockEntry>,
    pub to_remove: BTreeSet<BlockEntry>,
}

impl Diff {
    pub fn between(desired: &BTreeSet<BlockEntry>, current: &BTreeSet<BlockEntry>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// All deletes first, then all inserts. Removing before adding keeps the
    /// firewall from seeing a transient duplicate entry.
    pub fn updates(&self) -> Vec<BlockUpdate> {
        self.to_remove
            .iter()
            .cloned()
            .map(BlockUpdate::delete)
            .chain(self.to_add.iter().cloned().map(BlockUpdate::insert))
            .collect()
    }
}

/// Per-kind diffs for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub countries: Diff,
    pub ips: Diff,
}

impl ReconcilePlan {
    pub fn compute(desired: &BlockList, current: &BlockList) -> Self {
        Self {
            countries: Diff::between(&desired.countries, &current.countries),
            ips: Diff::between(&desired.ips, &current.ips),
        }
    }

    pub fn for_kind(&self, kind: BlockKind) -> &Diff {
        match kind {
            BlockKind::Country => &self.countries,
            BlockKind::IpAddress => &self.ips,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.ips.is_empty()
    }
}

/// Every entry of `current` scheduled for deletion.
pub fn clear_updates(current: &BTreeSet<BlockEntry>) -> Vec<BlockUpdate> {
    Diff::between(&BTreeSet::new(), current).updates()
}
