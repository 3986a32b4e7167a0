use std::collections::HashMap;

use tokio::sync::watch;

use kickfeed_core::resources::ResourceKind;

/// Per-kind generation counters bumped after each committed write.
///
/// Readers hold a receiver and re-query when it changes; they never see the
/// counter value itself as meaningful.
#[derive(Debug)]
pub struct InvalidationTracker {
    tables: HashMap<ResourceKind, watch::Sender<u64>>,
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationTracker {
    pub fn new() -> Self {
        let tables = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, watch::channel(0).0))
            .collect();
        Self { tables }
    }

    pub fn subscribe(&self, kind: ResourceKind) -> watch::Receiver<u64> {
        match self.tables.get(&kind) {
            Some(sender) => sender.subscribe(),
            None => watch::channel(0).1,
        }
    }

    pub fn invalidate(&self, kind: ResourceKind) {
        if let Some(sender) = self.tables.get(&kind) {
            sender.send_modify(|generation| *generation = generation.wrapping_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_wakes_only_its_kind() {
        let tracker = InvalidationTracker::new();
        let mut news = tracker.subscribe(ResourceKind::News);
        let mut transfers = tracker.subscribe(ResourceKind::Transfer);
        news.borrow_and_update();
        transfers.borrow_and_update();

        tracker.invalidate(ResourceKind::News);
        assert!(news.has_changed().expect("open"));
        assert!(!transfers.has_changed().expect("open"));
    }
}
