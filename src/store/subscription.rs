//! Scope-bound subscriptions.

use super::book::BookEntry;
use super::shard::SymbolShard;
use crate::arena::Arena;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Guard for one registered callback.
///
/// Dropping the guard (or calling [`cancel`](Subscription::cancel))
/// deregisters the callback. When it was the symbol's last subscriber the book
/// is cleared and further updates for the symbol are dropped. The guard does
/// not keep the store alive.
#[must_use = "dropping a Subscription immediately unsubscribes its callback"]
pub struct Subscription {
    id: u64,
    shard: Weak<SymbolShard>,
    entries: Weak<Arena<BookEntry>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = self.shard.upgrade().map(|shard| shard.symbol.clone());
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("symbol", &symbol)
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(id: u64, shard: &Arc<SymbolShard>, entries: &Arc<Arena<BookEntry>>) -> Self {
        Self {
            id,
            shard: Arc::downgrade(shard),
            entries: Arc::downgrade(entries),
        }
    }

    /// Identifier of the registered callback.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Deregisters the callback now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(shard), Some(entries)) = (self.shard.upgrade(), self.entries.upgrade())
            && shard.remove_subscriber(self.id, &entries)
        {
            debug!(symbol = %shard.symbol, subscriber = self.id, "subscription dropped");
        }
    }
}
