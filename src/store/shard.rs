//! Per-symbol shard: book levels and subscriber list.

use super::book::{BookEntry, BookSide, MarketUpdate, OrderBook};
use crate::arena::{Arena, ArenaError, BlockHandle};
use parking_lot::RwLock;
use std::sync::Arc;

/// Callback invoked with every update applied to a subscribed symbol.
///
/// Runs on the thread that processed the update, after the book lock was
/// released. Panics are caught, logged and counted.
pub type MarketDataCallback = Arc<dyn Fn(&MarketUpdate) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) callback: MarketDataCallback,
}

/// Mutable book of one symbol. Levels are arena blocks, best price first.
#[derive(Default)]
pub(crate) struct BookState {
    pub(crate) active: bool,
    timestamp: u64,
    bids: Vec<BlockHandle>,
    asks: Vec<BlockHandle>,
}

enum Slot {
    Existing(usize),
    Insert(usize),
}

impl BookState {
    /// Applies both sides of `update`. Returns the number of levels that could
    /// not be stored because the arena was exhausted.
    pub(crate) fn apply(
        &mut self,
        update: &MarketUpdate,
        entries: &Arena<BookEntry>,
        max_depth: usize,
    ) -> usize {
        let mut failures = 0;
        let sides = [
            (BookSide::Bid, update.bid_price),
            (BookSide::Ask, update.ask_price),
        ];
        for (side, price) in sides {
            let levels = match side {
                BookSide::Bid => &mut self.bids,
                BookSide::Ask => &mut self.asks,
            };
            if upsert_level(levels, entries, side, price, update.volume, max_depth).is_err() {
                failures += 1;
            }
        }
        self.timestamp = update.timestamp;
        failures
    }

    /// Returns every level to the arena and forgets the timestamp.
    pub(crate) fn clear(&mut self, entries: &Arena<BookEntry>) {
        entries.bulk_deallocate(std::mem::take(&mut self.bids));
        entries.bulk_deallocate(std::mem::take(&mut self.asks));
        self.timestamp = 0;
    }

    pub(crate) fn snapshot(&self, symbol: &str, entries: &Arena<BookEntry>) -> OrderBook {
        OrderBook {
            symbol: symbol.to_string(),
            timestamp: self.timestamp,
            bids: self.bids.iter().map(|h| *entries.get(h)).collect(),
            asks: self.asks.iter().map(|h| *entries.get(h)).collect(),
        }
    }
}

/// Inserts or updates the level at `price`, keeping `levels` ordered best
/// first and at most `max_depth` long. A zero size removes the level.
fn upsert_level(
    levels: &mut Vec<BlockHandle>,
    entries: &Arena<BookEntry>,
    side: BookSide,
    price: f64,
    size: u64,
    max_depth: usize,
) -> Result<(), ArenaError> {
    if !price.is_finite() {
        return Ok(());
    }

    let mut slot = Slot::Insert(levels.len());
    for (position, handle) in levels.iter().enumerate() {
        let existing = entries.get(handle).price;
        if existing.total_cmp(&price).is_eq() {
            slot = Slot::Existing(position);
            break;
        }
        if side.is_better(price, existing) {
            slot = Slot::Insert(position);
            break;
        }
    }

    match slot {
        Slot::Existing(position) if size == 0 => {
            entries.deallocate(levels.remove(position));
        }
        Slot::Existing(position) => {
            entries.get_mut(&mut levels[position]).size = size;
        }
        Slot::Insert(position) => {
            if size == 0 || position >= max_depth {
                return Ok(());
            }
            let handle = entries.allocate_with(side.into(), BookEntry::new(price, size))?;
            levels.insert(position, handle);
            if levels.len() > max_depth
                && let Some(worst) = levels.pop()
            {
                entries.deallocate(worst);
            }
        }
    }
    Ok(())
}

/// Book and subscribers of one symbol, each behind its own lock.
///
/// Lock order is subscribers, then book. Update processing never holds both.
pub(crate) struct SymbolShard {
    pub(crate) symbol: String,
    pub(crate) book: RwLock<BookState>,
    subscribers: RwLock<Arc<Vec<Subscriber>>>,
}

impl SymbolShard {
    pub(crate) fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            book: RwLock::new(BookState::default()),
            subscribers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current subscriber list. Later changes do not affect the returned copy.
    pub(crate) fn subscribers(&self) -> Arc<Vec<Subscriber>> {
        Arc::clone(&self.subscribers.read())
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Registers a subscriber and activates the book.
    pub(crate) fn add_subscriber(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.write();
        let mut list = Vec::with_capacity(subscribers.len() + 1);
        list.extend(subscribers.iter().cloned());
        list.push(subscriber);
        *subscribers = Arc::new(list);
        self.book.write().active = true;
    }

    /// Removes one subscriber. The last one leaving deactivates and clears the
    /// book. Returns `false` if the id was not registered.
    pub(crate) fn remove_subscriber(&self, id: u64, entries: &Arena<BookEntry>) -> bool {
        let mut subscribers = self.subscribers.write();
        if !subscribers.iter().any(|s| s.id == id) {
            return false;
        }
        let list: Vec<Subscriber> = subscribers.iter().filter(|s| s.id != id).cloned().collect();
        if list.is_empty() {
            let mut book = self.book.write();
            book.active = false;
            book.clear(entries);
        }
        *subscribers = Arc::new(list);
        true
    }

    /// Drops every subscriber, deactivates and clears the book. Returns whether
    /// the book was active.
    pub(crate) fn deactivate(&self, entries: &Arena<BookEntry>) -> bool {
        let mut subscribers = self.subscribers.write();
        *subscribers = Arc::new(Vec::new());
        let mut book = self.book.write();
        let was_active = book.active;
        book.active = false;
        book.clear(entries);
        was_active
    }
}
