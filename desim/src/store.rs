use std::collections::VecDeque;
use std::fmt;

use crate::Scheduler;

/// Callback resuming a process with the item it was waiting for.
pub(crate) type Consumer<T> = Box<dyn FnOnce(T, &mut Scheduler)>;

/// Unbounded FIFO buffer of items with FIFO consumers.
///
/// An item put while some consumer is waiting goes directly to the earliest one, so there are
/// never items and waiting consumers at the same time.
pub struct Store<T> {
    items: VecDeque<T>,
    pending: VecDeque<Consumer<T>>,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::default(),
            pending: VecDeque::default(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("items", &self.items)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<T> Store<T> {
    pub(crate) fn put(&mut self, item: T, scheduler: &mut Scheduler) {
        if let Some(consumer) = self.pending.pop_front() {
            consumer(item, scheduler);
        } else {
            self.items.push_back(item);
        }
        debug_assert!(self.pending.is_empty() || self.items.is_empty());
    }

    pub(crate) fn get(&mut self, consumer: Consumer<T>, scheduler: &mut Scheduler) {
        if let Some(item) = self.items.pop_front() {
            consumer(item, scheduler);
        } else {
            self.pending.push_back(consumer);
        }
        debug_assert!(self.pending.is_empty() || self.items.is_empty());
    }

    /// Returns the number of items in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the store has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of consumers waiting for an item.
    #[must_use]
    pub fn pending_gets(&self) -> usize {
        self.pending.len()
    }

    /// Iterates over the stored items, from the earliest one.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
