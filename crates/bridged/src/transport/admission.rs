//! Connection admission control.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts active connection workers against a fixed ceiling.
#[derive(Debug, Clone)]
pub(super) struct ConnectionSlots {
    active: Arc<AtomicUsize>,
    limit: usize,
}

impl ConnectionSlots {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// Number of connections currently being served.
    pub(super) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Claims a slot, or returns `None` when every slot is taken.
    pub(super) fn try_acquire(&self) -> Option<SlotPermit> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < self.limit).then_some(active + 1)
            })
            .ok()
            .map(|_| SlotPermit {
                active: Arc::clone(&self.active),
            })
    }
}

/// Releases its slot when dropped.
#[derive(Debug)]
pub(super) struct SlotPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_released_on_drop() {
        let slots = ConnectionSlots::new(2);
        let first = slots.try_acquire().expect("first slot");
        let _second = slots.try_acquire().expect("second slot");
        assert!(slots.try_acquire().is_none());

        assert_eq!(slots.active(), 2);

        drop(first);
        assert_eq!(slots.active(), 1);
        assert!(slots.try_acquire().is_some());
    }
}
