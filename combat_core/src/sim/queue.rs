//! Pending action queue ordered by time, then priority, then insertion

use super::Sim;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Deferred work run against the simulation
pub type Action = Box<dyn FnOnce(&mut Sim)>;

/// Tie-break priorities for actions scheduled at the same instant
///
/// Higher values run first.
pub struct ActionPriority;

impl ActionPriority {
    pub const HIGH: i32 = 10;
    pub const DOT: i32 = 3;
    pub const AUTO: i32 = 2;
    pub const DEFAULT: i32 = 0;
    /// Aura expiry runs after everything else due at the same instant
    pub const EXPIRE: i32 = -1;
}

struct PendingAction {
    at: Duration,
    priority: i32,
    seq: u64,
    action: Action,
}

impl PartialEq for PendingAction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingAction {}

impl PartialOrd for PendingAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAction {
    // BinaryHeap is a max-heap; the "greatest" action is the one due first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<PendingAction>,
    next_seq: u64,
}

impl EventQueue {
    pub(crate) fn push(&mut self, at: Duration, priority: i32, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PendingAction {
            at,
            priority,
            seq,
            action,
        });
    }

    pub(crate) fn peek_time(&self) -> Option<Duration> {
        self.heap.peek().map(|p| p.at)
    }

    pub(crate) fn pop(&mut self) -> Option<(Duration, Action)> {
        self.heap.pop().map(|p| (p.at, p.action))
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Action {
        Box::new(|_| {})
    }

    #[test]
    fn test_orders_by_time_then_priority_then_seq() {
        let mut queue = EventQueue::default();
        queue.push(Duration::from_millis(200), ActionPriority::DEFAULT, noop());
        queue.push(Duration::from_millis(100), ActionPriority::EXPIRE, noop());
        queue.push(Duration::from_millis(100), ActionPriority::DOT, noop());
        queue.push(Duration::from_millis(100), ActionPriority::DOT, noop());

        let mut order = Vec::new();
        while let Some(head) = queue.heap.peek() {
            order.push((head.at.as_millis(), head.priority, head.seq));
            queue.pop();
        }
        assert_eq!(
            order,
            vec![(100, 3, 2), (100, 3, 3), (100, -1, 1), (200, 0, 0)]
        );
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut queue = EventQueue::default();
        queue.push(Duration::ZERO, ActionPriority::DEFAULT, noop());
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.peek_time(), None);
    }
}
