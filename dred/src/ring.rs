//! Reconstruction of a command history ring.
//!
//! The runtime appends every op it records to a fixed-size ring and counts them in
//! `BreadcrumbCount`; the GPU bumps a separate completion counter as ops finish.
//! Only the last `capacity` ops survive, so the logical history
//! `0..total` has to be mapped back onto physical slots, and everything
//! older than `total - capacity` is simply gone.
//!
//! [`RingWindow`] does this arithmetic. It never touches memory: its iterators
//! yield [`RingSlot`]s, which the caller uses to index the history array.

use std::iter::FusedIterator;

/// A logical op index and the physical ring slot holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSlot {
    pub logical: u32,
    pub physical: u32,
}

/// Emitted when more ops completed than the ring retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedDrop {
    /// `completed - capacity`
    pub dropped: u32,
    /// `max(0, completed - dropped)`
    pub completed_dropped: u32,
}

/// Emitted when more ops are outstanding than the ring retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingShortfall {
    pub outstanding: u32,
    pub retained: u32,
    pub unavailable: u32,
}

/// The completed/outstanding split of one breadcrumb history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingWindow {
    total: u32,
    completed: u32,
    reported_completed: u32,
    capacity: u32,
}

impl RingWindow {
    /// Build a window over `total` recorded ops of which `completed` finished.
    ///
    /// The two counters are written independently by the CPU and GPU, so after a
    /// crash `completed` can exceed `total`. It is clamped; see [`RingWindow::overflow`].
    pub fn new(total: u32, completed: u32, capacity: u32) -> RingWindow {
        RingWindow {
            total,
            completed: completed.min(total),
            reported_completed: completed,
            capacity,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// The completed count after clamping.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn outstanding(&self) -> u32 {
        self.total - self.completed
    }

    /// The completed count as recorded, if it had to be clamped.
    pub fn overflow(&self) -> Option<u32> {
        if self.reported_completed > self.total {
            Some(self.reported_completed)
        } else {
            None
        }
    }

    /// Completed ops, most recent first.
    pub fn completed_slots(&self) -> CompletedSlots {
        CompletedSlots {
            next: self.completed,
            remaining: self.completed.min(self.capacity),
            capacity: self.capacity,
        }
    }

    /// Outstanding ops still in the ring, oldest first.
    pub fn outstanding_slots(&self) -> OutstandingSlots {
        let start = if self.capacity == 0 {
            self.total
        } else {
            self.completed.max(self.total.saturating_sub(self.capacity))
        };
        OutstandingSlots {
            next: start,
            end: self.total,
            capacity: self.capacity,
        }
    }

    pub fn completed_drop(&self) -> Option<CompletedDrop> {
        if self.completed <= self.capacity {
            return None;
        }
        let dropped = self.completed - self.capacity;
        Some(CompletedDrop {
            dropped,
            completed_dropped: self.completed.saturating_sub(dropped),
        })
    }

    pub fn outstanding_shortfall(&self) -> Option<OutstandingShortfall> {
        let outstanding = self.outstanding();
        if outstanding <= self.capacity {
            return None;
        }
        Some(OutstandingShortfall {
            outstanding,
            retained: self.capacity,
            unavailable: outstanding - self.capacity,
        })
    }
}

/// Iterator over completed ops in descending logical order.
#[derive(Debug, Clone)]
pub struct CompletedSlots {
    /// One past the next logical index to yield.
    next: u32,
    remaining: u32,
    capacity: u32,
}

impl CompletedSlots {
    /// The logical index the next call to `next` will yield.
    pub fn peek_logical(&self) -> Option<u32> {
        if self.remaining == 0 {
            None
        } else {
            Some(self.next - 1)
        }
    }
}

impl Iterator for CompletedSlots {
    type Item = RingSlot;

    fn next(&mut self) -> Option<RingSlot> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.next -= 1;
        Some(RingSlot {
            logical: self.next,
            physical: self.next % self.capacity,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.remaining as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for CompletedSlots {}
impl FusedIterator for CompletedSlots {}

/// Iterator over outstanding ops in ascending logical order.
#[derive(Debug, Clone)]
pub struct OutstandingSlots {
    next: u32,
    end: u32,
    capacity: u32,
}

impl OutstandingSlots {
    pub fn peek_logical(&self) -> Option<u32> {
        if self.next < self.end {
            Some(self.next)
        } else {
            None
        }
    }
}

impl Iterator for OutstandingSlots {
    type Item = RingSlot;

    fn next(&mut self) -> Option<RingSlot> {
        if self.next >= self.end {
            return None;
        }
        let logical = self.next;
        self.next += 1;
        Some(RingSlot {
            logical,
            physical: logical % self.capacity,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.end - self.next) as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for OutstandingSlots {}
impl FusedIterator for OutstandingSlots {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::format::AUTO_BREADCRUMBS_COMMAND_HISTORY_MAX as C;

    fn logical(slots: impl Iterator<Item = RingSlot>) -> Vec<u32> {
        slots.map(|s| s.logical).collect()
    }

    #[test]
    fn test_small_history() {
        let window = RingWindow::new(10, 6, 16);
        assert_eq!(logical(window.completed_slots()), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(logical(window.outstanding_slots()), vec![6, 7, 8, 9]);
        assert_eq!(window.completed_drop(), None);
        assert_eq!(window.outstanding_shortfall(), None);
        assert_eq!(window.overflow(), None);
    }

    #[test]
    fn test_completed_within_capacity() {
        for &(k, c, n) in &[(0, 4, 4), (3, 4, 9), (4, 4, 4), (7, 20, 100), (15360, C, 20000)] {
            let window = RingWindow::new(n, k, c);
            let slots: Vec<_> = window.completed_slots().collect();
            assert_eq!(slots.len() as u32, k.min(c));
            assert_eq!(window.completed_slots().len() as u32, k.min(c));
            assert!(slots.windows(2).all(|w| w[0].logical > w[1].logical));
            assert!(slots.iter().all(|s| s.physical == s.logical % c));
        }
    }

    #[test]
    fn test_completed_wrapped() {
        let window = RingWindow::new(20000, 20000, C);
        let slots = window.completed_slots();
        assert_eq!(slots.len(), 15360);
        let slots: Vec<_> = slots.collect();
        assert_eq!(slots[0], RingSlot { logical: 19999, physical: 19999 - 15360 });
        assert_eq!(slots.last().unwrap().logical, 4640);
        assert_eq!(
            window.completed_drop(),
            Some(CompletedDrop {
                dropped: 4640,
                completed_dropped: 15360,
            })
        );
        assert_eq!(window.outstanding_slots().len(), 0);
    }

    #[test]
    fn test_outstanding_shortfall() {
        for &(n, k, c) in &[(100, 10, 50), (20000, 0, C), (u32::MAX, 1, 8)] {
            let window = RingWindow::new(n, k, c);
            let slots: Vec<_> = window.outstanding_slots().collect();
            assert_eq!(slots.len() as u32, c);
            assert_eq!(slots.last().unwrap().logical, n - 1);
            assert!(slots.windows(2).all(|w| w[0].logical + 1 == w[1].logical));
            assert_eq!(
                window.outstanding_shortfall(),
                Some(OutstandingShortfall {
                    outstanding: n - k,
                    retained: c,
                    unavailable: (n - k) - c,
                })
            );
        }
    }

    #[test]
    fn test_outstanding_starts_after_completed() {
        let window = RingWindow::new(30, 25, 16);
        let slots: Vec<_> = window.outstanding_slots().collect();
        assert_eq!(logical(slots.iter().copied()), vec![25, 26, 27, 28, 29]);
        assert_eq!(slots[0].physical, 9);
    }

    #[test]
    fn test_count_overflow_clamps() {
        let window = RingWindow::new(10, 12, 16);
        assert_eq!(window.overflow(), Some(12));
        assert_eq!(window.completed(), 10);
        assert_eq!(logical(window.completed_slots()).len(), 10);
        assert_eq!(window.completed_slots().peek_logical(), Some(9));
        assert_eq!(window.outstanding_slots().len(), 0);
    }

    #[test]
    fn test_restartable() {
        let window = RingWindow::new(40, 30, 16);
        let first = logical(window.completed_slots());
        let second = logical(window.completed_slots());
        assert_eq!(first, second);
        let slots = window.outstanding_slots();
        assert_eq!(logical(slots.clone()), logical(slots));
    }

    #[test]
    fn test_zero_capacity() {
        let window = RingWindow::new(10, 5, 0);
        assert_eq!(window.completed_slots().count(), 0);
        assert_eq!(window.outstanding_slots().count(), 0);
    }
}
