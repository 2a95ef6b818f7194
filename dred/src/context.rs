//! Correlation of breadcrumb contexts with history slots.
//!
//! Contexts are a sparse list sorted by op index. Both op traversals are
//! monotonic, so a single cursor that walks the context list in the same
//! direction finds every match without rescanning.

use crate::ring::RingSlot;

/// A context string attached to one op of a breadcrumb history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbContext {
    /// The logical op index the string annotates.
    pub index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Descending,
    Ascending,
}

/// Pairs each slot of a monotonic slot iterator with its context, if any.
#[derive(Debug, Clone)]
pub struct ContextCorrelator<'c, I> {
    slots: I,
    contexts: &'c [BreadcrumbContext],
    direction: Direction,
    /// Descending: one past the last candidate. Ascending: the next candidate.
    /// `None` until the first slot positions it.
    cursor: Option<usize>,
}

impl<'c, I> ContextCorrelator<'c, I>
where
    I: Iterator<Item = RingSlot>,
{
    /// Correlate slots that arrive in descending logical order.
    pub fn descending(slots: I, contexts: &'c [BreadcrumbContext]) -> Self {
        ContextCorrelator {
            slots,
            contexts,
            direction: Direction::Descending,
            cursor: None,
        }
    }

    /// Correlate slots that arrive in ascending logical order.
    pub fn ascending(slots: I, contexts: &'c [BreadcrumbContext]) -> Self {
        ContextCorrelator {
            slots,
            contexts,
            direction: Direction::Ascending,
            cursor: None,
        }
    }

    fn lookup(&mut self, logical: u32) -> Option<&'c str> {
        let contexts = self.contexts;
        match self.direction {
            Direction::Descending => {
                let mut cursor = match self.cursor {
                    Some(cursor) => cursor,
                    None => contexts.partition_point(|c| c.index <= logical),
                };
                while cursor > 0 && contexts[cursor - 1].index > logical {
                    cursor -= 1;
                }
                self.cursor = Some(cursor);
                match cursor.checked_sub(1).map(|i| &contexts[i]) {
                    Some(context) if context.index == logical => Some(context.text.as_str()),
                    _ => None,
                }
            }
            Direction::Ascending => {
                let mut cursor = match self.cursor {
                    Some(cursor) => cursor,
                    None => contexts.partition_point(|c| c.index < logical),
                };
                while cursor < contexts.len() && contexts[cursor].index < logical {
                    cursor += 1;
                }
                self.cursor = Some(cursor);
                match contexts.get(cursor) {
                    Some(context) if context.index == logical => Some(context.text.as_str()),
                    _ => None,
                }
            }
        }
    }
}

impl<'c, I> Iterator for ContextCorrelator<'c, I>
where
    I: Iterator<Item = RingSlot>,
{
    type Item = (RingSlot, Option<&'c str>);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        let context = self.lookup(slot.logical);
        Some((slot, context))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<'c, I> ExactSizeIterator for ContextCorrelator<'c, I> where
    I: ExactSizeIterator<Item = RingSlot>
{
}
