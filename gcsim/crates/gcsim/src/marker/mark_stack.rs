//! Mark Stack - Work List for Depth-First Marking
//!
//! LIFO work list with counters, used in place of recursion so deep
//! chains cannot overflow the call stack.

use crate::heap::ObjectId;

/// Explicit DFS stack
#[derive(Debug, Default)]
pub struct MarkStack {
    stack: Vec<ObjectId>,
    pushed: usize,
    popped: usize,
    peak: usize,
}

impl MarkStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: ObjectId) {
        self.stack.push(object);
        self.pushed += 1;
        self.peak = self.peak.max(self.stack.len());
    }

    /// Pop the most recently pushed object
    pub fn pop(&mut self) -> Option<ObjectId> {
        let object = self.stack.pop();
        if object.is_some() {
            self.popped += 1;
        }
        object
    }

    /// Get statistics
    pub fn stats(&self) -> MarkStackStats {
        MarkStackStats {
            pushed: self.pushed,
            popped: self.popped,
            pending: self.stack.len(),
            peak: self.peak,
        }
    }
}

/// Mark stack statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkStackStats {
    pub pushed: usize,
    pub popped: usize,
    pub pending: usize,
    /// Deepest the stack got
    pub peak: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifo_order_and_counters() {
        let mut stack = MarkStack::new();
        stack.push(ObjectId::new(1));
        stack.push(ObjectId::new(2));

        assert_eq!(stack.pop(), Some(ObjectId::new(2)));

        let stats = stack.stats();
        assert_eq!(stats.pushed, 2);
        assert_eq!(stats.popped, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.peak, 2);
    }

    #[test]
    fn test_pop_empty() {
        let mut stack = MarkStack::new();
        assert!(stack.pop().is_none());
        assert_eq!(stack.stats().popped, 0);
        assert_eq!(stack.stats().pending, 0);
    }
}
