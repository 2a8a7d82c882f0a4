//! Binary min-heap used as the A* open set
//!
//! Unlike `std::collections::BinaryHeap` this keeps the priority next to the
//! item instead of requiring `Ord` on the item, and never deduplicates: the
//! same item may sit in the heap several times with different priorities.

/// Binary min-heap of `(item, priority)` entries
#[derive(Debug, Clone)]
pub struct MinHeap<T, P = u32> {
    entries: Vec<(T, P)>,
}

impl<T, P: Ord + Copy> MinHeap<T, P> {
    /// Create an empty heap
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create an empty heap with room for `capacity` entries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries, duplicates included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the heap is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest priority currently stored
    #[must_use]
    pub fn peek_priority(&self) -> Option<P> {
        self.entries.first().map(|&(_, priority)| priority)
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert an item. O(log n)
    pub fn push(&mut self, item: T, priority: P) {
        self.entries.push((item, priority));
        self.sift_up(self.entries.len() - 1);
    }

    /// Remove and return a minimum-priority item. O(log n)
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }

        let (item, _) = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }

        Some(item)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[index].1 >= self.entries[parent].1 {
                break;
            }
            self.entries.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();

        loop {
            let left = index * 2 + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.entries[left].1 < self.entries[smallest].1 {
                smallest = left;
            }
            if right < len && self.entries[right].1 < self.entries[smallest].1 {
                smallest = right;
            }
            if smallest == index {
                break;
            }

            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T, P: Ord + Copy> Default for MinHeap<T, P> {
    fn default() -> Self {
        Self::new()
    }
}
