//! Fixed-capacity container keeping the K largest elements pushed into it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A bounded min-heap over `T`'s total order.
///
/// The smallest retained element sits at the top of the heap, so deciding
/// whether a new element makes the cut is a single peek.
#[derive(Debug, Clone)]
pub struct BoundedTopK<T: Ord> {
    heap: BinaryHeap<Reverse<T>>,
    capacity: usize,
}

impl<T: Ord> BoundedTopK<T> {
    pub fn new(capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(capacity), capacity }
    }

    /// Offers `elem` to the container and reports whether it was kept.
    ///
    /// Below capacity the element is always inserted. At capacity it replaces
    /// the current minimum only when strictly greater; ties are discarded.
    pub fn push(&mut self, elem: T) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(elem));
            return true;
        }
        match self.heap.peek() {
            Some(Reverse(min)) if elem > *min => {
                self.heap.pop();
                self.heap.push(Reverse(elem));
                true
            }
            _ => false,
        }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn len(&self) -> usize { self.heap.len() }

    pub fn is_empty(&self) -> bool { self.heap.is_empty() }

    /// The smallest element currently retained.
    pub fn min(&self) -> Option<&T> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    pub fn clear(&mut self) { self.heap.clear(); }

    /// Consumes the container, returning its elements largest first.
    pub fn into_sorted_vec(self) -> Vec<T> {
        // BinaryHeap sorts ascending by Reverse<T>, i.e. descending by T.
        self.heap.into_sorted_vec().into_iter().map(|Reverse(e)| e).collect()
    }
}

impl<T: Ord + Clone> BoundedTopK<T> {
    /// Snapshot of the current contents, largest first.
    pub fn topk(&self) -> Vec<T> {
        let mut out: Vec<T> = self.heap.iter().map(|Reverse(e)| e.clone()).collect();
        out.sort_by(|a, b| b.cmp(a));
        out
    }
}
