//! Fixed-capacity circular buffer with overwrite-on-full push.
//!
//! # Overwrite Policy
//!
//! A ring never blocks and never rejects. Once it holds `bound` elements, the
//! next [`RingBuffer::push`] silently drops the oldest element to make room,
//! the same way a broadcast reader that falls behind is fast-forwarded to the
//! oldest data still available. Callers that need backpressure instead should
//! check [`RingBuffer::is_full`] first (or use [`crate::BoundedQueue::try_enqueue`]).
//!
//! ```text
//! bound = 5, capacity = 8, after pushing 1..=7:
//!
//!   slot:   0   1   2   3   4   5   6   7
//!         ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!         │   │   │ 3 │ 4 │ 5 │ 6 │ 7 │   │
//!         └───┴───┴───┴───┴───┴───┴───┴───┘
//!                   ▲                   ▲
//!                  head               tail
//! ```
//!
//! # Thread Safety
//! No internal synchronization. Mutation requires `&mut self`; share a ring
//! across threads only behind a lock.

use crate::index::{CapacityError, RingGeometry, slot_index};
use std::fmt;
use std::iter::FusedIterator;

/// A bounded FIFO ring buffer.
#[derive(Clone)]
pub struct RingBuffer<T> {
    /// Backing storage, `capacity` slots long. Unoccupied slots are `None`.
    slots: Box<[Option<T>]>,
    geometry: RingGeometry,
    /// Physical index of the oldest element.
    head: usize,
    /// Physical index of the next write. Always `(head + len) & mask`.
    tail: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty ring retaining at most `bound` elements.
    ///
    /// The backing storage is allocated once, rounded up to a power of two.
    ///
    /// # Errors
    /// Returns [`CapacityError`] if `bound` is zero or above [`crate::MAX_CAPACITY`].
    ///
    /// # Example
    /// ```
    /// use basalt_ring::RingBuffer;
    /// let ring = RingBuffer::<u32>::new(5).unwrap();
    /// assert_eq!(ring.bound(), 5);
    /// assert_eq!(ring.capacity(), 8);
    /// ```
    pub fn new(bound: usize) -> Result<Self, CapacityError> {
        let geometry = RingGeometry::for_bound(bound)?;
        let slots = std::iter::repeat_with(|| None)
            .take(geometry.capacity())
            .collect();
        Ok(Self {
            slots,
            geometry,
            head: 0,
            tail: 0,
            len: 0,
        })
    }

    /// Appends `item` as the newest element.
    ///
    /// If the ring already holds `bound` elements, the oldest one is evicted
    /// and returned. This is the rolling-window contract, not an error.
    pub fn push(&mut self, item: T) -> Option<T> {
        let mask = self.geometry.mask();
        let evicted = if self.len == self.geometry.bound() {
            let oldest = self.slots[self.head].take();
            self.head = slot_index(self.head, 1, mask);
            self.len -= 1;
            oldest
        } else {
            None
        };

        self.slots[self.tail] = Some(item);
        self.tail = slot_index(self.tail, 1, mask);
        self.len += 1;
        evicted
    }

    /// Removes and returns the oldest element.
    pub fn shift(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = slot_index(self.head, 1, self.geometry.mask());
        self.len -= 1;
        item
    }

    /// Oldest element, if any.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// Newest element, if any.
    #[inline]
    pub fn peek_last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Element at logical position `offset` (0 = oldest).
    #[inline]
    pub fn get(&self, offset: usize) -> Option<&T> {
        if offset >= self.len {
            return None;
        }
        self.slots[slot_index(self.head, offset, self.geometry.mask())].as_ref()
    }

    /// Drops every element. The backing storage is kept.
    pub fn clear(&mut self) {
        let mask = self.geometry.mask();
        for offset in 0..self.len {
            self.slots[slot_index(self.head, offset, mask)] = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Number of elements currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` once the next push would evict.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.geometry.bound()
    }

    /// Maximum number of elements retained, as requested at construction.
    #[inline]
    pub fn bound(&self) -> usize {
        self.geometry.bound()
    }

    /// Physical slot count (power of two, `>= bound`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    /// Iterates from oldest to newest.
    ///
    /// The iterator captures the length when it is created and can be cloned
    /// to restart from the same point. It borrows the ring, so the ring cannot
    /// be mutated while an iteration is in progress.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            front: 0,
            back: self.len,
        }
    }

    /// Removes elements from oldest to newest.
    ///
    /// Elements not consumed before the iterator is dropped are dropped with it.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { ring: self }
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|item| predicate(item))
    }

    /// Logical position of the first element matching `predicate`.
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().position(predicate)
    }

    pub fn count_matching<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().filter(|item| predicate(item)).count()
    }
}

impl<T: PartialEq> RingBuffer<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|x| x == item)
    }

    /// Logical position of the first element equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.iter().position(|x| x == item)
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the elements out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Borrowing iterator returned by [`RingBuffer::iter`].
pub struct Iter<'a, T> {
    ring: &'a RingBuffer<T>,
    /// Logical offset of the next element from the front.
    front: usize,
    /// Logical offset one past the next element from the back.
    back: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ring: self.ring,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let item = self.ring.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.ring.get(self.back)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Removing iterator returned by [`RingBuffer::drain`].
pub struct Drain<'a, T> {
    ring: &'a mut RingBuffer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.ring.shift()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ring.len(), Some(self.ring.len()))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        self.ring.clear();
    }
}
