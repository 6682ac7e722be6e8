//! Queue-flavoured façade over [`RingBuffer`].
//!
//! `BoundedQueue` stores exactly like the ring underneath: `enqueue` on a full
//! queue evicts the oldest element. The one addition is [`BoundedQueue::try_enqueue`],
//! which hands the item back instead of evicting, for callers that want to
//! apply backpressure.

use crate::index::CapacityError;
use crate::ring::{Drain, Iter, RingBuffer};

#[derive(Clone)]
pub struct BoundedQueue<T> {
    ring: RingBuffer<T>,
}

impl<T> BoundedQueue<T> {
    pub fn new(bound: usize) -> Result<Self, CapacityError> {
        Ok(Self {
            ring: RingBuffer::new(bound)?,
        })
    }

    /// Appends `item`, evicting and returning the oldest element when full.
    #[inline]
    pub fn enqueue(&mut self, item: T) -> Option<T> {
        self.ring.push(item)
    }

    /// Appends `item` only if there is room; otherwise returns it unchanged.
    ///
    /// # Example
    /// ```
    /// use basalt_ring::BoundedQueue;
    /// let mut q = BoundedQueue::new(1).unwrap();
    /// assert_eq!(q.try_enqueue('a'), Ok(()));
    /// assert_eq!(q.try_enqueue('b'), Err('b'));
    /// ```
    #[inline]
    pub fn try_enqueue(&mut self, item: T) -> Result<(), T> {
        if self.ring.is_full() {
            return Err(item);
        }
        self.ring.push(item);
        Ok(())
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<T> {
        self.ring.shift()
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.ring.peek()
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.ring.peek_last()
    }

    #[inline]
    pub fn get(&self, offset: usize) -> Option<&T> {
        self.ring.get(offset)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub fn bound(&self) -> usize {
        self.ring.bound()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.ring.iter()
    }

    pub fn drain(&mut self) -> Drain<'_, T> {
        self.ring.drain()
    }

    pub fn find<P>(&self, predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.ring.find(predicate)
    }

    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.ring.position(predicate)
    }

    pub fn count_matching<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.ring.count_matching(predicate)
    }

    /// Borrows the underlying ring.
    pub fn as_ring(&self) -> &RingBuffer<T> {
        &self.ring
    }
}

impl<T: PartialEq> BoundedQueue<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.ring.contains(item)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.ring.index_of(item)
    }
}

impl<T: Clone> BoundedQueue<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.ring.to_vec()
    }
}

impl<T> From<RingBuffer<T>> for BoundedQueue<T> {
    fn from(ring: RingBuffer<T>) -> Self {
        Self { ring }
    }
}

impl<T> Extend<T> for BoundedQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.ring.extend(iter);
    }
}

impl<'a, T> IntoIterator for &'a BoundedQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.ring.iter()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("bound", &self.bound())
            .field("items", &self.ring)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_overwrites_like_the_ring() {
        let mut q = BoundedQueue::new(2).unwrap();
        assert_eq!(q.enqueue(1), None);
        assert_eq!(q.enqueue(2), None);
        assert_eq!(q.enqueue(3), Some(1));
        assert_eq!(q.to_vec(), vec![2, 3]);
    }

    #[test]
    fn try_enqueue_refuses_when_full() {
        let mut q = BoundedQueue::new(2).unwrap();
        assert_eq!(q.try_enqueue(1), Ok(()));
        assert_eq!(q.try_enqueue(2), Ok(()));
        assert_eq!(q.try_enqueue(3), Err(3));
        assert_eq!(q.to_vec(), vec![1, 2]);

        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.try_enqueue(3), Ok(()));
        assert_eq!(q.front(), Some(&2));
        assert_eq!(q.back(), Some(&3));
    }

    #[test]
    fn accessors_delegate_to_ring() {
        let mut q = BoundedQueue::new(3).unwrap();
        q.extend(["x", "y"]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.bound(), 3);
        assert_eq!(q.capacity(), 4);
        assert!(!q.is_full());
        assert!(q.contains(&"y"));
        assert_eq!(q.index_of(&"y"), Some(1));
        assert_eq!(q.get(0), Some(&"x"));
        assert_eq!((&q).into_iter().count(), 2);
    }

    #[test]
    fn wraps_an_existing_ring() {
        let mut ring = RingBuffer::new(3).unwrap();
        ring.extend([1, 2, 3, 4]);
        let mut q = BoundedQueue::from(ring);
        assert!(q.is_full());
        assert_eq!(q.try_enqueue(5), Err(5));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.as_ring().peek(), Some(&3));
        assert_eq!(q.as_ring().to_vec(), vec![3, 4]);
    }

    #[test]
    fn rejects_zero_bound() {
        assert_eq!(
            BoundedQueue::<u8>::new(0).unwrap_err(),
            CapacityError::ZeroBound
        );
    }
}
