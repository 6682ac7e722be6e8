//! Bounded FIFO storage built on power-of-two ring buffers.

mod bounded_queue;
mod index;
mod ring;

pub use bounded_queue::BoundedQueue;
pub use index::{CapacityError, MAX_CAPACITY, RingGeometry, slot_index};
pub use ring::{Drain, Iter, RingBuffer};
