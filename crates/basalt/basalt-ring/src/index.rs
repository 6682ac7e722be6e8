//! Capacity validation and index arithmetic for power-of-two ring buffers.
//!
//! A ring keeps two sizes apart:
//! - the **bound**: how many elements the caller asked to retain
//! - the **capacity**: the physical slot count, `bound` rounded up to a power of 2
//!
//! Only the capacity takes part in index math, so `offset & mask` can replace
//! `offset % capacity`. Only the bound decides when a push evicts.

use thiserror::Error;

/// Largest physical capacity a ring may allocate (2^30 slots).
///
/// Rounding a bound above this would produce a mask that no longer fits the
/// index arithmetic comfortably on 32-bit targets.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Raised when a ring cannot be built for the requested bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("ring bound must be greater than zero")]
    ZeroBound,

    #[error("ring bound {requested} exceeds the maximum capacity of {max} slots")]
    TooLarge { requested: usize, max: usize },
}

/// Validated geometry of a ring buffer.
///
/// # Example
/// ```
/// use basalt_ring::RingGeometry;
/// let geo = RingGeometry::for_bound(5).unwrap();
/// assert_eq!(geo.bound(), 5);
/// assert_eq!(geo.capacity(), 8);
/// assert_eq!(geo.mask(), 7); // 0b111
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingGeometry {
    bound: usize,
    capacity: usize,
}

impl RingGeometry {
    /// Rounds `bound` up to the next power of two.
    ///
    /// # Errors
    /// - [`CapacityError::ZeroBound`] if `bound == 0`
    /// - [`CapacityError::TooLarge`] if the rounded capacity would exceed [`MAX_CAPACITY`]
    pub fn for_bound(bound: usize) -> Result<Self, CapacityError> {
        if bound == 0 {
            return Err(CapacityError::ZeroBound);
        }
        if bound > MAX_CAPACITY {
            return Err(CapacityError::TooLarge {
                requested: bound,
                max: MAX_CAPACITY,
            });
        }
        // bound <= 2^30, so next_power_of_two cannot overflow
        let capacity = bound.next_power_of_two();
        Ok(Self { bound, capacity })
    }

    /// Logical number of elements the ring retains.
    #[inline(always)]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Physical slot count. Always a power of two and `>= bound`.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bitmask for index calculation: `capacity - 1`.
    #[inline(always)]
    pub fn mask(&self) -> usize {
        self.capacity - 1
    }
}

/// Maps a logical offset from `head` to a physical slot.
///
/// With `capacity = 8` (mask = `0b111`):
/// ```text
/// head = 6, offset = 0 → 6
/// head = 6, offset = 1 → 7
/// head = 6, offset = 2 → 0  (wraps around)
/// head = 6, offset = 4 → 2
/// ```
#[inline(always)]
pub fn slot_index(head: usize, offset: usize, mask: usize) -> usize {
    head.wrapping_add(offset) & mask
}
