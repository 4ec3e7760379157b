//! Common functionality for the lock-free containers
//!
//! Memory ordering aliases, the advisory length counter of the linked
//! containers, the ring buffer's index and occupancy CAS loops, and the trait
//! shared by all three containers.

use std::sync::atomic::{AtomicIsize, AtomicUsize};

use crossbeam_utils::{Backoff, CachePadded};

/// Memory ordering constants for atomic operations
///
/// Short aliases for the standard library's Ordering values.
pub mod ordering {
    pub use std::sync::atomic::Ordering::AcqRel as AR;
    pub use std::sync::atomic::Ordering::Acquire as A;
    pub use std::sync::atomic::Ordering::Relaxed as X;
    pub use std::sync::atomic::Ordering::Release as R;
}

/// Advisory element counter for the linked containers
///
/// Updated with a separate atomic add after the CAS that links or unlinks a
/// node, so a pop may be counted before the push it consumed. The raw value is
/// signed for that reason and [`Counter::get`] clamps it at zero.
pub struct Counter {
    value: CachePadded<AtomicIsize>,
}

impl Counter {
    #[inline]
    pub fn new() -> Self {
        Self {
            value: CachePadded::new(AtomicIsize::new(0)),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, ordering::R);
    }

    #[inline]
    pub fn decrement(&self) {
        self.value.fetch_sub(1, ordering::R);
    }

    /// Current value, never negative.
    #[inline]
    pub fn get(&self) -> usize {
        self.value.load(ordering::A).max(0) as usize
    }

    #[inline]
    pub fn clear(&self) {
        self.value.store(0, ordering::R);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances a ring index by one slot, wrapping at `capacity`.
///
/// Retries the CAS until it wins and returns the index it claimed.
#[inline]
pub fn claim_index(index: &AtomicUsize, capacity: usize) -> usize {
    let backoff = Backoff::new();
    let mut current = index.load(ordering::X);
    loop {
        let next = if current + 1 == capacity { 0 } else { current + 1 };
        match index.compare_exchange_weak(current, next, ordering::AR, ordering::X) {
            Ok(_) => return current,
            Err(actual) => {
                current = actual;
                backoff.spin();
            }
        }
    }
}

/// Increments `counter` unless it has reached `limit`.
#[inline]
pub fn increment_below(counter: &AtomicUsize, limit: usize) -> bool {
    let mut current = counter.load(ordering::X);
    loop {
        if current >= limit {
            return false;
        }
        match counter.compare_exchange_weak(current, current + 1, ordering::AR, ordering::X) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}

/// Decrements `counter` unless it is zero.
#[inline]
pub fn decrement_above_zero(counter: &AtomicUsize) -> bool {
    let mut current = counter.load(ordering::X);
    loop {
        if current == 0 {
            return false;
        }
        match counter.compare_exchange_weak(current, current - 1, ordering::AR, ordering::X) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}

/// Trait for lock-free container operations
///
/// This trait defines the interface shared by [`LockFreeQueue`],
/// [`LockFreeStack`] and [`LockFreeRingBuffer`], so generic code can drive
/// any of them.
///
/// [`LockFreeQueue`]: crate::LockFreeQueue
/// [`LockFreeStack`]: crate::LockFreeStack
/// [`LockFreeRingBuffer`]: crate::LockFreeRingBuffer
pub trait LockFreeOps<T> {
    /// Attempts to insert an element
    ///
    /// Returns false if the container refused it (only a full ring buffer does).
    fn try_push(&self, element: T) -> bool;

    /// Attempts to remove an element
    ///
    /// Returns None if the container was empty.
    fn try_pop(&self) -> Option<T>;

    /// Returns the number of stored elements
    ///
    /// Advisory while other threads are pushing or popping.
    fn len(&self) -> usize;

    /// Checks if the container was empty during this call
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every element and returns the container to its initial state
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_never_reports_negative() {
        let counter = Counter::new();
        counter.decrement();
        assert_eq!(counter.get(), 0);
        counter.increment();
        assert_eq!(counter.get(), 0);
        counter.increment();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn counter_clear() {
        let counter = Counter::new();
        for _ in 0..5 {
            counter.increment();
        }
        assert_eq!(counter.get(), 5);
        counter.clear();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn claim_index_wraps() {
        let index = AtomicUsize::new(0);
        let claimed: Vec<usize> = (0..7).map(|_| claim_index(&index, 3)).collect();
        assert_eq!(claimed, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(index.load(ordering::X), 1);
    }

    #[test]
    fn increment_stops_at_limit() {
        let counter = AtomicUsize::new(0);
        assert!(increment_below(&counter, 2));
        assert!(increment_below(&counter, 2));
        assert!(!increment_below(&counter, 2));
        assert_eq!(counter.load(ordering::X), 2);
    }

    #[test]
    fn decrement_stops_at_zero() {
        let counter = AtomicUsize::new(1);
        assert!(decrement_above_zero(&counter));
        assert!(!decrement_above_zero(&counter));
        assert_eq!(counter.load(ordering::X), 0);
    }
}
