//! Bounded MPMC ring buffer
//!
//! A fixed array of slots addressed by a `head` and a `tail` index that wrap
//! at `capacity`. `head == tail` holds both when the buffer is empty and when
//! it is full, so occupancy is tracked by an explicit counter instead:
//!
//! 1. A producer reserves one unit on `count`, failing if it is at capacity.
//! 2. It claims slot `tail` by CAS-ing the tail index forward.
//! 3. It writes the value and marks the slot stored.
//!
//! Consumers mirror this: release one unit from `count` (failing at zero),
//! claim slot `head`, take the value and mark the slot empty. A reserved unit
//! always has a matching slot, so `count` never exceeds `capacity` and a
//! consumer never claims a slot no producer will fill.
//!
//! Each slot carries a state word so the thread that claimed it waits for the
//! previous owner (a producer still writing, or a consumer still reading from
//! the last lap) before touching the value.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, AtomicUsize};

use crossbeam_utils::{Backoff, CachePadded};

use crate::common::{claim_index, decrement_above_zero, increment_below, ordering, LockFreeOps};
use crate::config::DEFAULT_RING_CAPACITY;
use crate::error::PushError;
use crate::trace::{debug, trace};

/// Slot state constants
const EMPTY: u8 = 0;
const STORING: u8 = 1;
const STORED: u8 = 2;
const LOADING: u8 = 3;

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Writes `value` once the slot is empty.
    #[inline]
    fn store(&self, value: T) {
        let backoff = Backoff::new();
        while self
            .state
            .compare_exchange_weak(EMPTY, STORING, ordering::A, ordering::X)
            .is_err()
        {
            backoff.snooze();
        }
        // Safety: the STORING state grants exclusive access to the cell.
        unsafe { (*self.value.get()).write(value) };
        self.state.store(STORED, ordering::R);
    }

    /// Moves the value out once the slot is stored.
    #[inline]
    fn take(&self) -> T {
        let backoff = Backoff::new();
        while self
            .state
            .compare_exchange_weak(STORED, LOADING, ordering::A, ordering::X)
            .is_err()
        {
            backoff.snooze();
        }
        // Safety: LOADING grants exclusive access and STORED meant initialized.
        let value = unsafe { (*self.value.get()).assume_init_read() };
        self.state.store(EMPTY, ordering::R);
        value
    }

    /// Drops a stored value. Requires exclusive access to the buffer.
    fn clear(&mut self) {
        if *self.state.get_mut() == STORED {
            // Safety: STORED means the cell is initialized.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
        *self.state.get_mut() = EMPTY;
    }
}

/// A lock-free bounded ring buffer for multiple producers and multiple consumers
///
/// Never blocks on a full or empty buffer: [`push`](Self::push) returns
/// `false` and [`pop`](Self::pop) returns `None` instead.
pub struct LockFreeRingBuffer<T> {
    /// Preallocated slots, never resized
    slots: Box<[Slot<T>]>,

    /// Number of slots
    capacity: usize,

    /// Next slot a consumer will claim
    head: CachePadded<AtomicUsize>,

    /// Next slot a producer will claim
    tail: CachePadded<AtomicUsize>,

    /// Reserved occupancy, `0 <= count <= capacity`
    count: CachePadded<AtomicUsize>,
}

// Safety: slot cells are only accessed by the thread holding the slot's
// STORING or LOADING state.
unsafe impl<T: Send> Send for LockFreeRingBuffer<T> {}
unsafe impl<T: Send> Sync for LockFreeRingBuffer<T> {}

impl<T> LockFreeRingBuffer<T> {
    /// Creates a ring buffer with exactly `capacity` slots
    ///
    /// A capacity of zero falls back to [`DEFAULT_RING_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_RING_CAPACITY
        } else {
            capacity
        };

        let slots: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::new()).collect();
        debug!(capacity, "ring buffer created");

        Self {
            slots,
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            count: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Inserts a value, returning false if the buffer was full or the value
    /// was `None`
    pub fn push(&self, value: impl Into<Option<T>>) -> bool {
        self.try_push(value).is_ok()
    }

    /// Inserts a value, reporting why it was refused
    ///
    /// On a full buffer the value is handed back in [`PushError::Full`].
    pub fn try_push(&self, value: impl Into<Option<T>>) -> Result<(), PushError<T>> {
        let Some(value) = value.into() else {
            trace!("ring buffer rejected nil value");
            return Err(PushError::NilValue);
        };

        if !increment_below(&self.count, self.capacity) {
            trace!(capacity = self.capacity, "ring buffer full");
            return Err(PushError::Full(value));
        }

        let index = claim_index(&self.tail, self.capacity);
        self.slots[index].store(value);
        Ok(())
    }

    /// Removes the oldest value
    ///
    /// Returns `None` if the buffer was empty.
    pub fn pop(&self) -> Option<T> {
        if !decrement_above_zero(&self.count) {
            return None;
        }

        let index = claim_index(&self.head, self.capacity);
        Some(self.slots[index].take())
    }

    /// Returns the number of stored values
    ///
    /// Counts values whose producer has reserved a slot, including one still
    /// being written. Never exceeds [`capacity`](Self::capacity).
    pub fn count(&self) -> usize {
        self.count.load(ordering::A)
    }

    /// Returns the fixed number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity
    }

    /// Drops every stored value and rewinds both indices
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.count.get_mut() = 0;
        debug!(capacity = self.capacity, "ring buffer reset");
    }
}

impl<T> Drop for LockFreeRingBuffer<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
    }
}

impl<T> Default for LockFreeRingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

impl<T> fmt::Debug for LockFreeRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeRingBuffer")
            .field("count", &self.count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> LockFreeOps<T> for LockFreeRingBuffer<T> {
    fn try_push(&self, element: T) -> bool {
        self.push(element)
    }

    fn try_pop(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        self.count()
    }

    fn reset(&mut self) {
        LockFreeRingBuffer::reset(self)
    }
}
