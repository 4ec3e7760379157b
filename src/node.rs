//! Linked nodes and the atomic operations over their links
//!
//! Shared by [`LockFreeQueue`] and [`LockFreeStack`]. Links are
//! `crossbeam_epoch::Atomic` pointers, so a node unlinked by one thread stays
//! readable by every thread pinned before the unlink.
//!
//! [`LockFreeQueue`]: crate::LockFreeQueue
//! [`LockFreeStack`]: crate::LockFreeStack

use std::cell::UnsafeCell;

use crossbeam_epoch::{Atomic, CompareExchangeError, Guard, Owned, Pointer, Shared};

use crate::common::ordering;

/// A singly-linked cell holding at most one element
pub struct Node<T> {
    /// The payload. `None` for sentinels and for nodes whose value was taken.
    value: UnsafeCell<Option<T>>,

    /// Successor link
    pub(crate) next: Atomic<Node<T>>,
}

// Safety: `value` is only touched by the thread that owns the node, either the
// producer before publishing it or the consumer whose CAS unlinked it.
unsafe impl<T: Send> Send for Node<T> {}
unsafe impl<T: Send> Sync for Node<T> {}

impl<T> Node<T> {
    /// Creates a node holding `value` with a null successor.
    #[inline]
    pub fn new(value: Option<T>) -> Self {
        Self {
            value: UnsafeCell::new(value),
            next: Atomic::null(),
        }
    }

    /// Creates an empty node, used as a sentinel.
    #[inline]
    pub fn sentinel() -> Self {
        Self::new(None)
    }

    /// Stores a value into a node nobody else can see yet.
    #[inline]
    pub fn set_value(&mut self, value: T) {
        *self.value.get_mut() = Some(value);
    }

    /// Returns true if the node carries no value.
    #[inline]
    pub fn is_vacant(&mut self) -> bool {
        self.value.get_mut().is_none()
    }

    /// Clears both the value and the successor link.
    #[inline]
    pub fn reset(&mut self) {
        *self.value.get_mut() = None;
        self.next = Atomic::null();
    }

    /// Moves the value out of a published node.
    ///
    /// # Safety
    ///
    /// The caller must own the value: it won the CAS that unlinked this node
    /// (stack) or promoted it to sentinel (queue).
    #[inline]
    pub unsafe fn take_value(&self) -> Option<T> {
        (*self.value.get()).take()
    }
}

/// Loads a link with acquire ordering.
#[inline]
pub fn load_node<'g, T>(link: &Atomic<Node<T>>, guard: &'g Guard) -> Shared<'g, Node<T>> {
    link.load(ordering::A, guard)
}

/// Swings a link from `current` to `new`.
///
/// On failure the error carries the value actually found and hands `new` back
/// so the caller can retry without reallocating.
#[inline]
pub fn cas_node<'g, T, P>(
    link: &Atomic<Node<T>>,
    current: Shared<'_, Node<T>>,
    new: P,
    guard: &'g Guard,
) -> Result<Shared<'g, Node<T>>, CompareExchangeError<'g, Node<T>, P>>
where
    P: Pointer<Node<T>>,
{
    link.compare_exchange(current, new, ordering::AR, ordering::A, guard)
}

/// Unconditionally replaces a link with release ordering.
#[inline]
pub fn store_node<T, P>(link: &Atomic<Node<T>>, new: P)
where
    P: Pointer<Node<T>>,
{
    link.store(new, ordering::R);
}

/// Frees a chain of nodes starting at `first`, handing each to `release`.
///
/// # Safety
///
/// No other thread may reach any node of the chain. Used by `Drop` and
/// `reset`, which hold `&mut` access to the container.
pub unsafe fn free_chain<T>(first: Shared<'_, Node<T>>, mut release: impl FnMut(Owned<Node<T>>)) {
    let guard = crossbeam_epoch::unprotected();
    let mut current = first;
    while !current.is_null() {
        let owned = current.into_owned();
        current = owned.next.load(ordering::X, guard);
        release(owned);
    }
}
