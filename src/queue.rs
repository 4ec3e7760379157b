//! Unbounded MPMC FIFO queue
//!
//! Michael-Scott linked queue. `head` always points at a sentinel whose
//! successor holds the oldest element; `tail` points at the last node or lags
//! one step behind it, and every operation that notices the lag repairs it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use crossbeam_utils::{Backoff, CachePadded};

use crate::common::{ordering, Counter, LockFreeOps};
use crate::config::PoolConfig;
use crate::error::ConfigError;
use crate::node::{cas_node, free_chain, load_node, store_node, Node};
use crate::pool::{self, NodePool};
use crate::trace::debug;

/// A lock-free unbounded queue for multiple producers and multiple consumers
///
/// Nodes unlinked by [`pop`](Self::pop) are reclaimed through
/// `crossbeam-epoch`, or recycled through a [`NodePool`] when the queue is
/// built with [`with_pool`](Self::with_pool).
pub struct LockFreeQueue<T> {
    /// The current sentinel
    head: CachePadded<Atomic<Node<T>>>,

    /// The last node, or its predecessor while a push is completing
    tail: CachePadded<Atomic<Node<T>>>,

    /// Advisory element count
    length: Counter,

    /// Optional recycling allocator for nodes
    pool: Option<Arc<NodePool<T>>>,

    /// Marker for drop check
    _marker: PhantomData<T>,
}

// Safety: values move between threads only through the CAS protocol, and a
// value is taken by exactly one popping thread.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T: Send> LockFreeQueue<T> {
    /// Creates a new empty queue that allocates a node per push
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a new empty queue that recycles nodes through a pool
    pub fn with_pool(config: PoolConfig) -> Result<Self, ConfigError> {
        let pool = NodePool::new(config)?;
        Ok(Self::build(Some(Arc::new(pool))))
    }

    fn build(pool: Option<Arc<NodePool<T>>>) -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
            length: Counter::new(),
            pool,
            _marker: PhantomData,
        };
        queue.install_sentinel();
        debug!(pooled = queue.pool.is_some(), "queue created");
        queue
    }

    /// Points both ends at a fresh sentinel. Requires exclusive access.
    fn install_sentinel(&self) {
        let sentinel = match self.pool.as_deref() {
            Some(pool) => pool.get(),
            None => Owned::new(Node::sentinel()),
        };
        // Safety: called only before the queue is shared or under `&mut self`.
        let sentinel = sentinel.into_shared(unsafe { epoch::unprotected() });
        store_node(&self.head, sentinel);
        store_node(&self.tail, sentinel);
    }

    /// Appends a value at the tail
    ///
    /// `None` is the reserved empty marker and is silently dropped.
    pub fn push(&self, value: impl Into<Option<T>>) {
        let Some(value) = value.into() else {
            return;
        };

        let guard = epoch::pin();
        let backoff = Backoff::new();
        let mut node = pool::acquire(self.pool.as_deref(), value);

        loop {
            let tail = load_node(&self.tail, &guard);
            // Safety: tail is never null and the guard keeps it alive.
            let tail_ref = unsafe { tail.deref() };
            let next = load_node(&tail_ref.next, &guard);

            if tail != load_node(&self.tail, &guard) {
                continue;
            }

            if next.is_null() {
                match cas_node(&tail_ref.next, next, node, &guard) {
                    Ok(linked) => {
                        // Failure means another thread already advanced tail.
                        let _ = cas_node(&self.tail, tail, linked, &guard);
                        self.length.increment();
                        return;
                    }
                    Err(err) => {
                        node = err.new;
                        backoff.snooze();
                    }
                }
            } else {
                // Tail is lagging, help the other producer finish.
                let _ = cas_node(&self.tail, tail, next, &guard);
            }
        }
    }

    /// Removes the value at the head
    ///
    /// Returns `None` if the queue was empty.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = load_node(&self.head, &guard);
            let tail = load_node(&self.tail, &guard);
            // Safety: head is never null and the guard keeps it alive.
            let head_ref = unsafe { head.deref() };
            let next = load_node(&head_ref.next, &guard);

            if head != load_node(&self.head, &guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                let _ = cas_node(&self.tail, tail, next, &guard);
                continue;
            }

            // Safety: next is protected by the guard.
            let Some(next_ref) = (unsafe { next.as_ref() }) else {
                continue;
            };

            if cas_node(&self.head, head, next, &guard).is_ok() {
                // Winning the head CAS promotes `next` to sentinel and hands
                // its value to this thread alone.
                let value = unsafe { next_ref.take_value() };
                self.length.decrement();
                unsafe { pool::retire(self.pool.as_ref(), head, &guard) };
                return value;
            }
            backoff.snooze();
        }
    }

    /// Returns the number of elements
    ///
    /// Advisory: the counter is updated after the linking CAS and may briefly
    /// disagree with the list while other threads are mid-operation.
    pub fn len(&self) -> usize {
        self.length.get()
    }

    /// Checks if the queue was empty during this call
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every element and installs a fresh sentinel
    ///
    /// Taking `&mut self` guarantees no push or pop is in flight.
    pub fn reset(&mut self) {
        // Safety: `&mut self` means no other thread can reach the chain.
        unsafe {
            let first = self.head.load(ordering::X, epoch::unprotected());
            let pool = self.pool.as_deref();
            free_chain(first, |node| match pool {
                Some(pool) => pool.put(node),
                None => drop(node),
            });
        }
        self.install_sentinel();
        self.length.clear();
        debug!("queue reset");
    }

    /// Returns the node pool, if the queue was built with one
    pub fn pool(&self) -> Option<&NodePool<T>> {
        self.pool.as_deref()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        // Safety: we have exclusive access, every linked node is ours to free.
        unsafe {
            let first = self.head.load(ordering::X, epoch::unprotected());
            free_chain(first, drop);
        }
    }
}

impl<T: Send> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("len", &self.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl<T: Send> LockFreeOps<T> for LockFreeQueue<T> {
    fn try_push(&self, element: T) -> bool {
        self.push(element);
        true
    }

    fn try_pop(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        LockFreeQueue::len(self)
    }

    fn reset(&mut self) {
        LockFreeQueue::reset(self)
    }
}
