//! Unbounded MPMC LIFO stack
//!
//! Treiber stack. The payload lives in the node `top` points at; the chain
//! ends in an empty sentinel, so `top.next == null` means the stack is empty.

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

/// A lock-free unbounded stack for multiple producers and multiple consumers
pub struct LockFreeStack<T> {
    /// Most recently pushed node, or the sentinel when empty
    top: CachePadded<Atomic<Node<T>>>,

    /// Advisory element count
    length: Counter,

    /// Optional recycling allocator for nodes
    pool: Option<Arc<NodePool<T>>>,

    _marker: PhantomData<T>,
}

// Safety: values move between threads only through the CAS protocol, and a
// value is taken by exactly one popping thread.
unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T: Send> LockFreeStack<T> {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a new empty stack that recycles nodes through a pool
    pub fn with_pool(config: PoolConfig) -> Result<Self, ConfigError> {
        let pool = NodePool::new(config)?;
        Ok(Self::build(Some(Arc::new(pool))))
    }

    fn build(pool: Option<Arc<NodePool<T>>>) -> Self {
        let stack = Self {
            top: CachePadded::new(Atomic::null()),
            length: Counter::new(),
            pool,
            _marker: PhantomData,
        };
        stack.install_sentinel();
        debug!(pooled = stack.pool.is_some(), "stack created");
        stack
    }

    fn install_sentinel(&self) {
        let sentinel = match self.pool.as_deref() {
            Some(pool) => pool.get(),
            None => Owned::new(Node::sentinel()),
        };
        store_node(&self.top, sentinel);
    }

    /// Pushes a value on top
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
            let top = load_node(&self.top, &guard);
            node.next.store(top, ordering::X);

            match cas_node(&self.top, top, node, &guard) {
                Ok(_) => {
                    self.length.increment();
                    return;
                }
                Err(err) => {
                    node = err.new;
                    backoff.snooze();
                }
            }
        }
    }

    /// Pops the most recently pushed value
    ///
    /// Returns `None` if the stack was empty.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let top = load_node(&self.top, &guard);
            // Safety: top is never null and the guard keeps it alive.
            let top_ref = unsafe { top.deref() };
            let next = load_node(&top_ref.next, &guard);

            if top != load_node(&self.top, &guard) {
                continue;
            }

            // Only the sentinel has no successor.
            if next.is_null() {
                return None;
            }

            if cas_node(&self.top, top, next, &guard).is_ok() {
                // Safety: the CAS unlinked `top`, its value is ours.
                let value = unsafe { top_ref.take_value() };
                self.length.decrement();
                unsafe { pool::retire(self.pool.as_ref(), top, &guard) };
                return value;
            }
            backoff.snooze();
        }
    }

    /// Returns the number of elements (advisory under concurrency)
    pub fn len(&self) -> usize {
        self.length.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every element and installs a fresh sentinel
    pub fn reset(&mut self) {
        // Safety: `&mut self` means no other thread can reach the chain.
        unsafe {
            let first = self.top.load(ordering::X, epoch::unprotected());
            let pool = self.pool.as_deref();
            free_chain(first, |node| match pool {
                Some(pool) => pool.put(node),
                None => drop(node),
            });
        }
        self.install_sentinel();
        self.length.clear();
        debug!("stack reset");
    }

    /// Returns the node pool, if the stack was built with one
    pub fn pool(&self) -> Option<&NodePool<T>> {
        self.pool.as_deref()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        unsafe {
            let first = self.top.load(ordering::X, epoch::unprotected());
            free_chain(first, drop);
        }
    }
}

impl<T: Send> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> fmt::Debug for LockFreeStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeStack")
            .field("len", &self.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl<T: Send> LockFreeOps<T> for LockFreeStack<T> {
    fn try_push(&self, element: T) -> bool {
        self.push(element);
        true
    }

    fn try_pop(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        LockFreeStack::len(self)
    }

    fn reset(&mut self) {
        LockFreeStack::reset(self)
    }
}
