//! Recycling allocator for linked nodes
//!
//! A bounded bag of cleared nodes backed by `crossbeam_queue::ArrayQueue`.
//! Nodes only come back to the pool through [`retire`], which waits for an
//! epoch grace period first, so a leased node can never still be referenced by
//! a thread that read it before it was unlinked.

use std::fmt;
use std::sync::Arc;

use crossbeam_epoch::{Guard, Owned, Shared};
use crossbeam_queue::ArrayQueue;

use crate::config::PoolConfig;
use crate::error::ConfigError;
use crate::node::Node;
use crate::trace::trace;

/// A bag of retired, cleared nodes
pub struct NodePool<T> {
    nodes: ArrayQueue<Owned<Node<T>>>,
}

impl<T> NodePool<T> {
    /// Creates a pool from a validated configuration.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let nodes = ArrayQueue::new(config.capacity);
        for _ in 0..config.prefill {
            // prefill <= capacity, so this cannot overflow
            let _ = nodes.push(Owned::new(Node::sentinel()));
        }
        Ok(Self { nodes })
    }

    /// Leases a cleared node, allocating when the pool is empty.
    #[inline]
    pub(crate) fn get(&self) -> Owned<Node<T>> {
        match self.nodes.pop() {
            Some(node) => node,
            None => {
                trace!("node pool empty, allocating");
                Owned::new(Node::sentinel())
            }
        }
    }

    /// Clears `node` and keeps it for reuse. Frees it if the pool is full.
    #[inline]
    pub(crate) fn put(&self, mut node: Owned<Node<T>>) {
        node.reset();
        debug_assert!(node.is_vacant());
        if self.nodes.push(node).is_err() {
            trace!("node pool full, freeing node");
        }
    }

    /// Number of idle nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maximum number of idle nodes retained.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }
}

impl<T> fmt::Debug for NodePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Leases a node holding `value` from `pool`, or allocates one.
#[inline]
pub(crate) fn acquire<T>(pool: Option<&NodePool<T>>, value: T) -> Owned<Node<T>> {
    match pool {
        Some(pool) => {
            let mut node = pool.get();
            node.set_value(value);
            node
        }
        None => Owned::new(Node::new(Some(value))),
    }
}

/// Retires a node that was just unlinked by a successful CAS.
///
/// The node is handed to the pool, or destroyed, once every thread pinned at
/// the time of the call has unpinned.
///
/// # Safety
///
/// `node` must have been unlinked by the caller's CAS and must not be retired
/// twice.
#[inline]
pub(crate) unsafe fn retire<T>(
    pool: Option<&Arc<NodePool<T>>>,
    node: Shared<'_, Node<T>>,
    guard: &Guard,
) {
    match pool {
        Some(pool) => {
            let pool = Arc::clone(pool);
            guard.defer_unchecked(move || pool.put(node.into_owned()));
        }
        None => guard.defer_destroy(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_epoch as epoch;

    #[test]
    fn prefill_populates_pool() {
        let pool = NodePool::<u32>::new(PoolConfig::with_capacity(8).prefill(3)).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(NodePool::<u32>::new(PoolConfig::with_capacity(0)).is_err());
    }

    #[test]
    fn get_on_empty_pool_allocates_vacant_node() {
        let pool = NodePool::<u32>::new(PoolConfig::with_capacity(2)).unwrap();
        assert!(pool.is_empty());
        let mut node = pool.get();
        assert!(node.is_vacant());
    }

    #[test]
    fn put_clears_node_before_reuse() {
        let pool = NodePool::<String>::new(PoolConfig::with_capacity(2)).unwrap();
        let node = acquire(Some(&pool), "hello".to_string());
        node.next.store(Owned::new(Node::sentinel()), crate::common::ordering::X);

        // Free the successor ourselves; put only clears the link.
        let successor = unsafe { node.next.load(crate::common::ordering::X, epoch::unprotected()) };
        pool.put(node);
        unsafe { drop(successor.into_owned()) };

        let guard = epoch::pin();
        let mut reused = pool.get();
        assert!(reused.is_vacant());
        assert!(reused.next.load(crate::common::ordering::X, &guard).is_null());
        assert!(pool.is_empty());
    }

    #[test]
    fn put_on_full_pool_frees_node() {
        let pool = NodePool::<u32>::new(PoolConfig::with_capacity(1).prefill(1)).unwrap();
        pool.put(Owned::new(Node::new(Some(9))));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn retire_returns_node_to_pool() {
        let pool = Arc::new(NodePool::<u32>::new(PoolConfig::with_capacity(4)).unwrap());
        {
            let guard = epoch::pin();
            let node = acquire(Some(&*pool), 5).into_shared(&guard);
            unsafe {
                assert_eq!(node.deref().take_value(), Some(5));
                retire(Some(&pool), node, &guard);
            }
        }

        // Deferred work runs once the epoch advances past the retirement.
        for _ in 0..10_000 {
            if !pool.is_empty() {
                break;
            }
            epoch::pin().flush();
        }
        assert_eq!(pool.len(), 1);
    }
}
