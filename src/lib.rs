//! # lockfree_rs
//!
//! Non-blocking concurrent containers built on atomic compare-and-swap:
//!
//! - [`LockFreeQueue`]: unbounded multi-producer multi-consumer FIFO queue
//! - [`LockFreeStack`]: unbounded multi-producer multi-consumer LIFO stack
//! - [`LockFreeRingBuffer`]: bounded multi-producer multi-consumer ring buffer
//!
//! Elements are any `T`. `None` is the reserved empty marker: pushing it is a
//! no-op for the queue and the stack and is refused by the ring buffer.
//!
//! ```
//! use lockfree_rs::{LockFreeQueue, LockFreeRingBuffer};
//!
//! let queue = LockFreeQueue::<u32>::new();
//! queue.push(1);
//! queue.push(2);
//! assert_eq!(queue.pop(), Some(1));
//!
//! let ring = LockFreeRingBuffer::<u32>::new(1);
//! assert!(ring.push(7));
//! assert!(!ring.push(8));
//! assert_eq!(ring.pop(), Some(7));
//! ```

mod common;
mod config;
mod error;
mod node;
mod pool;
mod trace;

#[cfg(test)]
mod test_utils;

pub mod queue;
pub mod ring_buffer;
pub mod stack;

// Re-exports for convenience
pub use common::LockFreeOps;
pub use config::{PoolConfig, DEFAULT_POOL_CAPACITY, DEFAULT_RING_CAPACITY};
pub use error::{ConfigError, PushError};
pub use pool::NodePool;
pub use queue::LockFreeQueue;
pub use ring_buffer::LockFreeRingBuffer;
pub use stack::LockFreeStack;
pub use trace::init_tracing;
