//! Sizing constants and node pool configuration

use crate::error::ConfigError;

/// Capacity used by [`LockFreeRingBuffer::new`] when asked for zero slots.
///
/// [`LockFreeRingBuffer::new`]: crate::LockFreeRingBuffer::new
pub const DEFAULT_RING_CAPACITY: usize = u16::MAX as usize;

/// Default number of retired nodes a [`NodePool`] will hold on to.
///
/// [`NodePool`]: crate::NodePool
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Configuration for the node pool behind a pooled queue or stack.
///
/// # Sizing
///
/// - `capacity`: upper bound on idle nodes kept for reuse. Nodes retired while
///   the pool is full are freed instead.
/// - `prefill`: nodes allocated up front so the first pushes do not hit the
///   allocator. Must not exceed `capacity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of idle nodes retained.
    pub capacity: usize,

    /// Number of nodes allocated at construction.
    pub prefill: usize,
}

impl PoolConfig {
    /// Pool with the given capacity and no prefill.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self { capacity, prefill: 0 }
    }

    /// Sets the number of nodes allocated up front.
    pub const fn prefill(mut self, prefill: usize) -> Self {
        self.prefill = prefill;
        self
    }

    /// Checks the configuration.
    ///
    /// # Invariants Checked
    ///
    /// - `capacity > 0`: an empty pool could never recycle anything
    /// - `prefill <= capacity`: prefilled nodes must fit in the pool
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroPoolCapacity);
        }
        if self.prefill > self.capacity {
            return Err(ConfigError::PrefillExceedsCapacity {
                prefill: self.prefill,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }
}
