//! Error types returned by the containers

use thiserror::Error;

/// Reason a value was refused by [`LockFreeRingBuffer::try_push`].
///
/// [`LockFreeRingBuffer::try_push`]: crate::LockFreeRingBuffer::try_push
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError<T> {
    /// Every slot is occupied. The rejected value is handed back.
    #[error("ring buffer is full")]
    Full(T),

    /// The caller pushed the reserved empty marker.
    #[error("push value is nil")]
    NilValue,
}

impl<T> PushError<T> {
    /// Recovers the rejected value, if there was one.
    pub fn into_inner(self) -> Option<T> {
        match self {
            PushError::Full(value) => Some(value),
            PushError::NilValue => None,
        }
    }

    /// Returns true if the push failed because the buffer was full.
    pub fn is_full(&self) -> bool {
        matches!(self, PushError::Full(_))
    }
}

/// Invalid container configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node pool capacity must be > 0")]
    ZeroPoolCapacity,

    #[error("node pool prefill ({prefill}) exceeds its capacity ({capacity})")]
    PrefillExceedsCapacity { prefill: usize, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_error_returns_value() {
        let err = PushError::Full(7u32);
        assert!(err.is_full());
        assert_eq!(err.to_string(), "ring buffer is full");
        assert_eq!(err.into_inner(), Some(7));
    }

    #[test]
    fn nil_error_has_no_value() {
        let err: PushError<u32> = PushError::NilValue;
        assert!(!err.is_full());
        assert_eq!(err.to_string(), "push value is nil");
        assert_eq!(err.into_inner(), None);
    }
}
