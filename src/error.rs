use thiserror::Error;

/// Recoverable failures of [`Forest`](crate::Forest) operations.
///
/// None of them changes the forest: no chunk is created, moved, or linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("memory provider could not supply {size} bytes")]
  OutOfMemory { size: usize },

  #[error("chunk of {size} bytes exceeds the configured maximum of {max} bytes")]
  TooLarge { size: usize, max: usize },

  #[error("chunk table is full")]
  SlotsExhausted,

  #[error("parent chunk is not live in this forest")]
  UnknownParent,

  #[error("chunk is not live in this forest")]
  UnknownChunk,
}
