use crate::block::HEADER_SIZE;

/// Tunables for a [`Forest`](crate::Forest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestConfig {
  /// Slots reserved up front in the chunk table.
  pub initial_slots: usize,
  /// Largest payload a single chunk may request, in bytes. Never above
  /// `isize::MAX - HEADER_SIZE`, so a request plus its header always fits.
  pub max_chunk_size: usize,
}

impl Default for ForestConfig {
  fn default() -> Self {
    Self {
      initial_slots: 0,
      max_chunk_size: isize::MAX as usize - HEADER_SIZE,
    }
  }
}

impl ForestConfig {
  pub fn with_initial_slots(
    mut self,
    initial_slots: usize,
  ) -> Self {
    self.initial_slots = initial_slots;
    self
  }

  pub fn with_max_chunk_size(
    mut self,
    max_chunk_size: usize,
  ) -> Self {
    self.max_chunk_size = max_chunk_size.min(Self::default().max_chunk_size);
    self
  }
}
