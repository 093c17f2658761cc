use std::fmt;

/// Handle to a chunk owned by a [`Forest`](crate::Forest).
///
/// Handles are generational: once a chunk is released its slot may be reused,
/// but the old handle never resolves to the new occupant.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRef {
  index: u32,
  generation: u32,
}

impl ChunkRef {
  pub(crate) fn new(
    index: u32,
    generation: u32,
  ) -> Self {
    Self { index, generation }
  }

  pub(crate) fn index(self) -> u32 {
    self.index
  }

  pub(crate) fn generation(self) -> u32 {
    self.generation
  }
}

impl fmt::Debug for ChunkRef {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "ChunkRef({}v{})", self.index, self.generation)
  }
}

/// Back-link of a chunk inside its parent's child list.
///
/// The head of a child list points at the parent, every later sibling points
/// at the sibling before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
  Root,
  FirstChild(u32),
  Sibling(u32),
}

impl Link {
  pub fn is_root(self) -> bool {
    matches!(self, Link::Root)
  }
}
