use std::{fmt, mem::MaybeUninit, ptr::NonNull, slice};

use tracing::{debug, trace, warn};

use crate::{
  block::{self, Block, HEADER_SIZE},
  chunk::ChunkRef,
  config::ForestConfig,
  error::AllocError,
  provider::{LibcProvider, RawProvider},
  tree::Tree,
};

#[derive(Debug)]
struct RawChunk {
  block: NonNull<u8>,
  size: usize,
}

/// A structure-aware allocator: every chunk may depend on a parent chunk, and
/// releasing a chunk releases everything that depends on it.
///
/// Chunks are addressed through [`ChunkRef`] handles. A handle survives
/// [`resize`](Forest::resize) even when the payload moves; only
/// [`as_ptr`](Forest::as_ptr) changes.
pub struct Forest<P: RawProvider = LibcProvider> {
  tree: Tree<RawChunk>,
  provider: P,
  config: ForestConfig,
}

// SAFETY: every block is owned exclusively by the forest and only reachable
// through `&self`/`&mut self`, so moving the forest moves sole ownership.
unsafe impl<P: RawProvider + Send> Send for Forest<P> {}

impl Forest<LibcProvider> {
  pub fn new() -> Self {
    Self::with_provider(LibcProvider)
  }
}

impl Default for Forest<LibcProvider> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: RawProvider> Forest<P> {
  pub fn with_provider(provider: P) -> Self {
    Self::with_config(provider, ForestConfig::default())
  }

  pub fn with_config(
    provider: P,
    config: ForestConfig,
  ) -> Self {
    let config = config.with_max_chunk_size(config.max_chunk_size);

    Self {
      tree: Tree::with_capacity(config.initial_slots),
      provider,
      config,
    }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn config(&self) -> &ForestConfig {
    &self.config
  }

  /// Number of live chunks across all trees.
  pub fn len(&self) -> usize {
    self.tree.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tree.len() == 0
  }

  pub fn contains(
    &self,
    chunk: ChunkRef,
  ) -> bool {
    self.tree.resolve(chunk).is_some()
  }

  /// True if `chunk` is live and has no parent.
  pub fn is_root(
    &self,
    chunk: ChunkRef,
  ) -> bool {
    self.tree.resolve(chunk).is_some_and(|index| self.tree.is_root(index))
  }

  fn total_size(
    &self,
    size: usize,
  ) -> Result<usize, AllocError> {
    if size > self.config.max_chunk_size {
      return Err(AllocError::TooLarge {
        size,
        max: self.config.max_chunk_size,
      });
    }

    Ok(size + HEADER_SIZE)
  }

  fn resolve_parent(
    &self,
    parent: Option<ChunkRef>,
  ) -> Result<Option<u32>, AllocError> {
    parent
      .map(|parent| self.tree.resolve(parent).ok_or(AllocError::UnknownParent))
      .transpose()
  }

  fn allocate_with(
    &mut self,
    size: usize,
    parent: Option<ChunkRef>,
    zeroed: bool,
  ) -> Result<ChunkRef, AllocError> {
    let total = self.total_size(size)?;
    let parent_index = self.resolve_parent(parent)?;

    let raw = if zeroed {
      self.provider.allocate_zeroed(total)
    } else {
      self.provider.allocate(total)
    };

    let Some(raw) = raw else {
      warn!(size, "provider failed to allocate chunk");
      return Err(AllocError::OutOfMemory { size });
    };

    let Some(chunk) = self.tree.insert(RawChunk { block: raw, size }, parent_index) else {
      unsafe { self.provider.release(raw) };
      return Err(AllocError::SlotsExhausted);
    };

    unsafe { Block::new(size, chunk).write(raw) };

    trace!(?chunk, size, ?parent, zeroed, "allocated chunk");

    Ok(chunk)
  }

  /// Allocates `size` uninitialized bytes, owned by `parent` when given.
  pub fn allocate(
    &mut self,
    size: usize,
    parent: Option<ChunkRef>,
  ) -> Result<ChunkRef, AllocError> {
    self.allocate_with(size, parent, false)
  }

  /// Allocates `size` zeroed bytes, owned by `parent` when given.
  pub fn zero_allocate(
    &mut self,
    size: usize,
    parent: Option<ChunkRef>,
  ) -> Result<ChunkRef, AllocError> {
    self.allocate_with(size, parent, true)
  }

  /// Changes the payload size of `chunk`, keeping its place in the forest.
  ///
  /// `None` allocates a fresh root. On failure the chunk is left untouched and
  /// remains owned by the forest.
  pub fn resize(
    &mut self,
    chunk: Option<ChunkRef>,
    size: usize,
  ) -> Result<ChunkRef, AllocError> {
    let Some(chunk) = chunk else {
      return self.allocate(size, None);
    };

    let index = self.tree.resolve(chunk).ok_or(AllocError::UnknownChunk)?;
    let total = self.total_size(size)?;
    let old = self.tree.value(index).block;

    let Some(raw) = (unsafe { self.provider.reallocate(old, total) }) else {
      warn!(?chunk, size, "provider failed to resize chunk");
      return Err(AllocError::OutOfMemory { size });
    };

    let entry = self.tree.value_mut(index);
    entry.block = raw;
    entry.size = size;

    unsafe { Block::new(size, chunk).write(raw) };

    let moved = raw != old;
    trace!(?chunk, size, moved, "resized chunk");

    Ok(chunk)
  }

  /// Releases `chunk` and every chunk that depends on it. Always returns `None`.
  pub fn release(
    &mut self,
    chunk: Option<ChunkRef>,
  ) -> Option<ChunkRef> {
    let index = self.tree.resolve(chunk?)?;

    let provider = &mut self.provider;
    let released = self
      .tree
      .remove_subtree(index, |entry| unsafe { provider.release(entry.block) });

    debug!(?chunk, released, "released subtree");

    None
  }

  /// Returns the chunk `chunk` depends on.
  ///
  /// Costs a walk back through the preceding siblings.
  pub fn get_parent(
    &self,
    chunk: Option<ChunkRef>,
  ) -> Option<ChunkRef> {
    let index = self.tree.resolve(chunk?)?;

    self.tree.parent(index).map(|parent| self.tree.handle(parent))
  }

  /// Moves `chunk`, with its whole subtree, under `parent`, or makes it a root.
  pub fn set_parent(
    &mut self,
    chunk: Option<ChunkRef>,
    parent: Option<ChunkRef>,
  ) {
    let Some(index) = chunk.and_then(|chunk| self.tree.resolve(chunk)) else {
      return;
    };
    let Ok(parent_index) = self.resolve_parent(parent) else {
      warn!(?chunk, ?parent, "ignoring reparent under a chunk that is not live");
      return;
    };

    self.tree.set_parent(index, parent_index);

    trace!(?chunk, ?parent, "reparented chunk");
  }

  /// Detaches `chunk` and hands its children to `parent`.
  ///
  /// `chunk` ends up a childless root. Without a parent, each child becomes a
  /// root of its own.
  pub fn cut(
    &mut self,
    chunk: Option<ChunkRef>,
    parent: Option<ChunkRef>,
  ) {
    let Some(index) = chunk.and_then(|chunk| self.tree.resolve(chunk)) else {
      return;
    };
    let Ok(parent_index) = self.resolve_parent(parent) else {
      warn!(?chunk, ?parent, "ignoring cut into a chunk that is not live");
      return;
    };

    self.tree.cut(index, parent_index);

    trace!(?chunk, ?parent, "cut chunk");
  }

  /// Direct children of `chunk`, most recently linked first.
  pub fn children(
    &self,
    chunk: ChunkRef,
  ) -> impl Iterator<Item = ChunkRef> + '_ {
    self
      .tree
      .resolve(chunk)
      .into_iter()
      .flat_map(move |index| self.tree.children(index))
  }

  pub fn size_of(
    &self,
    chunk: ChunkRef,
  ) -> Option<usize> {
    let index = self.tree.resolve(chunk)?;

    Some(self.tree.value(index).size)
  }

  /// Start of the payload of `chunk`. Only valid until the next `resize` or `release` of it.
  pub fn as_ptr(
    &self,
    chunk: ChunkRef,
  ) -> Option<NonNull<u8>> {
    let index = self.tree.resolve(chunk)?;

    Some(block::payload_of(self.tree.value(index).block))
  }

  /// Payload of `chunk` as possibly uninitialized bytes.
  pub fn payload_uninit_mut(
    &mut self,
    chunk: ChunkRef,
  ) -> Option<&mut [MaybeUninit<u8>]> {
    let index = self.tree.resolve(chunk)?;
    let entry = self.tree.value(index);
    let payload = block::payload_of(entry.block);

    Some(unsafe { slice::from_raw_parts_mut(payload.as_ptr() as *mut MaybeUninit<u8>, entry.size) })
  }

  /// Payload of `chunk`.
  ///
  /// # Safety
  ///
  /// Every payload byte must have been initialized, either by
  /// [`zero_allocate`](Forest::zero_allocate) or by the caller.
  pub unsafe fn payload(
    &self,
    chunk: ChunkRef,
  ) -> Option<&[u8]> {
    let index = self.tree.resolve(chunk)?;
    let entry = self.tree.value(index);
    let payload = block::payload_of(entry.block);

    Some(unsafe { slice::from_raw_parts(payload.as_ptr(), entry.size) })
  }

  /// Mutable payload of `chunk`.
  ///
  /// # Safety
  ///
  /// Same as [`payload`](Forest::payload).
  pub unsafe fn payload_mut(
    &mut self,
    chunk: ChunkRef,
  ) -> Option<&mut [u8]> {
    let index = self.tree.resolve(chunk)?;
    let entry = self.tree.value(index);
    let payload = block::payload_of(entry.block);

    Some(unsafe { slice::from_raw_parts_mut(payload.as_ptr(), entry.size) })
  }

  /// Recovers the handle of the chunk whose payload starts at `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must be a pointer returned by [`as_ptr`](Forest::as_ptr) on
  /// this forest whose chunk is still live.
  pub unsafe fn chunk_of(
    &self,
    payload: NonNull<u8>,
  ) -> Option<ChunkRef> {
    let header = unsafe { Block::read(payload) };
    let index = self.tree.resolve(header.chunk)?;

    (block::payload_of(self.tree.value(index).block) == payload).then_some(header.chunk)
  }
}

impl<P: RawProvider> Drop for Forest<P> {
  fn drop(&mut self) {
    let live = self.tree.len();
    let provider = &mut self.provider;

    self.tree.drain(|entry| unsafe { provider.release(entry.block) });

    if live > 0 {
      debug!(live, "released remaining chunks on drop");
    }
  }
}

impl<P: RawProvider> fmt::Debug for Forest<P> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Forest")
      .field("len", &self.tree.len())
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
