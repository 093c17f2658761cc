use std::{mem, ptr::NonNull};

use crate::{align::MALLOC_ALIGN, align_to, chunk::ChunkRef};

/// In-band header stored at the start of every raw block.
///
/// The header is a back-reference only: tree linkage lives in the slot table,
/// so moving a block never requires patching other chunks.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
  pub size: usize,
  pub chunk: ChunkRef,
}

/// Bytes reserved in front of every payload. Rounded so the payload keeps the
/// alignment the system allocator gave the raw block.
pub const HEADER_SIZE: usize = align_to!(mem::size_of::<Block>(), MALLOC_ALIGN);

impl Block {
  pub fn new(
    size: usize,
    chunk: ChunkRef,
  ) -> Self {
    Self { size, chunk }
  }

  /// Writes the header at the start of `raw`.
  ///
  /// # Safety
  ///
  /// `raw` must point to at least `HEADER_SIZE` writable bytes aligned to `MALLOC_ALIGN`.
  pub unsafe fn write(
    self,
    raw: NonNull<u8>,
  ) {
    unsafe { raw.cast::<Block>().write(self) }
  }

  /// Reads the header stored in front of a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`payload_of`] on a live block.
  pub unsafe fn read(payload: NonNull<u8>) -> Self {
    unsafe { raw_of(payload).cast::<Block>().read() }
  }
}

/// Converts a raw block pointer into the user-visible payload pointer.
pub(crate) fn payload_of(raw: NonNull<u8>) -> NonNull<u8> {
  // SAFETY: every raw block is at least HEADER_SIZE bytes long.
  unsafe { raw.add(HEADER_SIZE) }
}

/// Converts a payload pointer back into the raw block pointer.
///
/// # Safety
///
/// `payload` must lie `HEADER_SIZE` bytes past the start of an allocation.
pub(crate) unsafe fn raw_of(payload: NonNull<u8>) -> NonNull<u8> {
  unsafe { payload.sub(HEADER_SIZE) }
}
