use std::ptr::{self, NonNull};

use libc::c_void;

/// Source of the raw blocks a [`Forest`](crate::Forest) stores its chunks in.
///
/// Implementations hand out blocks aligned to
/// [`MALLOC_ALIGN`](crate::align::MALLOC_ALIGN). Failure is reported as `None`
/// and is never retried by the forest.
pub trait RawProvider {
  /// Returns a block of at least `size` uninitialized bytes.
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Returns a block of at least `size` zeroed bytes.
  fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let block = self.allocate(size)?;
    unsafe { ptr::write_bytes(block.as_ptr(), 0, size) };
    Some(block)
  }

  /// Grows or shrinks `block`, possibly moving it. On failure `block` is left intact.
  ///
  /// # Safety
  ///
  /// `block` must have come from this provider and not have been released.
  unsafe fn reallocate(
    &mut self,
    block: NonNull<u8>,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Returns `block` to the provider.
  ///
  /// # Safety
  ///
  /// `block` must have come from this provider and not have been released.
  unsafe fn release(
    &mut self,
    block: NonNull<u8>,
  );
}

/// Provider backed by the C heap (`malloc`, `calloc`, `realloc`, `free`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcProvider;

impl RawProvider for LibcProvider {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { libc::malloc(size) } as *mut u8)
  }

  fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { libc::calloc(1, size) } as *mut u8)
  }

  unsafe fn reallocate(
    &mut self,
    block: NonNull<u8>,
    size: usize,
  ) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { libc::realloc(block.as_ptr() as *mut c_void, size) } as *mut u8)
  }

  unsafe fn release(
    &mut self,
    block: NonNull<u8>,
  ) {
    unsafe { libc::free(block.as_ptr() as *mut c_void) }
  }
}
