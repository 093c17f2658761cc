/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// ```rust
/// use nestalloc::align_to;
///
/// assert_eq!(align_to!(17, 16), 32);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Alignment guaranteed by the system allocator for any block it returns.
pub const MALLOC_ALIGN: usize = 2 * std::mem::size_of::<usize>();
