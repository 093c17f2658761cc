//! Instrumented provider shared by the integration tests.

#![allow(dead_code)]

use std::{
  cell::RefCell,
  collections::HashMap,
  ptr::{self, NonNull},
  rc::Rc,
};

use nestalloc::{LibcProvider, RawProvider};

/// What the provider has done so far, plus knobs to make it misbehave.
#[derive(Debug, Default)]
pub struct Ledger {
  /// Live blocks by address, with their size.
  pub live: HashMap<usize, usize>,
  /// Every block ever released, in release order.
  pub released: Vec<usize>,
  /// Fail the next allocate/reallocate call.
  pub fail_next: bool,
  /// Make every reallocate move the block.
  pub force_move: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrackingProvider {
  inner: LibcProvider,
  pub ledger: Rc<RefCell<Ledger>>,
}

impl TrackingProvider {
  pub fn new() -> (Self, Rc<RefCell<Ledger>>) {
    let provider = Self::default();
    let ledger = Rc::clone(&provider.ledger);
    (provider, ledger)
  }

  fn take_failure(&self) -> bool {
    std::mem::take(&mut self.ledger.borrow_mut().fail_next)
  }

  fn record(
    &self,
    block: NonNull<u8>,
    size: usize,
  ) -> NonNull<u8> {
    self.ledger.borrow_mut().live.insert(block.as_ptr() as usize, size);
    block
  }
}

impl RawProvider for TrackingProvider {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if self.take_failure() {
      return None;
    }
    let block = self.inner.allocate(size)?;
    Some(self.record(block, size))
  }

  fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if self.take_failure() {
      return None;
    }
    let block = self.inner.allocate_zeroed(size)?;
    Some(self.record(block, size))
  }

  unsafe fn reallocate(
    &mut self,
    block: NonNull<u8>,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if self.take_failure() {
      return None;
    }

    let old_addr = block.as_ptr() as usize;
    let old_size = *self
      .ledger
      .borrow()
      .live
      .get(&old_addr)
      .expect("reallocate of a block this provider does not own");

    let moved = if self.ledger.borrow().force_move {
      let fresh = self.inner.allocate(size)?;
      unsafe {
        ptr::copy_nonoverlapping(block.as_ptr(), fresh.as_ptr(), old_size.min(size));
        self.inner.release(block);
      }
      fresh
    } else {
      unsafe { self.inner.reallocate(block, size)? }
    };

    self.ledger.borrow_mut().live.remove(&old_addr);
    Some(self.record(moved, size))
  }

  unsafe fn release(
    &mut self,
    block: NonNull<u8>,
  ) {
    let addr = block.as_ptr() as usize;
    {
      let mut ledger = self.ledger.borrow_mut();
      assert!(ledger.live.remove(&addr).is_some(), "double release of {addr:#x}");
      ledger.released.push(addr);
    }
    unsafe { self.inner.release(block) }
  }
}
