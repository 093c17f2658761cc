//! End-to-end behaviour of `Forest` against an instrumented provider.

mod common;

use common::TrackingProvider;
use nestalloc::{AllocError, ChunkRef, Forest, HEADER_SIZE};

fn children(
  forest: &Forest<TrackingProvider>,
  chunk: ChunkRef,
) -> Vec<ChunkRef> {
  forest.children(chunk).collect()
}

fn raw_addr(
  forest: &Forest<TrackingProvider>,
  chunk: ChunkRef,
) -> usize {
  forest.as_ptr(chunk).unwrap().as_ptr() as usize - HEADER_SIZE
}

#[test]
fn test_cut_detached_sibling_survives_release() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let r = forest.allocate(16, None).unwrap();
  let a = forest.allocate(8, Some(r)).unwrap();
  let b = forest.allocate(8, Some(r)).unwrap();
  assert_eq!(children(&forest, r), [b, a]);

  forest.cut(Some(b), None);
  assert_eq!(children(&forest, r), [a]);
  assert!(forest.is_root(b));

  let expected = [raw_addr(&forest, r), raw_addr(&forest, a)];
  forest.release(Some(r));

  let mut released = ledger.borrow().released.clone();
  released.sort();
  let mut expected = expected.to_vec();
  expected.sort();
  assert_eq!(released, expected);

  assert!(forest.contains(b));
  assert_eq!(forest.len(), 1);
  assert_eq!(ledger.borrow().live.len(), 1);
}

#[test]
fn test_release_cascades_through_subtree_only() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let other = forest.allocate(8, None).unwrap();
  let p = forest.allocate(8, None).unwrap();
  let mut doomed = vec![raw_addr(&forest, p)];
  let mut frontier = vec![p];
  for _ in 0..3 {
    let mut next = Vec::new();
    for parent in frontier {
      for _ in 0..3 {
        let child = forest.allocate(4, Some(parent)).unwrap();
        doomed.push(raw_addr(&forest, child));
        next.push(child);
      }
    }
    frontier = next;
  }
  let sibling = forest.allocate(8, Some(other)).unwrap();
  assert_eq!(forest.len(), 2 + 3 + 9 + 27 + 1);

  forest.release(Some(p));

  let mut released = ledger.borrow().released.clone();
  released.sort();
  doomed.sort();
  assert_eq!(released, doomed);
  assert_eq!(forest.len(), 2);
  assert_eq!(forest.get_parent(Some(sibling)), Some(other));
}

#[test]
fn test_release_of_inner_chunk_keeps_its_parent() {
  let (provider, _ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let r = forest.allocate(8, None).unwrap();
  let a = forest.allocate(8, Some(r)).unwrap();
  let b = forest.allocate(8, Some(r)).unwrap();
  let c = forest.allocate(8, Some(r)).unwrap();
  forest.allocate(8, Some(b)).unwrap();

  forest.release(Some(b));

  assert_eq!(children(&forest, r), [c, a]);
  assert_eq!(forest.get_parent(Some(a)), Some(r));
  assert_eq!(forest.len(), 3);
}

#[test]
fn test_set_parent_preserves_subtree() {
  let (provider, _ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let p = forest.allocate(8, None).unwrap();
  let q = forest.allocate(8, None).unwrap();
  let c = forest.allocate(8, Some(p)).unwrap();
  let x = forest.allocate(8, Some(c)).unwrap();
  let y = forest.allocate(8, Some(c)).unwrap();
  let z = forest.allocate(8, Some(x)).unwrap();

  forest.set_parent(Some(c), Some(q));
  assert_eq!(forest.get_parent(Some(c)), Some(q));
  assert_eq!(children(&forest, c), [y, x]);
  assert_eq!(children(&forest, x), [z]);
  assert!(children(&forest, p).is_empty());

  forest.set_parent(Some(c), None);
  assert_eq!(forest.get_parent(Some(c)), None);
  assert_eq!(children(&forest, c), [y, x]);

  forest.release(Some(q));
  assert!(forest.contains(c));
  assert!(forest.contains(z));
}

#[test]
fn test_cut_promotes_grandchildren() {
  let (provider, _ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let p = forest.allocate(8, None).unwrap();
  let a = forest.allocate(8, Some(p)).unwrap();
  let b = forest.allocate(8, Some(p)).unwrap();
  let x = forest.allocate(8, Some(a)).unwrap();
  assert_eq!(children(&forest, p), [b, a]);

  forest.cut(Some(a), Some(p));

  assert_eq!(children(&forest, p), [x, b]);
  assert!(children(&forest, a).is_empty());
  assert!(forest.is_root(a));
  assert_eq!(forest.get_parent(Some(x)), Some(p));
  assert_eq!(forest.get_parent(Some(b)), Some(p));
}

#[test]
fn test_cut_to_other_parent_splices_in_front() {
  let (provider, _ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let dir = forest.allocate(8, None).unwrap();
  let grand = forest.allocate(8, None).unwrap();
  let existing = forest.allocate(8, Some(grand)).unwrap();
  let f1 = forest.allocate(8, Some(dir)).unwrap();
  let f2 = forest.allocate(8, Some(dir)).unwrap();
  let f3 = forest.allocate(8, Some(dir)).unwrap();

  forest.cut(Some(dir), Some(grand));

  assert_eq!(children(&forest, grand), [f3, f2, f1, existing]);
  for file in [f1, f2, f3] {
    assert_eq!(forest.get_parent(Some(file)), Some(grand));
  }

  forest.release(Some(dir));
  assert_eq!(forest.len(), 5);
}

#[test]
fn test_resize_migration_keeps_relations() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);
  ledger.borrow_mut().force_move = true;

  let r = forest.allocate(16, None).unwrap();
  let sibling = forest.allocate(16, Some(r)).unwrap();
  let c = forest.allocate(16, Some(r)).unwrap();
  let g = forest.allocate(16, Some(c)).unwrap();
  unsafe { forest.payload_mut(c) }.unwrap().copy_from_slice(b"0123456789abcdef");

  let before = forest.as_ptr(c).unwrap();
  let resized = forest.resize(Some(c), 4096).unwrap();
  let after = forest.as_ptr(c).unwrap();

  assert_eq!(resized, c);
  assert_ne!(before, after);
  assert_eq!(forest.get_parent(Some(g)), Some(c));
  assert_eq!(forest.get_parent(Some(c)), Some(r));
  assert_eq!(children(&forest, r), [c, sibling]);
  assert_eq!(unsafe { forest.chunk_of(after) }, Some(c));
  let head = unsafe { std::slice::from_raw_parts(after.as_ptr(), 16) };
  assert_eq!(head, b"0123456789abcdef");

  forest.release(Some(r));
  assert!(ledger.borrow().live.is_empty());
}

#[test]
fn test_failed_resize_keeps_chunk() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let r = forest.allocate(8, None).unwrap();
  let c = forest.allocate(8, Some(r)).unwrap();
  let before = forest.as_ptr(c).unwrap();

  ledger.borrow_mut().fail_next = true;
  assert_eq!(forest.resize(Some(c), 64), Err(AllocError::OutOfMemory { size: 64 }));

  assert_eq!(forest.as_ptr(c), Some(before));
  assert_eq!(forest.size_of(c), Some(8));
  assert_eq!(forest.get_parent(Some(c)), Some(r));

  forest.release(Some(c));
  assert_eq!(ledger.borrow().live.len(), 1);
}

#[test]
fn test_failed_allocation_has_no_side_effects() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);
  let r = forest.allocate(8, None).unwrap();

  ledger.borrow_mut().fail_next = true;
  assert_eq!(forest.allocate(8, Some(r)), Err(AllocError::OutOfMemory { size: 8 }));
  ledger.borrow_mut().fail_next = true;
  assert_eq!(forest.zero_allocate(8, Some(r)), Err(AllocError::OutOfMemory { size: 8 }));

  assert_eq!(forest.len(), 1);
  assert!(children(&forest, r).is_empty());
  assert_eq!(ledger.borrow().live.len(), 1);
}

#[test]
fn test_null_references_are_no_ops() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);
  let r = forest.allocate(8, None).unwrap();
  let c = forest.allocate(8, Some(r)).unwrap();

  assert_eq!(forest.release(None), None);
  assert_eq!(forest.get_parent(None), None);
  forest.set_parent(None, Some(r));
  forest.set_parent(None, None);
  forest.cut(None, Some(r));

  assert_eq!(forest.len(), 2);
  assert_eq!(forest.get_parent(Some(c)), Some(r));
  assert!(ledger.borrow().released.is_empty());
}

#[test]
fn test_header_size_requested_from_provider() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let chunk = forest.allocate(100, None).unwrap();

  let addr = raw_addr(&forest, chunk);
  assert_eq!(ledger.borrow().live[&addr], HEADER_SIZE + 100);
}

#[test]
fn test_drop_releases_every_block() {
  let (provider, ledger) = TrackingProvider::new();
  {
    let mut forest = Forest::with_provider(provider);
    let r = forest.allocate(8, None).unwrap();
    forest.allocate(8, Some(r)).unwrap();
    forest.allocate(8, None).unwrap();
    assert_eq!(ledger.borrow().live.len(), 3);
  }

  assert!(ledger.borrow().live.is_empty());
  assert_eq!(ledger.borrow().released.len(), 3);
}

#[test]
fn test_deep_chain_release() {
  let (provider, ledger) = TrackingProvider::new();
  let mut forest = Forest::with_provider(provider);

  let root = forest.allocate(1, None).unwrap();
  let mut tip = root;
  for _ in 0..100_000 {
    tip = forest.allocate(1, Some(tip)).unwrap();
  }
  assert!(forest.get_parent(Some(tip)).is_some());

  forest.release(Some(root));

  assert!(forest.is_empty());
  assert_eq!(ledger.borrow().released.len(), 100_001);
}
