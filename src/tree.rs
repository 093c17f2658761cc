//! Slot table and the link/unlink engine behind [`Forest`](crate::Forest).
//!
//! ```text
//!   R ── first_child ──► B ── next_sibling ──► A ──► None
//!   ▲                    │                     │
//!   └─ FirstChild(R) ────┘     Sibling(B) ─────┘
//! ```
//!
//! Chunks refer to each other by slot index, never by address, so the
//! backing memory of a chunk can move without touching any neighbour.

use crate::chunk::{ChunkRef, Link};

#[derive(Debug)]
struct Node<T> {
  value: T,
  first_child: Option<u32>,
  next_sibling: Option<u32>,
  link: Link,
}

#[derive(Debug)]
struct Slot<T> {
  generation: u32,
  node: Option<Node<T>>,
}

/// Forest of ownership trees stored in a generational slot table.
#[derive(Debug)]
pub(crate) struct Tree<T> {
  slots: Vec<Slot<T>>,
  free: Vec<u32>,
  len: usize,
}

impl<T> Tree<T> {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      slots: Vec::with_capacity(capacity),
      free: Vec::new(),
      len: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Maps a handle to its slot index, or `None` if the handle is stale.
  pub fn resolve(
    &self,
    chunk: ChunkRef,
  ) -> Option<u32> {
    let slot = self.slots.get(chunk.index() as usize)?;

    (slot.generation == chunk.generation() && slot.node.is_some()).then_some(chunk.index())
  }

  pub fn handle(
    &self,
    index: u32,
  ) -> ChunkRef {
    ChunkRef::new(index, self.slots[index as usize].generation)
  }

  pub fn value(
    &self,
    index: u32,
  ) -> &T {
    &self.node(index).value
  }

  pub fn value_mut(
    &mut self,
    index: u32,
  ) -> &mut T {
    &mut self.node_mut(index).value
  }

  pub fn is_root(
    &self,
    index: u32,
  ) -> bool {
    self.node(index).link.is_root()
  }

  fn node(
    &self,
    index: u32,
  ) -> &Node<T> {
    match self.slots.get(index as usize).and_then(|slot| slot.node.as_ref()) {
      Some(node) => node,
      None => panic!("ownership tree corrupted: link to vacant slot {index}"),
    }
  }

  fn node_mut(
    &mut self,
    index: u32,
  ) -> &mut Node<T> {
    match self.slots.get_mut(index as usize).and_then(|slot| slot.node.as_mut()) {
      Some(node) => node,
      None => panic!("ownership tree corrupted: link to vacant slot {index}"),
    }
  }

  /// Stores `value` as a new chunk, linked under `parent` when given.
  ///
  /// Returns `None` when the slot table cannot address another chunk.
  pub fn insert(
    &mut self,
    value: T,
    parent: Option<u32>,
  ) -> Option<ChunkRef> {
    let node = Node {
      value,
      first_child: None,
      next_sibling: None,
      link: Link::Root,
    };

    let index = match self.free.pop() {
      Some(index) => {
        self.slots[index as usize].node = Some(node);
        index
      }
      None => {
        let index = u32::try_from(self.slots.len()).ok()?;
        self.slots.push(Slot {
          generation: 0,
          node: Some(node),
        });
        index
      }
    };

    self.len += 1;

    if let Some(parent) = parent {
      self.link(index, parent);
    }

    Some(self.handle(index))
  }

  /// Takes a chunk out of its sibling list, leaving its children in place.
  fn unlink(
    &mut self,
    index: u32,
  ) {
    let node = self.node_mut(index);
    let link = node.link;
    let next = node.next_sibling.take();
    node.link = Link::Root;

    match link {
      Link::Root => {}
      Link::FirstChild(parent) => {
        self.node_mut(parent).first_child = next;
        if let Some(next) = next {
          self.node_mut(next).link = Link::FirstChild(parent);
        }
      }
      Link::Sibling(prev) => {
        self.node_mut(prev).next_sibling = next;
        if let Some(next) = next {
          self.node_mut(next).link = Link::Sibling(prev);
        }
      }
    }
  }

  /// Inserts a detached chunk as the new first child of `parent`.
  fn link(
    &mut self,
    index: u32,
    parent: u32,
  ) {
    let old_head = self.node(parent).first_child;

    if let Some(old_head) = old_head {
      self.node_mut(old_head).link = Link::Sibling(index);
    }

    let node = self.node_mut(index);
    node.next_sibling = old_head;
    node.link = Link::FirstChild(parent);

    self.node_mut(parent).first_child = Some(index);
  }

  /// Walks back to the head of the sibling list and returns its parent.
  pub fn parent(
    &self,
    mut index: u32,
  ) -> Option<u32> {
    loop {
      match self.node(index).link {
        Link::Root => return None,
        Link::FirstChild(parent) => return Some(parent),
        Link::Sibling(prev) => index = prev,
      }
    }
  }

  /// True if `index` is `root` or one of its descendants.
  fn is_in_subtree(
    &self,
    mut index: u32,
    root: u32,
  ) -> bool {
    loop {
      if index == root {
        return true;
      }
      match self.parent(index) {
        Some(parent) => index = parent,
        None => return false,
      }
    }
  }

  pub fn set_parent(
    &mut self,
    index: u32,
    parent: Option<u32>,
  ) {
    debug_assert!(
      parent.is_none_or(|parent| !self.is_in_subtree(parent, index)),
      "ownership tree cycle: chunk {index} cannot depend on its own descendant"
    );

    self.unlink(index);

    if let Some(parent) = parent {
      self.link(index, parent);
    }
  }

  /// Detaches `index` and hands its children over to `parent`.
  ///
  /// With a parent, the children are spliced in front of the parent's
  /// existing children in their current order. Without one, each child
  /// becomes an independent root.
  pub fn cut(
    &mut self,
    index: u32,
    parent: Option<u32>,
  ) {
    debug_assert!(
      parent.is_none_or(|parent| !self.is_in_subtree(parent, index)),
      "ownership tree cycle: children of chunk {index} cannot move under its own subtree"
    );

    self.unlink(index);

    let Some(head) = self.node_mut(index).first_child.take() else {
      return;
    };

    match parent {
      Some(parent) => {
        if let Some(old_head) = self.node(parent).first_child {
          let mut last = head;
          while let Some(next) = self.node(last).next_sibling {
            last = next;
          }

          self.node_mut(last).next_sibling = Some(old_head);
          self.node_mut(old_head).link = Link::Sibling(last);
        }

        self.node_mut(parent).first_child = Some(head);
        self.node_mut(head).link = Link::FirstChild(parent);
      }
      None => {
        let mut next = Some(head);
        while let Some(child) = next {
          let node = self.node_mut(child);
          next = node.next_sibling.take();
          node.link = Link::Root;
        }
      }
    }
  }

  fn vacate(
    &mut self,
    index: u32,
  ) -> Node<T> {
    let slot = match self.slots.get_mut(index as usize) {
      Some(slot) => slot,
      None => panic!("ownership tree corrupted: link to missing slot {index}"),
    };
    let Some(node) = slot.node.take() else {
      panic!("ownership tree corrupted: chunk {index} reached twice during teardown");
    };

    slot.generation = slot.generation.wrapping_add(1);
    self.free.push(index);
    self.len -= 1;

    node
  }

  /// Detaches `index` and removes it with its whole subtree, handing every
  /// removed value to `release`. Returns the number of chunks removed.
  ///
  /// Links of a node are read before its slot is freed, so no freed slot is
  /// ever visited again. An explicit worklist keeps deep trees off the call
  /// stack.
  pub fn remove_subtree(
    &mut self,
    index: u32,
    mut release: impl FnMut(T),
  ) -> usize {
    self.unlink(index);

    let mut pending = vec![index];
    let mut removed = 0;

    while let Some(current) = pending.pop() {
      let node = self.vacate(current);

      debug_assert!(
        current == index || !node.link.is_root(),
        "ownership tree cycle: chunk {current} found as a root inside a subtree"
      );

      if let Some(next) = node.next_sibling {
        pending.push(next);
      }
      if let Some(child) = node.first_child {
        pending.push(child);
      }

      release(node.value);
      removed += 1;
    }

    removed
  }

  /// Removes every chunk, handing each value to `release`.
  pub fn drain(
    &mut self,
    mut release: impl FnMut(T),
  ) {
    for (index, slot) in self.slots.iter_mut().enumerate() {
      if let Some(node) = slot.node.take() {
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        release(node.value);
      }
    }

    self.len = 0;
  }

  pub fn children(
    &self,
    index: u32,
  ) -> Children<'_, T> {
    Children {
      tree: self,
      next: self.node(index).first_child,
    }
  }
}

/// Iterator over the direct children of a chunk, most recently linked first.
pub struct Children<'a, T> {
  tree: &'a Tree<T>,
  next: Option<u32>,
}

impl<T> Iterator for Children<'_, T> {
  type Item = ChunkRef;

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.next?;
    self.next = self.tree.node(current).next_sibling;

    Some(self.tree.handle(current))
  }
}
