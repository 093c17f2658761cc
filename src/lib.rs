//! # nestalloc - A Structure-Aware Memory Allocator
//!
//! This crate provides an allocator where every chunk of memory may declare a
//! **parent chunk** it depends on. Chunks form a forest of ownership trees on
//! top of ordinary heap blocks, and releasing a chunk releases its whole
//! subtree.
//!
//! ## Overview
//!
//! ```text
//!   Ownership Forest:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                                                                      │
//!   │      matrix ◄─────────── root (no parent)                            │
//!   │        │                                                             │
//!   │        └──► rows ◄────── row-pointer array, depends on matrix        │
//!   │               │                                                      │
//!   │               ├──► row 3                                             │
//!   │               ├──► row 2     one buffer per row, depends on rows     │
//!   │               ├──► row 1                                             │
//!   │               └──► row 0                                             │
//!   │                                                                      │
//!   │   release(matrix) frees all six chunks.                              │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   nestalloc
//!   ├── align      - Alignment macro (align_to!)
//!   ├── block      - In-band block header (internal)
//!   ├── chunk      - ChunkRef handles and sibling-list links
//!   ├── tree       - Slot table and link/unlink engine (internal)
//!   ├── provider   - RawProvider trait and the libc-backed provider
//!   ├── config     - ForestConfig
//!   ├── error      - AllocError
//!   └── forest     - Forest, the public allocator
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nestalloc::Forest;
//!
//! let mut forest = Forest::new();
//!
//! let matrix = forest.zero_allocate(16, None).unwrap();
//! let rows = forest.zero_allocate(4 * 8, Some(matrix)).unwrap();
//! for _ in 0..4 {
//!     forest.allocate(4 * 4, Some(rows)).unwrap();
//! }
//! assert_eq!(forest.len(), 6);
//!
//! forest.release(Some(matrix));
//! assert!(forest.is_empty());
//! ```
//!
//! ## How It Works
//!
//! Each chunk is one block from the [`RawProvider`] with a small header in
//! front of the payload:
//!
//! ```text
//!   Single Chunk:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ chunk: handle   │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │     HEADER_SIZE       │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Forest::as_ptr
//! ```
//!
//! Tree links live in a slot table indexed by [`ChunkRef`]:
//!
//! ```text
//!   parent ── first_child ──► newest ── next ──► older ── next ──► oldest
//!     ▲                         │                  │                 │
//!     └──── FirstChild ─────────┘   Sibling(newest)┘  Sibling(older) ┘
//! ```
//!
//! New children are prepended, so a parent lists its children most recent
//! first. Because links are handles rather than addresses, a resize that moves
//! a block leaves every relation intact.
//!
//! ## Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`Forest::allocate`] / [`Forest::zero_allocate`] | new chunk, optionally under a parent |
//! | [`Forest::resize`] | grow or shrink, handle and links unchanged |
//! | [`Forest::release`] | free the chunk and its subtree |
//! | [`Forest::get_parent`] | walk back to the owning chunk |
//! | [`Forest::set_parent`] | move a chunk with its subtree |
//! | [`Forest::cut`] | detach a chunk, handing its children to another parent |
//!
//! ## Limitations
//!
//! - **Single owner**: no internal locking; wrap the forest in a mutex to share it
//! - **No reuse policy**: every chunk is its own provider block
//! - **Unix libc**: the default provider calls `malloc`/`free` through `libc`
//!
//! ## Safety
//!
//! Handles are checked before use, so stale handles are harmless. Reading a
//! payload is `unsafe` because chunks from [`Forest::allocate`] start
//! uninitialized.

pub mod align;
mod block;
mod chunk;
mod config;
mod error;
mod forest;
mod provider;
mod tree;

pub use block::HEADER_SIZE;
pub use chunk::ChunkRef;
pub use config::ForestConfig;
pub use error::AllocError;
pub use forest::Forest;
pub use provider::{LibcProvider, RawProvider};
