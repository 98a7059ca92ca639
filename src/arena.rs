//! Contiguous node arena.
//!
//! All nodes live in one byte buffer of fixed-stride records, addressed by
//! integer id. Ids stay valid across growth; raw views must not be held
//! across any call that may grow the arena.
//!
//! The buffer's provenance is part of the type: an arena is either
//! heap-owned (built in process, freed on drop) or a read-only borrow of a
//! memory-mapped file (loaded from disk, unmapped on drop). A mapped arena
//! refuses every mutation.

use memmap2::Mmap;

use crate::error::{ForestError, Result};
use crate::node::{NodeMut, NodeRef};

/// Capacity multiplier applied on growth.
const REALLOCATION_FACTOR: f64 = 1.3;

enum Storage {
    /// Heap-owned and mutable.
    Heap(Vec<u8>),
    /// Read-only file mapping; `offset` is where the node array starts.
    Mapped { map: Mmap, offset: usize },
}

pub(crate) struct NodeArena {
    storage: Storage,
    stride: usize,
    /// Nodes allocated, not nodes in use.
    capacity: i32,
}

impl NodeArena {
    /// Empty heap-backed arena for records of `stride` bytes.
    pub fn new(stride: usize) -> Self {
        Self {
            storage: Storage::Heap(Vec::new()),
            stride,
            capacity: 0,
        }
    }

    /// Arena over the node region of a mapped index file. `capacity` is the
    /// header's capacity field, carried only so a re-save round-trips it.
    pub fn mapped(map: Mmap, offset: usize, stride: usize, capacity: i32) -> Self {
        Self {
            storage: Storage::Mapped { map, offset },
            stride,
            capacity,
        }
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Ensure room for at least `n` nodes.
    ///
    /// Fresh slots are zero-filled, so records for ids that are never
    /// written stay deterministic.
    pub fn allocate_up_to(&mut self, n: i32) -> Result<()> {
        let buf = match &mut self.storage {
            Storage::Heap(buf) => buf,
            // A mapped arena belongs to a built, read-only index.
            Storage::Mapped { .. } => return Err(ForestError::AlreadyBuilt),
        };
        if n <= self.capacity {
            return Ok(());
        }
        let grown = ((f64::from(self.capacity) + 1.0) * REALLOCATION_FACTOR).ceil() as i32;
        let new_capacity = n.max(grown);
        let new_len = new_capacity as usize * self.stride;
        buf.try_reserve_exact(new_len - buf.len())
            .map_err(|_| ForestError::OutOfMemory)?;
        buf.resize(new_len, 0);
        self.capacity = new_capacity;
        Ok(())
    }

    /// Read-only view of record `i`.
    pub fn node(&self, i: i32) -> NodeRef<'_> {
        let start = i as usize * self.stride;
        let bytes = match &self.storage {
            Storage::Heap(buf) => &buf[start..start + self.stride],
            Storage::Mapped { map, offset } => {
                &map[offset + start..offset + start + self.stride]
            }
        };
        NodeRef::new(bytes)
    }

    /// Mutable view of record `i`. Only reachable after a successful
    /// [`NodeArena::allocate_up_to`], which a mapped arena never grants.
    pub fn node_mut(&mut self, i: i32) -> NodeMut<'_> {
        let start = i as usize * self.stride;
        match &mut self.storage {
            Storage::Heap(buf) => NodeMut::new(&mut buf[start..start + self.stride]),
            Storage::Mapped { .. } => unreachable!("mapped arena is read-only"),
        }
    }

    /// Block-copy a staged node image into slot `i`.
    pub fn set_from_buffer(&mut self, i: i32, image: &[u8]) {
        debug_assert_eq!(image.len(), self.stride);
        let start = i as usize * self.stride;
        match &mut self.storage {
            Storage::Heap(buf) => buf[start..start + self.stride].copy_from_slice(image),
            Storage::Mapped { .. } => unreachable!("mapped arena is read-only"),
        }
    }

    /// Raw bytes of the first `n` records, as written to disk.
    pub fn bytes(&self, n: i32) -> &[u8] {
        let len = n as usize * self.stride;
        match &self.storage {
            Storage::Heap(buf) => &buf[..len],
            Storage::Mapped { map, offset } => &map[*offset..offset + len],
        }
    }

    /// Drop all storage: frees a heap buffer, unmaps a mapping.
    pub fn reset(&mut self) {
        self.storage = Storage::Heap(Vec::new());
        self.capacity = 0;
    }
}
