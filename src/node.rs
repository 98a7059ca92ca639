//! Fixed-stride node records.
//!
//! Every node occupies one `stride(f)`-byte record in the arena: the
//! descendant count, two child id slots, then the value area of `f` words.
//! Three variants share this single layout, discriminated by the count:
//!
//! - `1`: value node; the value area holds an item's vector and the
//!   record's arena index equals the item id.
//! - `<= K`: group node; the child slots and value area are overlaid by an
//!   inline list of up to `K` item ids.
//! - `> K`: internal node; `v[0]` holds the split-plane bit index and the
//!   child slots hold the two subtree ids.
//!
//! Records are decoded field-by-field in host byte order, so views stay
//! valid over an unaligned memory-mapped arena.

use smallvec::SmallVec;

use crate::hamming;

/// Bytes per id / per vector word.
pub(crate) const ID_SIZE: usize = std::mem::size_of::<i32>();
pub(crate) const WORD_SIZE: usize = std::mem::size_of::<u32>();

pub(crate) const DESCENDANTS_OFFSET: usize = 0;
pub(crate) const CHILDREN_OFFSET: usize = DESCENDANTS_OFFSET + ID_SIZE;
pub(crate) const VALUE_OFFSET: usize = CHILDREN_OFFSET + 2 * ID_SIZE;

/// Record stride in bytes for dimension `f` (in words).
#[inline]
pub(crate) fn stride(f: usize) -> usize {
    VALUE_OFFSET + f * WORD_SIZE
}

/// Maximum number of ids a group node can hold inline for stride `s`.
///
/// Derived from the stride, written into the file header, and honored from
/// the stored header on load rather than re-derived.
#[inline]
pub(crate) fn group_capacity(s: usize) -> i32 {
    ((s - CHILDREN_OFFSET) / ID_SIZE) as i32 - 2
}

#[inline]
fn read_i32(bytes: &[u8], off: usize) -> i32 {
    i32::from_ne_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}

#[inline]
fn read_u32(bytes: &[u8], off: usize) -> u32 {
    u32::from_ne_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}

/// Read-only view of one node record.
#[derive(Clone, Copy)]
pub(crate) struct NodeRef<'a> {
    bytes: &'a [u8],
}

impl<'a> NodeRef<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn n_descendants(self) -> i32 {
        read_i32(self.bytes, DESCENDANTS_OFFSET)
    }

    #[inline]
    pub fn child(self, side: usize) -> i32 {
        read_i32(self.bytes, CHILDREN_OFFSET + side * ID_SIZE)
    }

    /// Inline id list of a group node: the first `n_descendants` entries of
    /// the child-id area (which runs past the two child slots into the value
    /// area).
    pub fn group_ids(self) -> SmallVec<[i32; 16]> {
        let count = self.n_descendants() as usize;
        (0..count)
            .map(|i| read_i32(self.bytes, CHILDREN_OFFSET + i * ID_SIZE))
            .collect()
    }

    /// Split-plane bit index of an internal node (`v[0]`).
    #[inline]
    pub fn split_bit(self) -> u32 {
        read_u32(self.bytes, VALUE_OFFSET)
    }

    /// Value word `chunk`.
    #[inline]
    pub fn word(self, chunk: usize) -> u32 {
        read_u32(self.bytes, VALUE_OFFSET + chunk * WORD_SIZE)
    }

    /// Copy of the `f`-word vector of a value node.
    pub fn vector(self, f: usize) -> SmallVec<[u32; 16]> {
        (0..f).map(|i| self.word(i)).collect()
    }

    /// Which side of the split plane at `bit` this node's vector lies on.
    #[inline]
    pub fn side_of(self, bit: u32) -> bool {
        let b = bit as usize;
        hamming::bit_of_word(self.word(b / hamming::BITS_PER_WORD), b % hamming::BITS_PER_WORD)
    }
}

/// Mutable view of one node record.
pub(crate) struct NodeMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> NodeMut<'a> {
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Zero the whole record so every build writes a fully determined image.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    #[inline]
    pub fn set_n_descendants(&mut self, n: i32) {
        self.bytes[DESCENDANTS_OFFSET..DESCENDANTS_OFFSET + ID_SIZE]
            .copy_from_slice(&n.to_ne_bytes());
    }

    #[inline]
    pub fn set_child(&mut self, side: usize, id: i32) {
        let off = CHILDREN_OFFSET + side * ID_SIZE;
        self.bytes[off..off + ID_SIZE].copy_from_slice(&id.to_ne_bytes());
    }

    /// Write a group node's inline id list. The caller has checked
    /// `ids.len()` against the group capacity.
    pub fn set_group_ids(&mut self, ids: &[i32]) {
        for (i, &id) in ids.iter().enumerate() {
            let off = CHILDREN_OFFSET + i * ID_SIZE;
            self.bytes[off..off + ID_SIZE].copy_from_slice(&id.to_ne_bytes());
        }
    }

    #[inline]
    pub fn set_split_bit(&mut self, bit: u32) {
        self.bytes[VALUE_OFFSET..VALUE_OFFSET + WORD_SIZE].copy_from_slice(&bit.to_ne_bytes());
    }

    pub fn set_vector(&mut self, words: &[u32]) {
        for (i, &w) in words.iter().enumerate() {
            let off = VALUE_OFFSET + i * WORD_SIZE;
            self.bytes[off..off + WORD_SIZE].copy_from_slice(&w.to_ne_bytes());
        }
    }
}
