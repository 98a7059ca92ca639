//! Binary persistence for the forest.
//!
//! File layout, in order: a fixed header (`f`, `n_items`, `n_nodes`,
//! `nodes_capacity`, `K`, `roots_count`, all `i32`), then `roots_count`
//! root ids, then the raw node arena (`stride * n_nodes` bytes). Every
//! field is host-endian and the node records are the in-memory images, so
//! a file written on one architecture is only guaranteed to load there.
//!
//! Load memory-maps the file read-only and addresses the node array at the
//! header's end offset; the capacity field is round-tripped but never used
//! to size the mapping.

use std::fs::File;
use std::io::{self, Read, Write};

use memmap2::Mmap;

/// Bytes per header field / root id.
const FIELD_SIZE: usize = std::mem::size_of::<i32>();

/// The fixed-order file header plus root list.
pub(crate) struct Header {
    pub f: i32,
    pub n_items: i32,
    pub n_nodes: i32,
    /// Allocated (not used) node count at save time.
    pub capacity: i32,
    pub k: i32,
    pub roots: Vec<i32>,
}

impl Header {
    /// Serialized length: six fixed fields plus the root ids.
    pub fn byte_len(&self) -> usize {
        (6 + self.roots.len()) * FIELD_SIZE
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.f.to_ne_bytes())?;
        w.write_all(&self.n_items.to_ne_bytes())?;
        w.write_all(&self.n_nodes.to_ne_bytes())?;
        w.write_all(&self.capacity.to_ne_bytes())?;
        w.write_all(&self.k.to_ne_bytes())?;
        w.write_all(&(self.roots.len() as i32).to_ne_bytes())?;
        for &root in &self.roots {
            w.write_all(&root.to_ne_bytes())?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let f = read_i32(r)?;
        let n_items = read_i32(r)?;
        let n_nodes = read_i32(r)?;
        let capacity = read_i32(r)?;
        let k = read_i32(r)?;
        let roots_count = read_i32(r)?;

        if f <= 0 || n_items < 0 || n_nodes < 0 || k < 1 || roots_count < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "index header fields out of range",
            ));
        }

        let mut roots = Vec::with_capacity(roots_count as usize);
        for _ in 0..roots_count {
            roots.push(read_i32(r)?);
        }
        Ok(Self {
            f,
            n_items,
            n_nodes,
            capacity,
            k,
            roots,
        })
    }
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; FIELD_SIZE];
    r.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

/// Map an index file read-only, verifying it covers the node array.
pub(crate) fn map_node_file(file: &File, node_offset: usize, node_len: usize) -> io::Result<Mmap> {
    // SAFETY: memmap2::Mmap is a read-only shared mapping; the file is
    // opened read-only and must not be truncated while mapped.
    let map = unsafe { Mmap::map(file)? };
    let needed = node_offset
        .checked_add(node_len)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "node array size overflow"))?;
    if map.len() < needed {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "index file too small: expected at least {needed} bytes, got {}",
                map.len()
            ),
        ));
    }
    Ok(map)
}
