//! Forest index over packed binary vectors.
//!
//! A forest is an ordered list of independent random-projection binary
//! trees built over the same item set with different random choices. Items
//! are fixed-dimension bit vectors; queries traverse every tree best-first,
//! pool the candidates, and re-rank them by true Hamming distance.
//!
//! # Lifecycle
//!
//! An index is mutable until [`BitForestIndex::build`] runs: only
//! [`BitForestIndex::add_item`] is permitted. Once built it is read-only:
//! queries, [`BitForestIndex::save`], [`BitForestIndex::unbuild`] and
//! [`BitForestIndex::unload`] apply. [`BitForestIndex::load`] produces a
//! built, read-only index backed by a memory-mapped file.

mod build;
mod search;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::arena::NodeArena;
use crate::error::{ForestError, Result};
use crate::hamming;
use crate::node;
use crate::persistence::{self, Header};
use crate::random::RandomSource;

/// Approximate nearest neighbor index over binary vectors under Hamming
/// distance.
///
/// Vectors are `f` words of 32 bits each; `f` is fixed at construction.
/// Item ids are non-negative and may be sparse, though storage is allocated
/// up to the maximum id seen.
///
/// ```
/// use bitforest::BitForestIndex;
///
/// let mut index = BitForestIndex::new(1);
/// index.add_item(0, &[0b0011])?;
/// index.add_item(1, &[0b0110])?;
/// index.add_item(2, &[0b1111])?;
/// index.build(4)?;
///
/// let (ids, distances) = index.get_nns_by_vector(&[0b0000], 3, None)?;
/// assert_eq!(ids, vec![0, 1, 2]);
/// assert_eq!(distances, vec![2, 2, 4]);
/// # Ok::<(), bitforest::ForestError>(())
/// ```
pub struct BitForestIndex {
    /// Dimension in words.
    f: usize,
    /// Node record stride in bytes.
    s: usize,
    /// Maximum inline ids per group node.
    k: i32,
    n_items: i32,
    n_nodes: i32,
    roots: Vec<i32>,
    arena: NodeArena,
    random: RandomSource,
    built: bool,
    verbose: bool,
}

impl BitForestIndex {
    /// Create an empty index for vectors of `f` 32-bit words (`f * 32`
    /// bits). `f` must be at least 1.
    #[must_use]
    pub fn new(f: usize) -> Self {
        debug_assert!(f > 0, "dimension must be at least one word");
        let s = node::stride(f);
        Self {
            f,
            s,
            k: node::group_capacity(s),
            n_items: 0,
            n_nodes: 0,
            roots: Vec::new(),
            arena: NodeArena::new(s),
            random: RandomSource::new(),
            built: false,
            verbose: false,
        }
    }

    /// Insert (or overwrite) the vector for `item`. Ids must be
    /// non-negative; the arena grows to cover the highest id seen.
    pub fn add_item(&mut self, item: i32, vector: &[u32]) -> Result<()> {
        debug_assert!(item >= 0, "item ids are non-negative");
        if self.built {
            return Err(ForestError::AlreadyBuilt);
        }
        if vector.len() != self.f {
            return Err(ForestError::BadDim {
                expected: self.f,
                got: vector.len(),
            });
        }
        self.arena.allocate_up_to(item + 1)?;
        let mut n = self.arena.node_mut(item);
        n.clear();
        n.set_n_descendants(1);
        n.set_vector(vector);
        if item >= self.n_items {
            self.n_items = item + 1;
        }
        Ok(())
    }

    /// Build `q` trees over the inserted items. After this the index is
    /// read-only until [`BitForestIndex::unbuild`].
    pub fn build(&mut self, q: usize) -> Result<()> {
        if self.built {
            return Err(ForestError::AlreadyBuilt);
        }
        if self.n_items == 0 {
            return Err(ForestError::NoItems);
        }

        self.n_nodes = self.n_items;
        for tree in 0..q {
            let indices: Vec<i32> = (0..self.n_items).collect();
            let root = self.make_tree(&indices, true)?;
            self.roots.push(root);
            if self.verbose {
                eprintln!("built tree {}/{}", tree + 1, q);
            }
        }
        if self.verbose {
            eprintln!("built {} trees with {} nodes", q, self.n_nodes);
        }
        self.built = true;
        Ok(())
    }

    /// Discard the tree structure, keeping the item vectors. The index
    /// becomes mutable again.
    pub fn unbuild(&mut self) -> Result<()> {
        if !self.built {
            return Err(ForestError::NotBuilt);
        }
        self.roots.clear();
        self.n_nodes = self.n_items;
        self.built = false;
        Ok(())
    }

    /// Write the built index to `path`: header, root ids, then the raw
    /// node arena. The file is host-endian and loads only on the same
    /// architecture.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.built {
            return Err(ForestError::NotBuilt);
        }
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        let header = Header {
            f: self.f as i32,
            n_items: self.n_items,
            n_nodes: self.n_nodes,
            capacity: self.arena.capacity(),
            k: self.k,
            roots: self.roots.clone(),
        };
        header.write_to(&mut w)?;
        w.write_all(self.arena.bytes(self.n_nodes))?;
        w.flush()?;
        Ok(())
    }

    /// Replace this index with the contents of `path`, memory-mapping the
    /// node array read-only. The file's dimension must equal this index's.
    /// On failure the index is left unloaded.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.unload();

        let file = File::open(path)?;
        let header = Header::read_from(&mut &file)?;
        if header.f != self.f as i32 {
            return Err(ForestError::DimMismatch {
                expected: self.f as i32,
                got: header.f,
            });
        }
        // The stored group capacity is honored for traversal, but it must
        // fit the record layout, and every id the header points at must be
        // inside the node array; a file failing either is corrupt.
        let ids_per_record = node::group_capacity(self.s) + 2;
        if header.k > ids_per_record
            || header.n_items > header.n_nodes
            || header.roots.iter().any(|&r| r < 0 || r >= header.n_nodes)
        {
            return Err(ForestError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "index header is inconsistent with the node array",
            )));
        }
        // The node region is sized from n_nodes; the stored capacity is
        // only carried for round-tripping.
        let offset = header.byte_len();
        let node_len = self.s * header.n_nodes as usize;
        let map = persistence::map_node_file(&file, offset, node_len)?;

        self.arena = NodeArena::mapped(map, offset, self.s, header.capacity);
        self.n_items = header.n_items;
        self.n_nodes = header.n_nodes;
        self.k = header.k;
        self.roots = header.roots;
        self.built = true;
        Ok(())
    }

    /// Idempotent teardown: frees a heap arena or unmaps a loaded one and
    /// returns the index to its freshly constructed state.
    pub fn unload(&mut self) {
        self.arena.reset();
        self.roots.clear();
        self.n_items = 0;
        self.n_nodes = 0;
        self.k = node::group_capacity(self.s);
        self.built = false;
    }

    /// Reseed the random source used by [`BitForestIndex::build`].
    pub fn set_seed(&mut self, seed: u64) {
        self.random.set_seed(seed);
    }

    /// Toggle human-readable progress output on stderr. Has no effect on
    /// results.
    pub fn verbose(&mut self, v: bool) {
        self.verbose = v;
    }

    /// Copy of item `i`'s vector. `i` must be a previously added id below
    /// `n_items`.
    #[must_use]
    pub fn get_item(&self, i: i32) -> Vec<u32> {
        self.arena.node(i).vector(self.f).into_vec()
    }

    /// Hamming distance between items `i` and `j`.
    #[must_use]
    pub fn get_distance(&self, i: i32, j: i32) -> u32 {
        let a = self.arena.node(i).vector(self.f);
        let b = self.arena.node(j).vector(self.f);
        hamming::distance(&a, &b)
    }

    /// The `n` nearest items to `vector`, as `(ids, distances)` sorted by
    /// ascending distance then id.
    ///
    /// `search_k` bounds how many candidates the traversal gathers across
    /// all trees before re-ranking; `None` means `n * n_trees`. Larger
    /// values trade speed for recall.
    pub fn get_nns_by_vector(
        &self,
        vector: &[u32],
        n: usize,
        search_k: Option<usize>,
    ) -> Result<(Vec<i32>, Vec<u32>)> {
        if vector.len() != self.f {
            return Err(ForestError::BadDim {
                expected: self.f,
                got: vector.len(),
            });
        }
        Ok(self.nns_internal(vector, n, search_k))
    }

    /// The `n` nearest items to item `item` (which is itself among the
    /// results at distance 0).
    pub fn get_nns_by_item(
        &self,
        item: i32,
        n: usize,
        search_k: Option<usize>,
    ) -> Result<(Vec<i32>, Vec<u32>)> {
        let vector = self.arena.node(item).vector(self.f);
        Ok(self.nns_internal(&vector, n, search_k))
    }

    /// Number of items inserted (one past the highest id seen).
    #[must_use]
    pub fn n_items(&self) -> usize {
        self.n_items as usize
    }

    /// Number of trees in the forest; zero before build.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.roots.len()
    }

    /// Dimension in 32-bit words, as given at construction.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.f
    }

    /// Name of the distance metric.
    #[must_use]
    pub fn metric(&self) -> &'static str {
        hamming::NAME
    }
}
